//! Read operations for retrieving data from DynamoDB tables.
//!
//! This module provides operations for reading data from DynamoDB:
//! - Getting individual items by primary key
//! - Scanning a table one page at a time
//! - Batch retrieving up to 100 items, retrying unprocessed keys

/// Batch get item operation with retries of unprocessed keys.
pub mod batch_get_item;

/// Common utilities and types for read operations.
pub mod common;

/// Get item operation for retrieving a single item by primary key.
pub mod get_item;

/// Scan operation reading a table page by page.
pub mod scan;
