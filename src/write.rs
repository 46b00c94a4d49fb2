//! Write operations for modifying data in DynamoDB tables.
//!
//! This module provides operations for writing data to DynamoDB:
//! - Putting new items or replacing existing ones
//! - Updating items with various operations
//! - Deleting items by primary key
//! - Batch writing up to 25 items, retrying unprocessed requests
//! - Atomic multi-item transactions

/// Batch write item operation with retries of unprocessed requests.
pub mod batch_write_item;

/// Common utilities and types for write operations.
pub mod common;

/// Delete item operation for removing items from tables.
pub mod delete_item;

/// Put item operation for creating or replacing items.
pub mod put_item;

/// Transactional write of up to 25 items.
pub mod transact_write_items;

/// Update item operation for modifying existing items.
pub mod update_item;
