#![deny(missing_docs)]

//! # DynamoDB Exec
//!
//! Conditional writes, atomic transactions and retrying batch operations for Amazon
//! DynamoDB tables.
//!
//! ## Overview
//!
//! This library sits between application code and the store and:
//! - Builds condition, update, filter and projection clauses from structured types,
//!   with collision-free placeholders shared across every clause of a request
//! - Drives batch writes and batch gets to completion, resubmitting only the unprocessed
//!   part with exponential backoff under a caller-owned retry budget
//! - Submits up to 25 writes as one atomic transaction and names every item the store
//!   canceled, together with its reason
//! - Classifies store failures into typed errors callers can branch on
//!
//! ## Quick Example
//!
//! Decrement a counter only while it stays non-negative:
//!
//! ```no_run
//! use aws_sdk_dynamodb::{Client, types::ScalarAttributeType};
//! use dynamodb_exec::{
//!     DynamoDb, Error,
//!     common::{condition::ConditionExpression, expression::ExpressionBuilder, key},
//!     write::update_item::{Operand, UpdateExpression},
//! };
//! use serde_json::{Value, json};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! # let client = Client::from_conf(aws_sdk_dynamodb::config::Config::builder().build());
//! let orders = key::Table::new(
//!     "orders",
//!     ("partition", ScalarAttributeType::S),
//!     ("uuid", ScalarAttributeType::S),
//! );
//! let dynamo = DynamoDb::new(client, [orders]);
//! let expression = ExpressionBuilder::new()
//!     .set_condition(ConditionExpression::new().greater_than_or_equal("count", json!(2)))
//!     .set_update(UpdateExpression::new().set_minus("count", "count", Operand::Value(json!(2))))
//!     .build()?;
//! // "#n0 >= :gte0" guards "SET #n0 = #n0 - :set1"
//! let query = key::Query::new(Value::from("A"), Value::from("001"));
//! match dynamo.update_item("orders", &query, expression).await {
//!     Ok(updated) => println!("{updated:?}"),
//!     Err(Error::ConditionCheckFailed { .. }) => println!("not enough left"),
//!     Err(err) => return Err(err.into()),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`mod@common`] - Table and key model, conditions, projections and the expression builder
//! - [`mod@read`] - Read operations (GetItem, Scan, BatchGetItem)
//! - [`mod@write`] - Write operations (PutItem, UpdateItem, DeleteItem, BatchWriteItem, TransactWriteItems)
//! - [`mod@retry`] - Retry budget and backoff for batch operations
//! - [`mod@client`] - The store boundary
//! - [`mod@dynamo`] - Facade addressing tables by name

pub mod client;

/// Common utilities for tables, keys, conditions, projections and expressions.
pub mod common;

pub mod dynamo;

/// Errors reported by every operation.
pub mod error;

/// Read operations for retrieving data from DynamoDB tables.
///
/// This module provides operations for:
/// - Getting individual items by key
/// - Scanning a table page by page
/// - Batch retrieving multiple items
pub mod read;

pub mod retry;

/// Write operations for modifying data in DynamoDB tables.
///
/// This module provides operations for:
/// - Putting new items or replacing existing ones
/// - Updating items with various operations (set, add, delete, remove)
/// - Deleting items by key
/// - Batch writing multiple items
/// - Writing several items atomically
pub mod write;

pub use dynamo::DynamoDb;
pub use error::{Error, Result};
