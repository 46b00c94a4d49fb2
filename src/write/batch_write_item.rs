use crate::{
    client::StoreClient,
    common,
    error::{Error, Result},
    retry::FailConfig,
};

use aws_sdk_dynamodb::{operation, types};
use serde::Serialize;
use serde_dynamo::to_item;
use std::collections;

/// Most write requests a single batch accepts.
pub const MAX_BATCH_WRITE_ITEMS: usize = 25;

const OPERATION: &str = "batch_write_item";

/// A put item request within a batch write operation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchWriteItemRequestPutItem<T> {
    /// The item to put into the table.
    pub item: T,
}

/// A delete item request within a batch write operation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchWriteItemRequestDeleteItem<T> {
    /// The primary key of the item to delete.
    pub keys: common::key::Keys<T>,
}

/// A single request within a batch write operation.
///
/// Each request can be either a PutItem (create/replace) or DeleteItem (remove) operation.
#[derive(Clone, Debug, PartialEq)]
pub enum BatchWriteItemRequest<T> {
    /// Put item request - creates or replaces an item.
    PutItem(BatchWriteItemRequestPutItem<T>),
    /// Delete item request - removes an item by its primary key.
    DeleteItem(BatchWriteItemRequestDeleteItem<T>),
}

impl<T: Serialize> TryFrom<BatchWriteItemRequest<T>> for types::WriteRequest {
    type Error = Error;

    fn try_from(write_request: BatchWriteItemRequest<T>) -> Result<Self> {
        let builder = match write_request {
            BatchWriteItemRequest::PutItem(put_item) => {
                let item = to_item(put_item.item)?;
                let put_request = types::PutRequest::builder()
                    .set_item(Some(item))
                    .build()?;
                Self::builder().put_request(put_request)
            }
            BatchWriteItemRequest::DeleteItem(delete_item) => {
                let keys: common::Item = delete_item.keys.try_into()?;
                let delete_request = types::DeleteRequest::builder()
                    .set_key(Some(keys))
                    .build()?;
                Self::builder().delete_request(delete_request)
            }
        };
        Ok(builder.build())
    }
}

/// Batch write item operation.
///
/// At most [`MAX_BATCH_WRITE_ITEMS`] requests across all tables. Requests the store
/// leaves unprocessed are resubmitted, waiting according to the [`FailConfig`], until
/// none remain or the retry budget is spent.
///
/// ```rust,no_run
/// use dynamodb_exec::{retry, write};
/// use std::collections::HashMap;
///
/// # async fn example(client: &aws_sdk_dynamodb::Client) -> dynamodb_exec::Result<()> {
/// let batch_write = write::batch_write_item::BatchWriteItem {
///     request_items: HashMap::from([(
///         "orders".to_string(),
///         vec![
///             write::batch_write_item::BatchWriteItemRequest::PutItem(
///                 write::batch_write_item::BatchWriteItemRequestPutItem {
///                     item: serde_json::json!({"partition": "A", "uuid": "001"}),
///                 },
///             ),
///         ],
///     )]),
///     ..Default::default()
/// };
/// let mut fail_config = retry::FailConfig::default();
/// batch_write.send(client, &mut fail_config).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchWriteItem<T> {
    /// A map of table names to lists of write requests.
    pub request_items: collections::HashMap<String, Vec<BatchWriteItemRequest<T>>>,
    /// Whether to return the consumed capacity information.
    pub return_consumed_capacity: Option<types::ReturnConsumedCapacity>,
    /// Whether to return item collection metrics.
    pub return_item_collection_metrics: Option<types::ReturnItemCollectionMetrics>,
}

impl<T> BatchWriteItem<T> {
    /// Total number of write requests across all tables.
    pub fn len(&self) -> usize {
        self.request_items.values().map(Vec::len).sum()
    }

    /// Whether there is nothing to write.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Serialize> TryFrom<BatchWriteItem<T>> for operation::batch_write_item::BatchWriteItemInput {
    type Error = Error;

    fn try_from(batch_write_item: BatchWriteItem<T>) -> Result<Self> {
        let count = batch_write_item.len();
        if count > MAX_BATCH_WRITE_ITEMS {
            return Err(Error::TooManyItems {
                count,
                limit: MAX_BATCH_WRITE_ITEMS,
            });
        }
        let mut request_items =
            collections::HashMap::with_capacity(batch_write_item.request_items.len());
        for (table_name, table_request_items) in batch_write_item.request_items {
            let mut serialized_table_request_items = Vec::with_capacity(table_request_items.len());
            for request_item in table_request_items {
                let request_item = request_item.try_into()?;
                serialized_table_request_items.push(request_item);
            }
            request_items.insert(table_name, serialized_table_request_items);
        }
        let operation = Self::builder()
            .set_request_items(Some(request_items))
            .set_return_consumed_capacity(batch_write_item.return_consumed_capacity)
            .set_return_item_collection_metrics(batch_write_item.return_item_collection_metrics)
            .build()?;
        Ok(operation)
    }
}

fn count_requests(request_items: &collections::HashMap<String, Vec<types::WriteRequest>>) -> usize {
    request_items.values().map(Vec::len).sum()
}

impl<T: Serialize> BatchWriteItem<T> {
    /// Execute the batch write item operation until every request is processed.
    ///
    /// # Errors
    ///
    /// [`Error::TooManyItems`] before any network call for oversized batches,
    /// [`Error::RetriesExhausted`] once the budget is spent with requests still
    /// unprocessed, or the classified remote error for non-retryable failures.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_exec.batch_write_item", skip_all, err)
    )]
    pub async fn send<C: StoreClient + ?Sized>(
        self,
        client: &C,
        fail_config: &mut FailConfig,
    ) -> Result<()> {
        let mut input: operation::batch_write_item::BatchWriteItemInput = self.try_into()?;
        loop {
            let (unprocessed, source) = match client.batch_write_item(input.clone()).await {
                Ok(output) => {
                    let unprocessed = output.unprocessed_items.unwrap_or_default();
                    if count_requests(&unprocessed) == 0 {
                        fail_config.reset();
                        return Ok(());
                    }
                    input.request_items = Some(unprocessed);
                    (input.request_items.as_ref().map_or(0, count_requests), None)
                }
                Err(err) if err.is_retryable() => {
                    (input.request_items.as_ref().map_or(0, count_requests), Some(err))
                }
                Err(err) => return Err(Error::remote(OPERATION, err)),
            };
            fail_config.exponential_backoff().await;
            if fail_config.max_retries_reached() {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    retries = fail_config.retry_count(),
                    unprocessed,
                    "batch write gave up with unprocessed requests"
                );
                return Err(Error::RetriesExhausted {
                    operation: OPERATION,
                    retries: fail_config.retry_count(),
                    unprocessed,
                    source,
                });
            }
        }
    }
}
