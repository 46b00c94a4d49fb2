use crate::{
    client::StoreClient,
    common,
    error::{Error, Result},
    read,
    retry::FailConfig,
};

use aws_sdk_dynamodb::{operation, types};
use serde::{Serialize, de::DeserializeOwned};
use serde_dynamo::from_item;
use std::collections;

/// Most keys a single batch get accepts.
pub const MAX_BATCH_GET_ITEMS: usize = 100;

const OPERATION: &str = "batch_get_item";

/// Order of the items a batch get returns.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum BatchGetOrder {
    /// The order the store returned them in, round after round.
    #[default]
    Store,
    /// The order of the requested keys. Key attributes a projection leaves out are
    /// retrieved for the matching and removed afterwards.
    Request,
}

/// Batch get item operation on one table.
///
/// At most [`MAX_BATCH_GET_ITEMS`] keys. Keys the store leaves unprocessed are
/// requested again, waiting according to the [`FailConfig`], until none remain or
/// the retry budget is spent. Keys with no stored item produce no result.
///
/// ```rust,no_run
/// use dynamodb_exec::{common, read, retry};
/// use serde_json::Value;
///
/// # async fn example(client: &aws_sdk_dynamodb::Client) -> dynamodb_exec::Result<()> {
/// let batch_get = read::batch_get_item::BatchGetItem {
///     keys: vec![common::key::Keys {
///         partition_key: common::key::Key {
///             name: "partition".to_string(),
///             value: "A".to_string(),
///         },
///         sort_key: Some(common::key::Key {
///             name: "uuid".to_string(),
///             value: "001".to_string(),
///         }),
///     }],
///     order: read::batch_get_item::BatchGetOrder::Request,
///     single_read_args: read::common::SingleReadArgs {
///         table_name: "orders".to_string(),
///         ..Default::default()
///     },
///     ..Default::default()
/// };
/// let mut fail_config = retry::FailConfig::default();
/// let orders: Vec<Value> = batch_get.send_into(client, &mut fail_config).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchGetItem<T> {
    /// The primary keys of the items to retrieve.
    pub keys: Vec<common::key::Keys<T>>,
    /// Order of the returned items.
    pub order: BatchGetOrder,
    /// Whether to return the consumed capacity information.
    pub return_consumed_capacity: Option<types::ReturnConsumedCapacity>,
    /// Read arguments (table name, consistent read, projection).
    pub single_read_args: read::common::SingleReadArgs,
}

impl<T: Serialize> TryFrom<BatchGetItem<T>> for operation::batch_get_item::BatchGetItemInput {
    type Error = Error;

    fn try_from(batch_get_item: BatchGetItem<T>) -> Result<Self> {
        let (input, _) = batch_get_item.into_input()?;
        Ok(input)
    }
}

/// Appends the key attributes a projection leaves out and returns their names.
///
/// Without a projection every attribute is retrieved and nothing is appended.
fn project_key_attributes(
    operation: &mut read::common::SingleReadInput,
    key_names: &[String],
) -> Vec<String> {
    let Some(projection) = operation.projection_expression.as_mut() else {
        return Vec::new();
    };
    let names = operation
        .expression_attribute_names
        .get_or_insert_with(Default::default);
    let projected: Vec<&String> = projection
        .split(", ")
        .filter_map(|term| names.get(term))
        .collect();
    let missing: Vec<String> = key_names
        .iter()
        .filter(|name| !projected.contains(name))
        .cloned()
        .collect();
    for (index, name) in missing.iter().enumerate() {
        let placeholder = format!("#k{index}");
        projection.push_str(", ");
        projection.push_str(&placeholder);
        names.insert(placeholder, name.clone());
    }
    missing
}

/// Removes the appended key attributes from a retrieved item.
pub(crate) fn strip_attributes(mut item: common::Item, names: &[String]) -> common::Item {
    for name in names {
        item.remove(name);
    }
    item
}

fn count_keys(request_items: &collections::HashMap<String, types::KeysAndAttributes>) -> usize {
    request_items
        .values()
        .map(|keys_and_attributes| keys_and_attributes.keys().len())
        .sum()
}

fn requested_keys(input: &operation::batch_get_item::BatchGetItemInput) -> Vec<common::Item> {
    input
        .request_items()
        .into_iter()
        .flat_map(|request_items| request_items.values())
        .flat_map(|keys_and_attributes| keys_and_attributes.keys().iter().cloned())
        .collect()
}

/// Whether `item` carries every attribute of `key` with the same value.
pub(crate) fn matches_key(key: &common::Item, item: &common::Item) -> bool {
    key.iter().all(|(name, value)| item.get(name) == Some(value))
}

/// Sorts `items` by the position of their key in `requested`; unmatched items go last.
fn restore_request_order(requested: &[common::Item], items: Vec<common::Item>) -> Vec<common::Item> {
    let mut remaining: Vec<Option<common::Item>> = items.into_iter().map(Some).collect();
    let mut ordered = Vec::with_capacity(remaining.len());
    for key in requested {
        let position = remaining.iter().position(|slot| {
            slot.as_ref().is_some_and(|item| matches_key(key, item))
        });
        if let Some(item) = position.and_then(|position| remaining[position].take()) {
            ordered.push(item);
        }
    }
    ordered.extend(remaining.into_iter().flatten());
    ordered
}

impl<T: Serialize> BatchGetItem<T> {
    fn into_input(self) -> Result<(operation::batch_get_item::BatchGetItemInput, Vec<String>)> {
        let count = self.keys.len();
        if count > MAX_BATCH_GET_ITEMS {
            return Err(Error::TooManyItems {
                count,
                limit: MAX_BATCH_GET_ITEMS,
            });
        }
        let mut key_names: Vec<String> = Vec::new();
        for keys in &self.keys {
            let names = std::iter::once(&keys.partition_key.name)
                .chain(keys.sort_key.as_ref().map(|key| &key.name));
            for name in names {
                if !key_names.contains(name) {
                    key_names.push(name.clone());
                }
            }
        }
        let mut single_read_operation: read::common::SingleReadInput =
            self.single_read_args.into();
        let appended = project_key_attributes(&mut single_read_operation, &key_names);
        let mut serialized_keys = Vec::with_capacity(count);
        for key in self.keys {
            let key: common::Item = key.try_into()?;
            serialized_keys.push(key);
        }
        let builder = types::KeysAndAttributes::builder().set_keys(Some(serialized_keys));
        let keys_and_attributes =
            crate::apply_single_read_operation!(builder, single_read_operation).build()?;
        let input = operation::batch_get_item::BatchGetItemInput::builder()
            .request_items(single_read_operation.table_name, keys_and_attributes)
            .set_return_consumed_capacity(self.return_consumed_capacity)
            .build()?;
        Ok((input, appended))
    }

    /// Execute the batch get item operation until every key is processed.
    ///
    /// # Errors
    ///
    /// [`Error::TooManyItems`] before any network call for oversized batches,
    /// [`Error::RetriesExhausted`] once the budget is spent with keys still
    /// unprocessed, or the classified remote error for non-retryable failures.
    pub async fn send<C: StoreClient + ?Sized>(
        self,
        client: &C,
        fail_config: &mut FailConfig,
    ) -> Result<Vec<common::Item>> {
        let (items, appended) = self.send_keyed(client, fail_config).await?;
        Ok(items
            .into_iter()
            .map(|item| strip_attributes(item, &appended))
            .collect())
    }

    /// Like [`BatchGetItem::send`], but every item keeps its key attributes.
    ///
    /// Also returns the names of the key attributes the projection left out, which the
    /// caller strips once the items are matched to their keys.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_exec.batch_get_item", skip_all, err)
    )]
    pub(crate) async fn send_keyed<C: StoreClient + ?Sized>(
        self,
        client: &C,
        fail_config: &mut FailConfig,
    ) -> Result<(Vec<common::Item>, Vec<String>)> {
        let order = self.order;
        let (mut input, appended) = self.into_input()?;
        let requested = match order {
            BatchGetOrder::Store => Vec::new(),
            BatchGetOrder::Request => requested_keys(&input),
        };
        let mut items = Vec::new();
        loop {
            let (unprocessed, source) = match client.batch_get_item(input.clone()).await {
                Ok(output) => {
                    items.extend(output.responses.into_iter().flat_map(|responses| {
                        responses.into_values().flatten()
                    }));
                    let unprocessed = output.unprocessed_keys.unwrap_or_default();
                    if count_keys(&unprocessed) == 0 {
                        fail_config.reset();
                        let items = match order {
                            BatchGetOrder::Store => items,
                            BatchGetOrder::Request => restore_request_order(&requested, items),
                        };
                        return Ok((items, appended));
                    }
                    input.request_items = Some(unprocessed);
                    (input.request_items.as_ref().map_or(0, count_keys), None)
                }
                Err(err) if err.is_retryable() => {
                    (input.request_items.as_ref().map_or(0, count_keys), Some(err))
                }
                Err(err) => return Err(Error::remote(OPERATION, err)),
            };
            fail_config.exponential_backoff().await;
            if fail_config.max_retries_reached() {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    retries = fail_config.retry_count(),
                    unprocessed,
                    "batch get gave up with unprocessed keys"
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

    /// Execute the batch get item operation and deserialize every item.
    pub async fn send_into<P, C>(self, client: &C, fail_config: &mut FailConfig) -> Result<Vec<P>>
    where
        P: DeserializeOwned,
        C: StoreClient + ?Sized,
    {
        let items = self.send(client, fail_config).await?;
        let mut deserialized = Vec::with_capacity(items.len());
        for item in items {
            deserialized.push(from_item(item)?);
        }
        Ok(deserialized)
    }
}
