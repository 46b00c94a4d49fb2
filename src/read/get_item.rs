use crate::{
    client::StoreClient,
    common,
    error::{Error, Result},
    read,
};

use aws_sdk_dynamodb::{operation, types};
use serde::{Serialize, de::DeserializeOwned};
use serde_dynamo::from_item;

/// Get item operation.
///
/// ```rust,no_run
/// use dynamodb_exec::{common, read};
/// use serde_json::Value;
///
/// # async fn example(client: &aws_sdk_dynamodb::Client) -> dynamodb_exec::Result<()> {
/// let get_item = read::get_item::GetItem {
///     keys: common::key::Keys {
///         partition_key: common::key::Key {
///             name: "partition".to_string(),
///             value: "A".to_string(),
///         },
///         sort_key: Some(common::key::Key {
///             name: "uuid".to_string(),
///             value: "001".to_string(),
///         }),
///     },
///     single_read_args: read::common::SingleReadArgs {
///         table_name: "orders".to_string(),
///         ..Default::default()
///     },
///     ..Default::default()
/// };
/// let order: Option<Value> = get_item.send_into(client).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GetItem<T> {
    /// The primary key of the item to retrieve.
    pub keys: common::key::Keys<T>,
    /// Whether to return the consumed capacity information.
    pub return_consumed_capacity: Option<types::ReturnConsumedCapacity>,
    /// Additional read operation arguments (table name, consistent read, projection).
    pub single_read_args: read::common::SingleReadArgs,
}

impl<T: Serialize> TryFrom<GetItem<T>> for operation::get_item::GetItemInput {
    type Error = Error;

    fn try_from(get_item: GetItem<T>) -> Result<Self> {
        let single_read_operation: read::common::SingleReadInput =
            get_item.single_read_args.into();
        let keys: common::Item = get_item.keys.try_into()?;
        let builder = Self::builder()
            .set_key(Some(keys))
            .set_return_consumed_capacity(get_item.return_consumed_capacity)
            .table_name(single_read_operation.table_name.clone());
        let input = crate::apply_single_read_operation!(builder, single_read_operation).build()?;
        Ok(input)
    }
}

impl<T: Serialize> GetItem<T> {
    /// Execute the get item operation.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_exec.get_item", skip_all, err)
    )]
    pub async fn send<C: StoreClient + ?Sized>(
        self,
        client: &C,
    ) -> Result<operation::get_item::GetItemOutput> {
        let input: operation::get_item::GetItemInput = self.try_into()?;
        client
            .get_item(input)
            .await
            .map_err(|err| Error::remote("get_item", err))
    }

    /// Execute the get item operation and deserialize the item, `None` if it does not exist.
    pub async fn send_into<P, C>(self, client: &C) -> Result<Option<P>>
    where
        P: DeserializeOwned,
        C: StoreClient + ?Sized,
    {
        let output = self.send(client).await?;
        let item = output.item.map(from_item).transpose()?;
        Ok(item)
    }
}
