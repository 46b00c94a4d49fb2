use crate::{
    client::StoreClient,
    common,
    error::{Error, Result},
    write,
};

use aws_sdk_dynamodb::operation;
use serde::Serialize;

/// Delete item operation.
///
/// ```rust,no_run
/// use dynamodb_exec::{common, write};
///
/// # async fn example(client: &aws_sdk_dynamodb::Client) -> dynamodb_exec::Result<()> {
/// let delete_item = write::delete_item::DeleteItem {
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
///     write_args: write::common::WriteArgs {
///         table_name: "orders".to_string(),
///         ..Default::default()
///     },
/// };
/// delete_item.send(client).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct DeleteItem<T> {
    /// The primary key of the item to delete.
    pub keys: common::key::Keys<T>,
    /// Additional write operation arguments (table name, condition, return values, etc.).
    pub write_args: write::common::WriteArgs,
}

impl<T: Serialize> TryFrom<DeleteItem<T>> for operation::delete_item::DeleteItemInput {
    type Error = Error;

    fn try_from(delete_item: DeleteItem<T>) -> Result<Self> {
        let keys: common::Item = delete_item.keys.try_into()?;
        let write_operation: write::common::WriteInput = delete_item.write_args.into();
        let builder = Self::builder().set_key(Some(keys));
        let input = crate::apply_write_operation!(builder, write_operation).build()?;
        Ok(input)
    }
}

impl<T: Serialize> DeleteItem<T> {
    /// Execute the delete item operation.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_exec.delete_item", skip_all, err)
    )]
    pub async fn send<C: StoreClient + ?Sized>(
        self,
        client: &C,
    ) -> Result<operation::delete_item::DeleteItemOutput> {
        let input: operation::delete_item::DeleteItemInput = self.try_into()?;
        client
            .delete_item(input)
            .await
            .map_err(|err| Error::remote("delete_item", err))
    }
}
