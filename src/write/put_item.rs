use crate::{
    client::StoreClient,
    error::{Error, Result},
    write,
};

use aws_sdk_dynamodb::operation;
use serde::Serialize;
use serde_dynamo::to_item;

/// Put item operation.
///
/// ```rust,no_run
/// use dynamodb_exec::write;
/// use serde_json::json;
///
/// # async fn example(client: &aws_sdk_dynamodb::Client) -> dynamodb_exec::Result<()> {
/// let put_item = write::put_item::PutItem {
///     item: json!({"partition": "A", "uuid": "001", "count": 3}),
///     write_args: write::common::WriteArgs {
///         table_name: "orders".to_string(),
///         ..Default::default()
///     },
/// };
/// put_item.send(client).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct PutItem<T> {
    /// The item to put into the table.
    pub item: T,
    /// Additional write operation arguments (table name, condition, return values, etc.).
    pub write_args: write::common::WriteArgs,
}

impl<T: Serialize> TryFrom<PutItem<T>> for operation::put_item::PutItemInput {
    type Error = Error;

    fn try_from(put_item: PutItem<T>) -> Result<Self> {
        let item = to_item(put_item.item)?;
        let write_operation: write::common::WriteInput = put_item.write_args.into();
        let builder = Self::builder().set_item(Some(item));
        let input = crate::apply_write_operation!(builder, write_operation).build()?;
        Ok(input)
    }
}

impl<T: Serialize> PutItem<T> {
    /// Execute the put item operation.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_exec.put_item", skip_all, err)
    )]
    pub async fn send<C: StoreClient + ?Sized>(
        self,
        client: &C,
    ) -> Result<operation::put_item::PutItemOutput> {
        let input: operation::put_item::PutItemInput = self.try_into()?;
        client
            .put_item(input)
            .await
            .map_err(|err| Error::remote("put_item", err))
    }
}
