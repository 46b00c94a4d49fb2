//! Client facade addressing tables by name.
//!
//! [`DynamoDb`] owns a [`StoreClient`] and the registry of [`Table`] descriptions. Every
//! operation resolves its table through the registry first, so an unknown name fails with
//! [`Error::TableNotFound`] before anything is sent.

use crate::{
    client::StoreClient,
    common::{
        self,
        expression::Expression,
        key::{Query, Table},
    },
    error::{Error, Result},
    read::{
        self,
        batch_get_item::{BatchGetItem, BatchGetOrder},
        get_item::GetItem,
        scan::{Scan, ScanPage},
    },
    retry::FailConfig,
    write::{
        self,
        batch_write_item::{
            BatchWriteItem, BatchWriteItemRequest, BatchWriteItemRequestDeleteItem,
            BatchWriteItemRequestPutItem,
        },
        delete_item::DeleteItem,
        put_item::PutItem,
        transact_write_items::{TransactWriteItems, TransactionItem},
        update_item::UpdateItem,
    },
};

use aws_sdk_dynamodb::{Client, types};
use serde::{Serialize, de::DeserializeOwned};
use serde_dynamo::from_item;
use std::collections;

/// Store client bound to a registry of tables.
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::types::ScalarAttributeType;
/// use dynamodb_exec::{
///     DynamoDb,
///     common::{condition::ConditionExpression, expression::ExpressionBuilder, key::{Query, Table}},
///     write::update_item::{Operand, UpdateExpression},
/// };
/// use serde_json::{Value, json};
///
/// # async fn example(client: aws_sdk_dynamodb::Client) -> dynamodb_exec::Result<()> {
/// let orders = Table::new(
///     "orders",
///     ("partition", ScalarAttributeType::S),
///     ("uuid", ScalarAttributeType::S),
/// );
/// let dynamo = DynamoDb::new(client, [orders]);
/// dynamo
///     .create_item("orders", &json!({"partition": "A", "uuid": "001", "count": 3}), Default::default())
///     .await?;
/// let expression = ExpressionBuilder::new()
///     .set_condition(ConditionExpression::new().greater_than_or_equal("count", json!(2)))
///     .set_update(UpdateExpression::new().set_minus("count", "count", Operand::Value(json!(2))))
///     .build()?;
/// let query = Query::new(Value::from("A"), Value::from("001"));
/// let updated = dynamo.update_item("orders", &query, expression).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct DynamoDb<C = Client> {
    client: C,
    tables: collections::HashMap<String, Table>,
}

impl<C> DynamoDb<C> {
    /// Creates a facade over `client` with the given tables registered.
    pub fn new(client: C, tables: impl IntoIterator<Item = Table>) -> Self {
        Self {
            client,
            tables: tables
                .into_iter()
                .map(|table| (table.name.clone(), table))
                .collect(),
        }
    }

    /// The underlying store client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Registers a table, returning the description it replaced, if any.
    pub fn register_table(&mut self, table: Table) -> Option<Table> {
        self.tables.insert(table.name.clone(), table)
    }

    /// Forgets a table. The table itself is left untouched in the store.
    pub fn deregister_table(&mut self, name: &str) -> Option<Table> {
        self.tables.remove(name)
    }

    /// Looks a table up by name.
    pub fn table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::TableNotFound(name.to_string()))
    }

    /// Names of the registered tables, in no particular order.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}

impl<C: StoreClient> DynamoDb<C> {
    /// Puts `item`, guarded by the expression's condition clause when there is one.
    pub async fn create_item<P: Serialize>(
        &self,
        table_name: &str,
        item: &P,
        expression: Expression,
    ) -> Result<()> {
        let table = self.table(table_name)?;
        PutItem {
            item,
            write_args: write::common::WriteArgs {
                expression,
                table_name: table.name.clone(),
                ..Default::default()
            },
        }
        .send(&self.client)
        .await?;
        Ok(())
    }

    /// Reads the item `query` selects, restricted to the expression's projection.
    ///
    /// Returns `None` when no such item exists.
    pub async fn get_item<K, P>(
        &self,
        table_name: &str,
        query: &Query<K>,
        expression: Expression,
    ) -> Result<Option<P>>
    where
        K: Serialize,
        P: DeserializeOwned,
    {
        let table = self.table(table_name)?;
        GetItem {
            keys: table.keys(query),
            return_consumed_capacity: None,
            single_read_args: read::common::SingleReadArgs {
                expression,
                table_name: table.name.clone(),
                ..Default::default()
            },
        }
        .send_into(&self.client)
        .await
    }

    /// Applies the expression's update clause to the item `query` selects.
    ///
    /// The condition clause, if any, is evaluated against the stored item. Returns the
    /// updated attributes.
    pub async fn update_item<K: Serialize>(
        &self,
        table_name: &str,
        query: &Query<K>,
        expression: Expression,
    ) -> Result<common::Item> {
        let table = self.table(table_name)?;
        let output = UpdateItem {
            keys: table.keys(query),
            write_args: write::common::WriteArgs {
                expression,
                return_values: Some(types::ReturnValue::UpdatedNew),
                table_name: table.name.clone(),
                ..Default::default()
            },
        }
        .send(&self.client)
        .await?;
        Ok(output.attributes.unwrap_or_default())
    }

    /// Deletes the item `query` selects, guarded by the expression's condition clause.
    pub async fn delete_item<K: Serialize>(
        &self,
        table_name: &str,
        query: &Query<K>,
        expression: Expression,
    ) -> Result<()> {
        let table = self.table(table_name)?;
        DeleteItem {
            keys: table.keys(query),
            write_args: write::common::WriteArgs {
                expression,
                table_name: table.name.clone(),
                ..Default::default()
            },
        }
        .send(&self.client)
        .await?;
        Ok(())
    }

    /// Puts every item in one batch, resubmitting whatever the store leaves unprocessed.
    pub async fn batch_write_create<P: Serialize>(
        &self,
        table_name: &str,
        items: impl IntoIterator<Item = P>,
        fail_config: &mut FailConfig,
    ) -> Result<()> {
        let table = self.table(table_name)?;
        let requests = items
            .into_iter()
            .map(|item| BatchWriteItemRequest::PutItem(BatchWriteItemRequestPutItem { item }))
            .collect();
        BatchWriteItem {
            request_items: collections::HashMap::from([(table.name.clone(), requests)]),
            return_consumed_capacity: None,
            return_item_collection_metrics: None,
        }
        .send(&self.client, fail_config)
        .await
    }

    /// Deletes every item the queries select in one batch.
    pub async fn batch_write_delete<K: Serialize>(
        &self,
        table_name: &str,
        queries: &[Query<K>],
        fail_config: &mut FailConfig,
    ) -> Result<()> {
        let table = self.table(table_name)?;
        let requests = queries
            .iter()
            .map(|query| {
                BatchWriteItemRequest::DeleteItem(BatchWriteItemRequestDeleteItem {
                    keys: table.keys(query),
                })
            })
            .collect();
        BatchWriteItem {
            request_items: collections::HashMap::from([(table.name.clone(), requests)]),
            return_consumed_capacity: None,
            return_item_collection_metrics: None,
        }
        .send(&self.client, fail_config)
        .await
    }

    /// Reads the items the queries select. Queries matching no item produce nothing.
    pub async fn batch_get<K, P>(
        &self,
        table_name: &str,
        queries: &[Query<K>],
        expression: Expression,
        order: BatchGetOrder,
        fail_config: &mut FailConfig,
    ) -> Result<Vec<P>>
    where
        K: Serialize,
        P: DeserializeOwned,
    {
        self.get_batch(table_name, queries, expression, order)?
            .send_into(&self.client, fail_config)
            .await
    }

    /// Reads the items the queries select into `targets`, one target per query.
    ///
    /// Each retrieved item is deserialized into the target at the position of the query
    /// whose key it carries, whatever the projection; targets of queries matching no item
    /// are left untouched.
    pub async fn batch_get_into<K, P>(
        &self,
        table_name: &str,
        queries: &[Query<K>],
        targets: &mut [P],
        expression: Expression,
        fail_config: &mut FailConfig,
    ) -> Result<()>
    where
        K: Serialize,
        P: DeserializeOwned,
    {
        if queries.len() != targets.len() {
            return Err(Error::MismatchedLength {
                queries: queries.len(),
                objects: targets.len(),
            });
        }
        let table = self.table(table_name)?;
        let mut keys = Vec::with_capacity(queries.len());
        for query in queries {
            keys.push(common::key::make_key(query, table)?);
        }
        let (mut items, appended) = self
            .get_batch(table_name, queries, expression, BatchGetOrder::Store)?
            .send_keyed(&self.client, fail_config)
            .await?;
        for (key, target) in keys.iter().zip(targets.iter_mut()) {
            let position = items
                .iter()
                .position(|item| read::batch_get_item::matches_key(key, item));
            if let Some(position) = position {
                let item = items.swap_remove(position);
                *target = from_item(read::batch_get_item::strip_attributes(item, &appended))?;
            }
        }
        Ok(())
    }

    fn get_batch<'a, K>(
        &self,
        table_name: &str,
        queries: &'a [Query<K>],
        expression: Expression,
        order: BatchGetOrder,
    ) -> Result<BatchGetItem<&'a K>> {
        let table = self.table(table_name)?;
        Ok(BatchGetItem {
            keys: queries.iter().map(|query| table.keys(query)).collect(),
            order,
            return_consumed_capacity: None,
            single_read_args: read::common::SingleReadArgs {
                expression,
                table_name: table.name.clone(),
                ..Default::default()
            },
        })
    }

    /// Reads one page of the table, applying the expression's filter and projection.
    ///
    /// Pass the previous page's `last_evaluated_key` as `start_key` to continue.
    pub async fn scan_items<P: DeserializeOwned>(
        &self,
        table_name: &str,
        start_key: Option<common::Item>,
        expression: Expression,
    ) -> Result<ScanPage<P>> {
        let table = self.table(table_name)?;
        Scan {
            multiple_read_args: read::common::MultipleReadArgs {
                exclusive_start_key: start_key,
                expression,
                table_name: table.name.clone(),
                ..Default::default()
            },
            ..Default::default()
        }
        .send_into(&self.client)
        .await
    }

    /// Applies every item atomically, or none of them.
    ///
    /// Every item's table must be registered. `client_request_token` makes resubmissions
    /// of the same transaction idempotent.
    pub async fn transact_write<P, K>(
        &self,
        items: Vec<TransactionItem<P, K>>,
        client_request_token: Option<String>,
    ) -> Result<()>
    where
        P: Serialize,
        K: Serialize,
    {
        for item in &items {
            self.table(&item.table.name)?;
        }
        TransactWriteItems {
            items,
            client_request_token,
            ..Default::default()
        }
        .send(&self.client)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    fn table(name: &str) -> Table {
        Table::new(
            name,
            ("partition", types::ScalarAttributeType::S),
            ("uuid", types::ScalarAttributeType::S),
        )
    }

    #[rstest]
    #[case::registered("orders", true)]
    #[case::unknown("users", false)]
    fn test_table_lookup(#[case] name: &str, #[case] found: bool) {
        let dynamo = DynamoDb::new((), [table("orders")]);
        let actual = dynamo.table(name);
        assert_eq!(actual.is_ok(), found);
        if !found {
            assert!(matches!(actual, Err(Error::TableNotFound(missing)) if missing == name));
        }
    }

    #[test]
    fn test_register_and_deregister_table() {
        let mut dynamo = DynamoDb::new((), Vec::new());
        assert_eq!(dynamo.register_table(table("orders")), None);
        assert_eq!(
            dynamo.register_table(table("orders")),
            Some(table("orders"))
        );
        assert_eq!(dynamo.table_names().collect::<Vec<_>>(), vec!["orders"]);
        assert_eq!(dynamo.deregister_table("orders"), Some(table("orders")));
        assert!(dynamo.table("orders").is_err());
        assert_eq!(dynamo.deregister_table("orders"), None);
    }
}
