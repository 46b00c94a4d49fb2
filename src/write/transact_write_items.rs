use crate::{
    client::StoreClient,
    common::{
        self,
        expression::Expression,
        key::{Query, Table},
    },
    error::{Error, FailedItem, RemoteErrorKind, Result},
};

use aws_sdk_dynamodb::{operation, types};
use serde::Serialize;
use serde_dynamo::to_item;
use std::collections;

/// Most items a single transaction accepts.
pub const MAX_TRANSACT_ITEMS: usize = 25;

const OPERATION: &str = "transact_write_items";

const CONDITIONAL_CHECK_FAILED: &str = "ConditionalCheckFailed";
const TRANSACTION_CONFLICT: &str = "TransactionConflict";
const THROTTLING: [&str; 3] = [
    "ThrottlingError",
    "ProvisionedThroughputExceeded",
    "RequestLimitExceeded",
];

/// What a transaction item does.
#[derive(Clone, Debug, PartialEq)]
pub enum TransactionOperation<P, K> {
    /// Put the payload, guarded by the item's condition if any.
    Create(P),
    /// Read an item. Write transactions reject it.
    Read(Query<K>),
    /// Apply the item's update clause to the selected item.
    Update(Query<K>),
    /// Delete the selected item, guarded by the item's condition if any.
    Delete(Query<K>),
    /// Assert the item's condition on the selected item without changing it.
    ConditionCheck(Query<K>),
}

impl<P, K> TransactionOperation<P, K> {
    /// Name of the operation kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Create(_) => "Create",
            Self::Read(_) => "Read",
            Self::Update(_) => "Update",
            Self::Delete(_) => "Delete",
            Self::ConditionCheck(_) => "ConditionCheck",
        }
    }
}

/// One entry of a write transaction.
#[derive(Clone, Debug, PartialEq)]
pub struct TransactionItem<P, K> {
    /// Caller supplied label, reported back in [`FailedItem::name`].
    pub name: String,
    /// Table the item lives in.
    pub table: Table,
    /// The operation to apply.
    pub operation: TransactionOperation<P, K>,
    /// Condition and update clauses of the operation.
    pub expression: Expression,
}

impl<P, K> TransactionItem<P, K> {
    /// Creates a transaction item with no expression.
    pub fn new(
        name: impl Into<String>,
        table: Table,
        operation: TransactionOperation<P, K>,
    ) -> Self {
        Self {
            name: name.into(),
            table,
            operation,
            expression: Expression::default(),
        }
    }

    /// Sets the expression clauses.
    pub fn with_expression(mut self, expression: Expression) -> Self {
        self.expression = expression;
        self
    }
}

type ExpressionAttributes = (
    Option<collections::HashMap<String, String>>,
    Option<collections::HashMap<String, types::AttributeValue>>,
);

fn get_attributes(clauses: &[Option<&common::ExpressionInput>]) -> ExpressionAttributes {
    let mut names = None;
    let mut values = None;
    for clause in clauses.iter().flatten() {
        clause.merge_into(&mut names, &mut values);
    }
    (names, values)
}

fn get_transact_write_item<P: Serialize, K: Serialize>(
    index: usize,
    item: &TransactionItem<P, K>,
) -> Result<types::TransactWriteItem> {
    let condition = item.expression.condition_input();
    let condition_expression = condition.map(|condition| condition.expression.clone());
    let builder = types::TransactWriteItem::builder();
    let builder = match &item.operation {
        TransactionOperation::Create(payload) => {
            let (names, values) = get_attributes(&[condition]);
            let put = types::Put::builder()
                .set_item(Some(to_item(payload)?))
                .set_condition_expression(condition_expression)
                .set_expression_attribute_names(names)
                .set_expression_attribute_values(values)
                .table_name(&item.table.name)
                .build()?;
            builder.put(put)
        }
        TransactionOperation::Read(_) => {
            return Err(Error::InvalidRequestType {
                index,
                name: item.name.clone(),
                kind: item.operation.kind(),
            });
        }
        TransactionOperation::Update(query) => {
            let update = item.expression.update_input().ok_or_else(|| {
                Error::UnsetParameter(format!("update expression of transaction item {}", item.name))
            })?;
            let (names, values) = get_attributes(&[condition, Some(update)]);
            let update = types::Update::builder()
                .set_key(Some(common::key::make_key(query, &item.table)?))
                .update_expression(update.expression.clone())
                .set_condition_expression(condition_expression)
                .set_expression_attribute_names(names)
                .set_expression_attribute_values(values)
                .table_name(&item.table.name)
                .build()?;
            builder.update(update)
        }
        TransactionOperation::Delete(query) => {
            let (names, values) = get_attributes(&[condition]);
            let delete = types::Delete::builder()
                .set_key(Some(common::key::make_key(query, &item.table)?))
                .set_condition_expression(condition_expression)
                .set_expression_attribute_names(names)
                .set_expression_attribute_values(values)
                .table_name(&item.table.name)
                .build()?;
            builder.delete(delete)
        }
        TransactionOperation::ConditionCheck(query) => {
            let condition_expression = condition_expression.ok_or_else(|| {
                Error::UnsetParameter(format!(
                    "condition expression of transaction item {}",
                    item.name
                ))
            })?;
            let (names, values) = get_attributes(&[condition]);
            let condition_check = types::ConditionCheck::builder()
                .set_key(Some(common::key::make_key(query, &item.table)?))
                .condition_expression(condition_expression)
                .set_expression_attribute_names(names)
                .set_expression_attribute_values(values)
                .table_name(&item.table.name)
                .build()?;
            builder.condition_check(condition_check)
        }
    };
    Ok(builder.build())
}

/// Atomic multi-item write.
///
/// Either every item is applied or none is. When the store cancels the transaction,
/// the error names every item that carried a cancellation reason.
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::types::ScalarAttributeType;
/// use dynamodb_exec::{common, write::transact_write_items};
/// use serde_json::{Value, json};
///
/// # async fn example(client: &aws_sdk_dynamodb::Client) -> dynamodb_exec::Result<()> {
/// let table = common::key::Table::new(
///     "orders",
///     ("partition", ScalarAttributeType::S),
///     ("uuid", ScalarAttributeType::S),
/// );
/// let transaction = transact_write_items::TransactWriteItems {
///     items: vec![
///         transact_write_items::TransactionItem::new(
///             "create",
///             table.clone(),
///             transact_write_items::TransactionOperation::<Value, Value>::Create(json!({"partition": "A", "uuid": "002"})),
///         ),
///         transact_write_items::TransactionItem::new(
///             "remove",
///             table,
///             transact_write_items::TransactionOperation::Delete(common::key::Query::new(json!("A"), json!("001"))),
///         ),
///     ],
///     client_request_token: Some("order-A-002".to_string()),
///     ..Default::default()
/// };
/// transaction.send(client).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct TransactWriteItems<P, K> {
    /// The items, in submission order.
    pub items: Vec<TransactionItem<P, K>>,
    /// Idempotency token; resubmissions with the same token are applied once.
    pub client_request_token: Option<String>,
    /// Whether to return the consumed capacity information.
    pub return_consumed_capacity: Option<types::ReturnConsumedCapacity>,
    /// Whether to return item collection metrics.
    pub return_item_collection_metrics: Option<types::ReturnItemCollectionMetrics>,
}

impl<P, K> Default for TransactWriteItems<P, K> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            client_request_token: None,
            return_consumed_capacity: None,
            return_item_collection_metrics: None,
        }
    }
}

impl<P: Serialize, K: Serialize> TryFrom<&TransactWriteItems<P, K>>
    for operation::transact_write_items::TransactWriteItemsInput
{
    type Error = Error;

    fn try_from(transact_write_items: &TransactWriteItems<P, K>) -> Result<Self> {
        let count = transact_write_items.items.len();
        if count > MAX_TRANSACT_ITEMS {
            return Err(Error::TooManyItems {
                count,
                limit: MAX_TRANSACT_ITEMS,
            });
        }
        let mut transact_items = Vec::with_capacity(count);
        for (index, item) in transact_write_items.items.iter().enumerate() {
            transact_items.push(get_transact_write_item(index, item)?);
        }
        let input = Self::builder()
            .set_transact_items(Some(transact_items))
            .set_client_request_token(transact_write_items.client_request_token.clone())
            .set_return_consumed_capacity(transact_write_items.return_consumed_capacity.clone())
            .set_return_item_collection_metrics(
                transact_write_items.return_item_collection_metrics.clone(),
            )
            .build()?;
        Ok(input)
    }
}

impl<P, K> TransactWriteItems<P, K> {
    /// Maps the store's per-item cancellation reasons back onto the submitted items.
    fn get_cancellation_error(&self, reasons: &[types::CancellationReason]) -> Error {
        let failed_items: Vec<FailedItem> = reasons
            .iter()
            .enumerate()
            .filter_map(|(index, reason)| {
                let code = reason.code().unwrap_or("None");
                if code == "None" {
                    return None;
                }
                Some(FailedItem {
                    index,
                    name: self
                        .items
                        .get(index)
                        .map(|item| item.name.clone())
                        .unwrap_or_default(),
                    code: code.to_string(),
                    message: reason.message().map(str::to_string),
                })
            })
            .collect();
        let has_code = |codes: &[&str]| {
            failed_items
                .iter()
                .any(|failed_item| codes.contains(&failed_item.code.as_str()))
        };
        #[cfg(feature = "tracing")]
        tracing::warn!(
            failed = failed_items.len(),
            items = self.items.len(),
            "transaction canceled"
        );
        if has_code(&[CONDITIONAL_CHECK_FAILED]) {
            Error::ConditionCheckFailed {
                operation: OPERATION,
                failed_items,
            }
        } else if has_code(&THROTTLING[..]) {
            Error::Throttled {
                operation: OPERATION,
                failed_items,
            }
        } else if has_code(&[TRANSACTION_CONFLICT]) {
            Error::Conflict {
                operation: OPERATION,
                failed_items,
            }
        } else {
            Error::TransactionCanceled {
                operation: OPERATION,
                failed_items,
            }
        }
    }
}

impl<P: Serialize, K: Serialize> TransactWriteItems<P, K> {
    /// Execute the transaction with exactly one request.
    ///
    /// # Errors
    ///
    /// Shape problems ([`Error::TooManyItems`], [`Error::InvalidRequestType`],
    /// [`Error::UnsetParameter`]) are reported before any network call. A canceled
    /// transaction yields [`Error::ConditionCheckFailed`], [`Error::Throttled`],
    /// [`Error::Conflict`] or [`Error::TransactionCanceled`], in that precedence,
    /// each listing every failed item.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "dynamodb_exec.transact_write_items",
            skip_all,
            fields(items = self.items.len()),
            err
        )
    )]
    pub async fn send<C: StoreClient + ?Sized>(&self, client: &C) -> Result<()> {
        let input: operation::transact_write_items::TransactWriteItemsInput = self.try_into()?;
        match client.transact_write_items(input).await {
            Ok(_) => Ok(()),
            Err(err) if err.kind == RemoteErrorKind::TransactionCanceled => {
                Err(self.get_cancellation_error(&err.cancellation_reasons))
            }
            Err(err) => Err(Error::remote(OPERATION, err)),
        }
    }
}
