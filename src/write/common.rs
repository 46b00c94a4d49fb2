use crate::common;

use aws_sdk_dynamodb::types;
use std::collections;

/// Internal representation of write operation parameters.
///
/// Holds the condition clause of a [`WriteArgs`] expression together with only the
/// attribute names and values that clause references. Operations sending more clauses
/// add them through [`WriteInput::merge_expression`].
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct WriteInput {
    pub(crate) condition_expression: Option<String>,
    pub(crate) expression_attribute_names: Option<collections::HashMap<String, String>>,
    pub(crate) expression_attribute_values:
        Option<collections::HashMap<String, types::AttributeValue>>,
    pub(crate) return_consumed_capacity: Option<types::ReturnConsumedCapacity>,
    pub(crate) return_item_collection_metrics: Option<types::ReturnItemCollectionMetrics>,
    pub(crate) return_values: Option<types::ReturnValue>,
    pub(crate) return_values_on_condition_check_failure:
        Option<types::ReturnValuesOnConditionCheckFailure>,
    pub(crate) table_name: String,
}

impl WriteInput {
    /// Merge an expression clause into this write operation, returning its text.
    pub(crate) fn merge_expression(&mut self, operation: &common::ExpressionInput) -> String {
        operation.merge_into(
            &mut self.expression_attribute_names,
            &mut self.expression_attribute_values,
        );
        operation.expression.clone()
    }
}

/// Arguments common to all write operations (Put, Update, Delete).
///
/// These arguments apply to operations that modify data in DynamoDB tables.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WriteArgs {
    /// Expression clauses of the write.
    ///
    /// The condition clause, if set, must hold on the stored item for the write to
    /// proceed; otherwise the write fails with
    /// [`crate::Error::ConditionCheckFailed`]. Update operations also read the update
    /// clause from here.
    pub expression: common::expression::Expression,
    /// Whether to return the consumed capacity information.
    pub return_consumed_capacity: Option<types::ReturnConsumedCapacity>,
    /// Whether to return item collection metrics.
    pub return_item_collection_metrics: Option<types::ReturnItemCollectionMetrics>,
    /// Which item attributes to return in the response.
    ///
    /// Options: `AllOld`, `AllNew`, `UpdatedOld`, `UpdatedNew`, or `None`.
    pub return_values: Option<types::ReturnValue>,
    /// Which item attributes to return if a condition check fails.
    pub return_values_on_condition_check_failure:
        Option<types::ReturnValuesOnConditionCheckFailure>,
    /// The name of the table to write to.
    pub table_name: String,
}

impl From<WriteArgs> for WriteInput {
    fn from(write_args: WriteArgs) -> Self {
        let mut operation = Self {
            return_consumed_capacity: write_args.return_consumed_capacity,
            return_item_collection_metrics: write_args.return_item_collection_metrics,
            return_values: write_args.return_values,
            return_values_on_condition_check_failure: write_args
                .return_values_on_condition_check_failure,
            table_name: write_args.table_name,
            ..Default::default()
        };
        if let Some(condition) = write_args.expression.condition_input() {
            operation.condition_expression = Some(operation.merge_expression(condition));
        }
        operation
    }
}

/// apply common write operation settings to a request builder
#[doc(hidden)]
#[macro_export]
macro_rules! apply_write_operation {
    ($builder:expr, $write_operation:expr) => {
        $builder
            .set_condition_expression($write_operation.condition_expression)
            .set_expression_attribute_names($write_operation.expression_attribute_names)
            .set_expression_attribute_values($write_operation.expression_attribute_values)
            .set_return_consumed_capacity($write_operation.return_consumed_capacity)
            .set_return_item_collection_metrics($write_operation.return_item_collection_metrics)
            .set_return_values($write_operation.return_values)
            .set_return_values_on_condition_check_failure(
                $write_operation.return_values_on_condition_check_failure,
            )
            .table_name($write_operation.table_name)
    };
}
