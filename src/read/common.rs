use crate::common;

use aws_sdk_dynamodb::types;
use std::collections;

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct SingleReadInput {
    pub(crate) consistent_read: Option<bool>,
    pub(crate) expression_attribute_names: Option<collections::HashMap<String, String>>,
    pub(crate) projection_expression: Option<String>,
    pub(crate) table_name: String,
}

/// Arguments for single-item read operations (GetItem, BatchGetItem).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SingleReadArgs {
    /// Whether to use a consistent read.
    ///
    /// `true` for strongly consistent reads, `false` or `None` for eventually consistent reads.
    /// Consistent reads consume more capacity units but guarantee you see the latest data.
    pub consistent_read: Option<bool>,
    /// Expression whose projection clause selects the attributes to retrieve.
    ///
    /// Without a projection clause all attributes are retrieved. Other clauses are ignored.
    pub expression: common::expression::Expression,
    /// The name of the table to read from.
    pub table_name: String,
}

impl From<SingleReadArgs> for SingleReadInput {
    fn from(single_read_args: SingleReadArgs) -> Self {
        let mut operation = Self {
            consistent_read: single_read_args.consistent_read,
            table_name: single_read_args.table_name,
            ..Default::default()
        };
        if let Some(projection) = single_read_args.expression.projection_input() {
            let mut expression_attribute_values = None;
            projection.merge_into(
                &mut operation.expression_attribute_names,
                &mut expression_attribute_values,
            );
            operation.projection_expression = Some(projection.expression.clone());
        }
        operation
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct MultipleReadInput {
    pub(crate) consistent_read: Option<bool>,
    pub(crate) exclusive_start_key: Option<common::Item>,
    pub(crate) expression_attribute_names: Option<collections::HashMap<String, String>>,
    pub(crate) expression_attribute_values:
        Option<collections::HashMap<String, types::AttributeValue>>,
    pub(crate) filter_expression: Option<String>,
    pub(crate) index_name: Option<String>,
    pub(crate) limit: Option<i32>,
    pub(crate) projection_expression: Option<String>,
    pub(crate) select: Option<types::Select>,
    pub(crate) table_name: String,
}

/// Arguments for multiple-item read operations (Scan).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MultipleReadArgs {
    /// Whether to use a consistent read.
    pub consistent_read: Option<bool>,
    /// The exclusive start key for pagination.
    ///
    /// Used to continue a previous Scan from where it left off, typically the
    /// `last_evaluated_key` of the previous page.
    pub exclusive_start_key: Option<common::Item>,
    /// Expression whose filter and projection clauses apply to the read.
    pub expression: common::expression::Expression,
    /// The name of a global secondary index or local secondary index to read.
    pub index_name: Option<String>,
    /// The maximum number of items to evaluate (not necessarily the number of matching items).
    pub limit: Option<i32>,
    /// Which attributes to return.
    ///
    /// Use `Select::AllAttributes` (default), `Select::AllProjectedAttributes`,
    /// `Select::SpecificAttributes` (with a projection clause), or `Select::Count`.
    pub select: Option<types::Select>,
    /// The name of the table to read from.
    pub table_name: String,
}

impl From<MultipleReadArgs> for MultipleReadInput {
    fn from(multiple_read_args: MultipleReadArgs) -> Self {
        let mut operation = Self {
            consistent_read: multiple_read_args.consistent_read,
            exclusive_start_key: multiple_read_args.exclusive_start_key,
            index_name: multiple_read_args.index_name,
            limit: multiple_read_args.limit,
            select: multiple_read_args.select,
            table_name: multiple_read_args.table_name,
            ..Default::default()
        };
        let expression = &multiple_read_args.expression;
        if let Some(filter) = expression.filter_input() {
            filter.merge_into(
                &mut operation.expression_attribute_names,
                &mut operation.expression_attribute_values,
            );
            operation.filter_expression = Some(filter.expression.clone());
        }
        if let Some(projection) = expression.projection_input() {
            projection.merge_into(
                &mut operation.expression_attribute_names,
                &mut operation.expression_attribute_values,
            );
            operation.projection_expression = Some(projection.expression.clone());
        }
        operation
    }
}

/// apply common single read operation settings to a builder
#[doc(hidden)]
#[macro_export]
macro_rules! apply_single_read_operation {
    ($builder:expr, $single_read_operation:expr) => {
        $builder
            .set_consistent_read($single_read_operation.consistent_read)
            .set_expression_attribute_names($single_read_operation.expression_attribute_names)
            .set_projection_expression($single_read_operation.projection_expression)
    };
}

/// apply common multiple read operation settings to a builder
#[doc(hidden)]
#[macro_export]
macro_rules! apply_multiple_read_operation {
    ($builder:expr, $multiple_read_operation:expr) => {
        $builder
            .set_consistent_read($multiple_read_operation.consistent_read)
            .set_exclusive_start_key($multiple_read_operation.exclusive_start_key)
            .set_expression_attribute_names($multiple_read_operation.expression_attribute_names)
            .set_expression_attribute_values($multiple_read_operation.expression_attribute_values)
            .set_filter_expression($multiple_read_operation.filter_expression)
            .set_index_name($multiple_read_operation.index_name)
            .set_limit($multiple_read_operation.limit)
            .set_projection_expression($multiple_read_operation.projection_expression)
            .set_select($multiple_read_operation.select)
            .table_name($multiple_read_operation.table_name)
    };
}
