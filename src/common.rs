//! Common utilities for DynamoDB operations.
//!
//! This module provides shared types and utilities used across read and write operations,
//! including the table and key model, condition expressions, attribute selection and the
//! expression builder tying them together.

/// Condition expression building for filters and conditional writes.
pub mod condition;

/// Expression builder merging every clause into one placeholder namespace.
pub mod expression;

/// Table and key types for identifying items in DynamoDB tables.
pub mod key;

/// Attribute selection for projection expressions.
pub mod selection;

use crate::error::{Error, Result};

use aws_sdk_dynamodb::types;
use indexmap::IndexMap;
use std::collections;

/// Separator for attribute path components.
pub(crate) const PATH_SEPARATOR: char = '.';

/// An attribute map, as stored in a table.
pub type Item = collections::HashMap<String, types::AttributeValue>;

fn get_expression(left: String, operator: &str, right: String) -> String {
    if left.is_empty() {
        right
    } else if right.is_empty() {
        left
    } else {
        format!("{left}{operator}{right}")
    }
}

/// expression operation
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct ExpressionInput {
    pub(crate) expression: String,
    pub(crate) expression_attribute_names: collections::HashMap<String, String>,
    pub(crate) expression_attribute_values: collections::HashMap<String, types::AttributeValue>,
}

impl ExpressionInput {
    pub(crate) fn merge(operator: &str, items: Vec<Self>) -> Self {
        let mut operation = Self::default();
        for item in items {
            operation
                .expression_attribute_names
                .extend(item.expression_attribute_names);
            operation
                .expression_attribute_values
                .extend(item.expression_attribute_values);
            operation.expression = get_expression(operation.expression, operator, item.expression);
        }
        operation
    }

    pub(crate) fn merge_into(
        &self,
        names: &mut Option<collections::HashMap<String, String>>,
        values: &mut Option<collections::HashMap<String, types::AttributeValue>>,
    ) {
        if !self.expression_attribute_names.is_empty() {
            names
                .get_or_insert_with(collections::HashMap::new)
                .extend(self.expression_attribute_names.clone());
        }
        if !self.expression_attribute_values.is_empty() {
            values
                .get_or_insert_with(collections::HashMap::new)
                .extend(self.expression_attribute_values.clone());
        }
    }
}

/// Placeholder namespace shared by every clause of one expression.
///
/// Each distinct attribute name gets one `#n{i}` placeholder for the lifetime of the
/// registry, so the same path always renders to the same text and two different paths
/// never do. Value placeholders are never shared.
#[derive(Debug, Default)]
pub(crate) struct Placeholders {
    names: IndexMap<String, String>,
    values: usize,
}

impl Placeholders {
    fn name(&mut self, name: &str) -> String {
        let index = self.names.len();
        self.names
            .entry(name.to_string())
            .or_insert_with(|| format!("#n{index}"))
            .clone()
    }

    /// Renders a dotted path (`a.b[1].c`) with one placeholder per segment and records
    /// the names it used in `input`.
    pub(crate) fn path(&mut self, path: &str, input: &mut ExpressionInput) -> Result<String> {
        if path.is_empty() {
            return Err(Error::UnsetParameter("attribute path is empty".to_string()));
        }
        let mut rendered = Vec::new();
        for segment in path.split(PATH_SEPARATOR) {
            let (name, index) = split_list_index(segment);
            if name.is_empty() {
                return Err(Error::UnsetParameter(format!(
                    "attribute path {path:?} has an empty segment"
                )));
            }
            let placeholder = self.name(name);
            input
                .expression_attribute_names
                .insert(placeholder.clone(), name.to_string());
            rendered.push(format!("{placeholder}{index}"));
        }
        Ok(rendered.join("."))
    }

    /// Registers a literal value and returns its placeholder.
    pub(crate) fn value(
        &mut self,
        prefix: &str,
        value: types::AttributeValue,
        input: &mut ExpressionInput,
    ) -> String {
        let placeholder = format!(":{prefix}{}", self.values);
        self.values += 1;
        input
            .expression_attribute_values
            .insert(placeholder.clone(), value);
        placeholder
    }
}

/// Splits `items[0][1]` into `("items", "[0][1]")`; anything else is a plain name.
fn split_list_index(segment: &str) -> (&str, &str) {
    match segment.find('[') {
        Some(start)
            if segment.ends_with(']')
                && segment[start..]
                    .chars()
                    .all(|c| c.is_ascii_digit() || c == '[' || c == ']') =>
        {
            segment.split_at(start)
        }
        _ => (segment, ""),
    }
}
