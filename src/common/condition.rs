use crate::{
    common::{ExpressionInput, Placeholders},
    error::{Error, Result},
};

use aws_sdk_dynamodb::types;
use serde::Serialize;
use serde_dynamo::to_attribute_value;
use std::ops;

/// Logical operator for combining conditions.
#[derive(Clone, Debug, PartialEq)]
pub enum LogicalOperator {
    /// Logical AND - all conditions must be true.
    And,
    /// Logical OR - at least one condition must be true.
    Or,
}

impl ops::Deref for LogicalOperator {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        match self {
            Self::And => " AND ",
            Self::Or => " OR ",
        }
    }
}

/// Condition types for DynamoDB expressions.
///
/// ```rust
/// use dynamodb_exec::common::condition;
///
/// let eq = condition::Condition::Equals("value".to_string());
/// let gt = condition::Condition::GreaterThan(100);
/// let null: condition::Condition<String> = condition::Condition::Null;
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Condition<T> {
    /// Checks if an attribute begins with a specified prefix (string types only).
    BeginsWith(String),
    /// Checks if an attribute value is between two values (inclusive).
    Between(T, T),
    /// Checks if an attribute contains a specified value.
    Contains(T),
    /// Checks if an attribute value equals a specified value.
    Equals(T),
    /// Checks if an attribute value is greater than a specified value.
    GreaterThan(T),
    /// Checks if an attribute value is greater than or equal to a specified value.
    GreaterThanOrEqual(T),
    /// Checks if an attribute value is in a list of specified values.
    In(Vec<T>),
    /// Checks if an attribute value is less than a specified value.
    LessThan(T),
    /// Checks if an attribute value is less than or equal to a specified value.
    LessThanOrEqual(T),
    /// Checks if an attribute does not contain a specified value.
    NotContains(T),
    /// Checks if an attribute value does not equal a specified value.
    NotEqual(T),
    /// Checks if an attribute exists (is not null).
    NotNull,
    /// Checks if an attribute does not exist (is null).
    Null,
}

impl<T: Serialize> Condition<T> {
    fn get_expression(
        self,
        path: &str,
        placeholders: &mut Placeholders,
        input: &mut ExpressionInput,
    ) -> Result<String> {
        let mut comparison = |operator: &str, prefix: &str, value: T| -> Result<String> {
            let value = to_attribute_value(value)?;
            let value_placeholder = placeholders.value(prefix, value, input);
            Ok(format!("{path} {operator} {value_placeholder}"))
        };
        let expression = match self {
            Self::Equals(value) => comparison("=", "eq", value)?,
            Self::GreaterThan(value) => comparison(">", "gt", value)?,
            Self::GreaterThanOrEqual(value) => comparison(">=", "gte", value)?,
            Self::LessThan(value) => comparison("<", "lt", value)?,
            Self::LessThanOrEqual(value) => comparison("<=", "lte", value)?,
            Self::NotEqual(value) => comparison("<>", "ne", value)?,
            Self::BeginsWith(prefix) => {
                let value_placeholder =
                    placeholders.value("begins_with", types::AttributeValue::S(prefix), input);
                format!("begins_with({path}, {value_placeholder})")
            }
            Self::Between(value1, value2) => {
                let value1 = to_attribute_value(value1)?;
                let value2 = to_attribute_value(value2)?;
                let value_placeholder_1 = placeholders.value("between", value1, input);
                let value_placeholder_2 = placeholders.value("between", value2, input);
                format!("{path} BETWEEN {value_placeholder_1} AND {value_placeholder_2}")
            }
            Self::Contains(value) => {
                let value = to_attribute_value(value)?;
                let value_placeholder = placeholders.value("contains", value, input);
                format!("contains({path}, {value_placeholder})")
            }
            Self::In(values) => {
                if values.is_empty() {
                    return Err(Error::UnsetParameter(format!(
                        "IN condition on {path} has no values"
                    )));
                }
                let mut value_placeholders = Vec::with_capacity(values.len());
                for value in values {
                    let value = to_attribute_value(value)?;
                    value_placeholders.push(placeholders.value("in", value, input));
                }
                format!("{path} IN ({})", value_placeholders.join(", "))
            }
            Self::NotContains(value) => {
                let value = to_attribute_value(value)?;
                let value_placeholder = placeholders.value("not_contains", value, input);
                format!("NOT contains({path}, {value_placeholder})")
            }
            Self::NotNull => format!("attribute_exists({path})"),
            Self::Null => format!("attribute_not_exists({path})"),
        };
        Ok(expression)
    }
}

/// Condition applied to an attribute.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyCondition<T> {
    /// The condition to apply to the attribute.
    pub condition: Condition<T>,
    /// The path of the attribute to apply the condition to, dotted for nested attributes.
    pub name: String,
}

/// A single term of a condition expression.
#[derive(Clone, Debug, PartialEq)]
pub enum ConditionTerm<T> {
    /// A condition on one attribute.
    Leaf(KeyCondition<T>),
    /// A parenthesised sub-expression.
    Group(ConditionExpression<T>),
}

/// Condition or filter expression under construction.
///
/// Terms are combined with `AND` unless the expression was created with [`Self::any`].
///
/// ```rust
/// use dynamodb_exec::common::condition::ConditionExpression;
///
/// let condition = ConditionExpression::new()
///     .greater_than_or_equal("count", 2)
///     .group(ConditionExpression::any().equals("status", 1).not_exists("status"));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ConditionExpression<T> {
    operator: LogicalOperator,
    terms: Vec<ConditionTerm<T>>,
}

impl<T> Default for ConditionExpression<T> {
    fn default() -> Self {
        Self::with_operator(LogicalOperator::And)
    }
}

impl<T> ConditionExpression<T> {
    /// An empty expression whose terms must all hold.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty expression of which at least one term must hold.
    pub fn any() -> Self {
        Self::with_operator(LogicalOperator::Or)
    }

    /// An empty expression combining its terms with `operator`.
    pub fn with_operator(operator: LogicalOperator) -> Self {
        Self {
            operator,
            terms: Vec::new(),
        }
    }

    /// Whether no term was added.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Appends a condition on the attribute at `path`.
    pub fn push(mut self, path: impl Into<String>, condition: Condition<T>) -> Self {
        self.terms.push(ConditionTerm::Leaf(KeyCondition {
            condition,
            name: path.into(),
        }));
        self
    }

    /// Appends a parenthesised sub-expression.
    pub fn group(mut self, expression: ConditionExpression<T>) -> Self {
        self.terms.push(ConditionTerm::Group(expression));
        self
    }

    /// `path = value`
    pub fn equals(self, path: impl Into<String>, value: T) -> Self {
        self.push(path, Condition::Equals(value))
    }

    /// `path <> value`
    pub fn not_equal(self, path: impl Into<String>, value: T) -> Self {
        self.push(path, Condition::NotEqual(value))
    }

    /// `path > value`
    pub fn greater_than(self, path: impl Into<String>, value: T) -> Self {
        self.push(path, Condition::GreaterThan(value))
    }

    /// `path >= value`
    pub fn greater_than_or_equal(self, path: impl Into<String>, value: T) -> Self {
        self.push(path, Condition::GreaterThanOrEqual(value))
    }

    /// `path < value`
    pub fn less_than(self, path: impl Into<String>, value: T) -> Self {
        self.push(path, Condition::LessThan(value))
    }

    /// `path <= value`
    pub fn less_than_or_equal(self, path: impl Into<String>, value: T) -> Self {
        self.push(path, Condition::LessThanOrEqual(value))
    }

    /// `path BETWEEN low AND high`
    pub fn between(self, path: impl Into<String>, low: T, high: T) -> Self {
        self.push(path, Condition::Between(low, high))
    }

    /// `path IN (values...)`
    pub fn is_in(self, path: impl Into<String>, values: Vec<T>) -> Self {
        self.push(path, Condition::In(values))
    }

    /// `begins_with(path, prefix)`
    pub fn begins_with(self, path: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.push(path, Condition::BeginsWith(prefix.into()))
    }

    /// `contains(path, value)`
    pub fn contains(self, path: impl Into<String>, value: T) -> Self {
        self.push(path, Condition::Contains(value))
    }

    /// `NOT contains(path, value)`
    pub fn not_contains(self, path: impl Into<String>, value: T) -> Self {
        self.push(path, Condition::NotContains(value))
    }

    /// `attribute_exists(path)`
    pub fn exists(self, path: impl Into<String>) -> Self {
        self.push(path, Condition::NotNull)
    }

    /// `attribute_not_exists(path)`
    pub fn not_exists(self, path: impl Into<String>) -> Self {
        self.push(path, Condition::Null)
    }
}

impl<T: Serialize> ConditionExpression<T> {
    pub(crate) fn render(self, placeholders: &mut Placeholders) -> Result<ExpressionInput> {
        self.render_recursive(placeholders, false)
    }

    fn render_recursive(
        self,
        placeholders: &mut Placeholders,
        is_nested: bool,
    ) -> Result<ExpressionInput> {
        let mut operations = Vec::with_capacity(self.terms.len());
        for term in self.terms {
            let operation = match term {
                ConditionTerm::Leaf(key_condition) => {
                    let mut operation = ExpressionInput::default();
                    let path = placeholders.path(&key_condition.name, &mut operation)?;
                    operation.expression =
                        key_condition
                            .condition
                            .get_expression(&path, placeholders, &mut operation)?;
                    operation
                }
                ConditionTerm::Group(expression) => {
                    expression.render_recursive(placeholders, true)?
                }
            };
            operations.push(operation);
        }
        let is_composite = operations
            .iter()
            .filter(|operation| !operation.expression.is_empty())
            .count()
            > 1;
        let mut operation = ExpressionInput::merge(&self.operator, operations);
        if is_nested && is_composite {
            // grouped terms keep their own precedence
            operation.expression = format!("({})", operation.expression);
        }
        Ok(operation)
    }
}
