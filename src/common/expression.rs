use crate::{
    common::{ExpressionInput, Placeholders, condition, selection},
    error::Result,
    write::update_item::UpdateExpression,
};

use aws_sdk_dynamodb::types;
use serde::Serialize;
use std::collections;

/// Rendered expression clauses sharing one placeholder namespace.
///
/// Obtained from [`ExpressionBuilder::build`]. Empty clauses are absent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Expression {
    condition: Option<ExpressionInput>,
    filter: Option<ExpressionInput>,
    update: Option<ExpressionInput>,
    projection: Option<ExpressionInput>,
}

impl Expression {
    /// The condition expression.
    pub fn condition(&self) -> Option<&str> {
        self.condition.as_ref().map(|input| input.expression.as_str())
    }

    /// The filter expression.
    pub fn filter(&self) -> Option<&str> {
        self.filter.as_ref().map(|input| input.expression.as_str())
    }

    /// The update expression.
    pub fn update(&self) -> Option<&str> {
        self.update.as_ref().map(|input| input.expression.as_str())
    }

    /// The projection expression.
    pub fn projection(&self) -> Option<&str> {
        self.projection
            .as_ref()
            .map(|input| input.expression.as_str())
    }

    /// Whether no clause is set.
    pub fn is_empty(&self) -> bool {
        self.clauses().next().is_none()
    }

    /// Every attribute name placeholder used by any clause.
    pub fn names(&self) -> collections::HashMap<String, String> {
        self.clauses()
            .flat_map(|input| input.expression_attribute_names.clone())
            .collect()
    }

    /// Every attribute value placeholder used by any clause.
    pub fn values(&self) -> collections::HashMap<String, types::AttributeValue> {
        self.clauses()
            .flat_map(|input| input.expression_attribute_values.clone())
            .collect()
    }

    fn clauses(&self) -> impl Iterator<Item = &ExpressionInput> {
        [
            &self.condition,
            &self.filter,
            &self.update,
            &self.projection,
        ]
        .into_iter()
        .flatten()
    }

    pub(crate) fn condition_input(&self) -> Option<&ExpressionInput> {
        self.condition.as_ref()
    }

    pub(crate) fn filter_input(&self) -> Option<&ExpressionInput> {
        self.filter.as_ref()
    }

    pub(crate) fn update_input(&self) -> Option<&ExpressionInput> {
        self.update.as_ref()
    }

    pub(crate) fn projection_input(&self) -> Option<&ExpressionInput> {
        self.projection.as_ref()
    }
}

/// Collects the clauses of an expression before rendering them together.
///
/// ```rust
/// use dynamodb_exec::{common, write};
///
/// let expression = common::expression::ExpressionBuilder::new()
///     .set_condition(common::condition::ConditionExpression::new().greater_than_or_equal("count", 2))
///     .set_update(
///         write::update_item::UpdateExpression::new()
///             .set_minus("count", "count", write::update_item::Operand::Value(2)),
///     )
///     .build()
///     .unwrap();
/// assert_eq!(expression.condition(), Some("#n0 >= :gte0"));
/// assert_eq!(expression.update(), Some("SET #n0 = #n0 - :set1"));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ExpressionBuilder<T> {
    condition: Option<condition::ConditionExpression<T>>,
    filter: Option<condition::ConditionExpression<T>>,
    update: Option<UpdateExpression<T>>,
    projection: Option<selection::Projection>,
}

impl<T> Default for ExpressionBuilder<T> {
    fn default() -> Self {
        Self {
            condition: None,
            filter: None,
            update: None,
            projection: None,
        }
    }
}

impl<T> ExpressionBuilder<T> {
    /// A builder with no clause.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the condition clause guarding a write.
    pub fn set_condition(mut self, condition: condition::ConditionExpression<T>) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Sets the filter clause applied to scanned items.
    pub fn set_filter(mut self, filter: condition::ConditionExpression<T>) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Sets the update clause.
    pub fn set_update(mut self, update: UpdateExpression<T>) -> Self {
        self.update = Some(update);
        self
    }

    /// Sets the attributes to return from a read.
    pub fn set_projection(mut self, projection: selection::Projection) -> Self {
        self.projection = Some(projection);
        self
    }
}

fn non_empty(input: ExpressionInput) -> Option<ExpressionInput> {
    (!input.expression.is_empty()).then_some(input)
}

impl<T: Serialize> ExpressionBuilder<T> {
    /// Renders every clause through one placeholder registry.
    ///
    /// Clauses are rendered in condition, filter, update, projection order, so the
    /// same attribute path maps to the same placeholder in all of them.
    ///
    /// # Errors
    ///
    /// [`crate::Error::UnsetParameter`] if any clause references an empty path or
    /// path segment, [`crate::Error::Serialization`] if a value cannot be converted.
    pub fn build(self) -> Result<Expression> {
        let mut placeholders = Placeholders::default();
        let condition = self
            .condition
            .map(|condition| condition.render(&mut placeholders))
            .transpose()?
            .and_then(non_empty);
        let filter = self
            .filter
            .map(|filter| filter.render(&mut placeholders))
            .transpose()?
            .and_then(non_empty);
        let update = self
            .update
            .map(|update| update.render(&mut placeholders))
            .transpose()?
            .and_then(non_empty);
        let projection = self
            .projection
            .map(|projection| projection.render(&mut placeholders))
            .transpose()?
            .and_then(non_empty);
        Ok(Expression {
            condition,
            filter,
            update,
            projection,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, write::update_item::Operand};

    use serde_json::Value;

    #[test]
    fn test_build_shares_placeholders_across_clauses() {
        let expression = ExpressionBuilder::new()
            .set_condition(
                condition::ConditionExpression::new()
                    .greater_than_or_equal("count-map.M", Value::from(2)),
            )
            .set_update(UpdateExpression::new().set_minus(
                "count-map.M",
                "count-map.M",
                Operand::Value(Value::from(2)),
            ))
            .set_projection(selection::Projection::new(["partition", "count-map.M"]))
            .build()
            .unwrap();
        assert_eq!(expression.condition(), Some("#n0.#n1 >= :gte0"));
        assert_eq!(expression.update(), Some("SET #n0.#n1 = #n0.#n1 - :set1"));
        assert_eq!(expression.projection(), Some("#n2, #n0.#n1"));
        assert_eq!(expression.filter(), None);
        assert_eq!(
            expression.names(),
            collections::HashMap::from([
                ("#n0".to_string(), "count-map".to_string()),
                ("#n1".to_string(), "M".to_string()),
                ("#n2".to_string(), "partition".to_string()),
            ])
        );
        assert_eq!(
            expression.values(),
            collections::HashMap::from([
                (":gte0".to_string(), types::AttributeValue::N("2".to_string())),
                (":set1".to_string(), types::AttributeValue::N("2".to_string())),
            ])
        );
    }

    #[test]
    fn test_build_distinct_paths_never_collide() {
        let expression = ExpressionBuilder::new()
            .set_filter(
                condition::ConditionExpression::new()
                    .equals("a.b", Value::from(1))
                    .equals("a.c", Value::from(2))
                    .equals("b", Value::from(3)),
            )
            .build()
            .unwrap();
        assert_eq!(
            expression.filter(),
            Some("#n0.#n1 = :eq0 AND #n0.#n2 = :eq1 AND #n1 = :eq2")
        );
        assert_eq!(expression.names().len(), 3);
        assert_eq!(expression.values().len(), 3);
    }

    #[test]
    fn test_build_empty_clauses_are_absent() {
        let expression = ExpressionBuilder::<Value>::new()
            .set_condition(condition::ConditionExpression::new())
            .set_update(UpdateExpression::new())
            .set_projection(selection::Projection::default())
            .build()
            .unwrap();
        assert!(expression.is_empty());
        assert_eq!(expression, Expression::default());
        assert!(expression.names().is_empty());
    }

    #[test]
    fn test_build_empty_path_fails() {
        let actual = ExpressionBuilder::<Value>::new()
            .set_projection(selection::Projection::new(["a", "b..c"]))
            .build();
        assert!(matches!(actual, Err(Error::UnsetParameter(_))));

        let actual = ExpressionBuilder::new()
            .set_update(UpdateExpression::new().remove("").add("a", Value::from(1)))
            .build();
        assert!(matches!(actual, Err(Error::UnsetParameter(_))));
    }
}
