use crate::{
    client::StoreClient,
    common::{self, ExpressionInput, Placeholders},
    error::{Error, Result},
    write,
};

use aws_sdk_dynamodb::operation;
use serde::Serialize;
use serde_dynamo::to_attribute_value;

/// Right hand side of an update action.
///
/// ```rust
/// use dynamodb_exec::write::update_item::Operand;
///
/// let literal = Operand::Value(2);
/// let stored: Operand<i32> = Operand::Path("limits.max".to_string());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Operand<T> {
    /// A literal value.
    Value(T),
    /// The current stored value of another attribute, by dotted path.
    Path(String),
}

impl<T: Serialize> Operand<T> {
    fn render(
        self,
        prefix: &str,
        placeholders: &mut Placeholders,
        input: &mut ExpressionInput,
    ) -> Result<String> {
        match self {
            Self::Value(value) => {
                let value = to_attribute_value(value)?;
                Ok(placeholders.value(prefix, value, input))
            }
            Self::Path(path) => placeholders.path(&path, input),
        }
    }
}

/// SET action for updating attributes.
#[derive(Clone, Debug, PartialEq)]
pub enum SetInput<T> {
    /// `target = operand`
    Assign(Operand<T>),
    /// `target = source + operand`
    Plus(String, Operand<T>),
    /// `target = source - operand`
    Minus(String, Operand<T>),
    /// `target = if_not_exists(target, operand)`
    IfNotExists(Operand<T>),
    /// `target = list_append(source, operand)`
    ListAppend(String, Operand<T>),
}

impl<T: Serialize> SetInput<T> {
    fn get_set_expression(
        self,
        target: &str,
        placeholders: &mut Placeholders,
        input: &mut ExpressionInput,
    ) -> Result<String> {
        let expression = match self {
            Self::Assign(operand) => {
                let operand = operand.render("set", placeholders, input)?;
                format!("{target} = {operand}")
            }
            Self::Plus(source, operand) => {
                let source = placeholders.path(&source, input)?;
                let operand = operand.render("set", placeholders, input)?;
                format!("{target} = {source} + {operand}")
            }
            Self::Minus(source, operand) => {
                let source = placeholders.path(&source, input)?;
                let operand = operand.render("set", placeholders, input)?;
                format!("{target} = {source} - {operand}")
            }
            Self::IfNotExists(operand) => {
                let operand = operand.render("set", placeholders, input)?;
                format!("{target} = if_not_exists({target}, {operand})")
            }
            Self::ListAppend(source, operand) => {
                let source = placeholders.path(&source, input)?;
                let operand = operand.render("set", placeholders, input)?;
                format!("{target} = list_append({source}, {operand})")
            }
        };
        Ok(expression)
    }
}

#[derive(Clone, Debug, PartialEq)]
enum UpdateAction<T> {
    Set(String, SetInput<T>),
    Remove(String),
    Add(String, T),
    Delete(String, T),
}

/// Update expression under construction.
///
/// Actions are rendered grouped by clause in `SET`, `REMOVE`, `ADD`, `DELETE` order,
/// keeping insertion order within each clause.
///
/// ```rust
/// use dynamodb_exec::write::update_item::{Operand, UpdateExpression};
///
/// let update = UpdateExpression::new()
///     .set_minus("count", "count", Operand::Value(2))
///     .remove("expired_at");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateExpression<T> {
    actions: Vec<UpdateAction<T>>,
}

impl<T> Default for UpdateExpression<T> {
    fn default() -> Self {
        Self {
            actions: Vec::new(),
        }
    }
}

impl<T> UpdateExpression<T> {
    /// An update with no actions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no action was added.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Appends a SET action on `target`.
    pub fn push_set(mut self, target: impl Into<String>, input: SetInput<T>) -> Self {
        self.actions.push(UpdateAction::Set(target.into(), input));
        self
    }

    /// `SET target = operand`
    pub fn set(self, target: impl Into<String>, operand: Operand<T>) -> Self {
        self.push_set(target, SetInput::Assign(operand))
    }

    /// `SET target = source + operand`
    pub fn set_plus(
        self,
        target: impl Into<String>,
        source: impl Into<String>,
        operand: Operand<T>,
    ) -> Self {
        self.push_set(target, SetInput::Plus(source.into(), operand))
    }

    /// `SET target = source - operand`
    pub fn set_minus(
        self,
        target: impl Into<String>,
        source: impl Into<String>,
        operand: Operand<T>,
    ) -> Self {
        self.push_set(target, SetInput::Minus(source.into(), operand))
    }

    /// `SET target = if_not_exists(target, operand)`
    pub fn set_if_not_exists(self, target: impl Into<String>, operand: Operand<T>) -> Self {
        self.push_set(target, SetInput::IfNotExists(operand))
    }

    /// `SET target = list_append(source, operand)`
    pub fn list_append(
        self,
        target: impl Into<String>,
        source: impl Into<String>,
        operand: Operand<T>,
    ) -> Self {
        self.push_set(target, SetInput::ListAppend(source.into(), operand))
    }

    /// `ADD path value`, for numbers and sets.
    pub fn add(mut self, path: impl Into<String>, value: T) -> Self {
        self.actions.push(UpdateAction::Add(path.into(), value));
        self
    }

    /// `DELETE path value`, removing elements from a set.
    pub fn delete(mut self, path: impl Into<String>, value: T) -> Self {
        self.actions.push(UpdateAction::Delete(path.into(), value));
        self
    }

    /// `REMOVE path`
    pub fn remove(mut self, path: impl Into<String>) -> Self {
        self.actions.push(UpdateAction::Remove(path.into()));
        self
    }
}

fn get_clause(keyword: &str, operations: Vec<ExpressionInput>) -> ExpressionInput {
    let mut operation = ExpressionInput::merge(", ", operations);
    if !operation.expression.is_empty() {
        operation.expression = format!("{keyword} {}", operation.expression);
    }
    operation
}

impl<T: Serialize> UpdateExpression<T> {
    pub(crate) fn render(self, placeholders: &mut Placeholders) -> Result<ExpressionInput> {
        let mut set = Vec::new();
        let mut remove = Vec::new();
        let mut add = Vec::new();
        let mut delete = Vec::new();
        for action in self.actions {
            match action {
                UpdateAction::Set(target, input) => set.push((target, input)),
                UpdateAction::Remove(path) => remove.push(path),
                UpdateAction::Add(path, value) => add.push((path, value)),
                UpdateAction::Delete(path, value) => delete.push((path, value)),
            }
        }

        let mut operations = Vec::with_capacity(set.len());
        for (target, input) in set {
            let mut operation = ExpressionInput::default();
            let target = placeholders.path(&target, &mut operation)?;
            operation.expression =
                input.get_set_expression(&target, placeholders, &mut operation)?;
            operations.push(operation);
        }
        let set = get_clause("SET", operations);

        let mut operations = Vec::with_capacity(remove.len());
        for path in remove {
            let mut operation = ExpressionInput::default();
            operation.expression = placeholders.path(&path, &mut operation)?;
            operations.push(operation);
        }
        let remove = get_clause("REMOVE", operations);

        let mut clauses = vec![set, remove];
        for (keyword, prefix, actions) in [("ADD", "add", add), ("DELETE", "delete", delete)] {
            let mut operations = Vec::with_capacity(actions.len());
            for (path, value) in actions {
                let mut operation = ExpressionInput::default();
                let path = placeholders.path(&path, &mut operation)?;
                let value = to_attribute_value(value)?;
                let value_placeholder = placeholders.value(prefix, value, &mut operation);
                operation.expression = format!("{path} {value_placeholder}");
                operations.push(operation);
            }
            clauses.push(get_clause(keyword, operations));
        }
        Ok(ExpressionInput::merge(" ", clauses))
    }
}

/// Update item operation.
///
/// The update clause is taken from `write_args.expression` and is required; the
/// condition clause, when present, guards the update.
///
/// ```rust,no_run
/// use dynamodb_exec::{common, write};
/// use serde_json::Value;
///
/// # async fn example(client: &aws_sdk_dynamodb::Client) -> dynamodb_exec::Result<()> {
/// let expression = common::expression::ExpressionBuilder::new()
///     .set_condition(common::condition::ConditionExpression::new().greater_than_or_equal("count", Value::from(2)))
///     .set_update(write::update_item::UpdateExpression::new().set_minus("count", "count", write::update_item::Operand::Value(Value::from(2))))
///     .build()?;
/// let update_item = write::update_item::UpdateItem {
///     keys: common::key::Keys {
///         partition_key: common::key::Key {
///             name: "partition".to_string(),
///             value: Value::from("A"),
///         },
///         sort_key: Some(common::key::Key {
///             name: "uuid".to_string(),
///             value: Value::from("001"),
///         }),
///     },
///     write_args: write::common::WriteArgs {
///         expression,
///         table_name: "orders".to_string(),
///         ..Default::default()
///     },
/// };
/// update_item.send(client).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateItem<T> {
    /// The primary key of the item to update.
    pub keys: common::key::Keys<T>,
    /// Additional write operation arguments (table name, expression, return values, etc.).
    pub write_args: write::common::WriteArgs,
}

impl<T: Serialize> TryFrom<UpdateItem<T>> for operation::update_item::UpdateItemInput {
    type Error = Error;

    fn try_from(update_item: UpdateItem<T>) -> Result<Self> {
        let update = update_item
            .write_args
            .expression
            .update_input()
            .cloned()
            .ok_or_else(|| Error::UnsetParameter("update expression".to_string()))?;
        let keys: common::Item = update_item.keys.try_into()?;
        let mut write_operation: write::common::WriteInput = update_item.write_args.into();
        let update_expression = write_operation.merge_expression(&update);
        let builder = Self::builder()
            .set_key(Some(keys))
            .update_expression(update_expression);
        let input = crate::apply_write_operation!(builder, write_operation).build()?;
        Ok(input)
    }
}

impl<T: Serialize> UpdateItem<T> {
    /// Execute the update item operation.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_exec.update_item", skip_all, err)
    )]
    pub async fn send<C: StoreClient + ?Sized>(
        self,
        client: &C,
    ) -> Result<operation::update_item::UpdateItemOutput> {
        let input: operation::update_item::UpdateItemInput = self.try_into()?;
        client
            .update_item(input)
            .await
            .map_err(|err| Error::remote("update_item", err))
    }
}
