use crate::{
    common::Item,
    error::Result,
    write::update_item::{Operand, UpdateExpression},
};

use aws_sdk_dynamodb::types;
use serde::Serialize;
use serde_dynamo::to_attribute_value;
use std::collections;

/// Key component.
///
/// ```rust
/// use dynamodb_exec::common::key;
///
/// let key = key::Key {
///     name: "id".to_string(),
///     value: "1".to_string(),
/// };
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Key<T> {
    /// The attribute name of the key.
    pub name: String,
    /// The value of the key.
    pub value: T,
}

/// Primary key (partition key and optional sort key).
///
/// ```rust
/// use dynamodb_exec::common::key;
///
/// let keys = key::Keys {
///     partition_key: key::Key {
///         name: "id".to_string(),
///         value: "1".to_string(),
///     },
///     ..Default::default()
/// };
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Keys<T> {
    /// The partition key (required).
    pub partition_key: Key<T>,
    /// The sort key (optional, only for tables with composite primary keys).
    pub sort_key: Option<Key<T>>,
}

impl<T: Serialize> TryFrom<Keys<T>> for collections::HashMap<String, types::AttributeValue> {
    type Error = serde_dynamo::Error;

    fn try_from(key: Keys<T>) -> serde_dynamo::Result<Self> {
        let partition_key_value = to_attribute_value(key.partition_key.value)?;
        let mut keys = Self::from([(key.partition_key.name, partition_key_value)]);
        if let Some(sort_key) = key.sort_key {
            let sort_key_value = to_attribute_value(sort_key.value)?;
            keys.insert(sort_key.name, sort_key_value);
        }
        Ok(keys)
    }
}

/// Declared name and scalar type of a key attribute.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct KeySchema {
    /// The attribute name.
    pub name: String,
    /// The attribute type (`S`, `N` or `B`).
    pub attribute_type: types::ScalarAttributeType,
}

impl KeySchema {
    /// Creates a key schema entry.
    pub fn new(name: impl Into<String>, attribute_type: types::ScalarAttributeType) -> Self {
        Self {
            name: name.into(),
            attribute_type,
        }
    }
}

/// Static description of a table with a composite primary key.
///
/// ```rust
/// use aws_sdk_dynamodb::types::ScalarAttributeType;
/// use dynamodb_exec::common::key::Table;
///
/// let table = Table::new(
///     "orders",
///     ("partition", ScalarAttributeType::S),
///     ("uuid", ScalarAttributeType::S),
/// );
/// assert_eq!(table.partition_key.name, "partition");
/// ```
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Table {
    /// The table name.
    pub name: String,
    /// The partition (hash) key.
    pub partition_key: KeySchema,
    /// The sort (range) key.
    pub sort_key: KeySchema,
}

impl Table {
    /// Creates a table description from `(name, type)` pairs for both keys.
    pub fn new(
        name: impl Into<String>,
        partition_key: (impl Into<String>, types::ScalarAttributeType),
        sort_key: (impl Into<String>, types::ScalarAttributeType),
    ) -> Self {
        Self {
            name: name.into(),
            partition_key: KeySchema::new(partition_key.0, partition_key.1),
            sort_key: KeySchema::new(sort_key.0, sort_key.1),
        }
    }

    /// The primary key a query selects, named after this table's key attributes.
    pub fn keys<'a, K>(&self, query: &'a Query<K>) -> Keys<&'a K> {
        Keys {
            partition_key: Key {
                name: self.partition_key.name.clone(),
                value: &query.partition_value,
            },
            sort_key: Some(Key {
                name: self.sort_key.name.clone(),
                value: &query.sort_value,
            }),
        }
    }
}

/// Per-call key selector, optionally carrying a single attribute update.
///
/// ```rust
/// use dynamodb_exec::common::key::Query;
///
/// let mut query = Query::new("A".to_string(), "001".to_string());
/// query.update_current("count-map.M", "2".to_string());
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query<K> {
    /// Value of the table's partition key.
    pub partition_value: K,
    /// Value of the table's sort key.
    pub sort_value: K,
    /// Attribute path to update, dotted for nested attributes.
    pub update_field_path: Option<String>,
    /// Value to assign to `update_field_path`.
    pub update_value: Option<K>,
}

impl<K> Query<K> {
    /// Creates a query selecting one item.
    pub fn new(partition_value: K, sort_value: K) -> Self {
        Self {
            partition_value,
            sort_value,
            update_field_path: None,
            update_value: None,
        }
    }

    /// Sets the attribute to update and its new value.
    pub fn update_current(&mut self, path: impl Into<String>, value: K) -> &mut Self {
        self.update_field_path = Some(path.into());
        self.update_value = Some(value);
        self
    }
}

impl<K: Clone> Query<K> {
    /// An update expression assigning `update_value` to `update_field_path`, if both are set.
    pub fn update_expression(&self) -> Option<UpdateExpression<K>> {
        match (&self.update_field_path, &self.update_value) {
            (Some(path), Some(value)) => {
                Some(UpdateExpression::new().set(path.clone(), Operand::Value(value.clone())))
            }
            _ => None,
        }
    }
}

/// Builds the primary key of the item a query selects, using the table's key names.
pub fn make_key<K: Serialize>(query: &Query<K>, table: &Table) -> Result<Item> {
    let keys: Item = table.keys(query).try_into()?;
    Ok(keys)
}
