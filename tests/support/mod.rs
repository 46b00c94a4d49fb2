#![allow(dead_code)]

use async_trait::async_trait;
use aws_sdk_dynamodb::{
    operation::{
        batch_get_item::{BatchGetItemInput, BatchGetItemOutput},
        batch_write_item::{BatchWriteItemInput, BatchWriteItemOutput},
        delete_item::{DeleteItemInput, DeleteItemOutput},
        get_item::{GetItemInput, GetItemOutput},
        put_item::{PutItemInput, PutItemOutput},
        scan::{ScanInput, ScanOutput},
        transact_write_items::{TransactWriteItemsInput, TransactWriteItemsOutput},
        update_item::{UpdateItemInput, UpdateItemOutput},
    },
    types::{AttributeValue, CancellationReason, KeysAndAttributes, WriteRequest},
};
use dynamodb_exec::{
    client::StoreClient,
    common::{Item, key::Table},
    error::{RemoteError, RemoteErrorKind},
};
use std::{
    cmp::Ordering,
    collections::{HashMap, VecDeque},
    sync::Mutex,
};

type Names = HashMap<String, String>;
type Values = HashMap<String, AttributeValue>;

#[derive(Default)]
struct State {
    items: HashMap<String, Vec<Item>>,
    calls: HashMap<&'static str, usize>,
    batch_errors: VecDeque<RemoteError>,
    cancellation: Option<Vec<&'static str>>,
    transaction_error: Option<RemoteError>,
}

/// In-memory store evaluating simple comparison conditions and arithmetic `SET` updates.
///
/// Batch calls process at most `batch_capacity` requests each and report the rest as
/// unprocessed. Batch gets answer in reverse key order.
pub struct MemoryStore {
    keys: HashMap<String, [String; 2]>,
    batch_capacity: usize,
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new(tables: &[Table]) -> Self {
        Self {
            keys: tables
                .iter()
                .map(|table| {
                    (
                        table.name.clone(),
                        [table.partition_key.name.clone(), table.sort_key.name.clone()],
                    )
                })
                .collect(),
            batch_capacity: usize::MAX,
            state: Mutex::default(),
        }
    }

    pub fn with_batch_capacity(mut self, batch_capacity: usize) -> Self {
        self.batch_capacity = batch_capacity;
        self
    }

    /// The next batch call fails with `err` instead of processing anything.
    pub fn fail_next_batch(&self, err: RemoteError) {
        self.state.lock().unwrap().batch_errors.push_back(err);
    }

    /// The next transaction is canceled with one reason code per item.
    pub fn cancel_next_transaction(&self, codes: &[&'static str]) {
        self.state.lock().unwrap().cancellation = Some(codes.to_vec());
    }

    /// The next transaction fails with `err` before any item is evaluated.
    pub fn fail_next_transaction(&self, err: RemoteError) {
        self.state.lock().unwrap().transaction_error = Some(err);
    }

    pub fn calls(&self, operation: &str) -> usize {
        let state = self.state.lock().unwrap();
        state.calls.get(operation).copied().unwrap_or_default()
    }

    pub fn insert(&self, table: &str, item: Item) {
        let key = self.key_of(table, &item);
        let mut state = self.state.lock().unwrap();
        let items = state.items.entry(table.to_string()).or_default();
        items.retain(|stored| !matches_key(&key, stored));
        items.push(item);
    }

    pub fn item(&self, table: &str, key: &Item) -> Option<Item> {
        let state = self.state.lock().unwrap();
        find(&state, table, key).cloned()
    }

    pub fn len(&self, table: &str) -> usize {
        let state = self.state.lock().unwrap();
        state.items.get(table).map_or(0, Vec::len)
    }

    fn key_of(&self, table: &str, item: &Item) -> Item {
        self.keys
            .get(table)
            .into_iter()
            .flatten()
            .filter_map(|name| item.get(name).map(|value| (name.clone(), value.clone())))
            .collect()
    }

    fn count(&self, operation: &'static str) -> std::sync::MutexGuard<'_, State> {
        let mut state = self.state.lock().unwrap();
        *state.calls.entry(operation).or_default() += 1;
        state
    }
}

pub fn s(value: &str) -> AttributeValue {
    AttributeValue::S(value.to_string())
}

pub fn n(value: i64) -> AttributeValue {
    AttributeValue::N(value.to_string())
}

pub fn throttled() -> RemoteError {
    RemoteError {
        code: Some("ProvisionedThroughputExceededException".to_string()),
        ..RemoteError::new(RemoteErrorKind::Throttled, "rate exceeded")
    }
}

fn condition_failed() -> RemoteError {
    RemoteError {
        code: Some("ConditionalCheckFailedException".to_string()),
        ..RemoteError::new(
            RemoteErrorKind::ConditionalCheckFailed,
            "The conditional request failed",
        )
    }
}

fn matches_key(key: &Item, item: &Item) -> bool {
    key.iter().all(|(name, value)| item.get(name) == Some(value))
}

fn find<'a>(state: &'a State, table: &str, key: &Item) -> Option<&'a Item> {
    state
        .items
        .get(table)
        .and_then(|items| items.iter().find(|item| matches_key(key, item)))
}

fn resolve<'a>(token: &'a str, names: &'a Names) -> &'a str {
    names.get(token).map_or(token, String::as_str)
}

fn compare(left: &AttributeValue, right: &AttributeValue) -> Option<Ordering> {
    match (left, right) {
        (AttributeValue::N(left), AttributeValue::N(right)) => left
            .parse::<f64>()
            .ok()?
            .partial_cmp(&right.parse::<f64>().ok()?),
        (AttributeValue::S(left), AttributeValue::S(right)) => Some(left.cmp(right)),
        _ if left == right => Some(Ordering::Equal),
        _ => None,
    }
}

/// Evaluates `AND`-joined comparisons and `attribute_[not_]exists` terms.
fn evaluate(condition: Option<&str>, item: Option<&Item>, names: &Names, values: &Values) -> bool {
    let Some(condition) = condition else {
        return true;
    };
    condition.split(" AND ").all(|term| {
        let term = term.trim_matches(|c: char| c == '(' || c == ')');
        if let Some(path) = term.strip_prefix("attribute_exists(") {
            return item.is_some_and(|item| item.contains_key(resolve(path, names)));
        }
        if let Some(path) = term.strip_prefix("attribute_not_exists(") {
            return !item.is_some_and(|item| item.contains_key(resolve(path, names)));
        }
        let tokens: Vec<&str> = term.split_whitespace().collect();
        let &[path, operator, value] = tokens.as_slice() else {
            panic!("unsupported condition term {term}");
        };
        let (Some(left), Some(right)) = (
            item.and_then(|item| item.get(resolve(path, names))),
            values.get(value),
        ) else {
            return false;
        };
        let ordering = compare(left, right);
        match operator {
            "=" => ordering == Some(Ordering::Equal),
            "<>" => ordering != Some(Ordering::Equal),
            "<" => ordering == Some(Ordering::Less),
            "<=" => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
            ">" => ordering == Some(Ordering::Greater),
            ">=" => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
            _ => panic!("unsupported operator {operator}"),
        }
    })
}

fn operand(token: &str, item: &Item, names: &Names, values: &Values) -> AttributeValue {
    if token.starts_with(':') {
        values[token].clone()
    } else {
        item[resolve(token, names)].clone()
    }
}

fn arithmetic(left: &AttributeValue, operator: &str, right: &AttributeValue) -> AttributeValue {
    let (AttributeValue::N(left), AttributeValue::N(right)) = (left, right) else {
        panic!("arithmetic on non numbers");
    };
    let left: i64 = left.parse().unwrap();
    let right: i64 = right.parse().unwrap();
    let result = match operator {
        "+" => left + right,
        "-" => left - right,
        _ => panic!("unsupported arithmetic {operator}"),
    };
    AttributeValue::N(result.to_string())
}

/// Applies `SET a = b`, `SET a = b + c` and `SET a = b - c` assignments.
fn apply_update(item: &mut Item, update: &str, names: &Names, values: &Values) {
    let assignments = update
        .strip_prefix("SET ")
        .unwrap_or_else(|| panic!("unsupported update {update}"));
    for assignment in assignments.split(", ") {
        let (target, source) = assignment.split_once(" = ").unwrap();
        let tokens: Vec<&str> = source.split_whitespace().collect();
        let value = match tokens[..] {
            [single] => operand(single, item, names, values),
            [left, operator, right] => arithmetic(
                &operand(left, item, names, values),
                operator,
                &operand(right, item, names, values),
            ),
            _ => panic!("unsupported assignment {assignment}"),
        };
        item.insert(resolve(target, names).to_string(), value);
    }
}

fn project(item: Item, projection: Option<&str>, names: &Names) -> Item {
    let Some(projection) = projection else {
        return item;
    };
    let paths: Vec<&str> = projection
        .split(", ")
        .map(|path| resolve(path, names))
        .collect();
    item.into_iter()
        .filter(|(name, _)| paths.contains(&name.as_str()))
        .collect()
}

#[async_trait]
impl StoreClient for MemoryStore {
    async fn put_item(&self, input: PutItemInput) -> Result<PutItemOutput, RemoteError> {
        let table = input.table_name().unwrap_or_default().to_string();
        let item = input.item().cloned().unwrap_or_default();
        let key = self.key_of(&table, &item);
        let mut state = self.count("put_item");
        let names = input.expression_attribute_names().cloned().unwrap_or_default();
        let values = input.expression_attribute_values().cloned().unwrap_or_default();
        if !evaluate(
            input.condition_expression(),
            find(&state, &table, &key),
            &names,
            &values,
        ) {
            return Err(condition_failed());
        }
        let items = state.items.entry(table).or_default();
        items.retain(|stored| !matches_key(&key, stored));
        items.push(item);
        Ok(PutItemOutput::builder().build())
    }

    async fn get_item(&self, input: GetItemInput) -> Result<GetItemOutput, RemoteError> {
        let state = self.count("get_item");
        let table = input.table_name().unwrap_or_default();
        let key = input.key().cloned().unwrap_or_default();
        let names = input.expression_attribute_names().cloned().unwrap_or_default();
        let item = find(&state, table, &key)
            .cloned()
            .map(|item| project(item, input.projection_expression(), &names));
        Ok(GetItemOutput::builder().set_item(item).build())
    }

    async fn update_item(&self, input: UpdateItemInput) -> Result<UpdateItemOutput, RemoteError> {
        let mut state = self.count("update_item");
        let table = input.table_name().unwrap_or_default().to_string();
        let key = input.key().cloned().unwrap_or_default();
        let names = input.expression_attribute_names().cloned().unwrap_or_default();
        let values = input.expression_attribute_values().cloned().unwrap_or_default();
        let current = find(&state, &table, &key).cloned();
        if !evaluate(
            input.condition_expression(),
            current.as_ref(),
            &names,
            &values,
        ) {
            return Err(condition_failed());
        }
        let mut item = current.unwrap_or_else(|| key.clone());
        apply_update(
            &mut item,
            input.update_expression().unwrap_or_default(),
            &names,
            &values,
        );
        let items = state.items.entry(table).or_default();
        items.retain(|stored| !matches_key(&key, stored));
        items.push(item.clone());
        Ok(UpdateItemOutput::builder().set_attributes(Some(item)).build())
    }

    async fn delete_item(&self, input: DeleteItemInput) -> Result<DeleteItemOutput, RemoteError> {
        let mut state = self.count("delete_item");
        let table = input.table_name().unwrap_or_default().to_string();
        let key = input.key().cloned().unwrap_or_default();
        let names = input.expression_attribute_names().cloned().unwrap_or_default();
        let values = input.expression_attribute_values().cloned().unwrap_or_default();
        if !evaluate(
            input.condition_expression(),
            find(&state, &table, &key),
            &names,
            &values,
        ) {
            return Err(condition_failed());
        }
        if let Some(items) = state.items.get_mut(&table) {
            items.retain(|stored| !matches_key(&key, stored));
        }
        Ok(DeleteItemOutput::builder().build())
    }

    async fn batch_write_item(
        &self,
        input: BatchWriteItemInput,
    ) -> Result<BatchWriteItemOutput, RemoteError> {
        let mut state = self.count("batch_write_item");
        if let Some(err) = state.batch_errors.pop_front() {
            return Err(err);
        }
        let mut capacity = self.batch_capacity;
        let mut unprocessed: HashMap<String, Vec<WriteRequest>> = HashMap::new();
        for (table, requests) in input.request_items().cloned().unwrap_or_default() {
            for request in requests {
                if capacity == 0 {
                    unprocessed.entry(table.clone()).or_default().push(request);
                    continue;
                }
                capacity -= 1;
                let items = state.items.entry(table.clone()).or_default();
                if let Some(put) = request.put_request() {
                    let key = self.key_of(&table, put.item());
                    items.retain(|stored| !matches_key(&key, stored));
                    items.push(put.item().clone());
                } else if let Some(delete) = request.delete_request() {
                    items.retain(|stored| !matches_key(delete.key(), stored));
                }
            }
        }
        Ok(BatchWriteItemOutput::builder()
            .set_unprocessed_items(Some(unprocessed))
            .build())
    }

    async fn batch_get_item(
        &self,
        input: BatchGetItemInput,
    ) -> Result<BatchGetItemOutput, RemoteError> {
        let mut state = self.count("batch_get_item");
        if let Some(err) = state.batch_errors.pop_front() {
            return Err(err);
        }
        let mut capacity = self.batch_capacity;
        let mut responses: HashMap<String, Vec<Item>> = HashMap::new();
        let mut unprocessed: HashMap<String, KeysAndAttributes> = HashMap::new();
        for (table, keys_and_attributes) in input.request_items().cloned().unwrap_or_default() {
            let names = keys_and_attributes
                .expression_attribute_names()
                .cloned()
                .unwrap_or_default();
            let mut remaining = Vec::new();
            let mut found = Vec::new();
            for key in keys_and_attributes.keys() {
                if capacity == 0 {
                    remaining.push(key.clone());
                    continue;
                }
                capacity -= 1;
                if let Some(item) = find(&state, &table, key) {
                    found.push(project(
                        item.clone(),
                        keys_and_attributes.projection_expression(),
                        &names,
                    ));
                }
            }
            found.reverse();
            responses.entry(table.clone()).or_default().extend(found);
            if !remaining.is_empty() {
                let keys_and_attributes = KeysAndAttributes::builder()
                    .set_keys(Some(remaining))
                    .set_consistent_read(keys_and_attributes.consistent_read())
                    .set_expression_attribute_names(
                        keys_and_attributes.expression_attribute_names().cloned(),
                    )
                    .set_projection_expression(
                        keys_and_attributes.projection_expression().map(str::to_string),
                    )
                    .build()
                    .unwrap();
                unprocessed.insert(table, keys_and_attributes);
            }
        }
        Ok(BatchGetItemOutput::builder()
            .set_responses(Some(responses))
            .set_unprocessed_keys(Some(unprocessed))
            .build())
    }

    async fn transact_write_items(
        &self,
        input: TransactWriteItemsInput,
    ) -> Result<TransactWriteItemsOutput, RemoteError> {
        let mut state = self.count("transact_write_items");
        if let Some(err) = state.transaction_error.take() {
            return Err(err);
        }
        let cancellation = state.cancellation.take();
        let codes = match cancellation {
            Some(codes) => codes,
            None => input
                .transact_items()
                .iter()
                .map(|transact_item| {
                    let (table, key, condition, names, values) =
                        if let Some(put) = transact_item.put() {
                            (
                                put.table_name(),
                                self.key_of(put.table_name(), put.item()),
                                put.condition_expression(),
                                put.expression_attribute_names(),
                                put.expression_attribute_values(),
                            )
                        } else if let Some(update) = transact_item.update() {
                            (
                                update.table_name(),
                                update.key().clone(),
                                update.condition_expression(),
                                update.expression_attribute_names(),
                                update.expression_attribute_values(),
                            )
                        } else if let Some(delete) = transact_item.delete() {
                            (
                                delete.table_name(),
                                delete.key().clone(),
                                delete.condition_expression(),
                                delete.expression_attribute_names(),
                                delete.expression_attribute_values(),
                            )
                        } else if let Some(check) = transact_item.condition_check() {
                            (
                                check.table_name(),
                                check.key().clone(),
                                Some(check.condition_expression()),
                                check.expression_attribute_names(),
                                check.expression_attribute_values(),
                            )
                        } else {
                            panic!("empty transaction item");
                        };
                    let passed = evaluate(
                        condition,
                        find(&state, table, &key),
                        &names.cloned().unwrap_or_default(),
                        &values.cloned().unwrap_or_default(),
                    );
                    if passed { "None" } else { "ConditionalCheckFailed" }
                })
                .collect(),
        };
        if codes.iter().any(|code| *code != "None") {
            let reasons = codes
                .iter()
                .map(|code| CancellationReason::builder().code(*code).build())
                .collect();
            return Err(RemoteError {
                code: Some("TransactionCanceledException".to_string()),
                ..RemoteError::new(RemoteErrorKind::TransactionCanceled, "transaction canceled")
                    .with_cancellation_reasons(reasons)
            });
        }
        for transact_item in input.transact_items() {
            if let Some(put) = transact_item.put() {
                let key = self.key_of(put.table_name(), put.item());
                let items = state.items.entry(put.table_name().to_string()).or_default();
                items.retain(|stored| !matches_key(&key, stored));
                items.push(put.item().clone());
            } else if let Some(update) = transact_item.update() {
                let names = update.expression_attribute_names().cloned().unwrap_or_default();
                let values = update.expression_attribute_values().cloned().unwrap_or_default();
                let mut item = find(&state, update.table_name(), update.key())
                    .cloned()
                    .unwrap_or_else(|| update.key().clone());
                apply_update(&mut item, update.update_expression(), &names, &values);
                let items = state.items.entry(update.table_name().to_string()).or_default();
                items.retain(|stored| !matches_key(update.key(), stored));
                items.push(item);
            } else if let Some(delete) = transact_item.delete() {
                if let Some(items) = state.items.get_mut(delete.table_name()) {
                    items.retain(|stored| !matches_key(delete.key(), stored));
                }
            }
        }
        Ok(TransactWriteItemsOutput::builder().build())
    }

    async fn scan(&self, input: ScanInput) -> Result<ScanOutput, RemoteError> {
        let state = self.count("scan");
        let table = input.table_name().unwrap_or_default();
        let names = input.expression_attribute_names().cloned().unwrap_or_default();
        let values = input.expression_attribute_values().cloned().unwrap_or_default();
        let stored = state.items.get(table).cloned().unwrap_or_default();
        let start = match input.exclusive_start_key() {
            Some(start_key) => stored
                .iter()
                .position(|item| matches_key(start_key, item))
                .map_or(stored.len(), |position| position + 1),
            None => 0,
        };
        let limit = input
            .limit()
            .map_or(usize::MAX, |limit| limit as usize);
        let page: Vec<Item> = stored[start..].iter().take(limit).cloned().collect();
        let last_evaluated_key = match page.last() {
            Some(last) if start + page.len() < stored.len() => Some(self.key_of(table, last)),
            _ => None,
        };
        let items = page
            .into_iter()
            .filter(|item| evaluate(input.filter_expression(), Some(item), &names, &values))
            .map(|item| project(item, input.projection_expression(), &names))
            .collect();
        Ok(ScanOutput::builder()
            .set_items(Some(items))
            .set_last_evaluated_key(last_evaluated_key)
            .build())
    }
}
