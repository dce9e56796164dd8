//! In-memory data client
//!
//! Understands the subset of client arguments the repository layer produces:
//! `where` (equality plus `equals`, `not`, `in`, `notIn`, `contains`, `gt`,
//! `gte`, `lt`, `lte`), `data`, `orderBy`, `skip`, `take` and `select`.
//! Records without an `id` get a v4 UUID on create.
//!
//! Transactions work on a snapshot of every table; commit replaces the live
//! tables with the snapshot, so the last committed transaction wins.

use crate::errors::{RepositoryError, RepositoryResult};
use crate::operation::ModelOperation;
use crate::traits::{DataClient, TransactionClient};
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use tokio::sync::RwLock;
use uuid::Uuid;

type Tables = HashMap<String, Vec<Value>>;

/// Handler for raw statements. `execute_raw` expects it to return a count.
pub type RawHandler = Arc<dyn Fn(&str, &[Value]) -> RepositoryResult<Value> + Send + Sync>;

const FILTER_OPERATORS: [&str; 9] = [
    "equals", "not", "in", "notIn", "contains", "gt", "gte", "lt", "lte",
];

#[derive(Clone, Default)]
pub struct MemoryDataClient {
    tables: Arc<RwLock<Tables>>,
    raw_handler: Option<RawHandler>,
}

impl Debug for MemoryDataClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDataClient")
            .field("has_raw_handler", &self.raw_handler.is_some())
            .finish()
    }
}

impl MemoryDataClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer raw statements with `handler`; without one they are unsupported
    pub fn with_raw_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str, &[Value]) -> RepositoryResult<Value> + Send + Sync + 'static,
    {
        self.raw_handler = Some(Arc::new(handler));
        self
    }

    /// Insert records as-is, bypassing `create`
    pub async fn seed(&self, model: &str, records: Vec<Value>) {
        self.tables
            .write()
            .await
            .entry(model.to_string())
            .or_default()
            .extend(records);
    }

    /// Current committed records of a model
    pub async fn records(&self, model: &str) -> Vec<Value> {
        self.tables
            .read()
            .await
            .get(model)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl DataClient for MemoryDataClient {
    async fn run(&self, model: &str, operation: ModelOperation, args: Value) -> RepositoryResult<Value> {
        if operation.is_read() {
            let tables = self.tables.read().await;
            query(&tables, model, operation, &args)
        } else {
            let mut tables = self.tables.write().await;
            mutate(&mut tables, model, operation, &args)
        }
    }

    async fn execute_raw(&self, query: &str, params: &[Value]) -> RepositoryResult<u64> {
        raw_count(self.raw_handler.as_ref(), query, params)
    }

    async fn query_raw(&self, query: &str, params: &[Value]) -> RepositoryResult<Value> {
        raw_rows(self.raw_handler.as_ref(), query, params)
    }

    async fn begin(&self) -> RepositoryResult<Arc<dyn TransactionClient>> {
        let snapshot = self.tables.read().await.clone();
        Ok(Arc::new(MemoryTransaction {
            live: self.tables.clone(),
            working: RwLock::new(snapshot),
            raw_handler: self.raw_handler.clone(),
            closed: AtomicBool::new(false),
        }))
    }
}

/// Snapshot transaction over a [`MemoryDataClient`]
pub struct MemoryTransaction {
    live: Arc<RwLock<Tables>>,
    working: RwLock<Tables>,
    raw_handler: Option<RawHandler>,
    closed: AtomicBool,
}

impl MemoryTransaction {
    fn ensure_open(&self) -> RepositoryResult<()> {
        if self.closed.load(AtomicOrdering::SeqCst) {
            return Err(RepositoryError::TransactionClosed);
        }
        Ok(())
    }

    fn close(&self) -> RepositoryResult<()> {
        if self.closed.swap(true, AtomicOrdering::SeqCst) {
            return Err(RepositoryError::TransactionClosed);
        }
        Ok(())
    }
}

#[async_trait]
impl DataClient for MemoryTransaction {
    async fn run(&self, model: &str, operation: ModelOperation, args: Value) -> RepositoryResult<Value> {
        self.ensure_open()?;
        if operation.is_read() {
            let tables = self.working.read().await;
            query(&tables, model, operation, &args)
        } else {
            let mut tables = self.working.write().await;
            mutate(&mut tables, model, operation, &args)
        }
    }

    async fn execute_raw(&self, query: &str, params: &[Value]) -> RepositoryResult<u64> {
        self.ensure_open()?;
        raw_count(self.raw_handler.as_ref(), query, params)
    }

    async fn query_raw(&self, query: &str, params: &[Value]) -> RepositoryResult<Value> {
        self.ensure_open()?;
        raw_rows(self.raw_handler.as_ref(), query, params)
    }

    async fn begin(&self) -> RepositoryResult<Arc<dyn TransactionClient>> {
        Err(RepositoryError::Unsupported("nested transactions".to_string()))
    }
}

#[async_trait]
impl TransactionClient for MemoryTransaction {
    async fn commit(&self) -> RepositoryResult<()> {
        self.close()?;
        let working = self.working.read().await.clone();
        *self.live.write().await = working;
        Ok(())
    }

    async fn rollback(&self) -> RepositoryResult<()> {
        self.close()
    }
}

fn raw_rows(handler: Option<&RawHandler>, query: &str, params: &[Value]) -> RepositoryResult<Value> {
    match handler {
        Some(handler) => handler(query, params),
        None => Err(RepositoryError::Unsupported(
            "raw queries require a raw handler".to_string(),
        )),
    }
}

fn raw_count(handler: Option<&RawHandler>, query: &str, params: &[Value]) -> RepositoryResult<u64> {
    let result = raw_rows(handler, query, params)?;
    result.as_u64().ok_or_else(|| {
        RepositoryError::database("$executeRaw", "$executeRaw", format!("expected a count, got {}", result))
    })
}

fn query(tables: &Tables, model: &str, operation: ModelOperation, args: &Value) -> RepositoryResult<Value> {
    let empty = Vec::new();
    let records = tables.get(model).unwrap_or(&empty);
    let filter = args.get("where");

    match operation {
        ModelOperation::FindMany => {
            let found = find(records, filter, args)?;
            Ok(Value::Array(
                found.into_iter().map(|r| project(r, args.get("select"))).collect(),
            ))
        }
        ModelOperation::FindFirst | ModelOperation::FindUnique => {
            let found = find(records, filter, args)?;
            Ok(found
                .into_iter()
                .next()
                .map(|r| project(r, args.get("select")))
                .unwrap_or(Value::Null))
        }
        ModelOperation::Count => Ok(json!(find(records, filter, args)?.len())),
        other => Err(RepositoryError::database(model, other.name(), "not a read operation")),
    }
}

fn mutate(tables: &mut Tables, model: &str, operation: ModelOperation, args: &Value) -> RepositoryResult<Value> {
    let records = tables.entry(model.to_string()).or_default();
    let select = args.get("select");

    match operation {
        ModelOperation::Create => {
            let record = new_record(model, operation, args.get("data"))?;
            records.push(record.clone());
            Ok(project(&record, select))
        }
        ModelOperation::CreateMany => {
            let data = match args.get("data") {
                Some(Value::Array(items)) => items.clone(),
                Some(single @ Value::Object(_)) => vec![single.clone()],
                _ => return Err(RepositoryError::Validation(format!("{}.createMany requires data", model))),
            };
            let mut created = Vec::with_capacity(data.len());
            for item in &data {
                created.push(new_record(model, operation, Some(item))?);
            }
            let count = created.len();
            records.extend(created);
            Ok(json!({ "count": count }))
        }
        ModelOperation::Update => {
            let index = first_match(records, required_where(model, operation, args)?)?
                .ok_or_else(|| RepositoryError::not_found(model, "no record matches update"))?;
            apply_data(&mut records[index], args.get("data"))?;
            Ok(project(&records[index], select))
        }
        ModelOperation::UpdateMany => {
            let filter = args.get("where");
            let mut count = 0usize;
            for record in records.iter_mut() {
                if matches_filter(record, filter)? {
                    apply_data(record, args.get("data"))?;
                    count += 1;
                }
            }
            Ok(json!({ "count": count }))
        }
        ModelOperation::Delete => {
            let index = first_match(records, required_where(model, operation, args)?)?
                .ok_or_else(|| RepositoryError::not_found(model, "no record matches delete"))?;
            let removed = records.remove(index);
            Ok(project(&removed, select))
        }
        ModelOperation::DeleteMany => {
            let filter = args.get("where");
            let before = records.len();
            let mut kept = Vec::with_capacity(before);
            for record in records.drain(..) {
                if !matches_filter(&record, filter)? {
                    kept.push(record);
                }
            }
            *records = kept;
            Ok(json!({ "count": before - records.len() }))
        }
        ModelOperation::Upsert => {
            let filter = required_where(model, operation, args)?;
            match first_match(records, filter)? {
                Some(index) => {
                    apply_data(&mut records[index], args.get("update"))?;
                    Ok(project(&records[index], select))
                }
                None => {
                    let record = new_record(model, operation, args.get("create"))?;
                    records.push(record.clone());
                    Ok(project(&record, select))
                }
            }
        }
        other => Err(RepositoryError::database(model, other.name(), "not a write operation")),
    }
}

fn required_where<'a>(model: &str, operation: ModelOperation, args: &'a Value) -> RepositoryResult<&'a Value> {
    args.get("where")
        .ok_or_else(|| RepositoryError::Validation(format!("{}.{} requires where", model, operation)))
}

fn new_record(model: &str, operation: ModelOperation, data: Option<&Value>) -> RepositoryResult<Value> {
    let mut record = match data {
        Some(Value::Object(fields)) => fields.clone(),
        _ => {
            return Err(RepositoryError::Validation(format!(
                "{}.{} requires object data",
                model, operation
            )));
        }
    };
    record
        .entry("id")
        .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
    Ok(Value::Object(record))
}

/// Merge `data` into `record`. Field values may be plain or one of
/// `{"set": v}`, `{"increment": n}`, `{"decrement": n}`.
fn apply_data(record: &mut Value, data: Option<&Value>) -> RepositoryResult<()> {
    let Some(Value::Object(changes)) = data else {
        return Err(RepositoryError::Validation("update requires object data".to_string()));
    };
    let Value::Object(fields) = record else {
        return Ok(());
    };

    for (field, change) in changes {
        let updated = match change.as_object().filter(|ops| ops.len() == 1) {
            Some(ops) if ops.contains_key("set") => ops["set"].clone(),
            Some(ops) if ops.contains_key("increment") || ops.contains_key("decrement") => {
                let current = fields.get(field).and_then(Value::as_f64).unwrap_or(0.0);
                let delta = ops
                    .get("increment")
                    .or_else(|| ops.get("decrement"))
                    .and_then(Value::as_f64)
                    .unwrap_or(0.0);
                let next = if ops.contains_key("increment") {
                    current + delta
                } else {
                    current - delta
                };
                number(next)
            }
            _ => change.clone(),
        };
        fields.insert(field.clone(), updated);
    }
    Ok(())
}

fn number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        json!(value as i64)
    } else {
        json!(value)
    }
}

fn first_match(records: &[Value], filter: &Value) -> RepositoryResult<Option<usize>> {
    for (index, record) in records.iter().enumerate() {
        if matches_filter(record, Some(filter))? {
            return Ok(Some(index));
        }
    }
    Ok(None)
}

fn find<'a>(records: &'a [Value], filter: Option<&Value>, args: &Value) -> RepositoryResult<Vec<&'a Value>> {
    let mut found = Vec::new();
    for record in records {
        if matches_filter(record, filter)? {
            found.push(record);
        }
    }

    if let Some(order_by) = args.get("orderBy") {
        sort(&mut found, order_by);
    }

    let skip = args.get("skip").and_then(Value::as_u64).unwrap_or(0) as usize;
    let take = args.get("take").and_then(Value::as_u64).map(|t| t as usize);

    Ok(found
        .into_iter()
        .skip(skip)
        .take(take.unwrap_or(usize::MAX))
        .collect())
}

fn matches_filter(record: &Value, filter: Option<&Value>) -> RepositoryResult<bool> {
    let conditions = match filter {
        None | Some(Value::Null) => return Ok(true),
        Some(Value::Object(conditions)) => conditions,
        Some(other) => {
            return Err(RepositoryError::Validation(format!("where must be an object, got {}", other)));
        }
    };

    for (field, condition) in conditions {
        let actual = record.get(field).unwrap_or(&Value::Null);
        let satisfied = match operator_map(condition) {
            Some(operators) => operators
                .iter()
                .all(|(operator, expected)| check(actual, operator, expected)),
            None => actual == condition,
        };
        if !satisfied {
            return Ok(false);
        }
    }
    Ok(true)
}

/// A condition object made only of known operators; anything else is a literal
fn operator_map(condition: &Value) -> Option<&Map<String, Value>> {
    condition
        .as_object()
        .filter(|ops| !ops.is_empty() && ops.keys().all(|k| FILTER_OPERATORS.contains(&k.as_str())))
}

fn check(actual: &Value, operator: &str, expected: &Value) -> bool {
    match operator {
        "equals" => actual == expected,
        "not" => match operator_map(expected) {
            Some(inner) => !inner.iter().all(|(op, value)| check(actual, op, value)),
            None => actual != expected,
        },
        "in" => expected.as_array().is_some_and(|items| items.contains(actual)),
        "notIn" => expected.as_array().is_none_or(|items| !items.contains(actual)),
        "contains" => match (actual, expected) {
            (Value::String(haystack), Value::String(needle)) => haystack.contains(needle.as_str()),
            (Value::Array(items), needle) => items.contains(needle),
            _ => false,
        },
        "gt" => compare(actual, expected) == Some(Ordering::Greater),
        "gte" => matches!(compare(actual, expected), Some(Ordering::Greater | Ordering::Equal)),
        "lt" => compare(actual, expected) == Some(Ordering::Less),
        "lte" => matches!(compare(actual, expected), Some(Ordering::Less | Ordering::Equal)),
        _ => false,
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// `orderBy` is `{field: "asc"|"desc"}` or an array of such objects
fn sort(records: &mut [&Value], order_by: &Value) {
    let keys: Vec<(String, bool)> = match order_by {
        Value::Array(items) => items.iter().filter_map(Value::as_object).flat_map(sort_keys).collect(),
        Value::Object(fields) => sort_keys(fields),
        _ => Vec::new(),
    };

    records.sort_by(|a, b| {
        for (field, descending) in &keys {
            let left = a.get(field).unwrap_or(&Value::Null);
            let right = b.get(field).unwrap_or(&Value::Null);
            // Nulls and mismatched types sort last
            let ordering = match (left.is_null(), right.is_null()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => compare(left, right).unwrap_or(Ordering::Equal),
            };
            let ordering = if *descending && !left.is_null() && !right.is_null() {
                ordering.reverse()
            } else {
                ordering
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

fn sort_keys(fields: &Map<String, Value>) -> Vec<(String, bool)> {
    fields
        .iter()
        .map(|(field, direction)| (field.clone(), direction.as_str() == Some("desc")))
        .collect()
}

/// Apply `select: {field: true}`; without one the record is returned whole
fn project(record: &Value, select: Option<&Value>) -> Value {
    let (Some(Value::Object(select)), Value::Object(fields)) = (select, record) else {
        return record.clone();
    };

    let projected: Map<String, Value> = fields
        .iter()
        .filter(|(field, _)| select.get(*field).and_then(Value::as_bool).unwrap_or(false))
        .map(|(field, value)| (field.clone(), value.clone()))
        .collect();
    Value::Object(projected)
}
