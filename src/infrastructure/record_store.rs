use crate::infrastructure::error::CoreError;
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gte,
}

/// Column filter applied to a table read or write. Only the two comparison
/// shapes the core actually issues are modeled.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            op: FilterOp::Eq,
            value: value.into(),
        }
    }

    pub fn gte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            op: FilterOp::Gte,
            value: value.into(),
        }
    }

    pub fn matches(&self, row: &Value) -> bool {
        let candidate = row.get(&self.column).unwrap_or(&Value::Null);
        match (self.op, compare_values(candidate, &self.value)) {
            (FilterOp::Eq, Some(Ordering::Equal)) => true,
            (FilterOp::Gte, Some(Ordering::Equal | Ordering::Greater)) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub ascending: bool,
}

impl OrderBy {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: true,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: false,
        }
    }
}

/// Remote table operations the core depends on. Rows are JSON objects so the
/// abstraction stays backend-agnostic; services own typed encode/decode at
/// their boundary.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn select(
        &self,
        table: &str,
        filters: &[Filter],
        order: Option<&OrderBy>,
    ) -> Result<Vec<Value>, CoreError>;

    /// Inserts the given rows and returns them as stored (ids assigned).
    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<Vec<Value>, CoreError>;

    async fn update(&self, table: &str, filters: &[Filter], patch: Value)
    -> Result<(), CoreError>;

    /// Inserts `row`, or fully replaces the provided fields of the existing
    /// row whose `conflict_key` columns match.
    async fn upsert(&self, table: &str, row: Value, conflict_key: &[&str])
    -> Result<(), CoreError>;

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), CoreError>;
}

/// Orders JSON scalars; rows with mismatched or non-scalar types compare as
/// unordered and never satisfy a filter.
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// In-memory table store. Assigns the ids the backend would normally mint, so
/// callers see the same row shapes either way.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    next_id: AtomicU64,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn mint_id(&self, table: &str) -> String {
        let sequence = self.next_id.fetch_add(1, AtomicOrdering::Relaxed);
        format!("{table}-{sequence}")
    }

    fn lock_tables(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<Value>>>, CoreError> {
        self.tables
            .lock()
            .map_err(|error| CoreError::Transient(format!("record store lock poisoned: {error}")))
    }

    /// Total row count for a table; test helper.
    pub fn row_count(&self, table: &str) -> usize {
        self.tables
            .lock()
            .map(|tables| tables.get(table).map(Vec::len).unwrap_or(0))
            .unwrap_or(0)
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn select(
        &self,
        table: &str,
        filters: &[Filter],
        order: Option<&OrderBy>,
    ) -> Result<Vec<Value>, CoreError> {
        let tables = self.lock_tables()?;
        let mut rows: Vec<Value> = tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| filters.iter().all(|filter| filter.matches(row)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = order {
            rows.sort_by(|a, b| {
                let left = a.get(&order.column).unwrap_or(&Value::Null);
                let right = b.get(&order.column).unwrap_or(&Value::Null);
                let ordering = compare_values(left, right).unwrap_or(Ordering::Equal);
                if order.ascending { ordering } else { ordering.reverse() }
            });
        }
        Ok(rows)
    }

    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<Vec<Value>, CoreError> {
        let mut stored = Vec::with_capacity(rows.len());
        for mut row in rows {
            let Some(object) = row.as_object_mut() else {
                return Err(CoreError::Validation(format!(
                    "insert into {table} requires object rows"
                )));
            };
            if !object.contains_key("id") {
                object.insert("id".to_string(), Value::String(self.mint_id(table)));
            }
            stored.push(row);
        }

        let mut tables = self.lock_tables()?;
        tables
            .entry(table.to_string())
            .or_default()
            .extend(stored.clone());
        Ok(stored)
    }

    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: Value,
    ) -> Result<(), CoreError> {
        let Some(patch) = patch.as_object() else {
            return Err(CoreError::Validation(format!(
                "update on {table} requires an object patch"
            )));
        };

        let mut tables = self.lock_tables()?;
        if let Some(rows) = tables.get_mut(table) {
            for row in rows.iter_mut() {
                if !filters.iter().all(|filter| filter.matches(row)) {
                    continue;
                }
                if let Some(object) = row.as_object_mut() {
                    for (key, value) in patch {
                        object.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        Ok(())
    }

    async fn upsert(
        &self,
        table: &str,
        row: Value,
        conflict_key: &[&str],
    ) -> Result<(), CoreError> {
        let Some(incoming) = row.as_object() else {
            return Err(CoreError::Validation(format!(
                "upsert into {table} requires an object row"
            )));
        };
        if conflict_key.is_empty() {
            return Err(CoreError::Validation(format!(
                "upsert into {table} requires a conflict key"
            )));
        }

        let key_filters: Vec<Filter> = conflict_key
            .iter()
            .map(|column| {
                Filter::eq(
                    *column,
                    incoming.get(*column).cloned().unwrap_or(Value::Null),
                )
            })
            .collect();

        let mut tables = self.lock_tables()?;
        let rows = tables.entry(table.to_string()).or_default();
        if let Some(existing) = rows
            .iter_mut()
            .find(|candidate| key_filters.iter().all(|filter| filter.matches(candidate)))
        {
            if let Some(object) = existing.as_object_mut() {
                for (key, value) in incoming {
                    object.insert(key.clone(), value.clone());
                }
            }
            return Ok(());
        }

        let mut fresh = row.clone();
        if let Some(object) = fresh.as_object_mut() {
            if !object.contains_key("id") {
                object.insert("id".to_string(), Value::String(self.mint_id(table)));
            }
        }
        rows.push(fresh);
        Ok(())
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), CoreError> {
        let mut tables = self.lock_tables()?;
        if let Some(rows) = tables.get_mut(table) {
            rows.retain(|row| !filters.iter().all(|filter| filter.matches(row)));
        }
        Ok(())
    }
}
