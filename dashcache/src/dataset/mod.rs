// Copyright (c) 2024-2025 DashCache Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Dataset accessor seam
//!
//! The cache engine never owns the datasets it fingerprints. Ingestion
//! pipelines publish snapshots behind a [`DatasetAccessor`], and the engine
//! only reads them. [`InMemoryDatasetStore`] is the bundled implementation
//! used by the CLI and by tests.

pub mod memory;

pub use memory::InMemoryDatasetStore;

use crate::error::AccessorError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::Arc;

/// Read-only access to named tabular datasets.
///
/// `Ok(None)` means the dataset is not known to the accessor. Implementations
/// must be cheap: the fingerprint extractor calls them on every cache lookup.
pub trait DatasetAccessor: Send + Sync {
    /// Current snapshot of a dataset
    fn load_data(&self, name: &str) -> Result<Option<Arc<TabularSnapshot>>, AccessorError>;

    /// Last modification time of a dataset (file mtime, ingestion time, ...)
    fn get_last_modified(&self, name: &str) -> Result<Option<DateTime<Utc>>, AccessorError>;
}

/// Immutable snapshot of a tabular dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TabularSnapshot {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl TabularSnapshot {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// Snapshot with a header but no rows
    pub fn empty(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn extend_rows<I>(&mut self, rows: I)
    where
        I: IntoIterator<Item = Vec<Value>>,
    {
        self.rows.extend(rows);
    }

    /// Maximum non-null value of a column.
    ///
    /// Returns `None` when the column is missing or holds only nulls.
    pub fn max_of(&self, column: &str) -> Option<Value> {
        let idx = self.column_index(column)?;
        self.rows
            .iter()
            .filter_map(|row| row.get(idx))
            .filter(|value| !value.is_null())
            .max_by(|a, b| compare_scalars(a, b))
            .cloned()
    }
}

/// Total order over JSON values used for "latest row" extraction.
///
/// Values of different kinds order by kind (bool < number < string < array <
/// object). Numbers compare numerically and strings lexicographically, which
/// keeps ISO-8601 timestamps in chronological order. Numerically equal values
/// never compare `Equal` across representations (`1` ranks above `1.0`), so
/// the maximum does not depend on row order.
pub fn compare_scalars(a: &Value, b: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let by_value = match (x.as_i64(), y.as_i64()) {
                (Some(a), Some(b)) => a.cmp(&b),
                _ => {
                    let a = x.as_f64().unwrap_or(f64::NAN);
                    let b = y.as_f64().unwrap_or(f64::NAN);
                    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
                }
            };
            // Equal values: integer form ranks above float form, then by text
            by_value
                .then_with(|| y.is_f64().cmp(&x.is_f64()))
                .then_with(|| x.to_string().cmp(&y.to_string()))
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
            a.to_string().cmp(&b.to_string())
        }
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn prices() -> TabularSnapshot {
        TabularSnapshot::new(
            vec!["time".to_string(), "sector".to_string(), "close".to_string()],
            vec![
                vec![json!("2024-03-01T09:30:00"), json!("energy"), json!(101.5)],
                vec![json!("2024-03-01T10:00:00"), json!("banks"), json!(88)],
                vec![json!(null), json!("energy"), json!(99.25)],
                vec![json!("2024-03-01T09:45:00"), json!("banks"), json!(87)],
            ],
        )
    }

    #[test]
    fn test_max_of_timestamp_column() {
        let snapshot = prices();
        assert_eq!(snapshot.max_of("time"), Some(json!("2024-03-01T10:00:00")));
    }

    #[test]
    fn test_max_of_mixed_numbers() {
        let snapshot = prices();
        assert_eq!(snapshot.max_of("close"), Some(json!(101.5)));
    }

    #[test]
    fn test_max_of_missing_or_empty() {
        let snapshot = prices();
        assert_eq!(snapshot.max_of("volume"), None);

        let empty = TabularSnapshot::empty(vec!["time".to_string()]);
        assert_eq!(empty.max_of("time"), None);

        let all_null = TabularSnapshot::new(
            vec!["time".to_string()],
            vec![vec![json!(null)], vec![json!(null)]],
        );
        assert_eq!(all_null.max_of("time"), None);
    }

    #[test]
    fn test_short_rows_are_skipped() {
        let snapshot = TabularSnapshot::new(
            vec!["sector".to_string(), "time".to_string()],
            vec![vec![json!("energy")], vec![json!("banks"), json!(7)]],
        );
        assert_eq!(snapshot.max_of("time"), Some(json!(7)));
    }

    #[test]
    fn test_compare_scalars_orders_by_kind() {
        assert_eq!(compare_scalars(&json!(true), &json!(1)), Ordering::Less);
        assert_eq!(compare_scalars(&json!(10), &json!("1")), Ordering::Less);
        assert_eq!(compare_scalars(&json!(2), &json!(10)), Ordering::Less);
        assert_eq!(compare_scalars(&json!(2.5), &json!(2)), Ordering::Greater);
        assert_eq!(compare_scalars(&json!(1), &json!(1.0)), Ordering::Greater);
        assert_eq!(compare_scalars(&json!(1), &json!(1)), Ordering::Equal);
    }

    #[test]
    fn test_max_of_equal_numbers_ignores_row_order() {
        let column = vec!["time".to_string()];
        let int_last = TabularSnapshot::new(column.clone(), vec![vec![json!(1.0)], vec![json!(1)]]);
        let float_last = TabularSnapshot::new(column, vec![vec![json!(1)], vec![json!(1.0)]]);

        assert_eq!(int_last.max_of("time"), Some(json!(1)));
        assert_eq!(float_last.max_of("time"), Some(json!(1)));
        assert_eq!(
            int_last.max_of("time").map(|v| v.to_string()),
            float_last.max_of("time").map(|v| v.to_string())
        );
    }
}
