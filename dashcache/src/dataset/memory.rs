// Copyright (c) 2024-2025 DashCache Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory dataset store

use super::{DatasetAccessor, TabularSnapshot};
use crate::error::AccessorError;
use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

struct StoredDataset {
    snapshot: Arc<TabularSnapshot>,
    last_modified: DateTime<Utc>,
}

/// Thread-safe in-memory [`DatasetAccessor`].
///
/// Every mutation stamps the dataset with a strictly increasing modification
/// time, even when the wall clock has not advanced between two writes.
pub struct InMemoryDatasetStore {
    datasets: RwLock<HashMap<String, StoredDataset>>,
    last_stamp: Mutex<Option<DateTime<Utc>>>,
}

impl InMemoryDatasetStore {
    pub fn new() -> Self {
        Self {
            datasets: RwLock::new(HashMap::new()),
            last_stamp: Mutex::new(None),
        }
    }

    fn next_stamp(&self) -> DateTime<Utc> {
        let mut last = self.last_stamp.lock();
        let now = Utc::now();
        let stamp = match *last {
            Some(prev) if now <= prev => prev + Duration::microseconds(1),
            _ => now,
        };
        *last = Some(stamp);
        stamp
    }

    /// Publish a new snapshot for a dataset, returning its modification stamp
    pub fn replace(&self, name: &str, snapshot: TabularSnapshot) -> DateTime<Utc> {
        let stamp = self.next_stamp();
        self.replace_at(name, snapshot, stamp);
        stamp
    }

    /// Publish a snapshot with an explicit modification time.
    ///
    /// Later automatic stamps are kept after `last_modified`.
    pub fn replace_at(&self, name: &str, snapshot: TabularSnapshot, last_modified: DateTime<Utc>) {
        {
            let mut last = self.last_stamp.lock();
            if last.map_or(true, |prev| last_modified > prev) {
                *last = Some(last_modified);
            }
        }
        log::debug!(
            "Dataset '{}' replaced: {} rows",
            name,
            snapshot.row_count()
        );
        self.datasets.write().insert(
            name.to_string(),
            StoredDataset {
                snapshot: Arc::new(snapshot),
                last_modified,
            },
        );
    }

    /// Append rows to an existing dataset.
    ///
    /// Returns the new row count, or `None` if the dataset is unknown.
    /// Snapshots already handed out are left untouched.
    pub fn append_rows(&self, name: &str, rows: Vec<Vec<Value>>) -> Option<usize> {
        let stamp = self.next_stamp();
        let mut datasets = self.datasets.write();
        let stored = datasets.get_mut(name)?;

        let snapshot = Arc::make_mut(&mut stored.snapshot);
        snapshot.extend_rows(rows);
        stored.last_modified = stamp;
        Some(snapshot.row_count())
    }

    /// Bump the modification time without changing content
    pub fn touch(&self, name: &str) -> bool {
        let stamp = self.next_stamp();
        match self.datasets.write().get_mut(name) {
            Some(stored) => {
                stored.last_modified = stamp;
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, name: &str) -> bool {
        self.datasets.write().remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.datasets.read().contains_key(name)
    }

    /// Sorted dataset names
    pub fn dataset_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.datasets.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn row_count(&self, name: &str) -> Option<usize> {
        self.datasets
            .read()
            .get(name)
            .map(|stored| stored.snapshot.row_count())
    }
}

impl Default for InMemoryDatasetStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetAccessor for InMemoryDatasetStore {
    fn load_data(&self, name: &str) -> Result<Option<Arc<TabularSnapshot>>, AccessorError> {
        Ok(self
            .datasets
            .read()
            .get(name)
            .map(|stored| Arc::clone(&stored.snapshot)))
    }

    fn get_last_modified(&self, name: &str) -> Result<Option<DateTime<Utc>>, AccessorError> {
        Ok(self.datasets.read().get(name).map(|stored| stored.last_modified))
    }
}
