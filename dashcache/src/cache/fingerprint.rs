// Copyright (c) 2024-2025 DashCache Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Source fingerprints
//!
//! A fingerprint summarizes the state of every dataset an endpoint reads
//! (row count, latest row timestamp, modification time) together with the
//! normalized request parameters. It is cheap to compute and is what the
//! response cache compares to decide whether a stored response is stale.
//!
//! Which datasets matter for an endpoint is declared in a
//! [`FingerprintRegistry`] rather than hard-coded per endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use super::cache_key::{canonical_json, stable_hash, RequestParams};
use crate::dataset::DatasetAccessor;

/// What to extract from one dataset.
///
/// The row count is always extracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRule {
    pub dataset: String,

    /// Column whose maximum is the dataset's latest row timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_column: Option<String>,

    /// Include the accessor's modification time
    #[serde(default)]
    pub track_modified: bool,
}

impl DatasetRule {
    pub fn new(dataset: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            time_column: None,
            track_modified: false,
        }
    }

    pub fn latest_by(mut self, column: impl Into<String>) -> Self {
        self.time_column = Some(column.into());
        self
    }

    pub fn track_modified(mut self) -> Self {
        self.track_modified = true;
        self
    }
}

/// Datasets an endpoint depends on
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintRule {
    #[serde(default)]
    pub datasets: Vec<DatasetRule>,
}

impl FingerprintRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dataset(mut self, rule: DatasetRule) -> Self {
        self.datasets.push(rule);
        self
    }

    pub fn dataset_names(&self) -> Vec<&str> {
        self.datasets.iter().map(|d| d.dataset.as_str()).collect()
    }
}

/// Extracted state of one dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub row_count: u64,
    pub latest_row_timestamp: Option<Value>,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Summary of the source data behind one endpoint request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceFingerprint {
    endpoint: String,
    registered: bool,
    datasets: BTreeMap<String, DatasetSummary>,
    params: RequestParams,
}

impl SourceFingerprint {
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// False when no rule (and no fallback) covers the endpoint; such
    /// fingerprints are never cached against.
    pub fn is_registered(&self) -> bool {
        self.registered
    }

    pub fn datasets(&self) -> &BTreeMap<String, DatasetSummary> {
        &self.datasets
    }

    pub fn dataset(&self, name: &str) -> Option<&DatasetSummary> {
        self.datasets.get(name)
    }

    pub fn params(&self) -> &RequestParams {
        &self.params
    }

    pub fn canonical_json(&self) -> String {
        canonical_json(self)
    }

    /// SHA-256 of the canonical serialization
    pub fn hash(&self) -> String {
        stable_hash(self.canonical_json())
    }
}

/// Endpoint id -> fingerprint rule
#[derive(Debug, Clone, Default)]
pub struct FingerprintRegistry {
    rules: HashMap<String, FingerprintRule>,
    fallback: Option<FingerprintRule>,
    /// Endpoints that never resolve to a rule, not even the fallback
    excluded: HashSet<String>,
}

impl FingerprintRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the rule for an endpoint
    pub fn register(&mut self, endpoint: &str, rule: FingerprintRule) -> Option<FingerprintRule> {
        log::info!(
            "Registered fingerprint rule: {} -> [{}]",
            endpoint,
            rule.dataset_names().join(", ")
        );
        self.rules.insert(endpoint.to_string(), rule)
    }

    pub fn with_rule(mut self, endpoint: &str, rule: FingerprintRule) -> Self {
        self.register(endpoint, rule);
        self
    }

    /// Rule applied to endpoints without their own registration
    pub fn set_fallback(&mut self, rule: Option<FingerprintRule>) {
        self.fallback = rule;
    }

    pub fn with_fallback(mut self, rule: FingerprintRule) -> Self {
        self.fallback = Some(rule);
        self
    }

    /// Keep an endpoint out of the response tier; the fallback rule no
    /// longer applies to it
    pub fn exclude(&mut self, endpoint: &str) {
        self.excluded.insert(endpoint.to_string());
    }

    pub fn is_excluded(&self, endpoint: &str) -> bool {
        self.excluded.contains(endpoint)
    }

    pub fn rule_for(&self, endpoint: &str) -> Option<&FingerprintRule> {
        if self.excluded.contains(endpoint) {
            return None;
        }
        self.rules.get(endpoint).or(self.fallback.as_ref())
    }

    pub fn has_rule(&self, endpoint: &str) -> bool {
        self.rules.contains_key(endpoint)
    }

    /// Sorted list of explicitly registered endpoints
    pub fn endpoints(&self) -> Vec<&str> {
        let mut endpoints: Vec<&str> = self.rules.keys().map(String::as_str).collect();
        endpoints.sort_unstable();
        endpoints
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Builds fingerprints by reading dataset summaries through a [`DatasetAccessor`]
pub struct FingerprintExtractor {
    accessor: Arc<dyn DatasetAccessor>,
    registry: FingerprintRegistry,
}

impl FingerprintExtractor {
    pub fn new(accessor: Arc<dyn DatasetAccessor>, registry: FingerprintRegistry) -> Self {
        Self { accessor, registry }
    }

    pub fn registry(&self) -> &FingerprintRegistry {
        &self.registry
    }

    /// Build the current fingerprint for a request.
    ///
    /// Never fails: unknown, empty or unreadable datasets contribute a zero
    /// row count and no timestamps.
    pub fn build_fingerprint(&self, endpoint: &str, params: &RequestParams) -> SourceFingerprint {
        let Some(rule) = self.registry.rule_for(endpoint) else {
            log::debug!("No fingerprint rule for endpoint '{}'", endpoint);
            return SourceFingerprint {
                endpoint: endpoint.to_string(),
                registered: false,
                datasets: BTreeMap::new(),
                params: params.clone(),
            };
        };

        let datasets = rule
            .datasets
            .iter()
            .map(|dataset_rule| (dataset_rule.dataset.clone(), self.summarize(dataset_rule)))
            .collect();

        SourceFingerprint {
            endpoint: endpoint.to_string(),
            registered: true,
            datasets,
            params: params.clone(),
        }
    }

    fn summarize(&self, rule: &DatasetRule) -> DatasetSummary {
        let (row_count, latest_row_timestamp) = match self.accessor.load_data(&rule.dataset) {
            Ok(Some(snapshot)) => (
                snapshot.row_count() as u64,
                rule.time_column
                    .as_deref()
                    .and_then(|column| snapshot.max_of(column)),
            ),
            Ok(None) => {
                log::debug!("Dataset '{}' is not loaded", rule.dataset);
                (0, None)
            }
            Err(err) => {
                log::warn!("Failed to read dataset '{}': {}", rule.dataset, err);
                (0, None)
            }
        };

        let last_modified = if rule.track_modified {
            self.accessor
                .get_last_modified(&rule.dataset)
                .unwrap_or_else(|err| {
                    log::warn!(
                        "Failed to read modification time of '{}': {}",
                        rule.dataset,
                        err
                    );
                    None
                })
        } else {
            None
        };

        DatasetSummary {
            row_count,
            latest_row_timestamp,
            last_modified,
        }
    }
}
