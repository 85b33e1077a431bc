// Copyright (c) 2024-2025 DashCache Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Replay scenarios
//!
//! A scenario is an ordered list of steps. Dataset steps mutate an
//! [`InMemoryDatasetStore`]; request steps go through
//! [`CacheManager::get_or_compute`] with a synthetic transform that records
//! the row count of every dataset the endpoint depends on.

use chrono::{DateTime, Utc};
use dashcache::{
    CacheError, CacheManager, CacheManagerStats, InMemoryDatasetStore, RequestParams, ServedFrom,
    TabularSnapshot,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::path::Path;
use std::sync::Arc;

/// Scenario file contents
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub description: Option<String>,
    pub steps: Vec<Step>,
}

/// Single replay step
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Replace a dataset wholesale
    Load {
        dataset: String,
        columns: Vec<String>,
        #[serde(default)]
        rows: Vec<Vec<Value>>,
        /// Explicit modification time; defaults to now
        #[serde(default)]
        modified_at: Option<DateTime<Utc>>,
    },
    Append {
        dataset: String,
        rows: Vec<Vec<Value>>,
    },
    Touch {
        dataset: String,
    },
    Remove {
        dataset: String,
    },
    Request {
        endpoint: String,
        #[serde(default)]
        params: Value,
    },
    ClearStartup,
    ClearResponses,
}

impl Step {
    pub fn action(&self) -> &'static str {
        match self {
            Step::Load { .. } => "load",
            Step::Append { .. } => "append",
            Step::Touch { .. } => "touch",
            Step::Remove { .. } => "remove",
            Step::Request { .. } => "request",
            Step::ClearStartup => "clear_startup",
            Step::ClearResponses => "clear_responses",
        }
    }

    pub fn target(&self) -> String {
        match self {
            Step::Load { dataset, .. }
            | Step::Append { dataset, .. }
            | Step::Touch { dataset }
            | Step::Remove { dataset } => dataset.clone(),
            Step::Request { endpoint, params } => {
                if params.is_null() {
                    endpoint.clone()
                } else {
                    format!("{} {}", endpoint, params)
                }
            }
            Step::ClearStartup => "startup tier".to_string(),
            Step::ClearResponses => "response tier".to_string(),
        }
    }
}

/// Result of one replayed step
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub step: usize,
    pub action: &'static str,
    pub target: String,
    /// Set for request steps
    #[serde(skip_serializing_if = "Option::is_none")]
    pub served_from: Option<ServedFrom>,
    pub detail: String,
}

/// Everything a replay produced
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub description: Option<String>,
    pub outcomes: Vec<StepOutcome>,
    pub computations: usize,
    pub stats: CacheManagerStats,
}

impl Scenario {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read scenario {}: {}", path.display(), e))?;
        let scenario: Scenario = serde_json::from_str(&contents)
            .map_err(|e| format!("Invalid scenario {}: {}", path.display(), e))?;
        Ok(scenario)
    }
}

/// Runs scenario steps against a store and manager pair
pub struct Replayer {
    store: Arc<InMemoryDatasetStore>,
    manager: CacheManager,
    computations: usize,
}

impl Replayer {
    pub fn new(store: Arc<InMemoryDatasetStore>, manager: CacheManager) -> Self {
        Self {
            store,
            manager,
            computations: 0,
        }
    }

    pub fn run(&mut self, scenario: &Scenario) -> Result<ReplayReport, Box<dyn std::error::Error>> {
        let mut outcomes = Vec::with_capacity(scenario.steps.len());
        for (index, step) in scenario.steps.iter().enumerate() {
            let step_number = index + 1;
            let outcome = self
                .apply(step_number, step)
                .map_err(|e| format!("Step {} ({}) failed: {}", step_number, step.action(), e))?;
            log::debug!(
                "Step {} {} {}: {}",
                step_number,
                outcome.action,
                outcome.target,
                outcome.detail
            );
            outcomes.push(outcome);
        }

        Ok(ReplayReport {
            description: scenario.description.clone(),
            outcomes,
            computations: self.computations,
            stats: self.manager.stats(),
        })
    }

    fn apply(&mut self, step_number: usize, step: &Step) -> Result<StepOutcome, CacheError> {
        let mut served_from = None;
        let detail = match step {
            Step::Load {
                dataset,
                columns,
                rows,
                modified_at,
            } => {
                let snapshot = TabularSnapshot::new(columns.clone(), rows.clone());
                let row_count = snapshot.row_count();
                match modified_at {
                    Some(at) => self.store.replace_at(dataset, snapshot, *at),
                    None => {
                        self.store.replace(dataset, snapshot);
                    }
                }
                format!("{} rows", row_count)
            }
            Step::Append { dataset, rows } => {
                match self.store.append_rows(dataset, rows.clone()) {
                    Some(row_count) => format!("{} rows", row_count),
                    None => return Err(unknown_dataset(dataset)),
                }
            }
            Step::Touch { dataset } => {
                if !self.store.touch(dataset) {
                    return Err(unknown_dataset(dataset));
                }
                "modified".to_string()
            }
            Step::Remove { dataset } => {
                if self.store.remove(dataset) {
                    "removed".to_string()
                } else {
                    "not loaded".to_string()
                }
            }
            Step::Request { endpoint, params } => {
                let params = RequestParams::from_json_object(params)?;
                let served = self.manager.get_or_compute(endpoint, &params, || {
                    Ok::<_, CacheError>(self.synthesize(endpoint, step_number))
                })?;
                if served.source == ServedFrom::Computed {
                    self.computations += 1;
                }
                served_from = Some(served.source);
                match served.miss {
                    Some(reason) => format!("computed ({})", reason),
                    None if served.source == ServedFrom::Computed => "computed".to_string(),
                    None => format!("reused payload from step {}", computed_at(&served.payload)),
                }
            }
            Step::ClearStartup => {
                format!("{} entries removed", self.manager.clear_startup_cache())
            }
            Step::ClearResponses => {
                format!("{} entries removed", self.manager.clear_response_cache())
            }
        };

        Ok(StepOutcome {
            step: step_number,
            action: step.action(),
            target: step.target(),
            served_from,
            detail,
        })
    }

    /// Stand-in for a chart transform: row counts of the endpoint's datasets
    fn synthesize(&self, endpoint: &str, step_number: usize) -> Value {
        let mut datasets = Map::new();
        if let Some(rule) = self.manager.registry().rule_for(endpoint) {
            for name in rule.dataset_names() {
                let rows = self.store.row_count(name).unwrap_or(0);
                datasets.insert(name.to_string(), json!(rows));
            }
        }

        json!({
            "endpoint": endpoint,
            "datasets": datasets,
            "metadata": {
                "computed_at_step": step_number
            }
        })
    }
}

fn computed_at(payload: &Value) -> String {
    payload
        .pointer("/metadata/computed_at_step")
        .map(|step| step.to_string())
        .unwrap_or_else(|| "?".to_string())
}

fn unknown_dataset(dataset: &str) -> CacheError {
    CacheError::Config(format!("Dataset '{}' is not loaded", dataset))
}
