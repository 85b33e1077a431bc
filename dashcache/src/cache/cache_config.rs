// Copyright (c) 2024-2025 DashCache Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Cache configuration and the declarative endpoint rule table

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use super::fingerprint::{DatasetRule, FingerprintRegistry, FingerprintRule};
use crate::error::{CacheError, CacheResult};

/// Global cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable/disable caching entirely
    pub enabled: bool,

    /// Response (fingerprint) tier settings
    pub response: ResponseCacheConfig,

    /// Endpoint id -> caching rule
    pub endpoints: BTreeMap<String, EndpointConfig>,

    /// Rule for endpoints missing from `endpoints`; without one they are
    /// never cached
    pub fallback: Option<FingerprintRule>,
}

/// Response tier settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseCacheConfig {
    /// Bound on stored responses; the least recently stored entry is evicted
    /// when a new key arrives at capacity. `None` means unbounded.
    pub max_entries: Option<usize>,
}

/// Caching rule for one endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Datasets whose state validates cached responses
    pub datasets: Vec<DatasetRule>,

    /// Serve from the startup tier: computed once, never invalidated
    pub startup_once: bool,
}

impl EndpointConfig {
    pub fn fingerprinted(datasets: Vec<DatasetRule>) -> Self {
        Self {
            datasets,
            startup_once: false,
        }
    }

    pub fn startup_once() -> Self {
        Self {
            datasets: Vec::new(),
            startup_once: true,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            response: ResponseCacheConfig::default(),
            endpoints: BTreeMap::new(),
            fallback: None,
        }
    }
}

impl CacheConfig {
    /// Response tier capped at `max_entries` stored responses
    pub fn bounded(max_entries: usize) -> Self {
        Self {
            response: ResponseCacheConfig {
                max_entries: Some(max_entries),
            },
            ..Self::default()
        }
    }

    /// Response tier without an entry bound
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_endpoint(mut self, endpoint: &str, config: EndpointConfig) -> Self {
        self.endpoints.insert(endpoint.to_string(), config);
        self
    }

    pub fn from_json_str(json: &str) -> CacheResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> CacheResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        log::debug!("Loaded cache configuration from {}", path.display());
        Self::from_json_str(&contents)
    }

    /// Validate the configuration
    pub fn validate(&self) -> CacheResult<()> {
        if self.response.max_entries == Some(0) {
            return Err(CacheError::Config(
                "response.max_entries must be greater than 0".to_string(),
            ));
        }

        for (endpoint, config) in &self.endpoints {
            if endpoint.trim().is_empty() {
                return Err(CacheError::Config("Endpoint names must not be empty".to_string()));
            }

            if config.startup_once && !config.datasets.is_empty() {
                return Err(CacheError::Config(format!(
                    "Endpoint '{}' is startup_once and cannot declare dataset rules",
                    endpoint
                )));
            }

            Self::validate_datasets(endpoint, &config.datasets)?;
        }

        if let Some(fallback) = &self.fallback {
            Self::validate_datasets("<fallback>", &fallback.datasets)?;
        }

        Ok(())
    }

    fn validate_datasets(endpoint: &str, datasets: &[DatasetRule]) -> CacheResult<()> {
        let mut seen = HashSet::new();
        for rule in datasets {
            if rule.dataset.trim().is_empty() {
                return Err(CacheError::Config(format!(
                    "Endpoint '{}' has a dataset rule without a dataset name",
                    endpoint
                )));
            }
            if !seen.insert(rule.dataset.as_str()) {
                return Err(CacheError::Config(format!(
                    "Endpoint '{}' lists dataset '{}' more than once",
                    endpoint, rule.dataset
                )));
            }
        }
        Ok(())
    }

    /// Fingerprint registry for every non-startup endpoint.
    ///
    /// Startup endpoints are excluded so the fallback rule cannot pull them
    /// into the response tier.
    pub fn build_registry(&self) -> FingerprintRegistry {
        let mut registry = FingerprintRegistry::new();
        for (endpoint, config) in &self.endpoints {
            if config.startup_once {
                registry.exclude(endpoint);
                continue;
            }
            registry.register(
                endpoint,
                FingerprintRule {
                    datasets: config.datasets.clone(),
                },
            );
        }
        registry.set_fallback(self.fallback.clone());
        registry
    }

    /// Endpoints served from the startup tier
    pub fn startup_endpoints(&self) -> HashSet<String> {
        self.endpoints
            .iter()
            .filter(|(_, config)| config.startup_once)
            .map(|(endpoint, _)| endpoint.clone())
            .collect()
    }
}
