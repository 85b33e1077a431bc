// Copyright (c) 2024-2025 DashCache Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Central cache management and coordination
//!
//! [`CacheManager`] is what request handlers talk to. It owns the fingerprint
//! extractor and both cache tiers, and routes each endpoint to the tier its
//! configuration selects.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

use super::{
    CacheConfig, CacheLookup, FingerprintExtractor, FingerprintRegistry, MissReason, Payload,
    RequestParams, ResponseCache, ResponseCacheStats, SourceFingerprint, StartupCache,
    StartupCacheStats,
};
use crate::dataset::DatasetAccessor;
use crate::error::{CacheError, CacheResult};

/// Where a served payload came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServedFrom {
    Startup,
    ResponseCache,
    Computed,
}

/// Payload returned by [`CacheManager::get_or_compute`]
#[derive(Debug, Clone)]
pub struct Served {
    pub payload: Payload,
    pub source: ServedFrom,
    /// Why the response tier missed, when it was consulted and missed
    pub miss: Option<MissReason>,
}

/// Combined statistics for the administrative surface
#[derive(Debug, Clone, Serialize)]
pub struct CacheManagerStats {
    pub enabled: bool,
    pub response: ResponseCacheStats,
    pub startup: StartupCacheStats,
}

/// Central cache manager coordinating both cache tiers
pub struct CacheManager {
    config: CacheConfig,
    extractor: Arc<FingerprintExtractor>,
    response_cache: ResponseCache,
    startup_cache: StartupCache,
    startup_endpoints: HashSet<String>,
}

impl CacheManager {
    /// Create a manager whose fingerprint rules come from the configuration
    pub fn new(config: CacheConfig, accessor: Arc<dyn DatasetAccessor>) -> CacheResult<Self> {
        let registry = config.build_registry();
        Self::with_registry(config, accessor, registry)
    }

    /// Create a manager with a registry built in code.
    ///
    /// Startup-once endpoints are still taken from the configuration and are
    /// excluded from the registry, fallback rule included.
    pub fn with_registry(
        config: CacheConfig,
        accessor: Arc<dyn DatasetAccessor>,
        mut registry: FingerprintRegistry,
    ) -> CacheResult<Self> {
        config.validate()?;

        let startup_endpoints = config.startup_endpoints();
        if let Some(conflict) = startup_endpoints
            .iter()
            .find(|endpoint| registry.has_rule(endpoint))
        {
            return Err(CacheError::Config(format!(
                "Endpoint '{}' is startup_once but also has a fingerprint rule",
                conflict
            )));
        }

        for endpoint in &startup_endpoints {
            registry.exclude(endpoint);
        }

        let extractor = Arc::new(FingerprintExtractor::new(accessor, registry));
        let response_cache = ResponseCache::new(Arc::clone(&extractor), &config.response);

        log::info!(
            "Cache manager ready: {} fingerprinted endpoints, {} startup endpoints, max_entries={:?}",
            extractor.registry().len(),
            startup_endpoints.len(),
            config.response.max_entries
        );

        Ok(Self {
            config,
            extractor,
            response_cache,
            startup_cache: StartupCache::new(),
            startup_endpoints,
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn registry(&self) -> &FingerprintRegistry {
        self.extractor.registry()
    }

    pub fn response_cache(&self) -> &ResponseCache {
        &self.response_cache
    }

    pub fn startup_cache(&self) -> &StartupCache {
        &self.startup_cache
    }

    pub fn is_startup_endpoint(&self, endpoint: &str) -> bool {
        self.startup_endpoints.contains(endpoint)
    }

    // Response tier

    /// Whether responses for the endpoint can be stored in the response tier
    pub fn is_cacheable(&self, endpoint: &str) -> bool {
        self.config.enabled && self.response_cache.is_cacheable(endpoint)
    }

    pub fn build_fingerprint(&self, endpoint: &str, params: &RequestParams) -> SourceFingerprint {
        self.extractor.build_fingerprint(endpoint, params)
    }

    pub fn should_use_cache(&self, endpoint: &str, params: &RequestParams) -> Option<Payload> {
        if !self.config.enabled {
            return None;
        }
        self.response_cache.should_use_cache(endpoint, params)
    }

    pub fn lookup(&self, endpoint: &str, params: &RequestParams) -> CacheLookup {
        if !self.config.enabled {
            return CacheLookup::Miss(MissReason::Uncacheable);
        }
        self.response_cache.lookup(endpoint, params)
    }

    pub fn store_response(
        &self,
        endpoint: &str,
        params: &RequestParams,
        fingerprint: &SourceFingerprint,
        response: impl Into<Payload>,
    ) -> Payload {
        if !self.config.enabled {
            return response.into();
        }
        self.response_cache
            .store_response(endpoint, params, fingerprint, response)
    }

    // Startup tier: with caching disabled nothing is stored or served

    pub fn is_startup_cached(&self, endpoint: &str, params: &RequestParams) -> bool {
        self.config.enabled && self.startup_cache.is_startup_cached(endpoint, params)
    }

    pub fn get_startup_cache(&self, endpoint: &str, params: &RequestParams) -> Option<Value> {
        if !self.config.enabled {
            return None;
        }
        self.startup_cache.get_startup_cache(endpoint, params)
    }

    pub fn set_startup_cache(
        &self,
        endpoint: &str,
        params: &RequestParams,
        response: impl Into<Payload>,
    ) -> CacheResult<()> {
        if !self.config.enabled {
            log::debug!("Caching disabled, not storing startup entry for '{}'", endpoint);
            return Ok(());
        }
        self.startup_cache
            .set_startup_cache(endpoint, params, response)
    }

    pub fn refresh_startup_cache(
        &self,
        endpoint: &str,
        params: &RequestParams,
        response: impl Into<Payload>,
    ) -> bool {
        if !self.config.enabled {
            return false;
        }
        self.startup_cache
            .refresh_startup_cache(endpoint, params, response)
    }

    pub fn clear_startup_cache(&self) -> usize {
        self.startup_cache.clear_startup_cache()
    }

    pub fn get_startup_cache_stats(&self) -> StartupCacheStats {
        self.startup_cache.get_startup_cache_stats()
    }

    // Request flow

    /// Serve a request from cache or by running `compute`.
    ///
    /// The fingerprint is taken before `compute` runs, so data that changes
    /// while the payload is being built leaves a stale entry behind rather
    /// than a falsely fresh one. Errors from `compute` are returned as-is and
    /// nothing is stored.
    pub fn get_or_compute<F, E>(
        &self,
        endpoint: &str,
        params: &RequestParams,
        compute: F,
    ) -> Result<Served, E>
    where
        F: FnOnce() -> Result<Value, E>,
    {
        if !self.config.enabled {
            return Ok(Served {
                payload: Arc::new(compute()?),
                source: ServedFrom::Computed,
                miss: None,
            });
        }

        if self.is_startup_endpoint(endpoint) {
            return self.serve_startup(endpoint, params, compute);
        }

        let fingerprint = self.extractor.build_fingerprint(endpoint, params);
        let miss = match self.response_cache.check(endpoint, params, &fingerprint) {
            CacheLookup::Hit(payload) => {
                return Ok(Served {
                    payload,
                    source: ServedFrom::ResponseCache,
                    miss: None,
                })
            }
            CacheLookup::Miss(reason) => reason,
        };

        let payload = self
            .response_cache
            .store_response(endpoint, params, &fingerprint, compute()?);

        Ok(Served {
            payload,
            source: ServedFrom::Computed,
            miss: Some(miss),
        })
    }

    fn serve_startup<F, E>(
        &self,
        endpoint: &str,
        params: &RequestParams,
        compute: F,
    ) -> Result<Served, E>
    where
        F: FnOnce() -> Result<Value, E>,
    {
        if let Some(payload) = self.startup_cache.get_startup_cache(endpoint, params) {
            return Ok(Served {
                payload: Arc::new(payload),
                source: ServedFrom::Startup,
                miss: None,
            });
        }

        let payload: Payload = Arc::new(compute()?);
        if let Err(err) =
            self.startup_cache
                .set_startup_cache(endpoint, params, Arc::clone(&payload))
        {
            // Another request populated the key while this one computed
            log::debug!("Startup population raced: {}", err);
        }

        Ok(Served {
            payload,
            source: ServedFrom::Computed,
            miss: None,
        })
    }

    // Administration

    pub fn clear_response_cache(&self) -> usize {
        self.response_cache.clear()
    }

    pub fn invalidate_endpoint(&self, endpoint: &str) -> usize {
        self.response_cache.invalidate_endpoint(endpoint)
    }

    pub fn stats(&self) -> CacheManagerStats {
        CacheManagerStats {
            enabled: self.config.enabled,
            response: self.response_cache.stats(),
            startup: self.startup_cache.get_startup_cache_stats(),
        }
    }
}
