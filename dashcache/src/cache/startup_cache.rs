// Copyright (c) 2024-2025 DashCache Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Startup-once cache
//!
//! Holds responses for endpoints whose payload is fixed for the lifetime of
//! the process (UI configuration, static reference tables). Entries are never
//! invalidated by data changes; only an explicit clear or refresh removes them.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use super::cache_key::{CacheKey, RequestParams};
use super::Payload;
use crate::error::{CacheError, CacheResult};

pub const STARTUP_CACHE_TYPE: &str = "startup_once";

/// Permanently cached response
#[derive(Debug, Clone)]
pub struct StartupEntry {
    pub endpoint: String,
    pub response: Payload,
    pub stored_at: DateTime<Utc>,
}

/// Introspection snapshot of the startup tier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartupCacheStats {
    pub cached_endpoints: usize,
    pub startup_time: DateTime<Utc>,
    pub cache_age_seconds: f64,
    pub cache_keys: Vec<String>,
}

/// Copy of `payload` annotated as served from the startup tier.
///
/// Only payloads that are objects with a `metadata` object gain the
/// `cached`, `cache_type` and `cached_at` keys; anything else is returned as
/// an unmodified copy.
pub fn annotate_startup_payload(payload: &Value, cached_at: DateTime<Utc>) -> Value {
    let mut copy = payload.clone();
    if let Some(metadata) = copy.get_mut("metadata").and_then(Value::as_object_mut) {
        metadata.insert("cached".to_string(), Value::Bool(true));
        metadata.insert(
            "cache_type".to_string(),
            Value::String(STARTUP_CACHE_TYPE.to_string()),
        );
        metadata.insert(
            "cached_at".to_string(),
            Value::String(cached_at.to_rfc3339()),
        );
    }
    copy
}

/// First-write-wins cache of process-lifetime responses
pub struct StartupCache {
    entries: RwLock<HashMap<CacheKey, StartupEntry>>,
    startup_time: DateTime<Utc>,
}

impl StartupCache {
    pub fn new() -> Self {
        Self::with_startup_time(Utc::now())
    }

    pub fn with_startup_time(startup_time: DateTime<Utc>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            startup_time,
        }
    }

    pub fn startup_time(&self) -> DateTime<Utc> {
        self.startup_time
    }

    pub fn is_startup_cached(&self, endpoint: &str, params: &RequestParams) -> bool {
        let key = CacheKey::startup(endpoint, params);
        self.entries.read().contains_key(&key)
    }

    /// Annotated copy of the stored response; the stored payload is untouched
    pub fn get_startup_cache(&self, endpoint: &str, params: &RequestParams) -> Option<Value> {
        let key = CacheKey::startup(endpoint, params);
        let response = self
            .entries
            .read()
            .get(&key)
            .map(|entry| Arc::clone(&entry.response))?;

        log::debug!("Startup cache hit: {}", key);
        Some(annotate_startup_payload(&response, self.startup_time))
    }

    /// Populate the entry for a request.
    ///
    /// Fails with [`CacheError::AlreadyCached`] if the key is already
    /// populated; the existing entry is kept. Use
    /// [`Self::refresh_startup_cache`] to replace it deliberately.
    pub fn set_startup_cache(
        &self,
        endpoint: &str,
        params: &RequestParams,
        response: impl Into<Payload>,
    ) -> CacheResult<()> {
        let key = CacheKey::startup(endpoint, params);
        match self.entries.write().entry(key) {
            Entry::Occupied(occupied) => {
                log::warn!(
                    "Startup cache already populated, keeping existing entry: {}",
                    occupied.key()
                );
                Err(CacheError::AlreadyCached {
                    key: occupied.key().to_string(),
                })
            }
            Entry::Vacant(vacant) => {
                log::info!("Startup cache populated: {}", vacant.key());
                vacant.insert(StartupEntry {
                    endpoint: endpoint.to_string(),
                    response: response.into(),
                    stored_at: Utc::now(),
                });
                Ok(())
            }
        }
    }

    /// Store or replace the entry; returns whether an entry was replaced
    pub fn refresh_startup_cache(
        &self,
        endpoint: &str,
        params: &RequestParams,
        response: impl Into<Payload>,
    ) -> bool {
        let key = CacheKey::startup(endpoint, params);
        let entry = StartupEntry {
            endpoint: endpoint.to_string(),
            response: response.into(),
            stored_at: Utc::now(),
        };
        let replaced = self.entries.write().insert(key.clone(), entry).is_some();
        log::info!("Startup cache refreshed: {} (replaced: {})", key, replaced);
        replaced
    }

    /// Remove every entry, returning how many there were.
    ///
    /// The startup time is kept.
    pub fn clear_startup_cache(&self) -> usize {
        let removed = {
            let mut entries = self.entries.write();
            let removed = entries.len();
            entries.clear();
            removed
        };
        log::info!("Cleared startup cache ({} entries)", removed);
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn get_startup_cache_stats(&self) -> StartupCacheStats {
        let mut cache_keys: Vec<String> = self
            .entries
            .read()
            .keys()
            .map(|key| key.to_string())
            .collect();
        cache_keys.sort();

        let age = Utc::now().signed_duration_since(self.startup_time);
        StartupCacheStats {
            cached_endpoints: cache_keys.len(),
            startup_time: self.startup_time,
            cache_age_seconds: age.num_milliseconds() as f64 / 1000.0,
            cache_keys,
        }
    }
}

impl Default for StartupCache {
    fn default() -> Self {
        Self::new()
    }
}
