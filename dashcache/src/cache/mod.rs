// Copyright (c) 2024-2025 DashCache Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Two-tier response caching
//!
//! - Response tier: responses validated against a source-data fingerprint
//! - Startup tier: responses computed once per process
//!
//! Each tier guards its own map with a single lock. Fingerprints are computed
//! before a lock is taken; locks are held only to compare or insert.

pub mod cache_config;
pub mod cache_key;
pub mod cache_manager;
pub mod fingerprint;
pub mod response_cache;
pub mod startup_cache;

pub use cache_config::{CacheConfig, EndpointConfig, ResponseCacheConfig};
pub use cache_key::{canonical_json, stable_hash, CacheKey, ParamValue, RequestParams};
pub use cache_manager::{CacheManager, CacheManagerStats, Served, ServedFrom};
pub use fingerprint::{
    DatasetRule, DatasetSummary, FingerprintExtractor, FingerprintRegistry, FingerprintRule,
    SourceFingerprint,
};
pub use response_cache::{CacheEntry, CacheLookup, MissReason, ResponseCache, ResponseCacheStats};
pub use startup_cache::{
    annotate_startup_payload, StartupCache, StartupCacheStats, StartupEntry, STARTUP_CACHE_TYPE,
};

use std::sync::Arc;

/// Cached response body, shared between the cache and every reader
pub type Payload = Arc<serde_json::Value>;
