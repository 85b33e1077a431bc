// Copyright (c) 2024-2025 DashCache Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! DashCache - fingerprint-validated response caching for dashboard backends
//!
//! Dashboard endpoints derive charts and tables from datasets that are
//! refreshed on a polling cycle. Rebuilding those payloads on every request is
//! wasteful when the underlying data has not moved, so DashCache keeps two
//! cache tiers in front of the expensive transforms:
//!
//! - **Response tier**: each stored response carries the hash of a
//!   *source fingerprint* (row counts, latest row timestamps and modification
//!   times of the datasets the endpoint reads). A request is served from cache
//!   only while the freshly computed fingerprint hashes to the same value.
//! - **Startup tier**: endpoints whose payload is fixed for the process
//!   lifetime are computed once and served forever (until cleared).
//!
//! # Usage
//!
//! ```rust,ignore
//! use dashcache::{CacheConfig, CacheManager, InMemoryDatasetStore, RequestParams};
//!
//! let store = Arc::new(InMemoryDatasetStore::new());
//! let manager = CacheManager::new(CacheConfig::from_file("dashcache.json")?, store.clone())?;
//!
//! let served = manager.get_or_compute("sector_line_chart", &RequestParams::new(), || {
//!     build_sector_line_chart(&store)
//! })?;
//! ```

pub mod cache;
pub mod dataset;
pub mod error;

pub use cache::{
    annotate_startup_payload, canonical_json, stable_hash, CacheConfig, CacheEntry, CacheKey,
    CacheLookup, CacheManager, CacheManagerStats, DatasetRule, DatasetSummary, EndpointConfig,
    FingerprintExtractor, FingerprintRegistry, FingerprintRule, MissReason, ParamValue, Payload,
    RequestParams, ResponseCache, ResponseCacheConfig, ResponseCacheStats, Served, ServedFrom,
    SourceFingerprint, StartupCache, StartupCacheStats, StartupEntry,
};
pub use dataset::{DatasetAccessor, InMemoryDatasetStore, TabularSnapshot};
pub use error::{AccessorError, CacheError, CacheResult};

/// DashCache version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// DashCache crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
