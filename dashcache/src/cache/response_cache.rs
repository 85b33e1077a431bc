// Copyright (c) 2024-2025 DashCache Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Fingerprint-validated response cache
//!
//! Entries are keyed by `(endpoint, normalized params)` and remember only the
//! hash of the source fingerprint that was current when the response was
//! computed. A lookup recomputes the fingerprint and serves the stored
//! response only when the hashes match. Stale entries are detected lazily at
//! read time and stay in place until the next store overwrites them.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::cache_config::ResponseCacheConfig;
use super::cache_key::{CacheKey, RequestParams};
use super::fingerprint::{FingerprintExtractor, SourceFingerprint};
use super::Payload;

/// Stored response
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub endpoint: String,
    pub fingerprint_hash: String,
    pub response: Payload,
    pub stored_at: DateTime<Utc>,
    sequence: u64,
}

/// Why a lookup did not produce a reusable response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissReason {
    /// Nothing stored for the key
    Absent,
    /// Stored under a fingerprint that no longer matches the source data
    Stale,
    /// The endpoint has no fingerprint rule
    Uncacheable,
}

impl fmt::Display for MissReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MissReason::Absent => "absent",
            MissReason::Stale => "stale",
            MissReason::Uncacheable => "uncacheable",
        };
        f.write_str(label)
    }
}

/// Outcome of a response cache lookup
#[derive(Debug, Clone)]
pub enum CacheLookup {
    Hit(Payload),
    Miss(MissReason),
}

impl CacheLookup {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookup::Hit(_))
    }

    pub fn into_payload(self) -> Option<Payload> {
        match self {
            CacheLookup::Hit(payload) => Some(payload),
            CacheLookup::Miss(_) => None,
        }
    }

    pub fn miss_reason(&self) -> Option<MissReason> {
        match self {
            CacheLookup::Hit(_) => None,
            CacheLookup::Miss(reason) => Some(*reason),
        }
    }
}

/// Response cache statistics
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct ResponseCacheStats {
    pub entries: usize,
    pub max_entries: Option<usize>,
    pub hits: u64,
    /// All misses, including stale and uncacheable ones
    pub misses: u64,
    pub stale: u64,
    pub uncacheable: u64,
    pub stores: u64,
    pub evictions: u64,
}

impl ResponseCacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    stale: AtomicU64,
    uncacheable: AtomicU64,
    stores: AtomicU64,
    evictions: AtomicU64,
}

/// Entry map plus store-order index for least-recently-stored eviction
#[derive(Debug, Default)]
struct ResponseEntries {
    map: HashMap<CacheKey, CacheEntry>,
    store_order: BTreeMap<u64, CacheKey>,
    next_sequence: u64,
}

impl ResponseEntries {
    /// Insert or overwrite, returning the keys evicted to make room
    fn insert(
        &mut self,
        key: CacheKey,
        mut entry: CacheEntry,
        max_entries: Option<usize>,
    ) -> Vec<CacheKey> {
        let mut evicted = Vec::new();

        if let Some(max) = max_entries {
            if !self.map.contains_key(&key) {
                while self.map.len() >= max {
                    let Some((_, oldest)) = self.store_order.pop_first() else {
                        break;
                    };
                    self.map.remove(&oldest);
                    evicted.push(oldest);
                }
            }
        }

        entry.sequence = self.next_sequence;
        self.next_sequence += 1;
        self.store_order.insert(entry.sequence, key.clone());

        if let Some(previous) = self.map.insert(key, entry) {
            self.store_order.remove(&previous.sequence);
        }

        evicted
    }

    fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&CacheEntry) -> bool,
    {
        let before = self.map.len();
        let store_order = &mut self.store_order;
        self.map.retain(|_, entry| {
            let retained = keep(entry);
            if !retained {
                store_order.remove(&entry.sequence);
            }
            retained
        });
        before - self.map.len()
    }

    fn clear(&mut self) -> usize {
        let removed = self.map.len();
        self.map.clear();
        self.store_order.clear();
        removed
    }
}

/// Fingerprint-validated response cache
pub struct ResponseCache {
    extractor: Arc<FingerprintExtractor>,
    entries: RwLock<ResponseEntries>,
    max_entries: Option<usize>,
    counters: Counters,
}

impl ResponseCache {
    pub fn new(extractor: Arc<FingerprintExtractor>, config: &ResponseCacheConfig) -> Self {
        Self {
            extractor,
            entries: RwLock::new(ResponseEntries::default()),
            max_entries: config.max_entries,
            counters: Counters::default(),
        }
    }

    pub fn extractor(&self) -> &Arc<FingerprintExtractor> {
        &self.extractor
    }

    /// Whether `store_response` keeps responses for the endpoint
    pub fn is_cacheable(&self, endpoint: &str) -> bool {
        self.extractor.registry().rule_for(endpoint).is_some()
    }

    /// Stored response for the request if it is still valid
    pub fn should_use_cache(&self, endpoint: &str, params: &RequestParams) -> Option<Payload> {
        self.lookup(endpoint, params).into_payload()
    }

    /// Like [`Self::should_use_cache`] but reports why a lookup missed.
    ///
    /// The fingerprint is only built when an entry exists for the key.
    pub fn lookup(&self, endpoint: &str, params: &RequestParams) -> CacheLookup {
        if self.extractor.registry().rule_for(endpoint).is_none() {
            return self.record_miss(endpoint, MissReason::Uncacheable);
        }

        let key = CacheKey::response(endpoint, params);
        if !self.entries.read().map.contains_key(&key) {
            return self.record_miss(endpoint, MissReason::Absent);
        }

        let fingerprint = self.extractor.build_fingerprint(endpoint, params);
        self.compare(endpoint, &key, &fingerprint)
    }

    /// Compare the stored entry against a fingerprint the caller already built
    pub fn check(
        &self,
        endpoint: &str,
        params: &RequestParams,
        fingerprint: &SourceFingerprint,
    ) -> CacheLookup {
        let key = CacheKey::response(endpoint, params);
        self.compare(endpoint, &key, fingerprint)
    }

    fn compare(
        &self,
        endpoint: &str,
        key: &CacheKey,
        fingerprint: &SourceFingerprint,
    ) -> CacheLookup {
        if !fingerprint.is_registered() {
            return self.record_miss(endpoint, MissReason::Uncacheable);
        }

        let current_hash = fingerprint.hash();
        let outcome = match self.entries.read().map.get(key) {
            Some(entry) if entry.fingerprint_hash == current_hash => {
                CacheLookup::Hit(Arc::clone(&entry.response))
            }
            Some(_) => CacheLookup::Miss(MissReason::Stale),
            None => CacheLookup::Miss(MissReason::Absent),
        };

        match outcome {
            CacheLookup::Hit(payload) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                log::debug!("Response cache hit: {}", key);
                CacheLookup::Hit(payload)
            }
            CacheLookup::Miss(reason) => self.record_miss(endpoint, reason),
        }
    }

    fn record_miss(&self, endpoint: &str, reason: MissReason) -> CacheLookup {
        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        match reason {
            MissReason::Stale => {
                self.counters.stale.fetch_add(1, Ordering::Relaxed);
            }
            MissReason::Uncacheable => {
                self.counters.uncacheable.fetch_add(1, Ordering::Relaxed);
            }
            MissReason::Absent => {}
        }
        log::debug!("Response cache miss ({}): {}", reason, endpoint);
        CacheLookup::Miss(reason)
    }

    /// Store a computed response under the fingerprint it was computed from.
    ///
    /// Overwrites any previous entry for the same key. Returns the shared
    /// payload.
    ///
    /// Responses for endpoints without a rule (unregistered, excluded, or no
    /// fallback) are not stored, so a later lookup for them still misses with
    /// [`MissReason::Uncacheable`]. Store-then-hit only holds for cacheable
    /// endpoints; check [`Self::is_cacheable`] to tell the cases apart.
    pub fn store_response(
        &self,
        endpoint: &str,
        params: &RequestParams,
        fingerprint: &SourceFingerprint,
        response: impl Into<Payload>,
    ) -> Payload {
        let response = response.into();
        if !fingerprint.is_registered() {
            log::debug!("Not storing response for uncacheable endpoint '{}'", endpoint);
            return response;
        }

        let key = CacheKey::response(endpoint, params);
        let entry = CacheEntry {
            endpoint: endpoint.to_string(),
            fingerprint_hash: fingerprint.hash(),
            response: Arc::clone(&response),
            stored_at: Utc::now(),
            sequence: 0,
        };

        let evicted = self
            .entries
            .write()
            .insert(key.clone(), entry, self.max_entries);

        self.counters.stores.fetch_add(1, Ordering::Relaxed);
        if !evicted.is_empty() {
            self.counters
                .evictions
                .fetch_add(evicted.len() as u64, Ordering::Relaxed);
            for old_key in &evicted {
                log::debug!("Evicted least recently stored response: {}", old_key);
            }
        }
        log::debug!("Stored response: {}", key);

        response
    }

    /// Current entry for a request, regardless of staleness
    pub fn entry(&self, endpoint: &str, params: &RequestParams) -> Option<CacheEntry> {
        let key = CacheKey::response(endpoint, params);
        self.entries.read().map.get(&key).cloned()
    }

    /// Drop every stored response for one endpoint
    pub fn invalidate_endpoint(&self, endpoint: &str) -> usize {
        let removed = self
            .entries
            .write()
            .retain(|entry| entry.endpoint != endpoint);
        if removed > 0 {
            log::info!("Invalidated {} cached responses for '{}'", removed, endpoint);
        }
        removed
    }

    pub fn clear(&self) -> usize {
        let removed = self.entries.write().clear();
        log::info!("Cleared response cache ({} entries)", removed);
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.read().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().map.is_empty()
    }

    /// Sorted keys of all stored entries
    pub fn keys(&self) -> Vec<CacheKey> {
        let mut keys: Vec<CacheKey> = self.entries.read().map.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn stats(&self) -> ResponseCacheStats {
        ResponseCacheStats {
            entries: self.len(),
            max_entries: self.max_entries,
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            stale: self.counters.stale.load(Ordering::Relaxed),
            uncacheable: self.counters.uncacheable.load(Ordering::Relaxed),
            stores: self.counters.stores.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
        }
    }
}
