// Copyright (c) 2024-2025 DashCache Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Request parameters, canonical serialization and cache key derivation

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{CacheError, CacheResult};

/// Scalar request parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl ParamValue {
    /// Canonical representation used for hashing.
    ///
    /// Integral floats collapse to integers (`1.0 == 1`, `-0.0 == 0`) and
    /// non-finite floats become strings, since JSON cannot carry them.
    pub fn canonical(self) -> Self {
        match self {
            ParamValue::Float(f) if f.is_nan() => ParamValue::String("NaN".to_string()),
            ParamValue::Float(f) if f.is_infinite() => {
                let repr = if f > 0.0 { "inf" } else { "-inf" };
                ParamValue::String(repr.to_string())
            }
            ParamValue::Float(f)
                if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 =>
            {
                ParamValue::Integer(f as i64)
            }
            other => other,
        }
    }

    /// Convert a JSON scalar; arrays and objects are rejected
    pub fn from_json(value: &Value) -> Option<Self> {
        let param = match value {
            Value::Null => ParamValue::Null,
            Value::Bool(b) => ParamValue::Boolean(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => ParamValue::Integer(i),
                None => ParamValue::Float(n.as_f64()?),
            },
            Value::String(s) => ParamValue::String(s.clone()),
            Value::Array(_) | Value::Object(_) => return None,
        };
        Some(param.canonical())
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Boolean(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Integer(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Integer(value as i64)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Integer(value as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::String(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::String(value)
    }
}

/// Normalized request parameters.
///
/// Keys are kept sorted and values canonicalized on insert, so two parameter
/// sets that differ only in key order or numeric representation serialize to
/// the same bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, ParamValue>",
    into = "BTreeMap<String, ParamValue>"
)]
pub struct RequestParams(BTreeMap<String, ParamValue>);

impl RequestParams {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(key.into(), value.into().canonical());
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    /// Build from a JSON object such as a parsed query string
    pub fn from_json_object(value: &Value) -> CacheResult<Self> {
        let object = match value {
            Value::Object(object) => object,
            Value::Null => return Ok(Self::new()),
            other => {
                return Err(CacheError::InvalidParam {
                    key: String::new(),
                    reason: format!("expected an object of parameters, got {}", other),
                })
            }
        };

        let mut params = Self::new();
        for (key, raw) in object {
            let value = ParamValue::from_json(raw).ok_or_else(|| CacheError::InvalidParam {
                key: key.clone(),
                reason: "only scalar values are supported".to_string(),
            })?;
            params.0.insert(key.clone(), value);
        }
        Ok(params)
    }

    /// Canonical serialization of the parameters
    pub fn canonical_json(&self) -> String {
        canonical_json(&self.0)
    }
}

impl From<BTreeMap<String, ParamValue>> for RequestParams {
    fn from(map: BTreeMap<String, ParamValue>) -> Self {
        Self(
            map.into_iter()
                .map(|(key, value)| (key, value.canonical()))
                .collect(),
        )
    }
}

impl From<RequestParams> for BTreeMap<String, ParamValue> {
    fn from(params: RequestParams) -> Self {
        params.0
    }
}

impl<K, V> FromIterator<(K, V)> for RequestParams
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

/// Stable, order-independent JSON serialization.
///
/// The value is routed through `serde_json::Value`, whose maps are sorted, so
/// struct fields and map keys always come out in the same order.
pub fn canonical_json<T: Serialize + ?Sized>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(value) => value.to_string(),
        Err(err) => {
            log::warn!("Value could not be canonicalized: {}", err);
            format!("{{\"unserializable\":{:?}}}", err.to_string())
        }
    }
}

/// SHA-256 hex digest
pub fn stable_hash(bytes: impl AsRef<[u8]>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes.as_ref());
    format!("{:x}", hasher.finalize())
}

/// Key into either cache tier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub const RESPONSE_PREFIX: &'static str = "response";
    pub const STARTUP_PREFIX: &'static str = "startup";

    /// Hex characters of the params hash kept in startup keys.
    ///
    /// Two distinct parameter sets whose hashes share this prefix alias to the
    /// same startup entry. Changing the length changes every startup key.
    pub const STARTUP_HASH_LEN: usize = 8;

    /// Response-tier key: `response:<endpoint>[:<sha256(params)>]`
    pub fn response(endpoint: &str, params: &RequestParams) -> Self {
        if params.is_empty() {
            Self(format!("{}:{}", Self::RESPONSE_PREFIX, endpoint))
        } else {
            let digest = stable_hash(params.canonical_json());
            Self(format!("{}:{}:{}", Self::RESPONSE_PREFIX, endpoint, digest))
        }
    }

    /// Startup-tier key: `startup:<endpoint>[:<first 8 hex of sha256(params)>]`
    pub fn startup(endpoint: &str, params: &RequestParams) -> Self {
        if params.is_empty() {
            Self(format!("{}:{}", Self::STARTUP_PREFIX, endpoint))
        } else {
            let digest = stable_hash(params.canonical_json());
            Self(format!(
                "{}:{}:{}",
                Self::STARTUP_PREFIX,
                endpoint,
                &digest[..Self::STARTUP_HASH_LEN]
            ))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
