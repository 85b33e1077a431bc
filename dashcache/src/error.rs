// Copyright (c) 2024-2025 DashCache Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Error types for the cache engine and the dataset accessor seam

use thiserror::Error;

/// Cache engine errors
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Startup cache already populated for key {key}")]
    AlreadyCached { key: String },

    #[error("Invalid request parameter '{key}': {reason}")]
    InvalidParam { key: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures reported by a [`crate::DatasetAccessor`].
///
/// The fingerprint extractor never propagates these; they are logged and the
/// affected dataset degrades to a neutral summary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessorError {
    #[error("Dataset unavailable: {0}")]
    Unavailable(String),

    #[error("Dataset backend error: {0}")]
    Backend(String),
}

pub type CacheResult<T> = Result<T, CacheError>;
