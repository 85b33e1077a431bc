// Copyright (c) 2024-2025 DashCache Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CLI module for DashCache
//!
//! Provides rule inspection for a cache configuration and replay of
//! polling/request scenarios against a live cache manager.

pub mod commands;
pub mod handlers;
pub mod output;
pub mod scenario;

pub use commands::{Cli, Commands};
pub use handlers::{handle_replay, handle_rules};
