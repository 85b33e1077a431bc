// Copyright (c) 2024-2025 DashCache Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CLI command handlers for DashCache

use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::commands::OutputFormat;
use super::output::ReportFormatter;
use super::scenario::{Replayer, Scenario};
use dashcache::{CacheConfig, CacheManager, InMemoryDatasetStore};

fn load_config(path: &Path) -> Result<CacheConfig, Box<dyn std::error::Error>> {
    CacheConfig::from_file(path)
        .map_err(|e| format!("Failed to load configuration {}: {}", path.display(), e).into())
}

/// Handle the rules command
pub fn handle_rules(config: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let cache_config = load_config(&config)?;
    print!("{}", ReportFormatter::format_rules(&cache_config));
    Ok(())
}

/// Handle the replay command
///
/// Builds a fresh in-memory store and cache manager from the configuration,
/// then applies the scenario steps in order.
pub fn handle_replay(
    config: PathBuf,
    scenario: PathBuf,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let cache_config = load_config(&config)?;
    let scenario = Scenario::from_file(&scenario)?;

    let store = Arc::new(InMemoryDatasetStore::new());
    let manager = CacheManager::new(cache_config, store.clone())
        .map_err(|e| format!("Failed to initialize cache: {}", e))?;

    if format == OutputFormat::Table {
        println!(
            "{}",
            format!("Replaying {} steps...", scenario.steps.len()).bold().green()
        );
    }

    let report = Replayer::new(store, manager).run(&scenario)?;
    print!("{}", ReportFormatter::format_report(&report, format));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const CONFIG: &str = r#"{
        "endpoints": {
            "sector_line_chart": { "datasets": [ { "dataset": "plate_df", "time_column": "time" } ] },
            "ui_config": { "startup_once": true }
        }
    }"#;

    const SCENARIO: &str = r#"{
        "steps": [
            { "action": "load", "dataset": "plate_df", "columns": ["time"], "rows": [["10:00"]] },
            { "action": "request", "endpoint": "sector_line_chart" },
            { "action": "request", "endpoint": "sector_line_chart" }
        ]
    }"#;

    #[test]
    fn test_handlers_with_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("dashboard.json");
        let scenario = dir.path().join("scenario.json");
        fs::write(&config, CONFIG).unwrap();
        fs::write(&scenario, SCENARIO).unwrap();

        handle_rules(config.clone()).unwrap();
        handle_replay(config.clone(), scenario.clone(), OutputFormat::Json).unwrap();
        handle_replay(config, scenario, OutputFormat::Table).unwrap();
    }

    #[test]
    fn test_missing_files_report_paths() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");

        let err = handle_rules(missing.clone()).unwrap_err();
        assert!(err.to_string().contains("absent.json"));

        let config = dir.path().join("dashboard.json");
        fs::write(&config, CONFIG).unwrap();
        let err = handle_replay(config, missing, OutputFormat::Table).unwrap_err();
        assert!(err.to_string().contains("Failed to read scenario"));
    }
}
