// Copyright (c) 2024-2025 DashCache Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Report formatting for CLI output

use colored::*;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use dashcache::{CacheConfig, CacheManagerStats, ServedFrom};

use super::commands::OutputFormat;
use super::scenario::ReplayReport;

/// Formatter for rule listings and replay reports
pub struct ReportFormatter;

impl ReportFormatter {
    /// Format the configured caching rule of every endpoint as a table
    pub fn format_rules(config: &CacheConfig) -> String {
        if config.endpoints.is_empty() && config.fallback.is_none() {
            return format!("{}\n", "No endpoints configured".yellow());
        }

        let mut output = String::new();
        output.push_str(&format!("{}\n", "Endpoint Rules".bold().green()));
        if !config.enabled {
            output.push_str(&format!("{}\n", "Caching is disabled".yellow()));
        }
        output.push_str(&format!(
            "Max response entries: {}\n\n",
            config
                .response
                .max_entries
                .map_or("unbounded".to_string(), |n| n.to_string())
        ));

        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(
            ["Endpoint", "Tier", "Datasets", "Time Columns", "Tracks Modified"]
                .iter()
                .map(|h| Cell::new(h).fg(Color::Green))
                .collect::<Vec<_>>(),
        );

        for (endpoint, endpoint_config) in &config.endpoints {
            if endpoint_config.startup_once {
                table.add_row(vec![
                    endpoint.clone(),
                    "startup_once".to_string(),
                    "-".to_string(),
                    "-".to_string(),
                    "-".to_string(),
                ]);
            } else {
                table.add_row(Self::rule_row(endpoint, &endpoint_config.datasets));
            }
        }

        if let Some(fallback) = &config.fallback {
            table.add_row(Self::rule_row("* (fallback)", &fallback.datasets));
        }

        output.push_str(&table.to_string());
        output.push('\n');
        output
    }

    fn rule_row(endpoint: &str, datasets: &[dashcache::DatasetRule]) -> Vec<String> {
        let names: Vec<&str> = datasets.iter().map(|d| d.dataset.as_str()).collect();
        let time_columns: Vec<String> = datasets
            .iter()
            .map(|d| format!("{}.{}", d.dataset, d.time_column.as_deref().unwrap_or("-")))
            .collect();
        let tracked: Vec<&str> = datasets
            .iter()
            .filter(|d| d.track_modified)
            .map(|d| d.dataset.as_str())
            .collect();

        vec![
            endpoint.to_string(),
            "fingerprint".to_string(),
            Self::join_or_dash(&names),
            if time_columns.is_empty() {
                "-".to_string()
            } else {
                time_columns.join(", ")
            },
            Self::join_or_dash(&tracked),
        ]
    }

    fn join_or_dash(items: &[&str]) -> String {
        if items.is_empty() {
            "-".to_string()
        } else {
            items.join(", ")
        }
    }

    /// Format a replay report in the specified format
    pub fn format_report(report: &ReplayReport, format: OutputFormat) -> String {
        match format {
            OutputFormat::Table => Self::format_report_table(report),
            OutputFormat::Json => Self::format_report_json(report),
        }
    }

    fn format_report_table(report: &ReplayReport) -> String {
        let mut output = String::new();

        if let Some(description) = &report.description {
            output.push_str(&format!("{}\n", description.italic()));
        }
        output.push_str(&format!("Steps replayed: {}\n", report.outcomes.len()));
        output.push_str(&format!("Payloads computed: {}\n\n", report.computations));

        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(
            ["#", "Action", "Target", "Served From", "Detail"]
                .iter()
                .map(|h| Cell::new(h).fg(Color::Green))
                .collect::<Vec<_>>(),
        );

        for outcome in &report.outcomes {
            let served = match outcome.served_from {
                Some(ServedFrom::ResponseCache) => Cell::new("response cache").fg(Color::Green),
                Some(ServedFrom::Startup) => Cell::new("startup").fg(Color::Cyan),
                Some(ServedFrom::Computed) => Cell::new("computed").fg(Color::Yellow),
                None => Cell::new(""),
            };
            table.add_row(vec![
                Cell::new(outcome.step),
                Cell::new(outcome.action),
                Cell::new(&outcome.target),
                served,
                Cell::new(&outcome.detail),
            ]);
        }

        output.push_str(&table.to_string());
        output.push('\n');
        output.push_str(&Self::format_stats(&report.stats));
        output
    }

    /// Format cache statistics as a two-column table
    pub fn format_stats(stats: &CacheManagerStats) -> String {
        let response = &stats.response;
        let startup = &stats.startup;

        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec![
            Cell::new("Statistic").fg(Color::Green),
            Cell::new("Value").fg(Color::Green),
        ]);

        let rows: Vec<(&str, String)> = vec![
            ("response.entries", response.entries.to_string()),
            ("response.hits", response.hits.to_string()),
            ("response.misses", response.misses.to_string()),
            ("response.stale", response.stale.to_string()),
            ("response.uncacheable", response.uncacheable.to_string()),
            ("response.stores", response.stores.to_string()),
            ("response.evictions", response.evictions.to_string()),
            (
                "response.hit_rate",
                format!("{:.1}%", response.hit_rate() * 100.0),
            ),
            ("startup.cached_endpoints", startup.cached_endpoints.to_string()),
            ("startup.startup_time", startup.startup_time.to_rfc3339()),
            ("startup.cache_keys", startup.cache_keys.join(", ")),
        ];
        for (name, value) in rows {
            table.add_row(vec![name.to_string(), value]);
        }

        format!(
            "\n{}\n{}\n",
            "Cache Statistics".bold().green(),
            table
        )
    }

    fn format_report_json(report: &ReplayReport) -> String {
        match serde_json::to_string_pretty(report) {
            Ok(json) => format!("{}\n", json),
            Err(e) => format!(
                "{{\"status\": \"error\", \"error\": \"Could not serialize report: {}\"}}\n",
                e
            ),
        }
    }
}
