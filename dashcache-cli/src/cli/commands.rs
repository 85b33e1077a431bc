// Copyright (c) 2024-2025 DashCache Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Command-line argument definitions

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dashcache")]
#[command(about = "Inspect and replay DashCache fingerprint rules", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Explicit log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    pub log_level: Option<log::Level>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show version information
    Version,

    /// List the caching rule configured for every endpoint
    Rules {
        /// Cache configuration file (JSON)
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Replay a scenario of dataset updates and requests
    Replay {
        /// Cache configuration file (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Scenario file (JSON)
        #[arg(short, long)]
        scenario: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_replay() {
        let cli = Cli::try_parse_from([
            "dashcache",
            "replay",
            "--config",
            "demos/dashboard.json",
            "--scenario",
            "demos/scenario.json",
            "--format",
            "json",
            "-v",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Commands::Replay {
                config,
                scenario,
                format,
            } => {
                assert_eq!(config, PathBuf::from("demos/dashboard.json"));
                assert_eq!(scenario, PathBuf::from("demos/scenario.json"));
                assert_eq!(format, OutputFormat::Json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_log_level_flag() {
        let cli = Cli::try_parse_from([
            "dashcache",
            "--log-level",
            "info",
            "rules",
            "-c",
            "dashboard.json",
        ])
        .unwrap();
        assert_eq!(cli.log_level, Some(log::Level::Info));
        assert!(matches!(cli.command, Commands::Rules { .. }));
    }
}
