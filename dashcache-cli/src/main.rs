// Copyright (c) 2024-2025 DashCache Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! DashCache CLI entry point

use clap::Parser;
use colored::Colorize;

mod cli;
use cli::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments first to get log level
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        log::LevelFilter::Debug
    } else if let Some(level) = cli.log_level {
        level.to_level_filter()
    } else {
        // RUST_LOG still overrides this
        log::LevelFilter::Warn
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    match cli.command {
        Commands::Version => {
            println!("{} {}", "DashCache".bold().green(), dashcache::VERSION);
            println!("Fingerprint-validated response cache for dashboard backends");
            Ok(())
        }

        Commands::Rules { config } => cli::handle_rules(config),

        Commands::Replay {
            config,
            scenario,
            format,
        } => cli::handle_replay(config, scenario, format),
    }
}
