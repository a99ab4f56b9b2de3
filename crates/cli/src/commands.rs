// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subcommand implementations

use clap::Args;
use metarelay_core::{redact, ConfigError, EventStore};
use metarelay_daemon::{load_config, open_store, production, Config};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Args)]
pub struct StartArgs {
    /// Path to config file (default: ~/.metarelay/config.yaml)
    #[arg(short = 'c', long = "config", value_name = "CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose (DEBUG) logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Args)]
pub struct StatusArgs {
    /// Path to config file
    #[arg(short = 'c', long = "config", value_name = "CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct SyncArgs {
    /// Path to config file
    #[arg(short = 'c', long = "config", value_name = "CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose (DEBUG) logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Run the supervisor in the foreground until shutdown.
pub async fn start(args: StartArgs) -> ExitCode {
    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => return config_error(&e),
    };
    init_logging(args.verbose, &config);

    let supervisor = match production(config) {
        Ok(supervisor) => supervisor,
        Err(e) => {
            eprintln!("Error: {}", redact(&e.to_string()));
            return ExitCode::FAILURE;
        }
    };

    match supervisor.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %redact(&e.to_string()), "daemon exited with error");
            ExitCode::FAILURE
        }
    }
}

/// Print each configured repo and its cursor.
pub fn status(args: StatusArgs) -> ExitCode {
    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => return config_error(&e),
    };

    let store = match open_store(&config) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error: {}", redact(&e.to_string()));
            return ExitCode::FAILURE;
        }
    };

    println!("Metarelay Status");
    println!("{}", "=".repeat(40));

    for repo in &config.repos {
        match store.get_cursor(&repo.name) {
            Ok(Some(cursor)) => {
                println!("  {}: last_event_id={}", repo.name, cursor.last_event_id)
            }
            Ok(None) => println!("  {}: no cursor (not yet synced)", repo.name),
            Err(e) => {
                eprintln!("Error: {}", redact(&e.to_string()));
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}

/// One-shot catch-up without subscribing.
pub async fn sync(args: SyncArgs) -> ExitCode {
    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => return config_error(&e),
    };
    init_logging(args.verbose, &config);

    let supervisor = match production(config) {
        Ok(supervisor) => supervisor,
        Err(e) => {
            eprintln!("Error: {}", redact(&e.to_string()));
            return ExitCode::FAILURE;
        }
    };

    match supervisor.run_sync().await {
        Ok(()) => {
            println!("Sync complete.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Sync failed: {}", redact(&e.to_string()));
            ExitCode::FAILURE
        }
    }
}

fn config_error(e: &ConfigError) -> ExitCode {
    eprintln!("Error loading config: {}", redact(&e.to_string()));
    ExitCode::FAILURE
}

/// Log to stderr, `-v` winning over the configured level.
fn init_logging(verbose: bool, config: &Config) {
    let level = if verbose {
        "debug".to_string()
    } else {
        config.log_level.to_lowercase()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
