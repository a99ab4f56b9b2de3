// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! metarelay - webhook event relay CLI

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "metarelay",
    version,
    about = "Relay webhook events from a cloud stream to local handler commands"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay daemon (foreground)
    Start(commands::StartArgs),
    /// Show cursor positions for configured repos
    Status(commands::StatusArgs),
    /// One-shot catch-up sync (no live subscription)
    Sync(commands::SyncArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start(args) => commands::start(args).await,
        Commands::Status(args) => commands::status(args),
        Commands::Sync(args) => commands::sync(args).await,
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
