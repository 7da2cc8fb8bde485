// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # stigmer CLI
//!
//! `stigmer` drives the supervisor (C1): it starts, stops, restarts and
//! reports on the embedded engine, backend gRPC server, and the workflow
//! and agent workers, each running as its own supervised subprocess.
//!
//! The richer task/agent/workflow/config surface a full front-end CLI would
//! carry lives outside this repository — what's here is only the `server`
//! subcommand the supervisor needs.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use stigmer_cli::commands::{self, ServerCommand};

#[derive(Parser)]
#[command(name = "stigmer")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the daemon config file (overrides `<data-dir>/config.yaml`)
    #[arg(short, long, global = true, env = "STIGMER_CONFIG_PATH", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "STIGMER_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the stigmerd supervisor and its components
    #[command(name = "server")]
    Server {
        #[command(subcommand)]
        command: ServerCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let exit_code = match cli.command {
        Commands::Server { command } => commands::server::handle_command(command, cli.config).await?,
    };

    std::process::exit(exit_code);
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("failed to build log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}
