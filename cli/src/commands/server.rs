// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::config::DaemonConfig;
use crate::supervisor::process::{detach_into_new_session, process_exists, read_pid_file, send_signal, wait_for_exit};
use crate::supervisor::{logs, Component, ComponentStatus, Supervisor};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Set on the re-exec'd child so it knows to run the supervisor loop in the
/// foreground instead of detaching a grandchild of its own.
const FOREGROUND_MARKER: &str = "STIGMER_SUPERVISOR_FOREGROUND";

#[derive(Subcommand)]
pub enum ServerCommand {
    /// Start stigmerd and its components
    Start,
    /// Stop stigmerd and its components
    Stop,
    /// Stop then start stigmerd
    Restart,
    /// Show per-component health
    Status,
    /// Show, optionally follow, the merged component logs
    Logs {
        /// Only show this component's log (e.g. "backend", "workflow-worker")
        #[arg(short, long)]
        component: Option<String>,
        /// Keep streaming new lines as they're written
        #[arg(short, long)]
        follow: bool,
    },
}

pub async fn handle_command(command: ServerCommand, config_path: Option<PathBuf>) -> anyhow::Result<i32> {
    let config = DaemonConfig::load(config_path.as_deref())?;

    match command {
        ServerCommand::Start => {
            if std::env::var_os(FOREGROUND_MARKER).is_some() {
                return run_foreground(config).await;
            }
            start_detached(&config, config_path.as_deref()).await
        }
        ServerCommand::Stop => match stop_daemon(&config).await {
            Ok(()) => {
                println!("{}", "stigmerd stopped".green());
                Ok(0)
            }
            Err(err) => {
                eprintln!("{} {err}", "error:".red().bold());
                Ok(1)
            }
        },
        ServerCommand::Restart => {
            if let Err(err) = stop_daemon(&config).await {
                eprintln!("{} {err}", "error:".red().bold());
                return Ok(1);
            }
            start_detached(&config, config_path.as_deref()).await
        }
        ServerCommand::Status => {
            let supervisor = Supervisor::new(config.clone());
            for (component, status) in supervisor.status().await {
                print_status(component, &status);
            }
            Ok(0)
        }
        ServerCommand::Logs { component, follow } => {
            run_logs(&config, component.as_deref(), follow).await?;
            Ok(0)
        }
    }
}

/// The daemon's own process: runs the supervisor's start sequence, then the
/// supervision loop in the background, and blocks until SIGINT or SIGTERM
/// before tearing everything down gracefully. Only reached in the re-exec'd
/// child (`FOREGROUND_MARKER` set) — never in the CLI's own invoking process.
async fn run_foreground(config: DaemonConfig) -> anyhow::Result<i32> {
    let supervisor = std::sync::Arc::new(Supervisor::new(config));

    if let Err(err) = supervisor.start().await {
        tracing::error!(%err, "start failed");
        return Ok(err.exit_code());
    }

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let supervise_handle = {
        let supervisor = supervisor.clone();
        tokio::spawn(async move { supervisor.supervise(shutdown_rx).await })
    };

    wait_for_stop_signal().await;

    let _ = shutdown_tx.send(true);
    let _ = supervise_handle.await;
    supervisor.stop().await?;
    Ok(0)
}

#[cfg(unix)]
async fn wait_for_stop_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(err) => {
            tracing::error!(%err, "failed to install SIGTERM handler, falling back to SIGINT only");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_stop_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

/// Re-execs this binary as `server start` with `FOREGROUND_MARKER` set,
/// detached into its own session so it outlives this (the invoking) process,
/// then polls briefly for the backend pid file to confirm it came up.
async fn start_detached(config: &DaemonConfig, config_path: Option<&Path>) -> anyhow::Result<i32> {
    let exe = std::env::current_exe()?;
    let mut cmd = std::process::Command::new(exe);
    cmd.arg("server").arg("start");
    if let Some(path) = config_path {
        cmd.arg("--config").arg(path);
    }
    cmd.env(FOREGROUND_MARKER, "1");
    cmd.stdin(std::process::Stdio::null());
    cmd.stdout(std::process::Stdio::null());
    cmd.stderr(std::process::Stdio::null());
    detach_into_new_session(&mut cmd);
    cmd.spawn()?;

    for _ in 0..40 {
        tokio::time::sleep(Duration::from_millis(250)).await;
        if let Some(pid) = read_pid_file(config, Component::Backend.name()) {
            if process_exists(pid) {
                println!("{}", "stigmerd started".green());
                return Ok(0);
            }
        }
    }
    eprintln!("{}", "stigmerd did not report ready in time; check logs".yellow());
    Ok(1)
}

/// Signals the daemon's own pid (read from `backend.pid`) directly — not a
/// process-group kill, since that pid belongs to the foreground daemon
/// process itself, which owns the in-process backend and tears down the
/// other components from inside its own SIGTERM handler.
async fn stop_daemon(config: &DaemonConfig) -> anyhow::Result<()> {
    let Some(pid) = read_pid_file(config, Component::Backend.name()) else {
        return Ok(());
    };
    if !process_exists(pid) {
        return Ok(());
    }

    send_signal(pid, libc::SIGTERM)?;
    if !wait_for_exit(pid, Duration::from_secs(20)).await {
        tracing::warn!(pid, "daemon did not exit after SIGTERM, sending SIGKILL");
        send_signal(pid, libc::SIGKILL)?;
        wait_for_exit(pid, Duration::from_secs(5)).await;
    }
    Ok(())
}

fn print_status(component: Component, status: &ComponentStatus) {
    let label = match status {
        ComponentStatus::Running { pid } => format!("running (pid {pid})").green().to_string(),
        ComponentStatus::Unhealthy { pid } => format!("unhealthy (pid {pid})").yellow().to_string(),
        ComponentStatus::Stopped => "stopped".dimmed().to_string(),
    };
    println!("{:<16} {label}", component.name());
}

async fn run_logs(config: &DaemonConfig, component: Option<&str>, follow: bool) -> anyhow::Result<()> {
    let paths = log_paths(config, component);

    for line in logs::merged_lines(&paths, |path| tag_for(path)) {
        println!("{line}");
    }

    if follow {
        tail_follow(&paths).await;
    }
    Ok(())
}

fn log_paths(config: &DaemonConfig, component: Option<&str>) -> Vec<PathBuf> {
    let names: Vec<String> = match component {
        Some(name) => vec![name.to_string()],
        None => Component::START_ORDER.iter().map(|c| c.name().to_string()).collect(),
    };
    names.into_iter().map(|name| config.logs_dir().join(format!("{name}.log"))).collect()
}

fn tag_for(path: &Path) -> String {
    path.file_stem().and_then(|s| s.to_str()).unwrap_or("?").to_string()
}

/// `--follow`: poll each file's length every 500ms and print appended bytes.
async fn tail_follow(paths: &[PathBuf]) {
    let mut offsets: Vec<u64> = paths.iter().map(|p| std::fs::metadata(p).map(|m| m.len()).unwrap_or(0)).collect();
    loop {
        tokio::time::sleep(Duration::from_millis(500)).await;
        for (path, offset) in paths.iter().zip(offsets.iter_mut()) {
            let Ok(contents) = std::fs::read_to_string(path) else {
                continue;
            };
            if (contents.len() as u64) <= *offset {
                continue;
            }
            let tag = tag_for(path);
            for line in contents[*offset as usize..].lines() {
                println!("[{tag:<16}] {line}");
            }
            *offset = contents.len() as u64;
        }
    }
}
