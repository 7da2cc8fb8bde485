// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! The supervision loop itself (§4.1): start sequence, idempotent start,
//! health checking, stop sequence in reverse order, and `status`.
//!
//! The backend gRPC/HTTP servers run **in-process** inside this binary
//! (`SPEC_FULL.md` §1's crate table: "stigmer (cli/): Supervisor, backend
//! gRPC server bootstrap, CLI surface") rather than as a discovered,
//! separately spawned executable — only the engine and the two workers are
//! real OS subprocesses.

use crate::config::DaemonConfig;
use crate::supervisor::discovery::Discovery;
use crate::supervisor::error::SupervisorError;
use crate::supervisor::process::{
    detach_into_own_group, process_exists, read_pid_file, remove_pid_file, send_signal_to_group, wait_for_exit,
    wait_for_port, worker_log_has_ready_marker, write_pid_file,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use stigmer_core::bootstrap::{self, Backend};
use stigmer_core::infrastructure::kv_sled::SledKvStore;
use stigmer_core::presentation::grpc::server::serve_network;
use stigmer_core::presentation::http;
use stigmer_engine::fake::InMemoryEngine;
use stigmer_engine::EngineClient;
use tokio::process::Command;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    Engine,
    Backend,
    WorkflowWorker,
    AgentWorker,
}

impl Component {
    pub fn name(self) -> &'static str {
        match self {
            Component::Engine => "engine",
            Component::Backend => "backend",
            Component::WorkflowWorker => "workflow-worker",
            Component::AgentWorker => "agent-worker",
        }
    }

    /// §4.1 start order; `stop` walks this in reverse.
    pub const START_ORDER: [Component; 4] =
        [Component::Engine, Component::Backend, Component::WorkflowWorker, Component::AgentWorker];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentStatus {
    Running { pid: u32 },
    Unhealthy { pid: u32 },
    Stopped,
}

/// The in-process backend's running state. Stopping it means aborting these
/// tasks, not sending a signal — its pid is the daemon's own pid.
struct BackendRuntime {
    _backend: Backend,
    grpc: JoinHandle<()>,
    http: Option<JoinHandle<()>>,
}

pub struct Supervisor {
    config: DaemonConfig,
    backend_runtime: tokio::sync::Mutex<Option<BackendRuntime>>,
}

impl Supervisor {
    pub fn new(config: DaemonConfig) -> Self {
        Supervisor { config, backend_runtime: tokio::sync::Mutex::new(None) }
    }

    /// §4.1 start sequence, steps 1–7. The embedded LLM runtime (step 8) is
    /// optional and outside this repository's scope (§1: "the local LLM
    /// runtime is external").
    pub async fn start(&self) -> Result<(), SupervisorError> {
        let lock = acquire_daemon_lock(&self.config)?;

        crate::supervisor::logs::rotate_logs(&self.config.logs_dir(), chrono_now())?;

        for component in Component::START_ORDER {
            if self.cleanup_stale_or_reuse(component).await? {
                tracing::info!(component = component.name(), "reusing existing instance");
                continue;
            }
            if let Err(err) = self.start_component(component).await {
                tracing::error!(component = component.name(), %err, "start failed, rolling back");
                self.stop().await.ok();
                drop(lock);
                return Err(err);
            }
        }

        drop(lock);
        Ok(())
    }

    async fn start_component(&self, component: Component) -> Result<(), SupervisorError> {
        if component == Component::Backend {
            return self.start_backend().await;
        }

        let discovery = Discovery::new(&self.config);
        let (bin, mut cmd) = match component {
            Component::Engine => {
                let bin = discovery.find("stigmer-engine", None)?;
                let mut cmd = Command::new(&bin);
                cmd.arg("--grpc-port").arg(self.config.engine_grpc_port.to_string());
                cmd.arg("--ui-port").arg(self.config.engine_ui_port.to_string());
                (bin, cmd)
            }
            Component::WorkflowWorker => {
                let bin = discovery.find_workflow_worker()?;
                let mut cmd = Command::new(&bin);
                cmd.env("GRPC_PORT", self.config.grpc_port.to_string());
                (bin, cmd)
            }
            Component::AgentWorker => {
                let bin = discovery.find_agent_worker()?;
                let mut cmd = Command::new(&bin);
                cmd.env("GRPC_PORT", self.config.grpc_port.to_string());
                (bin, cmd)
            }
            Component::Backend => unreachable!("handled above"),
        };

        std::fs::create_dir_all(self.config.logs_dir())?;
        let stdout = std::fs::File::create(self.config.logs_dir().join(format!("{}.log", component.name())))?;
        let stderr = std::fs::File::create(self.config.logs_dir().join(format!("{}.err", component.name())))?;
        cmd.stdout(std::process::Stdio::from(stdout));
        cmd.stderr(std::process::Stdio::from(stderr));
        detach_into_own_group(&mut cmd);

        tracing::info!(component = component.name(), binary = %bin.display(), "starting component");
        let child = cmd.spawn()?;
        let pid = child.id().ok_or(SupervisorError::HealthCheckFailed(component.name().to_string()))?;
        write_pid_file(&self.config, component.name(), pid)?;
        std::mem::forget(child);

        self.wait_healthy(component, pid).await
    }

    /// Opens the KV store, wires every kind's controller via
    /// `stigmer_core::bootstrap`, and starts the network gRPC listener plus
    /// (outside `ENV=test`) the debug HTTP surface, all as tasks on this
    /// process's runtime.
    async fn start_backend(&self) -> Result<(), SupervisorError> {
        std::fs::create_dir_all(&self.config.data_dir)?;
        let store = Arc::new(SledKvStore::open(self.config.db_path())?);
        let debug_store = store.clone();

        // The real engine SDK is an explicit out-of-scope black box (§1); the
        // in-memory fake is the documented degraded-mode adapter and is what
        // this daemon runs with until a production adapter exists.
        let engine: Arc<dyn EngineClient> = Arc::new(InMemoryEngine::new());
        let backend = bootstrap::build(store, engine).await?;

        let grpc_addr: SocketAddr = ([127, 0, 0, 1], self.config.grpc_port).into();
        let registry = backend.registry.clone();
        let grpc = tokio::spawn(async move {
            if let Err(err) = serve_network(grpc_addr, registry).await {
                tracing::error!(error = %err, "backend gRPC listener exited");
            }
        });

        let http_handle = if self.config.env.debug_http_enabled() {
            let addr: SocketAddr = ([127, 0, 0, 1], self.config.debug_http_port).into();
            let state = Arc::new(http::DebugState { store: debug_store, db_path: self.config.db_path().display().to_string() });
            let router = http::router(state);
            let listener = tokio::net::TcpListener::bind(addr).await?;
            Some(tokio::spawn(async move {
                if let Err(err) = axum::serve(listener, router).await {
                    tracing::error!(error = %err, "debug HTTP surface exited");
                }
            }))
        } else {
            None
        };

        *self.backend_runtime.lock().await = Some(BackendRuntime { _backend: backend, grpc, http: http_handle });

        let pid = std::process::id();
        write_pid_file(&self.config, Component::Backend.name(), pid)?;
        self.wait_healthy(Component::Backend, pid).await
    }

    async fn wait_healthy(&self, component: Component, pid: u32) -> Result<(), SupervisorError> {
        match component {
            Component::Engine => {
                if !wait_for_port(self.config.engine_grpc_port, Duration::from_secs(10)).await {
                    return Err(SupervisorError::EngineUnreachable);
                }
            }
            Component::Backend => {
                if !wait_for_port(self.config.grpc_port, Duration::from_secs(10)).await {
                    return Err(SupervisorError::HealthCheckFailed(component.name().to_string()));
                }
            }
            Component::WorkflowWorker | Component::AgentWorker => {
                let log_path = self.config.logs_dir().join(format!("{}.log", component.name()));
                let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
                loop {
                    if !process_exists(pid) {
                        return Err(SupervisorError::HealthCheckFailed(component.name().to_string()));
                    }
                    if worker_log_has_ready_marker(&log_path) {
                        return Ok(());
                    }
                    if tokio::time::Instant::now() >= deadline {
                        return Err(SupervisorError::HealthCheckFailed(component.name().to_string()));
                    }
                    tokio::time::sleep(Duration::from_millis(500)).await;
                }
            }
        }
        Ok(())
    }

    /// §4.1 idempotent start: returns `true` if the existing instance is
    /// healthy and launching should be skipped.
    async fn cleanup_stale_or_reuse(&self, component: Component) -> Result<bool, SupervisorError> {
        let Some(pid) = read_pid_file(&self.config, component.name()) else {
            return Ok(false);
        };
        if !process_exists(pid) {
            remove_pid_file(&self.config, component.name());
            return Ok(false);
        }
        match self.status_of(component, pid).await {
            ComponentStatus::Running { .. } => Ok(true),
            _ => {
                tracing::warn!(component = component.name(), pid, "stale process found, terminating");
                if component != Component::Backend {
                    let _ = send_signal_to_group(pid, libc::SIGKILL);
                }
                remove_pid_file(&self.config, component.name());
                Ok(false)
            }
        }
    }

    pub async fn status_of(&self, component: Component, pid: u32) -> ComponentStatus {
        if !process_exists(pid) {
            return ComponentStatus::Stopped;
        }
        let healthy = match component {
            Component::Engine => wait_for_port(self.config.engine_grpc_port, Duration::from_millis(500)).await,
            Component::Backend => wait_for_port(self.config.grpc_port, Duration::from_millis(500)).await,
            Component::WorkflowWorker | Component::AgentWorker => {
                worker_log_has_ready_marker(&self.config.logs_dir().join(format!("{}.log", component.name())))
            }
        };
        if healthy {
            ComponentStatus::Running { pid }
        } else {
            ComponentStatus::Unhealthy { pid }
        }
    }

    pub async fn status(&self) -> Vec<(Component, ComponentStatus)> {
        let mut statuses = Vec::new();
        for component in Component::START_ORDER {
            let status = match read_pid_file(&self.config, component.name()) {
                Some(pid) => self.status_of(component, pid).await,
                None => ComponentStatus::Stopped,
            };
            statuses.push((component, status));
        }
        statuses
    }

    /// §4.1 stop sequence: reverse start order, graceful-then-forceful. The
    /// in-process backend is torn down by aborting its server tasks.
    pub async fn stop(&self) -> Result<(), SupervisorError> {
        for component in Component::START_ORDER.into_iter().rev() {
            if component == Component::Backend {
                if let Some(runtime) = self.backend_runtime.lock().await.take() {
                    runtime.grpc.abort();
                    if let Some(http) = runtime.http {
                        http.abort();
                    }
                }
                remove_pid_file(&self.config, component.name());
                continue;
            }

            let Some(pid) = read_pid_file(&self.config, component.name()) else {
                continue;
            };
            if !process_exists(pid) {
                remove_pid_file(&self.config, component.name());
                continue;
            }
            let (signal, timeout) = match component {
                Component::WorkflowWorker | Component::AgentWorker => (libc::SIGINT, Duration::from_secs(5)),
                Component::Engine => (libc::SIGINT, Duration::from_secs(10)),
                Component::Backend => unreachable!("handled above"),
            };
            let _ = send_signal_to_group(pid, signal);
            let stopped_gracefully = wait_for_exit(pid, timeout).await;
            if !stopped_gracefully {
                tracing::warn!(component = component.name(), pid, "graceful stop timed out, sending SIGKILL");
                let _ = send_signal_to_group(pid, libc::SIGKILL);
            }
            remove_pid_file(&self.config, component.name());
        }
        let _ = std::fs::remove_file(self.config.lock_path());
        Ok(())
    }

    pub async fn restart(&self) -> Result<(), SupervisorError> {
        self.stop().await?;
        self.start().await
    }

    /// §4.1 supervision loop: polls every 5s; a component with two
    /// consecutive failed health checks gets one bounded restart with
    /// exponential backoff (capped at 30s). Three restarts within a minute
    /// for the same component marks it `unhealthy` until a manual restart.
    pub async fn supervise(&self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut failures = [0u32; 4];
        let mut restart_log: [Vec<tokio::time::Instant>; 4] = Default::default();

        loop {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(5)) => {}
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return;
                    }
                }
            }

            for (index, component) in Component::START_ORDER.into_iter().enumerate() {
                let Some(pid) = read_pid_file(&self.config, component.name()) else {
                    continue;
                };
                match self.status_of(component, pid).await {
                    ComponentStatus::Running { .. } => failures[index] = 0,
                    _ => {
                        failures[index] += 1;
                        if failures[index] < 2 {
                            continue;
                        }

                        let log = &mut restart_log[index];
                        let now = tokio::time::Instant::now();
                        log.retain(|t| now.duration_since(*t) < Duration::from_secs(60));
                        if log.len() >= 3 {
                            tracing::error!(component = component.name(), "unhealthy: exceeded restart budget");
                            continue;
                        }

                        let backoff = Duration::from_secs(2u64.saturating_pow(log.len() as u32).min(30));
                        tracing::warn!(component = component.name(), ?backoff, "restarting unhealthy component");
                        tokio::time::sleep(backoff).await;
                        log.push(now);
                        failures[index] = 0;
                        if let Err(err) = self.start_component(component).await {
                            tracing::error!(component = component.name(), %err, "restart attempt failed");
                        }
                    }
                }
            }
        }
    }
}

#[derive(Debug)]
struct DaemonLock {
    path: std::path::PathBuf,
}

impl Drop for DaemonLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// §4.1 step 1: exclusive lock on `<data-dir>/daemon.lock`. A stale lock
/// whose owning pid is dead is reclaimed; a live owner is `AlreadyRunning`.
fn acquire_daemon_lock(config: &DaemonConfig) -> Result<DaemonLock, SupervisorError> {
    std::fs::create_dir_all(&config.data_dir)?;
    let path = config.lock_path();
    if let Ok(existing) = std::fs::read_to_string(&path) {
        if let Ok(pid) = existing.trim().parse::<u32>() {
            if process_exists(pid) {
                return Err(SupervisorError::AlreadyRunning(pid));
            }
        }
    }
    std::fs::write(&path, std::process::id().to_string())?;
    Ok(DaemonLock { path })
}

fn chrono_now() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_order_is_leaves_first() {
        assert_eq!(
            Component::START_ORDER,
            [Component::Engine, Component::Backend, Component::WorkflowWorker, Component::AgentWorker]
        );
    }

    #[tokio::test]
    async fn stopped_component_with_no_pid_file_is_stopped() {
        let dir = tempfile::tempdir().unwrap();
        let config = DaemonConfig {
            data_dir: dir.path().to_path_buf(),
            ..DaemonConfig::default()
        };
        let supervisor = Supervisor::new(config);
        let statuses = supervisor.status().await;
        assert!(statuses.iter().all(|(_, s)| *s == ComponentStatus::Stopped));
    }

    #[test]
    fn second_lock_acquisition_fails_while_holder_is_alive() {
        let dir = tempfile::tempdir().unwrap();
        let config = DaemonConfig {
            data_dir: dir.path().to_path_buf(),
            ..DaemonConfig::default()
        };
        let lock = acquire_daemon_lock(&config).unwrap();
        let err = acquire_daemon_lock(&config).unwrap_err();
        assert!(matches!(err, SupervisorError::AlreadyRunning(_)));
        drop(lock);
        assert!(acquire_daemon_lock(&config).is_ok());
    }
}
