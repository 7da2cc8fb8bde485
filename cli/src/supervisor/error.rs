// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `SupervisorError` (§4.1 ambient stack): the taxonomy from §7, mapped to
//! the CLI exit codes from §6 (`0` success, `1` generic failure,
//! `2` configuration error, `3` already-running/conflict).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("port {0} already in use")]
    PortInUse(u16),

    #[error("binary not found for component '{component}': {guidance}")]
    BinaryNotFound { component: String, guidance: String },

    #[error("engine unreachable within the health-check deadline")]
    EngineUnreachable,

    #[error("daemon is already running (pid {0})")]
    AlreadyRunning(u32),

    #[error("health check failed for component '{0}'")]
    HealthCheckFailed(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("gRPC transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("kv store error: {0}")]
    Kv(#[from] stigmer_core::domain::repository::KvError),
}

impl SupervisorError {
    pub fn exit_code(&self) -> i32 {
        match self {
            SupervisorError::Config(_) => 2,
            SupervisorError::AlreadyRunning(_) => 3,
            _ => 1,
        }
    }
}
