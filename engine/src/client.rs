// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `EngineClient`: the seam between this daemon and the embedded durable
//! workflow engine, treated as an external black box per §1/Design Note §9
//! ("program to the trait, swap the adapter"). A production adapter binds to
//! the real engine SDK; `fake::InMemoryEngine` is a deterministic stand-in
//! used by tests and by degraded-mode code paths.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum EngineError {
    #[error("engine unreachable: {0}")]
    Unreachable(String),
    #[error("engine call timed out after {0:?}")]
    Timeout(Duration),
    #[error("engine rejected request: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuralOutcome {
    Valid,
    Invalid,
    Failed,
}

#[derive(Debug, Clone)]
pub enum ActivityResult {
    Success(Value),
    Failure(String),
}

#[async_trait]
pub trait EngineClient: Send + Sync {
    /// Starts a workflow of `workflow_type` on `task_queue`, returning the
    /// engine-assigned workflow id.
    async fn start_workflow(
        &self,
        task_queue: &str,
        workflow_type: &str,
        input: Value,
    ) -> Result<String, EngineError>;

    /// Layer 2 structural validation (§4.7): convert and validate via the
    /// workflow-worker's dedicated validation workflow, bounded by `timeout`.
    async fn validate_workflow_structure(
        &self,
        graph: Value,
        timeout: Duration,
    ) -> Result<StructuralOutcome, EngineError>;

    /// Completes a paused external activity identified by `token` (§4.5).
    /// Tokens are opaque; callers must never log them raw.
    async fn complete_activity(&self, token: &[u8], result: ActivityResult) -> Result<(), EngineError>;
}
