// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Workflow-execution worker subprocess (C4, §4.5). Polls the daemon's
//! network gRPC listener for `WorkflowExecution`s it hasn't finished yet and
//! drives each through `handlers::invoke_workflow_execution`. The real
//! engine's own task-queue push protocol is a black box outside this
//! repository's scope (§1); this poll loop is the local stand-in the same
//! way `stigmer_engine::fake::InMemoryEngine` stands in for the engine
//! client itself.

mod handlers;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use stigmer_core::domain::execution::{Phase, WorkflowExecution};
use stigmer_core::presentation::grpc::client::LoopbackClient;
use stigmer_engine::fake::InMemoryEngine;
use stigmer_engine::token;
use tonic::transport::Endpoint;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

fn server_addr() -> String {
    let port = std::env::var("GRPC_PORT").unwrap_or_else(|_| "7234".to_string());
    format!("http://127.0.0.1:{port}")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let engine = Arc::new(InMemoryEngine::new());
    token::install_engine_client(engine.clone());

    let endpoint = Endpoint::from_shared(server_addr()).context("invalid GRPC_PORT")?;
    let channel = endpoint
        .connect()
        .await
        .context("workflow-worker could not dial the backend gRPC server")?;
    let client = LoopbackClient::new(channel);

    tracing::info!("worker ready: queue={}", stigmer_engine::queues::WORKFLOW_EXECUTION_QUEUE);

    let mut shutdown = std::pin::pin!(tokio::signal::ctrl_c());
    loop {
        tokio::select! {
            _ = tokio::time::sleep(POLL_INTERVAL) => {
                if let Err(err) = poll_once(&client).await {
                    tracing::warn!(%err, "workflow-worker poll failed");
                }
            }
            _ = &mut shutdown => {
                tracing::info!("workflow-worker received shutdown signal");
                break;
            }
        }
    }
    Ok(())
}

async fn poll_once(client: &LoopbackClient) -> Result<()> {
    let pending: Vec<WorkflowExecution> = client
        .list::<WorkflowExecution>()
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .into_iter()
        .filter(|e| e.status.phase == Phase::Running)
        .collect();

    for execution in pending {
        let id = execution.metadata.id.clone();
        if let Err(err) = handlers::invoke_workflow_execution(client, &id).await {
            tracing::error!(execution_id = %id, %err, "workflow execution failed");
        }
    }
    Ok(())
}
