// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Agent-execution worker subprocess (C4, §4.5). Same poll-and-drive shape
//! as `stigmer-workflow-worker`, over `AgentExecution` instead.

mod handlers;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use stigmer_core::domain::execution::{AgentExecution, Phase};
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
        .context("agent-worker could not dial the backend gRPC server")?;
    let client = LoopbackClient::new(channel);

    tracing::info!("worker ready: queue={}", stigmer_engine::queues::AGENT_EXECUTION_QUEUE);

    let mut shutdown = std::pin::pin!(tokio::signal::ctrl_c());
    loop {
        tokio::select! {
            _ = tokio::time::sleep(POLL_INTERVAL) => {
                if let Err(err) = poll_once(&client).await {
                    tracing::warn!(%err, "agent-worker poll failed");
                }
            }
            _ = &mut shutdown => {
                tracing::info!("agent-worker received shutdown signal");
                break;
            }
        }
    }
    Ok(())
}

async fn poll_once(client: &LoopbackClient) -> Result<()> {
    let pending: Vec<AgentExecution> = client
        .list::<AgentExecution>()
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .into_iter()
        .filter(|e| e.status.phase == Phase::Running)
        .collect();

    for execution in pending {
        let id = execution.metadata.id.clone();
        if let Err(err) = handlers::invoke_agent_execution(client, &id).await {
            tracing::error!(execution_id = %id, %err, "agent execution failed");
        }
    }
    Ok(())
}
