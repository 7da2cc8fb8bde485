// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::{Context, Result};
use stigmer_core::domain::agent::{Agent, AgentInstance};
use stigmer_core::domain::execution::{AgentExecution, WorkflowExecution};
use stigmer_core::domain::resource::Envelope;
use stigmer_core::domain::workflow::{Workflow, WorkflowInstance};
use stigmer_core::presentation::grpc::client::LoopbackClient;
use tonic::transport::Endpoint;

/// Typed client over the daemon's `ResourceCommand`/`ResourceQuery` gRPC
/// surface. Workers and the CLI dial the daemon's network listener with
/// this the same way bespoke controllers dial the in-process loopback —
/// `LoopbackClient` is generic over the `tonic::transport::Channel`, so
/// there is no separate "remote" protocol to maintain.
pub struct StigmerClient {
    inner: LoopbackClient,
}

impl StigmerClient {
    /// Connects to the daemon's backend gRPC server at `addr`
    /// (e.g. `http://127.0.0.1:7234`).
    pub async fn connect(addr: impl Into<String>) -> Result<Self> {
        let endpoint = Endpoint::from_shared(addr.into()).context("invalid daemon address")?;
        let channel = endpoint.connect().await.context("could not dial the daemon")?;
        Ok(StigmerClient {
            inner: LoopbackClient::new(channel),
        })
    }

    pub fn from_channel(channel: tonic::transport::Channel) -> Self {
        StigmerClient {
            inner: LoopbackClient::new(channel),
        }
    }

    pub async fn create<T: Envelope>(&self, input: &T) -> Result<T> {
        self.inner.create(input).await.map_err(Into::into)
    }

    pub async fn update<T: Envelope>(&self, id: &str, input: &T) -> Result<T> {
        self.inner.update(id, input).await.map_err(Into::into)
    }

    pub async fn apply<T: Envelope>(&self, input: &T) -> Result<T> {
        self.inner.apply(input).await.map_err(Into::into)
    }

    pub async fn get<T: Envelope>(&self, id: &str) -> Result<T> {
        self.inner.get(id).await.map_err(Into::into)
    }

    pub async fn get_by_reference<T: Envelope>(&self, slug: &str) -> Result<T> {
        self.inner.get_by_reference(slug).await.map_err(Into::into)
    }

    pub async fn list<T: Envelope>(&self) -> Result<Vec<T>> {
        self.inner.list().await.map_err(Into::into)
    }

    pub async fn run_agent(&self, agent_id: &str, session_id: &str) -> Result<AgentExecution> {
        let execution = AgentExecution {
            metadata: Default::default(),
            spec: stigmer_core::domain::execution::AgentExecutionSpec {
                agent_id: agent_id.to_string(),
                session_id: session_id.to_string(),
                ..Default::default()
            },
            status: stigmer_core::domain::execution::AgentExecutionStatus {
                phase: stigmer_core::domain::execution::Phase::Pending,
                temporal_workflow_id: String::new(),
                error: None,
                todos: vec![],
                audit: stigmer_core::domain::resource::AuditBlock::on_create("sdk", chrono::Utc::now()),
            },
        };
        self.create(&execution).await
    }

    pub async fn run_workflow(&self, workflow_instance_id: &str, trigger_message: &str) -> Result<WorkflowExecution> {
        let execution = WorkflowExecution {
            metadata: Default::default(),
            spec: stigmer_core::domain::execution::WorkflowExecutionSpec {
                workflow_instance_id: workflow_instance_id.to_string(),
                trigger_message: trigger_message.to_string(),
                ..Default::default()
            },
            status: stigmer_core::domain::execution::WorkflowExecutionStatus {
                phase: stigmer_core::domain::execution::Phase::Pending,
                temporal_workflow_id: String::new(),
                audit: stigmer_core::domain::resource::AuditBlock::on_create("sdk", chrono::Utc::now()),
            },
        };
        self.create(&execution).await
    }

    pub async fn get_agent(&self, id: &str) -> Result<Agent> {
        self.get(id).await
    }

    pub async fn get_agent_instance(&self, id: &str) -> Result<AgentInstance> {
        self.get(id).await
    }

    pub async fn get_workflow(&self, id: &str) -> Result<Workflow> {
        self.get(id).await
    }

    pub async fn get_workflow_instance(&self, id: &str) -> Result<WorkflowInstance> {
        self.get(id).await
    }
}
