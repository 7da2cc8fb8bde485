// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! The loopback gRPC client (§4.4). Bespoke controllers (Agent, Workflow,
//! WorkflowInstance, AgentExecution, WorkflowExecution) hold one of these
//! instead of reaching into another kind's `KvStore` directly.

use super::proto;
use super::proto::resource_command_client::ResourceCommandClient;
use super::proto::resource_query_client::ResourceQueryClient;
use crate::domain::error::StigmerError;
use crate::domain::resource::Envelope;
use tonic::transport::Channel;

#[derive(Clone)]
pub struct LoopbackClient {
    command: ResourceCommandClient<Channel>,
    query: ResourceQueryClient<Channel>,
}

fn status_to_error(status: tonic::Status) -> StigmerError {
    match status.code() {
        tonic::Code::NotFound => StigmerError::NotFound(status.message().to_string()),
        tonic::Code::AlreadyExists => StigmerError::AlreadyExists(status.message().to_string()),
        tonic::Code::InvalidArgument => StigmerError::InvalidArgument(status.message().to_string()),
        tonic::Code::FailedPrecondition => StigmerError::FailedPrecondition(status.message().to_string()),
        tonic::Code::Unavailable => StigmerError::Unavailable(status.message().to_string()),
        tonic::Code::DeadlineExceeded => StigmerError::DeadlineExceeded(status.message().to_string()),
        _ => StigmerError::Internal(status.message().to_string()),
    }
}

fn decode<T: for<'de> serde::Deserialize<'de>>(bytes: &[u8]) -> Result<T, StigmerError> {
    serde_json::from_slice(bytes).map_err(|e| StigmerError::Internal(format!("malformed loopback payload: {e}")))
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, StigmerError> {
    serde_json::to_vec(value).map_err(|e| StigmerError::Internal(format!("serialize failed: {e}")))
}

impl LoopbackClient {
    pub fn new(channel: Channel) -> Self {
        LoopbackClient {
            command: ResourceCommandClient::new(channel.clone()),
            query: ResourceQueryClient::new(channel),
        }
    }

    pub async fn create<T: Envelope>(&self, input: &T) -> Result<T, StigmerError> {
        let req = proto::CreateRequest {
            kind: proto::Kind::from(T::kind()) as i32,
            payload: encode(input)?,
        };
        let reply = self
            .command
            .clone()
            .create(req)
            .await
            .map_err(status_to_error)?
            .into_inner();
        decode(&reply.payload)
    }

    /// Used by the engine workers (separate subprocesses, dialing over the
    /// network listener) to persist execution status transitions — the one
    /// `ResourceCommand` RPC the generic controller pipelines never call on
    /// themselves, since `Persist` writes directly to their own `KvStore`.
    pub async fn update<T: Envelope>(&self, id: &str, input: &T) -> Result<T, StigmerError> {
        let req = proto::UpdateRequest {
            kind: proto::Kind::from(T::kind()) as i32,
            id: id.to_string(),
            payload: encode(input)?,
        };
        let reply = self
            .command
            .clone()
            .update(req)
            .await
            .map_err(status_to_error)?
            .into_inner();
        decode(&reply.payload)
    }

    pub async fn apply<T: Envelope>(&self, input: &T) -> Result<T, StigmerError> {
        let req = proto::ApplyRequest {
            kind: proto::Kind::from(T::kind()) as i32,
            payload: encode(input)?,
        };
        let reply = self
            .command
            .clone()
            .apply(req)
            .await
            .map_err(status_to_error)?
            .into_inner();
        decode(&reply.payload)
    }

    pub async fn get<T: Envelope>(&self, id: &str) -> Result<T, StigmerError> {
        let req = proto::GetRequest {
            kind: proto::Kind::from(T::kind()) as i32,
            id: id.to_string(),
        };
        let reply = self.query.clone().get(req).await.map_err(status_to_error)?.into_inner();
        decode(&reply.payload)
    }

    pub async fn get_by_reference<T: Envelope>(&self, slug: &str) -> Result<T, StigmerError> {
        let req = proto::GetByReferenceRequest {
            kind: proto::Kind::from(T::kind()) as i32,
            slug: slug.to_string(),
        };
        let reply = self
            .query
            .clone()
            .get_by_reference(req)
            .await
            .map_err(status_to_error)?
            .into_inner();
        decode(&reply.payload)
    }

    /// Used by the worker subprocesses to discover pending executions; no
    /// controller pipeline needs this one on itself (`SimpleCrudController`
    /// reads its own `KvStore` directly for `list`).
    pub async fn list<T: Envelope>(&self) -> Result<Vec<T>, StigmerError> {
        let req = proto::ListRequest {
            kind: proto::Kind::from(T::kind()) as i32,
        };
        let reply = self.query.clone().list(req).await.map_err(status_to_error)?.into_inner();
        reply.payloads.iter().map(|bytes| decode(bytes)).collect()
    }

    pub async fn get_by_workflow<T: Envelope>(&self, workflow_id: &str) -> Result<Vec<T>, StigmerError> {
        let req = proto::GetByWorkflowRequest {
            workflow_id: workflow_id.to_string(),
        };
        let reply = self
            .query
            .clone()
            .get_by_workflow(req)
            .await
            .map_err(status_to_error)?
            .into_inner();
        reply.payloads.iter().map(|bytes| decode(bytes)).collect()
    }
}
