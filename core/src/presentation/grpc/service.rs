// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Service impls for `ResourceCommand`, `ResourceQuery` and `InternalControl`
//! (§4.4, §6). Every RPC resolves its `Kind` field to a controller through
//! `ControllerRegistry`; no match-per-kind branching lives here.

use super::proto;
use super::proto_kind_from_i32;
use crate::application::controllers::ControllerRegistry;
use crate::domain::error::StigmerError;
use crate::domain::kind::Kind;
use tonic::{Request, Response, Status};

fn resolve_kind(raw: i32) -> Result<Kind, Status> {
    Kind::try_from(proto_kind_from_i32(raw))
}

fn stigmer_status(err: StigmerError) -> Status {
    Status::new(err.code(), err.to_string())
}

#[derive(Clone)]
pub struct ResourceCommandService {
    registry: ControllerRegistry,
}

impl ResourceCommandService {
    pub fn new(registry: ControllerRegistry) -> Self {
        ResourceCommandService { registry }
    }
}

#[tonic::async_trait]
impl proto::resource_command_server::ResourceCommand for ResourceCommandService {
    async fn create(&self, request: Request<proto::CreateRequest>) -> Result<Response<proto::ResourceReply>, Status> {
        let req = request.into_inner();
        let kind = resolve_kind(req.kind)?;
        let controller = self.registry.get(kind).map_err(stigmer_status)?;
        let payload = controller.create("loopback", req.payload).await?;
        tracing::info!(%kind, event = "created", "resource command served");
        Ok(Response::new(proto::ResourceReply {
            kind: req.kind,
            payload,
        }))
    }

    async fn update(&self, request: Request<proto::UpdateRequest>) -> Result<Response<proto::ResourceReply>, Status> {
        let req = request.into_inner();
        let kind = resolve_kind(req.kind)?;
        let controller = self.registry.get(kind).map_err(stigmer_status)?;
        let payload = controller.update("loopback", &req.id, req.payload).await?;
        tracing::info!(%kind, id = %req.id, event = "updated", "resource command served");
        Ok(Response::new(proto::ResourceReply {
            kind: req.kind,
            payload,
        }))
    }

    async fn apply(&self, request: Request<proto::ApplyRequest>) -> Result<Response<proto::ResourceReply>, Status> {
        let req = request.into_inner();
        let kind = resolve_kind(req.kind)?;
        let controller = self.registry.get(kind).map_err(stigmer_status)?;
        let payload = controller.apply("loopback", req.payload).await?;
        tracing::info!(%kind, event = "applied", "resource command served");
        Ok(Response::new(proto::ResourceReply {
            kind: req.kind,
            payload,
        }))
    }

    async fn delete(&self, request: Request<proto::DeleteRequest>) -> Result<Response<proto::ResourceReply>, Status> {
        let req = request.into_inner();
        let kind = resolve_kind(req.kind)?;
        let controller = self.registry.get(kind).map_err(stigmer_status)?;
        let payload = controller.delete(&req.id).await.map_err(stigmer_status)?;
        tracing::info!(%kind, id = %req.id, event = "deleted", "resource command served");
        Ok(Response::new(proto::ResourceReply {
            kind: req.kind,
            payload,
        }))
    }
}

#[derive(Clone)]
pub struct ResourceQueryService {
    registry: ControllerRegistry,
}

impl ResourceQueryService {
    pub fn new(registry: ControllerRegistry) -> Self {
        ResourceQueryService { registry }
    }
}

#[tonic::async_trait]
impl proto::resource_query_server::ResourceQuery for ResourceQueryService {
    async fn get(&self, request: Request<proto::GetRequest>) -> Result<Response<proto::ResourceReply>, Status> {
        let req = request.into_inner();
        let kind = resolve_kind(req.kind)?;
        let controller = self.registry.get(kind).map_err(stigmer_status)?;
        let payload = controller.get(&req.id).await.map_err(stigmer_status)?;
        Ok(Response::new(proto::ResourceReply {
            kind: req.kind,
            payload,
        }))
    }

    async fn get_by_reference(
        &self,
        request: Request<proto::GetByReferenceRequest>,
    ) -> Result<Response<proto::ResourceReply>, Status> {
        let req = request.into_inner();
        let kind = resolve_kind(req.kind)?;
        let controller = self.registry.get(kind).map_err(stigmer_status)?;
        let payload = controller.get_by_reference(&req.slug).await.map_err(stigmer_status)?;
        Ok(Response::new(proto::ResourceReply {
            kind: req.kind,
            payload,
        }))
    }

    async fn list(&self, request: Request<proto::ListRequest>) -> Result<Response<proto::ListReply>, Status> {
        let req = request.into_inner();
        let kind = resolve_kind(req.kind)?;
        let controller = self.registry.get(kind).map_err(stigmer_status)?;
        let payloads = controller.list().await.map_err(stigmer_status)?;
        Ok(Response::new(proto::ListReply {
            kind: req.kind,
            payloads,
        }))
    }

    /// §4.3 custom query: filters persisted WorkflowInstances by
    /// `spec.workflow_id` in memory — acceptable at local scale (§9 open question).
    async fn get_by_workflow(
        &self,
        request: Request<proto::GetByWorkflowRequest>,
    ) -> Result<Response<proto::ListReply>, Status> {
        let req = request.into_inner();
        let controller = self.registry.get(Kind::WorkflowInstance).map_err(stigmer_status)?;
        let all = controller.list().await.map_err(stigmer_status)?;
        let matching = all
            .into_iter()
            .filter(|bytes| {
                serde_json::from_slice::<serde_json::Value>(bytes)
                    .ok()
                    .and_then(|v| v.get("spec").and_then(|s| s.get("workflow_id")).cloned())
                    .and_then(|v| v.as_str().map(|s| s == req.workflow_id))
                    .unwrap_or(false)
            })
            .collect();
        Ok(Response::new(proto::ListReply {
            kind: proto::Kind::WorkflowInstance as i32,
            payloads: matching,
        }))
    }
}

/// Reachable only over the in-process loopback: `server::serve_network`
/// never registers `InternalControlServer`, so a TCP-origin call has no
/// handler to reach rather than being turned away by an interceptor.
#[derive(Clone)]
pub struct InternalControlService {
    registry: ControllerRegistry,
}

impl InternalControlService {
    pub fn new(registry: ControllerRegistry) -> Self {
        InternalControlService { registry }
    }
}

#[tonic::async_trait]
impl proto::internal_control_server::InternalControl for InternalControlService {
    async fn update_status(
        &self,
        request: Request<proto::UpdateStatusRequest>,
    ) -> Result<Response<proto::ResourceReply>, Status> {
        let req = request.into_inner();
        let kind = resolve_kind(req.kind)?;
        let controller = self.registry.get(kind).map_err(stigmer_status)?;

        let current = controller.get(&req.id).await.map_err(stigmer_status)?;
        let mut merged: serde_json::Value =
            serde_json::from_slice(&current).map_err(|e| Status::internal(e.to_string()))?;
        let new_status: serde_json::Value =
            serde_json::from_slice(&req.status_payload).map_err(|e| Status::invalid_argument(e.to_string()))?;
        if let Some(obj) = merged.as_object_mut() {
            obj.insert("status".to_string(), new_status);
        }
        let merged_bytes = serde_json::to_vec(&merged).map_err(|e| Status::internal(e.to_string()))?;

        let payload = controller.update(&req.caller_identity, &req.id, merged_bytes).await?;
        tracing::info!(%kind, id = %req.id, event = "status_updated", "internal control served");
        Ok(Response::new(proto::ResourceReply {
            kind: req.kind,
            payload,
        }))
    }

    async fn report_workflow_progress(
        &self,
        request: Request<proto::WorkflowProgressRequest>,
    ) -> Result<Response<proto::Empty>, Status> {
        let req = request.into_inner();
        tracing::info!(
            execution_id = %req.execution_id,
            phase = %req.phase,
            detail = %req.detail,
            "workflow progress reported"
        );
        Ok(Response::new(proto::Empty {}))
    }
}
