// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `AgentController` (§4.3): Create auto-builds a `{slug}-default`
//! AgentInstance over the loopback and writes its id back into
//! `status.default_instance_id` before the create RPC returns.

use super::generic::SimpleCrudController;
use super::DynController;
use crate::domain::agent::{Agent, AgentInstance, AgentInstanceSpec, AgentInstanceStatus};
use crate::domain::error::StigmerError;
use crate::domain::repository::KvStore;
use crate::domain::resource::{AuditBlock, Metadata};
use crate::pipeline::error::PipelineError;
use crate::presentation::grpc::client::LoopbackClient;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

pub struct AgentController {
    inner: SimpleCrudController<Agent>,
    loopback: LoopbackClient,
}

impl AgentController {
    pub fn new(store: Arc<dyn KvStore>, loopback: LoopbackClient) -> Self {
        AgentController {
            inner: SimpleCrudController::new(store),
            loopback,
        }
    }

    async fn create_default_instance(&self, caller: &str, agent: &Agent) -> Result<AgentInstance, StigmerError> {
        let instance = AgentInstance {
            metadata: Metadata {
                name: format!("{}-default", agent.metadata.slug),
                owner: agent.metadata.owner.clone(),
                ..Default::default()
            },
            spec: AgentInstanceSpec {
                agent_id: agent.metadata.id.clone(),
                env: Default::default(),
            },
            status: AgentInstanceStatus {
                audit: AuditBlock::on_create(caller, Utc::now()),
            },
        };
        self.loopback.create(&instance).await
    }

    pub async fn create(&self, caller: &str, input: Agent) -> Result<Agent, PipelineError> {
        let created = self.inner.create(caller, input).await?;
        let instance = self
            .create_default_instance(caller, &created)
            .await
            .map_err(|cause| PipelineError {
                step_name: "CreateDefaultInstance".to_string(),
                cause,
            })?;
        let audit = created.status.audit.clone();
        let mut with_instance = created;
        with_instance.status.default_instance_id = instance.metadata.id;
        let id = with_instance.metadata.id.clone();
        self.inner.patch_preserving_audit(caller, &id, with_instance, audit).await
    }
}

#[async_trait]
impl DynController for AgentController {
    async fn create(&self, caller: &str, payload: Vec<u8>) -> Result<Vec<u8>, PipelineError> {
        let input: Agent = serde_json::from_slice(&payload).map_err(|e| PipelineError {
            step_name: "DecodePayload".to_string(),
            cause: StigmerError::InvalidArgument(format!("malformed payload: {e}")),
        })?;
        let out = self.create(caller, input).await?;
        serde_json::to_vec(&out).map_err(|e| PipelineError {
            step_name: "EncodeResult".to_string(),
            cause: StigmerError::Internal(format!("serialize failed: {e}")),
        })
    }

    async fn update(&self, caller: &str, id: &str, payload: Vec<u8>) -> Result<Vec<u8>, PipelineError> {
        let input: Agent = serde_json::from_slice(&payload).map_err(|e| PipelineError {
            step_name: "DecodePayload".to_string(),
            cause: StigmerError::InvalidArgument(format!("malformed payload: {e}")),
        })?;
        let out = self.inner.update(caller, id, input).await?;
        serde_json::to_vec(&out).map_err(|e| PipelineError {
            step_name: "EncodeResult".to_string(),
            cause: StigmerError::Internal(format!("serialize failed: {e}")),
        })
    }

    async fn apply(&self, caller: &str, payload: Vec<u8>) -> Result<Vec<u8>, PipelineError> {
        let input: Agent = serde_json::from_slice(&payload).map_err(|e| PipelineError {
            step_name: "DecodePayload".to_string(),
            cause: StigmerError::InvalidArgument(format!("malformed payload: {e}")),
        })?;
        let out = self.inner.apply(caller, input).await?;
        serde_json::to_vec(&out).map_err(|e| PipelineError {
            step_name: "EncodeResult".to_string(),
            cause: StigmerError::Internal(format!("serialize failed: {e}")),
        })
    }

    async fn get(&self, id: &str) -> Result<Vec<u8>, StigmerError> {
        let out = self.inner.get(id).await?;
        serde_json::to_vec(&out).map_err(|e| StigmerError::Internal(format!("serialize failed: {e}")))
    }

    async fn get_by_reference(&self, slug: &str) -> Result<Vec<u8>, StigmerError> {
        let out = self.inner.get_by_reference(slug).await?;
        serde_json::to_vec(&out).map_err(|e| StigmerError::Internal(format!("serialize failed: {e}")))
    }

    async fn delete(&self, id: &str) -> Result<Vec<u8>, StigmerError> {
        let out = self.inner.delete(id).await?;
        serde_json::to_vec(&out).map_err(|e| StigmerError::Internal(format!("serialize failed: {e}")))
    }

    async fn list(&self) -> Result<Vec<Vec<u8>>, StigmerError> {
        let out = self.inner.list().await?;
        out.iter()
            .map(|item| serde_json::to_vec(item).map_err(|e| StigmerError::Internal(format!("serialize failed: {e}"))))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::controllers::generic::SimpleCrudController as Generic;
    use crate::domain::agent::AgentSpec;
    use crate::domain::agent::AgentStatus;
    use crate::domain::kind::Kind;
    use crate::infrastructure::kv_memory::InMemoryKvStore;

    async fn test_registry() -> (ControllerRegistryForTest, LoopbackClient) {
        use crate::application::controllers::ControllerRegistry;
        use crate::presentation::grpc::server::spawn_loopback;

        let store: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let registry = ControllerRegistry::new();
        registry.register(
            Kind::AgentInstance,
            Arc::new(Generic::<AgentInstance>::new(store.clone())),
        );
        let loopback = spawn_loopback(registry.clone()).await.unwrap();
        (ControllerRegistryForTest { registry, store }, loopback)
    }

    struct ControllerRegistryForTest {
        #[allow(dead_code)]
        registry: crate::application::controllers::ControllerRegistry,
        store: Arc<dyn KvStore>,
    }

    #[tokio::test]
    async fn create_populates_default_instance_id() {
        let (ctx, loopback) = test_registry().await;
        let controller = AgentController::new(ctx.store.clone(), loopback);
        let agent = Agent {
            metadata: Metadata {
                name: "Code Reviewer".into(),
                ..Default::default()
            },
            spec: AgentSpec::default(),
            status: AgentStatus {
                default_instance_id: String::new(),
                audit: AuditBlock::on_create("system", Utc::now()),
            },
        };
        let created = controller.create("tester", agent).await.unwrap();
        assert!(!created.status.default_instance_id.is_empty());
        assert!(created.status.default_instance_id.starts_with("agi-"));
        assert_eq!(created.status.audit.event, crate::domain::resource::AuditEvent::Created);
    }
}
