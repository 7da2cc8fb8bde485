// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `SessionController` (§4.3): Create is `ValidateProto → ResolveSlug →
//! BuildNewState → Persist` with no duplicate check — unlike the simple-CRUD
//! resources, two Sessions may legitimately share a slug (e.g.
//! `ResolveSessionFromAgent` deriving the same `{slug}-session` name for
//! every execution against an agent that has no explicit session).

use super::generic::SimpleCrudController;
use super::DynController;
use crate::domain::error::StigmerError;
use crate::domain::repository::KvStore;
use crate::domain::resource::Envelope;
use crate::domain::session::Session;
use crate::pipeline::context::OuterContext;
use crate::pipeline::error::PipelineError;
use crate::pipeline::pipeline::Pipeline;
use crate::pipeline::steps::{BuildNewState, BuildNewStateMode, Persist, ResolveSlug, ValidateProto};
use crate::pipeline::RequestContext;
use async_trait::async_trait;
use std::sync::Arc;

pub struct SessionController {
    inner: SimpleCrudController<Session>,
    store: Arc<dyn KvStore>,
}

impl SessionController {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        SessionController {
            inner: SimpleCrudController::new(store.clone()),
            store,
        }
    }

    pub async fn create(&self, caller: &str, input: Session) -> Result<Session, PipelineError> {
        let mut ctx = RequestContext::new(OuterContext::new(Session::kind(), caller), input);
        let pipeline = Pipeline::builder("SessionCreate")
            .add_step(Box::new(ValidateProto))
            .add_step(Box::new(ResolveSlug))
            .add_step(Box::new(BuildNewState {
                mode: BuildNewStateMode::Create {
                    caller: caller.to_string(),
                },
            }))
            .add_step(Box::new(Persist::<Session>::new(self.store.clone())))
            .build();
        pipeline.execute(&mut ctx).await?;
        Ok(ctx.new_state().clone())
    }
}

#[async_trait]
impl DynController for SessionController {
    async fn create(&self, caller: &str, payload: Vec<u8>) -> Result<Vec<u8>, PipelineError> {
        let input: Session = serde_json::from_slice(&payload).map_err(|e| PipelineError {
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
        DynController::update(&self.inner, caller, id, payload).await
    }

    async fn apply(&self, caller: &str, payload: Vec<u8>) -> Result<Vec<u8>, PipelineError> {
        DynController::apply(&self.inner, caller, payload).await
    }

    async fn get(&self, id: &str) -> Result<Vec<u8>, StigmerError> {
        DynController::get(&self.inner, id).await
    }

    async fn get_by_reference(&self, slug: &str) -> Result<Vec<u8>, StigmerError> {
        DynController::get_by_reference(&self.inner, slug).await
    }

    async fn delete(&self, id: &str) -> Result<Vec<u8>, StigmerError> {
        DynController::delete(&self.inner, id).await
    }

    async fn list(&self) -> Result<Vec<Vec<u8>>, StigmerError> {
        DynController::list(&self.inner).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::resource::{AuditBlock, Metadata};
    use crate::domain::session::{SessionSpec, SessionStatus};
    use crate::infrastructure::kv_memory::InMemoryKvStore;
    use chrono::Utc;

    fn session(name: &str) -> Session {
        Session {
            metadata: Metadata {
                name: name.to_string(),
                ..Default::default()
            },
            spec: SessionSpec::default(),
            status: SessionStatus {
                audit: AuditBlock::on_create("system", Utc::now()),
            },
        }
    }

    #[tokio::test]
    async fn create_twice_with_same_name_does_not_conflict() {
        let controller = SessionController::new(Arc::new(InMemoryKvStore::new()));
        let first = controller.create("tester", session("reviewer-session")).await.unwrap();
        let second = controller.create("tester", session("reviewer-session")).await.unwrap();
        assert_ne!(first.metadata.id, second.metadata.id);
        assert_eq!(first.metadata.slug, second.metadata.slug);
        assert_eq!(controller.inner.list().await.unwrap().len(), 2);
    }
}
