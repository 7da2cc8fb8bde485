// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `SimpleCrudController<T>`: Create/Update/Apply/Get/GetByReference/Delete
//! composed entirely from the reusable steps (§4.3's "simple CRUD" row —
//! Skill, MCPServer, Environment — plus the base every richer controller
//! builds on).

use crate::domain::error::StigmerError;
use crate::domain::repository::KvStore;
use crate::domain::resource::{AuditBlock, Envelope};
use crate::pipeline::context::OuterContext;
use crate::pipeline::error::PipelineError;
use crate::pipeline::pipeline::Pipeline;
use crate::pipeline::step::Step;
use crate::pipeline::steps::{
    delete_resource, load_by_slug, BuildNewState, BuildNewStateMode, CheckDuplicate, DuplicateScope, LoadTarget,
    Persist, ResolveSlug, ValidateProto,
};
use crate::pipeline::RequestContext;
use std::sync::Arc;

pub struct SimpleCrudController<T: Envelope> {
    pub store: Arc<dyn KvStore>,
    _marker: std::marker::PhantomData<T>,
}

impl<T: Envelope + 'static> SimpleCrudController<T> {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        SimpleCrudController {
            store,
            _marker: std::marker::PhantomData,
        }
    }

    pub async fn create(&self, caller: &str, input: T) -> Result<T, PipelineError> {
        let mut ctx = RequestContext::new(OuterContext::new(T::kind(), caller), input);
        let pipeline = Pipeline::builder("Create")
            .add_step(Box::new(ValidateProto))
            .add_step(Box::new(ResolveSlug))
            .add_step(Box::new(CheckDuplicate::<T>::new(self.store.clone(), DuplicateScope::Create)))
            .add_step(Box::new(BuildNewState {
                mode: BuildNewStateMode::Create {
                    caller: caller.to_string(),
                },
            }))
            .add_step(Box::new(Persist::<T>::new(self.store.clone())))
            .build();
        pipeline.execute(&mut ctx).await?;
        Ok(ctx.new_state().clone())
    }

    pub async fn update(&self, caller: &str, id: &str, input: T) -> Result<T, PipelineError> {
        let prior = LoadTarget::<T>::new(self.store.clone(), id)
            .load()
            .await
            .map_err(|cause| PipelineError {
                step_name: "LoadTarget".to_string(),
                cause,
            })?;
        let mut ctx = RequestContext::new(OuterContext::new(T::kind(), caller), input);
        let pipeline = Pipeline::builder("Update")
            .add_step(Box::new(ValidateProto))
            .add_step(Box::new(ResolveSlug))
            .add_step(Box::new(CheckDuplicate::<T>::new(
                self.store.clone(),
                DuplicateScope::UpdateExcluding(id.to_string()),
            )))
            .add_step(Box::new(BuildNewState {
                mode: BuildNewStateMode::Update {
                    caller: caller.to_string(),
                    prior: prior.audit().clone(),
                    prior_id: id.to_string(),
                },
            }))
            .add_step(Box::new(Persist::<T>::new(self.store.clone())))
            .build();
        pipeline.execute(&mut ctx).await?;
        Ok(ctx.new_state().clone())
    }

    /// Rewrites `input` over the existing record at `id` without touching its
    /// audit block, re-running validation/slug/duplicate checks but skipping
    /// `BuildNewStateMode::Update`'s event flip (§4.3's system-driven
    /// back-fills — e.g. Agent/Workflow Create writing their auto-created
    /// default instance's id onto themselves — must not surface as an
    /// "updated" resource).
    pub async fn patch_preserving_audit(
        &self,
        caller: &str,
        id: &str,
        input: T,
        audit: AuditBlock,
    ) -> Result<T, PipelineError> {
        let mut ctx = RequestContext::new(OuterContext::new(T::kind(), caller), input);
        let pipeline = Pipeline::builder("Patch")
            .add_step(Box::new(ValidateProto))
            .add_step(Box::new(ResolveSlug))
            .add_step(Box::new(CheckDuplicate::<T>::new(
                self.store.clone(),
                DuplicateScope::UpdateExcluding(id.to_string()),
            )))
            .add_step(Box::new(BuildNewState {
                mode: BuildNewStateMode::Patch {
                    prior_id: id.to_string(),
                    audit,
                },
            }))
            .add_step(Box::new(Persist::<T>::new(self.store.clone())))
            .build();
        pipeline.execute(&mut ctx).await?;
        Ok(ctx.new_state().clone())
    }

    /// Apply delegates to Create or Update (§4.3): preferred over inline
    /// conditional steps so default-instance creation only ever happens
    /// through the Create path.
    pub async fn apply(&self, caller: &str, input: T) -> Result<T, PipelineError> {
        let mut probe = RequestContext::new(OuterContext::new(T::kind(), caller), input.clone());
        ValidateProto.execute(&mut probe).await.map_err(|cause| PipelineError {
            step_name: "ValidateProto".to_string(),
            cause,
        })?;
        ResolveSlug.execute(&mut probe).await.map_err(|cause| PipelineError {
            step_name: "ResolveSlug".to_string(),
            cause,
        })?;
        let slug = probe.new_state().metadata().slug.clone();
        match load_by_slug::<T>(&self.store, &slug).await {
            Ok(existing) => self.update(caller, &existing.metadata().id, input).await,
            Err(StigmerError::NotFound(_)) => self.create(caller, input).await,
            Err(other) => Err(PipelineError {
                step_name: "LoadForApply".to_string(),
                cause: other,
            }),
        }
    }

    pub async fn get(&self, id: &str) -> Result<T, StigmerError> {
        LoadTarget::<T>::new(self.store.clone(), id).load().await
    }

    pub async fn get_by_reference(&self, slug: &str) -> Result<T, StigmerError> {
        load_by_slug::<T>(&self.store, slug).await
    }

    pub async fn delete(&self, id: &str) -> Result<T, StigmerError> {
        delete_resource::<T>(&self.store, id).await
    }

    pub async fn list(&self) -> Result<Vec<T>, StigmerError> {
        let raw = self
            .store
            .list(T::kind())
            .await
            .map_err(|e| StigmerError::Internal(e.to_string()))?;
        raw.iter()
            .map(|bytes| serde_json::from_slice(bytes).map_err(|e| StigmerError::Internal(e.to_string())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{Skill, SkillSpec, SkillStatus};
    use crate::domain::resource::{AuditBlock, Metadata};
    use crate::infrastructure::kv_memory::InMemoryKvStore;
    use chrono::Utc;

    fn skill(name: &str) -> Skill {
        Skill {
            metadata: Metadata {
                name: name.to_string(),
                ..Default::default()
            },
            spec: SkillSpec {
                content: "echo hi".into(),
            },
            status: SkillStatus {
                audit: AuditBlock::on_create("system", Utc::now()),
            },
        }
    }

    #[tokio::test]
    async fn create_then_list_round_trips() {
        let controller = SimpleCrudController::<Skill>::new(Arc::new(InMemoryKvStore::new()));
        let created = controller.create("tester", skill("Bash")).await.unwrap();
        assert!(created.metadata.id.starts_with("skl-"));
        assert_eq!(created.metadata.slug, "bash");
        let listed = controller.list().await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn apply_twice_creates_then_updates() {
        let controller = SimpleCrudController::<Skill>::new(Arc::new(InMemoryKvStore::new()));
        let first = controller.apply("tester", skill("Bash")).await.unwrap();
        assert_eq!(first.status.audit.event, crate::domain::resource::AuditEvent::Created);

        let mut second_input = skill("Bash");
        second_input.spec.content = "echo changed".into();
        let second = controller.apply("tester", second_input).await.unwrap();
        assert_eq!(second.metadata.id, first.metadata.id);
        assert_eq!(second.status.audit.created_at, first.status.audit.created_at);
        assert_eq!(second.status.audit.event, crate::domain::resource::AuditEvent::Updated);

        assert_eq!(controller.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_missing_is_not_found() {
        let controller = SimpleCrudController::<Skill>::new(Arc::new(InMemoryKvStore::new()));
        let err = controller.delete("skl-missing").await.unwrap_err();
        assert!(matches!(err, StigmerError::NotFound(_)));
    }
}
