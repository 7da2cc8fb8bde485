// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! The reusable steps named in §4.2's contract table. Each is generic over
//! any kind implementing `Envelope`, so adding a new kind to the system is a
//! matter of composing these, never reimplementing them (§4.3).

use super::context::RequestContext;
use super::step::Step;
use crate::domain::error::StigmerError;
use crate::domain::kind::{derive_slug, generate_id};
use crate::domain::repository::KvStore;
use crate::domain::resource::{AuditBlock, Envelope};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

/// Runs first: rejects unset required fields or violated constraints.
pub struct ValidateProto;

#[async_trait]
impl<T: Envelope> Step<T> for ValidateProto {
    fn name(&self) -> &str {
        "ValidateProto"
    }

    async fn execute(&self, ctx: &mut RequestContext<T>) -> Result<(), StigmerError> {
        if let Some(violation) = ctx.new_state().validate_fields() {
            return Err(StigmerError::InvalidArgument(violation));
        }
        Ok(())
    }
}

/// If `metadata.slug` is empty, derive it from `metadata.name`.
pub struct ResolveSlug;

#[async_trait]
impl<T: Envelope> Step<T> for ResolveSlug {
    fn name(&self) -> &str {
        "ResolveSlug"
    }

    async fn execute(&self, ctx: &mut RequestContext<T>) -> Result<(), StigmerError> {
        let name = ctx.new_state().metadata().name.clone();
        if name.trim().is_empty() {
            return Err(StigmerError::InvalidArgument(
                "metadata.name must be non-empty before slug resolution".to_string(),
            ));
        }
        if ctx.new_state().metadata().slug.is_empty() {
            let slug = derive_slug(&name);
            ctx.new_state_mut().metadata_mut().slug = slug;
        }
        Ok(())
    }
}

pub enum DuplicateScope {
    Create,
    /// update/apply: scope the duplicate check to "other than this id".
    UpdateExcluding(String),
}

/// For create: AlreadyExists if a resource with the same (kind, slug, scope,
/// owner) exists. For update/apply, excludes the id being updated.
pub struct CheckDuplicate<T: Envelope> {
    pub store: Arc<dyn KvStore>,
    pub scope: DuplicateScope,
    _marker: std::marker::PhantomData<T>,
}

impl<T: Envelope> CheckDuplicate<T> {
    pub fn new(store: Arc<dyn KvStore>, scope: DuplicateScope) -> Self {
        CheckDuplicate {
            store,
            scope,
            _marker: std::marker::PhantomData,
        }
    }
}

#[async_trait]
impl<T: Envelope> Step<T> for CheckDuplicate<T> {
    fn name(&self) -> &str {
        "CheckDuplicate"
    }

    async fn execute(&self, ctx: &mut RequestContext<T>) -> Result<(), StigmerError> {
        let slug = ctx.new_state().metadata().slug.clone();
        let owner = ctx.new_state().metadata().owner.clone();
        let raw = self
            .store
            .list(T::kind())
            .await
            .map_err(|e| StigmerError::Internal(e.to_string()))?;
        for bytes in raw {
            let existing: T = serde_json::from_slice(&bytes)
                .map_err(|e| StigmerError::Internal(format!("corrupt stored resource: {e}")))?;
            if existing.metadata().slug != slug || existing.metadata().owner != owner {
                continue;
            }
            match &self.scope {
                DuplicateScope::Create => {
                    return Err(StigmerError::AlreadyExists(format!(
                        "{} with slug '{}' already exists",
                        T::kind(),
                        slug
                    )));
                }
                DuplicateScope::UpdateExcluding(id) => {
                    if &existing.metadata().id != id {
                        return Err(StigmerError::AlreadyExists(format!(
                            "{} with slug '{}' already exists",
                            T::kind(),
                            slug
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

pub enum BuildNewStateMode {
    Create { caller: String },
    Update { caller: String, prior: AuditBlock, prior_id: String },
    /// Rewrites fields on an existing resource without touching its audit
    /// block at all — used for system-driven back-fills (e.g. writing the
    /// auto-created default instance's id onto its parent) that must not be
    /// observable as an "updated" event (§8 Testable Property 1: Create's
    /// response always carries `audit.event == "created"`).
    Patch { prior_id: String, audit: AuditBlock },
}

/// Clears `status` to system-produced fields only (§3: status is never
/// trusted from a client) and populates `status.audit`.
pub struct BuildNewState {
    pub mode: BuildNewStateMode,
}

#[async_trait]
impl<T: Envelope> Step<T> for BuildNewState {
    fn name(&self) -> &str {
        "BuildNewState"
    }

    async fn execute(&self, ctx: &mut RequestContext<T>) -> Result<(), StigmerError> {
        let now = Utc::now();
        match &self.mode {
            BuildNewStateMode::Create { caller } => {
                let id = generate_id(T::kind(), now.timestamp_millis() as u64, rand::random());
                ctx.new_state_mut().metadata_mut().id = id;
                ctx.new_state_mut().set_audit(AuditBlock::on_create(caller, now));
            }
            BuildNewStateMode::Update {
                caller,
                prior,
                prior_id,
            } => {
                ctx.new_state_mut().metadata_mut().id = prior_id.clone();
                ctx.new_state_mut()
                    .set_audit(AuditBlock::on_update(prior, caller, now));
            }
            BuildNewStateMode::Patch { prior_id, audit } => {
                ctx.new_state_mut().metadata_mut().id = prior_id.clone();
                ctx.new_state_mut().set_audit(audit.clone());
            }
        }
        Ok(())
    }
}

/// Save the current `new_state` to the KV store.
pub struct Persist<T: Envelope> {
    pub store: Arc<dyn KvStore>,
    _marker: std::marker::PhantomData<T>,
}

impl<T: Envelope> Persist<T> {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Persist {
            store,
            _marker: std::marker::PhantomData,
        }
    }
}

#[async_trait]
impl<T: Envelope> Step<T> for Persist<T> {
    fn name(&self) -> &str {
        "Persist"
    }

    async fn execute(&self, ctx: &mut RequestContext<T>) -> Result<(), StigmerError> {
        let id = ctx.new_state().metadata().id.clone();
        let bytes = serde_json::to_vec(ctx.new_state())
            .map_err(|e| StigmerError::Internal(format!("serialize failed: {e}")))?;
        self.store
            .save(T::kind(), &id, bytes)
            .await
            .map_err(|e| StigmerError::Internal(e.to_string()))?;
        Ok(())
    }
}

/// Load by id (Get); NotFound if missing. Stores into `metadata.target_resource_id`.
pub struct LoadTarget<T: Envelope> {
    pub store: Arc<dyn KvStore>,
    pub id: String,
    _marker: std::marker::PhantomData<T>,
}

impl<T: Envelope> LoadTarget<T> {
    pub fn new(store: Arc<dyn KvStore>, id: impl Into<String>) -> Self {
        LoadTarget {
            store,
            id: id.into(),
            _marker: std::marker::PhantomData,
        }
    }

    pub async fn load(&self) -> Result<T, StigmerError> {
        let bytes = self
            .store
            .get(T::kind(), &self.id)
            .await
            .map_err(|e| StigmerError::Internal(e.to_string()))?
            .ok_or_else(|| StigmerError::NotFound(format!("{} '{}' not found", T::kind(), self.id)))?;
        serde_json::from_slice(&bytes).map_err(|e| StigmerError::Internal(e.to_string()))
    }
}

#[async_trait]
impl<T: Envelope> Step<T> for LoadTarget<T> {
    fn name(&self) -> &str {
        "LoadTarget"
    }

    async fn execute(&self, ctx: &mut RequestContext<T>) -> Result<(), StigmerError> {
        let found = self.load().await?;
        ctx.metadata.target_resource_id = Some(found.metadata().id.clone());
        ctx.set_new_state(found);
        Ok(())
    }
}

/// Get-by-slug: list-and-match within (kind, scope).
pub async fn load_by_slug<T: Envelope>(store: &Arc<dyn KvStore>, slug: &str) -> Result<T, StigmerError> {
    let raw = store
        .list(T::kind())
        .await
        .map_err(|e| StigmerError::Internal(e.to_string()))?;
    for bytes in raw {
        let candidate: T = serde_json::from_slice(&bytes).map_err(|e| StigmerError::Internal(e.to_string()))?;
        if candidate.metadata().slug == slug {
            return Ok(candidate);
        }
    }
    Err(StigmerError::NotFound(format!(
        "{} with slug '{}' not found",
        T::kind(),
        slug
    )))
}

/// Delete by id; NotFound if missing. Returns the deleted resource.
pub async fn delete_resource<T: Envelope>(store: &Arc<dyn KvStore>, id: &str) -> Result<T, StigmerError> {
    let bytes = store
        .delete(T::kind(), id)
        .await
        .map_err(|e| StigmerError::Internal(e.to_string()))?
        .ok_or_else(|| StigmerError::NotFound(format!("{} '{}' not found", T::kind(), id)))?;
    serde_json::from_slice(&bytes).map_err(|e| StigmerError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent::{Agent, AgentSpec, AgentStatus};
    use crate::domain::resource::Metadata;
    use crate::infrastructure::kv_memory::InMemoryKvStore;
    use crate::pipeline::context::OuterContext;
    use crate::domain::kind::Kind;

    fn new_agent(name: &str) -> Agent {
        Agent {
            metadata: Metadata {
                name: name.to_string(),
                ..Default::default()
            },
            spec: AgentSpec::default(),
            status: AgentStatus {
                default_instance_id: String::new(),
                audit: AuditBlock::on_create("system", Utc::now()),
            },
        }
    }

    #[tokio::test]
    async fn resolve_slug_derives_from_name() {
        let mut ctx = RequestContext::new(
            OuterContext::new(Kind::Agent, "tester"),
            new_agent("Code Reviewer"),
        );
        ResolveSlug.execute(&mut ctx).await.unwrap();
        assert_eq!(ctx.new_state().metadata.slug, "code-reviewer");
    }

    #[tokio::test]
    async fn resolve_slug_rejects_empty_name() {
        let mut ctx = RequestContext::new(OuterContext::new(Kind::Agent, "tester"), new_agent(""));
        let err = ResolveSlug.execute(&mut ctx).await.unwrap_err();
        assert!(matches!(err, StigmerError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn duplicate_create_rejected_after_persist() {
        let store: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let mut ctx = RequestContext::new(
            OuterContext::new(Kind::Agent, "tester"),
            new_agent("Code Reviewer"),
        );
        ResolveSlug.execute(&mut ctx).await.unwrap();
        BuildNewState {
            mode: BuildNewStateMode::Create {
                caller: "tester".into(),
            },
        }
        .execute(&mut ctx)
        .await
        .unwrap();
        Persist::<Agent>::new(store.clone()).execute(&mut ctx).await.unwrap();

        let mut ctx2 = RequestContext::new(
            OuterContext::new(Kind::Agent, "tester"),
            new_agent("Code Reviewer"),
        );
        ResolveSlug.execute(&mut ctx2).await.unwrap();
        let dup = CheckDuplicate::<Agent>::new(store.clone(), DuplicateScope::Create)
            .execute(&mut ctx2)
            .await;
        assert!(matches!(dup, Err(StigmerError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn update_preserves_created_at() {
        let created = AuditBlock::on_create("alice", Utc::now());
        let mut ctx = RequestContext::new(OuterContext::new(Kind::Agent, "bob"), new_agent("X"));
        BuildNewState {
            mode: BuildNewStateMode::Update {
                caller: "bob".into(),
                prior: created.clone(),
                prior_id: "agt-existing".into(),
            },
        }
        .execute(&mut ctx)
        .await
        .unwrap();
        assert_eq!(ctx.new_state().metadata.id, "agt-existing");
        assert_eq!(ctx.new_state().status.audit.created_by, "alice");
        assert_eq!(ctx.new_state().status.audit.created_at, created.created_at);
        assert_eq!(ctx.new_state().status.audit.updated_by, "bob");
    }
}
