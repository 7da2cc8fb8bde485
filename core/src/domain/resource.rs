// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! The common resource envelope shared by every persisted kind (§3).
//!
//! Reflection-based audit population (the source system's approach) is
//! replaced per Design Note §9 with a small `HasAudit` capability each
//! status type implements, rather than a reflective walker.

use super::kind::Kind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerScope {
    Organization,
    IdentityAccount,
    Platform,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub scope: OwnerScope,
    pub owner_id: String,
}

pub type Annotations = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub annotations: Annotations,
    pub owner: Option<Owner>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEvent {
    Created,
    Updated,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditBlock {
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_by: String,
    pub updated_at: DateTime<Utc>,
    pub event: AuditEvent,
}

impl AuditBlock {
    pub fn on_create(caller: &str, now: DateTime<Utc>) -> Self {
        AuditBlock {
            created_by: caller.to_string(),
            created_at: now,
            updated_by: caller.to_string(),
            updated_at: now,
            event: AuditEvent::Created,
        }
    }

    /// §3: preserve `created_by`/`created_at`, refresh `updated_*`, event=updated.
    pub fn on_update(prior: &AuditBlock, caller: &str, now: DateTime<Utc>) -> Self {
        AuditBlock {
            created_by: prior.created_by.clone(),
            created_at: prior.created_at,
            updated_by: caller.to_string(),
            updated_at: now,
            event: AuditEvent::Updated,
        }
    }
}

/// Implemented by every kind's Status type so BuildNewState can populate the
/// audit block without reflection (Design Note §9).
pub trait HasAudit {
    fn audit(&self) -> &AuditBlock;
    fn audit_mut(&mut self) -> &mut AuditBlock;
}

/// The generic envelope: `{metadata, spec, status}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource<Spec, Status> {
    pub metadata: Metadata,
    pub spec: Spec,
    pub status: Status,
}

impl<Spec, Status> Resource<Spec, Status>
where
    Status: HasAudit,
{
    pub fn audit(&self) -> &AuditBlock {
        self.status.audit()
    }
}

/// The narrow surface the generic pipeline steps need from any resource kind
/// (Design Note §9: "keep the step interface narrow, push kind-specific
/// concerns into per-kind steps"). Each kind implements this once; the
/// reusable steps (ResolveSlug, BuildNewState, Persist, ...) are written
/// against this trait only, never against a specific kind.
pub trait Envelope: Clone + Send + Sync + Serialize + for<'de> Deserialize<'de> {
    fn kind() -> Kind;
    fn metadata(&self) -> &Metadata;
    fn metadata_mut(&mut self) -> &mut Metadata;
    fn audit(&self) -> &AuditBlock;
    fn set_audit(&mut self, audit: AuditBlock);
    /// Layer 1 field-constraint validation (§4.7); returns the first violation.
    fn validate_fields(&self) -> Option<String>;
}

#[macro_export]
macro_rules! impl_envelope {
    ($ty:ty, $kind:expr, $validate:expr) => {
        impl $crate::domain::resource::Envelope for $ty {
            fn kind() -> $crate::domain::kind::Kind {
                $kind
            }
            fn metadata(&self) -> &$crate::domain::resource::Metadata {
                &self.metadata
            }
            fn metadata_mut(&mut self) -> &mut $crate::domain::resource::Metadata {
                &mut self.metadata
            }
            fn audit(&self) -> &$crate::domain::resource::AuditBlock {
                use $crate::domain::resource::HasAudit;
                self.status.audit()
            }
            fn set_audit(&mut self, audit: $crate::domain::resource::AuditBlock) {
                use $crate::domain::resource::HasAudit;
                *self.status.audit_mut() = audit;
            }
            fn validate_fields(&self) -> Option<String> {
                $validate(self)
            }
        }
    };
}
