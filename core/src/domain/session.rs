// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Session domain type (§3). Owner scope is restricted to organization or
//! identity-account; platform scope is rejected by the Session.Create pipeline.

use super::resource::{AuditBlock, HasAudit, Resource};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSpec {
    pub agent_instance_id: String,
    pub subject: String,
    pub thread_id: String,
    pub sandbox_id: String,
    pub custom_metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    pub audit: AuditBlock,
}

impl HasAudit for SessionStatus {
    fn audit(&self) -> &AuditBlock {
        &self.audit
    }
    fn audit_mut(&mut self) -> &mut AuditBlock {
        &mut self.audit
    }
}

pub type Session = Resource<SessionSpec, SessionStatus>;

crate::impl_envelope!(Session, crate::domain::kind::Kind::Session, |s: &Session| {
    use super::resource::OwnerScope;
    super::validation::require_non_empty("metadata.name", &s.metadata.name).or_else(|| {
        match s.metadata.owner.as_ref().map(|o| o.scope) {
            Some(OwnerScope::Organization) | Some(OwnerScope::IdentityAccount) => None,
            _ => Some(
                "session owner scope must be organization or identity_account".to_string(),
            ),
        }
    })
});
