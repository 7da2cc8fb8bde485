// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Skill and Environment domain types. Both are simple-CRUD kinds (§3) with
//! no default-instance behavior and no custom business-rule steps.

use super::resource::{AuditBlock, HasAudit, Resource};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillSpec {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillStatus {
    pub audit: AuditBlock,
}

impl HasAudit for SkillStatus {
    fn audit(&self) -> &AuditBlock {
        &self.audit
    }
    fn audit_mut(&mut self) -> &mut AuditBlock {
        &mut self.audit
    }
}

pub type Skill = Resource<SkillSpec, SkillStatus>;

crate::impl_envelope!(Skill, crate::domain::kind::Kind::Skill, |s: &Skill| {
    super::validation::require_non_empty("metadata.name", &s.metadata.name)
});

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentSpec {
    pub variables: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentStatus {
    pub audit: AuditBlock,
}

impl HasAudit for EnvironmentStatus {
    fn audit(&self) -> &AuditBlock {
        &self.audit
    }
    fn audit_mut(&mut self) -> &mut AuditBlock {
        &mut self.audit
    }
}

pub type Environment = Resource<EnvironmentSpec, EnvironmentStatus>;

crate::impl_envelope!(
    Environment,
    crate::domain::kind::Kind::Environment,
    |e: &Environment| super::validation::require_non_empty("metadata.name", &e.metadata.name)
);
