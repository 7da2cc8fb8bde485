// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Agent and AgentInstance domain types (§3).

use super::resource::{AuditBlock, HasAudit, Resource};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSpec {
    pub description: String,
    pub instructions: String,
    pub skill_refs: Vec<String>,
    pub mcp_server_refs: Vec<String>,
    pub sub_agent_refs: Vec<String>,
    pub env: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStatus {
    pub default_instance_id: String,
    pub audit: AuditBlock,
}

impl HasAudit for AgentStatus {
    fn audit(&self) -> &AuditBlock {
        &self.audit
    }
    fn audit_mut(&mut self) -> &mut AuditBlock {
        &mut self.audit
    }
}

pub type Agent = Resource<AgentSpec, AgentStatus>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentInstanceSpec {
    pub agent_id: String,
    pub env: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentInstanceStatus {
    pub audit: AuditBlock,
}

impl HasAudit for AgentInstanceStatus {
    fn audit(&self) -> &AuditBlock {
        &self.audit
    }
    fn audit_mut(&mut self) -> &mut AuditBlock {
        &mut self.audit
    }
}

pub type AgentInstance = Resource<AgentInstanceSpec, AgentInstanceStatus>;

crate::impl_envelope!(Agent, crate::domain::kind::Kind::Agent, |a: &Agent| {
    super::validation::require_non_empty("metadata.name", &a.metadata.name)
});

crate::impl_envelope!(
    AgentInstance,
    crate::domain::kind::Kind::AgentInstance,
    |a: &AgentInstance| super::validation::require_non_empty("metadata.name", &a.metadata.name)
);
