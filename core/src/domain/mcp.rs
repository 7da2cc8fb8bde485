// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! MCPServer domain type. Simple CRUD kind (§3).

use super::resource::{AuditBlock, HasAudit, Resource};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct McpServerSpec {
    pub connection: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpServerStatus {
    pub audit: AuditBlock,
}

impl HasAudit for McpServerStatus {
    fn audit(&self) -> &AuditBlock {
        &self.audit
    }
    fn audit_mut(&mut self) -> &mut AuditBlock {
        &mut self.audit
    }
}

pub type McpServer = Resource<McpServerSpec, McpServerStatus>;

crate::impl_envelope!(McpServer, crate::domain::kind::Kind::McpServer, |m: &McpServer| {
    super::validation::require_non_empty("metadata.name", &m.metadata.name)
});
