// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Workflow and WorkflowInstance domain types (§3).

use super::resource::{AuditBlock, HasAudit, Owner, Resource};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Outcome of Layer 2 structural validation (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuralValidation {
    Valid,
    Invalid,
    Failed,
    /// Engine unreachable; validation was skipped (§4.7 degraded mode).
    Skipped,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowSpec {
    /// Opaque task-graph document; the engine's native parser owns its shape.
    pub graph: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStatus {
    pub default_instance_id: String,
    pub structural_validation: StructuralValidation,
    pub audit: AuditBlock,
}

impl HasAudit for WorkflowStatus {
    fn audit(&self) -> &AuditBlock {
        &self.audit
    }
    fn audit_mut(&mut self) -> &mut AuditBlock {
        &mut self.audit
    }
}

pub type Workflow = Resource<WorkflowSpec, WorkflowStatus>;

impl Workflow {
    pub fn owner_org(&self) -> Option<&str> {
        self.metadata.owner.as_ref().and_then(|o| match o.scope {
            super::resource::OwnerScope::Organization => Some(o.owner_id.as_str()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowInstanceSpec {
    pub workflow_id: String,
    pub env: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowInstanceStatus {
    pub audit: AuditBlock,
}

impl HasAudit for WorkflowInstanceStatus {
    fn audit(&self) -> &AuditBlock {
        &self.audit
    }
    fn audit_mut(&mut self) -> &mut AuditBlock {
        &mut self.audit
    }
}

pub type WorkflowInstance = Resource<WorkflowInstanceSpec, WorkflowInstanceStatus>;

crate::impl_envelope!(Workflow, crate::domain::kind::Kind::Workflow, |w: &Workflow| {
    super::validation::require_non_empty("metadata.name", &w.metadata.name)
});

crate::impl_envelope!(
    WorkflowInstance,
    crate::domain::kind::Kind::WorkflowInstance,
    |w: &WorkflowInstance| {
        super::validation::require_non_empty("metadata.name", &w.metadata.name)
            .or_else(|| super::validation::require_non_empty("spec.workflow_id", &w.spec.workflow_id))
    }
);

/// §3 invariant: org-scoped instances must match the owning org of the
/// parent workflow; user/platform scope instances are unconstrained.
pub fn validate_same_org(parent: &Workflow, instance_owner: &Owner) -> Result<(), String> {
    use super::resource::OwnerScope;
    if instance_owner.scope != OwnerScope::Organization {
        return Ok(());
    }
    match parent.owner_org() {
        Some(org) if org == instance_owner.owner_id => Ok(()),
        Some(org) => Err(format!(
            "workflow instance org '{}' does not match parent workflow org '{}'",
            instance_owner.owner_id, org
        )),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::resource::{AuditEvent, Metadata, OwnerScope};
    use chrono::Utc;

    fn workflow_with_org(org: &str) -> Workflow {
        Workflow {
            metadata: Metadata {
                id: "wf-1".into(),
                owner: Some(Owner {
                    scope: OwnerScope::Organization,
                    owner_id: org.into(),
                }),
                ..Default::default()
            },
            spec: WorkflowSpec::default(),
            status: WorkflowStatus {
                default_instance_id: "wfi-1".into(),
                structural_validation: StructuralValidation::Valid,
                audit: AuditBlock {
                    created_by: "system".into(),
                    created_at: Utc::now(),
                    updated_by: "system".into(),
                    updated_at: Utc::now(),
                    event: AuditEvent::Created,
                },
            },
        }
    }

    #[test]
    fn same_org_instance_accepted() {
        let wf = workflow_with_org("acme");
        let owner = Owner {
            scope: OwnerScope::Organization,
            owner_id: "acme".into(),
        };
        assert!(validate_same_org(&wf, &owner).is_ok());
    }

    #[test]
    fn cross_org_instance_rejected() {
        let wf = workflow_with_org("acme");
        let owner = Owner {
            scope: OwnerScope::Organization,
            owner_id: "globex".into(),
        };
        assert!(validate_same_org(&wf, &owner).is_err());
    }

    #[test]
    fn platform_scope_instance_unconstrained() {
        let wf = workflow_with_org("acme");
        let owner = Owner {
            scope: OwnerScope::Platform,
            owner_id: "anyone".into(),
        };
        assert!(validate_same_org(&wf, &owner).is_ok());
    }
}
