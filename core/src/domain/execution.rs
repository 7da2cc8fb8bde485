// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! AgentExecution and WorkflowExecution domain types, and the phase state
//! machine shared by both (§3):
//!
//! ```text
//! PENDING ──► RUNNING ──► COMPLETED
//!    │            │
//!    │            ╰──► FAILED
//!    ╰──► FAILED (start-workflow failure)
//! ```

use super::resource::{AuditBlock, HasAudit, Resource};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Pending,
    Running,
    Completed,
    Failed,
}

impl Phase {
    /// Whether `self -> next` is a legal transition per the state machine above.
    pub fn can_transition_to(self, next: Phase) -> bool {
        matches!(
            (self, next),
            (Phase::Pending, Phase::Running)
                | (Phase::Pending, Phase::Failed)
                | (Phase::Running, Phase::Completed)
                | (Phase::Running, Phase::Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Failed)
    }
}

/// Opaque bytes identifying a paused external activity (§4.5, Glossary).
/// Never logged raw: `preview()` exposes only a base64 prefix for logs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackToken(#[serde(with = "token_bytes")] pub Vec<u8>);

mod token_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            bytes,
        ))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        base64::Engine::decode(&base64::engine::general_purpose::STANDARD, s)
            .map_err(serde::de::Error::custom)
    }
}

impl CallbackToken {
    /// §8 boundary: length <= 0 is treated as absent.
    pub fn is_present(&self) -> bool {
        !self.0.is_empty()
    }

    pub fn preview(&self) -> String {
        let prefix_len = self.0.len().min(20);
        base64::engine::general_purpose::STANDARD.encode(&self.0[..prefix_len])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentExecutionSpec {
    pub agent_id: String,
    pub session_id: String,
    pub callback_token: CallbackToken,
    pub env: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub description: String,
    pub done: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentExecutionStatus {
    pub phase: Phase,
    pub temporal_workflow_id: String,
    pub error: Option<String>,
    pub todos: Vec<Todo>,
    pub audit: AuditBlock,
}

impl HasAudit for AgentExecutionStatus {
    fn audit(&self) -> &AuditBlock {
        &self.audit
    }
    fn audit_mut(&mut self) -> &mut AuditBlock {
        &mut self.audit
    }
}

pub type AgentExecution = Resource<AgentExecutionSpec, AgentExecutionStatus>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowExecutionSpec {
    pub workflow_instance_id: String,
    pub workflow_id: String,
    pub trigger_message: String,
    pub trigger_metadata: HashMap<String, String>,
    pub env: HashMap<String, String>,
    pub callback_token: CallbackToken,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowExecutionStatus {
    pub phase: Phase,
    pub temporal_workflow_id: String,
    pub audit: AuditBlock,
}

impl HasAudit for WorkflowExecutionStatus {
    fn audit(&self) -> &AuditBlock {
        &self.audit
    }
    fn audit_mut(&mut self) -> &mut AuditBlock {
        &mut self.audit
    }
}

pub type WorkflowExecution = Resource<WorkflowExecutionSpec, WorkflowExecutionStatus>;

crate::impl_envelope!(
    AgentExecution,
    crate::domain::kind::Kind::AgentExecution,
    |e: &AgentExecution| {
        if e.spec.agent_id.is_empty() && e.spec.session_id.is_empty() {
            Some("exactly one of agent_id or session_id must be set".to_string())
        } else if !e.spec.agent_id.is_empty() && !e.spec.session_id.is_empty() {
            Some("exactly one of agent_id or session_id must be set".to_string())
        } else {
            None
        }
    }
);

crate::impl_envelope!(
    WorkflowExecution,
    crate::domain::kind::Kind::WorkflowExecution,
    |e: &WorkflowExecution| {
        super::validation::require_non_empty("spec.workflow_instance_id", &e.spec.workflow_instance_id)
    }
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_to_running_to_completed_allowed() {
        assert!(Phase::Pending.can_transition_to(Phase::Running));
        assert!(Phase::Running.can_transition_to(Phase::Completed));
    }

    #[test]
    fn pending_can_fail_directly() {
        assert!(Phase::Pending.can_transition_to(Phase::Failed));
    }

    #[test]
    fn terminal_states_have_no_outgoing_transitions() {
        for terminal in [Phase::Completed, Phase::Failed] {
            for next in [Phase::Pending, Phase::Running, Phase::Completed, Phase::Failed] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn empty_token_is_absent() {
        assert!(!CallbackToken::default().is_present());
        assert!(!CallbackToken(vec![]).is_present());
        assert!(CallbackToken(vec![1, 2, 3]).is_present());
    }

    #[test]
    fn token_preview_never_exceeds_twenty_source_bytes() {
        let token = CallbackToken(vec![7u8; 100]);
        let preview = token.preview();
        // base64 expands 20 bytes to 28 chars; assert it is not the full 100-byte encoding.
        assert!(preview.len() < base64::engine::general_purpose::STANDARD.encode(&token.0).len());
    }
}
