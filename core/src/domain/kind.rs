// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! The fixed set of resource kinds and the id/slug conventions derived from them.
//!
//! `Kind` is the single source of truth for the KV key prefix (§4.6): there are
//! no parallel string constants scattered across controllers.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Agent,
    AgentInstance,
    Workflow,
    WorkflowInstance,
    Session,
    AgentExecution,
    WorkflowExecution,
    Skill,
    McpServer,
    Environment,
}

impl Kind {
    /// All kinds, used by the debug surface to enumerate kind-scoped lists.
    pub const ALL: [Kind; 10] = [
        Kind::Agent,
        Kind::AgentInstance,
        Kind::Workflow,
        Kind::WorkflowInstance,
        Kind::Session,
        Kind::AgentExecution,
        Kind::WorkflowExecution,
        Kind::Skill,
        Kind::McpServer,
        Kind::Environment,
    ];

    /// The id prefix and KV key prefix for this kind (e.g. `agt` for Agent).
    pub fn as_prefix(&self) -> &'static str {
        match self {
            Kind::Agent => "agt",
            Kind::AgentInstance => "agi",
            Kind::Workflow => "wf",
            Kind::WorkflowInstance => "wfi",
            Kind::Session => "sess",
            Kind::AgentExecution => "aex",
            Kind::WorkflowExecution => "wex",
            Kind::Skill => "skl",
            Kind::McpServer => "mcp",
            Kind::Environment => "env",
        }
    }

    /// Parse a kind back from its wire/string name (used by the generic
    /// `ResourceCommand`/`ResourceQuery` services and the debug HTTP routes).
    pub fn parse(raw: &str) -> Option<Kind> {
        Kind::ALL.into_iter().find(|k| k.wire_name() == raw)
    }

    pub fn wire_name(&self) -> &'static str {
        match self {
            Kind::Agent => "agent",
            Kind::AgentInstance => "agent_instance",
            Kind::Workflow => "workflow",
            Kind::WorkflowInstance => "workflow_instance",
            Kind::Session => "session",
            Kind::AgentExecution => "agent_execution",
            Kind::WorkflowExecution => "workflow_execution",
            Kind::Skill => "skill",
            Kind::McpServer => "mcp_server",
            Kind::Environment => "environment",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wire_name())
    }
}

/// A sortable, kind-prefixed id: `{prefix}-{26-char ULID-like tail}`.
///
/// The tail is a 48-bit millisecond timestamp followed by 80 bits of random
/// data, both Crockford-base32 encoded, so ids created later sort after ids
/// created earlier without a secondary sort pass (needed by `List`, §4.6).
pub fn generate_id(kind: Kind, now_millis: u64, random: u128) -> String {
    const ALPHABET: &[u8] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

    let mut time_part = [0u8; 10];
    let mut t = now_millis;
    for slot in time_part.iter_mut().rev() {
        *slot = ALPHABET[(t & 0x1f) as usize];
        t >>= 5;
    }

    let mut rand_part = [0u8; 16];
    let mut r = random;
    for slot in rand_part.iter_mut().rev() {
        *slot = ALPHABET[(r & 0x1f) as usize];
        r >>= 5;
    }

    format!(
        "{}-{}{}",
        kind.as_prefix(),
        std::str::from_utf8(&time_part).unwrap(),
        std::str::from_utf8(&rand_part).unwrap()
    )
}

/// Deterministic, idempotent slug derivation (§3, §8 slug-derivation law).
pub fn derive_slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_was_hyphen = true; // suppresses a leading hyphen
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            out.push('-');
            last_was_hyphen = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_is_idempotent() {
        let s = derive_slug("Code Reviewer!!");
        assert_eq!(s, "code-reviewer");
        assert_eq!(derive_slug(&s), s);
    }

    #[test]
    fn slug_collapses_and_trims() {
        assert_eq!(derive_slug("  Hello   World -- Bot  "), "hello-world-bot");
    }

    #[test]
    fn ids_carry_kind_prefix() {
        let id = generate_id(Kind::Agent, 1_700_000_000_000, 42);
        assert!(id.starts_with("agt-"));
        assert_eq!(id.len(), 4 + 10 + 16);
    }

    #[test]
    fn ids_are_time_ordered() {
        let a = generate_id(Kind::Workflow, 1_000, 7);
        let b = generate_id(Kind::Workflow, 2_000, 7);
        assert!(a < b);
    }
}
