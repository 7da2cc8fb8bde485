// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `RequestContext<T>` (§4.2): the per-request carrier of input, the
//! deep-cloned working state a pipeline mutates, and inter-step metadata.
//!
//! A dynamic `ctx.Set/Get` map is the easy way to thread values between
//! steps; Design Note §9 calls instead for a small typed struct with named
//! optional fields for the well-known exchanges, keeping only a narrow
//! escape hatch for rare custom steps.

use crate::domain::kind::Kind;
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct OuterContext {
    pub kind: Kind,
    pub caller_identity: String,
    pub deadline: Option<Instant>,
}

impl OuterContext {
    pub fn new(kind: Kind, caller_identity: impl Into<String>) -> Self {
        OuterContext {
            kind,
            caller_identity: caller_identity.into(),
            deadline: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.map(|d| Instant::now() >= d).unwrap_or(false)
    }
}

/// Named well-known exchanges between steps, plus an escape-hatch map for
/// rare custom steps (Design Note §9).
#[derive(Debug, Clone, Default)]
pub struct RequestMetadata {
    pub target_resource_id: Option<String>,
    pub parent_workflow_id: Option<String>,
    pub default_instance_id: Option<String>,
    pub should_create: Option<bool>,
    pub extra: HashMap<String, serde_json::Value>,
}

pub struct RequestContext<T> {
    pub outer: OuterContext,
    input: T,
    new_state: T,
    pub metadata: RequestMetadata,
}

impl<T: Clone> RequestContext<T> {
    /// Constructing a context ALWAYS deep-clones the input (§4.2 invariant);
    /// there is no way to opt out.
    pub fn new(outer: OuterContext, input: T) -> Self {
        let new_state = input.clone();
        RequestContext {
            outer,
            input,
            new_state,
            metadata: RequestMetadata::default(),
        }
    }

    /// The original, pre-pipeline input. Never mutated.
    pub fn input(&self) -> &T {
        &self.input
    }

    pub fn new_state(&self) -> &T {
        &self.new_state
    }

    pub fn set_new_state(&mut self, state: T) {
        self.new_state = state;
    }

    pub fn new_state_mut(&mut self) -> &mut T {
        &mut self.new_state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, PartialEq, Debug)]
    struct Dummy(i32);

    #[test]
    fn construction_deep_clones_input() {
        let mut ctx = RequestContext::new(OuterContext::new(Kind::Agent, "tester"), Dummy(1));
        ctx.new_state_mut().0 = 99;
        assert_eq!(ctx.input().0, 1);
        assert_eq!(ctx.new_state().0, 99);
    }
}
