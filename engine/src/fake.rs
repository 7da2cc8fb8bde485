// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! A deterministic in-memory `EngineClient`, standing in for the real engine
//! SDK in tests and in offline/dev runs. Records every call so tests can
//! assert exactly-once completion (§8 property 8) without a real engine
//! process.

use crate::client::{ActivityResult, EngineClient, EngineError, StructuralOutcome};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RecordedStart {
    pub task_queue: String,
    pub workflow_type: String,
    pub input: Value,
}

#[derive(Debug, Clone)]
pub struct RecordedCompletion {
    pub token: Vec<u8>,
    pub result: ActivityResultKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityResultKind {
    Success,
    Failure(String),
}

#[derive(Default)]
pub struct InMemoryEngine {
    reachable: Mutex<bool>,
    starts: Mutex<Vec<RecordedStart>>,
    completions: Mutex<Vec<RecordedCompletion>>,
    next_structural_outcome: Mutex<Option<StructuralOutcome>>,
}

impl InMemoryEngine {
    pub fn new() -> Self {
        InMemoryEngine {
            reachable: Mutex::new(true),
            ..Default::default()
        }
    }

    pub fn set_reachable(&self, reachable: bool) {
        *self.reachable.lock() = reachable;
    }

    pub fn set_next_structural_outcome(&self, outcome: StructuralOutcome) {
        *self.next_structural_outcome.lock() = Some(outcome);
    }

    pub fn starts(&self) -> Vec<RecordedStart> {
        self.starts.lock().clone()
    }

    pub fn completions(&self) -> Vec<RecordedCompletion> {
        self.completions.lock().clone()
    }
}

#[async_trait]
impl EngineClient for InMemoryEngine {
    async fn start_workflow(
        &self,
        task_queue: &str,
        workflow_type: &str,
        input: Value,
    ) -> Result<String, EngineError> {
        if !*self.reachable.lock() {
            return Err(EngineError::Unreachable("fake engine offline".into()));
        }
        self.starts.lock().push(RecordedStart {
            task_queue: task_queue.to_string(),
            workflow_type: workflow_type.to_string(),
            input,
        });
        Ok(format!("fake-wf-{}", self.starts.lock().len()))
    }

    async fn validate_workflow_structure(
        &self,
        _graph: Value,
        _timeout: Duration,
    ) -> Result<StructuralOutcome, EngineError> {
        if !*self.reachable.lock() {
            return Err(EngineError::Unreachable("fake engine offline".into()));
        }
        Ok(self.next_structural_outcome.lock().unwrap_or(StructuralOutcome::Valid))
    }

    async fn complete_activity(&self, token: &[u8], result: ActivityResult) -> Result<(), EngineError> {
        if !*self.reachable.lock() {
            return Err(EngineError::Unreachable("fake engine offline".into()));
        }
        let kind = match result {
            ActivityResult::Success(_) => ActivityResultKind::Success,
            ActivityResult::Failure(msg) => ActivityResultKind::Failure(msg),
        };
        self.completions.lock().push(RecordedCompletion {
            token: token.to_vec(),
            result: kind,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_exactly_one_completion_per_call() {
        let engine = InMemoryEngine::new();
        engine
            .complete_activity(b"tok", ActivityResult::Success(Value::Null))
            .await
            .unwrap();
        assert_eq!(engine.completions().len(), 1);
        assert_eq!(engine.completions()[0].token, b"tok".to_vec());
    }

    #[tokio::test]
    async fn unreachable_engine_rejects_calls() {
        let engine = InMemoryEngine::new();
        engine.set_reachable(false);
        let err = engine
            .start_workflow("q", "wf", Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Unreachable(_)));
    }
}
