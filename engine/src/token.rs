// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! The `complete-external-activity` system activity (§4.5) and the
//! module-level engine-client singleton it requires.
//!
//! Activities cannot receive non-serializable values via their input
//! (Design Note §9), so the engine client used to actually call
//! `CompleteActivity` is injected once at worker startup into a process-wide
//! `OnceLock` rather than passed down the call stack. This is a deliberate,
//! documented single-writer exception to "no global state": only worker
//! registration writes it, and only once.

use crate::client::{ActivityResult, EngineClient, EngineError};
use base64::Engine as _;
use std::sync::{Arc, OnceLock};

static ENGINE_CLIENT: OnceLock<Arc<dyn EngineClient>> = OnceLock::new();

/// Called once during worker startup, before the task-queue poll loop begins.
pub fn install_engine_client(client: Arc<dyn EngineClient>) {
    let _ = ENGINE_CLIENT.set(client);
}

fn token_preview(token: &[u8]) -> String {
    let n = token.len().min(20);
    base64::engine::general_purpose::STANDARD.encode(&token[..n])
}

/// Runs on the daemon's engine-connected worker, never inside workflow code
/// (the determinism rule, §4.5). Validates the token length and invokes
/// `CompleteActivity` exactly once.
pub async fn complete_external_activity(token: Vec<u8>, result: ActivityResult) -> Result<(), EngineError> {
    if token.is_empty() {
        // §8 boundary: empty tokens are "no callback"; nothing to complete.
        return Ok(());
    }
    let client = ENGINE_CLIENT
        .get()
        .cloned()
        .ok_or_else(|| EngineError::Rejected("engine client not installed".to_string()))?;

    tracing::info!(token_preview = %token_preview(&token), "completing external activity");
    client.complete_activity(&token, result).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::InMemoryEngine;

    #[test]
    fn preview_never_exceeds_twenty_source_bytes() {
        let token = vec![9u8; 64];
        let preview = token_preview(&token);
        let full = base64::engine::general_purpose::STANDARD.encode(&token);
        assert!(preview.len() < full.len());
    }

    #[tokio::test]
    async fn empty_token_skips_completion() {
        let engine = Arc::new(InMemoryEngine::new());
        install_engine_client(engine.clone());
        complete_external_activity(vec![], ActivityResult::Success(serde_json::Value::Null))
            .await
            .unwrap();
        assert_eq!(engine.completions().len(), 0);
    }
}
