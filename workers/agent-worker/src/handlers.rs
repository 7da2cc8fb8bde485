// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! The agent-execution worker's sole activity, `InvokeAgentExecution`
//! (§4.5). Running an actual agent loop against an LLM is outside this
//! repository's scope (§1, "the local LLM runtime is external"); what's
//! implemented here is the phase transition and token-completion handshake
//! every execution goes through regardless of what the agent loop does.

use serde_json::json;
use stigmer_core::domain::execution::{AgentExecution, Phase};
use stigmer_core::presentation::grpc::client::LoopbackClient;
use stigmer_engine::{token, ActivityResult, EngineError};

pub async fn invoke_agent_execution(client: &LoopbackClient, execution_id: &str) -> Result<(), EngineError> {
    let mut execution: AgentExecution = client
        .get(execution_id)
        .await
        .map_err(|e| EngineError::Rejected(e.to_string()))?;

    if !execution.status.phase.can_transition_to(Phase::Completed) {
        return Ok(());
    }

    execution.status.phase = Phase::Completed;
    let callback_token = execution.spec.callback_token.clone();
    client
        .update(execution_id, &execution)
        .await
        .map_err(|e| EngineError::Rejected(e.to_string()))?;

    if callback_token.is_present() {
        token::complete_external_activity(callback_token.0, ActivityResult::Success(json!({"phase": "completed"})))
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stigmer_core::application::controllers::generic::SimpleCrudController;
    use stigmer_core::application::controllers::ControllerRegistry;
    use stigmer_core::domain::execution::{AgentExecutionSpec, AgentExecutionStatus, CallbackToken};
    use stigmer_core::domain::kind::Kind;
    use stigmer_core::domain::resource::{AuditBlock, Metadata};
    use stigmer_core::infrastructure::kv_memory::InMemoryKvStore;
    use stigmer_core::presentation::grpc::server::spawn_loopback;
    use std::sync::Arc;

    #[tokio::test]
    async fn completes_running_execution_and_its_token() {
        let engine = Arc::new(stigmer_engine::fake::InMemoryEngine::new());
        token::install_engine_client(engine.clone());

        let store = Arc::new(InMemoryKvStore::new());
        let registry = ControllerRegistry::new();
        registry.register(Kind::AgentExecution, Arc::new(SimpleCrudController::<AgentExecution>::new(store.clone())));
        let client = spawn_loopback(registry).await.expect("loopback server");

        let now = chrono::Utc::now();
        let mut execution = AgentExecution {
            metadata: Metadata::default(),
            spec: AgentExecutionSpec {
                agent_id: "agt-1".into(),
                session_id: "sess-1".into(),
                callback_token: CallbackToken(b"tok".to_vec()),
                env: Default::default(),
            },
            status: AgentExecutionStatus {
                phase: Phase::Running,
                temporal_workflow_id: "fake-wf-1".into(),
                error: None,
                todos: vec![],
                audit: AuditBlock::on_create("test", now),
            },
        };
        execution = client.create(&execution).await.expect("create execution");

        invoke_agent_execution(&client, &execution.metadata.id).await.unwrap();

        let updated: AgentExecution = client.get(&execution.metadata.id).await.unwrap();
        assert_eq!(updated.status.phase, Phase::Completed);
        assert_eq!(engine.completions().len(), 1);
        assert_eq!(engine.completions()[0].token, b"tok".to_vec());
    }
}
