// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! The workflow-execution worker's workflow and activities (§4.5). The
//! embedded engine's internals are an explicit black box (§1); what lives
//! here is the side of the handshake this repository owns: fetch the
//! execution, do the transition, report back over the loopback/network
//! gRPC client, and complete the caller's activity token exactly once.

use serde_json::json;
use stigmer_core::domain::execution::{Phase, WorkflowExecution};
use stigmer_core::domain::workflow::{StructuralValidation, Workflow, WorkflowInstance};
use stigmer_core::presentation::grpc::client::LoopbackClient;
use stigmer_engine::{token, ActivityResult, EngineError, StructuralOutcome};

/// `InvokeWorkflowExecution`: runs a previously-started `WorkflowExecution`
/// to completion (§4.5 step 3: `ExecuteServerlessWorkflow` against the parent
/// workflow's graph), then performs the phase transition and, if the caller
/// is waiting on an async token, completes it.
pub async fn invoke_workflow_execution(client: &LoopbackClient, execution_id: &str) -> Result<(), EngineError> {
    let mut execution: WorkflowExecution = client
        .get(execution_id)
        .await
        .map_err(|e| EngineError::Rejected(e.to_string()))?;

    if !execution.status.phase.can_transition_to(Phase::Completed) {
        return Ok(());
    }

    let instance: WorkflowInstance = client
        .get(&execution.spec.workflow_instance_id)
        .await
        .map_err(|e| EngineError::Rejected(e.to_string()))?;
    let workflow: Workflow = client
        .get(&instance.spec.workflow_id)
        .await
        .map_err(|e| EngineError::Rejected(e.to_string()))?;
    execute_serverless_workflow(&workflow.spec.graph)?;

    execution.status.phase = Phase::Completed;
    let token = execution.spec.callback_token.clone();
    client
        .update(execution_id, &execution)
        .await
        .map_err(|e| EngineError::Rejected(e.to_string()))?;

    if token.is_present() {
        token::complete_external_activity(token.0, ActivityResult::Success(json!({"phase": "completed"}))).await?;
    }
    Ok(())
}

/// `ExecuteServerlessWorkflow`: runs a graph directly without a persisted
/// WorkflowInstance/Execution pair (§4.5 glossary: "serverless" invocation).
/// Scoped here to validating the graph shape is non-empty; the interpreter
/// itself is the engine's black-box concern.
pub fn execute_serverless_workflow(graph: &serde_json::Value) -> Result<serde_json::Value, EngineError> {
    if graph.is_null() {
        return Err(EngineError::Rejected("empty workflow graph".to_string()));
    }
    Ok(json!({"accepted": true}))
}

/// `ValidateWorkflowStructure` (§4.7 Layer 2): the loopback-reachable side of
/// structural validation. A graph is structurally valid here if it parses as
/// a JSON object; deeper semantic checks belong to the engine's own
/// validator, out of scope per §1.
pub async fn validate_workflow_structure(workflow: &Workflow) -> StructuralOutcome {
    match &workflow.spec.graph {
        serde_json::Value::Object(obj) if !obj.is_empty() => StructuralOutcome::Valid,
        serde_json::Value::Null => StructuralOutcome::Invalid,
        _ => StructuralOutcome::Invalid,
    }
}

pub fn structural_validation_of(outcome: StructuralOutcome) -> StructuralValidation {
    match outcome {
        StructuralOutcome::Valid => StructuralValidation::Valid,
        StructuralOutcome::Invalid => StructuralValidation::Invalid,
        StructuralOutcome::Failed => StructuralValidation::Failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stigmer_core::domain::resource::{AuditBlock, Metadata};
    use stigmer_core::domain::workflow::WorkflowStatus;

    fn workflow_with_graph(graph: serde_json::Value) -> Workflow {
        let now = chrono::Utc::now();
        Workflow {
            metadata: Metadata::default(),
            spec: stigmer_core::domain::workflow::WorkflowSpec { graph },
            status: WorkflowStatus {
                default_instance_id: String::new(),
                structural_validation: StructuralValidation::Skipped,
                audit: AuditBlock::on_create("test", now),
            },
        }
    }

    #[tokio::test]
    async fn non_empty_object_graph_is_valid() {
        let wf = workflow_with_graph(json!({"steps": []}));
        assert_eq!(validate_workflow_structure(&wf).await, StructuralOutcome::Valid);
    }

    #[tokio::test]
    async fn null_graph_is_invalid() {
        let wf = workflow_with_graph(serde_json::Value::Null);
        assert_eq!(validate_workflow_structure(&wf).await, StructuralOutcome::Invalid);
    }

    #[test]
    fn serverless_rejects_empty_graph() {
        assert!(execute_serverless_workflow(&serde_json::Value::Null).is_err());
    }

    #[test]
    fn serverless_accepts_populated_graph() {
        assert!(execute_serverless_workflow(&json!({"steps": []})).is_ok());
    }

    #[tokio::test]
    async fn invoke_runs_serverless_graph_and_completes_execution() {
        use stigmer_core::application::controllers::generic::SimpleCrudController;
        use stigmer_core::application::controllers::ControllerRegistry;
        use stigmer_core::domain::execution::{CallbackToken, WorkflowExecutionSpec, WorkflowExecutionStatus};
        use stigmer_core::domain::kind::Kind;
        use stigmer_core::domain::workflow::WorkflowInstanceStatus;
        use stigmer_core::infrastructure::kv_memory::InMemoryKvStore;
        use stigmer_core::presentation::grpc::server::spawn_loopback;
        use std::sync::Arc;

        let engine = Arc::new(stigmer_engine::fake::InMemoryEngine::new());
        token::install_engine_client(engine);

        let store = Arc::new(InMemoryKvStore::new());
        let registry = ControllerRegistry::new();
        registry.register(Kind::Workflow, Arc::new(SimpleCrudController::<Workflow>::new(store.clone())));
        registry.register(
            Kind::WorkflowInstance,
            Arc::new(SimpleCrudController::<WorkflowInstance>::new(store.clone())),
        );
        registry.register(
            Kind::WorkflowExecution,
            Arc::new(SimpleCrudController::<WorkflowExecution>::new(store)),
        );
        let client = spawn_loopback(registry).await.expect("loopback server");

        let workflow = client.create(&workflow_with_graph(json!({"steps": []}))).await.unwrap();

        let instance = WorkflowInstance {
            metadata: Metadata::default(),
            spec: stigmer_core::domain::workflow::WorkflowInstanceSpec {
                workflow_id: workflow.metadata.id.clone(),
                env: Default::default(),
            },
            status: WorkflowInstanceStatus {
                audit: AuditBlock::on_create("test", chrono::Utc::now()),
            },
        };
        let instance: WorkflowInstance = client.create(&instance).await.unwrap();

        let execution = WorkflowExecution {
            metadata: Metadata::default(),
            spec: WorkflowExecutionSpec {
                workflow_instance_id: instance.metadata.id,
                workflow_id: workflow.metadata.id,
                trigger_message: String::new(),
                trigger_metadata: Default::default(),
                env: Default::default(),
                callback_token: CallbackToken::default(),
            },
            status: WorkflowExecutionStatus {
                phase: Phase::Running,
                temporal_workflow_id: "fake-wf-1".into(),
                audit: AuditBlock::on_create("test", chrono::Utc::now()),
            },
        };
        let execution: WorkflowExecution = client.create(&execution).await.unwrap();

        invoke_workflow_execution(&client, &execution.metadata.id).await.unwrap();

        let updated: WorkflowExecution = client.get(&execution.metadata.id).await.unwrap();
        assert_eq!(updated.status.phase, Phase::Completed);
    }
}
