// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `AgentExecutionController` and `WorkflowExecutionController` (§4.3, §4.5):
//! the controllers that hand a freshly persisted execution off to the
//! embedded engine, carrying any `callback_token` through untouched.

use super::DynController;
use crate::domain::agent::Agent;
use crate::domain::error::StigmerError;
use crate::domain::execution::{AgentExecution, Phase, WorkflowExecution};
use crate::domain::repository::KvStore;
use crate::domain::resource::{AuditBlock, Envelope, Metadata};
use crate::domain::session::{Session, SessionSpec, SessionStatus};
use crate::domain::workflow::WorkflowInstance;
use crate::pipeline::context::OuterContext;
use crate::pipeline::error::PipelineError;
use crate::pipeline::pipeline::Pipeline;
use crate::pipeline::step::Step;
use crate::pipeline::steps::{BuildNewState, BuildNewStateMode, Persist, ResolveSlug, ValidateProto};
use crate::pipeline::RequestContext;
use crate::presentation::grpc::client::LoopbackClient;
use async_trait::async_trait;
use chrono::Utc;
use stigmer_engine::{queues, EngineClient, EngineError};
use std::sync::Arc;

/// §7's error taxonomy has no "engine" category of its own; timeouts map to
/// `DeadlineExceeded`, anything else to `Unavailable` since the degraded mode
/// this daemon runs in (§1, §4.7) treats engine trouble as an availability
/// problem rather than a caller mistake.
fn engine_error_to_stigmer(err: &EngineError) -> StigmerError {
    match err {
        EngineError::Timeout(d) => StigmerError::DeadlineExceeded(format!("engine call timed out after {d:?}")),
        EngineError::Unreachable(msg) => StigmerError::Unavailable(msg.clone()),
        EngineError::Rejected(msg) => StigmerError::Unavailable(msg.clone()),
    }
}

/// Moves `*phase` forward, refusing a transition the state machine (§3)
/// doesn't allow rather than silently overwriting it.
fn advance_phase(phase: &mut Phase, next: Phase) -> Result<(), StigmerError> {
    if !phase.can_transition_to(next) {
        return Err(StigmerError::Internal(format!("illegal phase transition {phase:?} -> {next:?}")));
    }
    *phase = next;
    Ok(())
}

async fn persist_failed<T: Envelope>(store: &Arc<dyn KvStore>, state: &T) -> Result<(), StigmerError> {
    let id = state.metadata().id.clone();
    let bytes = serde_json::to_vec(state).map_err(|e| StigmerError::Internal(format!("serialize failed: {e}")))?;
    store
        .save(T::kind(), &id, bytes)
        .await
        .map_err(|e| StigmerError::Internal(e.to_string()))
}

/// §4.3: when only `agent_id` is given, resolve (or create) a `Session`
/// bound to the agent's default instance so downstream steps always see a
/// `session_id`. Combines the spec's separate `CreateDefaultInstanceIfNeeded`
/// and `CreateSessionIfNeeded` steps into one, since both exist purely to
/// reach the same end state (a usable session) — see DESIGN.md.
struct ResolveSessionFromAgent {
    loopback: LoopbackClient,
}

#[async_trait]
impl Step<AgentExecution> for ResolveSessionFromAgent {
    fn name(&self) -> &str {
        "ResolveSessionFromAgent"
    }

    async fn execute(&self, ctx: &mut RequestContext<AgentExecution>) -> Result<(), StigmerError> {
        if !ctx.new_state().spec.session_id.is_empty() {
            return Ok(());
        }
        let agent_id = ctx.new_state().spec.agent_id.clone();
        let agent: Agent = self.loopback.get(&agent_id).await?;
        let session = Session {
            metadata: Metadata {
                name: format!("{}-session", agent.metadata.slug),
                owner: agent.metadata.owner.clone(),
                ..Default::default()
            },
            spec: SessionSpec {
                agent_instance_id: agent.status.default_instance_id.clone(),
                subject: ctx.outer.caller_identity.clone(),
                thread_id: String::new(),
                sandbox_id: String::new(),
                custom_metadata: Default::default(),
            },
            status: SessionStatus {
                audit: AuditBlock::on_create(&ctx.outer.caller_identity, Utc::now()),
            },
        };
        let created: Session = self.loopback.create(&session).await?;
        ctx.new_state_mut().spec.session_id = created.metadata.id;
        Ok(())
    }
}

struct SetInitialPhaseAgent;

#[async_trait]
impl Step<AgentExecution> for SetInitialPhaseAgent {
    fn name(&self) -> &str {
        "SetInitialPhase"
    }

    async fn execute(&self, ctx: &mut RequestContext<AgentExecution>) -> Result<(), StigmerError> {
        ctx.new_state_mut().status.phase = Phase::Pending;
        ctx.new_state_mut().status.temporal_workflow_id = String::new();
        ctx.new_state_mut().status.error = None;
        ctx.new_state_mut().status.todos = Vec::new();
        Ok(())
    }
}

struct StartAgentWorkflow {
    engine: Arc<dyn EngineClient>,
    store: Arc<dyn KvStore>,
}

#[async_trait]
impl Step<AgentExecution> for StartAgentWorkflow {
    fn name(&self) -> &str {
        "StartWorkflow"
    }

    /// §4.5/§8: failure to start the inner workflow persists the execution
    /// as FAILED with the reason *and* returns the underlying error to the
    /// caller — it must not look like a successful Create.
    async fn execute(&self, ctx: &mut RequestContext<AgentExecution>) -> Result<(), StigmerError> {
        let input = serde_json::to_value(ctx.new_state())
            .map_err(|e| StigmerError::Internal(format!("serialize execution failed: {e}")))?;
        match self
            .engine
            .start_workflow(queues::AGENT_EXECUTION_QUEUE, queues::INVOKE_AGENT_EXECUTION, input)
            .await
        {
            Ok(workflow_id) => {
                ctx.new_state_mut().status.temporal_workflow_id = workflow_id;
                advance_phase(&mut ctx.new_state_mut().status.phase, Phase::Running)?;
                Ok(())
            }
            Err(err) => {
                advance_phase(&mut ctx.new_state_mut().status.phase, Phase::Failed)?;
                ctx.new_state_mut().status.error = Some(err.to_string());
                persist_failed(&self.store, ctx.new_state()).await?;
                Err(engine_error_to_stigmer(&err))
            }
        }
    }
}

pub struct AgentExecutionController {
    store: Arc<dyn KvStore>,
    loopback: LoopbackClient,
    engine: Arc<dyn EngineClient>,
}

impl AgentExecutionController {
    pub fn new(store: Arc<dyn KvStore>, loopback: LoopbackClient, engine: Arc<dyn EngineClient>) -> Self {
        AgentExecutionController {
            store,
            loopback,
            engine,
        }
    }

    pub async fn create(&self, caller: &str, input: AgentExecution) -> Result<AgentExecution, PipelineError> {
        let mut ctx = RequestContext::new(OuterContext::new(AgentExecution::kind(), caller), input);
        let pipeline = Pipeline::builder("AgentExecutionCreate")
            .add_step(Box::new(ValidateProto))
            .add_step(Box::new(ResolveSlug))
            .add_step(Box::new(ResolveSessionFromAgent {
                loopback: self.loopback.clone(),
            }))
            .add_step(Box::new(BuildNewState {
                mode: BuildNewStateMode::Create {
                    caller: caller.to_string(),
                },
            }))
            .add_step(Box::new(SetInitialPhaseAgent))
            .add_step(Box::new(Persist::<AgentExecution>::new(self.store.clone())))
            .add_step(Box::new(StartAgentWorkflow {
                engine: self.engine.clone(),
                store: self.store.clone(),
            }))
            .add_step(Box::new(Persist::<AgentExecution>::new(self.store.clone())))
            .build();
        pipeline.execute(&mut ctx).await?;
        Ok(ctx.new_state().clone())
    }
}

#[async_trait]
impl DynController for AgentExecutionController {
    async fn create(&self, caller: &str, payload: Vec<u8>) -> Result<Vec<u8>, PipelineError> {
        let input: AgentExecution = serde_json::from_slice(&payload).map_err(|e| PipelineError {
            step_name: "DecodePayload".to_string(),
            cause: StigmerError::InvalidArgument(e.to_string()),
        })?;
        let out = self.create(caller, input).await?;
        serde_json::to_vec(&out).map_err(|e| PipelineError {
            step_name: "EncodeResult".to_string(),
            cause: StigmerError::Internal(e.to_string()),
        })
    }

    async fn update(&self, caller: &str, id: &str, payload: Vec<u8>) -> Result<Vec<u8>, PipelineError> {
        super::generic::SimpleCrudController::<AgentExecution>::new(self.store.clone())
            .update(
                caller,
                id,
                serde_json::from_slice(&payload).map_err(|e| PipelineError {
                    step_name: "DecodePayload".to_string(),
                    cause: StigmerError::InvalidArgument(e.to_string()),
                })?,
            )
            .await
            .and_then(|v| {
                serde_json::to_vec(&v).map_err(|e| PipelineError {
                    step_name: "EncodeResult".to_string(),
                    cause: StigmerError::Internal(e.to_string()),
                })
            })
    }

    async fn apply(&self, _caller: &str, _payload: Vec<u8>) -> Result<Vec<u8>, PipelineError> {
        Err(PipelineError {
            step_name: "Apply".to_string(),
            cause: StigmerError::FailedPrecondition("AgentExecution does not support Apply".to_string()),
        })
    }

    async fn get(&self, id: &str) -> Result<Vec<u8>, StigmerError> {
        super::generic::SimpleCrudController::<AgentExecution>::new(self.store.clone())
            .get(id)
            .await
            .and_then(|v| serde_json::to_vec(&v).map_err(|e| StigmerError::Internal(e.to_string())))
    }

    async fn get_by_reference(&self, slug: &str) -> Result<Vec<u8>, StigmerError> {
        super::generic::SimpleCrudController::<AgentExecution>::new(self.store.clone())
            .get_by_reference(slug)
            .await
            .and_then(|v| serde_json::to_vec(&v).map_err(|e| StigmerError::Internal(e.to_string())))
    }

    async fn delete(&self, id: &str) -> Result<Vec<u8>, StigmerError> {
        super::generic::SimpleCrudController::<AgentExecution>::new(self.store.clone())
            .delete(id)
            .await
            .and_then(|v| serde_json::to_vec(&v).map_err(|e| StigmerError::Internal(e.to_string())))
    }

    async fn list(&self) -> Result<Vec<Vec<u8>>, StigmerError> {
        super::generic::SimpleCrudController::<AgentExecution>::new(self.store.clone())
            .list()
            .await
            .and_then(|items| {
                items
                    .iter()
                    .map(|v| serde_json::to_vec(v).map_err(|e| StigmerError::Internal(e.to_string())))
                    .collect()
            })
    }
}

struct LoadInstance {
    loopback: LoopbackClient,
}

#[async_trait]
impl Step<WorkflowExecution> for LoadInstance {
    fn name(&self) -> &str {
        "LoadInstance"
    }

    async fn execute(&self, ctx: &mut RequestContext<WorkflowExecution>) -> Result<(), StigmerError> {
        let instance_id = ctx.new_state().spec.workflow_instance_id.clone();
        let instance: WorkflowInstance = self.loopback.get(&instance_id).await?;
        if ctx.new_state().spec.workflow_id.is_empty() {
            ctx.new_state_mut().spec.workflow_id = instance.spec.workflow_id;
        }
        Ok(())
    }
}

struct SetInitialPhaseWorkflow;

#[async_trait]
impl Step<WorkflowExecution> for SetInitialPhaseWorkflow {
    fn name(&self) -> &str {
        "SetInitialPhase"
    }

    async fn execute(&self, ctx: &mut RequestContext<WorkflowExecution>) -> Result<(), StigmerError> {
        ctx.new_state_mut().status.phase = Phase::Pending;
        ctx.new_state_mut().status.temporal_workflow_id = String::new();
        Ok(())
    }
}

struct StartWorkflowExecution {
    engine: Arc<dyn EngineClient>,
    store: Arc<dyn KvStore>,
}

#[async_trait]
impl Step<WorkflowExecution> for StartWorkflowExecution {
    fn name(&self) -> &str {
        "StartWorkflow"
    }

    /// §4.5/§8: failure to start the inner workflow persists the execution
    /// as FAILED with the reason *and* returns the underlying error to the
    /// caller — it must not look like a successful Create.
    async fn execute(&self, ctx: &mut RequestContext<WorkflowExecution>) -> Result<(), StigmerError> {
        let input = serde_json::to_value(ctx.new_state())
            .map_err(|e| StigmerError::Internal(format!("serialize execution failed: {e}")))?;
        match self
            .engine
            .start_workflow(
                queues::WORKFLOW_EXECUTION_QUEUE,
                queues::INVOKE_WORKFLOW_EXECUTION,
                input,
            )
            .await
        {
            Ok(workflow_id) => {
                ctx.new_state_mut().status.temporal_workflow_id = workflow_id;
                advance_phase(&mut ctx.new_state_mut().status.phase, Phase::Running)?;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to start workflow execution");
                advance_phase(&mut ctx.new_state_mut().status.phase, Phase::Failed)?;
                persist_failed(&self.store, ctx.new_state()).await?;
                Err(engine_error_to_stigmer(&err))
            }
        }
    }
}

pub struct WorkflowExecutionController {
    store: Arc<dyn KvStore>,
    loopback: LoopbackClient,
    engine: Arc<dyn EngineClient>,
}

impl WorkflowExecutionController {
    pub fn new(store: Arc<dyn KvStore>, loopback: LoopbackClient, engine: Arc<dyn EngineClient>) -> Self {
        WorkflowExecutionController {
            store,
            loopback,
            engine,
        }
    }

    pub async fn create(&self, caller: &str, input: WorkflowExecution) -> Result<WorkflowExecution, PipelineError> {
        let mut ctx = RequestContext::new(OuterContext::new(WorkflowExecution::kind(), caller), input);
        let pipeline = Pipeline::builder("WorkflowExecutionCreate")
            .add_step(Box::new(ValidateProto))
            .add_step(Box::new(ResolveSlug))
            .add_step(Box::new(LoadInstance {
                loopback: self.loopback.clone(),
            }))
            .add_step(Box::new(BuildNewState {
                mode: BuildNewStateMode::Create {
                    caller: caller.to_string(),
                },
            }))
            .add_step(Box::new(SetInitialPhaseWorkflow))
            .add_step(Box::new(Persist::<WorkflowExecution>::new(self.store.clone())))
            .add_step(Box::new(StartWorkflowExecution {
                engine: self.engine.clone(),
                store: self.store.clone(),
            }))
            .add_step(Box::new(Persist::<WorkflowExecution>::new(self.store.clone())))
            .build();
        pipeline.execute(&mut ctx).await?;
        Ok(ctx.new_state().clone())
    }
}

#[async_trait]
impl DynController for WorkflowExecutionController {
    async fn create(&self, caller: &str, payload: Vec<u8>) -> Result<Vec<u8>, PipelineError> {
        let input: WorkflowExecution = serde_json::from_slice(&payload).map_err(|e| PipelineError {
            step_name: "DecodePayload".to_string(),
            cause: StigmerError::InvalidArgument(e.to_string()),
        })?;
        let out = self.create(caller, input).await?;
        serde_json::to_vec(&out).map_err(|e| PipelineError {
            step_name: "EncodeResult".to_string(),
            cause: StigmerError::Internal(e.to_string()),
        })
    }

    async fn update(&self, caller: &str, id: &str, payload: Vec<u8>) -> Result<Vec<u8>, PipelineError> {
        super::generic::SimpleCrudController::<WorkflowExecution>::new(self.store.clone())
            .update(
                caller,
                id,
                serde_json::from_slice(&payload).map_err(|e| PipelineError {
                    step_name: "DecodePayload".to_string(),
                    cause: StigmerError::InvalidArgument(e.to_string()),
                })?,
            )
            .await
            .and_then(|v| {
                serde_json::to_vec(&v).map_err(|e| PipelineError {
                    step_name: "EncodeResult".to_string(),
                    cause: StigmerError::Internal(e.to_string()),
                })
            })
    }

    async fn apply(&self, _caller: &str, _payload: Vec<u8>) -> Result<Vec<u8>, PipelineError> {
        Err(PipelineError {
            step_name: "Apply".to_string(),
            cause: StigmerError::FailedPrecondition("WorkflowExecution does not support Apply".to_string()),
        })
    }

    async fn get(&self, id: &str) -> Result<Vec<u8>, StigmerError> {
        super::generic::SimpleCrudController::<WorkflowExecution>::new(self.store.clone())
            .get(id)
            .await
            .and_then(|v| serde_json::to_vec(&v).map_err(|e| StigmerError::Internal(e.to_string())))
    }

    async fn get_by_reference(&self, slug: &str) -> Result<Vec<u8>, StigmerError> {
        super::generic::SimpleCrudController::<WorkflowExecution>::new(self.store.clone())
            .get_by_reference(slug)
            .await
            .and_then(|v| serde_json::to_vec(&v).map_err(|e| StigmerError::Internal(e.to_string())))
    }

    async fn delete(&self, id: &str) -> Result<Vec<u8>, StigmerError> {
        super::generic::SimpleCrudController::<WorkflowExecution>::new(self.store.clone())
            .delete(id)
            .await
            .and_then(|v| serde_json::to_vec(&v).map_err(|e| StigmerError::Internal(e.to_string())))
    }

    async fn list(&self) -> Result<Vec<Vec<u8>>, StigmerError> {
        super::generic::SimpleCrudController::<WorkflowExecution>::new(self.store.clone())
            .list()
            .await
            .and_then(|items| {
                items
                    .iter()
                    .map(|v| serde_json::to_vec(v).map_err(|e| StigmerError::Internal(e.to_string())))
                    .collect()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::controllers::generic::SimpleCrudController;
    use crate::application::controllers::session::SessionController;
    use crate::application::controllers::ControllerRegistry;
    use crate::domain::agent::{AgentInstance, AgentSpec, AgentStatus};
    use crate::domain::execution::{AgentExecutionSpec, AgentExecutionStatus, CallbackToken};
    use crate::domain::kind::Kind;
    use crate::infrastructure::kv_memory::InMemoryKvStore;
    use crate::presentation::grpc::server::spawn_loopback;
    use stigmer_engine::fake::InMemoryEngine;

    #[tokio::test]
    async fn agent_execution_resolves_session_and_starts_workflow() {
        let store: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let registry = ControllerRegistry::new();
        registry.register(Kind::Agent, Arc::new(SimpleCrudController::<Agent>::new(store.clone())));
        registry.register(
            Kind::AgentInstance,
            Arc::new(SimpleCrudController::<AgentInstance>::new(store.clone())),
        );
        registry.register(Kind::Session, Arc::new(SessionController::new(store.clone())));
        let loopback = spawn_loopback(registry).await.unwrap();

        let agent = Agent {
            metadata: Metadata {
                name: "Reviewer".into(),
                ..Default::default()
            },
            spec: AgentSpec::default(),
            status: AgentStatus {
                default_instance_id: "agi-preexisting".into(),
                audit: AuditBlock::on_create("system", Utc::now()),
            },
        };
        let created_agent: Agent = loopback.create(&agent).await.unwrap();

        let engine = Arc::new(InMemoryEngine::new());
        let controller = AgentExecutionController::new(store, loopback, engine.clone() as Arc<dyn EngineClient>);
        let execution = AgentExecution {
            metadata: Metadata {
                name: "run-1".into(),
                ..Default::default()
            },
            spec: AgentExecutionSpec {
                agent_id: created_agent.metadata.id,
                session_id: String::new(),
                callback_token: CallbackToken::default(),
                env: Default::default(),
            },
            status: AgentExecutionStatus {
                phase: Phase::Pending,
                temporal_workflow_id: String::new(),
                error: None,
                todos: Vec::new(),
                audit: AuditBlock::on_create("system", Utc::now()),
            },
        };

        let result = controller.create("tester", execution).await.unwrap();
        assert!(!result.spec.session_id.is_empty());
        assert_eq!(result.status.phase, Phase::Running);
        assert_eq!(engine.starts().len(), 1);
    }

    /// §4.3: Session.Create has no duplicate check, so a second execution
    /// against the same agent (which derives the same `{slug}-session` name)
    /// must not fail with AlreadyExists.
    #[tokio::test]
    async fn repeated_agent_execution_without_session_id_does_not_conflict() {
        let store: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let registry = ControllerRegistry::new();
        registry.register(Kind::Agent, Arc::new(SimpleCrudController::<Agent>::new(store.clone())));
        registry.register(
            Kind::AgentInstance,
            Arc::new(SimpleCrudController::<AgentInstance>::new(store.clone())),
        );
        registry.register(Kind::Session, Arc::new(SessionController::new(store.clone())));
        let loopback = spawn_loopback(registry).await.unwrap();

        let agent = Agent {
            metadata: Metadata {
                name: "Reviewer".into(),
                ..Default::default()
            },
            spec: AgentSpec::default(),
            status: AgentStatus {
                default_instance_id: "agi-preexisting".into(),
                audit: AuditBlock::on_create("system", Utc::now()),
            },
        };
        let created_agent: Agent = loopback.create(&agent).await.unwrap();

        let engine: Arc<dyn EngineClient> = Arc::new(InMemoryEngine::new());
        let controller = AgentExecutionController::new(store, loopback, engine);
        let make_execution = || AgentExecution {
            metadata: Metadata {
                name: "run".into(),
                ..Default::default()
            },
            spec: AgentExecutionSpec {
                agent_id: created_agent.metadata.id.clone(),
                session_id: String::new(),
                callback_token: CallbackToken::default(),
                env: Default::default(),
            },
            status: AgentExecutionStatus {
                phase: Phase::Pending,
                temporal_workflow_id: String::new(),
                error: None,
                todos: Vec::new(),
                audit: AuditBlock::on_create("system", Utc::now()),
            },
        };

        let first = controller.create("tester", make_execution()).await.unwrap();
        let second = controller.create("tester", make_execution()).await.unwrap();
        assert_ne!(first.spec.session_id, second.spec.session_id);
    }
}
