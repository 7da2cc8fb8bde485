// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `WorkflowController` and `WorkflowInstanceController` (§4.3). Workflow
//! adds a Layer 2 structural-validation step ahead of slug resolution and
//! the same default-instance behavior as Agent; WorkflowInstance adds a
//! cross-org business rule resolved via the loopback.

use super::generic::SimpleCrudController;
use super::DynController;
use crate::domain::error::StigmerError;
use crate::domain::repository::KvStore;
use crate::domain::resource::{AuditBlock, Envelope, Metadata};
use crate::domain::workflow::{
    validate_same_org, StructuralValidation, Workflow, WorkflowInstance, WorkflowInstanceSpec,
    WorkflowInstanceStatus,
};
use crate::pipeline::context::OuterContext;
use crate::pipeline::error::PipelineError;
use crate::pipeline::pipeline::Pipeline;
use crate::pipeline::step::Step;
use crate::pipeline::steps::{BuildNewState, BuildNewStateMode, CheckDuplicate, DuplicateScope, Persist, ResolveSlug};
use crate::pipeline::RequestContext;
use crate::presentation::grpc::client::LoopbackClient;
use async_trait::async_trait;
use chrono::Utc;
use stigmer_engine::{EngineClient, StructuralOutcome};
use std::sync::Arc;
use std::time::Duration;

const STRUCTURAL_VALIDATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Layer 2 (§4.7): calls the engine over the loopback; an unreachable engine
/// degrades to `Skipped` with a warning rather than blocking creation.
struct ValidateStructural {
    engine: Arc<dyn EngineClient>,
}

#[async_trait]
impl Step<Workflow> for ValidateStructural {
    fn name(&self) -> &str {
        "ValidateStructural"
    }

    async fn execute(&self, ctx: &mut RequestContext<Workflow>) -> Result<(), StigmerError> {
        let graph = ctx.new_state().spec.graph.clone();
        let outcome = match self
            .engine
            .validate_workflow_structure(graph, STRUCTURAL_VALIDATION_TIMEOUT)
            .await
        {
            Ok(StructuralOutcome::Valid) => StructuralValidation::Valid,
            Ok(StructuralOutcome::Invalid) => StructuralValidation::Invalid,
            Ok(StructuralOutcome::Failed) => StructuralValidation::Failed,
            Err(err) => {
                tracing::warn!(error = %err, "structural validation engine unreachable, skipping");
                StructuralValidation::Skipped
            }
        };
        if outcome == StructuralValidation::Invalid {
            return Err(StigmerError::InvalidArgument(
                "workflow graph failed structural validation".to_string(),
            ));
        }
        ctx.new_state_mut().status.structural_validation = outcome;
        Ok(())
    }
}

pub struct WorkflowController {
    store: Arc<dyn KvStore>,
    loopback: LoopbackClient,
    engine: Arc<dyn EngineClient>,
}

impl WorkflowController {
    pub fn new(store: Arc<dyn KvStore>, loopback: LoopbackClient, engine: Arc<dyn EngineClient>) -> Self {
        WorkflowController {
            store,
            loopback,
            engine,
        }
    }

    async fn create_default_instance(&self, caller: &str, workflow: &Workflow) -> Result<WorkflowInstance, StigmerError> {
        let instance = WorkflowInstance {
            metadata: Metadata {
                name: format!("{}-default", workflow.metadata.slug),
                owner: workflow.metadata.owner.clone(),
                ..Default::default()
            },
            spec: WorkflowInstanceSpec {
                workflow_id: workflow.metadata.id.clone(),
                env: Default::default(),
            },
            status: WorkflowInstanceStatus {
                audit: AuditBlock::on_create(caller, Utc::now()),
            },
        };
        self.loopback.create(&instance).await
    }

    pub async fn create(&self, caller: &str, input: Workflow) -> Result<Workflow, PipelineError> {
        let mut ctx = RequestContext::new(OuterContext::new(Workflow::kind(), caller), input);
        let pipeline = Pipeline::builder("WorkflowCreate")
            .add_step(Box::new(crate::pipeline::steps::ValidateProto))
            .add_step(Box::new(ValidateStructural {
                engine: self.engine.clone(),
            }))
            .add_step(Box::new(ResolveSlug))
            .add_step(Box::new(CheckDuplicate::<Workflow>::new(
                self.store.clone(),
                DuplicateScope::Create,
            )))
            .add_step(Box::new(BuildNewState {
                mode: BuildNewStateMode::Create {
                    caller: caller.to_string(),
                },
            }))
            .add_step(Box::new(Persist::<Workflow>::new(self.store.clone())))
            .build();
        pipeline.execute(&mut ctx).await?;

        let created = ctx.new_state().clone();
        let instance = self
            .create_default_instance(caller, &created)
            .await
            .map_err(|cause| PipelineError {
                step_name: "CreateDefaultInstance".to_string(),
                cause,
            })?;

        let inner = SimpleCrudController::<Workflow>::new(self.store.clone());
        let audit = created.status.audit.clone();
        let mut with_instance = created.clone();
        with_instance.status.default_instance_id = instance.metadata.id;
        inner
            .patch_preserving_audit(caller, &created.metadata.id, with_instance, audit)
            .await
    }
}

#[async_trait]
impl DynController for WorkflowController {
    async fn create(&self, caller: &str, payload: Vec<u8>) -> Result<Vec<u8>, PipelineError> {
        let input: Workflow = serde_json::from_slice(&payload).map_err(|e| PipelineError {
            step_name: "DecodePayload".to_string(),
            cause: StigmerError::InvalidArgument(format!("malformed payload: {e}")),
        })?;
        let out = self.create(caller, input).await?;
        serde_json::to_vec(&out).map_err(|e| PipelineError {
            step_name: "EncodeResult".to_string(),
            cause: StigmerError::Internal(format!("serialize failed: {e}")),
        })
    }

    async fn update(&self, caller: &str, id: &str, payload: Vec<u8>) -> Result<Vec<u8>, PipelineError> {
        SimpleCrudController::<Workflow>::new(self.store.clone())
            .update(
                caller,
                id,
                serde_json::from_slice(&payload).map_err(|e| PipelineError {
                    step_name: "DecodePayload".to_string(),
                    cause: StigmerError::InvalidArgument(e.to_string()),
                })?,
            )
            .await
            .and_then(|w| {
                serde_json::to_vec(&w).map_err(|e| PipelineError {
                    step_name: "EncodeResult".to_string(),
                    cause: StigmerError::Internal(e.to_string()),
                })
            })
    }

    async fn apply(&self, caller: &str, payload: Vec<u8>) -> Result<Vec<u8>, PipelineError> {
        let input: Workflow = serde_json::from_slice(&payload).map_err(|e| PipelineError {
            step_name: "DecodePayload".to_string(),
            cause: StigmerError::InvalidArgument(e.to_string()),
        })?;
        let inner = SimpleCrudController::<Workflow>::new(self.store.clone());
        let slug_probe = crate::domain::kind::derive_slug(&input.metadata.name);
        match inner.get_by_reference(&slug_probe).await {
            Ok(existing) => self.update(caller, &existing.metadata.id, payload).await,
            Err(StigmerError::NotFound(_)) => {
                let out = self.create(caller, input).await?;
                serde_json::to_vec(&out).map_err(|e| PipelineError {
                    step_name: "EncodeResult".to_string(),
                    cause: StigmerError::Internal(e.to_string()),
                })
            }
            Err(other) => Err(PipelineError {
                step_name: "LoadForApply".to_string(),
                cause: other,
            }),
        }
    }

    async fn get(&self, id: &str) -> Result<Vec<u8>, StigmerError> {
        DynController::get(&SimpleCrudController::<Workflow>::new(self.store.clone()), id).await
    }

    async fn get_by_reference(&self, slug: &str) -> Result<Vec<u8>, StigmerError> {
        DynController::get_by_reference(&SimpleCrudController::<Workflow>::new(self.store.clone()), slug).await
    }

    async fn delete(&self, id: &str) -> Result<Vec<u8>, StigmerError> {
        DynController::delete(&SimpleCrudController::<Workflow>::new(self.store.clone()), id).await
    }

    async fn list(&self) -> Result<Vec<Vec<u8>>, StigmerError> {
        DynController::list(&SimpleCrudController::<Workflow>::new(self.store.clone())).await
    }
}

/// `LoadParentWorkflow` + `ValidateSameOrgBusinessRule` (§4.3).
struct LoadParentWorkflow {
    loopback: LoopbackClient,
}

#[async_trait]
impl Step<WorkflowInstance> for LoadParentWorkflow {
    fn name(&self) -> &str {
        "LoadParentWorkflow"
    }

    async fn execute(&self, ctx: &mut RequestContext<WorkflowInstance>) -> Result<(), StigmerError> {
        let workflow_id = ctx.new_state().spec.workflow_id.clone();
        let parent: Workflow = self.loopback.get(&workflow_id).await?;
        if let Some(owner) = ctx.new_state().metadata.owner.clone() {
            validate_same_org(&parent, &owner).map_err(StigmerError::FailedPrecondition)?;
        }
        Ok(())
    }
}

pub struct WorkflowInstanceController {
    inner: SimpleCrudController<WorkflowInstance>,
    loopback: LoopbackClient,
    store: Arc<dyn KvStore>,
}

impl WorkflowInstanceController {
    pub fn new(store: Arc<dyn KvStore>, loopback: LoopbackClient) -> Self {
        WorkflowInstanceController {
            inner: SimpleCrudController::new(store.clone()),
            loopback,
            store,
        }
    }

    pub async fn create(&self, caller: &str, input: WorkflowInstance) -> Result<WorkflowInstance, PipelineError> {
        let mut ctx = RequestContext::new(OuterContext::new(WorkflowInstance::kind(), caller), input);
        let pipeline = Pipeline::builder("WorkflowInstanceCreate")
            .add_step(Box::new(crate::pipeline::steps::ValidateProto))
            .add_step(Box::new(LoadParentWorkflow {
                loopback: self.loopback.clone(),
            }))
            .add_step(Box::new(ResolveSlug))
            .add_step(Box::new(CheckDuplicate::<WorkflowInstance>::new(
                self.store.clone(),
                DuplicateScope::Create,
            )))
            .add_step(Box::new(BuildNewState {
                mode: BuildNewStateMode::Create {
                    caller: caller.to_string(),
                },
            }))
            .add_step(Box::new(Persist::<WorkflowInstance>::new(self.store.clone())))
            .build();
        pipeline.execute(&mut ctx).await?;
        Ok(ctx.new_state().clone())
    }

    pub async fn get_by_workflow(&self, workflow_id: &str) -> Result<Vec<WorkflowInstance>, StigmerError> {
        let all = self.inner.list().await?;
        Ok(all.into_iter().filter(|wi| wi.spec.workflow_id == workflow_id).collect())
    }
}

#[async_trait]
impl DynController for WorkflowInstanceController {
    async fn create(&self, caller: &str, payload: Vec<u8>) -> Result<Vec<u8>, PipelineError> {
        let input: WorkflowInstance = serde_json::from_slice(&payload).map_err(|e| PipelineError {
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
        DynController::update(&self.inner, caller, id, payload).await
    }

    async fn apply(&self, caller: &str, payload: Vec<u8>) -> Result<Vec<u8>, PipelineError> {
        DynController::apply(&self.inner, caller, payload).await
    }

    async fn get(&self, id: &str) -> Result<Vec<u8>, StigmerError> {
        DynController::get(&self.inner, id).await
    }

    async fn get_by_reference(&self, slug: &str) -> Result<Vec<u8>, StigmerError> {
        DynController::get_by_reference(&self.inner, slug).await
    }

    async fn delete(&self, id: &str) -> Result<Vec<u8>, StigmerError> {
        DynController::delete(&self.inner, id).await
    }

    async fn list(&self) -> Result<Vec<Vec<u8>>, StigmerError> {
        DynController::list(&self.inner).await
    }
}
