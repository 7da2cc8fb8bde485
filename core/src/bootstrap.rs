// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Wires every resource kind's controller into a `ControllerRegistry` and
//! starts the loopback gRPC server (C1's "backend gRPC server bootstrap",
//! owned by the `stigmer` binary rather than a separately discovered
//! executable — see `SPEC_FULL.md` §1's crate table).

use crate::application::controllers::agent::AgentController;
use crate::application::controllers::execution::{AgentExecutionController, WorkflowExecutionController};
use crate::application::controllers::generic::SimpleCrudController;
use crate::application::controllers::session::SessionController;
use crate::application::controllers::workflow::{WorkflowController, WorkflowInstanceController};
use crate::application::controllers::ControllerRegistry;
use crate::domain::agent::{Agent, AgentInstance};
use crate::domain::catalog::{Environment, Skill};
use crate::domain::execution::{AgentExecution, WorkflowExecution};
use crate::domain::kind::Kind;
use crate::domain::mcp::McpServer;
use crate::domain::repository::KvStore;
use crate::domain::workflow::{Workflow, WorkflowInstance};
use crate::presentation::grpc::client::LoopbackClient;
use crate::presentation::grpc::server::spawn_loopback;
use std::sync::Arc;
use stigmer_engine::EngineClient;

pub struct Backend {
    pub loopback: LoopbackClient,
    pub registry: ControllerRegistry,
}

/// Builds every kind's controller against `store`, following the order the
/// registry's own doc comment describes: simple-CRUD controllers register
/// first, then the five bespoke controllers overwrite their kind's entry.
/// The loopback server is started first against the (momentarily empty)
/// registry so the bespoke controllers can be constructed with a working
/// client — their registrations land in the same backing map the running
/// loopback server already reads from, since `ControllerRegistry` clones
/// share one `Arc<DashMap<..>>`. A network listener bound to the completed
/// registry is started separately by the caller via
/// [`crate::presentation::grpc::server::serve_network`].
pub async fn build(
    store: Arc<dyn KvStore>,
    engine: Arc<dyn EngineClient>,
) -> Result<Backend, tonic::transport::Error> {
    let registry = ControllerRegistry::new();
    let loopback = spawn_loopback(registry.clone()).await?;

    registry.register(Kind::Agent, Arc::new(SimpleCrudController::<Agent>::new(store.clone())));
    registry.register(Kind::AgentInstance, Arc::new(SimpleCrudController::<AgentInstance>::new(store.clone())));
    registry.register(Kind::Workflow, Arc::new(SimpleCrudController::<Workflow>::new(store.clone())));
    registry.register(
        Kind::WorkflowInstance,
        Arc::new(SimpleCrudController::<WorkflowInstance>::new(store.clone())),
    );
    registry.register(Kind::AgentExecution, Arc::new(SimpleCrudController::<AgentExecution>::new(store.clone())));
    registry.register(
        Kind::WorkflowExecution,
        Arc::new(SimpleCrudController::<WorkflowExecution>::new(store.clone())),
    );
    registry.register(Kind::Skill, Arc::new(SimpleCrudController::<Skill>::new(store.clone())));
    registry.register(Kind::McpServer, Arc::new(SimpleCrudController::<McpServer>::new(store.clone())));
    registry.register(Kind::Environment, Arc::new(SimpleCrudController::<Environment>::new(store.clone())));

    registry.register(Kind::Session, Arc::new(SessionController::new(store.clone())));
    registry.register(Kind::Agent, Arc::new(AgentController::new(store.clone(), loopback.clone())));
    registry.register(
        Kind::Workflow,
        Arc::new(WorkflowController::new(store.clone(), loopback.clone(), engine.clone())),
    );
    registry.register(
        Kind::WorkflowInstance,
        Arc::new(WorkflowInstanceController::new(store.clone(), loopback.clone())),
    );
    registry.register(
        Kind::AgentExecution,
        Arc::new(AgentExecutionController::new(store.clone(), loopback.clone(), engine.clone())),
    );
    registry.register(
        Kind::WorkflowExecution,
        Arc::new(WorkflowExecutionController::new(store, loopback.clone(), engine)),
    );

    Ok(Backend { loopback, registry })
}
