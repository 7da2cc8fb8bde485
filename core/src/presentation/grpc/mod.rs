// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! gRPC presentation layer (C5, §4.4): the two generic resource services
//! (`ResourceCommand`, `ResourceQuery`) and the loopback-only `InternalControl`
//! service, plus the in-process client used for cross-kind controller calls.
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`client`] | `LoopbackClient`, generic over any `Envelope` kind |
//! | [`server`] | builds the shared `tonic::transport::Server`, serving both the in-process duplex and the network listener |
//! | [`service`] | the service impls, dispatching through `ControllerRegistry` |

pub mod client;
pub mod server;
pub mod service;

pub mod proto {
    tonic::include_proto!("stigmer.v1");
}

use crate::domain::kind::Kind;

impl From<Kind> for proto::Kind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Agent => proto::Kind::Agent,
            Kind::AgentInstance => proto::Kind::AgentInstance,
            Kind::Workflow => proto::Kind::Workflow,
            Kind::WorkflowInstance => proto::Kind::WorkflowInstance,
            Kind::Session => proto::Kind::Session,
            Kind::AgentExecution => proto::Kind::AgentExecution,
            Kind::WorkflowExecution => proto::Kind::WorkflowExecution,
            Kind::Skill => proto::Kind::Skill,
            Kind::McpServer => proto::Kind::McpServer,
            Kind::Environment => proto::Kind::Environment,
        }
    }
}

/// Decode a raw `i32` wire value into `proto::Kind`, independent of whichever
/// helper methods the installed `prost` version happens to generate.
pub fn proto_kind_from_i32(value: i32) -> proto::Kind {
    match value {
        1 => proto::Kind::Agent,
        2 => proto::Kind::AgentInstance,
        3 => proto::Kind::Workflow,
        4 => proto::Kind::WorkflowInstance,
        5 => proto::Kind::Session,
        6 => proto::Kind::AgentExecution,
        7 => proto::Kind::WorkflowExecution,
        8 => proto::Kind::Skill,
        9 => proto::Kind::McpServer,
        10 => proto::Kind::Environment,
        _ => proto::Kind::Unspecified,
    }
}

impl TryFrom<proto::Kind> for Kind {
    type Error = tonic::Status;

    fn try_from(kind: proto::Kind) -> Result<Self, Self::Error> {
        match kind {
            proto::Kind::Agent => Ok(Kind::Agent),
            proto::Kind::AgentInstance => Ok(Kind::AgentInstance),
            proto::Kind::Workflow => Ok(Kind::Workflow),
            proto::Kind::WorkflowInstance => Ok(Kind::WorkflowInstance),
            proto::Kind::Session => Ok(Kind::Session),
            proto::Kind::AgentExecution => Ok(Kind::AgentExecution),
            proto::Kind::WorkflowExecution => Ok(Kind::WorkflowExecution),
            proto::Kind::Skill => Ok(Kind::Skill),
            proto::Kind::McpServer => Ok(Kind::McpServer),
            proto::Kind::Environment => Ok(Kind::Environment),
            proto::Kind::Unspecified => Err(tonic::Status::invalid_argument("kind must be set")),
        }
    }
}

