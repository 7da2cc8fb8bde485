// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Resource controllers (C3). Every controller, simple or bespoke, is
//! reachable by `Kind` through `ControllerRegistry` so the gRPC layer never
//! needs a per-kind match arm: it looks the controller up and calls the
//! object-safe `DynController` surface, which speaks JSON payloads (matching
//! the KV store's own encoding).

pub mod agent;
pub mod execution;
pub mod generic;
pub mod session;
pub mod workflow;

use crate::domain::error::StigmerError;
use crate::domain::kind::Kind;
use crate::domain::resource::Envelope;
use crate::pipeline::error::PipelineError;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

#[async_trait]
pub trait DynController: Send + Sync {
    async fn create(&self, caller: &str, payload: Vec<u8>) -> Result<Vec<u8>, PipelineError>;
    async fn update(&self, caller: &str, id: &str, payload: Vec<u8>) -> Result<Vec<u8>, PipelineError>;
    async fn apply(&self, caller: &str, payload: Vec<u8>) -> Result<Vec<u8>, PipelineError>;
    async fn get(&self, id: &str) -> Result<Vec<u8>, StigmerError>;
    async fn get_by_reference(&self, slug: &str) -> Result<Vec<u8>, StigmerError>;
    async fn delete(&self, id: &str) -> Result<Vec<u8>, StigmerError>;
    async fn list(&self) -> Result<Vec<Vec<u8>>, StigmerError>;
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, StigmerError> {
    serde_json::to_vec(value).map_err(|e| StigmerError::Internal(format!("serialize failed: {e}")))
}

fn decode<T: for<'de> serde::Deserialize<'de>>(bytes: &[u8]) -> Result<T, PipelineError> {
    serde_json::from_slice(bytes).map_err(|e| PipelineError {
        step_name: "DecodePayload".to_string(),
        cause: StigmerError::InvalidArgument(format!("malformed payload: {e}")),
    })
}

#[async_trait]
impl<T: Envelope + 'static> DynController for generic::SimpleCrudController<T> {
    async fn create(&self, caller: &str, payload: Vec<u8>) -> Result<Vec<u8>, PipelineError> {
        let input: T = decode(&payload)?;
        let out = self.create(caller, input).await?;
        encode(&out).map_err(|cause| PipelineError {
            step_name: "EncodeResult".to_string(),
            cause,
        })
    }

    async fn update(&self, caller: &str, id: &str, payload: Vec<u8>) -> Result<Vec<u8>, PipelineError> {
        let input: T = decode(&payload)?;
        let out = self.update(caller, id, input).await?;
        encode(&out).map_err(|cause| PipelineError {
            step_name: "EncodeResult".to_string(),
            cause,
        })
    }

    async fn apply(&self, caller: &str, payload: Vec<u8>) -> Result<Vec<u8>, PipelineError> {
        let input: T = decode(&payload)?;
        let out = self.apply(caller, input).await?;
        encode(&out).map_err(|cause| PipelineError {
            step_name: "EncodeResult".to_string(),
            cause,
        })
    }

    async fn get(&self, id: &str) -> Result<Vec<u8>, StigmerError> {
        encode(&self.get(id).await?)
    }

    async fn get_by_reference(&self, slug: &str) -> Result<Vec<u8>, StigmerError> {
        encode(&self.get_by_reference(slug).await?)
    }

    async fn delete(&self, id: &str) -> Result<Vec<u8>, StigmerError> {
        encode(&self.delete(id).await?)
    }

    async fn list(&self) -> Result<Vec<Vec<u8>>, StigmerError> {
        self.list().await?.iter().map(encode).collect()
    }
}

/// Built once at daemon startup: simple-CRUD controllers register first,
/// bespoke controllers (which may themselves hold a loopback client pointing
/// back at this registry) are inserted afterward, overwriting their kind's
/// entry. No entry is read until the gRPC server starts accepting requests.
#[derive(Default, Clone)]
pub struct ControllerRegistry {
    by_kind: Arc<DashMap<Kind, Arc<dyn DynController>>>,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, kind: Kind, controller: Arc<dyn DynController>) {
        self.by_kind.insert(kind, controller);
    }

    pub fn get(&self, kind: Kind) -> Result<Arc<dyn DynController>, StigmerError> {
        self.by_kind
            .get(&kind)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StigmerError::Internal(format!("no controller registered for kind {kind}")))
    }
}
