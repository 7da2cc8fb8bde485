// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! The single-bucket KV store contract (C6, §4.6). Keys are `{kind}/{id}`;
//! values are the JSON-encoded resource. Every operation takes the kind
//! explicitly rather than trusting a caller-supplied prefix, so the store
//! cannot be tagged inconsistently.

use super::kind::Kind;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KvError {
    #[error("io error: {0}")]
    Io(String),
    #[error("store already locked by another process at {0}")]
    Locked(String),
}

#[async_trait]
pub trait KvStore: Send + Sync {
    /// Save raw bytes under `{kind}/{id}`. Idempotent for identical bytes.
    async fn save(&self, kind: Kind, id: &str, value: Vec<u8>) -> Result<(), KvError>;

    /// Load raw bytes for `{kind}/{id}`, or `None` if absent.
    async fn get(&self, kind: Kind, id: &str) -> Result<Option<Vec<u8>>, KvError>;

    /// All values whose key begins with `{kind}/`, in key order (§8 property 10).
    async fn list(&self, kind: Kind) -> Result<Vec<Vec<u8>>, KvError>;

    /// Delete `{kind}/{id}`; returns the removed bytes, or `None` if absent.
    async fn delete(&self, kind: Kind, id: &str) -> Result<Option<Vec<u8>>, KvError>;

    fn key(kind: Kind, id: &str) -> String
    where
        Self: Sized,
    {
        format!("{}/{}", kind, id)
    }
}
