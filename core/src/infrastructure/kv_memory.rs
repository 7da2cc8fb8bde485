// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! In-memory KV store used by unit tests and by the pipeline tests, in the
//! style of the teacher's `InMemoryAgentRepository` (a mutex-guarded map).

use crate::domain::kind::Kind;
use crate::domain::repository::{KvError, KvStore};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;

#[derive(Default)]
pub struct InMemoryKvStore {
    data: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        InMemoryKvStore::default()
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn save(&self, kind: Kind, id: &str, value: Vec<u8>) -> Result<(), KvError> {
        self.data.lock().insert(Self::key(kind, id), value);
        Ok(())
    }

    async fn get(&self, kind: Kind, id: &str) -> Result<Option<Vec<u8>>, KvError> {
        Ok(self.data.lock().get(&Self::key(kind, id)).cloned())
    }

    async fn list(&self, kind: Kind) -> Result<Vec<Vec<u8>>, KvError> {
        let prefix = format!("{}/", kind);
        Ok(self
            .data
            .lock()
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .map(|(_, v)| v.clone())
            .collect())
    }

    async fn delete(&self, kind: Kind, id: &str) -> Result<Option<Vec<u8>>, KvError> {
        Ok(self.data.lock().remove(&Self::key(kind, id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn list_is_scoped_to_kind_prefix() {
        let store = InMemoryKvStore::new();
        store.save(Kind::Agent, "agt-1", b"a".to_vec()).await.unwrap();
        store.save(Kind::Workflow, "wf-1", b"w".to_vec()).await.unwrap();
        let agents = store.list(Kind::Agent).await.unwrap();
        assert_eq!(agents, vec![b"a".to_vec()]);
    }

    #[tokio::test]
    async fn list_returns_key_order() {
        let store = InMemoryKvStore::new();
        store.save(Kind::Agent, "agt-2", b"second".to_vec()).await.unwrap();
        store.save(Kind::Agent, "agt-1", b"first".to_vec()).await.unwrap();
        let all = store.list(Kind::Agent).await.unwrap();
        assert_eq!(all, vec![b"first".to_vec(), b"second".to_vec()]);
    }

    #[tokio::test]
    async fn delete_returns_removed_value() {
        let store = InMemoryKvStore::new();
        store.save(Kind::Session, "sess-1", b"x".to_vec()).await.unwrap();
        let removed = store.delete(Kind::Session, "sess-1").await.unwrap();
        assert_eq!(removed, Some(b"x".to_vec()));
        assert_eq!(store.get(Kind::Session, "sess-1").await.unwrap(), None);
    }
}
