// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! The production KV store backend (C6, §4.6): a single `sled::Db` opened
//! once at `<data-dir>/stigmer.db` and held for the daemon's lifetime.
//! `sled::Db::open` itself enforces the single-writer directory lock §4.6
//! requires; a second process opening the same path fails fast.

use crate::domain::kind::Kind;
use crate::domain::repository::{KvError, KvStore};
use async_trait::async_trait;

pub struct SledKvStore {
    db: sled::Db,
}

impl SledKvStore {
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, KvError> {
        let db = sled::open(path.as_ref()).map_err(|e| match e {
            sled::Error::Io(io) if io.kind() == std::io::ErrorKind::WouldBlock => {
                KvError::Locked(path.as_ref().display().to_string())
            }
            other => KvError::Io(other.to_string()),
        })?;
        Ok(SledKvStore { db })
    }
}

#[async_trait]
impl KvStore for SledKvStore {
    async fn save(&self, kind: Kind, id: &str, value: Vec<u8>) -> Result<(), KvError> {
        let key = Self::key(kind, id);
        self.db
            .insert(key.as_bytes(), value)
            .map_err(|e| KvError::Io(e.to_string()))?;
        self.db.flush_async().await.map_err(|e| KvError::Io(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, kind: Kind, id: &str) -> Result<Option<Vec<u8>>, KvError> {
        let key = Self::key(kind, id);
        Ok(self
            .db
            .get(key.as_bytes())
            .map_err(|e| KvError::Io(e.to_string()))?
            .map(|ivec| ivec.to_vec()))
    }

    async fn list(&self, kind: Kind) -> Result<Vec<Vec<u8>>, KvError> {
        let prefix = format!("{}/", kind);
        let mut out = Vec::new();
        for entry in self.db.scan_prefix(prefix.as_bytes()) {
            let (_, value) = entry.map_err(|e| KvError::Io(e.to_string()))?;
            out.push(value.to_vec());
        }
        Ok(out)
    }

    async fn delete(&self, kind: Kind, id: &str) -> Result<Option<Vec<u8>>, KvError> {
        let key = Self::key(kind, id);
        let removed = self
            .db
            .remove(key.as_bytes())
            .map_err(|e| KvError::Io(e.to_string()))?
            .map(|ivec| ivec.to_vec());
        self.db.flush_async().await.map_err(|e| KvError::Io(e.to_string()))?;
        Ok(removed)
    }
}
