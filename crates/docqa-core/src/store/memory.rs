//! In-memory [`ArtifactStore`] for tests and embedding in other hosts.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::{ArtifactKind, DocumentId};

use super::ArtifactStore;

type Key = (DocumentId, ArtifactKind);

/// Artifacts held in a `HashMap` behind a `RwLock`.
#[derive(Default)]
pub struct InMemoryStore {
    artifacts: RwLock<HashMap<Key, Vec<u8>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored artifacts across all documents.
    pub fn len(&self) -> usize {
        self.artifacts.read().map(|a| a.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> Error {
    Error::Storage("in-memory store lock poisoned".to_string())
}

#[async_trait]
impl ArtifactStore for InMemoryStore {
    async fn read(&self, id: &DocumentId, kind: ArtifactKind) -> Result<Option<Vec<u8>>> {
        let artifacts = self.artifacts.read().map_err(|_| poisoned())?;
        Ok(artifacts.get(&(id.clone(), kind)).cloned())
    }

    async fn write(&self, id: &DocumentId, kind: ArtifactKind, bytes: &[u8]) -> Result<()> {
        let mut artifacts = self.artifacts.write().map_err(|_| poisoned())?;
        artifacts.insert((id.clone(), kind), bytes.to_vec());
        Ok(())
    }

    async fn exists(&self, id: &DocumentId, kind: ArtifactKind) -> Result<bool> {
        let artifacts = self.artifacts.read().map_err(|_| poisoned())?;
        Ok(artifacts.contains_key(&(id.clone(), kind)))
    }

    async fn remove(&self, id: &DocumentId, kind: ArtifactKind) -> Result<()> {
        let mut artifacts = self.artifacts.write().map_err(|_| poisoned())?;
        artifacts.remove(&(id.clone(), kind));
        Ok(())
    }
}
