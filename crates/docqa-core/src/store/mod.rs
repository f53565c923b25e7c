//! Artifact storage abstraction.
//!
//! The [`ArtifactStore`] trait is the only way pipeline code touches
//! durable state. Artifacts are opaque bytes keyed by a [`DocumentId`] and
//! an [`ArtifactKind`], so the backend (local disk, memory, object store)
//! can change without touching business logic.
//!
//! No concurrency control is provided: concurrent writers to the same key
//! race and the last write wins.

pub mod memory;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::{ArtifactKind, DocumentId};

/// Byte-level artifact storage keyed by document and kind.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`read`](ArtifactStore::read) | Fetch an artifact, `None` if absent |
/// | [`write`](ArtifactStore::write) | Create or replace an artifact |
/// | [`exists`](ArtifactStore::exists) | Check presence without reading |
/// | [`remove`](ArtifactStore::remove) | Delete an artifact if present |
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn read(&self, id: &DocumentId, kind: ArtifactKind) -> Result<Option<Vec<u8>>>;

    /// Replace the artifact. A failed write must not leave a partial
    /// artifact behind.
    async fn write(&self, id: &DocumentId, kind: ArtifactKind, bytes: &[u8]) -> Result<()>;

    async fn exists(&self, id: &DocumentId, kind: ArtifactKind) -> Result<bool>;

    async fn remove(&self, id: &DocumentId, kind: ArtifactKind) -> Result<()>;
}

/// Read an artifact as UTF-8 text.
pub async fn read_text<S: ArtifactStore + ?Sized>(
    store: &S,
    id: &DocumentId,
    kind: ArtifactKind,
) -> Result<Option<String>> {
    match store.read(id, kind).await? {
        Some(bytes) => String::from_utf8(bytes)
            .map(Some)
            .map_err(|e| Error::Storage(format!("{} artifact for {} is not UTF-8: {}", kind, id, e))),
        None => Ok(None),
    }
}

/// Write a UTF-8 text artifact.
pub async fn write_text<S: ArtifactStore + ?Sized>(
    store: &S,
    id: &DocumentId,
    kind: ArtifactKind,
    text: &str,
) -> Result<()> {
    store.write(id, kind, text.as_bytes()).await
}
