//! Filesystem-backed [`ArtifactStore`].
//!
//! Layout under the storage root:
//!
//! ```text
//! storage/
//! ├── uploads/{id}.pdf
//! ├── text/{id}.txt
//! ├── summaries/{id}.json
//! └── index/{id}.json
//! ```
//!
//! Each write goes to its own uniquely named `.part` file in the target's
//! directory which is then renamed over the target. Readers never see a
//! half-written artifact, concurrent writers to one key do not share a temp
//! file, and a failed write leaves nothing behind.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use docqa_core::models::{ArtifactKind, DocumentId};
use docqa_core::store::ArtifactStore;
use docqa_core::{Error, Result};

pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of an artifact. The id is already restricted to `[A-Za-z0-9_-]`.
    pub fn path_for(&self, id: &DocumentId, kind: ArtifactKind) -> PathBuf {
        let (dir, ext) = match kind {
            ArtifactKind::Raw => ("uploads", "pdf"),
            ArtifactKind::Text => ("text", "txt"),
            ArtifactKind::Summary => ("summaries", "json"),
            ArtifactKind::Index => ("index", "json"),
        };
        self.root.join(dir).join(format!("{}.{}", id, ext))
    }
}

/// `{dir}/.{file}.{uuid}.part`, unique per write.
fn part_path(path: &Path) -> PathBuf {
    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}.part", file, uuid::Uuid::new_v4().simple()))
}

fn storage_err(action: &str, path: &Path, err: std::io::Error) -> Error {
    Error::Storage(format!("failed to {} {}: {}", action, path.display(), err))
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn read(&self, id: &DocumentId, kind: ArtifactKind) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(id, kind);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_err("read", &path, e)),
        }
    }

    async fn write(&self, id: &DocumentId, kind: ArtifactKind, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(id, kind);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| storage_err("create", parent, e))?;
        }

        let part = part_path(&path);
        let written = match tokio::fs::write(&part, bytes).await {
            Ok(()) => tokio::fs::rename(&part, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(storage_err("write", &path, e));
        }

        tracing::debug!(document_id = %id, kind = %kind, bytes = bytes.len(), "artifact written");
        Ok(())
    }

    async fn exists(&self, id: &DocumentId, kind: ArtifactKind) -> Result<bool> {
        let path = self.path_for(id, kind);
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| storage_err("stat", &path, e))
    }

    async fn remove(&self, id: &DocumentId, kind: ArtifactKind) -> Result<()> {
        let path = self.path_for(id, kind);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_err("remove", &path, e)),
        }
    }
}
