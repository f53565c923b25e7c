//! Core data models flowing through the document pipeline.
//!
//! A document is identified by a [`DocumentId`] and owns up to one
//! artifact of each [`ArtifactKind`]. Artifacts never reference each other
//! except through the shared id.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Maximum accepted length of a document id.
const MAX_ID_LEN: usize = 64;

/// Opaque, URL-safe document identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Generate a fresh id: 12 random bytes, URL-safe base64 (16 chars).
    pub fn generate() -> Self {
        let uuid = uuid::Uuid::new_v4();
        let bytes = uuid.as_bytes();
        Self(URL_SAFE_NO_PAD.encode(&bytes[..12]))
    }

    /// Parse an id received from a caller.
    ///
    /// Only `[A-Za-z0-9_-]` is accepted so an id can never escape the
    /// artifact store's directory layout.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(Error::validation("document_id must not be empty"));
        }
        if raw.len() > MAX_ID_LEN {
            return Err(Error::validation(format!(
                "document_id must be at most {} characters",
                MAX_ID_LEN
            )));
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::validation(
                "document_id may only contain letters, digits, '-' and '_'",
            ));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The kinds of durable state kept per document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Uploaded PDF bytes.
    Raw,
    /// Extracted UTF-8 text.
    Text,
    /// Persisted [`SummaryRecord`] (JSON).
    Summary,
    /// Persisted vector index (JSON).
    Index,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::Raw,
        ArtifactKind::Text,
        ArtifactKind::Summary,
        ArtifactKind::Index,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Raw => "raw",
            ArtifactKind::Text => "text",
            ArtifactKind::Summary => "summary",
            ArtifactKind::Index => "index",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A contiguous slice of a document's extracted text.
///
/// `chunk_id` equals the chunk's position in the chunker output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextChunk {
    pub chunk_id: usize,
    pub content: String,
    /// Filled in by the vector index at build time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl TextChunk {
    pub fn new(chunk_id: usize, content: impl Into<String>) -> Self {
        Self {
            chunk_id,
            content: content.into(),
            embedding: None,
        }
    }
}

/// Chunking parameters for one index build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RagConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub max_chunks: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 900,
            chunk_overlap: 150,
            max_chunks: 2000,
        }
    }
}

impl RagConfig {
    /// Upper bound on `max_chunks`, to bound embedding calls per build.
    pub const MAX_CHUNKS_LIMIT: usize = 10_000;

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::validation("chunk_size must be > 0"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::validation(
                "chunk_overlap must be smaller than chunk_size",
            ));
        }
        if self.max_chunks == 0 || self.max_chunks > Self::MAX_CHUNKS_LIMIT {
            return Err(Error::validation(format!(
                "max_chunks must be between 1 and {}",
                Self::MAX_CHUNKS_LIMIT
            )));
        }
        Ok(())
    }
}

/// A retrieved chunk with its distance to the query. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    pub chunk_id: usize,
    /// Lower is more similar.
    pub distance_score: f32,
    /// Truncated content for display.
    pub preview: String,
}

/// How a summary was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryMeta {
    pub chunks_used: usize,
    pub chunk_size: usize,
    pub truncated: bool,
}

/// Summary artifact as persisted by the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub document_id: DocumentId,
    pub summary: String,
    pub meta: SummaryMeta,
    pub created_at: DateTime<Utc>,
}

/// Which artifacts exist for a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentStatus {
    pub document_id: DocumentId,
    pub has_raw: bool,
    pub has_text: bool,
    pub has_summary: bool,
    pub has_index: bool,
}
