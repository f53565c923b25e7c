//! Per-document vector index.
//!
//! [`VectorIndex::build`] embeds every chunk through the
//! [`EmbeddingGateway`] and persists `(vector, chunk_id, content)` entries
//! as a versioned JSON artifact. [`VectorIndex::search`] embeds the query
//! with the same gateway and ranks entries by exact (brute-force)
//! distance, best match first.
//!
//! # Persisted format
//!
//! ```text
//! {
//!   "version": 1,
//!   "document_id": "...",
//!   "embedding_model": "gemini-embedding-001",
//!   "dims": 768,
//!   "metric": "l2",
//!   "built_at": "2025-01-01T00:00:00Z",
//!   "config": { "chunk_size": 900, "chunk_overlap": 150, "max_chunks": 2000 },
//!   "entries": [ { "chunk_id": 0, "content": "...", "hash": "<sha256>", "vector": "<base64 LE f32>" } ]
//! }
//! ```
//!
//! The index is self-describing: chunk text and ids travel with the
//! vectors, so it reloads without the chunker's output. The
//! recorded model name guards against querying with a different
//! embedding space.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::embedding::{blob_to_vec, vec_to_blob, DistanceMetric, EmbeddingGateway};
use crate::error::{Error, Result};
use crate::models::{ArtifactKind, DocumentId, RagConfig, TextChunk};
use crate::store::ArtifactStore;

/// Bumped whenever the persisted layout changes incompatibly.
pub const INDEX_FORMAT_VERSION: u32 = 1;

/// Inclusive bounds for `top_k`.
pub const MIN_TOP_K: usize = 1;
pub const MAX_TOP_K: usize = 10;

#[derive(Debug, Serialize, Deserialize)]
struct PersistedIndex {
    version: u32,
    document_id: DocumentId,
    embedding_model: String,
    dims: usize,
    metric: DistanceMetric,
    built_at: DateTime<Utc>,
    config: RagConfig,
    entries: Vec<PersistedEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedEntry {
    chunk_id: usize,
    content: String,
    hash: String,
    vector: String,
}

/// A reloaded index.
#[derive(Debug, Clone)]
pub struct LoadedIndex {
    pub document_id: DocumentId,
    pub embedding_model: String,
    pub dims: usize,
    pub metric: DistanceMetric,
    pub built_at: DateTime<Utc>,
    pub config: RagConfig,
    /// Chunks with `embedding` populated, in chunk order.
    pub chunks: Vec<TextChunk>,
}

/// Result of a successful build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    pub chunks_indexed: usize,
    pub dims: usize,
    pub embedding_model: String,
}

/// One ranked search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub chunk_id: usize,
    pub content: String,
    pub distance: f32,
}

/// Builds and queries per-document vector indexes.
pub struct VectorIndex {
    store: Arc<dyn ArtifactStore>,
    embedder: Arc<dyn EmbeddingGateway>,
    metric: DistanceMetric,
    batch_size: usize,
}

impl VectorIndex {
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        embedder: Arc<dyn EmbeddingGateway>,
        metric: DistanceMetric,
        batch_size: usize,
    ) -> Self {
        Self {
            store,
            embedder,
            metric,
            batch_size: batch_size.max(1),
        }
    }

    pub fn embedding_model(&self) -> &str {
        self.embedder.model_name()
    }

    /// Embed `chunks` and persist them as the document's index,
    /// replacing any previous one.
    pub async fn build(
        &self,
        document_id: &DocumentId,
        chunks: &[TextChunk],
        config: RagConfig,
    ) -> Result<IndexReport> {
        if chunks.is_empty() {
            return Err(Error::validation("no chunks to index"));
        }

        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let embedded = self.embedder.embed_batch(&texts).await?;
            if embedded.len() != texts.len() {
                return Err(Error::Remote(format!(
                    "embedding service returned {} vectors for {} texts",
                    embedded.len(),
                    texts.len()
                )));
            }
            vectors.extend(embedded);
        }

        let dims = vectors.first().map(|v| v.len()).unwrap_or(0);
        if dims == 0 {
            return Err(Error::Remote("embedding service returned an empty vector".to_string()));
        }
        if vectors.iter().any(|v| v.len() != dims) {
            return Err(Error::Remote(
                "embedding service returned vectors of differing dimensionality".to_string(),
            ));
        }
        let expected = self.embedder.dims();
        if expected != 0 && expected != dims {
            return Err(Error::Remote(format!(
                "embedding model {} is configured for {} dims but returned {}",
                self.embedder.model_name(),
                expected,
                dims
            )));
        }

        let entries = chunks
            .iter()
            .zip(vectors.iter())
            .map(|(chunk, vector)| PersistedEntry {
                chunk_id: chunk.chunk_id,
                content: chunk.content.clone(),
                hash: content_hash(&chunk.content),
                vector: STANDARD.encode(vec_to_blob(vector)),
            })
            .collect();

        let persisted = PersistedIndex {
            version: INDEX_FORMAT_VERSION,
            document_id: document_id.clone(),
            embedding_model: self.embedder.model_name().to_string(),
            dims,
            metric: self.metric,
            built_at: Utc::now(),
            config,
            entries,
        };
        let bytes = serde_json::to_vec(&persisted)?;
        self.store
            .write(document_id, ArtifactKind::Index, &bytes)
            .await?;

        tracing::info!(
            document_id = %document_id,
            chunks = chunks.len(),
            dims,
            model = self.embedder.model_name(),
            "index built"
        );

        Ok(IndexReport {
            chunks_indexed: chunks.len(),
            dims,
            embedding_model: persisted.embedding_model,
        })
    }

    /// Reload a persisted index. Fails with `NotFound` if none exists.
    pub async fn load(&self, document_id: &DocumentId) -> Result<LoadedIndex> {
        let bytes = self
            .store
            .read(document_id, ArtifactKind::Index)
            .await?
            .ok_or_else(|| {
                Error::not_found(format!(
                    "Vector index not found for document {}. Build the index first.",
                    document_id
                ))
            })?;

        let persisted: PersistedIndex = serde_json::from_slice(&bytes)?;
        if persisted.version != INDEX_FORMAT_VERSION {
            return Err(Error::Storage(format!(
                "index for {} has format version {}, expected {}; rebuild it",
                document_id, persisted.version, INDEX_FORMAT_VERSION
            )));
        }

        let mut chunks = Vec::with_capacity(persisted.entries.len());
        for entry in persisted.entries {
            let blob = STANDARD.decode(entry.vector.as_bytes()).map_err(|e| {
                Error::Storage(format!("index vector for chunk {} is corrupt: {}", entry.chunk_id, e))
            })?;
            let vector = blob_to_vec(&blob);
            if vector.len() != persisted.dims {
                return Err(Error::Storage(format!(
                    "index vector for chunk {} has {} dims, expected {}",
                    entry.chunk_id,
                    vector.len(),
                    persisted.dims
                )));
            }
            chunks.push(TextChunk {
                chunk_id: entry.chunk_id,
                content: entry.content,
                embedding: Some(vector),
            });
        }

        Ok(LoadedIndex {
            document_id: persisted.document_id,
            embedding_model: persisted.embedding_model,
            dims: persisted.dims,
            metric: persisted.metric,
            built_at: persisted.built_at,
            config: persisted.config,
            chunks,
        })
    }

    /// Rank the document's chunks against `query`, ascending distance,
    /// at most `top_k` results.
    pub async fn search(
        &self,
        document_id: &DocumentId,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchHit>> {
        validate_top_k(top_k)?;
        if query.trim().is_empty() {
            return Err(Error::validation("query must not be empty"));
        }

        let index = self.load(document_id).await?;
        if index.embedding_model != self.embedder.model_name() {
            return Err(Error::validation(format!(
                "index for {} was built with embedding model '{}' but the configured model is '{}'; rebuild the index",
                document_id,
                index.embedding_model,
                self.embedder.model_name()
            )));
        }

        let query_vec = self.embedder.embed(query).await?;
        if query_vec.len() != index.dims {
            return Err(Error::Remote(format!(
                "query embedding has {} dims but the index has {}",
                query_vec.len(),
                index.dims
            )));
        }

        let mut hits: Vec<SearchHit> = index
            .chunks
            .into_iter()
            .filter_map(|chunk| {
                let vector = chunk.embedding?;
                Some(SearchHit {
                    chunk_id: chunk.chunk_id,
                    distance: index.metric.distance(&query_vec, &vector),
                    content: chunk.content,
                })
            })
            .collect();
        hits.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.chunk_id.cmp(&b.chunk_id))
        });
        hits.truncate(top_k);

        tracing::debug!(document_id = %document_id, hits = hits.len(), "index searched");
        Ok(hits)
    }
}

/// Reject `top_k` outside `MIN_TOP_K..=MAX_TOP_K`.
pub fn validate_top_k(top_k: usize) -> Result<()> {
    if !(MIN_TOP_K..=MAX_TOP_K).contains(&top_k) {
        return Err(Error::validation(format!(
            "top_k must be between {} and {}.",
            MIN_TOP_K, MAX_TOP_K
        )));
    }
    Ok(())
}

fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
