//! Confidence-filtered retrieval of grounded context.
//!
//! Wraps [`VectorIndex::search`] with two filters: hits farther than the
//! distance threshold are discarded as low-confidence, and hits whose
//! content is blank are dropped. When nothing survives, the caller gets
//! [`Retrieval::NoRelevantInfo`] and must answer with
//! [`NO_RELEVANT_INFO_ANSWER`] without calling the LLM.

use std::sync::Arc;

use crate::error::Result;
use crate::index::VectorIndex;
use crate::models::{DocumentId, ScoredChunk};

/// Default distance cut-off. Embedding-model dependent; calibrate per model.
pub const DEFAULT_DISTANCE_THRESHOLD: f32 = 1.2;

/// Characters of chunk content kept in a source preview.
pub const PREVIEW_CHARS: usize = 280;

/// Separator between context blocks handed to the LLM.
pub const CONTEXT_DELIMITER: &str = "\n\n---\n\n";

/// Fixed answer when no chunk passes the confidence filter.
pub const NO_RELEVANT_INFO_ANSWER: &str =
    "I couldn't find relevant information in this document to answer that question.";

/// Outcome of [`Retriever::retrieve`].
#[derive(Debug, Clone, PartialEq)]
pub enum Retrieval {
    /// Nothing passed the filters. No LLM call may be made.
    NoRelevantInfo,
    /// Context for the LLM plus display sources, best match first.
    Grounded {
        context: String,
        sources: Vec<ScoredChunk>,
    },
}

impl Retrieval {
    pub fn sources(&self) -> &[ScoredChunk] {
        match self {
            Retrieval::NoRelevantInfo => &[],
            Retrieval::Grounded { sources, .. } => sources,
        }
    }
}

pub struct Retriever {
    index: Arc<VectorIndex>,
    distance_threshold: f32,
}

impl Retriever {
    pub fn new(index: Arc<VectorIndex>, distance_threshold: f32) -> Self {
        Self {
            index,
            distance_threshold,
        }
    }

    pub fn distance_threshold(&self) -> f32 {
        self.distance_threshold
    }

    pub async fn retrieve(
        &self,
        document_id: &DocumentId,
        question: &str,
        top_k: usize,
    ) -> Result<Retrieval> {
        let hits = self.index.search(document_id, question, top_k).await?;
        let found = hits.len();

        let mut blocks = Vec::new();
        let mut sources = Vec::new();
        for hit in hits {
            if hit.distance > self.distance_threshold {
                continue;
            }
            let content = hit.content.trim();
            if content.is_empty() {
                continue;
            }
            blocks.push(format!(
                "[Chunk {} | distance {:.4}]\n{}",
                hit.chunk_id, hit.distance, content
            ));
            sources.push(ScoredChunk {
                chunk_id: hit.chunk_id,
                distance_score: hit.distance,
                preview: preview(content),
            });
        }

        tracing::debug!(
            document_id = %document_id,
            found,
            kept = sources.len(),
            threshold = self.distance_threshold,
            "retrieval filtered"
        );

        if sources.is_empty() {
            return Ok(Retrieval::NoRelevantInfo);
        }
        Ok(Retrieval::Grounded {
            context: blocks.join(CONTEXT_DELIMITER),
            sources,
        })
    }
}

/// First [`PREVIEW_CHARS`] characters of `text`.
pub fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::DistanceMetric;
    use crate::error::Error;
    use crate::models::{RagConfig, TextChunk};
    use crate::store::memory::InMemoryStore;
    use crate::testing::HashEmbedder;

    fn doc() -> DocumentId {
        DocumentId::parse("doc-r").unwrap()
    }

    async fn retriever_over(
        chunks: &[TextChunk],
        embedder: HashEmbedder,
        threshold: f32,
    ) -> Retriever {
        let store = Arc::new(InMemoryStore::new());
        let index = Arc::new(VectorIndex::new(
            store,
            Arc::new(embedder),
            DistanceMetric::L2,
            8,
        ));
        index.build(&doc(), chunks, RagConfig::default()).await.unwrap();
        Retriever::new(index, threshold)
    }

    #[tokio::test]
    async fn test_exact_match_is_below_threshold() {
        let chunks = vec![
            TextChunk::new(0, "Payment terms are net thirty days"),
            TextChunk::new(1, "The warranty covers two years"),
        ];
        let retriever =
            retriever_over(&chunks, HashEmbedder::new(), DEFAULT_DISTANCE_THRESHOLD).await;

        let out = retriever
            .retrieve(&doc(), "The warranty covers two years", 1)
            .await
            .unwrap();
        match out {
            Retrieval::Grounded { context, sources } => {
                assert_eq!(sources.len(), 1);
                assert_eq!(sources[0].chunk_id, 1);
                assert!(sources[0].distance_score < DEFAULT_DISTANCE_THRESHOLD);
                assert!(context.starts_with("[Chunk 1 | distance 0.0000]\n"));
                assert!(context.contains("The warranty covers two years"));
            }
            Retrieval::NoRelevantInfo => panic!("expected grounded context"),
        }
    }

    #[tokio::test]
    async fn test_far_match_yields_sentinel() {
        // Distance between the pinned vectors is 5.0 (squared L2).
        let embedder = HashEmbedder::new()
            .pin("only chunk", vec![0.0, 0.0])
            .pin("unrelated question", vec![1.0, 2.0]);
        let chunks = vec![TextChunk::new(0, "only chunk")];
        let retriever = retriever_over(&chunks, embedder, 1.2).await;

        let out = retriever
            .retrieve(&doc(), "unrelated question", 4)
            .await
            .unwrap();
        assert_eq!(out, Retrieval::NoRelevantInfo);
        assert!(out.sources().is_empty());
    }

    #[tokio::test]
    async fn test_blank_chunks_are_dropped() {
        let embedder = HashEmbedder::new()
            .pin("   ", vec![1.0, 0.0])
            .pin("real content", vec![0.9, 0.1])
            .pin("question", vec![1.0, 0.0]);
        let chunks = vec![TextChunk::new(0, "   "), TextChunk::new(1, "real content")];
        let retriever = retriever_over(&chunks, embedder, 1.2).await;

        let out = retriever.retrieve(&doc(), "question", 2).await.unwrap();
        let sources = out.sources();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].chunk_id, 1);
    }

    #[tokio::test]
    async fn test_context_orders_best_first_with_delimiter() {
        let embedder = HashEmbedder::new()
            .pin("near", vec![1.0, 0.1])
            .pin("nearest", vec![1.0, 0.0])
            .pin("far", vec![0.0, 3.0])
            .pin("q", vec![1.0, 0.0]);
        let chunks = vec![
            TextChunk::new(0, "near"),
            TextChunk::new(1, "far"),
            TextChunk::new(2, "nearest"),
        ];
        let retriever = retriever_over(&chunks, embedder, 1.2).await;

        match retriever.retrieve(&doc(), "q", 3).await.unwrap() {
            Retrieval::Grounded { context, sources } => {
                let ids: Vec<usize> = sources.iter().map(|s| s.chunk_id).collect();
                assert_eq!(ids, vec![2, 0]);
                let blocks: Vec<&str> = context.split(CONTEXT_DELIMITER).collect();
                assert_eq!(blocks.len(), 2);
                assert!(blocks[0].ends_with("nearest"));
                assert!(blocks[1].ends_with("near"));
            }
            Retrieval::NoRelevantInfo => panic!("expected grounded context"),
        }
    }

    #[tokio::test]
    async fn test_preview_is_truncated_but_context_is_not() {
        let long = "word ".repeat(200);
        let embedder = HashEmbedder::new()
            .pin(long.as_str(), vec![1.0])
            .pin("q", vec![1.0]);
        let chunks = vec![TextChunk::new(0, long.clone())];
        let retriever = retriever_over(&chunks, embedder, 1.2).await;

        match retriever.retrieve(&doc(), "q", 1).await.unwrap() {
            Retrieval::Grounded { context, sources } => {
                assert_eq!(sources[0].preview.chars().count(), PREVIEW_CHARS);
                assert!(context.contains(long.trim()));
            }
            Retrieval::NoRelevantInfo => panic!("expected grounded context"),
        }
    }

    #[tokio::test]
    async fn test_missing_index_propagates_not_found() {
        let store = Arc::new(InMemoryStore::new());
        let index = Arc::new(VectorIndex::new(
            store,
            Arc::new(HashEmbedder::new()),
            DistanceMetric::L2,
            8,
        ));
        let retriever = Retriever::new(index, 1.2);
        let err = retriever.retrieve(&doc(), "q", 4).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
