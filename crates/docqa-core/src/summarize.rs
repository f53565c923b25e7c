//! Map-reduce summarization over an [`LlmGateway`].
//!
//! The text is chunked with summarization-sized windows (much larger than
//! retrieval chunks) and capped at `max_chunks` to bound LLM spend. Each
//! retained chunk is summarized independently (map, bounded concurrency),
//! then the partial summaries are combined in chunk order (reduce). Any
//! failure fails the whole operation; there are no partial summaries.

use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};

use crate::chunk::chunk_text;
use crate::error::{Error, Result};
use crate::llm::LlmGateway;
use crate::models::{SummaryMeta, TextChunk};

const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that summarizes documents clearly and concisely.";

/// Chunking and fan-out limits for summarization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryParams {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Hard cap on map calls; excess chunks are dropped silently.
    pub max_chunks: usize,
    /// Map calls in flight at once.
    pub concurrency: usize,
}

impl Default for SummaryParams {
    fn default() -> Self {
        Self {
            chunk_size: 6000,
            chunk_overlap: 400,
            max_chunks: 12,
            concurrency: 4,
        }
    }
}

/// A finished summary and how it was produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub summary: String,
    pub meta: SummaryMeta,
}

pub struct Summarizer {
    llm: Arc<dyn LlmGateway>,
    params: SummaryParams,
}

impl Summarizer {
    pub fn new(llm: Arc<dyn LlmGateway>, params: SummaryParams) -> Self {
        Self { llm, params }
    }

    pub fn params(&self) -> &SummaryParams {
        &self.params
    }

    pub async fn summarize(&self, text: &str) -> Result<Summary> {
        if text.trim().is_empty() {
            return Err(Error::validation("Extracted text is empty."));
        }

        let chunked = chunk_text(
            text,
            self.params.chunk_size,
            self.params.chunk_overlap,
            self.params.max_chunks,
        );
        if chunked.is_empty() {
            return Err(Error::validation("Extracted text is empty."));
        }
        if chunked.truncated {
            tracing::warn!(
                produced = chunked.produced,
                kept = chunked.chunks.len(),
                "document too long, summarizing the leading chunks only"
            );
        }

        let total = chunked.chunks.len();
        let partials: Vec<String> = stream::iter(
            chunked
                .chunks
                .into_iter()
                .map(|chunk| async move { self.summarize_section(&chunk, total).await }),
        )
        .buffered(self.params.concurrency.max(1))
        .try_collect()
        .await?;

        let summary = self.combine(&partials).await?;
        tracing::info!(chunks = total, truncated = chunked.truncated, "summary produced");

        Ok(Summary {
            summary,
            meta: SummaryMeta {
                chunks_used: total,
                chunk_size: self.params.chunk_size,
                truncated: chunked.truncated,
            },
        })
    }

    async fn summarize_section(&self, chunk: &TextChunk, total: usize) -> Result<String> {
        let prompt = format!(
            "Summarize this section of a document in 3-6 short bullet points. \
             Keep any dates, numbers and action items.\n\n\
             Section {} of {}:\n{}",
            chunk.chunk_id + 1,
            total,
            chunk.content
        );
        let out = self.llm.complete(SYSTEM_PROMPT, &prompt).await?;
        tracing::debug!(section = chunk.chunk_id + 1, total, "section summarized");
        Ok(out.trim().to_string())
    }

    async fn combine(&self, partials: &[String]) -> Result<String> {
        let sections = partials
            .iter()
            .enumerate()
            .map(|(i, p)| format!("Section {}:\n{}", i + 1, p))
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = format!(
            "Combine the following section summaries into one final summary of the whole document.\n\n\
             Use this structure:\n\
             - Key points (5-10 bullets)\n\
             - Important dates/numbers (if any)\n\
             - Action items (if any)\n\n\
             Section summaries:\n{}",
            sections
        );
        let out = self.llm.complete(SYSTEM_PROMPT, &prompt).await?;
        Ok(out.trim().to_string())
    }
}
