//! Document operations exposed to the HTTP server and the CLI.
//!
//! [`DocService`] is stateless between calls: everything it knows about a
//! document lives in the [`ArtifactStore`]. Collaborators are injected at
//! construction, so tests can run the full pipeline against an in-memory
//! store and fake gateways.
//!
//! | Operation | Requires | Writes |
//! |-----------|----------|--------|
//! | [`upload`](DocService::upload) | | raw |
//! | [`extract`](DocService::extract) | raw | text |
//! | [`summarize`](DocService::summarize) | text | summary |
//! | [`build_index`](DocService::build_index) | text | index |
//! | [`ask`](DocService::ask) | index | |

use std::sync::Arc;

use chrono::Utc;
use docqa_core::answer::AnswerSynthesizer;
use docqa_core::chunk::chunk_text;
use docqa_core::embedding::EmbeddingGateway;
use docqa_core::extract::PdfExtractor;
use docqa_core::index::{validate_top_k, VectorIndex};
use docqa_core::llm::LlmGateway;
use docqa_core::models::{
    ArtifactKind, DocumentId, DocumentStatus, RagConfig, ScoredChunk, SummaryRecord,
};
use docqa_core::retrieve::{Retrieval, Retriever, NO_RELEVANT_INFO_ANSWER};
use docqa_core::store::{read_text, write_text, ArtifactStore};
use docqa_core::summarize::Summarizer;
use docqa_core::{Error, Result};
use serde::Serialize;

use crate::artifacts::FsArtifactStore;
use crate::config::Config;
use crate::embedding::create_gateway;
use crate::extract::{PdfExtractExtractor, MAX_PAGES_LIMIT};
use crate::llm::create_llm;

/// Characters of extracted text echoed back by [`DocService::extract`].
const EXTRACT_PREVIEW_CHARS: usize = 500;

const EMPTY_TEXT_MESSAGE: &str =
    "No extractable text found. The PDF may be scanned (image-only); OCR is not supported.";

#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    pub document_id: DocumentId,
    pub filename: Option<String>,
    pub size_bytes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractOutcome {
    pub document_id: DocumentId,
    pub pages_processed: usize,
    /// In characters.
    pub text_length: usize,
    pub preview: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummarizeOutcome {
    pub document_id: DocumentId,
    pub summary: String,
    pub chunks_used: usize,
    pub chunk_size: usize,
    pub truncated: bool,
}

impl From<SummaryRecord> for SummarizeOutcome {
    fn from(record: SummaryRecord) -> Self {
        Self {
            document_id: record.document_id,
            summary: record.summary,
            chunks_used: record.meta.chunks_used,
            chunk_size: record.meta.chunk_size,
            truncated: record.meta.truncated,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexOutcome {
    pub document_id: DocumentId,
    pub chunks_indexed: usize,
    /// The text produced more chunks than `config.max_chunks`.
    pub truncated: bool,
    pub dims: usize,
    pub embedding_model: String,
    pub config: RagConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct AskOutcome {
    pub document_id: DocumentId,
    pub answer: String,
    pub sources: Vec<ScoredChunk>,
}

/// Per-call defaults taken from [`Config`].
#[derive(Debug, Clone)]
struct Defaults {
    max_upload_bytes: usize,
    max_pages: usize,
    rag: RagConfig,
    top_k: usize,
}

pub struct DocService {
    store: Arc<dyn ArtifactStore>,
    extractor: Arc<dyn PdfExtractor>,
    retriever: Retriever,
    index: Arc<VectorIndex>,
    summarizer: Summarizer,
    synthesizer: AnswerSynthesizer,
    defaults: Defaults,
}

impl DocService {
    /// Wire the service from explicit collaborators.
    pub fn new(
        config: &Config,
        store: Arc<dyn ArtifactStore>,
        extractor: Arc<dyn PdfExtractor>,
        embedder: Arc<dyn EmbeddingGateway>,
        llm: Arc<dyn LlmGateway>,
    ) -> Self {
        let index = Arc::new(VectorIndex::new(
            store.clone(),
            embedder,
            config.retrieval.distance_metric(),
            config.embedding.batch_size,
        ));
        Self {
            store,
            extractor,
            retriever: Retriever::new(index.clone(), config.retrieval.distance_threshold),
            index,
            summarizer: Summarizer::new(llm.clone(), config.summary.to_params()),
            synthesizer: AnswerSynthesizer::new(llm),
            defaults: Defaults {
                max_upload_bytes: config.server.max_upload_bytes(),
                max_pages: config.extract.default_max_pages,
                rag: config.rag.to_rag_config(),
                top_k: config.retrieval.default_top_k,
            },
        }
    }

    /// Production wiring: filesystem store, pdf-extract, configured gateways.
    ///
    /// Fails with `Auth` if a configured provider's API key is missing.
    pub fn from_config(config: &Config) -> Result<Self> {
        let embedder = create_gateway(&config.embedding)?;
        let llm = create_llm(&config.llm)?;
        tracing::info!(
            storage = %config.storage.root.display(),
            embedding = embedder.model_name(),
            llm = llm.model_name(),
            "document service ready"
        );
        Ok(Self::new(
            config,
            Arc::new(FsArtifactStore::new(config.storage.root.clone())),
            Arc::new(PdfExtractExtractor),
            embedder,
            llm,
        ))
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.defaults.max_upload_bytes
    }

    pub fn default_max_pages(&self) -> usize {
        self.defaults.max_pages
    }

    pub fn default_top_k(&self) -> usize {
        self.defaults.top_k
    }

    pub fn default_rag_config(&self) -> RagConfig {
        self.defaults.rag
    }

    pub async fn upload(&self, filename: Option<String>, bytes: &[u8]) -> Result<UploadOutcome> {
        if bytes.is_empty() {
            return Err(Error::validation("Uploaded file is empty."));
        }
        if bytes.len() > self.defaults.max_upload_bytes {
            return Err(Error::validation(format!(
                "File too large. Max {} MB.",
                self.defaults.max_upload_bytes / (1024 * 1024)
            )));
        }

        let document_id = DocumentId::generate();
        self.store
            .write(&document_id, ArtifactKind::Raw, bytes)
            .await?;
        tracing::info!(document_id = %document_id, size = bytes.len(), "document uploaded");

        Ok(UploadOutcome {
            document_id,
            filename,
            size_bytes: bytes.len(),
        })
    }

    pub async fn extract(&self, document_id: &DocumentId, max_pages: usize) -> Result<ExtractOutcome> {
        if !(1..=MAX_PAGES_LIMIT).contains(&max_pages) {
            return Err(Error::validation(format!(
                "max_pages must be between 1 and {}.",
                MAX_PAGES_LIMIT
            )));
        }
        let raw = self
            .store
            .read(document_id, ArtifactKind::Raw)
            .await?
            .ok_or_else(|| {
                Error::not_found(format!("Uploaded PDF not found for document {}.", document_id))
            })?;

        let extraction = self.extractor.extract(&raw, max_pages).await?;
        write_text(self.store.as_ref(), document_id, ArtifactKind::Text, &extraction.text).await?;

        let text_length = extraction.text.chars().count();
        tracing::info!(
            document_id = %document_id,
            pages = extraction.pages_processed,
            chars = text_length,
            "text extracted"
        );

        Ok(ExtractOutcome {
            document_id: document_id.clone(),
            pages_processed: extraction.pages_processed,
            text_length,
            preview: extraction.text.chars().take(EXTRACT_PREVIEW_CHARS).collect(),
            message: (text_length == 0).then(|| EMPTY_TEXT_MESSAGE.to_string()),
        })
    }

    async fn load_text(&self, document_id: &DocumentId) -> Result<String> {
        read_text(self.store.as_ref(), document_id, ArtifactKind::Text)
            .await?
            .ok_or_else(|| {
                Error::not_found(format!(
                    "Text not found for document {}. Run extract first.",
                    document_id
                ))
            })
    }

    pub async fn summarize(&self, document_id: &DocumentId) -> Result<SummarizeOutcome> {
        let text = self.load_text(document_id).await?;
        let summary = self.summarizer.summarize(&text).await?;

        let record = SummaryRecord {
            document_id: document_id.clone(),
            summary: summary.summary,
            meta: summary.meta,
            created_at: Utc::now(),
        };
        self.store
            .write(document_id, ArtifactKind::Summary, &serde_json::to_vec(&record)?)
            .await?;

        Ok(record.into())
    }

    /// Chunk the extracted text and (re)build the document's index.
    pub async fn build_index(
        &self,
        document_id: &DocumentId,
        config: Option<RagConfig>,
    ) -> Result<IndexOutcome> {
        let config = config.unwrap_or(self.defaults.rag);
        config.validate()?;

        let text = self.load_text(document_id).await?;
        if text.trim().is_empty() {
            return Err(Error::validation("Extracted text is empty."));
        }

        let chunked = chunk_text(
            &text,
            config.chunk_size,
            config.chunk_overlap,
            config.max_chunks,
        );
        if chunked.is_empty() {
            return Err(Error::validation("Extracted text is empty."));
        }
        if chunked.truncated {
            tracing::warn!(
                document_id = %document_id,
                produced = chunked.produced,
                kept = chunked.chunks.len(),
                "chunk count over max_chunks; indexing a prefix of the document"
            );
        }

        let report = self.index.build(document_id, &chunked.chunks, config).await?;
        Ok(IndexOutcome {
            document_id: document_id.clone(),
            chunks_indexed: report.chunks_indexed,
            truncated: chunked.truncated,
            dims: report.dims,
            embedding_model: report.embedding_model,
            config,
        })
    }

    pub async fn ask(
        &self,
        document_id: &DocumentId,
        question: &str,
        top_k: usize,
    ) -> Result<AskOutcome> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::validation("question must not be empty"));
        }
        validate_top_k(top_k)?;

        match self.retriever.retrieve(document_id, question, top_k).await? {
            Retrieval::NoRelevantInfo => {
                tracing::info!(document_id = %document_id, "no chunk passed the distance threshold");
                Ok(AskOutcome {
                    document_id: document_id.clone(),
                    answer: NO_RELEVANT_INFO_ANSWER.to_string(),
                    sources: Vec::new(),
                })
            }
            Retrieval::Grounded { context, sources } => {
                let answer = self.synthesizer.synthesize(question, &context).await?;
                Ok(AskOutcome {
                    document_id: document_id.clone(),
                    answer,
                    sources,
                })
            }
        }
    }

    pub async fn status(&self, document_id: &DocumentId) -> Result<DocumentStatus> {
        let store = self.store.as_ref();
        Ok(DocumentStatus {
            document_id: document_id.clone(),
            has_raw: store.exists(document_id, ArtifactKind::Raw).await?,
            has_text: store.exists(document_id, ArtifactKind::Text).await?,
            has_summary: store.exists(document_id, ArtifactKind::Summary).await?,
            has_index: store.exists(document_id, ArtifactKind::Index).await?,
        })
    }

    /// The most recently persisted summary.
    pub async fn summary(&self, document_id: &DocumentId) -> Result<SummaryRecord> {
        let bytes = self
            .store
            .read(document_id, ArtifactKind::Summary)
            .await?
            .ok_or_else(|| {
                Error::not_found(format!(
                    "Summary not found for document {}. Run summarize first.",
                    document_id
                ))
            })?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
