//! Fakes shared by the integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use docqa::config::Config;
use docqa::service::DocService;
use docqa_core::embedding::EmbeddingGateway;
use docqa_core::extract::{Extraction, PdfExtractor};
use docqa_core::llm::LlmGateway;
use docqa_core::store::memory::InMemoryStore;
use docqa_core::Result;

/// Topic words mapped to orthogonal axes. Texts sharing a topic are at
/// distance 0; different topics are at squared-L2 distance 2.
const TOPICS: [&str; 3] = ["invoice", "weather", "recipe"];

pub struct KeywordEmbedder {
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingGateway for KeywordEmbedder {
    fn model_name(&self) -> &str {
        "keyword-test"
    }

    fn dims(&self) -> usize {
        4
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let lower = text.to_lowercase();
        let axis = TOPICS
            .iter()
            .position(|t| lower.contains(t))
            .unwrap_or(TOPICS.len());
        let mut v = vec![0.0; 4];
        v[axis] = 1.0;
        Ok(v)
    }
}

pub struct CountingLlm {
    prompts: Mutex<Vec<String>>,
}

impl CountingLlm {
    pub fn new() -> Self {
        Self {
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmGateway for CountingLlm {
    fn model_name(&self) -> &str {
        "counting-test"
    }

    async fn complete(&self, _system_prompt: &str, user_prompt: &str) -> Result<String> {
        let mut prompts = self.prompts.lock().unwrap();
        prompts.push(user_prompt.to_string());
        Ok(format!("  reply {}  \n", prompts.len()))
    }
}

/// Ignores the PDF bytes and returns fixed text.
pub struct FixedExtractor {
    pub text: String,
    pub pages: usize,
}

#[async_trait]
impl PdfExtractor for FixedExtractor {
    async fn extract(&self, _bytes: &[u8], max_pages: usize) -> Result<Extraction> {
        Ok(Extraction {
            text: self.text.clone(),
            pages_processed: self.pages.min(max_pages),
        })
    }
}

pub const INVOICE_TEXT: &str =
    "The invoice total is 420 dollars.\n\nBring a recipe for soup.";

pub struct Harness {
    pub service: DocService,
    pub store: Arc<InMemoryStore>,
    pub embedder: Arc<KeywordEmbedder>,
    pub llm: Arc<CountingLlm>,
}

pub fn harness(config: &Config, text: &str) -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let embedder = Arc::new(KeywordEmbedder::new());
    let llm = Arc::new(CountingLlm::new());
    let extractor = Arc::new(FixedExtractor {
        text: text.to_string(),
        pages: 3,
    });
    let service = DocService::new(
        config,
        store.clone(),
        extractor,
        embedder.clone(),
        llm.clone(),
    );
    Harness {
        service,
        store,
        embedder,
        llm,
    }
}

/// Chunking small enough that [`INVOICE_TEXT`] splits into its two paragraphs.
pub fn small_chunk_config() -> Config {
    let mut config = Config::default();
    config.rag.chunk_size = 40;
    config.rag.chunk_overlap = 10;
    config
}
