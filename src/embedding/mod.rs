//! Embedding gateway implementations.
//!
//! Concrete [`EmbeddingGateway`] backends:
//! - **[`DisabledGateway`]**: fails every call; used when embeddings are not configured.
//! - **[`GeminiGateway`]**: Google Generative Language `embedContent` / `batchEmbedContents`.
//! - **[`OpenAIGateway`]**: OpenAI `POST /v1/embeddings`.
//! - **[`OllamaGateway`]**: a local Ollama instance's `/api/embed`.
//! - **`LocalGateway`**: in-process fastembed (feature `local-embeddings-fastembed`).
//!
//! Credentials are checked when a gateway is constructed, so a missing key
//! fails at startup rather than on the first request.
//!
//! # Provider Selection
//!
//! ```rust,no_run
//! # use docqa::config::EmbeddingConfig;
//! # use docqa::embedding::create_gateway;
//! let config = EmbeddingConfig::default(); // provider = "disabled"
//! let gateway = create_gateway(&config).unwrap();
//! assert_eq!(gateway.model_name(), "disabled");
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use docqa_core::embedding::EmbeddingGateway;
use docqa_core::{Error, Result};
use serde_json::{json, Value};

use crate::config::EmbeddingConfig;
use crate::remote::{build_client, json_to_vec, require_env_key, JsonPost};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const OPENAI_BASE_URL: &str = "https://api.openai.com";
const OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Create the gateway named by `config.provider`.
///
/// | Config Value | Gateway |
/// |-------------|----------|
/// | `"disabled"` | [`DisabledGateway`] |
/// | `"gemini"` | [`GeminiGateway`] |
/// | `"openai"` | [`OpenAIGateway`] |
/// | `"ollama"` | [`OllamaGateway`] |
/// | `"local"` | `LocalGateway` (requires the `local-embeddings-fastembed` feature) |
pub fn create_gateway(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingGateway>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledGateway)),
        "gemini" => Ok(Arc::new(GeminiGateway::new(config)?)),
        "openai" => Ok(Arc::new(OpenAIGateway::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaGateway::new(config)?)),
        #[cfg(feature = "local-embeddings-fastembed")]
        "local" => Ok(Arc::new(LocalGateway::new(config)?)),
        #[cfg(not(feature = "local-embeddings-fastembed"))]
        "local" => Err(Error::validation(
            "Local embedding provider requires --features local-embeddings-fastembed",
        )),
        other => Err(Error::validation(format!(
            "Unknown embedding provider: {}",
            other
        ))),
    }
}

fn first_vector(mut vectors: Vec<Vec<f32>>, service: &str) -> Result<Vec<f32>> {
    if vectors.is_empty() {
        return Err(Error::Remote(format!("Empty {} embedding response", service)));
    }
    Ok(vectors.swap_remove(0))
}

// ============ Disabled ============

/// Gateway used when `embedding.provider = "disabled"`.
pub struct DisabledGateway;

#[async_trait]
impl EmbeddingGateway for DisabledGateway {
    fn model_name(&self) -> &str {
        "disabled"
    }
    fn dims(&self) -> usize {
        0
    }
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(Error::Auth(
            "embedding provider is disabled; configure [embedding] provider and credentials"
                .to_string(),
        ))
    }
}

// ============ Gemini ============

/// Google Gemini embeddings. Requires `GEMINI_API_KEY`.
pub struct GeminiGateway {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dims: usize,
    base_url: String,
    max_retries: u32,
}

impl GeminiGateway {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = require_env_key("GEMINI_API_KEY")?;
        let model = config
            .model
            .clone()
            .unwrap_or_else(|| "gemini-embedding-001".to_string());
        let model = model.trim_start_matches("models/").to_string();
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            api_key,
            model,
            dims: config.dims.unwrap_or(0),
            base_url: config
                .url
                .clone()
                .unwrap_or_else(|| GEMINI_BASE_URL.to_string()),
            max_retries: config.max_retries,
        })
    }

    fn request(&self, text: &str) -> Value {
        let mut req = json!({
            "model": format!("models/{}", self.model),
            "content": { "parts": [{ "text": text }] },
        });
        if self.dims > 0 {
            req["outputDimensionality"] = json!(self.dims);
        }
        req
    }

    fn post(&self, method: &str) -> JsonPost<'_> {
        JsonPost {
            client: &self.client,
            service: "Gemini",
            url: format!(
                "{}/v1beta/models/{}:{}",
                self.base_url.trim_end_matches('/'),
                self.model,
                method
            ),
            bearer: None,
            headers: vec![("x-goog-api-key", self.api_key.clone())],
            max_retries: self.max_retries,
        }
    }
}

#[async_trait]
impl EmbeddingGateway for GeminiGateway {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let json = self.post("embedContent").send(&self.request(text)).await?;
        let values = json
            .pointer("/embedding/values")
            .ok_or_else(|| Error::Remote("Invalid Gemini response: missing embedding.values".to_string()))?;
        json_to_vec(values, "Gemini")
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let requests: Vec<Value> = texts.iter().map(|t| self.request(t)).collect();
        let json = self
            .post("batchEmbedContents")
            .send(&json!({ "requests": requests }))
            .await?;
        parse_gemini_batch(&json)
    }
}

/// Parse a `batchEmbedContents` response: `embeddings[].values`.
pub fn parse_gemini_batch(json: &Value) -> Result<Vec<Vec<f32>>> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| Error::Remote("Invalid Gemini response: missing embeddings array".to_string()))?;
    embeddings
        .iter()
        .map(|e| {
            let values = e
                .get("values")
                .ok_or_else(|| Error::Remote("Invalid Gemini response: missing values".to_string()))?;
            json_to_vec(values, "Gemini")
        })
        .collect()
}

// ============ OpenAI ============

/// OpenAI embeddings. Requires `OPENAI_API_KEY`.
pub struct OpenAIGateway {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dims: usize,
    base_url: String,
    max_retries: u32,
}

impl OpenAIGateway {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = require_env_key("OPENAI_API_KEY")?;
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            api_key,
            model: config
                .model
                .clone()
                .unwrap_or_else(|| "text-embedding-3-small".to_string()),
            dims: config.dims.unwrap_or(0),
            base_url: config
                .url
                .clone()
                .unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl EmbeddingGateway for OpenAIGateway {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        first_vector(self.embed_batch(&[text.to_string()]).await?, "OpenAI")
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let post = JsonPost {
            client: &self.client,
            service: "OpenAI",
            url: format!("{}/v1/embeddings", self.base_url.trim_end_matches('/')),
            bearer: Some(&self.api_key),
            headers: Vec::new(),
            max_retries: self.max_retries,
        };
        let json = post
            .send(&json!({ "model": self.model, "input": texts }))
            .await?;
        parse_openai_response(&json)
    }
}

/// Parse `data[].embedding`, ordered by each item's `index`.
pub fn parse_openai_response(json: &Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| Error::Remote("Invalid OpenAI response: missing data array".to_string()))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (pos, item) in data.iter().enumerate() {
        let embedding = item
            .get("embedding")
            .ok_or_else(|| Error::Remote("Invalid OpenAI response: missing embedding".to_string()))?;
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(pos);
        indexed.push((index, json_to_vec(embedding, "OpenAI")?));
    }
    indexed.sort_by_key(|(i, _)| *i);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

// ============ Ollama ============

/// A local Ollama instance (default `http://localhost:11434`).
pub struct OllamaGateway {
    client: reqwest::Client,
    model: String,
    dims: usize,
    url: String,
    max_retries: u32,
}

impl OllamaGateway {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            model: config
                .model
                .clone()
                .unwrap_or_else(|| "nomic-embed-text".to_string()),
            dims: config.dims.unwrap_or(0),
            url: config
                .url
                .clone()
                .unwrap_or_else(|| OLLAMA_BASE_URL.to_string()),
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl EmbeddingGateway for OllamaGateway {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        first_vector(self.embed_batch(&[text.to_string()]).await?, "Ollama")
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let post = JsonPost {
            client: &self.client,
            service: "Ollama",
            url: format!("{}/api/embed", self.url.trim_end_matches('/')),
            bearer: None,
            headers: Vec::new(),
            max_retries: self.max_retries,
        };
        let json = post
            .send(&json!({ "model": self.model, "input": texts }))
            .await?;
        parse_ollama_response(&json)
    }
}

pub fn parse_ollama_response(json: &Value) -> Result<Vec<Vec<f32>>> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| Error::Remote("Invalid Ollama response: missing embeddings array".to_string()))?;
    embeddings.iter().map(|e| json_to_vec(e, "Ollama")).collect()
}

// ============ Local (fastembed) ============

/// In-process embeddings via fastembed. The model is downloaded from
/// Hugging Face on construction and cached; after that no network is used.
#[cfg(feature = "local-embeddings-fastembed")]
pub struct LocalGateway {
    model_name: String,
    dims: usize,
    batch_size: usize,
    model: Arc<std::sync::Mutex<fastembed::TextEmbedding>>,
}

#[cfg(feature = "local-embeddings-fastembed")]
impl LocalGateway {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model_name = config
            .model
            .clone()
            .unwrap_or_else(|| "all-minilm-l6-v2".to_string());
        let (model_id, default_dims) = match model_name.as_str() {
            "all-minilm-l6-v2" => (fastembed::EmbeddingModel::AllMiniLML6V2, 384),
            "bge-small-en-v1.5" => (fastembed::EmbeddingModel::BGESmallENV15, 384),
            "bge-base-en-v1.5" => (fastembed::EmbeddingModel::BGEBaseENV15, 768),
            "nomic-embed-text-v1.5" => (fastembed::EmbeddingModel::NomicEmbedTextV15, 768),
            other => {
                return Err(Error::validation(format!(
                    "Unknown local embedding model: '{}'. Supported models: \
                     all-minilm-l6-v2, bge-small-en-v1.5, bge-base-en-v1.5, nomic-embed-text-v1.5",
                    other
                )))
            }
        };
        let model = fastembed::TextEmbedding::try_new(
            fastembed::InitOptions::new(model_id).with_show_download_progress(true),
        )
        .map_err(|e| Error::Remote(format!("Failed to initialize local embedding model: {}", e)))?;

        Ok(Self {
            model_name,
            dims: config.dims.unwrap_or(default_dims),
            batch_size: config.batch_size,
            model: Arc::new(std::sync::Mutex::new(model)),
        })
    }
}

#[cfg(feature = "local-embeddings-fastembed")]
#[async_trait]
impl EmbeddingGateway for LocalGateway {
    fn model_name(&self) -> &str {
        &self.model_name
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        first_vector(self.embed_batch(&[text.to_string()]).await?, "local")
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let model = self.model.clone();
        let texts = texts.to_vec();
        let batch_size = self.batch_size;
        tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|_| Error::Remote("local embedding model lock poisoned".to_string()))?;
            model
                .embed(texts, Some(batch_size))
                .map_err(|e| Error::Remote(format!("Local embedding failed: {}", e)))
        })
        .await
        .map_err(|e| Error::Remote(format!("local embedding task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_openai_orders_by_index() {
        let json = json!({
            "data": [
                { "index": 1, "embedding": [0.0, 1.0] },
                { "index": 0, "embedding": [1.0, 0.0] }
            ]
        });
        let vecs = parse_openai_response(&json).unwrap();
        assert_eq!(vecs, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_parse_gemini_batch() {
        let json = json!({ "embeddings": [ { "values": [0.25, 0.5] }, { "values": [1.0, 2.0] } ] });
        let vecs = parse_gemini_batch(&json).unwrap();
        assert_eq!(vecs.len(), 2);
        assert_eq!(vecs[1], vec![1.0, 2.0]);
        assert!(parse_gemini_batch(&json!({})).is_err());
    }

    #[test]
    fn test_parse_ollama() {
        let json = json!({ "embeddings": [[0.1, 0.2, 0.3]] });
        assert_eq!(parse_ollama_response(&json).unwrap()[0].len(), 3);
        assert!(parse_ollama_response(&json!({ "embeddings": [1] })).is_err());
    }

    #[tokio::test]
    async fn test_disabled_gateway_fails_with_auth() {
        let gw = create_gateway(&EmbeddingConfig::default()).unwrap();
        assert_eq!(gw.model_name(), "disabled");
        let err = gw.embed("hello").await.unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let config = EmbeddingConfig {
            provider: "bert".to_string(),
            ..EmbeddingConfig::default()
        };
        assert!(create_gateway(&config).is_err());
    }

    #[test]
    fn test_ollama_needs_no_key() {
        let config = EmbeddingConfig {
            provider: "ollama".to_string(),
            ..EmbeddingConfig::default()
        };
        let gw = create_gateway(&config).unwrap();
        assert_eq!(gw.model_name(), "nomic-embed-text");
    }
}
