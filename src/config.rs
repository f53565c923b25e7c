//! TOML configuration.
//!
//! Read once at startup by [`load_config`] and passed explicitly to every
//! component constructor; there is no process-wide settings singleton.
//! API keys never live in the file: gateways read `GEMINI_API_KEY` /
//! `OPENAI_API_KEY` from the environment when they are constructed.
//!
//! ```toml
//! [storage]
//! root = "./storage"
//!
//! [server]
//! bind = "127.0.0.1:8000"
//!
//! [embedding]
//! provider = "gemini"
//! model = "gemini-embedding-001"
//!
//! [llm]
//! provider = "gemini"
//! model = "gemini-2.0-flash"
//! ```

use anyhow::{bail, Context, Result};
use docqa_core::embedding::DistanceMetric;
use docqa_core::models::RagConfig;
use docqa_core::summarize::SummaryParams;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub rag: RagDefaults,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
        }
    }
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("./storage")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            api_prefix: default_api_prefix(),
            max_upload_mb: default_max_upload_mb(),
            cors_origins: default_cors_origins(),
        }
    }
}

impl ServerConfig {
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}
fn default_api_prefix() -> String {
    "/api".to_string()
}
fn default_max_upload_mb() -> usize {
    20
}
fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "http://localhost:3000".to_string(),
    ]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractConfig {
    #[serde(default = "default_max_pages")]
    pub default_max_pages: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            default_max_pages: default_max_pages(),
        }
    }
}

fn default_max_pages() -> usize {
    30
}

/// Index-build chunking defaults, overridable per request.
#[derive(Debug, Deserialize, Clone)]
pub struct RagDefaults {
    #[serde(default = "default_rag_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_rag_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_rag_max_chunks")]
    pub max_chunks: usize,
}

impl Default for RagDefaults {
    fn default() -> Self {
        Self {
            chunk_size: default_rag_chunk_size(),
            chunk_overlap: default_rag_chunk_overlap(),
            max_chunks: default_rag_max_chunks(),
        }
    }
}

impl RagDefaults {
    pub fn to_rag_config(&self) -> RagConfig {
        RagConfig {
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            max_chunks: self.max_chunks,
        }
    }
}

fn default_rag_chunk_size() -> usize {
    900
}
fn default_rag_chunk_overlap() -> usize {
    150
}
fn default_rag_max_chunks() -> usize {
    2000
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Hits farther than this are discarded. Calibrate per embedding model.
    #[serde(default = "default_distance_threshold")]
    pub distance_threshold: f32,
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,
    #[serde(default = "default_metric")]
    pub metric: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            distance_threshold: default_distance_threshold(),
            default_top_k: default_top_k(),
            metric: default_metric(),
        }
    }
}

impl RetrievalConfig {
    pub fn distance_metric(&self) -> DistanceMetric {
        DistanceMetric::parse(&self.metric).unwrap_or_default()
    }
}

fn default_distance_threshold() -> f32 {
    1.2
}
fn default_top_k() -> usize {
    4
}
fn default_metric() -> String {
    "l2".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SummaryConfig {
    #[serde(default = "default_summary_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_summary_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_summary_max_chunks")]
    pub max_chunks: usize,
    #[serde(default = "default_summary_concurrency")]
    pub concurrency: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_summary_chunk_size(),
            chunk_overlap: default_summary_chunk_overlap(),
            max_chunks: default_summary_max_chunks(),
            concurrency: default_summary_concurrency(),
        }
    }
}

impl SummaryConfig {
    pub fn to_params(&self) -> SummaryParams {
        SummaryParams {
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            max_chunks: self.max_chunks,
            concurrency: self.concurrency,
        }
    }
}

fn default_summary_chunk_size() -> usize {
    6000
}
fn default_summary_chunk_overlap() -> usize {
    400
}
fn default_summary_max_chunks() -> usize {
    12
}
fn default_summary_concurrency() -> usize {
    4
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL override (Ollama, or an OpenAI-compatible gateway).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            url: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            url: None,
            temperature: default_temperature(),
            max_retries: default_max_retries(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

impl LlmConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_llm_timeout_secs() -> u64 {
    120
}
fn default_temperature() -> f32 {
    0.2
}

/// Log levels: a default plus per-module overrides. `RUST_LOG` wins.
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub default: String,
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: BTreeMap::new(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if let Err(e) = config.rag.to_rag_config().validate() {
        bail!("[rag] {}", e);
    }

    let summary = &config.summary;
    if summary.chunk_size == 0 || summary.chunk_overlap >= summary.chunk_size {
        bail!("summary.chunk_overlap must be smaller than summary.chunk_size (> 0)");
    }
    if summary.max_chunks == 0 {
        bail!("summary.max_chunks must be >= 1");
    }
    if summary.concurrency == 0 {
        bail!("summary.concurrency must be >= 1");
    }

    let threshold = config.retrieval.distance_threshold;
    if threshold.is_nan() || threshold <= 0.0 {
        bail!("retrieval.distance_threshold must be > 0");
    }
    if !(1..=10).contains(&config.retrieval.default_top_k) {
        bail!("retrieval.default_top_k must be between 1 and 10");
    }
    if DistanceMetric::parse(&config.retrieval.metric).is_none() {
        bail!(
            "Unknown retrieval.metric: '{}'. Must be l2 or cosine.",
            config.retrieval.metric
        );
    }

    if !(1..=200).contains(&config.extract.default_max_pages) {
        bail!("extract.default_max_pages must be between 1 and 200");
    }
    if config.server.max_upload_mb == 0 {
        bail!("server.max_upload_mb must be >= 1");
    }
    if !config.server.api_prefix.starts_with('/') {
        bail!("server.api_prefix must start with '/'");
    }

    match config.embedding.provider.as_str() {
        "disabled" | "gemini" | "openai" | "ollama" | "local" => {}
        other => bail!(
            "Unknown embedding provider: '{}'. Must be disabled, gemini, openai, ollama, or local.",
            other
        ),
    }
    if config.embedding.batch_size == 0 {
        bail!("embedding.batch_size must be >= 1");
    }
    if config.embedding.dims == Some(0) {
        bail!("embedding.dims must be > 0 when set");
    }

    match config.llm.provider.as_str() {
        "disabled" | "gemini" | "openai" | "ollama" => {}
        other => bail!(
            "Unknown llm provider: '{}'. Must be disabled, gemini, openai, or ollama.",
            other
        ),
    }
    if !(0.0..=2.0).contains(&config.llm.temperature) {
        bail!("llm.temperature must be in [0.0, 2.0]");
    }

    Ok(())
}
