//! Chat-completion gateways behind [`LlmGateway`].
//!
//! Same provider set and retry policy as the embedding gateways; see
//! [`crate::remote`]. Models default per provider when not configured.

use std::sync::Arc;

use async_trait::async_trait;
use docqa_core::llm::LlmGateway;
use docqa_core::{Error, Result};
use serde_json::{json, Value};

use crate::config::LlmConfig;
use crate::remote::{build_client, require_env_key, JsonPost};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const OPENAI_BASE_URL: &str = "https://api.openai.com";
const OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Create the gateway named by `config.provider`.
pub fn create_llm(config: &LlmConfig) -> Result<Arc<dyn LlmGateway>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledLlm)),
        "gemini" => Ok(Arc::new(GeminiLlm::new(config)?)),
        "openai" => Ok(Arc::new(OpenAILlm::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaLlm::new(config)?)),
        other => Err(Error::validation(format!("Unknown llm provider: {}", other))),
    }
}

/// Used when `llm.provider = "disabled"`; every call fails with `Auth`.
pub struct DisabledLlm;

#[async_trait]
impl LlmGateway for DisabledLlm {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn complete(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String> {
        Err(Error::Auth(
            "llm provider is disabled; configure [llm] provider and credentials".to_string(),
        ))
    }
}

pub struct GeminiLlm {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    max_retries: u32,
}

impl GeminiLlm {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = require_env_key("GEMINI_API_KEY")?;
        let model = config
            .model
            .clone()
            .unwrap_or_else(|| "gemini-2.0-flash".to_string());
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            api_key,
            model: model.trim_start_matches("models/").to_string(),
            base_url: config
                .url
                .clone()
                .unwrap_or_else(|| GEMINI_BASE_URL.to_string()),
            temperature: config.temperature,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl LlmGateway for GeminiLlm {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let post = JsonPost {
            client: &self.client,
            service: "Gemini",
            url: format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url.trim_end_matches('/'),
                self.model
            ),
            bearer: None,
            headers: vec![("x-goog-api-key", self.api_key.clone())],
            max_retries: self.max_retries,
        };
        let body = json!({
            "systemInstruction": { "parts": [{ "text": system_prompt }] },
            "contents": [{ "role": "user", "parts": [{ "text": user_prompt }] }],
            "generationConfig": { "temperature": self.temperature },
        });
        parse_gemini_completion(&post.send(&body).await?)
    }
}

/// Concatenate `candidates[0].content.parts[].text`.
pub fn parse_gemini_completion(json: &Value) -> Result<String> {
    let parts = json
        .pointer("/candidates/0/content/parts")
        .and_then(|p| p.as_array())
        .ok_or_else(|| {
            let reason = json
                .pointer("/promptFeedback/blockReason")
                .and_then(|r| r.as_str())
                .unwrap_or("no candidates");
            Error::Remote(format!("Gemini returned no content ({})", reason))
        })?;
    Ok(parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect::<Vec<_>>()
        .join(""))
}

pub struct OpenAILlm {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    max_retries: u32,
}

impl OpenAILlm {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = require_env_key("OPENAI_API_KEY")?;
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            api_key,
            model: config.model.clone().unwrap_or_else(|| "gpt-4o-mini".to_string()),
            base_url: config
                .url
                .clone()
                .unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
            temperature: config.temperature,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl LlmGateway for OpenAILlm {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let post = JsonPost {
            client: &self.client,
            service: "OpenAI",
            url: format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/')),
            bearer: Some(&self.api_key),
            headers: Vec::new(),
            max_retries: self.max_retries,
        };
        let body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_prompt }
            ],
        });
        let json = post.send(&body).await?;
        json.pointer("/choices/0/message/content")
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| Error::Remote("Invalid OpenAI response: missing message content".to_string()))
    }
}

pub struct OllamaLlm {
    client: reqwest::Client,
    model: String,
    url: String,
    temperature: f32,
    max_retries: u32,
}

impl OllamaLlm {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            model: config.model.clone().unwrap_or_else(|| "llama3.1".to_string()),
            url: config
                .url
                .clone()
                .unwrap_or_else(|| OLLAMA_BASE_URL.to_string()),
            temperature: config.temperature,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl LlmGateway for OllamaLlm {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let post = JsonPost {
            client: &self.client,
            service: "Ollama",
            url: format!("{}/api/chat", self.url.trim_end_matches('/')),
            bearer: None,
            headers: Vec::new(),
            max_retries: self.max_retries,
        };
        let body = json!({
            "model": self.model,
            "stream": false,
            "options": { "temperature": self.temperature },
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_prompt }
            ],
        });
        let json = post.send(&body).await?;
        json.pointer("/message/content")
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| Error::Remote("Invalid Ollama response: missing message content".to_string()))
    }
}
