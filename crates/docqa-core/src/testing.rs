//! Deterministic in-process gateways for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::embedding::EmbeddingGateway;
use crate::error::{Error, Result};
use crate::llm::LlmGateway;

pub const DIMS: usize = 32;

/// Bag-of-words embedder: each lowercase token bumps one hashed bucket,
/// and the result is L2-normalized. Identical texts embed identically.
pub struct HashEmbedder {
    model: String,
    pinned: HashMap<String, Vec<f32>>,
    pub calls: AtomicUsize,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self::with_model("hash-test")
    }

    pub fn with_model(model: &str) -> Self {
        Self {
            model: model.to_string(),
            pinned: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Force `text` to embed as `vector`.
    pub fn pin(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.pinned.insert(text.to_string(), vector);
        self
    }
}

fn bucket(token: &str) -> usize {
    let mut h: u64 = 0xcbf29ce484222325;
    for b in token.bytes() {
        h ^= b as u64;
        h = h.wrapping_mul(0x100000001b3);
    }
    (h % DIMS as u64) as usize
}

#[async_trait]
impl EmbeddingGateway for HashEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        // Pinned vectors may have any length.
        0
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(v) = self.pinned.get(text) {
            return Ok(v.clone());
        }
        let mut v = vec![0.0f32; DIMS];
        for token in text.split_whitespace() {
            v[bucket(&token.to_lowercase())] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(v)
    }
}

/// Records every completion request and answers with a canned string.
pub struct RecordingLlm {
    pub calls: Mutex<Vec<(String, String)>>,
    fail_when: Option<String>,
}

impl RecordingLlm {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_when: None,
        }
    }

    /// Fail any call whose user prompt contains `marker`.
    pub fn failing_on(marker: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_when: Some(marker.to_string()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmGateway for RecordingLlm {
    fn model_name(&self) -> &str {
        "recording-test"
    }

    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((system_prompt.to_string(), user_prompt.to_string()));
            calls.len()
        };
        if let Some(marker) = &self.fail_when {
            if user_prompt.contains(marker.as_str()) {
                return Err(Error::Remote("scripted failure".to_string()));
            }
        }
        Ok(format!("  response {}  \n", n))
    }
}
