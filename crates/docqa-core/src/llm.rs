//! Large-language-model gateway trait.

use async_trait::async_trait;

use crate::error::Result;

/// A chat-style completion service.
///
/// Implementations own their timeouts and retries; a timeout surfaces as
/// [`Error::Remote`](crate::Error::Remote) like any other call failure.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Model identifier (e.g. `"gemini-2.0-flash"`).
    fn model_name(&self) -> &str;

    /// Run one completion and return the raw response text.
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}
