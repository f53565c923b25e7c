//! Context-grounded answer synthesis.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::llm::LlmGateway;

const SYSTEM_PROMPT: &str = "You answer questions using ONLY the provided context. \
     If the answer is not in the context, say you don't know and suggest what to search for. \
     Never invent facts that the context does not support.";

pub struct AnswerSynthesizer {
    llm: Arc<dyn LlmGateway>,
}

impl AnswerSynthesizer {
    pub fn new(llm: Arc<dyn LlmGateway>) -> Self {
        Self { llm }
    }

    /// One LLM call; the response is returned trimmed and otherwise verbatim.
    pub async fn synthesize(&self, question: &str, context: &str) -> Result<String> {
        if context.trim().is_empty() {
            return Err(Error::validation("context must not be empty"));
        }
        let prompt = format!(
            "Question:\n{}\n\nContext:\n{}\n\n\
             Answer in a clear, helpful way. If relevant, include bullet points.",
            question.trim(),
            context
        );
        let answer = self.llm.complete(SYSTEM_PROMPT, &prompt).await?;
        Ok(answer.trim().to_string())
    }
}
