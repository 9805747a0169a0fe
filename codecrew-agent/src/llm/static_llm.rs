use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use codecrew_common::error::error::Result;

use crate::llm::llm::{estimate_tokens, GenerateText, LLMResult};
use crate::llm::prompt::Prompt;

/// Offline client that answers from a fixed message or a scripted
/// sequence. Used by the orchestrator and workflow tests, and usable as
/// a dry-run provider.
#[derive(Clone, Debug)]
pub struct StaticLLM {
    model: String,
    fallback: String,
    script: Arc<Mutex<VecDeque<String>>>,
}

impl StaticLLM {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            model: String::from("static"),
            fallback: message.into(),
            script: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Scripted responses are returned in order; once exhausted the
    /// fallback message is used.
    pub fn with_script(messages: Vec<String>) -> Self {
        Self {
            model: String::from("static"),
            fallback: String::from("Static!"),
            script: Arc::new(Mutex::new(messages.into())),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl GenerateText for StaticLLM {
    async fn generate(&self, prompt: &Prompt) -> Result<LLMResult> {
        let message = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        let input_tokens = estimate_tokens(&prompt.user_text());
        let mut result = LLMResult::new(message, self.model.clone());
        result.input_tokens = input_tokens;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_then_fallback() {
        let llm = StaticLLM::with_script(vec!["one".to_string(), "two".to_string()]);
        let prompt = Prompt::new_simple("s".to_string(), "12345678".to_string());

        assert_eq!(llm.generate(&prompt).await.unwrap().message, "one");
        assert_eq!(llm.generate(&prompt).await.unwrap().message, "two");
        assert_eq!(llm.generate(&prompt).await.unwrap().message, "Static!");
    }

    #[tokio::test]
    async fn test_token_estimates() {
        let llm = StaticLLM::new("fixed reply");
        let prompt = Prompt::new_simple("s".to_string(), "12345678".to_string());

        let result = llm.generate(&prompt).await.unwrap();
        assert_eq!(result.input_tokens, 2);
        assert!(result.output_tokens > 0);
    }
}
