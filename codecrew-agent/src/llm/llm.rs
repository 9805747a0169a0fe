use serde::{Deserialize, Serialize};

use crate::llm::anthropic_llm::AnthropicGenerateResponse;
use crate::llm::openai_llm::OpenAIGenerateResponse;
use crate::llm::prompt::Prompt;

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

/// Per-client settings. Credentials and model come from the runtime
/// config; temperature and max_tokens carry the generation defaults and
/// can be overridden per call site with `LLM::with_sampling`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LLMConfiguration {
    pub model: String,
    pub api_key: String,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl LLMConfiguration {
    pub fn new(model: String, api_key: String) -> Self {
        Self {
            model,
            api_key,
            base_url: None,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LLMResult {
    pub message: String,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LLMResult {
    pub fn new(message: String, model: String) -> Self {
        let output_tokens = estimate_tokens(&message);
        Self { message, model, input_tokens: 0, output_tokens }
    }

    pub fn from_anthropic(res: &AnthropicGenerateResponse) -> Self {
        let message = res
            .content
            .first()
            .and_then(|c| c.text.clone())
            .unwrap_or_default();
        Self {
            message,
            model: res.model.clone(),
            input_tokens: res.usage.input_tokens,
            output_tokens: res.usage.output_tokens,
        }
    }

    pub fn from_openai(res: &OpenAIGenerateResponse) -> Self {
        let message = res
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();
        Self {
            message,
            model: res.model.clone(),
            input_tokens: res.usage.prompt_tokens,
            output_tokens: res.usage.completion_tokens,
        }
    }

    pub fn total_tokens(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

pub trait GenerateText {
    async fn generate(&self, prompt: &Prompt) -> codecrew_common::error::error::Result<LLMResult>;
}

/// Rough heuristic shared by every vendor: one token per four characters.
pub fn estimate_tokens(text: &str) -> u32 {
    (text.chars().count() / 4) as u32
}
