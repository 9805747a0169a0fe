use std::sync::Arc;
use std::time::Duration;

use futures_util::TryFutureExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use codecrew_common::error::error::{Error, Result};

use crate::llm::cache::ResponseCache;
use crate::llm::llm::{GenerateText, LLMConfiguration, LLMResult};
use crate::llm::prompt::Prompt;

const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const PROVIDER: &str = "claude";

#[derive(Clone, Debug)]
pub struct AnthropicLLM {
    config: LLMConfiguration,
    cache: ResponseCache,
    client: Arc<reqwest::Client>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnthropicRequest {
    pub model: String,
    pub system: String,
    pub messages: Vec<AnthropicMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnthropicMessage {
    pub role: Role,
    pub content: Vec<AnthropicMessageContent>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnthropicMessageContent {
    #[serde(rename = "type")]
    pub type_: String,
    pub text: String,
}

impl AnthropicMessageContent {
    pub fn text(text: String) -> Self {
        Self { type_: String::from("text"), text }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "assistant")]
    Assistant,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnthropicGenerateResponse {
    pub content: Vec<Content>,
    pub model: String,
    pub stop_reason: Option<String>,
    pub usage: Usage,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Content {
    pub text: Option<String>,
    pub r#type: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnthropicErrorResponse {
    pub r#type: String,
    pub error: AnthropicError,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnthropicError {
    pub r#type: String,
    pub message: String,
}

impl AnthropicLLM {
    pub fn new(config: LLMConfiguration, cache: ResponseCache) -> Self {
        let client = Arc::new(
            reqwest::ClientBuilder::new()
                .connect_timeout(Duration::from_secs(60))
                .build()
                .expect("reqwest client"),
        );

        Self { config, cache, client }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub fn is_configured(&self) -> bool {
        !self.config.api_key.is_empty()
    }

    pub fn with_sampling(&self, temperature: f32, max_tokens: u32) -> Self {
        let mut clone = self.clone();
        clone.config.temperature = temperature;
        clone.config.max_tokens = max_tokens;
        clone
    }

    pub fn with_model(&self, model: &str) -> Self {
        let mut clone = self.clone();
        clone.config.model = model.to_string();
        clone
    }

    pub fn with_api_key(&self, api_key: &str) -> Self {
        let mut clone = self.clone();
        clone.config.api_key = api_key.to_string();
        clone
    }

    fn request_for(&self, prompt: &Prompt) -> AnthropicRequest {
        let messages = match prompt {
            Prompt::Simple { user, .. } => vec![AnthropicMessage {
                role: Role::User,
                content: vec![AnthropicMessageContent::text(user.clone())],
            }],
            Prompt::Messages { messages, .. } => messages
                .iter()
                .filter(|m| m.role != "system")
                .map(|m| AnthropicMessage {
                    role: if m.role == "assistant" { Role::Assistant } else { Role::User },
                    content: vec![AnthropicMessageContent::text(m.content.clone())],
                })
                .collect(),
        };

        AnthropicRequest {
            model: self.config.model.clone(),
            system: prompt.system().to_string(),
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            stop_sequences: None,
            stream: Some(false),
        }
    }
}

impl GenerateText for AnthropicLLM {
    async fn generate(&self, prompt: &Prompt) -> Result<LLMResult> {
        if !self.is_configured() {
            return Err(Error::ProviderNotConfigured { provider: PROVIDER.to_string() });
        }

        let cache_key = ResponseCache::key(
            &self.config.model,
            self.config.temperature,
            self.config.max_tokens,
            prompt,
        );
        if let Some(hit) = self.cache.get(&cache_key) {
            debug!(model = %self.config.model, "anthropic cache hit");
            return Ok(hit);
        }

        let base_url = self
            .config
            .base_url
            .clone()
            .unwrap_or_else(|| ANTHROPIC_BASE_URL.to_string());
        let url_str = format!("{}{}", base_url, "/v1/messages");
        let request_obj = self.request_for(prompt);

        let response = self
            .client
            .post(&url_str)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&request_obj)
            .send()
            .map_err(|e| {
                error!("anthropic request failed: {e}");
                Error::ProviderTransportError { provider: PROVIDER.to_string(), message: e.to_string() }
            })
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<AnthropicErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(Error::ProviderStatusError {
                provider: PROVIDER.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let res = response
            .json::<AnthropicGenerateResponse>()
            .map_err(|e| {
                error!("anthropic response decode failed: {e}");
                Error::ProviderDecodeError { provider: PROVIDER.to_string(), message: e.to_string() }
            })
            .await?;

        let result = LLMResult::from_anthropic(&res);
        self.cache.put(cache_key, &result);
        Ok(result)
    }
}
