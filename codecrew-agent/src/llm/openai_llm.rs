use std::sync::Arc;
use std::time::Duration;

use futures_util::TryFutureExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use codecrew_common::error::error::{Error, Result};

use crate::llm::cache::ResponseCache;
use crate::llm::llm::{GenerateText, LLMConfiguration, LLMResult};
use crate::llm::prompt::Prompt;

const OPENAI_BASE_URL: &str = "https://api.openai.com";
const PROVIDER: &str = "gpt";

#[derive(Clone, Debug)]
pub struct OpenAILLM {
    config: LLMConfiguration,
    cache: ResponseCache,
    client: Arc<reqwest::Client>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OpenAIRequest {
    pub model: String,
    pub stream: bool,
    pub messages: Vec<OpenAIRequestMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OpenAIRequestMessage {
    pub role: String,
    pub content: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct OpenAIGenerateResponse {
    pub id: String,
    pub choices: Vec<OpenAIGenerateResponseChoice>,
    pub created: i64,
    pub model: String,
    pub system_fingerprint: Option<String>,
    pub object: String,
    pub usage: OpenAIGenerateResponseUsage,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct OpenAIGenerateResponseChoice {
    pub finish_reason: String,
    pub index: u32,
    pub message: OpenAIGenerateResponseMessage,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct OpenAIGenerateResponseMessage {
    pub content: Option<String>,
    pub role: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct OpenAIGenerateResponseUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct OpenAIErrorResponse {
    pub error: OpenAIError,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct OpenAIError {
    pub message: String,
    pub r#type: Option<String>,
    pub code: Option<String>,
}

impl OpenAILLM {
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

    fn request_for(&self, prompt: &Prompt) -> OpenAIRequest {
        let mut messages = Vec::new();
        if !prompt.system().is_empty() {
            messages.push(OpenAIRequestMessage {
                role: String::from("system"),
                content: prompt.system().to_string(),
            });
        }
        match prompt {
            Prompt::Simple { user, .. } => messages.push(OpenAIRequestMessage {
                role: String::from("user"),
                content: user.clone(),
            }),
            Prompt::Messages { messages: history, .. } => {
                for m in history.iter().filter(|m| m.role != "system") {
                    messages.push(OpenAIRequestMessage {
                        role: m.role.clone(),
                        content: m.content.clone(),
                    });
                }
            }
        }

        OpenAIRequest {
            model: self.config.model.clone(),
            stream: false,
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        }
    }
}

impl GenerateText for OpenAILLM {
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
            debug!(model = %self.config.model, "openai cache hit");
            return Ok(hit);
        }

        let base_url = self
            .config
            .base_url
            .clone()
            .unwrap_or_else(|| OPENAI_BASE_URL.to_string());
        let url_str = format!("{}{}", base_url, "/v1/chat/completions");
        let request_obj = self.request_for(prompt);

        let response = self
            .client
            .post(&url_str)
            .bearer_auth(&self.config.api_key)
            .header("Content-Type", "application/json")
            .json(&request_obj)
            .send()
            .map_err(|e| {
                error!("openai request failed: {e}");
                Error::ProviderTransportError { provider: PROVIDER.to_string(), message: e.to_string() }
            })
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OpenAIErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(Error::ProviderStatusError {
                provider: PROVIDER.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let res = response
            .json::<OpenAIGenerateResponse>()
            .map_err(|e| {
                error!("openai response decode failed: {e}");
                Error::ProviderDecodeError { provider: PROVIDER.to_string(), message: e.to_string() }
            })
            .await?;

        let result = LLMResult::from_openai(&res);
        self.cache.put(cache_key, &result);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_parse() {
        let data = r#"{
  "id": "chatcmpl-292e278f-514e-4186-9010-91ce6a14168b",
  "choices": [
    {
      "finish_reason": "stop",
      "index": 0,
      "message": {
        "content": "Hello! How can I assist you today?",
        "role": "assistant"
      }
    }
  ],
  "created": 1723733419,
  "model": "gpt-4-turbo",
  "system_fingerprint": "fp_70185065a4",
  "object": "chat.completion",
  "usage": {
    "prompt_tokens": 12,
    "completion_tokens": 10,
    "total_tokens": 22
  }
}"#;

        let p: OpenAIGenerateResponse = serde_json::from_str(data).unwrap();
        let result = LLMResult::from_openai(&p);

        assert_eq!(result.message, "Hello! How can I assist you today?");
        assert_eq!(result.model, "gpt-4-turbo");
        assert_eq!(result.total_tokens(), 22);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_parse_without_fingerprint() {
        let data = r#"{
  "id": "chatcmpl-1",
  "choices": [],
  "created": 1723733419,
  "model": "gpt-4-turbo",
  "object": "chat.completion",
  "usage": { "prompt_tokens": 0, "completion_tokens": 0, "total_tokens": 0 }
}"#;

        let p: OpenAIGenerateResponse = serde_json::from_str(data).unwrap();
        assert!(p.system_fingerprint.is_none());
        assert!(LLMResult::from_openai(&p).message.is_empty());
    }

    #[test]
    fn test_request_includes_system_and_user() {
        let config = LLMConfiguration::new("gpt-4-turbo".to_string(), "key".to_string());
        let llm = OpenAILLM::new(config, ResponseCache::disabled());
        let prompt = Prompt::new_simple("You are a coder.".to_string(), "Write it.".to_string());

        let request = llm.request_for(&prompt);
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, "system");
        assert_eq!(request.messages[1].role, "user");
        assert_eq!(request.temperature, 0.7);
    }
}
