use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::info;

use codecrew_common::config::config::Config;
use codecrew_common::error::error::{Error, Result};

use crate::llm::anthropic_llm::AnthropicLLM;
use crate::llm::cache::ResponseCache;
use crate::llm::llm::{GenerateText, LLMConfiguration, LLMResult};
use crate::llm::openai_llm::OpenAILLM;
use crate::llm::prompt::Prompt;
use crate::llm::static_llm::StaticLLM;

pub const PROVIDER_CLAUDE: &str = "claude";
pub const PROVIDER_GPT: &str = "gpt";
pub const PROVIDER_STATIC: &str = "static";

#[derive(Clone, Debug)]
pub enum LLM {
    AnthropicLLM(AnthropicLLM),
    OpenAILLM(OpenAILLM),
    StaticLLM(StaticLLM),
}

impl LLM {
    pub async fn generate(&self, prompt: &Prompt) -> Result<LLMResult> {
        match self {
            LLM::AnthropicLLM(llm) => llm.generate(prompt).await,
            LLM::OpenAILLM(llm) => llm.generate(prompt).await,
            LLM::StaticLLM(llm) => llm.generate(prompt).await,
        }
    }

    pub fn model(&self) -> &str {
        match self {
            LLM::AnthropicLLM(llm) => llm.model(),
            LLM::OpenAILLM(llm) => llm.model(),
            LLM::StaticLLM(llm) => llm.model(),
        }
    }

    pub fn is_configured(&self) -> bool {
        match self {
            LLM::AnthropicLLM(llm) => llm.is_configured(),
            LLM::OpenAILLM(llm) => llm.is_configured(),
            LLM::StaticLLM(_) => true,
        }
    }

    /// Clone of this client with different generation settings; the
    /// static stub has none to adjust.
    pub fn with_sampling(&self, temperature: f32, max_tokens: u32) -> LLM {
        match self {
            LLM::AnthropicLLM(llm) => LLM::AnthropicLLM(llm.with_sampling(temperature, max_tokens)),
            LLM::OpenAILLM(llm) => LLM::OpenAILLM(llm.with_sampling(temperature, max_tokens)),
            LLM::StaticLLM(llm) => LLM::StaticLLM(llm.clone()),
        }
    }

    pub fn with_model(&self, model: &str) -> LLM {
        match self {
            LLM::AnthropicLLM(llm) => LLM::AnthropicLLM(llm.with_model(model)),
            LLM::OpenAILLM(llm) => LLM::OpenAILLM(llm.with_model(model)),
            LLM::StaticLLM(llm) => LLM::StaticLLM(llm.clone()),
        }
    }

    pub fn with_api_key(&self, api_key: &str) -> LLM {
        match self {
            LLM::AnthropicLLM(llm) => LLM::AnthropicLLM(llm.with_api_key(api_key)),
            LLM::OpenAILLM(llm) => LLM::OpenAILLM(llm.with_api_key(api_key)),
            LLM::StaticLLM(llm) => LLM::StaticLLM(llm.clone()),
        }
    }
}

pub struct LLMFactory {
    config: Config,
    cache: ResponseCache,
    registry: Arc<Mutex<LLMRegistry>>,
}

struct LLMRegistry {
    items: HashMap<String, LLM>,
}

impl LLMRegistry {
    fn new() -> Self {
        LLMRegistry { items: HashMap::new() }
    }

    fn register(&mut self, key: String, item: LLM) {
        self.items.insert(key, item);
    }

    fn get(&self, key: &str) -> Option<&LLM> {
        self.items.get(key)
    }
}

impl LLMFactory {
    pub fn new(config: Config) -> Self {
        let cache = ResponseCache::from_config(&config.cache);
        Self {
            config,
            cache,
            registry: Arc::new(Mutex::new(LLMRegistry::new())),
        }
    }

    /// Clients are built once per provider key and shared afterwards so
    /// that the response cache and connection pool are reused.
    pub fn instance(&self, key: &str) -> Result<LLM> {
        let mut registry = self.registry.lock().unwrap();

        if let Some(llm) = registry.get(key) {
            return Ok(llm.clone());
        }

        let llm = match key {
            PROVIDER_CLAUDE => {
                info!(model = %self.config.default_claude_model, "building anthropic client");
                LLM::AnthropicLLM(AnthropicLLM::new(
                    LLMConfiguration::new(
                        self.config.default_claude_model.clone(),
                        self.config.anthropic_api_key.clone(),
                    ),
                    self.cache.clone(),
                ))
            }
            PROVIDER_GPT => {
                info!(model = %self.config.default_gpt_model, "building openai client");
                LLM::OpenAILLM(OpenAILLM::new(
                    LLMConfiguration::new(
                        self.config.default_gpt_model.clone(),
                        self.config.openai_api_key.clone(),
                    ),
                    self.cache.clone(),
                ))
            }
            PROVIDER_STATIC => LLM::StaticLLM(StaticLLM::new("Static!")),
            _ => return Err(Error::UnknownProvider { name: key.to_string() }),
        };

        registry.register(key.to_string(), llm.clone());
        Ok(llm)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn test_config() -> Config {
        let vars: HashMap<String, String> = [
            ("ANTHROPIC_API_KEY", "sk-ant-test"),
            ("OPENAI_API_KEY", ""),
            ("DEFAULT_CLAUDE_MODEL", "claude-3-7-sonnet-20250219"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Config::from_vars(&vars).unwrap()
    }

    #[test]
    fn test_known_providers() {
        let factory = LLMFactory::new(test_config());

        let claude = factory.instance(PROVIDER_CLAUDE).unwrap();
        assert_eq!(claude.model(), "claude-3-7-sonnet-20250219");
        assert!(claude.is_configured());

        let gpt = factory.instance(PROVIDER_GPT).unwrap();
        assert_eq!(gpt.model(), "gpt-4-turbo");
        assert!(!gpt.is_configured());
    }

    #[test]
    fn test_unknown_provider() {
        let factory = LLMFactory::new(test_config());
        let err = factory.instance("cohere").unwrap_err();
        assert_eq!(err.as_ref(), "UnknownProvider");
    }

    #[tokio::test]
    async fn test_static_instance_generates() {
        tracing_subscriber::fmt::try_init().ok();

        let factory = LLMFactory::new(test_config());
        let llm = factory.instance(PROVIDER_STATIC).unwrap();
        let result = llm
            .generate(&Prompt::new_simple(
                String::from("You are a helpful assistant."),
                String::from("Tell me what your job is?"),
            ))
            .await
            .unwrap();
        assert_eq!(result.message, "Static!");
    }
}
