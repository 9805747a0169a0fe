use std::collections::HashMap;
use std::time::Instant;

use metrics::{counter, histogram};
use serde::Serialize;
use tracing::{info, warn};

use codecrew_agent::agent::agent::{Agent, AgentKind};
use codecrew_agent::agent::agent_factory::AgentFactory;
use codecrew_agent::agent::coder_agent::CoderAgent;
use codecrew_agent::llm::llm_factory::{LLMFactory, LLM, PROVIDER_CLAUDE, PROVIDER_GPT};
use codecrew_common::config::config::Config;
use codecrew_common::error::error::{Error, Result};
use codecrew_context::optimizer::optimizer::ChatMessage;
use codecrew_context::storage::storage::ContextStorage;
use codecrew_context::tokens::token_counter::TokenCounter;

/// Token budget for the optimized context handed to every agent.
const CONTEXT_BUDGET_TOKENS: u32 = 2000;

/// Coordinates the agent pipeline: which agents run, in which order,
/// with which providers, and what gets remembered afterwards.
pub struct Orchestrator {
    storage: ContextStorage,
    factory: AgentFactory,
    providers: HashMap<String, LLM>,
    agent_providers: HashMap<AgentKind, String>,
    agents: HashMap<AgentKind, Agent>,
    active_agents: HashMap<AgentKind, bool>,
    messages: Vec<HistoryMessage>,
    token_usage: TokenUsage,
}

#[derive(Clone, Debug, Serialize)]
pub struct HistoryMessage {
    pub role: String,
    pub content: String,
    pub tokens: u32,
}

impl HistoryMessage {
    pub fn to_chat(&self) -> ChatMessage {
        ChatMessage { role: self.role.clone(), content: self.content.clone() }
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct TokenUsage {
    pub total_tokens: u64,
    pub cost: f64,
}

impl TokenUsage {
    pub fn formatted_cost(&self) -> String {
        TokenCounter::format_cost(self.cost)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct AgentRunResult {
    pub agent: AgentKind,
    pub provider: String,
    pub model: String,
    pub output: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub duration_ms: u64,
}

impl AgentRunResult {
    pub fn total_tokens(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct WorkflowRun {
    pub results: Vec<AgentRunResult>,
    pub combined: String,
    pub token_usage: TokenUsage,
}

impl Orchestrator {
    /// Builds the full agent set against the configured providers.
    /// Agents default to Claude when an Anthropic key is present, GPT
    /// otherwise.
    pub fn new(config: Config, storage: ContextStorage) -> Result<Self> {
        let llm_factory = LLMFactory::new(config.clone());
        let mut providers = HashMap::new();
        providers.insert(PROVIDER_CLAUDE.to_string(), llm_factory.instance(PROVIDER_CLAUDE)?);
        providers.insert(PROVIDER_GPT.to_string(), llm_factory.instance(PROVIDER_GPT)?);

        let default_provider = if config.anthropic_configured() || !config.openai_configured() {
            PROVIDER_CLAUDE
        } else {
            PROVIDER_GPT
        };

        Self::build(config, storage, providers, default_provider)
    }

    /// Every agent talks to the one given client. Used by tests and dry
    /// runs.
    pub fn with_provider(config: Config, storage: ContextStorage, llm: LLM) -> Result<Self> {
        let mut providers = HashMap::new();
        providers.insert(PROVIDER_CLAUDE.to_string(), llm.clone());
        providers.insert(PROVIDER_GPT.to_string(), llm);
        Self::build(config, storage, providers, PROVIDER_CLAUDE)
    }

    fn build(
        config: Config,
        storage: ContextStorage,
        providers: HashMap<String, LLM>,
        default_provider: &str,
    ) -> Result<Self> {
        let factory = AgentFactory::new(config);
        let default_llm = providers
            .get(default_provider)
            .cloned()
            .ok_or_else(|| Error::UnknownProvider { name: default_provider.to_string() })?;

        let mut agents = HashMap::new();
        let mut agent_providers = HashMap::new();
        let mut active_agents = HashMap::new();
        for kind in AgentKind::PIPELINE {
            agents.insert(kind, factory.agent(kind, default_llm.clone()));
            agent_providers.insert(kind, default_provider.to_string());
            active_agents.insert(kind, factory.enabled(kind));
        }

        Ok(Self {
            storage,
            factory,
            providers,
            agent_providers,
            agents,
            active_agents,
            messages: Vec::new(),
            token_usage: TokenUsage::default(),
        })
    }

    pub fn storage(&self) -> &ContextStorage {
        &self.storage
    }

    pub fn configure_agents(&mut self, active_agents: HashMap<AgentKind, bool>) {
        self.active_agents = active_agents;
    }

    pub fn active_agents_map(&self) -> &HashMap<AgentKind, bool> {
        &self.active_agents
    }

    /// Active agents in canonical pipeline order. Roles disabled in the
    /// runtime config never run, whatever the active map says.
    pub fn get_active_agents(&self) -> Vec<AgentKind> {
        AgentKind::PIPELINE
            .into_iter()
            .filter(|kind| self.active_agents.get(kind).copied().unwrap_or(false))
            .filter(|kind| self.factory.enabled(*kind))
            .collect()
    }

    /// Moves one agent to a different provider. Returns false for an
    /// unknown provider or agent.
    pub fn set_agent_provider(&mut self, kind: AgentKind, provider: &str) -> bool {
        let Some(llm) = self.providers.get(provider).cloned() else {
            return false;
        };
        self.agents.insert(kind, self.factory.agent(kind, llm));
        self.agent_providers.insert(kind, provider.to_string());
        true
    }

    pub fn set_provider_key(&mut self, provider: &str, api_key: &str) -> bool {
        self.update_provider(provider, |llm| llm.with_api_key(api_key))
    }

    pub fn set_provider_model(&mut self, provider: &str, model: &str) -> bool {
        self.update_provider(provider, |llm| llm.with_model(model))
    }

    fn update_provider(&mut self, provider: &str, f: impl Fn(&LLM) -> LLM) -> bool {
        let Some(llm) = self.providers.get(provider) else {
            return false;
        };
        let updated = f(llm);
        self.providers.insert(provider.to_string(), updated.clone());

        // Rebuild the agents already bound to this provider.
        for kind in AgentKind::PIPELINE {
            if self.agent_providers.get(&kind).map(String::as_str) == Some(provider) {
                self.agents.insert(kind, self.factory.agent(kind, updated.clone()));
            }
        }
        true
    }

    pub fn get_messages(&self) -> &[HistoryMessage] {
        &self.messages
    }

    pub fn get_history(&self) -> Vec<ChatMessage> {
        self.messages.iter().map(HistoryMessage::to_chat).collect()
    }

    pub fn get_token_usage(&self) -> TokenUsage {
        self.token_usage
    }

    /// Runs the active agents over the input, each one fed the previous
    /// agent's output, and records the interaction.
    pub async fn process_request(&mut self, user_input: &str) -> Result<WorkflowRun> {
        let user_input = user_input.trim();
        if user_input.is_empty() {
            return Err(Error::EmptyInput);
        }
        let active = self.get_active_agents();
        if active.is_empty() {
            return Err(Error::NoActiveAgents);
        }

        let context = self.storage.get_optimized_context(user_input, CONTEXT_BUDGET_TOKENS)?;
        self.push_message("user", user_input, TokenCounter::estimate_tokens(user_input));

        let mut results: Vec<AgentRunResult> = Vec::new();
        let mut current_input = user_input.to_string();

        for kind in active {
            let agent = self
                .agents
                .get(&kind)
                .ok_or_else(|| Error::UnknownAgent { name: kind.to_string() })?;
            let provider = self
                .agent_providers
                .get(&kind)
                .cloned()
                .unwrap_or_else(|| PROVIDER_CLAUDE.to_string());

            info!(agent = %kind, provider = %provider, "running agent");
            let started = Instant::now();
            let result = agent.process(&current_input, &context).await?;
            let duration_ms = started.elapsed().as_millis() as u64;

            let output_tokens = if result.output_tokens > 0 {
                result.output_tokens
            } else {
                TokenCounter::estimate_tokens(&result.message)
            };

            counter!("codecrew_agent_tokens_total")
                .increment(u64::from(result.input_tokens + output_tokens));
            histogram!("codecrew_agent_duration_ms").record(duration_ms as f64);
            info!(
                agent = %kind,
                model = %result.model,
                tokens_in = result.input_tokens,
                tokens_out = output_tokens,
                duration_ms,
                "agent finished"
            );

            current_input = result.message.clone();
            results.push(AgentRunResult {
                agent: kind,
                provider,
                model: result.model,
                output: result.message,
                input_tokens: result.input_tokens,
                output_tokens,
                duration_ms,
            });
        }

        let combined = combine_results(user_input, &results);
        let combined_tokens = TokenCounter::estimate_tokens(&combined);
        self.push_message("assistant", &combined, combined_tokens);

        let mut run_tokens: u64 = 0;
        for result in &results {
            run_tokens += u64::from(result.total_tokens());
            self.token_usage.cost +=
                TokenCounter::estimate_cost(&result.model, result.input_tokens, result.output_tokens);
        }
        self.token_usage.total_tokens += run_tokens;

        let metadata = serde_json::json!({
            "agents": results.iter().map(|r| r.agent.to_string()).collect::<Vec<_>>(),
        });
        let interaction_id = self.storage.save_interaction(
            user_input,
            &combined,
            Some(run_tokens.min(u64::from(u32::MAX)) as u32),
            Some(metadata),
        )?;

        self.save_coder_snippets(interaction_id, &results);

        Ok(WorkflowRun { results, combined, token_usage: self.token_usage })
    }

    fn save_coder_snippets(&self, interaction_id: i64, results: &[AgentRunResult]) {
        let Some(coder) = results.iter().find(|r| r.agent == AgentKind::Coder) else {
            return;
        };
        for block in CoderAgent::extract_file_blocks(&coder.output) {
            let language = CoderAgent::detect_language(&block.path);
            if let Err(e) =
                self.storage.save_code_snippet(interaction_id, language, &block.code, Some(&block.path))
            {
                warn!(path = %block.path, "failed to save code snippet: {e}");
            }
        }
    }

    fn push_message(&mut self, role: &str, content: &str, tokens: u32) {
        self.messages.push(HistoryMessage {
            role: role.to_string(),
            content: content.to_string(),
            tokens,
        });
    }
}

fn combine_results(user_input: &str, results: &[AgentRunResult]) -> String {
    let mut out = format!("# Request\n\n{user_input}\n");
    for result in results {
        out.push_str(&format!("\n## {} ({})\n\n{}\n", result.agent, result.model, result.output));
    }
    out
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use codecrew_agent::llm::static_llm::StaticLLM;

    fn config(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_vars(&vars).unwrap()
    }

    fn orchestrator_with(script: Vec<&str>, pairs: &[(&str, &str)]) -> Orchestrator {
        let llm = LLM::StaticLLM(StaticLLM::with_script(
            script.into_iter().map(String::from).collect(),
        ));
        let storage = ContextStorage::in_memory().unwrap();
        Orchestrator::with_provider(config(pairs), storage, llm).unwrap()
    }

    #[tokio::test]
    async fn test_empty_input_is_rejected() {
        let mut orchestrator = orchestrator_with(vec![], &[]);
        let err = orchestrator.process_request("   ").await.unwrap_err();
        assert_eq!(err.as_ref(), "EmptyInput");
        assert!(orchestrator.get_messages().is_empty());
    }

    #[tokio::test]
    async fn test_no_active_agents_is_rejected() {
        let mut orchestrator = orchestrator_with(vec![], &[]);
        orchestrator.configure_agents(HashMap::new());
        let err = orchestrator.process_request("task").await.unwrap_err();
        assert_eq!(err.as_ref(), "NoActiveAgents");
    }

    #[test]
    fn test_disabled_roles_never_run() {
        let orchestrator =
            orchestrator_with(vec![], &[("ENABLE_REVIEWER", "false"), ("ENABLE_TESTER", "false")]);
        let active = orchestrator.get_active_agents();
        assert_eq!(
            active,
            vec![AgentKind::Planner, AgentKind::Architect, AgentKind::Coder, AgentKind::Documenter]
        );
    }

    #[tokio::test]
    async fn test_pipeline_feeds_outputs_forward() {
        let mut orchestrator = orchestrator_with(
            vec!["the plan", "the architecture", "the code", "the review", "the tests", "the docs"],
            &[],
        );

        let run = orchestrator.process_request("build a url shortener").await.unwrap();

        assert_eq!(run.results.len(), 6);
        assert_eq!(run.results[0].agent, AgentKind::Planner);
        assert_eq!(run.results[0].output, "the plan");
        assert_eq!(run.results[5].agent, AgentKind::Documenter);
        assert_eq!(run.results[5].output, "the docs");

        assert!(run.combined.contains("# Request"));
        assert!(run.combined.contains("## Planner"));
        assert!(run.combined.contains("the architecture"));

        // user + assistant in history.
        assert_eq!(orchestrator.get_messages().len(), 2);
        assert_eq!(orchestrator.get_messages()[0].role, "user");
        assert!(orchestrator.get_token_usage().total_tokens > 0);

        // The interaction was persisted.
        let recent = orchestrator.storage().get_recent_interactions(1).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].user_input, "build a url shortener");
        assert!(recent[0].metadata.as_deref().unwrap().contains("Planner"));
    }

    #[tokio::test]
    async fn test_coder_file_blocks_become_snippets() {
        let coder_output = "File: `main.py`\n```python\nprint('hi')\n```\n";
        let mut orchestrator = orchestrator_with(vec!["plan", "arch", coder_output], &[]);

        let mut active = HashMap::new();
        active.insert(AgentKind::Planner, true);
        active.insert(AgentKind::Architect, true);
        active.insert(AgentKind::Coder, true);
        orchestrator.configure_agents(active);

        let run = orchestrator.process_request("write a script").await.unwrap();
        assert_eq!(run.results.len(), 3);
        assert!(run.results[2].output.contains("main.py"));
    }

    #[tokio::test]
    async fn test_workflow_failure_surfaces() {
        // The tester rejects empty input; feed it an empty chain by
        // scripting empty outputs.
        let mut orchestrator = orchestrator_with(vec![""], &[]);
        let mut active = HashMap::new();
        active.insert(AgentKind::Coder, true);
        active.insert(AgentKind::Tester, true);
        orchestrator.configure_agents(active);

        let err = orchestrator.process_request("task").await.unwrap_err();
        assert_eq!(err.as_ref(), "AgentError");
    }

    #[test]
    fn test_set_agent_provider() {
        let mut orchestrator = orchestrator_with(vec![], &[]);
        assert!(orchestrator.set_agent_provider(AgentKind::Coder, PROVIDER_GPT));
        assert!(!orchestrator.set_agent_provider(AgentKind::Coder, "unknown"));
    }

    #[test]
    fn test_set_provider_key_and_model() {
        let storage = ContextStorage::in_memory().unwrap();
        let mut orchestrator = Orchestrator::new(config(&[]), storage).unwrap();

        assert!(orchestrator.set_provider_key(PROVIDER_GPT, "sk-test"));
        assert!(orchestrator.set_provider_model(PROVIDER_GPT, "gpt-4"));
        assert!(!orchestrator.set_provider_key("unknown", "sk-test"));
        assert_eq!(orchestrator.providers[PROVIDER_GPT].model(), "gpt-4");
        assert!(orchestrator.providers[PROVIDER_GPT].is_configured());
    }
}
