use serde::{Deserialize, Serialize};
use tracing::debug;

use codecrew_agent::llm::llm_factory::LLM;
use codecrew_agent::llm::prompt::Prompt;
use codecrew_common::error::error::Result;

use crate::tokens::token_counter::TokenCounter;

const SUMMARY_SYSTEM: &str = "You compress conversation histories without losing important details.";

/// Past the point where message-dropping alone keeps enough signal, the
/// history is pre-trimmed before being summarized.
const LLM_PRETRIM_THRESHOLD: usize = 20;

/// Messages kept verbatim at the tail after an LLM summary.
const TAIL_KEEP: usize = 3;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".to_string(), content: content.into() }
    }

    pub fn is_system(&self) -> bool {
        self.role == "system"
    }
}

/// Shrinks message histories to a token budget, either by dropping old
/// messages or by asking a model for a summary.
#[derive(Clone, Debug, Default)]
pub struct ContextOptimizer {
    llm: Option<LLM>,
}

impl ContextOptimizer {
    pub fn new() -> Self {
        Self { llm: None }
    }

    pub fn with_llm(llm: LLM) -> Self {
        Self { llm: Some(llm) }
    }

    pub async fn compress_history(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
    ) -> Result<Vec<ChatMessage>> {
        if messages.is_empty() {
            return Ok(Vec::new());
        }

        match &self.llm {
            Some(llm) if llm.is_configured() => {
                self.compress_with_llm(llm, messages, max_tokens).await
            }
            _ => Ok(Self::compress_simple(messages, max_tokens)),
        }
    }

    /// Drops the oldest non-system messages until the estimate fits the
    /// budget.
    pub fn compress_simple(messages: &[ChatMessage], max_tokens: u32) -> Vec<ChatMessage> {
        let mut compressed: Vec<ChatMessage> = messages.to_vec();
        let mut total: i64 = compressed
            .iter()
            .map(|m| i64::from(TokenCounter::estimate_tokens(&m.content)))
            .sum();

        while total > i64::from(max_tokens) && compressed.len() > 1 {
            let Some(pos) = compressed.iter().position(|m| !m.is_system()) else {
                break;
            };
            let removed = compressed.remove(pos);
            total -= i64::from(TokenCounter::estimate_tokens(&removed.content));
        }

        compressed
    }

    async fn compress_with_llm(
        &self,
        llm: &LLM,
        messages: &[ChatMessage],
        max_tokens: u32,
    ) -> Result<Vec<ChatMessage>> {
        let messages: Vec<ChatMessage> = if messages.len() > LLM_PRETRIM_THRESHOLD {
            // Leave headroom so the summary still sees enough history.
            Self::compress_simple(messages, max_tokens * 2)
        } else {
            messages.to_vec()
        };

        let history_text = messages
            .iter()
            .filter(|m| !m.is_system())
            .map(|m| format!("{}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n\n");

        let user = format!(
            "Below is a dialogue history. Compress it while keeping every important detail.\n\n{history_text}\n\nShort summary of the important points:"
        );
        let prompt = Prompt::new_simple(SUMMARY_SYSTEM.to_string(), user);

        let summary = llm
            .with_sampling(0.3, max_tokens / 2)
            .generate(&prompt)
            .await?;
        debug!(tokens = summary.output_tokens, "history summarized");

        let mut result: Vec<ChatMessage> =
            messages.iter().filter(|m| m.is_system()).cloned().collect();
        result.push(ChatMessage::system(format!(
            "Summary of the previous interactions:\n{}",
            summary.message
        )));

        let tail_start = messages.len().saturating_sub(TAIL_KEEP);
        result.extend(messages[tail_start..].iter().cloned());

        Ok(result)
    }

    /// Keyword-scored top-N selection of context items for a query.
    pub fn filter_relevant_context(
        query: &str,
        context_items: &[String],
        max_items: usize,
    ) -> Vec<String> {
        let query_words: Vec<String> =
            query.to_lowercase().split_whitespace().map(|w| w.to_string()).collect();
        if query_words.is_empty() {
            return context_items.iter().take(max_items).cloned().collect();
        }

        let mut scored: Vec<(f64, &String)> = context_items
            .iter()
            .map(|item| {
                let lower = item.to_lowercase();
                let matching = query_words.iter().filter(|w| lower.contains(w.as_str())).count();
                (matching as f64 / query_words.len() as f64, item)
            })
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        scored.into_iter().take(max_items).map(|(_, item)| item.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codecrew_agent::llm::static_llm::StaticLLM;

    fn long_message(role: &str, len: usize) -> ChatMessage {
        ChatMessage { role: role.to_string(), content: "x".repeat(len) }
    }

    #[test]
    fn test_compress_simple_drops_oldest_non_system() {
        let messages = vec![
            ChatMessage::system("rules"),
            long_message("user", 400),
            long_message("assistant", 400),
            ChatMessage::user("latest"),
        ];

        // 400 chars = 100 tokens each; a budget of 60 forces both long
        // messages out.
        let compressed = ContextOptimizer::compress_simple(&messages, 60);
        assert_eq!(compressed.len(), 2);
        assert!(compressed[0].is_system());
        assert_eq!(compressed[1].content, "latest");
    }

    #[test]
    fn test_compress_simple_keeps_fitting_history() {
        let messages = vec![ChatMessage::user("short")];
        let compressed = ContextOptimizer::compress_simple(&messages, 1000);
        assert_eq!(compressed, messages);
    }

    #[tokio::test]
    async fn test_compress_with_llm_inserts_summary() {
        let llm = LLM::StaticLLM(StaticLLM::new("the summary"));
        let optimizer = ContextOptimizer::with_llm(llm);

        let messages = vec![
            ChatMessage::system("rules"),
            ChatMessage::user("first"),
            ChatMessage::assistant("second"),
            ChatMessage::user("third"),
            ChatMessage::assistant("fourth"),
        ];

        let compressed = optimizer.compress_history(&messages, 1000).await.unwrap();

        assert!(compressed[0].is_system());
        assert!(compressed[1].content.contains("the summary"));
        // Tail of three verbatim messages.
        let tail: Vec<&str> =
            compressed[2..].iter().map(|m| m.content.as_str()).collect();
        assert_eq!(tail, vec!["second", "third", "fourth"]);
    }

    #[tokio::test]
    async fn test_compress_without_llm_falls_back() {
        let optimizer = ContextOptimizer::new();
        let messages = vec![ChatMessage::user("only")];
        let compressed = optimizer.compress_history(&messages, 10).await.unwrap();
        assert_eq!(compressed, messages);
    }

    #[test]
    fn test_filter_relevant_context() {
        let items = vec![
            "notes about parsers and tokens".to_string(),
            "cooking recipes".to_string(),
            "parser error handling".to_string(),
        ];

        let filtered = ContextOptimizer::filter_relevant_context("parser tokens", &items, 2);
        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().all(|i| i.contains("parser")));
    }
}
