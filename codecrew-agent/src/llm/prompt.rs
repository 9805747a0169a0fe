use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Prompt {
    Simple { system: String, user: String },
    Messages { system: String, messages: Vec<PromptMessage> },
}

impl Prompt {
    pub fn new_simple(system: String, user: String) -> Self {
        Self::Simple { system, user }
    }

    pub fn new_messages(system: String, messages: Vec<PromptMessage>) -> Self {
        Self::Messages { system, messages }
    }

    pub fn system(&self) -> &str {
        match self {
            Prompt::Simple { system, .. } => system,
            Prompt::Messages { system, .. } => system,
        }
    }

    /// Flattened single-turn rendering. Vendors that take a message list
    /// get the structured form instead; this is for cache keys and for
    /// collapsing a `Messages` prompt into one user turn.
    pub fn user_text(&self) -> String {
        match self {
            Prompt::Simple { user, .. } => user.clone(),
            Prompt::Messages { messages, .. } => messages
                .iter()
                .map(|m| format!("{}: {}", m.role, m.content))
                .collect::<Vec<_>>()
                .join("\n\n"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".to_string(), content: content.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_text_flattens_messages() {
        let prompt = Prompt::new_messages(
            "sys".to_string(),
            vec![PromptMessage::user("hello"), PromptMessage::assistant("hi")],
        );
        assert_eq!(prompt.user_text(), "user: hello\n\nassistant: hi");
        assert_eq!(prompt.system(), "sys");
    }
}
