use askama::Template;

use codecrew_common::error::error::{Error, Result};

use crate::llm::llm::LLMResult;
use crate::llm::llm_factory::LLM;
use crate::llm::prompt::Prompt;

const SYSTEM: &str =
    "You are an experienced software architect. You design high-level component architectures from task descriptions and plans.";

#[derive(Template)]
#[template(path = "architect.txt")]
struct ArchitectTemplate<'a> {
    task: &'a str,
    context: &'a str,
}

#[derive(Clone, Debug)]
pub struct ArchitectAgent {
    llm: LLM,
}

impl ArchitectAgent {
    pub fn new(llm: LLM) -> Self {
        Self { llm }
    }

    pub fn llm(&self) -> &LLM {
        &self.llm
    }

    pub async fn process(&self, input: &str, context: &str) -> Result<LLMResult> {
        let body = ArchitectTemplate { task: input, context }
            .render()
            .map_err(|e| Error::agent("Architect", e))?;
        let prompt = Prompt::new_simple(SYSTEM.to_string(), body);
        self.llm.generate(&prompt).await
    }

    /// Bulleted entries after a heading that mentions components; the
    /// part before a colon is taken as the component name.
    pub fn extract_components(architecture_text: &str) -> Vec<String> {
        let mut components = Vec::new();
        let mut component_section = false;

        for line in architecture_text.lines() {
            let line = line.trim();

            if line.to_lowercase().contains("component") {
                component_section = true;
                continue;
            }

            if component_section {
                let item = line
                    .strip_prefix("- ")
                    .or_else(|| line.strip_prefix("* "));
                if let Some(item) = item {
                    let name = match item.split_once(':') {
                        Some((name, _)) => name.trim(),
                        None => item.trim(),
                    };
                    if !name.is_empty() {
                        components.push(name.to_string());
                    }
                }
            }
        }

        components
    }
}
