use askama::Template;

use codecrew_common::error::error::{Error, Result};

use crate::llm::llm::LLMResult;
use crate::llm::llm_factory::LLM;
use crate::llm::prompt::Prompt;

const SYSTEM: &str =
    "You are an experienced software project planner. You analyse requirements and produce structured execution plans.";

#[derive(Template)]
#[template(path = "planner.txt")]
struct PlannerTemplate<'a> {
    task: &'a str,
    context: &'a str,
}

#[derive(Clone, Debug)]
pub struct PlannerAgent {
    llm: LLM,
}

impl PlannerAgent {
    pub fn new(llm: LLM) -> Self {
        Self { llm }
    }

    pub fn llm(&self) -> &LLM {
        &self.llm
    }

    pub async fn process(&self, input: &str, context: &str) -> Result<LLMResult> {
        let prompt = build_prompt(input, context)?;
        self.llm.generate(&prompt).await
    }

    /// Pulls the individual tasks out of a generated plan: numbered
    /// lines ("1. ...") and dash bullets ("- ...").
    pub fn extract_tasks(plan_text: &str) -> Vec<String> {
        let mut tasks = Vec::new();

        for line in plan_text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let head: String = line.chars().take(4).collect();
            let numbered = line.chars().next().is_some_and(|c| c.is_ascii_digit())
                && head.contains(". ");

            if numbered {
                if let Some(idx) = line.find('.') {
                    let task = line[idx + 1..].trim();
                    if !task.is_empty() {
                        tasks.push(task.to_string());
                    }
                }
            } else if let Some(rest) = line.strip_prefix("- ") {
                let task = rest.trim();
                if !task.is_empty() {
                    tasks.push(task.to_string());
                }
            }
        }

        tasks
    }

    /// Complexity score 1..=10. Prefers an explicit score on a line
    /// mentioning the complexity scale; otherwise falls back to banding
    /// by the number of extracted tasks.
    pub fn estimate_complexity(plan_text: &str) -> u8 {
        for line in plan_text.lines() {
            let lower = line.to_lowercase();
            if lower.contains("complexity") && lower.contains("scale") {
                if let Some(score) = first_score_1_to_10(&lower) {
                    return score;
                }
            }
        }

        match Self::extract_tasks(plan_text).len() {
            0..=3 => 2,
            4..=5 => 4,
            6..=8 => 6,
            9..=12 => 8,
            _ => 10,
        }
    }
}

fn build_prompt(input: &str, context: &str) -> Result<Prompt> {
    let body = PlannerTemplate { task: input, context }
        .render()
        .map_err(|e| Error::agent("Planner", e))?;
    Ok(Prompt::new_simple(SYSTEM.to_string(), body))
}

/// The line usually reads "... on a scale from 1 to 10: N". Prefer a
/// score after the last colon so the scale bounds are not mistaken for
/// the score; otherwise take the last in-range number on the line.
fn first_score_1_to_10(text: &str) -> Option<u8> {
    if let Some(idx) = text.rfind(':') {
        if let Some(score) = in_range_numbers(&text[idx + 1..]).next() {
            return Some(score);
        }
    }
    in_range_numbers(text).last()
}

fn in_range_numbers(text: &str) -> impl Iterator<Item = u8> + '_ {
    text.split(|c: char| !c.is_ascii_digit())
        .filter(|token| !token.is_empty())
        .filter_map(|token| token.parse::<u8>().ok())
        .filter(|n| (1..=10).contains(n))
}
