use std::collections::HashMap;

use askama::Template;

use codecrew_common::error::error::{Error, Result};

use crate::llm::llm::LLMResult;
use crate::llm::llm_factory::LLM;
use crate::llm::prompt::Prompt;

const SYSTEM: &str =
    "You are an experienced code reviewer. You find defects and propose concrete improvements.";

pub const ISSUE_CATEGORIES: [&str; 5] =
    ["security", "performance", "bugs", "style", "architecture"];

#[derive(Template)]
#[template(path = "reviewer.txt")]
struct ReviewerTemplate<'a> {
    task: &'a str,
    context: &'a str,
}

#[derive(Clone, Debug)]
pub struct ReviewerAgent {
    llm: LLM,
}

impl ReviewerAgent {
    pub fn new(llm: LLM) -> Self {
        Self { llm }
    }

    pub fn llm(&self) -> &LLM {
        &self.llm
    }

    pub async fn process(&self, input: &str, context: &str) -> Result<LLMResult> {
        let body = ReviewerTemplate { task: input, context }
            .render()
            .map_err(|e| Error::agent("Reviewer", e))?;
        let prompt = Prompt::new_simple(SYSTEM.to_string(), body);
        self.llm.generate(&prompt).await
    }

    /// Buckets review lines by keyword. A line that names a category
    /// switches the current bucket; following lines land in it until the
    /// next switch. Headings and code fences are skipped.
    pub fn categorize_issues(review_text: &str) -> HashMap<&'static str, Vec<String>> {
        let keywords: [(&str, &[&str]); 5] = [
            ("security", &["security", "vulnerab", "injection", "xss", "csrf"]),
            ("performance", &["performance", "optimiz", "slow", "memory leak"]),
            ("bugs", &["bug", "error", "exception", "crash", "panic"]),
            ("style", &["style", "readab", "convention", "lint", "naming"]),
            ("architecture", &["architect", "design pattern", "coupling", "structure"]),
        ];

        let mut categories: HashMap<&'static str, Vec<String>> =
            ISSUE_CATEGORIES.iter().map(|c| (*c, Vec::new())).collect();
        let mut current: Option<&'static str> = None;

        for line in review_text.lines() {
            let lower = line.to_lowercase();

            for (category, words) in keywords.iter() {
                if words.iter().any(|w| lower.contains(w)) {
                    current = Some(category);
                    break;
                }
            }

            if let Some(category) = current {
                let trimmed = line.trim();
                if !trimmed.is_empty() && !trimmed.starts_with('#') && !trimmed.contains("```") {
                    categories.entry(category).or_default().push(trimmed.to_string());
                }
            }
        }

        categories
    }

    /// 10.0 minus a weighted penalty per severity mention, clamped to
    /// 0..=10.
    pub fn calculate_quality_score(review_text: &str) -> f64 {
        let severity_keywords: [(&[&str], f64); 4] = [
            (&["critical", "severe"], 2.0),
            (&["serious", "major"], 1.0),
            (&["medium", "moderate"], 0.5),
            (&["minor", "trivial", "cosmetic"], 0.1),
        ];

        let mut score = 10.0;
        for line in review_text.to_lowercase().lines() {
            for (words, penalty) in severity_keywords.iter() {
                if words.iter().any(|w| line.contains(w)) {
                    score -= penalty;
                }
            }
        }

        score.clamp(0.0, 10.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REVIEW: &str = "\
## Summary
Decent code overall.

Security issue: user input goes into the SQL string.
- fix by using bound parameters

Performance could be better here:
- the loop copies the whole buffer

## Recommendations
Nothing else.";

    #[test]
    fn test_categorize_issues() {
        let categories = ReviewerAgent::categorize_issues(REVIEW);

        let security = &categories["security"];
        assert!(security.iter().any(|l| l.contains("SQL string")));
        assert!(security.iter().any(|l| l.contains("bound parameters")));

        let performance = &categories["performance"];
        assert!(performance.iter().any(|l| l.contains("copies the whole buffer")));
    }

    #[test]
    fn test_quality_score_penalties() {
        assert_eq!(ReviewerAgent::calculate_quality_score("all good"), 10.0);

        let score = ReviewerAgent::calculate_quality_score(
            "Critical: overflow\nSerious: races\nminor: spacing",
        );
        assert!((score - 6.9).abs() < 1e-9);
    }

    #[test]
    fn test_quality_score_is_clamped() {
        let text = "critical\n".repeat(10);
        assert_eq!(ReviewerAgent::calculate_quality_score(&text), 0.0);
    }

    #[tokio::test]
    async fn test_process_with_static_llm() {
        let llm = LLM::StaticLLM(crate::llm::static_llm::StaticLLM::new("review"));
        let agent = ReviewerAgent::new(llm);
        assert_eq!(agent.process("code", "").await.unwrap().message, "review");
    }
}
