use askama::Template;
use tracing::{info, warn};

use codecrew_common::error::error::{Error, Result};

use crate::agent::coder_agent::FileBlock;
use crate::llm::llm::LLMResult;
use crate::llm::llm_factory::LLM;
use crate::llm::prompt::Prompt;

const SYSTEM: &str =
    "You are an experienced QA engineer. You write complete, runnable automated test suites.";

#[derive(Template)]
#[template(path = "tester.txt")]
struct TesterTemplate<'a> {
    task: &'a str,
    context: &'a str,
}

#[derive(Clone, Debug)]
pub struct TesterAgent {
    llm: LLM,
}

impl TesterAgent {
    pub fn new(llm: LLM) -> Self {
        Self { llm }
    }

    pub fn llm(&self) -> &LLM {
        &self.llm
    }

    pub async fn process(&self, input: &str, context: &str) -> Result<LLMResult> {
        if input.trim().is_empty() {
            warn!("tester received no code to test");
            return Err(Error::agent("Tester", "no code to write tests for"));
        }

        let body = TesterTemplate { task: input, context }
            .render()
            .map_err(|e| Error::agent("Tester", e))?;
        let prompt = Prompt::new_simple(SYSTEM.to_string(), body);
        let result = self.llm.generate(&prompt).await?;

        let files = Self::extract_test_files(&result.message);
        if files.is_empty() {
            warn!("generated test output contained no recognizable test files");
        } else {
            info!(count = files.len(), "extracted test files from generated output");
        }

        Ok(result)
    }

    /// `**File:** \`path\`` markers followed by fenced code blocks. An
    /// unterminated final block is still collected.
    pub fn extract_test_files(test_text: &str) -> Vec<FileBlock> {
        let mut files = Vec::new();
        let mut current_file: Option<String> = None;
        let mut current_code: Vec<&str> = Vec::new();
        let mut in_code_block = false;

        for line in test_text.lines() {
            let trimmed = line.trim();

            if !in_code_block {
                if let Some(name) = test_file_marker(trimmed) {
                    current_file = Some(name);
                }
            }

            if trimmed.starts_with("```") {
                if in_code_block {
                    in_code_block = false;
                    if let Some(path) = current_file.take() {
                        if !current_code.is_empty() {
                            files.push(FileBlock { path, code: current_code.join("\n") });
                        }
                    }
                    current_code.clear();
                } else {
                    in_code_block = true;
                }
            } else if in_code_block {
                current_code.push(line);
            }
        }

        if in_code_block {
            if let Some(path) = current_file.take() {
                if !current_code.is_empty() {
                    files.push(FileBlock { path, code: current_code.join("\n") });
                }
            }
        }

        files
    }

    /// Share of functions/classes from the code under test that the
    /// generated tests mention, as a percentage.
    pub fn calculate_test_coverage(code_text: &str, test_text: &str) -> f64 {
        if code_text.trim().is_empty() || test_text.trim().is_empty() {
            return 0.0;
        }

        let mut names = Vec::new();
        for line in code_text.lines() {
            if let Some(name) = declared_name(line.trim()) {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        if names.is_empty() {
            return 0.0;
        }

        let test_lower = test_text.to_lowercase();
        let covered = names
            .iter()
            .filter(|name| {
                let lower = name.to_lowercase();
                test_lower.contains(&format!("test_{lower}"))
                    || test_lower.contains(&format!("{lower}("))
                    || test_lower.contains(&format!("{lower}."))
            })
            .count();

        (covered as f64 / names.len() as f64) * 100.0
    }
}

fn test_file_marker(line: &str) -> Option<String> {
    let rest = line.strip_prefix("**File:**")?;
    let candidate = rest.trim().trim_matches('`').trim();
    let lower = candidate.to_lowercase();
    let plausible = (lower.contains("test") || lower.contains("spec") || candidate.contains('.'))
        && !candidate.starts_with('/')
        && !candidate.contains("..");
    plausible.then(|| candidate.to_string())
}

/// Declared function/class/struct name, over the handful of languages
/// the generated code tends to be in.
fn declared_name(line: &str) -> Option<String> {
    let prefixes = [
        "def ",
        "async def ",
        "function ",
        "class ",
        "fn ",
        "pub fn ",
        "struct ",
        "pub struct ",
    ];

    for prefix in prefixes {
        if let Some(rest) = line.strip_prefix(prefix) {
            let name: String = rest
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '_')
                .collect();
            if !name.is_empty() {
                return Some(name);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_OUTPUT: &str = "\
## Test strategy
One file of unit tests.

**File:** `test_main.py`
```python
def test_helper():
    assert helper() == 1
```

**File:** `tests/test_api.py`
```python
def test_api():
    assert api.get() is not None
```
";

    #[test]
    fn test_extract_test_files() {
        let files = TesterAgent::extract_test_files(TEST_OUTPUT);
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path, "test_main.py");
        assert!(files[0].code.contains("test_helper"));
        assert_eq!(files[1].path, "tests/test_api.py");
    }

    #[test]
    fn test_unterminated_block_is_collected() {
        let text = "**File:** `test_x.py`\n```python\ndef test_x():\n    pass";
        let files = TesterAgent::extract_test_files(text);
        assert_eq!(files.len(), 1);
        assert!(files[0].code.contains("def test_x"));
    }

    #[test]
    fn test_rejects_suspicious_paths() {
        assert!(test_file_marker("**File:** `/etc/passwd`").is_none());
        assert!(test_file_marker("**File:** `../escape.py`").is_none());
        assert!(test_file_marker("**File:** `test_ok.py`").is_some());
    }

    #[test]
    fn test_coverage_counts_mentions() {
        let code = "def helper():\n    pass\n\ndef unused():\n    pass\n";
        let tests = "def test_helper():\n    assert helper() == 1\n";

        let coverage = TesterAgent::calculate_test_coverage(code, tests);
        assert!((coverage - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_coverage_empty_inputs() {
        assert_eq!(TesterAgent::calculate_test_coverage("", "tests"), 0.0);
        assert_eq!(TesterAgent::calculate_test_coverage("no decls here", "tests"), 0.0);
    }

    #[tokio::test]
    async fn test_empty_input_is_an_error() {
        let llm = LLM::StaticLLM(crate::llm::static_llm::StaticLLM::new("tests"));
        let agent = TesterAgent::new(llm);
        let err = agent.process("  ", "").await.unwrap_err();
        assert_eq!(err.as_ref(), "AgentError");
    }
}
