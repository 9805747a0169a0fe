use askama::Template;

use codecrew_common::error::error::{Error, Result};

use crate::llm::llm::LLMResult;
use crate::llm::llm_factory::LLM;
use crate::llm::prompt::Prompt;

const SYSTEM: &str =
    "You are an experienced software developer. You implement code from architectures and requirements.";

#[derive(Template)]
#[template(path = "coder.txt")]
struct CoderTemplate<'a> {
    task: &'a str,
    context: &'a str,
}

/// A file extracted from generated output: path plus code body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileBlock {
    pub path: String,
    pub code: String,
}

#[derive(Clone, Debug)]
pub struct CoderAgent {
    llm: LLM,
}

impl CoderAgent {
    pub fn new(llm: LLM) -> Self {
        Self { llm }
    }

    pub fn llm(&self) -> &LLM {
        &self.llm
    }

    pub async fn process(&self, input: &str, context: &str) -> Result<LLMResult> {
        let body = CoderTemplate { task: input, context }
            .render()
            .map_err(|e| Error::agent("Coder", e))?;
        let prompt = Prompt::new_simple(SYSTEM.to_string(), body);
        self.llm.generate(&prompt).await
    }

    /// Pairs filename markers ("File: x", "module: y", or a name on the
    /// opening fence) with the fenced code blocks that follow them.
    pub fn extract_file_blocks(code_text: &str) -> Vec<FileBlock> {
        let mut blocks = Vec::new();
        let mut current_file: Option<String> = None;
        let mut current_code: Vec<&str> = Vec::new();
        let mut in_code_block = false;

        for line in code_text.lines() {
            if !in_code_block && !line.trim_start().starts_with("```") {
                if let Some(name) = file_marker(line) {
                    current_file = Some(name);
                }
            }

            if line.trim_start().starts_with("```") {
                if in_code_block {
                    in_code_block = false;
                    if let Some(path) = current_file.take() {
                        if !current_code.is_empty() {
                            blocks.push(FileBlock { path, code: current_code.join("\n") });
                        }
                    }
                    current_code.clear();
                } else {
                    in_code_block = true;
                    // A filename can also sit on the opening fence:
                    // "```rust:src/main.rs".
                    let fence = line.trim_start().trim_start_matches("```");
                    if let Some((_, name)) = fence.split_once(':') {
                        let name = name.trim();
                        if looks_like_filename(name) {
                            current_file = Some(name.to_string());
                        }
                    }
                }
            } else if in_code_block {
                current_code.push(line);
            }
        }

        blocks
    }

    pub fn detect_language(filename: &str) -> &'static str {
        let extensions: &[(&str, &str)] = &[
            (".py", "python"),
            (".js", "javascript"),
            (".ts", "typescript"),
            (".html", "html"),
            (".css", "css"),
            (".java", "java"),
            (".c", "c"),
            (".cpp", "cpp"),
            (".cs", "csharp"),
            (".php", "php"),
            (".rb", "ruby"),
            (".go", "go"),
            (".rs", "rust"),
            (".swift", "swift"),
            (".kt", "kotlin"),
            (".sh", "bash"),
            (".sql", "sql"),
            (".json", "json"),
            (".xml", "xml"),
            (".md", "markdown"),
            (".yml", "yaml"),
            (".yaml", "yaml"),
            (".toml", "toml"),
        ];

        let lower = filename.to_lowercase();
        for (ext, lang) in extensions {
            if lower.ends_with(ext) {
                return lang;
            }
        }
        "plaintext"
    }
}

fn file_marker(line: &str) -> Option<String> {
    let lower = line.to_lowercase();
    for indicator in ["file:", "module:"] {
        if let Some(idx) = lower.find(indicator) {
            let candidate = line[idx + indicator.len()..]
                .trim()
                .trim_matches(|c| c == '`' || c == '"' || c == '*' || c == ':')
                .trim();
            if looks_like_filename(candidate) {
                return Some(candidate.to_string());
            }
        }
    }
    None
}

fn looks_like_filename(candidate: &str) -> bool {
    !candidate.is_empty() && candidate.contains('.') && !candidate.contains(' ')
}

#[cfg(test)]
mod tests {
    use super::*;

    const OUTPUT: &str = "\
Here is the implementation.

File: `main.py`
```python
print(\"hi\")
```

module: util/helpers.py
```python
def helper():
    return 1
```

```text
no filename, dropped
```
";

    #[test]
    fn test_extract_file_blocks() {
        let blocks = CoderAgent::extract_file_blocks(OUTPUT);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].path, "main.py");
        assert_eq!(blocks[0].code, "print(\"hi\")");
        assert_eq!(blocks[1].path, "util/helpers.py");
        assert!(blocks[1].code.contains("def helper"));
    }

    #[test]
    fn test_filename_on_fence() {
        let text = "```rust:src/lib.rs\npub fn f() {}\n```\n";
        let blocks = CoderAgent::extract_file_blocks(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].path, "src/lib.rs");
    }

    #[test]
    fn test_detect_language() {
        assert_eq!(CoderAgent::detect_language("main.rs"), "rust");
        assert_eq!(CoderAgent::detect_language("app.PY"), "python");
        assert_eq!(CoderAgent::detect_language("Cargo.toml"), "toml");
        assert_eq!(CoderAgent::detect_language("LICENSE"), "plaintext");
    }

    #[tokio::test]
    async fn test_process_with_static_llm() {
        let llm = LLM::StaticLLM(crate::llm::static_llm::StaticLLM::new("code"));
        let agent = CoderAgent::new(llm);
        assert_eq!(agent.process("arch", "").await.unwrap().message, "code");
    }
}
