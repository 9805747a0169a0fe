use askama::Template;
use pulldown_cmark::{html, Parser};

use codecrew_common::error::error::{Error, Result};

use crate::llm::llm::LLMResult;
use crate::llm::llm_factory::LLM;
use crate::llm::prompt::Prompt;

const SYSTEM: &str =
    "You are an experienced technical writer. You produce clear, complete documentation for code and systems.";

#[derive(Template)]
#[template(path = "documenter.txt")]
struct DocumenterTemplate<'a> {
    task: &'a str,
    context: &'a str,
}

#[derive(Clone, Debug)]
pub struct DocumenterAgent {
    llm: LLM,
}

impl DocumenterAgent {
    pub fn new(llm: LLM) -> Self {
        Self { llm }
    }

    pub fn llm(&self) -> &LLM {
        &self.llm
    }

    pub async fn process(&self, input: &str, context: &str) -> Result<LLMResult> {
        let body = DocumenterTemplate { task: input, context }
            .render()
            .map_err(|e| Error::agent("Documenter", e))?;
        let prompt = Prompt::new_simple(SYSTEM.to_string(), body);
        self.llm.generate(&prompt).await
    }

    /// The section under a heading that mentions "API", up to the next
    /// heading of the same or a higher level.
    pub fn extract_api_docs(doc_text: &str) -> String {
        let mut api_doc = String::new();
        let mut api_level: Option<usize> = None;

        for line in doc_text.lines() {
            if line.starts_with('#') {
                let level = line.chars().take_while(|c| *c == '#').count();
                let is_api_heading = line.contains("API");

                match api_level {
                    Some(open_level) if !is_api_heading && level <= open_level => {
                        api_level = None;
                    }
                    _ => {
                        if is_api_heading {
                            api_level = Some(level);
                        }
                    }
                }
            }

            if api_level.is_some() {
                api_doc.push_str(line);
                api_doc.push('\n');
            }
        }

        api_doc
    }

    /// The section under a user-guide-like heading, up to the next
    /// heading of the same or a higher level.
    pub fn extract_user_guide(doc_text: &str) -> String {
        const GUIDE_KEYWORDS: [&str; 3] = ["user guide", "manual", "guide"];

        let mut user_guide = String::new();
        let mut guide_level: Option<usize> = None;

        for line in doc_text.lines() {
            if line.starts_with('#') {
                let level = line.chars().take_while(|c| *c == '#').count();
                let lower = line.to_lowercase();
                let is_guide_heading = GUIDE_KEYWORDS.iter().any(|k| lower.contains(k));

                match guide_level {
                    Some(open_level) if !is_guide_heading && level <= open_level => {
                        guide_level = None;
                    }
                    _ => {
                        if is_guide_heading {
                            guide_level = Some(level);
                        }
                    }
                }
            }

            if guide_level.is_some() {
                user_guide.push_str(line);
                user_guide.push('\n');
            }
        }

        user_guide
    }

    /// Markdown documentation rendered into a self-contained HTML page.
    pub fn generate_html_docs(markdown_docs: &str) -> String {
        let parser = Parser::new(markdown_docs);
        let mut body = String::new();
        html::push_html(&mut body, parser);

        format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Project documentation</title>
<style>
  body {{ font-family: Arial, sans-serif; line-height: 1.6; max-width: 900px; margin: 0 auto; padding: 20px; }}
  h1, h2, h3, h4 {{ color: #333; margin-top: 30px; }}
  code {{ background-color: #f4f4f4; padding: 2px 5px; border-radius: 3px; }}
  pre {{ background-color: #f4f4f4; padding: 15px; border-radius: 5px; overflow-x: auto; }}
  table {{ border-collapse: collapse; width: 100%; margin: 20px 0; }}
  th, td {{ border: 1px solid #ddd; padding: 8px; text-align: left; }}
</style>
</head>
<body>
{body}
</body>
</html>
"#
        )
    }
}
