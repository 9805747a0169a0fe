use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;
use tracing::{error, info, warn};

use codecrew_common::error::error::{Error, Result};

use crate::agent::coder_agent::{CoderAgent, FileBlock};

/// Writes generated code out as a project tree under a projects root.
/// Unlike the LLM-backed roles this agent is purely mechanical.
#[derive(Clone, Debug)]
pub struct ProjectManagerAgent {
    projects_root: PathBuf,
}

#[derive(Clone, Debug, Serialize)]
pub struct ProjectReport {
    pub project_name: String,
    pub root: PathBuf,
    pub created: Vec<String>,
    pub errors: Vec<String>,
}

impl ProjectManagerAgent {
    pub fn new(projects_root: impl Into<PathBuf>) -> Self {
        Self { projects_root: projects_root.into() }
    }

    pub fn projects_root(&self) -> &Path {
        &self.projects_root
    }

    /// Extracts file blocks from generated output and writes them under
    /// `<projects_root>/<project_name>/`. Unsafe paths are reported and
    /// skipped, never written.
    pub fn materialize(&self, project_name: &str, generated: &str) -> Result<ProjectReport> {
        if !is_safe_project_name(project_name) {
            return Err(Error::ProjectError {
                message: format!("invalid project name {project_name:?}"),
            });
        }

        let mut blocks = CoderAgent::extract_file_blocks(generated);
        if blocks.is_empty() {
            blocks = extract_unnamed_blocks(generated);
        }
        if blocks.is_empty() {
            return Err(Error::ProjectError {
                message: "no file blocks found in the generated output".to_string(),
            });
        }

        let root = self.projects_root.join(project_name);
        fs::create_dir_all(&root)
            .map_err(|e| Error::ProjectError { message: format!("create {root:?}: {e}") })?;

        let mut created = Vec::new();
        let mut errors = Vec::new();

        for block in &blocks {
            if !is_safe_relative_path(&block.path) {
                warn!(path = %block.path, "skipping unsafe file path");
                errors.push(format!("unsafe path skipped: {}", block.path));
                continue;
            }

            let target = root.join(&block.path);
            if let Some(parent) = target.parent() {
                if let Err(e) = fs::create_dir_all(parent) {
                    errors.push(format!("create dir for {}: {e}", block.path));
                    continue;
                }
            }

            match fs::write(&target, &block.code) {
                Ok(()) => {
                    info!(path = %block.path, "wrote project file");
                    created.push(block.path.clone());
                }
                Err(e) => {
                    error!(path = %block.path, "write failed: {e}");
                    errors.push(format!("write {}: {e}", block.path));
                }
            }
        }

        let has_readme = created.iter().any(|p| p.eq_ignore_ascii_case("readme.md"));
        if !has_readme {
            let readme = render_readme(project_name, &created);
            if fs::write(root.join("README.md"), readme).is_ok() {
                created.push("README.md".to_string());
            }
        }

        let has_gitignore = created.iter().any(|p| p == ".gitignore");
        if !has_gitignore {
            let gitignore = render_gitignore(&created);
            if fs::write(root.join(".gitignore"), gitignore).is_ok() {
                created.push(".gitignore".to_string());
            }
        }

        Ok(ProjectReport { project_name: project_name.to_string(), root, created, errors })
    }
}

/// Fallback for output without filename markers: every fenced block
/// becomes `file_<n>.<ext>` based on the fence language tag.
fn extract_unnamed_blocks(text: &str) -> Vec<FileBlock> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut language = String::new();
    let mut in_code_block = false;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("```") {
            if in_code_block {
                in_code_block = false;
                if !current.is_empty() {
                    let ext = extension_for(&language);
                    blocks.push(FileBlock {
                        path: format!("file_{}.{}", blocks.len() + 1, ext),
                        code: current.join("\n"),
                    });
                }
                current.clear();
            } else {
                in_code_block = true;
                language = trimmed.trim_start_matches("```").trim().to_lowercase();
            }
        } else if in_code_block {
            current.push(line);
        }
    }

    blocks
}

fn extension_for(language: &str) -> &'static str {
    match language {
        "python" | "py" => "py",
        "javascript" | "js" => "js",
        "typescript" | "ts" => "ts",
        "rust" | "rs" => "rs",
        "go" => "go",
        "java" => "java",
        "html" => "html",
        "css" => "css",
        "sql" => "sql",
        "bash" | "sh" | "shell" => "sh",
        "json" => "json",
        "yaml" | "yml" => "yml",
        "toml" => "toml",
        "markdown" | "md" => "md",
        _ => "txt",
    }
}

fn is_safe_project_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
}

fn is_safe_relative_path(path: &str) -> bool {
    if path.is_empty() || path.starts_with('/') || path.starts_with('\\') || path.contains(':') {
        return false;
    }
    !Path::new(path)
        .components()
        .any(|c| matches!(c, std::path::Component::ParentDir))
}

fn render_readme(project_name: &str, created: &[String]) -> String {
    let mut files = String::new();
    for path in created {
        files.push_str(&format!("- `{path}`\n"));
    }
    format!(
        "# {project_name}\n\nGenerated on {}.\n\n## Files\n\n{files}",
        Local::now().format("%Y-%m-%d %H:%M")
    )
}

fn render_gitignore(created: &[String]) -> String {
    let mut lines = vec!["*.log".to_string(), ".env".to_string()];
    if created.iter().any(|p| p.ends_with(".py")) {
        lines.extend(["__pycache__/".to_string(), "*.pyc".to_string(), ".venv/".to_string()]);
    }
    if created.iter().any(|p| p.ends_with(".js") || p.ends_with(".ts")) {
        lines.extend(["node_modules/".to_string(), "dist/".to_string()]);
    }
    if created.iter().any(|p| p.ends_with(".rs")) {
        lines.push("target/".to_string());
    }
    let mut body = lines.join("\n");
    body.push('\n');
    body
}
