use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::Local;
use rusqlite::{params, Connection};
use serde::Serialize;
use tracing::debug;

use codecrew_common::error::error::{Error, Result};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS interactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    user_input TEXT NOT NULL,
    system_response TEXT NOT NULL,
    tokens_used INTEGER,
    metadata TEXT
);

CREATE TABLE IF NOT EXISTS code_snippets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    interaction_id INTEGER,
    language TEXT NOT NULL,
    code TEXT NOT NULL,
    description TEXT,
    FOREIGN KEY (interaction_id) REFERENCES interactions (id)
);
";

/// Minimum keyword-overlap score for an interaction to be considered
/// relevant to the current request.
const RELEVANCE_THRESHOLD: f64 = 0.1;

/// How many recent interactions are scored when building the optimized
/// context.
const SCORING_WINDOW: usize = 10;

/// SQLite-backed store for past interactions and the code they
/// produced.
#[derive(Clone)]
pub struct ContextStorage {
    db_path: PathBuf,
    conn: Arc<Mutex<Connection>>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Interaction {
    pub id: i64,
    pub timestamp: String,
    pub user_input: String,
    pub system_response: String,
    pub tokens_used: Option<i64>,
    pub metadata: Option<String>,
}

impl ContextStorage {
    /// Opens (and initializes) the database, creating the parent
    /// directory when needed.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(Error::storage)?;
            }
        }

        let conn = Connection::open(&db_path).map_err(Error::storage)?;
        conn.execute_batch(SCHEMA).map_err(Error::storage)?;
        debug!(path = %db_path.display(), "context storage opened");

        Ok(Self { db_path, conn: Arc::new(Mutex::new(conn)) })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(Error::storage)?;
        conn.execute_batch(SCHEMA).map_err(Error::storage)?;
        Ok(Self { db_path: PathBuf::from(":memory:"), conn: Arc::new(Mutex::new(conn)) })
    }

    pub fn db_path(&self) -> &PathBuf {
        &self.db_path
    }

    /// When no token count is given, a whitespace word count of both
    /// sides stands in.
    pub fn save_interaction(
        &self,
        user_input: &str,
        system_response: &str,
        tokens_used: Option<u32>,
        metadata: Option<serde_json::Value>,
    ) -> Result<i64> {
        let tokens = tokens_used.map(i64::from).unwrap_or_else(|| {
            (user_input.split_whitespace().count() + system_response.split_whitespace().count())
                as i64
        });
        let metadata_json =
            serde_json::to_string(&metadata.unwrap_or_else(|| serde_json::json!({})))
                .map_err(Error::storage)?;

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO interactions (timestamp, user_input, system_response, tokens_used, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                Local::now().to_rfc3339(),
                user_input,
                system_response,
                tokens,
                metadata_json
            ],
        )
        .map_err(Error::storage)?;

        Ok(conn.last_insert_rowid())
    }

    pub fn save_code_snippet(
        &self,
        interaction_id: i64,
        language: &str,
        code: &str,
        description: Option<&str>,
    ) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO code_snippets (interaction_id, language, code, description)
             VALUES (?1, ?2, ?3, ?4)",
            params![interaction_id, language, code, description],
        )
        .map_err(Error::storage)?;

        Ok(conn.last_insert_rowid())
    }

    pub fn get_recent_interactions(&self, limit: usize) -> Result<Vec<Interaction>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, timestamp, user_input, system_response, tokens_used, metadata
                 FROM interactions ORDER BY id DESC LIMIT ?1",
            )
            .map_err(Error::storage)?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok(Interaction {
                    id: row.get(0)?,
                    timestamp: row.get(1)?,
                    user_input: row.get(2)?,
                    system_response: row.get(3)?,
                    tokens_used: row.get(4)?,
                    metadata: row.get(5)?,
                })
            })
            .map_err(Error::storage)?;

        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Error::storage)
    }

    /// Relevance-ranked slice of recent history that fits into a token
    /// budget. Interactions are scored by keyword overlap with the
    /// current request; low scorers are dropped, the rest fill the
    /// budget in score order.
    pub fn get_optimized_context(&self, current_input: &str, max_tokens: u32) -> Result<String> {
        let recent = self.get_recent_interactions(SCORING_WINDOW)?;
        if recent.is_empty() {
            return Ok(String::new());
        }

        let keywords: HashSet<String> = current_input
            .to_lowercase()
            .split_whitespace()
            .map(|w| w.to_string())
            .collect();
        if keywords.is_empty() {
            return Ok(String::new());
        }

        let mut scored: Vec<(f64, &Interaction)> = recent
            .iter()
            .map(|interaction| {
                let haystack = interaction.user_input.to_lowercase();
                let matching = keywords.iter().filter(|k| haystack.contains(k.as_str())).count();
                (matching as f64 / keywords.len() as f64, interaction)
            })
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut parts = Vec::new();
        let mut current_tokens: i64 = 0;
        for (score, interaction) in scored {
            if score <= RELEVANCE_THRESHOLD {
                continue;
            }
            let estimate = interaction.tokens_used.unwrap_or(0);
            if current_tokens + estimate <= i64::from(max_tokens) {
                parts.push(format!(
                    "User: {}\nSystem: {}",
                    interaction.user_input, interaction.system_response
                ));
                current_tokens += estimate;
            }
        }

        Ok(parts.join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/data/db.sqlite");

        let storage = ContextStorage::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(storage.db_path(), &path);
    }

    #[test]
    fn test_save_and_fetch_interactions() {
        let storage = ContextStorage::in_memory().unwrap();

        let first = storage.save_interaction("write a parser", "done", Some(42), None).unwrap();
        let second = storage
            .save_interaction("add tests", "ok", None, Some(serde_json::json!({"workflow": "standard"})))
            .unwrap();
        assert!(second > first);

        let recent = storage.get_recent_interactions(5).unwrap();
        assert_eq!(recent.len(), 2);
        // Newest first.
        assert_eq!(recent[0].user_input, "add tests");
        assert_eq!(recent[1].tokens_used, Some(42));
        // Fallback word count: "add tests" + "ok" = 3.
        assert_eq!(recent[0].tokens_used, Some(3));
        assert!(recent[0].metadata.as_deref().unwrap().contains("standard"));
    }

    #[test]
    fn test_save_code_snippet() {
        let storage = ContextStorage::in_memory().unwrap();
        let id = storage.save_interaction("task", "response", Some(1), None).unwrap();
        let snippet_id =
            storage.save_code_snippet(id, "rust", "fn main() {}", Some("entry point")).unwrap();
        assert!(snippet_id > 0);
    }

    #[test]
    fn test_optimized_context_prefers_relevant() {
        let storage = ContextStorage::in_memory().unwrap();
        storage
            .save_interaction("build a url shortener in rust", "plan for shortener", Some(100), None)
            .unwrap();
        storage.save_interaction("bake a cake", "recipe", Some(100), None).unwrap();

        let context = storage.get_optimized_context("extend the url shortener", 2000).unwrap();
        assert!(context.contains("shortener"));
        assert!(!context.contains("recipe"));
    }

    #[test]
    fn test_optimized_context_respects_budget() {
        let storage = ContextStorage::in_memory().unwrap();
        storage.save_interaction("parser task one", "a".repeat(50).as_str(), Some(1500), None).unwrap();
        storage.save_interaction("parser task two", "b".repeat(50).as_str(), Some(1500), None).unwrap();

        let context = storage.get_optimized_context("parser task", 2000).unwrap();
        // Only one interaction fits the 2000 token budget.
        assert_eq!(context.matches("User:").count(), 1);
    }

    #[test]
    fn test_optimized_context_empty_history() {
        let storage = ContextStorage::in_memory().unwrap();
        assert_eq!(storage.get_optimized_context("anything", 2000).unwrap(), "");
    }
}
