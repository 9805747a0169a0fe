use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::error::{Error, Result};

pub const DEFAULT_DB_PATH: &str = "data/db.sqlite";
pub const DEFAULT_CLAUDE_MODEL: &str = "claude-3-7-sonnet-20250219";
pub const DEFAULT_GPT_MODEL: &str = "gpt-4-turbo";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

/// Runtime configuration, read from the process environment. The
/// environment is usually seeded from a `.env` file before this is
/// called; see the `.env.example` at the repository root for the full
/// key set.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub anthropic_api_key: String,
    pub openai_api_key: String,
    pub db_path: PathBuf,
    pub log_level: LogLevel,
    pub agents: AgentToggles,
    pub default_claude_model: String,
    pub default_gpt_model: String,
    pub cache: CacheConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentToggles {
    pub planner: bool,
    pub architect: bool,
    pub coder: bool,
    pub reviewer: bool,
    pub tester: bool,
    pub documenter: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_secs: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum_macros::AsRefStr)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// Unknown values fall back to INFO rather than failing startup.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => LogLevel::Debug,
            "INFO" => LogLevel::Info,
            "WARNING" => LogLevel::Warning,
            "ERROR" => LogLevel::Error,
            "CRITICAL" => LogLevel::Critical,
            _ => LogLevel::Info,
        }
    }

    /// Directive understood by tracing's EnvFilter.
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            // tracing has no CRITICAL level; both map to error.
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let vars: HashMap<String, String> = env::vars().collect();
        Self::from_vars(&vars)
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        Ok(Self {
            anthropic_api_key: string_var(vars, "ANTHROPIC_API_KEY", ""),
            openai_api_key: string_var(vars, "OPENAI_API_KEY", ""),
            db_path: PathBuf::from(string_var(vars, "DB_PATH", DEFAULT_DB_PATH)),
            log_level: LogLevel::parse(&string_var(vars, "LOG_LEVEL", "INFO")),
            agents: AgentToggles {
                planner: bool_var(vars, "ENABLE_PLANNER", true)?,
                architect: bool_var(vars, "ENABLE_ARCHITECT", true)?,
                coder: bool_var(vars, "ENABLE_CODER", true)?,
                reviewer: bool_var(vars, "ENABLE_REVIEWER", true)?,
                tester: bool_var(vars, "ENABLE_TESTER", true)?,
                documenter: bool_var(vars, "ENABLE_DOCUMENTER", true)?,
            },
            default_claude_model: string_var(vars, "DEFAULT_CLAUDE_MODEL", DEFAULT_CLAUDE_MODEL),
            default_gpt_model: string_var(vars, "DEFAULT_GPT_MODEL", DEFAULT_GPT_MODEL),
            cache: CacheConfig {
                enabled: bool_var(vars, "ENABLE_CACHE", true)?,
                ttl_secs: u64_var(vars, "CACHE_TTL", DEFAULT_CACHE_TTL_SECS)?,
            },
        })
    }

    pub fn anthropic_configured(&self) -> bool {
        !self.anthropic_api_key.is_empty()
    }

    pub fn openai_configured(&self) -> bool {
        !self.openai_api_key.is_empty()
    }

    pub fn any_provider_configured(&self) -> bool {
        self.anthropic_configured() || self.openai_configured()
    }
}

fn string_var(vars: &HashMap<String, String>, key: &str, default: &str) -> String {
    match vars.get(key) {
        Some(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => default.to_string(),
    }
}

fn bool_var(vars: &HashMap<String, String>, key: &str, default: bool) -> Result<bool> {
    match vars.get(key) {
        None => Ok(default),
        Some(value) if value.trim().is_empty() => Ok(default),
        Some(value) => match value.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            other => Err(Error::ConfigError {
                key: key.to_string(),
                message: format!("expected a boolean, got {other:?}"),
            }),
        },
    }
}

fn u64_var(vars: &HashMap<String, String>, key: &str, default: u64) -> Result<u64> {
    match vars.get(key) {
        None => Ok(default),
        Some(value) if value.trim().is_empty() => Ok(default),
        Some(value) => value.trim().parse::<u64>().map_err(|e| Error::ConfigError {
            key: key.to_string(),
            message: format!("expected an integer: {e}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(&HashMap::new()).unwrap();

        assert_eq!(config.anthropic_api_key, "");
        assert_eq!(config.db_path, PathBuf::from("data/db.sqlite"));
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(config.agents.planner);
        assert!(config.agents.documenter);
        assert_eq!(config.default_claude_model, DEFAULT_CLAUDE_MODEL);
        assert_eq!(config.default_gpt_model, DEFAULT_GPT_MODEL);
        assert!(config.cache.enabled);
        assert_eq!(config.cache.ttl_secs, 3600);
        assert!(!config.any_provider_configured());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_vars(&vars(&[
            ("ANTHROPIC_API_KEY", "sk-ant-test"),
            ("DB_PATH", "/tmp/other.sqlite"),
            ("LOG_LEVEL", "warning"),
            ("ENABLE_REVIEWER", "false"),
            ("ENABLE_CACHE", "0"),
            ("CACHE_TTL", "120"),
        ]))
        .unwrap();

        assert!(config.anthropic_configured());
        assert!(!config.openai_configured());
        assert_eq!(config.db_path, PathBuf::from("/tmp/other.sqlite"));
        assert_eq!(config.log_level, LogLevel::Warning);
        assert!(!config.agents.reviewer);
        assert!(config.agents.tester);
        assert!(!config.cache.enabled);
        assert_eq!(config.cache.ttl_secs, 120);
    }

    #[test]
    fn test_malformed_values() {
        let err = Config::from_vars(&vars(&[("ENABLE_CODER", "maybe")])).unwrap_err();
        assert_eq!(err.as_ref(), "ConfigError");

        let err = Config::from_vars(&vars(&[("CACHE_TTL", "soon")])).unwrap_err();
        assert_eq!(err.as_ref(), "ConfigError");

        // Unknown log levels degrade to INFO instead of failing.
        let config = Config::from_vars(&vars(&[("LOG_LEVEL", "LOUD")])).unwrap();
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn test_log_level_filter_mapping() {
        assert_eq!(LogLevel::parse("DEBUG").as_filter(), "debug");
        assert_eq!(LogLevel::parse("WARNING").as_filter(), "warn");
        assert_eq!(LogLevel::parse("CRITICAL").as_filter(), "error");
    }
}
