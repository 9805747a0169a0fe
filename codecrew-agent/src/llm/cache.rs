use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use codecrew_common::config::config::CacheConfig;

use crate::llm::llm::LLMResult;
use crate::llm::prompt::Prompt;

/// Process-wide response cache shared by the provider clients. Entries
/// expire after the configured TTL; a disabled cache never stores or
/// returns anything.
#[derive(Clone, Debug)]
pub struct ResponseCache {
    enabled: bool,
    ttl: Duration,
    entries: Arc<Mutex<HashMap<String, CacheEntry>>>,
}

#[derive(Clone, Debug)]
struct CacheEntry {
    result: LLMResult,
    inserted_at: Instant,
}

impl ResponseCache {
    pub fn new(enabled: bool, ttl_secs: u64) -> Self {
        Self {
            enabled,
            ttl: Duration::from_secs(ttl_secs),
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.enabled, config.ttl_secs)
    }

    pub fn disabled() -> Self {
        Self::new(false, 0)
    }

    pub fn key(model: &str, temperature: f32, max_tokens: u32, prompt: &Prompt) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            model,
            temperature,
            max_tokens,
            prompt.system(),
            prompt.user_text()
        )
    }

    pub fn get(&self, key: &str) -> Option<LLMResult> {
        if !self.enabled {
            return None;
        }
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() <= self.ttl => {
                Some(entry.result.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, key: String, result: &LLMResult) {
        if !self.enabled {
            return;
        }
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key, CacheEntry { result: result.clone(), inserted_at: Instant::now() });
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(message: &str) -> LLMResult {
        LLMResult::new(message.to_string(), "static".to_string())
    }

    #[test]
    fn test_round_trip() {
        let cache = ResponseCache::new(true, 3600);
        let prompt = Prompt::new_simple("s".to_string(), "u".to_string());
        let key = ResponseCache::key("m", 0.7, 1000, &prompt);

        assert!(cache.get(&key).is_none());
        cache.put(key.clone(), &result("cached"));
        assert_eq!(cache.get(&key).unwrap().message, "cached");
    }

    #[test]
    fn test_disabled_cache_stores_nothing() {
        let cache = ResponseCache::disabled();
        let prompt = Prompt::new_simple("s".to_string(), "u".to_string());
        let key = ResponseCache::key("m", 0.7, 1000, &prompt);

        cache.put(key.clone(), &result("cached"));
        assert!(cache.get(&key).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_expired_entry_is_evicted() {
        let cache = ResponseCache::new(true, 0);
        let prompt = Prompt::new_simple("s".to_string(), "u".to_string());
        let key = ResponseCache::key("m", 0.7, 1000, &prompt);

        cache.put(key.clone(), &result("cached"));
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get(&key).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_key_varies_with_sampling() {
        let prompt = Prompt::new_simple("s".to_string(), "u".to_string());
        let a = ResponseCache::key("m", 0.7, 1000, &prompt);
        let b = ResponseCache::key("m", 0.3, 1000, &prompt);
        assert_ne!(a, b);
    }
}
