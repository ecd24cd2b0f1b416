//! Bounded TTL suggestion cache, keyed by fingerprint.
//!
//! A small hand-rolled map behind a `std::sync::Mutex` — no external cache
//! crate pulled in for something this small.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const DEFAULT_TTL: Duration = Duration::from_secs(20);
const DEFAULT_CAPACITY: usize = 512;

struct CacheEntry {
    completion: String,
    expires_at: Instant,
}

pub struct SuggestionCache {
    ttl: Duration,
    capacity: usize,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl Default for SuggestionCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_CAPACITY)
    }
}

impl SuggestionCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Look up `key`. Expired entries are evicted on the way out and treated
    /// as a miss.
    pub fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().unwrap();
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.completion.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store `completion` under `key`. Empty completions are never stored —
    /// an empty result must not mask a retry. Best-effort: never panics or
    /// raises on a write, beyond evicting an arbitrary entry when full.
    pub fn put(&self, key: String, completion: String) {
        if completion.is_empty() {
            return;
        }
        let mut entries = self.entries.lock().unwrap();
        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            // Eviction policy is not observable; dropping an arbitrary entry
            // is sufficient to stay under capacity.
            if let Some(victim) = entries.keys().next().cloned() {
                entries.remove(&victim);
            }
        }
        entries.insert(
            key,
            CacheEntry {
                completion,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_on_empty_cache() {
        let cache = SuggestionCache::default();
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn hit_after_put() {
        let cache = SuggestionCache::default();
        cache.put("k".to_string(), "completion".to_string());
        assert_eq!(cache.get("k"), Some("completion".to_string()));
    }

    #[test]
    fn empty_completions_are_never_stored() {
        let cache = SuggestionCache::default();
        cache.put("k".to_string(), String::new());
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn expired_entries_are_treated_as_a_miss() {
        let cache = SuggestionCache::new(Duration::from_millis(1), 512);
        cache.put("k".to_string(), "v".to_string());
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn overflow_evicts_rather_than_growing_unbounded() {
        let cache = SuggestionCache::new(DEFAULT_TTL, 2);
        cache.put("a".to_string(), "1".to_string());
        cache.put("b".to_string(), "2".to_string());
        cache.put("c".to_string(), "3".to_string());
        let count = [cache.get("a"), cache.get("b"), cache.get("c")]
            .into_iter()
            .filter(Option::is_some)
            .count();
        assert!(count <= 2);
    }
}
