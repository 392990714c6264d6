use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::intent::ParsedIntent;

struct CacheEntry {
    value: ParsedIntent,
    inserted_at: Instant,
}

/// LRU keyed by a hash of the NLQ text, holding the canonical ParsedIntent
/// for a configurable TTL.
pub struct ParserCache {
    entries: Mutex<HashMap<u64, CacheEntry>>,
    capacity: usize,
    ttl: Duration,
    /// Recency order, oldest first. A hit moves its key to the back; once
    /// `capacity` is exceeded the front (least-recently-used) key is
    /// evicted.
    order: Mutex<Vec<u64>>,
}

impl ParserCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        ParserCache {
            entries: Mutex::new(HashMap::new()),
            capacity,
            ttl,
            order: Mutex::new(Vec::new()),
        }
    }

    pub fn default_with_ttl_2h() -> Self {
        ParserCache::new(512, Duration::from_secs(2 * 60 * 60))
    }

    fn key(nlq: &str) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        nlq.hash(&mut hasher);
        hasher.finish()
    }

    /// A cache hit returns immediately with `token_usage.cache_hit = true`
    /// and bypasses the rule and LLM stages.
    pub fn get(&self, nlq: &str) -> Option<ParsedIntent> {
        let key = Self::key(nlq);
        let mut entries = self.entries.lock().expect("parser cache lock poisoned");
        let entry = entries.get(&key)?;
        if entry.inserted_at.elapsed() > self.ttl {
            entries.remove(&key);
            let mut order = self.order.lock().expect("parser cache order lock poisoned");
            order.retain(|k| *k != key);
            return None;
        }
        let mut hit = entry.value.clone();
        hit.token_usage.cache_hit = true;

        let mut order = self.order.lock().expect("parser cache order lock poisoned");
        if let Some(pos) = order.iter().position(|k| *k == key) {
            let key = order.remove(pos);
            order.push(key);
        }
        Some(hit)
    }

    pub fn put(&self, nlq: &str, value: ParsedIntent) {
        let key = Self::key(nlq);
        let mut entries = self.entries.lock().expect("parser cache lock poisoned");
        let mut order = self.order.lock().expect("parser cache order lock poisoned");

        if !entries.contains_key(&key) {
            order.push(key);
        }
        entries.insert(key, CacheEntry { value, inserted_at: Instant::now() });

        while entries.len() > self.capacity {
            if order.is_empty() {
                break;
            }
            let least_recently_used = order.remove(0);
            entries.remove(&least_recently_used);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::TokenUsage;
    use std::collections::HashMap as StdHashMap;

    fn sample() -> ParsedIntent {
        ParsedIntent {
            intent_name: "QUERY_INVENTORY".to_string(),
            confidence: 0.9,
            params: StdHashMap::new(),
            limit: None,
            offset: None,
            token_usage: TokenUsage::default(),
            validation_errors: Vec::new(),
        }
    }

    #[test]
    fn hit_sets_cache_hit_flag() {
        let cache = ParserCache::new(4, Duration::from_secs(60));
        cache.put("query", sample());
        let hit = cache.get("query").unwrap();
        assert!(hit.token_usage.cache_hit);
    }

    #[test]
    fn expired_entry_is_not_returned() {
        let cache = ParserCache::new(4, Duration::from_millis(1));
        cache.put("query", sample());
        std::thread::sleep(Duration::from_millis(10));
        assert!(cache.get("query").is_none());
    }

    #[test]
    fn evicts_oldest_beyond_capacity() {
        let cache = ParserCache::new(2, Duration::from_secs(60));
        cache.put("a", sample());
        cache.put("b", sample());
        cache.put("c", sample());
        assert!(cache.get("a").is_none());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn touching_a_hit_protects_it_from_eviction() {
        let cache = ParserCache::new(2, Duration::from_secs(60));
        cache.put("a", sample());
        cache.put("b", sample());
        assert!(cache.get("a").is_some()); // "a" becomes most-recently-used
        cache.put("c", sample()); // should evict "b", not "a"
        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
    }
}
