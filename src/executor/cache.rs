use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::executor::QueryResult;

struct CacheEntry {
    value: QueryResult,
    inserted_at: Instant,
}

/// LRU keyed by canonical SQL text, default 50 entries / 10-minute TTL.
/// Not consulted for queries above a size bound, and skipped entirely
/// when disabled.
pub struct ResultCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    /// Recency order, oldest first. A hit moves its key to the back.
    order: Mutex<Vec<String>>,
    capacity: usize,
    ttl: Duration,
    max_cacheable_rows: usize,
    enabled: bool,
}

impl ResultCache {
    pub fn new(capacity: usize, ttl: Duration, max_cacheable_rows: usize, enabled: bool) -> Self {
        ResultCache {
            entries: Mutex::new(HashMap::new()),
            order: Mutex::new(Vec::new()),
            capacity,
            ttl,
            max_cacheable_rows,
            enabled,
        }
    }

    pub fn default_enabled() -> Self {
        ResultCache::new(50, Duration::from_secs(600), 5000, true)
    }

    pub fn get(&self, sql: &str) -> Option<QueryResult> {
        if !self.enabled {
            return None;
        }
        let mut entries = self.entries.lock().expect("result cache lock poisoned");
        let entry = entries.get(sql)?;
        if entry.inserted_at.elapsed() > self.ttl {
            entries.remove(sql);
            let mut order = self.order.lock().expect("result cache order lock poisoned");
            order.retain(|k| k != sql);
            return None;
        }
        let value = entry.value.clone();

        let mut order = self.order.lock().expect("result cache order lock poisoned");
        if let Some(pos) = order.iter().position(|k| k == sql) {
            let key = order.remove(pos);
            order.push(key);
        }
        Some(value)
    }

    pub fn put(&self, sql: &str, result: QueryResult) {
        if !self.enabled || result.row_count > self.max_cacheable_rows {
            return;
        }
        let mut entries = self.entries.lock().expect("result cache lock poisoned");
        let mut order = self.order.lock().expect("result cache order lock poisoned");

        if !entries.contains_key(sql) {
            order.push(sql.to_string());
        }
        entries.insert(sql.to_string(), CacheEntry { value: result, inserted_at: Instant::now() });

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

    fn sample(row_count: usize) -> QueryResult {
        QueryResult {
            data: Vec::new(),
            row_count,
            execution_time_ms: 1,
            columns: Vec::new(),
            engine_name: "duckdb".to_string(),
        }
    }

    #[test]
    fn caches_and_returns_hit() {
        let cache = ResultCache::new(4, Duration::from_secs(60), 5000, true);
        cache.put("SELECT 1", sample(1));
        assert!(cache.get("SELECT 1").is_some());
    }

    #[test]
    fn skips_caching_above_size_bound() {
        let cache = ResultCache::new(4, Duration::from_secs(60), 5000, true);
        cache.put("SELECT big", sample(6000));
        assert!(cache.get("SELECT big").is_none());
    }

    #[test]
    fn disabled_cache_never_hits() {
        let cache = ResultCache::new(4, Duration::from_secs(60), 5000, false);
        cache.put("SELECT 1", sample(1));
        assert!(cache.get("SELECT 1").is_none());
    }

    #[test]
    fn touching_a_hit_protects_it_from_eviction() {
        let cache = ResultCache::new(2, Duration::from_secs(60), 5000, true);
        cache.put("SELECT a", sample(1));
        cache.put("SELECT b", sample(1));
        assert!(cache.get("SELECT a").is_some());
        cache.put("SELECT c", sample(1));
        assert!(cache.get("SELECT a").is_some());
        assert!(cache.get("SELECT b").is_none());
    }
}
