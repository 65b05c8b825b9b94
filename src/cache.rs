// 🗄️ Lookup Cache - TTL + capacity bounded memo, shared via Arc
// Guards are only held inside these methods, never across an await; reads return clones

use crate::config::CacheConfig;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

#[derive(Debug)]
pub struct LookupCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    ttl: Duration,
    capacity: usize,
}

impl<V: Clone> LookupCache<V> {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        LookupCache {
            entries: RwLock::new(HashMap::new()),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// None when caching is disabled in the config
    pub fn from_config(config: &CacheConfig) -> Option<Self> {
        config
            .enabled
            .then(|| Self::new(config.ttl(), config.capacity))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Fresh value for `key`, if any
    pub fn get(&self, key: &str) -> Option<V> {
        let guard = self.entries.read().ok()?;
        guard
            .get(key)
            .filter(|entry| entry.inserted_at.elapsed() < self.ttl)
            .map(|entry| entry.value.clone())
    }

    /// Insert, dropping expired entries first and then the oldest when full
    pub fn insert(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        if let Ok(mut guard) = self.entries.write() {
            let ttl = self.ttl;
            guard.retain(|_, entry| entry.inserted_at.elapsed() < ttl);

            if !guard.contains_key(&key) && guard.len() >= self.capacity {
                let oldest = guard
                    .iter()
                    .min_by_key(|(_, entry)| entry.inserted_at)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    guard.remove(&oldest);
                }
            }

            guard.insert(
                key,
                CacheEntry {
                    value,
                    inserted_at: Instant::now(),
                },
            );
        }
    }

    pub fn invalidate(&self, key: &str) -> bool {
        match self.entries.write() {
            Ok(mut guard) => guard.remove(key).is_some(),
            Err(_) => false,
        }
    }

    /// Remove every entry whose key matches; returns how many were removed
    pub fn invalidate_where<F>(&self, predicate: F) -> usize
    where
        F: Fn(&str) -> bool,
    {
        match self.entries.write() {
            Ok(mut guard) => {
                let before = guard.len();
                guard.retain(|key, _| !predicate(key));
                before - guard.len()
            }
            Err(_) => 0,
        }
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.entries.write() {
            guard.clear();
        }
    }

    /// Entries currently stored, expired ones included until the next insert
    pub fn len(&self) -> usize {
        self.entries.read().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_get_returns_clone() {
        let cache: LookupCache<Vec<u32>> = LookupCache::new(Duration::from_secs(60), 4);
        cache.insert("cement", vec![1, 2]);

        let mut copy = cache.get("cement").unwrap();
        copy.push(3);
        assert_eq!(cache.get("cement").unwrap(), vec![1, 2]);
        assert!(cache.get("sand").is_none());
    }

    #[test]
    fn test_expired_entries_are_misses() {
        let cache: LookupCache<u32> = LookupCache::new(Duration::ZERO, 4);
        cache.insert("cement", 1);
        assert!(cache.get("cement").is_none());
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let cache: LookupCache<u32> = LookupCache::new(Duration::from_secs(60), 2);
        cache.insert("a", 1);
        std::thread::sleep(Duration::from_millis(2));
        cache.insert("b", 2);
        std::thread::sleep(Duration::from_millis(2));
        cache.insert("c", 3);

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert_eq!(cache.get("c"), Some(3));
    }

    #[test]
    fn test_invalidate_where() {
        let cache: LookupCache<u32> = LookupCache::new(Duration::from_secs(60), 8);
        cache.insert("steel bar", 1);
        cache.insert("steel pipe", 2);
        cache.insert("cement", 3);

        assert_eq!(cache.invalidate_where(|k| k.contains("steel")), 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.invalidate("cement"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_shared_across_threads() {
        let cache = Arc::new(LookupCache::<u32>::new(Duration::from_secs(60), 64));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.insert(format!("item{}", i), i))
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cache.len(), 4);
    }

    #[test]
    fn test_disabled_config() {
        let config = CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        };
        assert!(LookupCache::<u32>::from_config(&config).is_none());
    }
}
