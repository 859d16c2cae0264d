//! Prediction caching layer

use std::sync::Arc;
use indexmap::IndexMap;
use parking_lot::Mutex;
use sg_core::spec::Record;

/// Cache key: model, dataset and example id
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub model: String,
    pub dataset: String,
    pub record_id: String,
}

impl CacheKey {
    pub fn new(model: &str, dataset: &str, record_id: &str) -> Self {
        Self {
            model: model.to_string(),
            dataset: dataset.to_string(),
            record_id: record_id.to_string(),
        }
    }
}

/// Bounded cache of fetched prediction records
///
/// Entries are kept in recency order; the least recently used entry is
/// evicted when the cache is full.
pub struct PredictionCache {
    /// Cached predictions, oldest first
    entries: Arc<Mutex<IndexMap<CacheKey, Arc<Record>>>>,
    /// Maximum number of entries to cache
    max_entries: usize,
}

impl PredictionCache {
    /// Create a new prediction cache; a capacity of zero disables caching
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(IndexMap::new())),
            max_entries,
        }
    }

    /// Get predictions from cache, marking them most recently used
    pub fn get(&self, key: &CacheKey) -> Option<Arc<Record>> {
        let mut entries = self.entries.lock();
        let record = entries.shift_remove(key)?;
        entries.insert(key.clone(), Arc::clone(&record));
        Some(record)
    }

    /// Put predictions in cache
    pub fn put(&self, key: CacheKey, record: Arc<Record>) {
        if self.max_entries == 0 {
            return;
        }
        let mut entries = self.entries.lock();
        entries.shift_remove(&key);

        while entries.len() >= self.max_entries {
            entries.shift_remove_index(0);
        }

        entries.insert(key, record);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Clear the cache
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Default for PredictionCache {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: &str) -> CacheKey {
        CacheKey::new("tagger", "conll", id)
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let cache = PredictionCache::new(2);
        cache.put(key("a"), Arc::new(Record::new()));
        cache.put(key("b"), Arc::new(Record::new()));

        assert!(cache.get(&key("a")).is_some());
        cache.put(key("c"), Arc::new(Record::new()));

        assert!(cache.get(&key("b")).is_none());
        assert!(cache.get(&key("a")).is_some());
        assert!(cache.get(&key("c")).is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_keys_distinguish_models() {
        let cache = PredictionCache::new(4);
        cache.put(key("a"), Arc::new(Record::new()));
        assert!(cache.get(&CacheKey::new("other", "conll", "a")).is_none());
    }

    #[test]
    fn test_zero_capacity_disables_cache() {
        let cache = PredictionCache::new(0);
        cache.put(key("a"), Arc::new(Record::new()));
        assert!(cache.is_empty());
    }
}
