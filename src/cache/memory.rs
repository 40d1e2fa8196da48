//! In-memory cache implementation for testing.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::models::BalanceSet;

use super::{CacheError, CacheStore};

/// In-memory cache for testing purposes.
///
/// Same bypass semantics as the file-backed store; can additionally be told
/// to fail writes, to exercise the aggregator's cache-write failure path.
pub struct MemoryCache {
    entries: Mutex<HashMap<String, BalanceSet>>,
    bypass: HashSet<String>,
    fail_writes: AtomicBool,
}

impl MemoryCache {
    pub fn new(bypass: impl IntoIterator<Item = String>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            bypass: bypass.into_iter().collect(),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .lock()
            .expect("cache lock poisoned")
            .contains_key(key)
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new([])
    }
}

#[async_trait::async_trait]
impl CacheStore for MemoryCache {
    async fn read(&self, key: &str) -> Result<Option<BalanceSet>, CacheError> {
        if self.bypass.contains(key) {
            return Ok(None);
        }
        let entries = self.entries.lock().expect("cache lock poisoned");
        Ok(entries.get(key).cloned())
    }

    async fn write(&self, key: &str, value: &BalanceSet) -> Result<(), CacheError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CacheError::Write {
                path: "<memory>".into(),
                source: std::io::Error::other("simulated write failure"),
            });
        }
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        entries.insert(key.to_string(), value.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Balances;

    #[tokio::test]
    async fn bypass_hides_existing_entry() {
        let cache = MemoryCache::new(["polo".to_string()]);
        let set = BalanceSet::new("Poloniex", Balances::new());
        cache.write("polo", &set).await.unwrap();

        assert!(cache.contains("polo"));
        assert_eq!(cache.read("polo").await.unwrap(), None);
    }

    #[tokio::test]
    async fn failed_write_is_an_error() {
        let cache = MemoryCache::default();
        cache.set_fail_writes(true);

        let set = BalanceSet::new("Poloniex", Balances::new());
        assert!(cache.write("polo", &set).await.is_err());
        assert!(!cache.contains("polo"));
    }
}
