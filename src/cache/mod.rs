mod json_file;
mod memory;

pub use json_file::JsonFileCache;
pub use memory::MemoryCache;

use std::path::PathBuf;

use crate::models::BalanceSet;

/// Errors from the cache store.
///
/// Read-side problems (missing, unreadable, or corrupt cache files) are
/// handled fail-open inside the implementations and never surface here;
/// blocking aggregation on a bad cache would defeat its purpose.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("failed to write cache file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize cache contents: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Persists the last-fetched balance snapshot per adapter key.
///
/// Implementations carry a bypass set fixed at construction: `read` reports
/// absent for bypassed keys, forcing a fresh fetch for exactly those
/// exchanges this run while the rest still use cached values.
#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the stored snapshot for `key`, or `None` if never cached or
    /// if `key` is bypassed for this invocation.
    async fn read(&self, key: &str) -> Result<Option<BalanceSet>, CacheError>;

    /// Replaces (or creates) the entry for `key` and persists immediately.
    async fn write(&self, key: &str, value: &BalanceSet) -> Result<(), CacheError>;
}
