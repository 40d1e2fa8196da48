use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::warn;

use crate::models::BalanceSet;

use super::{CacheError, CacheStore};

/// JSON file-backed cache.
///
/// The whole cache is one JSON object mapping adapter key to that
/// exchange's last-fetched snapshot:
///
/// ```text
/// {
///   "poloniex": { "exchange_name": "Poloniex", "balances": { "BTC": 1.0 } },
///   "trex":     { "exchange_name": "Bittrex",  "balances": { "ETH": 2.0 } }
/// }
/// ```
///
/// Reads load the entire file; a missing, unreadable, or corrupt file is
/// treated as an empty cache. Writes serialize the entire map to a
/// temporary file next to the target and rename it into place, so a failed
/// write leaves the previously valid file untouched.
pub struct JsonFileCache {
    path: PathBuf,
    bypass: HashSet<String>,
}

impl JsonFileCache {
    pub fn new(path: impl AsRef<Path>, bypass: impl IntoIterator<Item = String>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            bypass: bypass.into_iter().collect(),
        }
    }

    /// Read the whole cache, treating any failure as an empty cache.
    async fn read_all(&self) -> HashMap<String, BalanceSet> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return HashMap::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "unreadable cache file, treating as empty");
                return HashMap::new();
            }
        };

        match serde_json::from_str(&content) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "corrupt cache file, treating as empty");
                HashMap::new()
            }
        }
    }

    /// Replace the whole cache file via a temp file in the same directory.
    async fn write_all(&self, entries: &HashMap<String, BalanceSet>) -> Result<(), CacheError> {
        let content = serde_json::to_string_pretty(entries)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|source| CacheError::Write {
                        path: self.path.clone(),
                        source,
                    })?;
            }
        }

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, content)
            .await
            .map_err(|source| CacheError::Write {
                path: tmp_path.clone(),
                source,
            })?;
        fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|source| CacheError::Write {
                path: self.path.clone(),
                source,
            })?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl CacheStore for JsonFileCache {
    async fn read(&self, key: &str) -> Result<Option<BalanceSet>, CacheError> {
        if self.bypass.contains(key) {
            return Ok(None);
        }
        Ok(self.read_all().await.remove(key))
    }

    async fn write(&self, key: &str, value: &BalanceSet) -> Result<(), CacheError> {
        let mut entries = self.read_all().await;
        entries.insert(key.to_string(), value.clone());
        self.write_all(&entries).await
    }
}
