use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default cache file name.
fn default_cache_file() -> PathBuf {
    PathBuf::from("balances.json")
}

/// Default label for the per-currency totals column.
fn default_total_column() -> String {
    "Total".to_string()
}

fn default_exclude_zeros() -> bool {
    true
}

/// API credentials for one exchange.
///
/// `passphrase` is only used by exchanges whose auth scheme requires it
/// (Coinbase Exchange).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiCredentials {
    pub key: String,
    pub secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,
}

/// Quote service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotesConfig {
    /// CoinMarketCap API key.
    pub api_key: String,
}

/// Application configuration.
///
/// All fields have defaults; a run does nothing useful unless `exchanges`
/// is populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Ordered list of adapter keys to query (e.g. `["poloniex", "trex"]`).
    pub exchanges: Vec<String>,

    /// Per-exchange API credentials, keyed by adapter key.
    pub credentials: HashMap<String, ApiCredentials>,

    /// Symbol remap table applied during normalization
    /// (e.g. `STR = "XLM"`).
    pub symbol_transform: HashMap<String, String>,

    /// Drop zero balances during normalization. Defaults to true.
    #[serde(default = "default_exclude_zeros")]
    pub exclude_zeros: bool,

    /// Symbols always kept, even with a zero balance.
    pub required_rows: Vec<String>,

    /// Where the balance cache lives. Relative paths are resolved against
    /// the config file's directory. Defaults to `balances.json`.
    #[serde(default = "default_cache_file")]
    pub cache_file: PathBuf,

    /// Label for the totals column. Defaults to `"Total"`.
    #[serde(default = "default_total_column")]
    pub total_column: String,

    /// Quote service settings.
    pub quotes: QuotesConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exchanges: Vec::new(),
            credentials: HashMap::new(),
            symbol_transform: HashMap::new(),
            exclude_zeros: default_exclude_zeros(),
            required_rows: Vec::new(),
            cache_file: default_cache_file(),
            total_column: default_total_column(),
            quotes: QuotesConfig::default(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load config from a file, or return default config if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolve the cache file path.
    ///
    /// If `cache_file` is relative, it's resolved relative to `config_dir`.
    pub fn resolve_cache_file(&self, config_dir: &Path) -> PathBuf {
        if self.cache_file.is_absolute() {
            self.cache_file.clone()
        } else {
            config_dir.join(&self.cache_file)
        }
    }

    /// Credentials for an adapter key, if configured.
    pub fn credentials_for(&self, key: &str) -> Option<&ApiCredentials> {
        self.credentials.get(key)
    }
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./cointab.toml` if it exists in current directory
/// 2. `~/.config/cointab/cointab.toml` (XDG config directory)
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from("cointab.toml");
    if local_config.exists() {
        return local_config;
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("cointab").join("cointab.toml");
    }

    local_config
}
