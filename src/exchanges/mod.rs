mod bittrex;
mod coinbase;
mod coinbase_wallet;
mod coinex;
mod hitbtc;
mod liqui;
mod poloniex;
mod signing;

pub use bittrex::BittrexAdapter;
pub use coinbase::CoinbaseExchangeAdapter;
pub use coinbase_wallet::CoinbaseWalletAdapter;
pub use coinex::CoinExAdapter;
pub use hitbtc::HitBtcAdapter;
pub use liqui::LiquiAdapter;
pub use poloniex::PoloniexAdapter;

use std::collections::HashMap;

use anyhow::Result;
use tracing::warn;

use crate::config::Config;
use crate::models::Balances;

/// Fetches account balances from one exchange.
///
/// Adapters report balances exactly as the exchange returns them: zero
/// balances are not pre-filtered, symbols are not remapped. Normalization
/// is the aggregator's job.
#[async_trait::async_trait]
pub trait ExchangeAdapter: Send + Sync {
    /// Human-readable exchange name (e.g. "Poloniex").
    fn name(&self) -> &str;

    /// Query the exchange API and return symbol -> amount.
    async fn fetch_balances(&self) -> Result<Balances>;
}

/// Adapter key -> adapter, resolved once at startup.
pub struct ExchangeRegistry {
    adapters: HashMap<String, Box<dyn ExchangeAdapter>>,
}

impl ExchangeRegistry {
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Build a registry for the configured adapter keys.
    ///
    /// Keys that cannot be registered (unknown adapter, missing
    /// credentials) are logged and skipped; the aggregator reports them as
    /// per-key failures later rather than aborting the whole run here.
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::new();

        for key in &config.exchanges {
            match create_adapter(key, config) {
                Ok(adapter) => registry.register(key.clone(), adapter),
                Err(e) => warn!(key = %key, error = %e, "skipping exchange registration"),
            }
        }

        registry
    }

    pub fn register(&mut self, key: impl Into<String>, adapter: Box<dyn ExchangeAdapter>) {
        self.adapters.insert(key.into(), adapter);
    }

    /// Look up the adapter for `key`, if registered.
    pub fn get(&self, key: &str) -> Option<&dyn ExchangeAdapter> {
        self.adapters.get(key).map(|a| a.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl Default for ExchangeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn create_adapter(key: &str, config: &Config) -> Result<Box<dyn ExchangeAdapter>> {
    let credentials = config
        .credentials_for(key)
        .ok_or_else(|| anyhow::anyhow!("missing credentials for exchange: {key}"))?
        .clone();

    match key {
        "poloniex" | "polo" => Ok(Box::new(PoloniexAdapter::new(credentials))),
        "bittrex" | "trex" => Ok(Box::new(BittrexAdapter::new(credentials))),
        "gdax" => Ok(Box::new(CoinbaseExchangeAdapter::new(credentials))),
        "coinbase" | "cb" => Ok(Box::new(CoinbaseWalletAdapter::new(credentials))),
        "hitbtc" => Ok(Box::new(HitBtcAdapter::new(credentials))),
        "liqui" => Ok(Box::new(LiquiAdapter::new(credentials))),
        "coinex" => Ok(Box::new(CoinExAdapter::new(credentials))),
        other => Err(anyhow::anyhow!("unknown exchange adapter: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiCredentials;

    fn config_with(keys: &[&str]) -> Config {
        let mut config = Config {
            exchanges: keys.iter().map(|k| k.to_string()).collect(),
            ..Default::default()
        };
        for key in keys {
            config.credentials.insert(
                key.to_string(),
                ApiCredentials {
                    key: "k".to_string(),
                    secret: "c2VjcmV0".to_string(),
                    passphrase: Some("p".to_string()),
                },
            );
        }
        config
    }

    #[test]
    fn registers_known_adapters() {
        let registry = ExchangeRegistry::from_config(&config_with(&[
            "polo", "trex", "gdax", "cb", "hitbtc", "liqui", "coinex",
        ]));

        assert_eq!(registry.get("polo").map(|a| a.name()), Some("Poloniex"));
        assert_eq!(registry.get("trex").map(|a| a.name()), Some("Bittrex"));
        assert_eq!(
            registry.get("gdax").map(|a| a.name()),
            Some("Coinbase Exchange")
        );
        assert_eq!(registry.get("cb").map(|a| a.name()), Some("Coinbase"));
        assert_eq!(registry.get("hitbtc").map(|a| a.name()), Some("HitBTC"));
        assert_eq!(registry.get("liqui").map(|a| a.name()), Some("Liqui"));
        assert_eq!(registry.get("coinex").map(|a| a.name()), Some("CoinEx"));
    }

    #[test]
    fn wallet_and_exchange_coinbase_keys_are_distinct() {
        let registry = ExchangeRegistry::from_config(&config_with(&["coinbase", "gdax"]));

        assert_eq!(registry.get("coinbase").map(|a| a.name()), Some("Coinbase"));
        assert_eq!(
            registry.get("gdax").map(|a| a.name()),
            Some("Coinbase Exchange")
        );
    }

    #[test]
    fn unknown_key_is_not_registered() {
        let registry = ExchangeRegistry::from_config(&config_with(&["polo", "mtgox"]));

        assert!(registry.get("polo").is_some());
        assert!(registry.get("mtgox").is_none());
    }

    #[test]
    fn key_without_credentials_is_not_registered() {
        let config = Config {
            exchanges: vec!["polo".to_string()],
            ..Default::default()
        };
        let registry = ExchangeRegistry::from_config(&config);

        assert!(registry.is_empty());
    }
}
