//! The balance aggregation pipeline.
//!
//! For each configured adapter key the aggregator resolves cached-or-fresh
//! data, writes fresh fetches back to the cache, normalizes symbols, and
//! collects per-exchange balance sets. One exchange failing never aborts
//! the run; failures are logged and returned alongside the successful sets.

use std::collections::{HashMap, HashSet};

use anyhow::{anyhow, Result};
use tracing::{error, info};

use crate::cache::CacheStore;
use crate::config::Config;
use crate::exchanges::ExchangeRegistry;
use crate::models::{BalanceSet, Balances};

/// Normalization settings applied to every balance set, cached or fresh.
#[derive(Debug, Clone, Default)]
pub struct NormalizeOptions {
    /// Symbol remap applied first (e.g. "STR" -> "XLM").
    pub symbol_transform: HashMap<String, String>,
    /// Drop zero balances after remapping.
    pub exclude_zeros: bool,
    /// Post-remap symbols kept even when zero.
    pub required_rows: HashSet<String>,
}

impl NormalizeOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            symbol_transform: config.symbol_transform.clone(),
            exclude_zeros: config.exclude_zeros,
            required_rows: config.required_rows.iter().cloned().collect(),
        }
    }
}

/// One exchange's failure during aggregation.
#[derive(Debug)]
pub struct FetchFailure {
    pub key: String,
    pub error: anyhow::Error,
}

pub struct BalanceAggregator {
    registry: ExchangeRegistry,
    cache: Box<dyn CacheStore>,
    options: NormalizeOptions,
}

impl BalanceAggregator {
    pub fn new(
        registry: ExchangeRegistry,
        cache: Box<dyn CacheStore>,
        options: NormalizeOptions,
    ) -> Self {
        Self {
            registry,
            cache,
            options,
        }
    }

    /// Resolve balances for each key, in order.
    ///
    /// Failures (unknown adapter, fetch error, cache write error) omit that
    /// exchange from the result and continue with the rest.
    pub async fn get_data(&self, keys: &[String]) -> (Vec<BalanceSet>, Vec<FetchFailure>) {
        let mut sets = Vec::new();
        let mut failures = Vec::new();

        for key in keys {
            match self.get_one(key).await {
                Ok(set) => sets.push(set),
                Err(e) => {
                    error!(key = %key, error = %format!("{e:#}"), "failed to resolve exchange balances");
                    failures.push(FetchFailure {
                        key: key.clone(),
                        error: e,
                    });
                }
            }
        }

        (sets, failures)
    }

    async fn get_one(&self, key: &str) -> Result<BalanceSet> {
        let adapter = self
            .registry
            .get(key)
            .ok_or_else(|| anyhow!("no adapter registered for key: {key}"))?;

        let raw = match self.cache.read(key).await? {
            Some(cached) => {
                info!(exchange = %cached.exchange_name, "using cached balances");
                cached
            }
            None => {
                info!(exchange = adapter.name(), "requesting balances from API");
                let balances = adapter.fetch_balances().await?;
                let fresh = BalanceSet::new(adapter.name(), balances);
                // Persist before normalizing so a config change never
                // requires a refetch.
                self.cache.write(key, &fresh).await?;
                fresh
            }
        };

        Ok(BalanceSet::new(
            raw.exchange_name,
            self.normalize(raw.balances),
        ))
    }

    /// Remap symbols, then drop zero balances unless allowlisted.
    fn normalize(&self, balances: Balances) -> Balances {
        balances
            .into_iter()
            .map(|(symbol, amount)| {
                let symbol = self
                    .options
                    .symbol_transform
                    .get(&symbol)
                    .cloned()
                    .unwrap_or(symbol);
                (symbol, amount)
            })
            .filter(|(symbol, amount)| {
                !self.options.exclude_zeros
                    || *amount != 0.0
                    || self.options.required_rows.contains(symbol)
            })
            .collect()
    }
}
