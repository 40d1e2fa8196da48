//! HitBTC balance adapter.
//!
//! The v2 API splits funds between a main account and a trading account,
//! each behind its own endpoint. Both use HTTP basic auth; the adapter sums
//! available and reserved amounts per symbol across the two.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::config::ApiCredentials;
use crate::models::Balances;

use super::ExchangeAdapter;

const HITBTC_API_BASE: &str = "https://api.hitbtc.com";
const BALANCE_PATHS: [&str; 2] = ["/api/2/account/balance", "/api/2/trading/balance"];

#[derive(Debug, Deserialize)]
struct BalanceEntry {
    currency: String,
    available: String,
    reserved: String,
}

pub struct HitBtcAdapter {
    client: reqwest::Client,
    credentials: ApiCredentials,
    base_url: String,
}

impl HitBtcAdapter {
    pub fn new(credentials: ApiCredentials) -> Self {
        Self {
            client: reqwest::Client::new(),
            credentials,
            base_url: HITBTC_API_BASE.to_string(),
        }
    }

    /// Overrides the API base URL (for tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Fold one endpoint's entries into the running per-symbol sums.
fn accumulate(balances: &mut Balances, entries: Vec<BalanceEntry>) -> Result<()> {
    for entry in entries {
        let available: f64 = entry.available.parse().with_context(|| {
            format!(
                "unparseable HitBTC balance for {}: {:?}",
                entry.currency, entry.available
            )
        })?;
        let reserved: f64 = entry.reserved.parse().with_context(|| {
            format!(
                "unparseable HitBTC balance for {}: {:?}",
                entry.currency, entry.reserved
            )
        })?;
        *balances.entry(entry.currency).or_insert(0.0) += available + reserved;
    }
    Ok(())
}

#[async_trait::async_trait]
impl ExchangeAdapter for HitBtcAdapter {
    fn name(&self) -> &str {
        "HitBTC"
    }

    async fn fetch_balances(&self) -> Result<Balances> {
        let mut balances = Balances::new();

        for path in BALANCE_PATHS {
            let response = self
                .client
                .get(format!("{}{}", self.base_url, path))
                .basic_auth(&self.credentials.key, Some(&self.credentials.secret))
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(anyhow!("HitBTC API error: {} - {}", status, body));
            }

            let entries: Vec<BalanceEntry> = response.json().await?;
            accumulate(&mut balances, entries)?;
        }

        Ok(balances)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCOUNT_RESPONSE: &str = r#"[
        { "currency": "BTC", "available": "0.5", "reserved": "0.1" },
        { "currency": "ETH", "available": "0.0", "reserved": "0.0" }
    ]"#;

    const TRADING_RESPONSE: &str = r#"[
        { "currency": "BTC", "available": "0.25", "reserved": "0.0" },
        { "currency": "XRP", "available": "100", "reserved": "0" }
    ]"#;

    #[test]
    fn sums_available_and_reserved_across_endpoints() {
        let mut balances = Balances::new();
        accumulate(
            &mut balances,
            serde_json::from_str(ACCOUNT_RESPONSE).unwrap(),
        )
        .unwrap();
        accumulate(
            &mut balances,
            serde_json::from_str(TRADING_RESPONSE).unwrap(),
        )
        .unwrap();

        assert_eq!(balances["BTC"], 0.85);
        assert_eq!(balances["ETH"], 0.0);
        assert_eq!(balances["XRP"], 100.0);
    }

    #[test]
    fn unparseable_amount_is_an_error() {
        let mut balances = Balances::new();
        let entries = vec![BalanceEntry {
            currency: "BTC".to_string(),
            available: "lots".to_string(),
            reserved: "0".to_string(),
        }];
        assert!(accumulate(&mut balances, entries).is_err());
    }

    #[test]
    fn adapter_name() {
        let adapter = HitBtcAdapter::new(ApiCredentials::default());
        assert_eq!(adapter.name(), "HitBTC");
    }
}
