//! Coinbase Exchange (formerly GDAX) balance adapter.
//!
//! Signs requests with the CB-ACCESS scheme: base64 HMAC-SHA256 over
//! `timestamp + method + path`, keyed with the base64-decoded API secret.
//! A passphrase accompanies the key.

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use serde::Deserialize;

use crate::config::ApiCredentials;
use crate::models::Balances;

use super::signing::hmac_sha256_base64;
use super::ExchangeAdapter;

const COINBASE_API_BASE: &str = "https://api.exchange.coinbase.com";
const ACCOUNTS_PATH: &str = "/accounts";

#[derive(Debug, Deserialize)]
struct AccountEntry {
    currency: String,
    balance: String,
}

pub struct CoinbaseExchangeAdapter {
    client: reqwest::Client,
    credentials: ApiCredentials,
    base_url: String,
}

impl CoinbaseExchangeAdapter {
    pub fn new(credentials: ApiCredentials) -> Self {
        Self {
            client: reqwest::Client::new(),
            credentials,
            base_url: COINBASE_API_BASE.to_string(),
        }
    }

    /// Overrides the API base URL (for tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

fn parse_balances(accounts: Vec<AccountEntry>) -> Result<Balances> {
    let mut balances = Balances::with_capacity(accounts.len());
    for account in accounts {
        let amount: f64 = account.balance.parse().with_context(|| {
            format!(
                "unparseable Coinbase Exchange balance for {}: {:?}",
                account.currency, account.balance
            )
        })?;
        balances.insert(account.currency, amount);
    }
    Ok(balances)
}

#[async_trait::async_trait]
impl ExchangeAdapter for CoinbaseExchangeAdapter {
    fn name(&self) -> &str {
        "Coinbase Exchange"
    }

    async fn fetch_balances(&self) -> Result<Balances> {
        let passphrase = self
            .credentials
            .passphrase
            .as_deref()
            .context("Coinbase Exchange credentials require a passphrase")?;

        let timestamp = Utc::now().timestamp().to_string();
        let message = format!("{timestamp}GET{ACCOUNTS_PATH}");
        let signature = hmac_sha256_base64(&self.credentials.secret, message.as_bytes())?;

        let response = self
            .client
            .get(format!("{}{}", self.base_url, ACCOUNTS_PATH))
            .header("CB-ACCESS-KEY", &self.credentials.key)
            .header("CB-ACCESS-SIGN", signature)
            .header("CB-ACCESS-TIMESTAMP", timestamp)
            .header("CB-ACCESS-PASSPHRASE", passphrase)
            .header("Content-Type", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Coinbase Exchange API error: {} - {}", status, body));
        }

        let accounts: Vec<AccountEntry> = response.json().await?;
        parse_balances(accounts)
    }
}
