//! Coinbase wallet (retail) balance adapter.
//!
//! Distinct from the Coinbase Exchange adapter: the v2 wallet API signs with
//! a lowercase hex HMAC-SHA256 of `timestamp + method + path`, keyed with
//! the plain-text secret, and needs no passphrase. Accounts arrive as a list
//! under `data`, one per wallet.

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use serde::Deserialize;

use crate::config::ApiCredentials;
use crate::models::Balances;

use super::signing::hmac_sha256_hex;
use super::ExchangeAdapter;

const COINBASE_API_BASE: &str = "https://api.coinbase.com";
const ACCOUNTS_PATH: &str = "/v2/accounts";
const CB_VERSION: &str = "2017-05-19";

#[derive(Debug, Deserialize)]
struct AccountsResponse {
    data: Vec<Account>,
}

#[derive(Debug, Deserialize)]
struct Account {
    balance: AccountBalance,
}

#[derive(Debug, Deserialize)]
struct AccountBalance {
    amount: String,
    currency: String,
}

pub struct CoinbaseWalletAdapter {
    client: reqwest::Client,
    credentials: ApiCredentials,
    base_url: String,
}

impl CoinbaseWalletAdapter {
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

/// A currency can span several wallets (e.g. a BTC wallet and a BTC vault);
/// their amounts are summed.
fn parse_balances(accounts: Vec<Account>) -> Result<Balances> {
    let mut balances = Balances::with_capacity(accounts.len());
    for account in accounts {
        let amount: f64 = account.balance.amount.parse().with_context(|| {
            format!(
                "unparseable Coinbase balance for {}: {:?}",
                account.balance.currency, account.balance.amount
            )
        })?;
        *balances.entry(account.balance.currency).or_insert(0.0) += amount;
    }
    Ok(balances)
}

#[async_trait::async_trait]
impl ExchangeAdapter for CoinbaseWalletAdapter {
    fn name(&self) -> &str {
        "Coinbase"
    }

    async fn fetch_balances(&self) -> Result<Balances> {
        let timestamp = Utc::now().timestamp().to_string();
        let message = format!("{timestamp}GET{ACCOUNTS_PATH}");
        let signature =
            hmac_sha256_hex(self.credentials.secret.as_bytes(), message.as_bytes())?;

        let response = self
            .client
            .get(format!("{}{}", self.base_url, ACCOUNTS_PATH))
            .header("CB-ACCESS-KEY", &self.credentials.key)
            .header("CB-ACCESS-SIGN", signature)
            .header("CB-ACCESS-TIMESTAMP", timestamp)
            .header("CB-VERSION", CB_VERSION)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Coinbase API error: {} - {}", status, body));
        }

        let accounts: AccountsResponse = response.json().await?;
        parse_balances(accounts.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RESPONSE: &str = r#"{
        "pagination": { "next_uri": null },
        "data": [
            {
                "id": "58542935-67b5-56e1-a3f9-42686e07fa40",
                "name": "BTC Wallet",
                "type": "wallet",
                "balance": { "amount": "0.30000000", "currency": "BTC" }
            },
            {
                "id": "2bbf394c-193b-5b2a-9155-3b4732659ede",
                "name": "BTC Vault",
                "type": "vault",
                "balance": { "amount": "1.00000000", "currency": "BTC" }
            },
            {
                "id": "1c1cfeb9-0f7d-5bd5-9db4-94b0732e6899",
                "name": "ETH Wallet",
                "type": "wallet",
                "balance": { "amount": "0.00000000", "currency": "ETH" }
            }
        ]
    }"#;

    #[test]
    fn sums_wallets_of_the_same_currency() {
        let response: AccountsResponse = serde_json::from_str(SAMPLE_RESPONSE).unwrap();
        let balances = parse_balances(response.data).unwrap();

        assert_eq!(balances["BTC"], 1.3);
        assert_eq!(balances["ETH"], 0.0);
    }

    #[test]
    fn unparseable_amount_is_an_error() {
        let accounts = vec![Account {
            balance: AccountBalance {
                amount: "none".to_string(),
                currency: "BTC".to_string(),
            },
        }];
        assert!(parse_balances(accounts).is_err());
    }

    #[test]
    fn adapter_name() {
        let adapter = CoinbaseWalletAdapter::new(ApiCredentials::default());
        assert_eq!(adapter.name(), "Coinbase");
    }
}
