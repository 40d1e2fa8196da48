//! CoinEx balance adapter.
//!
//! Query parameters (in alphabetical order) plus the secret key are hashed
//! with MD5, and the uppercase digest rides in the `authorization` header.
//! Balances sum the available and frozen amounts per symbol.

use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use serde::Deserialize;

use crate::config::ApiCredentials;
use crate::models::Balances;

use super::signing::md5_hex_upper;
use super::ExchangeAdapter;

const COINEX_API_BASE: &str = "https://api.coinex.com";
// The API gateway rejects requests without a browser User-Agent.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 6.1; WOW64) \
                          AppleWebKit/537.36 (KHTML, like Gecko) \
                          Chrome/39.0.2171.71 Safari/537.36";

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: HashMap<String, AccountFunds>,
}

#[derive(Debug, Deserialize)]
struct AccountFunds {
    available: String,
    frozen: String,
}

pub struct CoinExAdapter {
    client: reqwest::Client,
    credentials: ApiCredentials,
    base_url: String,
}

impl CoinExAdapter {
    pub fn new(credentials: ApiCredentials) -> Self {
        Self {
            client: reqwest::Client::new(),
            credentials,
            base_url: COINEX_API_BASE.to_string(),
        }
    }

    /// Overrides the API base URL (for tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

fn parse_balances(response: BalanceResponse) -> Result<Balances> {
    if response.code != 0 {
        return Err(anyhow!(
            "CoinEx API error {}: {}",
            response.code,
            response.message
        ));
    }

    let mut balances = Balances::with_capacity(response.data.len());
    for (symbol, funds) in response.data {
        let available: f64 = funds.available.parse().with_context(|| {
            format!(
                "unparseable CoinEx balance for {symbol}: {:?}",
                funds.available
            )
        })?;
        let frozen: f64 = funds.frozen.parse().with_context(|| {
            format!("unparseable CoinEx balance for {symbol}: {:?}", funds.frozen)
        })?;
        balances.insert(symbol, available + frozen);
    }
    Ok(balances)
}

#[async_trait::async_trait]
impl ExchangeAdapter for CoinExAdapter {
    fn name(&self) -> &str {
        "CoinEx"
    }

    async fn fetch_balances(&self) -> Result<Balances> {
        let tonce = Utc::now().timestamp_millis();
        // Parameters must stay in alphabetical order for the signature.
        let params = format!("access_id={}&tonce={}", self.credentials.key, tonce);
        let digest = md5_hex_upper(
            format!("{params}&secret_key={}", self.credentials.secret).as_bytes(),
        );

        let response = self
            .client
            .get(format!("{}/v1/balance?{}", self.base_url, params))
            .header("User-Agent", USER_AGENT)
            .header("authorization", digest)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("CoinEx API error: {} - {}", status, body));
        }

        let data: BalanceResponse = response.json().await?;
        parse_balances(data)
    }
}
