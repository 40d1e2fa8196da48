//! Bittrex balance adapter.
//!
//! v1.1 API: the API key and a nonce ride in the query string and the
//! `apisign` header carries an HMAC-SHA512 of the complete request URL.

use anyhow::{anyhow, Result};
use chrono::Utc;
use serde::Deserialize;

use crate::config::ApiCredentials;
use crate::models::Balances;

use super::signing::hmac_sha512_hex;
use super::ExchangeAdapter;

const BITTREX_API_BASE: &str = "https://bittrex.com";

#[derive(Debug, Deserialize)]
struct BalancesResponse {
    success: bool,
    #[serde(default)]
    message: String,
    // Null on failure responses.
    result: Option<Vec<BalanceEntry>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BalanceEntry {
    currency: String,
    #[serde(default)]
    balance: f64,
}

pub struct BittrexAdapter {
    client: reqwest::Client,
    credentials: ApiCredentials,
    base_url: String,
}

impl BittrexAdapter {
    pub fn new(credentials: ApiCredentials) -> Self {
        Self {
            client: reqwest::Client::new(),
            credentials,
            base_url: BITTREX_API_BASE.to_string(),
        }
    }

    /// Overrides the API base URL (for tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

fn parse_balances(response: BalancesResponse) -> Result<Balances> {
    if !response.success {
        return Err(anyhow!("Bittrex request failed: {}", response.message));
    }

    Ok(response
        .result
        .unwrap_or_default()
        .into_iter()
        .map(|entry| (entry.currency, entry.balance))
        .collect())
}

#[async_trait::async_trait]
impl ExchangeAdapter for BittrexAdapter {
    fn name(&self) -> &str {
        "Bittrex"
    }

    async fn fetch_balances(&self) -> Result<Balances> {
        let nonce = Utc::now().timestamp_millis();
        let url = format!(
            "{}/api/v1.1/account/getbalances?apikey={}&nonce={}",
            self.base_url, self.credentials.key, nonce
        );
        let signature = hmac_sha512_hex(self.credentials.secret.as_bytes(), url.as_bytes())?;

        let response = self
            .client
            .get(&url)
            .header("apisign", signature)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Bittrex API error: {} - {}", status, body));
        }

        let data: BalancesResponse = response.json().await?;
        parse_balances(data)
    }
}
