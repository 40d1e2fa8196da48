//! Poloniex balance adapter.
//!
//! Uses the legacy trading API: a form-encoded POST signed with
//! HMAC-SHA512 of the request body. The balances response is a flat map of
//! symbol to stringified amount.

use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;

use crate::config::ApiCredentials;
use crate::models::Balances;

use super::signing::hmac_sha512_hex;
use super::ExchangeAdapter;

const POLONIEX_API_BASE: &str = "https://poloniex.com";

pub struct PoloniexAdapter {
    client: reqwest::Client,
    credentials: ApiCredentials,
    base_url: String,
}

impl PoloniexAdapter {
    pub fn new(credentials: ApiCredentials) -> Self {
        Self {
            client: reqwest::Client::new(),
            credentials,
            base_url: POLONIEX_API_BASE.to_string(),
        }
    }

    /// Overrides the API base URL (for tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

fn parse_balances(data: HashMap<String, String>) -> Result<Balances> {
    if let Some(message) = data.get("error") {
        return Err(anyhow!("Poloniex API error: {message}"));
    }

    let mut balances = Balances::with_capacity(data.len());
    for (symbol, amount) in data {
        let amount: f64 = amount
            .parse()
            .with_context(|| format!("unparseable Poloniex balance for {symbol}: {amount:?}"))?;
        balances.insert(symbol, amount);
    }
    Ok(balances)
}

#[async_trait::async_trait]
impl ExchangeAdapter for PoloniexAdapter {
    fn name(&self) -> &str {
        "Poloniex"
    }

    async fn fetch_balances(&self) -> Result<Balances> {
        let nonce = Utc::now().timestamp_millis();
        let body = format!("command=returnBalances&nonce={nonce}");
        let signature = hmac_sha512_hex(self.credentials.secret.as_bytes(), body.as_bytes())?;

        let response = self
            .client
            .post(format!("{}/tradingApi", self.base_url))
            .header("Key", &self.credentials.key)
            .header("Sign", signature)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Poloniex API error: {} - {}", status, body));
        }

        let data: HashMap<String, String> = response.json().await?;
        parse_balances(data)
    }
}
