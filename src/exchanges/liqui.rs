//! Liqui balance adapter.
//!
//! Same signing scheme as Poloniex: a form-encoded POST with Key/Sign
//! headers, the signature an HMAC-SHA512 of the body. Funds come back as a
//! lowercase symbol map under `return.funds` and are uppercased here.

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use chrono::Utc;
use serde::Deserialize;

use crate::config::ApiCredentials;
use crate::models::Balances;

use super::signing::hmac_sha512_hex;
use super::ExchangeAdapter;

const LIQUI_API_BASE: &str = "https://api.liqui.io";

#[derive(Debug, Deserialize)]
struct InfoResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(rename = "return")]
    payload: Option<InfoPayload>,
}

#[derive(Debug, Deserialize)]
struct InfoPayload {
    funds: HashMap<String, f64>,
}

pub struct LiquiAdapter {
    client: reqwest::Client,
    credentials: ApiCredentials,
    base_url: String,
}

impl LiquiAdapter {
    pub fn new(credentials: ApiCredentials) -> Self {
        Self {
            client: reqwest::Client::new(),
            credentials,
            base_url: LIQUI_API_BASE.to_string(),
        }
    }

    /// Overrides the API base URL (for tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

fn parse_balances(response: InfoResponse) -> Result<Balances> {
    if let Some(message) = response.error {
        return Err(anyhow!("Liqui API error: {message}"));
    }

    let payload = response
        .payload
        .ok_or_else(|| anyhow!("Liqui response carried neither funds nor an error"))?;

    Ok(payload
        .funds
        .into_iter()
        .map(|(symbol, amount)| (symbol.to_uppercase(), amount))
        .collect())
}

#[async_trait::async_trait]
impl ExchangeAdapter for LiquiAdapter {
    fn name(&self) -> &str {
        "Liqui"
    }

    async fn fetch_balances(&self) -> Result<Balances> {
        let nonce = Utc::now().timestamp();
        let body = format!("method=getInfo&nonce={nonce}");
        let signature = hmac_sha512_hex(self.credentials.secret.as_bytes(), body.as_bytes())?;

        let response = self
            .client
            .post(format!("{}/tapi", self.base_url))
            .header("Key", &self.credentials.key)
            .header("Sign", signature)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Liqui API error: {} - {}", status, body));
        }

        let data: InfoResponse = response.json().await?;
        parse_balances(data)
    }
}
