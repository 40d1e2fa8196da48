//! CoinMarketCap quote source.
//!
//! Uses the pro API's `quotes/latest` endpoint. The API rejects whole
//! requests containing any unrecognized symbol, so those are stripped out
//! and the request retried once; unrecognized and silently-omitted symbols
//! are zero-filled with a warning.

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use serde::Deserialize;
use tracing::warn;

use super::QuoteSource;

const CMC_API_BASE: &str = "https://pro-api.coinmarketcap.com/v1";
const QUOTES_PATH: &str = "/cryptocurrency/quotes/latest";
const SYMBOL_ERROR_PREFIX: &str = "Invalid values for \"symbol\": ";

#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: ApiStatus,
    #[serde(default)]
    data: HashMap<String, CoinData>,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CoinData {
    quote: HashMap<String, QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    price: Option<f64>,
}

enum FetchError {
    /// The API rejected the whole request over these symbols.
    InvalidSymbols(Vec<String>),
    Other(anyhow::Error),
}

pub struct CoinMarketCapQuotes {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl CoinMarketCapQuotes {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: CMC_API_BASE.to_string(),
        }
    }

    /// Overrides the API base URL (for tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch(&self, symbols: &[String]) -> Result<HashMap<String, CoinData>, FetchError> {
        let url = format!("{}{}", self.base_url, QUOTES_PATH);
        let symbol_list = symbols.join(",");
        let response = self
            .client
            .get(&url)
            .query(&[("convert", "USD"), ("symbol", symbol_list.as_str())])
            .header("Accept", "application/json")
            .header("X-CMC_PRO_API_KEY", &self.api_key)
            .send()
            .await
            .map_err(|e| FetchError::Other(e.into()))?;

        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Other(e.into()))?;

        match body.status.error_message {
            None => Ok(body.data),
            Some(message) => match parse_invalid_symbols(&message) {
                Some(invalid) => Err(FetchError::InvalidSymbols(invalid)),
                None => Err(FetchError::Other(anyhow!(
                    "CoinMarketCap error: {message}"
                ))),
            },
        }
    }
}

/// Extract the rejected symbols from an invalid-symbol error message,
/// which looks like: `Invalid values for "symbol": "BTV,CODY,EXTRA"`.
fn parse_invalid_symbols(message: &str) -> Option<Vec<String>> {
    let value = message.strip_prefix(SYMBOL_ERROR_PREFIX)?;
    Some(
        value
            .trim()
            .trim_matches('"')
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    )
}

fn usd_prices(data: HashMap<String, CoinData>) -> HashMap<String, f64> {
    data.into_iter()
        .filter_map(|(symbol, coin)| {
            let price = coin.quote.get("USD").and_then(|q| q.price)?;
            Some((symbol, price))
        })
        .collect()
}

#[async_trait::async_trait]
impl QuoteSource for CoinMarketCapQuotes {
    async fn get_quotes(&self, symbols: &[String]) -> Result<HashMap<String, f64>> {
        // USD is never sent upstream; it is the unit of account.
        let mut requested: Vec<String> =
            symbols.iter().filter(|s| *s != "USD").cloned().collect();

        let mut invalid_symbols: Vec<String> = Vec::new();

        let data = if requested.is_empty() {
            HashMap::new()
        } else {
            match self.fetch(&requested).await {
                Ok(data) => data,
                Err(FetchError::InvalidSymbols(invalid)) => {
                    requested.retain(|s| !invalid.contains(s));
                    invalid_symbols = invalid;

                    if requested.is_empty() {
                        HashMap::new()
                    } else {
                        match self.fetch(&requested).await {
                            Ok(data) => data,
                            Err(FetchError::InvalidSymbols(more)) => {
                                return Err(anyhow!(
                                    "CoinMarketCap still rejects symbols after retry: {}",
                                    more.join(", ")
                                ));
                            }
                            Err(FetchError::Other(e)) => return Err(e),
                        }
                    }
                }
                Err(FetchError::Other(e)) => return Err(e),
            }
        };

        let mut quotes = usd_prices(data);

        if !invalid_symbols.is_empty() {
            warn!(
                symbols = %invalid_symbols.join(", "),
                "CoinMarketCap does not recognize these symbols, valuing at 0"
            );
            for symbol in invalid_symbols {
                quotes.insert(symbol, 0.0);
            }
        }

        quotes.entry("USD".to_string()).or_insert(1.0);

        // The API sometimes omits data even for recognized symbols.
        let missing: Vec<String> = symbols
            .iter()
            .filter(|s| !quotes.contains_key(*s))
            .cloned()
            .collect();
        if !missing.is_empty() {
            warn!(
                symbols = %missing.join(", "),
                "CoinMarketCap returned no quotes for these symbols, valuing at 0"
            );
            for symbol in missing {
                quotes.insert(symbol, 0.0);
            }
        }

        Ok(quotes)
    }

    fn name(&self) -> &str {
        "coinmarketcap"
    }
}
