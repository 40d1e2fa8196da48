mod coinmarketcap;

pub use coinmarketcap::CoinMarketCapQuotes;

use std::collections::HashMap;

use anyhow::Result;

/// Resolves currency symbols to USD unit prices.
///
/// Implementations return an entry for every requested symbol: symbols the
/// upstream service does not recognize or price are zero-filled and logged
/// as warnings, never a hard failure. A missing price must never sink the
/// whole report.
#[async_trait::async_trait]
pub trait QuoteSource: Send + Sync {
    async fn get_quotes(&self, symbols: &[String]) -> Result<HashMap<String, f64>>;

    fn name(&self) -> &str;
}
