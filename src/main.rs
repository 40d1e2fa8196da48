use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cointab::aggregator::{BalanceAggregator, NormalizeOptions};
use cointab::cache::JsonFileCache;
use cointab::config::{default_config_path, Config};
use cointab::exchanges::ExchangeRegistry;
use cointab::merge::merge;
use cointab::quotes::{CoinMarketCapQuotes, QuoteSource};
use cointab::report::{render_report, write_csv, Valuation};

#[derive(Parser)]
#[command(name = "cointab")]
#[command(about = "Aggregate account balances across cryptocurrency exchanges")]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the balance table as tab-separated values instead of the
    /// valuation report (no quote lookups).
    #[arg(long)]
    csv: bool,

    /// Which exchanges to refetch, ignoring the cache: omit to use the
    /// cache everywhere, `all` to refetch everything, or a comma-separated
    /// list of exchange keys (e.g. `polo,trex`).
    refresh: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the resolved configuration.
    Config,
}

/// Translate the refresh argument into a cache bypass set.
fn bypass_keys(refresh: Option<&str>, configured: &[String]) -> Vec<String> {
    match refresh {
        None => Vec::new(),
        Some("all") => configured.to_vec(),
        Some(list) => list
            .split(',')
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .collect(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(default_config_path);
    let config = Config::load_or_default(&config_path)?;
    let config_dir = config_path.parent().unwrap_or_else(|| Path::new(""));
    let cache_file = config.resolve_cache_file(config_dir);

    if let Some(Command::Config) = cli.command {
        print!(
            "{}",
            toml::to_string_pretty(&config).context("failed to render configuration")?
        );
        return Ok(());
    }

    if config.exchanges.is_empty() {
        warn!(config = %config_path.display(), "no exchanges configured");
    }

    let bypass = bypass_keys(cli.refresh.as_deref(), &config.exchanges);
    let cache = JsonFileCache::new(&cache_file, bypass);
    let registry = ExchangeRegistry::from_config(&config);
    let aggregator = BalanceAggregator::new(
        registry,
        Box::new(cache),
        NormalizeOptions::from_config(&config),
    );

    let (sets, failures) = aggregator.get_data(&config.exchanges).await;
    if !failures.is_empty() {
        warn!(
            failed = failures.len(),
            exchanges = %failures.iter().map(|f| f.key.as_str()).collect::<Vec<_>>().join(", "),
            "some exchanges were skipped"
        );
    }

    let exchange_count = sets.len();
    let matrix = merge(&sets, &config.total_column)?;

    if matrix.is_empty() {
        bail!(
            "did not find any balances; configure `exchanges` in {} or check the warnings above",
            config_path.display()
        );
    }

    info!(
        currencies = matrix.len(),
        exchanges = exchange_count,
        "retrieved balances"
    );

    let required_rows = config.required_rows.iter().cloned().collect();

    if cli.csv {
        print!(
            "{}",
            write_csv(&matrix, config.exclude_zeros, &required_rows, b'\t')?
        );
        return Ok(());
    }

    let symbols: Vec<String> = matrix.currencies().map(str::to_string).collect();
    let quote_source = CoinMarketCapQuotes::new(&config.quotes.api_key);
    let quotes = quote_source.get_quotes(&symbols).await?;

    let valuation = Valuation::compute(&matrix, &quotes);
    print!("{}", render_report(&valuation));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> Vec<String> {
        vec!["polo".to_string(), "trex".to_string()]
    }

    #[test]
    fn no_argument_bypasses_nothing() {
        assert!(bypass_keys(None, &configured()).is_empty());
    }

    #[test]
    fn all_bypasses_every_configured_exchange() {
        assert_eq!(bypass_keys(Some("all"), &configured()), configured());
    }

    #[test]
    fn list_bypasses_only_named_exchanges() {
        assert_eq!(
            bypass_keys(Some("polo,cb"), &configured()),
            vec!["polo".to_string(), "cb".to_string()]
        );
    }

    #[test]
    fn list_tolerates_spaces_and_empty_entries() {
        assert_eq!(
            bypass_keys(Some(" polo , ,trex"), &configured()),
            vec!["polo".to_string(), "trex".to_string()]
        );
    }
}
