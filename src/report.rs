//! Valuation and presentation of the merged balance matrix.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt::Write as _;

use anyhow::{Context, Result};

use crate::merge::MergedMatrix;

/// Tokens worth at least this much (USD) land in the high-value tier.
pub const HIGH_VALUE_USD: f64 = 500.0;
/// Tokens worth at least this much (USD) land in the mid-value tier.
pub const MID_VALUE_USD: f64 = 20.0;

/// One currency's holdings valued in USD.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenValue {
    pub symbol: String,
    pub amount: f64,
    pub usd_value: f64,
}

/// USD view of a merged matrix, bucketed by value tier.
#[derive(Debug, Clone, Default)]
pub struct Valuation {
    pub high_value: Vec<TokenValue>,
    pub mid_value: Vec<TokenValue>,
    pub low_value: Vec<TokenValue>,
    /// (exchange, USD total) in column order; the total column is excluded.
    pub usd_by_exchange: Vec<(String, f64)>,
    pub usd_total: f64,
}

impl Valuation {
    /// Value the matrix using the given symbol -> USD quote map.
    ///
    /// Symbols missing from the quote map are valued at 0 (the quote
    /// source is expected to have zero-filled and warned already).
    pub fn compute(matrix: &MergedMatrix, quotes: &HashMap<String, f64>) -> Self {
        let mut valuation = Valuation::default();

        for currency in matrix.currencies() {
            let quote = quotes.get(currency).copied().unwrap_or(0.0);
            let amount = matrix.total(currency);
            let token = TokenValue {
                symbol: currency.to_string(),
                amount,
                usd_value: amount * quote,
            };

            if token.usd_value >= HIGH_VALUE_USD {
                valuation.high_value.push(token);
            } else if token.usd_value >= MID_VALUE_USD {
                valuation.mid_value.push(token);
            } else {
                valuation.low_value.push(token);
            }
        }

        for exchange in matrix.exchange_columns() {
            let total: f64 = matrix
                .currencies()
                .map(|currency| {
                    let quote = quotes.get(currency).copied().unwrap_or(0.0);
                    matrix.amount(currency, exchange) * quote
                })
                .sum();
            valuation.usd_by_exchange.push((exchange.clone(), total));
        }

        valuation.usd_total = valuation.usd_by_exchange.iter().map(|(_, usd)| usd).sum();
        valuation
    }
}

fn render_tier(out: &mut String, label: &str, tokens: &[TokenValue]) {
    let _ = writeln!(out, "{label}");
    for token in tokens {
        let _ = writeln!(
            out,
            "{:>15}: {:>11.2} = ${:>9.2}",
            token.symbol, token.amount, token.usd_value
        );
    }
    let _ = writeln!(out);
}

/// Render the tiered token report plus per-exchange USD totals.
pub fn render_report(valuation: &Valuation) -> String {
    let mut out = String::new();

    render_tier(&mut out, "HIGH VALUE", &valuation.high_value);
    render_tier(&mut out, "MID VALUE", &valuation.mid_value);
    render_tier(&mut out, "LOW VALUE", &valuation.low_value);

    for (exchange, usd) in &valuation.usd_by_exchange {
        let _ = writeln!(out, "{exchange:>15}: {usd:.2}");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "{:>15}: {:.2}", "TOTAL", valuation.usd_total);

    out
}

/// Serialize the matrix as delimited text, one row per currency.
///
/// Rows are sorted by symbol; `required_rows` are always present, even
/// with no balances anywhere. Zero-total rows are skipped when
/// `exclude_zeros` unless required. A tab delimiter makes the output easy
/// to paste into a spreadsheet.
pub fn write_csv(
    matrix: &MergedMatrix,
    exclude_zeros: bool,
    required_rows: &HashSet<String>,
    delimiter: u8,
) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    let mut header = vec!["Currency".to_string()];
    header.extend(matrix.columns().iter().cloned());
    writer.write_record(&header)?;

    let currencies: BTreeSet<String> = matrix
        .currencies()
        .map(str::to_string)
        .chain(required_rows.iter().cloned())
        .collect();

    for currency in currencies {
        if matrix.total(&currency) == 0.0
            && exclude_zeros
            && !required_rows.contains(&currency)
        {
            continue;
        }

        let mut record = vec![currency.clone()];
        record.extend(
            matrix
                .columns()
                .iter()
                .map(|column| matrix.amount(&currency, column).to_string()),
        );
        writer.write_record(&record)?;
    }

    let bytes = writer
        .into_inner()
        .context("failed to flush CSV output")?;
    String::from_utf8(bytes).context("CSV output was not valid UTF-8")
}
