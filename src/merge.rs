//! Folds per-exchange balance sets into a currency x exchange matrix.

use std::collections::{BTreeMap, HashMap};

use crate::models::BalanceSet;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MergeError {
    /// Two balance sets for the same exchange in one merge call. At most
    /// one set per exchange is expected per run; this is a caller bug, not
    /// a runtime condition, and is never silently recovered.
    #[error("duplicate balance set for exchange: {0}")]
    DuplicateExchange(String),

    /// An exchange named like the total column would overwrite the
    /// accumulated totals for every currency it holds.
    #[error("exchange name collides with the total column label: {0}")]
    TotalColumnCollision(String),
}

/// Currency x exchange table with per-currency totals.
///
/// Rows are keyed by currency symbol (sorted); columns are the exchange
/// names that contributed any currency, sorted alphabetically, with the
/// total column appended last. Cells absent from the underlying data read
/// as 0.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedMatrix {
    rows: BTreeMap<String, HashMap<String, f64>>,
    columns: Vec<String>,
    total_column: String,
}

impl MergedMatrix {
    /// Currency symbols in sorted order.
    pub fn currencies(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    /// Column labels: sorted exchange names, then the total column.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn total_column(&self) -> &str {
        &self.total_column
    }

    /// Exchange columns only (everything but the total column).
    pub fn exchange_columns(&self) -> &[String] {
        &self.columns[..self.columns.len() - 1]
    }

    /// Amount for a cell, defaulting to 0 for absent entries.
    pub fn amount(&self, currency: &str, column: &str) -> f64 {
        self.rows
            .get(currency)
            .and_then(|row| row.get(column))
            .copied()
            .unwrap_or(0.0)
    }

    /// Per-currency total across all exchanges.
    pub fn total(&self, currency: &str) -> f64 {
        self.amount(currency, &self.total_column)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of currency rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Merge balance sets and calculate per-currency totals.
pub fn merge(sets: &[BalanceSet], total_column: &str) -> Result<MergedMatrix, MergeError> {
    let mut rows: BTreeMap<String, HashMap<String, f64>> = BTreeMap::new();
    let mut columns: Vec<String> = Vec::new();

    for set in sets {
        if set.exchange_name == total_column {
            return Err(MergeError::TotalColumnCollision(set.exchange_name.clone()));
        }
        if columns.contains(&set.exchange_name) {
            return Err(MergeError::DuplicateExchange(set.exchange_name.clone()));
        }

        for (currency, amount) in &set.balances {
            let row = rows.entry(currency.clone()).or_default();
            row.insert(set.exchange_name.clone(), *amount);
            *row.entry(total_column.to_string()).or_insert(0.0) += amount;
        }
        columns.push(set.exchange_name.clone());
    }

    columns.sort();
    columns.push(total_column.to_string());

    Ok(MergedMatrix {
        rows,
        columns,
        total_column: total_column.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Balances;

    fn set(name: &str, entries: &[(&str, f64)]) -> BalanceSet {
        let balances: Balances = entries
            .iter()
            .map(|(symbol, amount)| (symbol.to_string(), *amount))
            .collect();
        BalanceSet::new(name, balances)
    }

    #[test]
    fn merges_two_exchanges_with_totals() {
        let sets = vec![
            set("X", &[("BTC", 1.0)]),
            set("Y", &[("BTC", 2.0), ("ETH", 1.0)]),
        ];

        let matrix = merge(&sets, "Total").unwrap();

        assert_eq!(matrix.amount("BTC", "X"), 1.0);
        assert_eq!(matrix.amount("BTC", "Y"), 2.0);
        assert_eq!(matrix.amount("BTC", "Total"), 3.0);
        assert_eq!(matrix.amount("ETH", "Y"), 1.0);
        assert_eq!(matrix.amount("ETH", "Total"), 1.0);
        // ETH absent from X reads as zero.
        assert_eq!(matrix.amount("ETH", "X"), 0.0);
        assert_eq!(matrix.columns(), &["X", "Y", "Total"]);
    }

    #[test]
    fn columns_sort_alphabetically_with_total_last() {
        let sets = vec![
            set("Poloniex", &[("BTC", 1.0)]),
            set("Bittrex", &[("BTC", 1.0)]),
            set("Coinbase Exchange", &[("BTC", 1.0)]),
        ];

        let matrix = merge(&sets, "Total").unwrap();
        assert_eq!(
            matrix.columns(),
            &["Bittrex", "Coinbase Exchange", "Poloniex", "Total"]
        );
        assert_eq!(
            matrix.exchange_columns(),
            &["Bittrex", "Coinbase Exchange", "Poloniex"]
        );
    }

    #[test]
    fn single_exchange_currency_still_gets_total() {
        let matrix = merge(&[set("X", &[("XLM", 42.0)])], "Total").unwrap();
        assert_eq!(matrix.total("XLM"), 42.0);
    }

    #[test]
    fn duplicate_exchange_is_an_integrity_error() {
        let sets = vec![set("X", &[("BTC", 1.0)]), set("X", &[("ETH", 1.0)])];
        assert_eq!(
            merge(&sets, "Total"),
            Err(MergeError::DuplicateExchange("X".to_string()))
        );
    }

    #[test]
    fn exchange_named_like_the_total_column_is_rejected() {
        let sets = vec![set("X", &[("BTC", 1.0)]), set("Total", &[("BTC", 2.0)])];
        assert_eq!(
            merge(&sets, "Total"),
            Err(MergeError::TotalColumnCollision("Total".to_string()))
        );
        // Renaming the total label clears the collision.
        assert!(merge(&sets, "Sum").is_ok());
    }

    #[test]
    fn empty_input_yields_empty_matrix() {
        let matrix = merge(&[], "Total").unwrap();
        assert!(matrix.is_empty());
        assert_eq!(matrix.len(), 0);
        assert_eq!(matrix.columns(), &["Total"]);
        assert!(matrix.exchange_columns().is_empty());
    }

    #[test]
    fn negative_amounts_accumulate() {
        let sets = vec![set("X", &[("BTC", -1.5)]), set("Y", &[("BTC", 2.0)])];
        let matrix = merge(&sets, "Total").unwrap();
        assert!((matrix.total("BTC") - 0.5).abs() < 1e-12);
    }

    #[test]
    fn custom_total_label_is_used() {
        let matrix = merge(&[set("X", &[("BTC", 1.0)])], "Subtotal").unwrap();
        assert_eq!(matrix.total_column(), "Subtotal");
        assert_eq!(matrix.amount("BTC", "Subtotal"), 1.0);
        assert_eq!(matrix.columns(), &["X", "Subtotal"]);
    }

    #[test]
    fn currencies_iterate_sorted() {
        let matrix = merge(
            &[set("X", &[("ETH", 1.0), ("BTC", 1.0), ("XLM", 1.0)])],
            "Total",
        )
        .unwrap();
        let currencies: Vec<&str> = matrix.currencies().collect();
        assert_eq!(currencies, vec!["BTC", "ETH", "XLM"]);
    }
}
