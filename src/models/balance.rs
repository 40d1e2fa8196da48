use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Symbol -> amount, as reported by one exchange.
///
/// Amounts are plain floats: exchanges report fractional and occasionally
/// negative balances (margin positions), and nothing downstream does ledger
/// arithmetic with them.
pub type Balances = HashMap<String, f64>;

/// One exchange's balance snapshot.
///
/// Always belongs to exactly one exchange; snapshots are merged into a
/// currency table later, never at this level. This is also the value
/// persisted in the cache, keyed by adapter key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSet {
    pub exchange_name: String,
    pub balances: Balances,
}

impl BalanceSet {
    pub fn new(exchange_name: impl Into<String>, balances: Balances) -> Self {
        Self {
            exchange_name: exchange_name.into(),
            balances,
        }
    }
}
