mod balance;

pub use balance::{BalanceSet, Balances};
