pub mod aggregator;
pub mod cache;
pub mod config;
pub mod exchanges;
pub mod merge;
pub mod models;
pub mod quotes;
pub mod report;
