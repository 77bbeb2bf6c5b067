//! Buy-to-let product family: eligibility filter and loan economics.

pub mod economics;
mod filter;

pub use filter::{fee_column_key, match_rates, BtlSelection};
