//! Bridging product family: Bridge/Fusion eligibility, representative-row
//! selection, and loan economics.

mod best_match;
pub mod economics;
mod filter;

pub use best_match::{pick_best, BucketMetric};
pub use filter::{loan_ltv, loan_size, match_bridge, match_fusion, BridgingSelection};
