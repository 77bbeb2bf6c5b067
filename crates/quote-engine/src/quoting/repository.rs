use serde::{Deserialize, Serialize};

use super::domain::{CalculatedRate, LoanParams};
use std::collections::BTreeMap;

/// Identifier wrapper for persisted quotes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteReference(pub String);

/// Which calculator family produced a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteKind {
    Btl,
    Bridging,
}

/// Lifecycle of a saved quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    Draft,
    Issued,
}

impl QuoteStatus {
    pub const fn label(self) -> &'static str {
        match self {
            QuoteStatus::Draft => "draft",
            QuoteStatus::Issued => "issued",
        }
    }
}

/// Repository record: the inputs snapshot plus every calculated rate, in
/// the fixed field shape the persistence layer expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRecord {
    pub reference: QuoteReference,
    pub kind: QuoteKind,
    pub status: QuoteStatus,
    pub tier: u32,
    pub params: LoanParams,
    /// Criteria answers as selected (question key -> option label).
    pub answers: BTreeMap<String, String>,
    /// Broker commission captured with the quote, already clamped to the
    /// route's tolerated window.
    pub broker_commission_percent: Option<f64>,
    /// Maximum LTV indicator shown alongside the results.
    pub max_available_ltv: f64,
    pub results: Vec<CalculatedRate>,
}

impl QuoteRecord {
    pub fn summary_view(&self) -> QuoteSummaryView {
        QuoteSummaryView {
            reference: self.reference.clone(),
            kind: self.kind,
            status: self.status.label(),
            tier: self.tier,
            product_count: self.results.len(),
        }
    }
}

/// Sanitized listing entry for API and demo output.
#[derive(Debug, Clone, Serialize)]
pub struct QuoteSummaryView {
    pub reference: QuoteReference,
    pub kind: QuoteKind,
    pub status: &'static str,
    pub tier: u32,
    pub product_count: usize,
}

/// Storage abstraction so the quote service can be exercised in isolation.
pub trait QuoteRepository: Send + Sync {
    fn insert(&self, record: QuoteRecord) -> Result<QuoteRecord, RepositoryError>;
    fn update(&self, record: QuoteRecord) -> Result<(), RepositoryError>;
    fn fetch(&self, reference: &QuoteReference) -> Result<Option<QuoteRecord>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("quote already exists")]
    Conflict,
    #[error("quote not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
