//! Quote passes: eligibility filtering, economics, and the service facade.

pub mod bridging;
pub mod btl;
pub mod domain;
mod repository;
mod router;
mod service;

pub use domain::{
    CalculatedRate, ChargeType, FeeBasis, LoanParams, LoanType, MatchedRate, ProductRange,
    RetentionChoice, RetentionLtv,
};
pub use repository::{
    QuoteKind, QuoteRecord, QuoteReference, QuoteRepository, QuoteStatus, QuoteSummaryView,
    RepositoryError,
};
pub use router::quote_router;
pub use service::{QuoteRequest, QuoteService, QuoteServiceError};

use crate::catalog::normalize::{mentions_semi_commercial, normalize_text};

/// Scope comparison shared by both filters: normalized equality or
/// containment, with one carve-out — a "Commercial" selection never
/// matches semi-commercial rows, which price separately.
pub(crate) fn scope_matches(selected: &str, row_scope: &str) -> bool {
    let selected = normalize_text(selected);
    if selected.is_empty() {
        return true;
    }
    let row = normalize_text(row_scope);
    if selected == "commercial" {
        return row.contains("commercial") && !mentions_semi_commercial(&row);
    }
    row == selected || row.contains(&selected)
}

#[cfg(test)]
mod tests {
    use super::scope_matches;

    #[test]
    fn commercial_never_matches_semi_commercial() {
        assert!(scope_matches("Commercial", "Commercial"));
        assert!(scope_matches("Commercial", "commercial investment"));
        assert!(!scope_matches("Commercial", "Semi-Commercial"));
        assert!(!scope_matches("Commercial", "semi commercial"));
        assert!(!scope_matches("Commercial", "semi_commercial"));
    }

    #[test]
    fn other_scopes_match_by_containment() {
        assert!(scope_matches("Residential", "Residential"));
        assert!(scope_matches("Residential", "residential hmo"));
        assert!(scope_matches("Semi-Commercial", "Semi-Commercial"));
        assert!(!scope_matches("Residential", "Commercial"));
        assert!(scope_matches("", "anything"));
    }
}
