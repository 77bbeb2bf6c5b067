//! Buy-to-let eligibility filter.
//!
//! Applies the per-row policy (tier, product, scope, retention/LTV gate)
//! to the active catalog, then deduplicates, orders by rate, and applies
//! the fee-column filter resolved from the pricing overlay.

use crate::catalog::normalize::{first_digit_run, normalize_text, normalize_token};
use crate::catalog::{ProductFamily, RateRow};
use crate::overlay::PricingOverlay;
use crate::quoting::domain::{
    LoanParams, MatchedRate, ProductRange, RetentionChoice, RetentionLtv,
};
use crate::quoting::scope_matches;
use std::collections::HashSet;

/// Resolved selection state for one BTL matching pass.
#[derive(Debug, Clone, PartialEq)]
pub struct BtlSelection {
    pub tier: u32,
    pub scope: String,
    pub product_type: String,
    pub retention: RetentionChoice,
    pub retention_ltv: RetentionLtv,
    pub range: ProductRange,
    /// Criteria flag: the security is a flat above a commercial unit.
    pub flat_above_commercial: bool,
}

impl BtlSelection {
    pub fn from_params(params: &LoanParams, tier: u32, flat_above_commercial: bool) -> Self {
        Self {
            tier,
            scope: params.product_scope.clone(),
            product_type: params.product_type.clone(),
            retention: params.retention_choice,
            retention_ltv: params.retention_ltv,
            range: params.selected_range,
            flat_above_commercial,
        }
    }
}

/// Filter the catalog into ordered, deduplicated matched rates.
///
/// An empty product type is the defined no-selection state and yields an
/// empty result regardless of catalog size.
pub fn match_rates(
    rows: &[RateRow],
    selection: &BtlSelection,
    overlay: &PricingOverlay,
) -> Vec<MatchedRate> {
    if selection.product_type.trim().is_empty() {
        return Vec::new();
    }

    let mut matched: Vec<MatchedRate> = rows
        .iter()
        .filter(|row| row.family == ProductFamily::Btl)
        .filter(|row| tier_matches(row, selection.tier))
        .filter(|row| product_matches(&selection.product_type, &row.product))
        .filter(|row| scope_matches(&selection.scope, &row.scope))
        .filter(|row| passes_retention_and_ltv(row, selection, overlay))
        .cloned()
        .collect();

    dedupe_in_place(&mut matched);
    sort_by_rate(&mut matched);

    let column_key = fee_column_key(selection);
    let allowed = overlay.active_fee_columns(&column_key, &selection.scope);
    matched.retain(|row| match row.product_fee_percent {
        Some(fee) => allowed.iter().any(|column| (column - fee).abs() < 1e-9),
        None => true,
    });

    matched
}

/// Numeric tier comparison with a case-insensitive string fallback for
/// rows whose tier text carries no digits.
fn tier_matches(row: &RateRow, tier: u32) -> bool {
    match row.tier_value() {
        Some(row_tier) => row_tier == tier,
        None => normalize_text(&row.tier) == tier.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProductKind {
    Fix,
    Tracker,
    Variable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ProductTokens {
    years: Option<u32>,
    kind: Option<ProductKind>,
}

fn parse_product(raw: &str) -> ProductTokens {
    let text = normalize_text(raw);
    let kind = if text.contains("track") {
        Some(ProductKind::Tracker)
    } else if text.contains("fix") {
        Some(ProductKind::Fix)
    } else if text.contains("variable") {
        Some(ProductKind::Variable)
    } else {
        None
    };
    ProductTokens {
        years: first_digit_run(&text),
        kind,
    }
}

/// Token-based product comparison: when both sides carry a term the terms
/// must agree, when both carry a family the families must agree. A
/// selection that parses neither token degrades to normalized substring
/// containment in either direction.
fn product_matches(selected: &str, row_product: &str) -> bool {
    let sel = parse_product(selected);
    let row = parse_product(row_product);

    if sel.years.is_none() && sel.kind.is_none() {
        let norm_sel = normalize_token(selected);
        let norm_row = normalize_token(row_product);
        return norm_row == norm_sel
            || norm_row.contains(&norm_sel)
            || norm_sel.contains(&norm_row);
    }

    if let (Some(a), Some(b)) = (sel.years, row.years) {
        if a != b {
            return false;
        }
    }
    if let (Some(a), Some(b)) = (sel.kind, row.kind) {
        if a != b {
            return false;
        }
    }
    true
}

/// Retention and LTV gate. The flat-above-commercial override takes
/// precedence when its scope matcher and criteria flag line up; otherwise
/// the standard retention policy applies.
fn passes_retention_and_ltv(
    row: &RateRow,
    selection: &BtlSelection,
    overlay: &PricingOverlay,
) -> bool {
    let flat_rule = &overlay.flat_above_commercial;
    if selection.flat_above_commercial && flat_rule.matches_scope(&selection.scope) {
        return flat_rule.row_passes(selection.tier, row.max_ltv);
    }

    match selection.retention {
        RetentionChoice::Yes => {
            if !row.is_retention {
                return false;
            }
            // A retention row without a usable max LTV cannot be bracketed.
            let max_ltv = match row.max_ltv {
                Some(value) if value.is_finite() && value > 0.0 => value,
                _ => return false,
            };
            match selection.retention_ltv {
                RetentionLtv::Max65 => max_ltv <= 65.0,
                RetentionLtv::Max75 => max_ltv > 65.0 && max_ltv <= 75.0,
            }
        }
        RetentionChoice::No => !row.is_retention,
    }
}

fn dedupe_in_place(rows: &mut Vec<MatchedRate>) {
    let mut seen = HashSet::new();
    rows.retain(|row| seen.insert(row.identity_key()));
}

/// Ascending numeric rate; rows without a numeric rate fall back to a
/// lexical comparison of the raw text.
fn sort_by_rate(rows: &mut [MatchedRate]) {
    rows.sort_by(|a, b| match (a.rate_value(), b.rate_value()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal),
        _ => a.rate.cmp(&b.rate),
    });
}

/// Fee-column key resolved from scope, retention state, and range:
/// retention on the core range prices from `Core_Retention_<ltv>`,
/// retention otherwise from `Retention<scope>`, everything else from the
/// scope column itself.
pub fn fee_column_key(selection: &BtlSelection) -> String {
    match selection.retention {
        RetentionChoice::Yes => match selection.range {
            ProductRange::Core => {
                format!("Core_Retention_{}", selection.retention_ltv.selected() as u32)
            }
            ProductRange::Specialist => format!("Retention{}", selection.scope),
        },
        RetentionChoice::No => selection.scope.clone(),
    }
}
