//! Bridging eligibility filter.
//!
//! The catalog splits by the family tag assigned at ingestion: Bridge rows
//! gate on charge type, sub-product, and LTV buckets; Fusion rows gate on
//! loan size only and never price second charges.

use crate::catalog::normalize::normalize_text;
use crate::catalog::{ChargeClass, ProductFamily, RateRow};
use crate::quoting::domain::{finite, ChargeType, LoanParams, MatchedRate};
use crate::quoting::scope_matches;
use std::collections::HashSet;

/// Resolved selection state for one bridging matching pass.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgingSelection {
    pub scope: String,
    pub charge_type: ChargeType,
    pub sub_product: Option<String>,
}

impl BridgingSelection {
    pub fn from_params(params: &LoanParams) -> Self {
        Self {
            scope: params.product_scope.clone(),
            charge_type: params.charge_type,
            sub_product: params.sub_product.clone(),
        }
    }
}

/// The loan amount a bridging pass filters on: a specific net-loan input
/// takes precedence over the gross figure.
pub fn loan_size(params: &LoanParams) -> Option<f64> {
    params
        .specific_net_loan
        .and_then(finite)
        .filter(|value| *value > 0.0)
        .or_else(|| {
            params
                .specific_gross_loan
                .and_then(finite)
                .filter(|value| *value > 0.0)
        })
}

/// Bridging LTV: (loan amount + first charge) / property value × 100.
pub fn loan_ltv(params: &LoanParams) -> Option<f64> {
    let property_value = params
        .property_value
        .and_then(finite)
        .filter(|value| *value > 0.0)?;
    let loan = loan_size(params)?;
    let first_charge = params.first_charge_value.and_then(finite).unwrap_or(0.0);
    finite((loan + first_charge) / property_value * 100.0)
}

/// Bridge-family rows eligible for the selection, in source order.
pub fn match_bridge(
    rows: &[RateRow],
    selection: &BridgingSelection,
    params: &LoanParams,
) -> Vec<MatchedRate> {
    let ltv = loan_ltv(params).unwrap_or(0.0);
    let mut matched: Vec<MatchedRate> = rows
        .iter()
        .filter(|row| row.family == ProductFamily::Bridge)
        .filter(|row| scope_matches(&selection.scope, &row.scope))
        .filter(|row| charge_allows(selection.charge_type, row.charge_class))
        .filter(|row| sub_product_allows(selection, row))
        .filter(|row| {
            let min = row.min_ltv.and_then(finite).unwrap_or(0.0);
            let max = row.max_ltv.and_then(finite).unwrap_or(100.0);
            ltv > min && ltv <= max
        })
        .cloned()
        .collect();
    dedupe_in_place(&mut matched);
    matched
}

/// Fusion-family rows eligible for the selection, in source order. Fusion
/// never prices second charges and is bucketed by loan size alone.
pub fn match_fusion(
    rows: &[RateRow],
    selection: &BridgingSelection,
    params: &LoanParams,
) -> Vec<MatchedRate> {
    if selection.charge_type == ChargeType::Second {
        return Vec::new();
    }
    let Some(loan) = loan_size(params) else {
        return Vec::new();
    };
    let mut matched: Vec<MatchedRate> = rows
        .iter()
        .filter(|row| row.family == ProductFamily::Fusion)
        .filter(|row| scope_matches(&selection.scope, &row.scope))
        .filter(|row| {
            let min = row.min_loan.and_then(finite).unwrap_or(0.0);
            let max = row.max_loan.and_then(finite).unwrap_or(f64::INFINITY);
            loan >= min && loan <= max
        })
        .cloned()
        .collect();
    dedupe_in_place(&mut matched);
    matched
}

fn charge_allows(requested: ChargeType, row: ChargeClass) -> bool {
    match requested {
        ChargeType::All => true,
        ChargeType::First => row != ChargeClass::Second,
        ChargeType::Second => row == ChargeClass::Second,
    }
}

/// Sub-product containment applies only outside second-charge requests —
/// second-charge sheets are not segmented by sub-product.
fn sub_product_allows(selection: &BridgingSelection, row: &RateRow) -> bool {
    if selection.charge_type == ChargeType::Second {
        return true;
    }
    match selection.sub_product.as_deref().map(normalize_text) {
        Some(sub) if !sub.is_empty() => normalize_text(&row.product).contains(&sub),
        _ => true,
    }
}

fn dedupe_in_place(rows: &mut Vec<MatchedRate>) {
    let mut seen = HashSet::new();
    rows.retain(|row| seen.insert(row.identity_key()));
}
