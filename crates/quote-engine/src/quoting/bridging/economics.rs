//! Bridging loan economics.
//!
//! Bridging takes the gross loan as direct input — it is never derived
//! from the property value — and reports one first-charge-inclusive LTV
//! for both the gross and net views.

use super::filter::loan_ltv;
use crate::catalog::normalize::normalize_text;
use crate::catalog::{ProductFamily, RateRow};
use crate::quoting::domain::{broker_client_fee, finite, CalculatedRate, LoanParams};

const DEFAULT_PROC_FEE_PERCENT: f64 = 1.0;

pub fn calculate(row: &RateRow, params: &LoanParams) -> CalculatedRate {
    let property_value = params.property_value.and_then(finite);
    let gross = params.specific_gross_loan.and_then(finite);

    let fee_percent = row.product_fee_percent;
    let product_fee_amount = match (gross, fee_percent) {
        (Some(gross), Some(fee)) => finite(gross * fee / 100.0),
        _ => None,
    };
    let admin_fee = row.admin_fee.and_then(finite).unwrap_or(0.0);
    let client_fee = broker_client_fee(params, gross);

    // A specific net request fixes the net figure; fee subtraction only
    // applies when the net is derived.
    let net = if params.use_specific_net {
        params.specific_net_loan.and_then(finite)
    } else {
        gross.map(|gross| {
            gross - product_fee_amount.unwrap_or(0.0) - admin_fee - client_fee.unwrap_or(0.0)
        })
    };

    let ltv = loan_ltv(params);

    let rate_percent = row.rate_value();
    let monthly_interest = match (gross, rate_percent) {
        (Some(gross), Some(rate)) => finite(gross * (rate / 100.0) / 12.0),
        _ => None,
    };
    let icr = match (params.monthly_rent.and_then(finite), monthly_interest) {
        (Some(rent), Some(interest)) if interest > 0.0 => finite(rent / interest * 100.0),
        _ => None,
    };

    let proc_fee = row
        .proc_fee_percent
        .and_then(finite)
        .unwrap_or(DEFAULT_PROC_FEE_PERCENT);
    let commission = gross.and_then(|gross| finite(gross * proc_fee / 100.0));

    CalculatedRate {
        product_name: row.product.clone(),
        scope: row.scope.clone(),
        tier: row.tier.clone(),
        family: row.family,
        initial_rate: rate_percent,
        rate_text: rate_text(row),
        is_tracker: row.is_tracker,
        fee_column: fee_percent,
        property_value,
        gross_loan: gross,
        net_loan: net.and_then(finite),
        ltv,
        net_ltv: ltv,
        icr,
        product_fee_percent: fee_percent,
        product_fee_amount,
        admin_fee: Some(admin_fee),
        broker_client_fee: client_fee,
        broker_commission_percent: Some(proc_fee),
        broker_commission_amount: commission,
        monthly_interest_cost: monthly_interest,
        monthly_rent: params.monthly_rent.and_then(finite),
        top_slicing: params.top_slicing.and_then(finite),
    }
}

/// Fusion margins and variable bridge coupons price over bank base rate;
/// fixed bridges quote flat.
fn rate_text(row: &RateRow) -> String {
    let over_bbr =
        row.family == ProductFamily::Fusion || normalize_text(&row.set_key).contains("var");
    match row.rate_value() {
        Some(rate) if over_bbr => format!("{rate:.2}% + BBR"),
        Some(rate) => format!("{rate:.2}%"),
        None => row.rate.trim().to_string(),
    }
}
