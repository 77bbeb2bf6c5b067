//! Buy-to-let loan economics.
//!
//! Pure derivation from one matched rate plus the loan parameters. Every
//! intermediate is validity-checked; anything non-finite surfaces as
//! `None` in the output rather than propagating NaN.

use crate::catalog::RateRow;
use crate::quoting::domain::{broker_client_fee, finite, CalculatedRate, LoanParams, LoanType};

/// Proc fee applied when the rate record does not carry one.
const DEFAULT_PROC_FEE_PERCENT: f64 = 1.0;

pub fn calculate(row: &RateRow, params: &LoanParams) -> CalculatedRate {
    let property_value = params.property_value.and_then(finite);
    let fee_percent = row.product_fee_percent;

    let gross = gross_loan(row, params, property_value, fee_percent);
    let product_fee_amount = match (gross, fee_percent) {
        (Some(gross), Some(fee)) => finite(gross * fee / 100.0),
        _ => None,
    };
    let admin_fee = row.admin_fee.and_then(finite).unwrap_or(0.0);
    let client_fee = broker_client_fee(params, gross);

    let net = gross.map(|gross| {
        gross - product_fee_amount.unwrap_or(0.0) - admin_fee - client_fee.unwrap_or(0.0)
    });

    let ltv = ratio_percent(gross, property_value);
    let net_ltv = ratio_percent(net, property_value);

    let rate_percent = row.rate_value();
    let monthly_interest = match (gross, rate_percent) {
        (Some(gross), Some(rate)) => finite(gross * (rate / 100.0) / 12.0),
        _ => None,
    };
    let icr = interest_cover(params.monthly_rent, monthly_interest);

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
        net_ltv,
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

/// Gross loan derivation per loan type. SpecificNet inverts the fee
/// deduction; MaxGross prefers the row's max LTV over the caller's target.
fn gross_loan(
    row: &RateRow,
    params: &LoanParams,
    property_value: Option<f64>,
    fee_percent: Option<f64>,
) -> Option<f64> {
    match params.loan_type {
        LoanType::SpecificGross => params.specific_gross_loan.and_then(finite),
        LoanType::SpecificNet | LoanType::NetRequired => {
            let net = params.specific_net_loan.and_then(finite)?;
            let fee = fee_percent?;
            let denominator = 1.0 - fee / 100.0;
            if denominator <= 0.0 {
                return None;
            }
            finite(net / denominator)
        }
        LoanType::MaxGross => {
            let pv = property_value?;
            let max_ltv = row
                .max_ltv
                .and_then(finite)
                .or_else(|| params.target_ltv.and_then(finite))?;
            finite(pv * max_ltv / 100.0)
        }
        LoanType::SpecificLtv => {
            let pv = property_value?;
            let target = params.target_ltv.and_then(finite)?;
            finite(pv * target / 100.0)
        }
    }
}

fn ratio_percent(amount: Option<f64>, property_value: Option<f64>) -> Option<f64> {
    let amount = amount.and_then(finite)?;
    let pv = property_value.filter(|pv| *pv > 0.0)?;
    finite(amount / pv * 100.0)
}

/// ICR is undefined — not zero — when there is no positive interest cost
/// or no usable rent figure.
fn interest_cover(monthly_rent: Option<f64>, monthly_interest: Option<f64>) -> Option<f64> {
    let rent = monthly_rent.and_then(finite)?;
    let interest = monthly_interest.filter(|value| *value > 0.0)?;
    finite(rent / interest * 100.0)
}

fn rate_text(row: &RateRow) -> String {
    match row.rate_value() {
        Some(rate) if row.is_tracker => format!("{rate:.2}% + BBR"),
        Some(rate) => format!("{rate:.2}%"),
        None => row.rate.trim().to_string(),
    }
}
