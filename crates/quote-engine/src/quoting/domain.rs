use crate::catalog::{ProductFamily, RateRow};
use serde::{Deserialize, Serialize};

/// A catalog row that survived an eligibility filter. Matched rates are
/// deduplicated by (product, rate, scope, tier, fee) before calculation.
pub type MatchedRate = RateRow;

/// How the requested loan amount is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanType {
    MaxGross,
    SpecificGross,
    SpecificNet,
    SpecificLtv,
    NetRequired,
}

/// Whether the broker's additional client fee is a flat amount or a
/// percentage of the gross loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeBasis {
    Pound,
    Percent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetentionChoice {
    Yes,
    No,
}

/// The two retention LTV brackets offered: at or under 65%, or the band
/// above 65% up to 75%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetentionLtv {
    #[serde(rename = "65")]
    Max65,
    #[serde(rename = "75")]
    Max75,
}

impl RetentionLtv {
    pub fn selected(self) -> f64 {
        match self {
            RetentionLtv::Max65 => 65.0,
            RetentionLtv::Max75 => 75.0,
        }
    }
}

/// Requested lien priority for bridging quotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeType {
    All,
    First,
    Second,
}

/// Product range toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductRange {
    Core,
    Specialist,
}

/// Borrower, property, and product selection inputs for one quote pass.
/// Omitted fields deserialize to their defaults so API callers only send
/// what they use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoanParams {
    pub property_value: Option<f64>,
    pub monthly_rent: Option<f64>,
    pub loan_type: LoanType,
    pub specific_gross_loan: Option<f64>,
    pub specific_net_loan: Option<f64>,
    /// Target LTV percentage used by the MaxGross/SpecificLtv loan types.
    pub target_ltv: Option<f64>,
    pub top_slicing: Option<f64>,
    pub additional_fee_amount: Option<f64>,
    pub fee_calculation_type: FeeBasis,
    pub add_fees_toggle: bool,
    pub retention_choice: RetentionChoice,
    pub retention_ltv: RetentionLtv,
    pub product_scope: String,
    pub product_type: String,
    pub charge_type: ChargeType,
    pub sub_product: Option<String>,
    pub selected_range: ProductRange,
    /// Prior-ranking charge balance included in bridging LTV.
    pub first_charge_value: Option<f64>,
    /// Bridging toggle: take the net loan as the literal requested value.
    pub use_specific_net: bool,
    pub bridging_term_months: Option<u32>,
}

impl Default for LoanParams {
    fn default() -> Self {
        Self {
            property_value: None,
            monthly_rent: None,
            loan_type: LoanType::MaxGross,
            specific_gross_loan: None,
            specific_net_loan: None,
            target_ltv: Some(75.0),
            top_slicing: None,
            additional_fee_amount: None,
            fee_calculation_type: FeeBasis::Pound,
            add_fees_toggle: false,
            retention_choice: RetentionChoice::No,
            retention_ltv: RetentionLtv::Max75,
            product_scope: String::new(),
            product_type: String::new(),
            charge_type: ChargeType::All,
            sub_product: None,
            selected_range: ProductRange::Specialist,
            first_charge_value: None,
            use_specific_net: false,
            bridging_term_months: None,
        }
    }
}

/// One eligible product with its derived economics. Every numeric field is
/// either finite or `None` — NaN and infinities never cross this boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatedRate {
    pub product_name: String,
    pub scope: String,
    pub tier: String,
    pub family: ProductFamily,
    pub initial_rate: Option<f64>,
    pub rate_text: String,
    pub is_tracker: bool,
    /// The product-fee bucket this row prices under.
    pub fee_column: Option<f64>,
    pub property_value: Option<f64>,
    pub gross_loan: Option<f64>,
    pub net_loan: Option<f64>,
    pub ltv: Option<f64>,
    pub net_ltv: Option<f64>,
    pub icr: Option<f64>,
    pub product_fee_percent: Option<f64>,
    pub product_fee_amount: Option<f64>,
    pub admin_fee: Option<f64>,
    pub broker_client_fee: Option<f64>,
    pub broker_commission_percent: Option<f64>,
    pub broker_commission_amount: Option<f64>,
    pub monthly_interest_cost: Option<f64>,
    pub monthly_rent: Option<f64>,
    pub top_slicing: Option<f64>,
}

/// Collapse a computed value to `None` unless it is finite.
pub(crate) fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// Broker client fee derived from the additional-fee inputs; `None` when
/// the toggle is off or nothing computable was entered.
pub(crate) fn broker_client_fee(params: &LoanParams, gross: Option<f64>) -> Option<f64> {
    if !params.add_fees_toggle {
        return None;
    }
    let amount = params.additional_fee_amount.and_then(finite)?;
    let fee = match params.fee_calculation_type {
        FeeBasis::Percent => gross.and_then(finite)? * (amount / 100.0),
        FeeBasis::Pound => amount,
    };
    finite(fee).filter(|fee| *fee > 0.0)
}
