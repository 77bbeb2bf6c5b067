//! Row classification at ingestion time.
//!
//! Retention, charge priority, and product family used to be re-derived
//! from free-text scans on every filter pass; here they are resolved once
//! into tagged fields when a row is ingested. The classifier sits behind a
//! trait so alternative rate-sheet conventions can be swapped in and the
//! standard rules can be tested on their own.

use super::normalize::{normalize_text, truthy};
use serde::{Deserialize, Serialize};

/// Product family segmenting the catalog. Bridge and Fusion are
/// identified by the explicit set key, never inferred from pricing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductFamily {
    Btl,
    Bridge,
    Fusion,
}

/// Lien priority of a bridging row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeClass {
    First,
    Second,
}

/// Lifecycle status of a rate row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateStatus {
    Active,
    Inactive,
}

/// Classification seams probed during ingestion.
pub trait RowClassifier {
    fn family(&self, set_key: &str) -> ProductFamily;
    fn charge_class(
        &self,
        charge_text: Option<&str>,
        product: &str,
        type_text: Option<&str>,
    ) -> ChargeClass;
    fn retention(&self, explicit: Option<&str>, product: &str) -> bool;
    fn tracker(&self, product: &str, type_text: Option<&str>) -> bool;
    fn status(&self, raw: Option<&str>) -> RateStatus;
}

/// Conventions used by the current rate sheets.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardClassifier;

impl RowClassifier for StandardClassifier {
    fn family(&self, set_key: &str) -> ProductFamily {
        let key = normalize_text(set_key);
        if key.contains("fusion") {
            ProductFamily::Fusion
        } else if key.contains("bridge") {
            ProductFamily::Bridge
        } else {
            ProductFamily::Btl
        }
    }

    fn charge_class(
        &self,
        charge_text: Option<&str>,
        product: &str,
        type_text: Option<&str>,
    ) -> ChargeClass {
        if let Some(raw) = charge_text {
            let text = normalize_text(raw);
            if text.contains("second") || text.contains("2nd") {
                return ChargeClass::Second;
            }
            if text.contains("first") || text.contains("1st") {
                return ChargeClass::First;
            }
        }
        let product = normalize_text(product);
        if product.contains("second charge") || product.contains("2nd charge") {
            return ChargeClass::Second;
        }
        if let Some(raw) = type_text {
            let text = normalize_text(raw);
            if text.contains("second") || text.contains("2nd") {
                return ChargeClass::Second;
            }
        }
        ChargeClass::First
    }

    fn retention(&self, explicit: Option<&str>, product: &str) -> bool {
        match explicit {
            Some(value) => truthy(value),
            None => normalize_text(product).contains("retention"),
        }
    }

    fn tracker(&self, product: &str, type_text: Option<&str>) -> bool {
        if normalize_text(product).contains("track") {
            return true;
        }
        type_text
            .map(|raw| normalize_text(raw).contains("track"))
            .unwrap_or(false)
    }

    fn status(&self, raw: Option<&str>) -> RateStatus {
        match raw {
            Some(value) if normalize_text(value) == "inactive" => RateStatus::Inactive,
            _ => RateStatus::Active,
        }
    }
}
