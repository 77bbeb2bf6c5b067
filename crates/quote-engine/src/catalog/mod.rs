//! Rate catalog ingestion.
//!
//! Source rate sheets arrive as CSV exports or JSON rows with inconsistent
//! column names and loosely formatted values. Ingestion normalizes each
//! row into a canonical [`RateRow`] exactly once — field aliases resolved,
//! numbers parsed, retention/charge/family classified — so the matching
//! core never probes alternate spellings or scans free text again.

pub mod classify;
pub mod normalize;
mod record;

pub use classify::{ChargeClass, ProductFamily, RateStatus, RowClassifier, StandardClassifier};
pub use record::RawRecord;

use chrono::NaiveDate;
use normalize::{first_digit_run, parse_number};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use tracing::info;

/// Canonical rate record produced by ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateRow {
    pub set_key: String,
    pub scope: String,
    /// Raw tier text; see [`RateRow::tier_value`] for the numeric view.
    pub tier: String,
    pub product: String,
    /// Raw rate text; kept verbatim so ordering can fall back to lexical
    /// comparison when the value is not numeric.
    pub rate: String,
    pub product_fee_percent: Option<f64>,
    pub admin_fee: Option<f64>,
    pub proc_fee_percent: Option<f64>,
    pub min_ltv: Option<f64>,
    pub max_ltv: Option<f64>,
    pub min_loan: Option<f64>,
    pub max_loan: Option<f64>,
    pub min_term_months: Option<u32>,
    pub max_term_months: Option<u32>,
    pub is_tracker: bool,
    pub is_retention: bool,
    pub charge_class: ChargeClass,
    pub family: ProductFamily,
    pub status: RateStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl RateRow {
    /// Numeric rate when the raw text parses, for ordering and interest
    /// arithmetic.
    pub fn rate_value(&self) -> Option<f64> {
        parse_number(&self.rate)
    }

    /// Numeric tier: direct integer parse, else the first digit run in the
    /// raw text ("Tier 2" -> 2).
    pub fn tier_value(&self) -> Option<u32> {
        self.tier
            .trim()
            .parse::<u32>()
            .ok()
            .or_else(|| first_digit_run(&self.tier))
    }

    /// Lifecycle gate: Active status and the reference date inside the
    /// optional [start_date, end_date] window.
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        if self.status != RateStatus::Active {
            return false;
        }
        if let Some(start) = self.start_date {
            if start > date {
                return false;
            }
        }
        if let Some(end) = self.end_date {
            if end < date {
                return false;
            }
        }
        true
    }

    /// Composite identity used to collapse duplicate imports:
    /// (product, rate, scope, tier, fee).
    pub fn identity_key(&self) -> String {
        let fee = self
            .product_fee_percent
            .map(|value| value.to_string())
            .unwrap_or_default();
        format!(
            "{}||{}||{}||{}||{}",
            self.product, self.rate, self.scope, self.tier, fee
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog source: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid catalog CSV data: {0}")]
    Csv(#[from] csv::Error),
}

/// The full normalized rate catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RateCatalog {
    rows: Vec<RateRow>,
}

impl RateCatalog {
    pub fn from_rows(rows: Vec<RateRow>) -> Self {
        Self { rows }
    }

    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(file)
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, CatalogError> {
        Self::from_csv_reader_with(reader, &StandardClassifier)
    }

    pub fn from_csv_reader_with<R: Read>(
        reader: R,
        classifier: &dyn RowClassifier,
    ) -> Result<Self, CatalogError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);
        let mut rows = Vec::new();
        for result in csv_reader.deserialize::<BTreeMap<String, String>>() {
            let record = RawRecord::from_csv_row(result?);
            if let Some(row) = canonical_row(&record, classifier) {
                rows.push(row);
            }
        }
        info!(rows = rows.len(), "rate catalog ingested");
        Ok(Self { rows })
    }

    /// Build from JSON rows (e.g. a table dump); non-object entries and
    /// rows without product or rate are dropped.
    pub fn from_json_values(values: &[serde_json::Value]) -> Self {
        Self::from_json_values_with(values, &StandardClassifier)
    }

    pub fn from_json_values_with(
        values: &[serde_json::Value],
        classifier: &dyn RowClassifier,
    ) -> Self {
        let rows = values
            .iter()
            .filter_map(serde_json::Value::as_object)
            .map(RawRecord::from_json_object)
            .filter_map(|record| canonical_row(&record, classifier))
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[RateRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows whose lifecycle window covers the reference date. Matching
    /// passes operate on this subset.
    pub fn active(&self, on: NaiveDate) -> Vec<RateRow> {
        self.rows
            .iter()
            .filter(|row| row.is_active_on(on))
            .cloned()
            .collect()
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

fn parse_term(raw: &str) -> Option<u32> {
    parse_number(raw).map(|value| value.max(0.0) as u32)
}

/// Normalize one raw record into the canonical shape. Rows carrying
/// neither a product name nor a rate are treated as blank lines.
fn canonical_row(record: &RawRecord, classifier: &dyn RowClassifier) -> Option<RateRow> {
    let product = record
        .probe_owned(&["product", "product_name"])
        .unwrap_or_default();
    let rate = record
        .probe_owned(&["rate", "initial_rate"])
        .unwrap_or_default();
    if product.is_empty() && rate.is_empty() {
        return None;
    }

    let set_key = record
        .probe_owned(&["set_key", "rate_set", "sheet"])
        .unwrap_or_default();
    let scope = record
        .probe_owned(&["property", "product_scope", "property_scope", "set_key"])
        .unwrap_or_default();
    let tier = record.probe_owned(&["tier"]).unwrap_or_default();
    let type_text = record.probe(&["type", "rate_type"]);

    let charge_text = record.probe(&["charge_type", "charge"]);
    let retention_text = record.probe(&[
        "is_retention",
        "isRetention",
        "retention",
        "retained",
        "is_retained",
    ]);

    Some(RateRow {
        family: classifier.family(&set_key),
        charge_class: classifier.charge_class(charge_text, &product, type_text),
        is_retention: classifier.retention(retention_text, &product),
        is_tracker: classifier.tracker(&product, type_text),
        status: classifier.status(record.probe(&["rate_status", "status"])),
        product_fee_percent: record
            .probe(&["product_fee", "arrangement_fee"])
            .and_then(parse_number),
        admin_fee: record.probe(&["admin_fee"]).and_then(parse_number),
        proc_fee_percent: record.probe(&["proc_fee"]).and_then(parse_number),
        min_ltv: record
            .probe(&["min_ltv", "minltv", "min_LTV", "minLTV", "min_loan_ltv", "ltv_min"])
            .and_then(parse_number),
        max_ltv: record
            .probe(&["max_ltv", "maxltv", "max_LTV", "maxLTV", "max_loan_ltv", "ltv_max"])
            .and_then(parse_number),
        min_loan: record
            .probe(&["min_loan", "loan_min"])
            .and_then(parse_number),
        max_loan: record
            .probe(&["max_loan", "loan_max"])
            .and_then(parse_number),
        min_term_months: record
            .probe(&["min_term", "min_term_months"])
            .and_then(parse_term),
        max_term_months: record
            .probe(&["max_term", "max_term_months", "term_months"])
            .and_then(parse_term),
        start_date: record.probe(&["start_date"]).and_then(parse_date),
        end_date: record.probe(&["end_date"]).and_then(parse_date),
        set_key,
        scope,
        tier,
        product,
        rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    const SAMPLE_CSV: &str = "\
set_key,property,tier,product,rate,product_fee,admin_fee,max_ltv,is_retention,rate_status,start_date,end_date
BTL,Residential,1,2yr Fix,5.49,4,150,75,no,Active,,
BTL,Residential,1,2yr Fix,5.49,4,150,75,no,Active,,
BTL,Residential,Tier 2,2yr Fix Retention,4.99,3.5,150,65,yes,Active,,
BTL,Commercial,1,3yr Fix,6.10,2,0,70,,Inactive,,
";

    #[test]
    fn csv_rows_normalize_to_canonical_shape() {
        let catalog = RateCatalog::from_csv_reader(Cursor::new(SAMPLE_CSV)).expect("parses");
        assert_eq!(catalog.len(), 4);

        let first = &catalog.rows()[0];
        assert_eq!(first.scope, "Residential");
        assert_eq!(first.rate_value(), Some(5.49));
        assert_eq!(first.tier_value(), Some(1));
        assert_eq!(first.product_fee_percent, Some(4.0));
        assert_eq!(first.family, ProductFamily::Btl);
        assert!(!first.is_retention);

        let retention = &catalog.rows()[2];
        assert_eq!(retention.tier_value(), Some(2));
        assert!(retention.is_retention);
    }

    #[test]
    fn alias_columns_resolve_in_order() {
        let values = vec![json!({
            "product_scope": "Semi-Commercial",
            "product": "2yr Tracker",
            "initial_rate": "5.25%",
            "maxLTV": 70,
            "retained": "1",
            "set_key": "BTL"
        })];
        let catalog = RateCatalog::from_json_values(&values);
        let row = &catalog.rows()[0];
        assert_eq!(row.scope, "Semi-Commercial");
        assert_eq!(row.rate_value(), Some(5.25));
        assert_eq!(row.max_ltv, Some(70.0));
        assert!(row.is_retention);
        assert!(row.is_tracker);
    }

    #[test]
    fn blank_rows_are_dropped() {
        let values = vec![json!({ "set_key": "BTL", "property": "Residential" })];
        let catalog = RateCatalog::from_json_values(&values);
        assert!(catalog.is_empty());
    }

    #[test]
    fn lifecycle_window_gates_active_rows() {
        let csv = "\
set_key,property,tier,product,rate,rate_status,start_date,end_date
BTL,Residential,1,Current,5.0,Active,2026-01-01,2026-12-31
BTL,Residential,1,Expired,4.5,Active,2025-01-01,2025-12-31
BTL,Residential,1,Scheduled,4.0,Active,2027-01-01,
BTL,Residential,1,Shelved,3.9,Inactive,,
BTL,Residential,1,Open,5.2,,,
";
        let catalog = RateCatalog::from_csv_reader(Cursor::new(csv)).expect("parses");
        let today = NaiveDate::from_ymd_opt(2026, 6, 1).expect("valid date");
        let active: Vec<String> = catalog
            .active(today)
            .into_iter()
            .map(|row| row.product)
            .collect();
        assert_eq!(active, vec!["Current".to_string(), "Open".to_string()]);
    }

    #[test]
    fn identity_key_collapses_duplicate_imports() {
        let catalog = RateCatalog::from_csv_reader(Cursor::new(SAMPLE_CSV)).expect("parses");
        assert_eq!(
            catalog.rows()[0].identity_key(),
            catalog.rows()[1].identity_key()
        );
        assert_ne!(
            catalog.rows()[0].identity_key(),
            catalog.rows()[2].identity_key()
        );
    }
}
