//! Runtime pricing overlay.
//!
//! Admin-tunable rule parameters (fee columns per scope, the
//! flat-above-commercial LTV override, broker commission defaults) live in
//! an external key-value store. This module resolves those rows into one
//! [`PricingOverlay`] value with hardcoded fallbacks; the matching and
//! calculation core receives the resolved overlay by value and never reads
//! ambient configuration itself.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Maximum LTV applied when no banded override is active.
const DEFAULT_MAX_LTV: f64 = 75.0;

/// Commission applied when a route has no configured default.
const FALLBACK_COMMISSION: f64 = 0.9;

/// One row of the external settings store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingRow {
    pub key: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

/// Tier-banded LTV ceiling for flat-above-commercial style scopes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatAboveCommercialRule {
    pub enabled: bool,
    /// Comma-separated tokens that must all appear in the active product
    /// scope (case-insensitive). A single token degrades to substring
    /// containment.
    pub scope_matcher: String,
    pub tier2_max_ltv: f64,
    pub tier3_max_ltv: f64,
}

impl Default for FlatAboveCommercialRule {
    fn default() -> Self {
        Self {
            enabled: true,
            scope_matcher: "flat,commercial".to_string(),
            tier2_max_ltv: 65.0,
            tier3_max_ltv: 75.0,
        }
    }
}

impl FlatAboveCommercialRule {
    /// Whether the rule applies to the given product scope.
    pub fn matches_scope(&self, scope: &str) -> bool {
        if !self.enabled {
            return false;
        }
        let scope = scope.trim().to_lowercase();
        let matcher = self.scope_matcher.to_lowercase();
        let tokens: Vec<&str> = matcher
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .collect();
        if tokens.is_empty() {
            return !matcher.is_empty() && scope.contains(matcher.as_str());
        }
        tokens.iter().all(|token| scope.contains(token))
    }

    /// Banded ceiling for a tier; tiers outside the banding keep the
    /// standard maximum.
    pub fn banded_max_ltv(&self, tier: u32) -> f64 {
        match tier {
            2 => self.tier2_max_ltv,
            3 => self.tier3_max_ltv,
            _ => DEFAULT_MAX_LTV,
        }
    }

    /// LTV gate applied to a rate row while the rule is active. Tier 2
    /// accepts rows at or under the tier-2 ceiling, tier 3 the band between
    /// the two ceilings; rows without a positive max LTV never pass.
    pub fn row_passes(&self, tier: u32, row_max_ltv: Option<f64>) -> bool {
        let max_ltv = match row_max_ltv {
            Some(value) if value.is_finite() && value > 0.0 => value,
            _ => return false,
        };
        match tier {
            2 => max_ltv <= self.tier2_max_ltv,
            3 => max_ltv > self.tier2_max_ltv && max_ltv <= self.tier3_max_ltv,
            _ => true,
        }
    }
}

/// Wire shape for the flat-above-commercial rule as stored by the admin UI.
#[derive(Debug, Deserialize)]
struct RawFlatRule {
    #[serde(default)]
    enabled: bool,
    #[serde(default, alias = "scopeMatcher")]
    scope_matcher: String,
    #[serde(default, alias = "tierLtv")]
    tier_ltv: BTreeMap<String, f64>,
}

impl From<RawFlatRule> for FlatAboveCommercialRule {
    fn from(raw: RawFlatRule) -> Self {
        let defaults = FlatAboveCommercialRule::default();
        Self {
            enabled: raw.enabled,
            scope_matcher: if raw.scope_matcher.trim().is_empty() {
                defaults.scope_matcher
            } else {
                raw.scope_matcher
            },
            tier2_max_ltv: raw
                .tier_ltv
                .get("2")
                .copied()
                .unwrap_or(defaults.tier2_max_ltv),
            tier3_max_ltv: raw
                .tier_ltv
                .get("3")
                .copied()
                .unwrap_or(defaults.tier3_max_ltv),
        }
    }
}

/// Broker commission defaults per submission route plus the symmetric
/// tolerance allowed around them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrokerCommission {
    pub defaults: BTreeMap<String, f64>,
    pub tolerance: f64,
}

impl Default for BrokerCommission {
    fn default() -> Self {
        let mut defaults = BTreeMap::new();
        defaults.insert("Direct Broker".to_string(), 0.9);
        defaults.insert("Network / Club".to_string(), 0.9);
        defaults.insert("Packager".to_string(), 0.9);
        Self {
            defaults,
            tolerance: 0.1,
        }
    }
}

impl BrokerCommission {
    pub fn default_for(&self, route: &str) -> f64 {
        self.defaults
            .get(route)
            .copied()
            .unwrap_or(FALLBACK_COMMISSION)
    }

    /// Clamp a requested commission percentage into the tolerated window
    /// around the route default, rounded to one decimal place. Non-finite
    /// requests come back as the route default.
    pub fn clamp(&self, route: &str, requested: Option<f64>) -> f64 {
        let default = self.default_for(route);
        let requested = match requested {
            Some(value) if value.is_finite() => value,
            _ => return default,
        };
        let clamped = requested
            .max(default - self.tolerance)
            .min(default + self.tolerance);
        (clamped * 10.0).round() / 10.0
    }
}

/// Resolved overlay handed to every filter and calculator call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricingOverlay {
    /// Allowed product-fee percentages per scope/retention column key.
    pub fee_columns: BTreeMap<String, Vec<f64>>,
    pub flat_above_commercial: FlatAboveCommercialRule,
    pub broker_commission: BrokerCommission,
}

impl Default for PricingOverlay {
    fn default() -> Self {
        Self {
            fee_columns: default_fee_columns(),
            flat_above_commercial: FlatAboveCommercialRule::default(),
            broker_commission: BrokerCommission::default(),
        }
    }
}

fn default_fee_columns() -> BTreeMap<String, Vec<f64>> {
    let mut columns = BTreeMap::new();
    columns.insert("Residential".to_string(), vec![6.0, 4.0, 3.0, 2.0]);
    columns.insert("Commercial".to_string(), vec![6.0, 4.0, 2.0]);
    columns.insert("Semi-Commercial".to_string(), vec![6.0, 4.0, 2.0]);
    columns.insert(
        "RetentionResidential".to_string(),
        vec![5.5, 3.5, 2.5, 1.5],
    );
    columns.insert("RetentionCommercial".to_string(), vec![5.5, 3.5, 1.5]);
    columns.insert("RetentionSemi-Commercial".to_string(), vec![5.5, 3.5, 1.5]);
    columns.insert("Core".to_string(), vec![6.0, 4.0, 3.0, 2.0]);
    columns.insert("Core_Retention_65".to_string(), vec![5.5, 3.5, 2.5, 1.5]);
    columns.insert("Core_Retention_75".to_string(), vec![5.5, 3.5, 2.5, 1.5]);
    columns
}

impl PricingOverlay {
    /// Resolve the overlay from settings-store rows. Unknown keys are
    /// ignored; a row whose value does not parse leaves the hardcoded
    /// default for that key in place.
    pub fn from_setting_rows(rows: &[SettingRow]) -> Self {
        let mut overlay = Self::default();
        for row in rows {
            if row.value.is_null() {
                continue;
            }
            match row.key.as_str() {
                "fee_columns" => {
                    match serde_json::from_value::<BTreeMap<String, Vec<f64>>>(row.value.clone()) {
                        Ok(columns) => {
                            for (key, values) in columns {
                                if !values.is_empty() {
                                    overlay.fee_columns.insert(key, values);
                                }
                            }
                        }
                        Err(err) => warn!(key = %row.key, %err, "ignoring malformed overlay row"),
                    }
                }
                "flat_above_commercial_rule" => {
                    match serde_json::from_value::<RawFlatRule>(row.value.clone()) {
                        Ok(raw) => overlay.flat_above_commercial = raw.into(),
                        Err(err) => warn!(key = %row.key, %err, "ignoring malformed overlay row"),
                    }
                }
                "broker_commission_defaults" => {
                    match serde_json::from_value::<BTreeMap<String, f64>>(row.value.clone()) {
                        Ok(defaults) if !defaults.is_empty() => {
                            overlay.broker_commission.defaults = defaults;
                        }
                        Ok(_) => {}
                        Err(err) => warn!(key = %row.key, %err, "ignoring malformed overlay row"),
                    }
                }
                "broker_commission_tolerance" => {
                    match serde_json::from_value::<f64>(row.value.clone()) {
                        Ok(tolerance) if tolerance.is_finite() && tolerance >= 0.0 => {
                            overlay.broker_commission.tolerance = tolerance;
                        }
                        Ok(_) => {}
                        Err(err) => warn!(key = %row.key, %err, "ignoring malformed overlay row"),
                    }
                }
                _ => {}
            }
        }
        overlay
    }

    /// Resolve from a raw JSON blob: either an array of `{key, value}` rows
    /// or a plain object keyed the same way. Any parse failure yields the
    /// full default overlay, mirroring the overlay-absent contract.
    pub fn from_json_str(raw: &str) -> Self {
        match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(serde_json::Value::Array(values)) => {
                let rows: Vec<SettingRow> = values
                    .into_iter()
                    .filter_map(|value| serde_json::from_value(value).ok())
                    .collect();
                Self::from_setting_rows(&rows)
            }
            Ok(serde_json::Value::Object(map)) => {
                let rows: Vec<SettingRow> = map
                    .into_iter()
                    .map(|(key, value)| SettingRow { key, value })
                    .collect();
                Self::from_setting_rows(&rows)
            }
            Ok(_) | Err(_) => {
                warn!("overlay blob did not parse; using hardcoded defaults");
                Self::default()
            }
        }
    }

    /// Allowed fee percentages for a resolved column key, falling back to
    /// the plain scope column and finally the Residential column.
    pub fn active_fee_columns(&self, column_key: &str, scope: &str) -> &[f64] {
        if let Some(columns) = self.fee_columns.get(column_key) {
            return columns;
        }
        if let Some(columns) = self.fee_columns.get(scope) {
            return columns;
        }
        self.fee_columns
            .get("Residential")
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Maximum LTV available to a caller: the tier-banded ceiling when the
    /// flat-above-commercial override is in force, the standard maximum
    /// otherwise.
    pub fn max_available_ltv(&self, scope: &str, tier: u32, flat_above_commercial: bool) -> f64 {
        if flat_above_commercial && self.flat_above_commercial.matches_scope(scope) {
            return self.flat_above_commercial.banded_max_ltv(tier);
        }
        DEFAULT_MAX_LTV
    }
}
