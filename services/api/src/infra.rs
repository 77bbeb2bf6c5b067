use metrics_exporter_prometheus::PrometheusHandle;
use quote_engine::catalog::RateCatalog;
use quote_engine::config::SourceConfig;
use quote_engine::criteria::CriteriaCatalog;
use quote_engine::error::AppError;
use quote_engine::overlay::PricingOverlay;
use quote_engine::quoting::{QuoteRecord, QuoteReference, QuoteRepository, RepositoryError};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::warn;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryQuoteRepository {
    records: Arc<Mutex<HashMap<QuoteReference, QuoteRecord>>>,
}

impl QuoteRepository for InMemoryQuoteRepository {
    fn insert(&self, record: QuoteRecord) -> Result<QuoteRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.reference) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.reference.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: QuoteRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.reference) {
            guard.insert(record.reference.clone(), record);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, reference: &QuoteReference) -> Result<Option<QuoteRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(reference).cloned())
    }
}

/// Built-in rate sheet used when no APP_RATES_CSV source is configured.
pub(crate) const SAMPLE_RATES_CSV: &str = "\
set_key,property,tier,product,rate,product_fee,admin_fee,proc_fee,min_ltv,max_ltv,min_loan,max_loan,max_term,charge_type,is_retention,rate_status
BTL,Residential,1,2yr Fix,5.49,2,150,1,0,75,50000,2000000,24,,no,Active
BTL,Residential,1,2yr Fix,5.19,4,150,1,0,75,50000,2000000,24,,no,Active
BTL,Residential,1,3yr Fix,5.39,3,150,1,0,75,50000,2000000,36,,no,Active
BTL,Residential,1,2yr Tracker,5.10,2,150,1,0,75,50000,2000000,24,,no,Active
BTL,Residential,2,2yr Fix,5.89,2,150,1,0,75,50000,2000000,24,,no,Active
BTL,Residential,1,2yr Fix Retention,4.89,1.5,150,1,0,65,50000,2000000,24,,yes,Active
BTL,Residential,1,2yr Fix Retention,4.99,1.5,150,1,0,75,50000,2000000,24,,yes,Active
BTL,Commercial,1,2yr Fix,6.10,2,295,1,0,70,75000,3000000,24,,no,Active
BTL,Semi-Commercial,1,2yr Fix,5.95,2,295,1,0,70,75000,3000000,24,,no,Active
BTL,Flat above Commercial,2,2yr Fix,6.25,2,295,1,0,65,75000,2000000,24,,no,Active
BTL,Flat above Commercial,3,2yr Fix,6.45,2,295,1,0,75,75000,2000000,24,,no,Active
Bridge Fix,Residential,,Standard Bridge,0.85,2,295,1,0,60,100000,5000000,12,First,no,Active
Bridge Fix,Residential,,Standard Bridge,0.89,2,295,1,60,70,100000,5000000,12,First,no,Active
Bridge Fix,Residential,,Standard Bridge,0.95,2,295,1,70,75,100000,5000000,12,First,no,Active
Bridge Var,Residential,,Standard Bridge,0.50,2,295,1,0,70,100000,5000000,12,First,no,Active
Bridge Fix,Residential,,Second Charge Bridge,1.05,2,295,1,0,70,50000,1000000,12,Second,no,Active
Bridge Fix,Commercial,,Commercial Bridge,1.00,2,295,1,0,65,100000,5000000,12,First,no,Active
Fusion,Residential,,Fusion Standard,4.79,2,295,1,,,250000,1000000,24,First,no,Active
Fusion,Residential,,Fusion Large,4.59,2,295,1,,,1000001,5000000,24,First,no,Active
";

/// Built-in criteria set used when no APP_CRITERIA_CSV source is
/// configured.
pub(crate) const SAMPLE_CRITERIA_CSV: &str = "\
id,criteria_set,product_scope,question_key,question_label,option_label,tier,info_tip,display_order
c1,BTL,Residential,adverse_credit,Adverse credit in the last 24 months?,None,1,CCJs and defaults within 24 months,1
c2,BTL,Residential,adverse_credit,Adverse credit in the last 24 months?,Up to 2 events,2,,1
c3,BTL,Residential,adverse_credit,Adverse credit in the last 24 months?,3 or more events,3,,1
c4,BTL,Residential,first_time_landlord,First time landlord?,No,1,,2
c5,BTL,Residential,first_time_landlord,First time landlord?,Yes,2,,2
c6,BTL,Flat above Commercial,adverse_credit,Adverse credit in the last 24 months?,None,1,,1
c7,BTL,Flat above Commercial,adverse_credit,Adverse credit in the last 24 months?,Up to 2 events,2,,1
c8,BTL,Flat above Commercial,adverse_credit,Adverse credit in the last 24 months?,3 or more events,3,,1
c9,BTL,Flat above Commercial,flat_above_commercial,Is the security a flat above a commercial unit?,No,1,,3
c10,BTL,Flat above Commercial,flat_above_commercial,Is the security a flat above a commercial unit?,Yes,1,,3
c11,Bridging,Bridge & Fusion,exit_route,Exit route,Sale,,Planned repayment route,1
c12,Bridging,Bridge & Fusion,exit_route,Exit route,Refinance,,,1
c13,Bridging,Bridge & Fusion,sub_product,Sub product,Standard Bridge,,,2
c14,Bridging,Bridge & Fusion,sub_product,Sub product,Development Exit,,,2
";

pub(crate) fn load_rate_catalog(sources: &SourceConfig) -> Result<RateCatalog, AppError> {
    match &sources.rates_csv {
        Some(path) => Ok(RateCatalog::from_csv_path(path).map_err(AppError::from)?),
        None => Ok(RateCatalog::from_csv_reader(Cursor::new(SAMPLE_RATES_CSV))
            .map_err(AppError::from)?),
    }
}

pub(crate) fn load_criteria_catalog(sources: &SourceConfig) -> Result<CriteriaCatalog, AppError> {
    match &sources.criteria_csv {
        Some(path) => Ok(CriteriaCatalog::from_csv_path(path).map_err(AppError::from)?),
        None => Ok(
            CriteriaCatalog::from_csv_reader(Cursor::new(SAMPLE_CRITERIA_CSV))
                .map_err(AppError::from)?,
        ),
    }
}

/// Overlay resolution never fails: an unreadable or malformed source is
/// the overlay-absent case and yields the hardcoded defaults.
pub(crate) fn load_overlay(sources: &SourceConfig) -> PricingOverlay {
    match &sources.overlay_json {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(raw) => PricingOverlay::from_json_str(&raw),
            Err(err) => {
                warn!(path = %path.display(), %err, "overlay source unreadable; using defaults");
                PricingOverlay::default()
            }
        },
        None => PricingOverlay::default(),
    }
}
