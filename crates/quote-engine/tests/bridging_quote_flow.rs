//! Integration specifications for the bridging quote flow: family split,
//! charge-type gating, bucket selection, and bridging economics through
//! the public service facade.

mod common {
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};

    use quote_engine::catalog::RateCatalog;
    use quote_engine::criteria::CriteriaCatalog;
    use quote_engine::overlay::PricingOverlay;
    use quote_engine::quoting::{
        QuoteRecord, QuoteReference, QuoteRepository, QuoteService, RepositoryError,
    };

    pub(super) const RATES_CSV: &str = "\
set_key,property,product,rate,product_fee,admin_fee,min_ltv,max_ltv,min_loan,max_loan,charge_type,rate_status,start_date,end_date
Bridge Fix,Residential,Standard Bridge,0.85,2,295,0,60,100000,5000000,First,Active,,
Bridge Fix,Residential,Standard Bridge,0.89,2,295,60,70,100000,5000000,First,Active,,
Bridge Fix,Residential,Standard Bridge,0.95,2,295,70,75,100000,5000000,First,Active,,
Bridge Var,Residential,Standard Bridge,0.50,2,295,0,60,100000,5000000,First,Active,,
Bridge Fix,Residential,Development Exit Bridge,0.99,2,295,0,60,100000,5000000,First,Active,,
Bridge Fix,Residential,Second Charge Bridge,1.05,2,295,0,70,50000,1000000,Second,Active,,
Fusion,Residential,Fusion Standard,4.79,2,295,,,250000,1000000,First,Active,,
Fusion,Residential,Fusion Legacy,3.99,2,295,,,250000,900000,First,Active,2019-01-01,2020-12-31
Fusion,Residential,Fusion Large,4.59,2,295,,,1000001,5000000,First,Active,,
";

    pub(super) const CRITERIA_CSV: &str = "\
id,criteria_set,product_scope,question_key,question_label,option_label,display_order
b1,Bridging,Bridge & Fusion,exit_route,Exit route,Sale,1
b2,Bridging,Bridge & Fusion,exit_route,Exit route,Refinance,1
b3,Bridging,Bridge & Fusion,sub_product,Sub product,Standard Bridge,2
b4,Bridging,Bridge & Fusion,sub_product,Sub product,Development Exit,2
b5,Bridging,Bridge & Fusion,charge_type,Charge type,First charge,3
b6,Bridging,Bridge & Fusion,charge_type,Charge type,Second charge,3
";

    #[derive(Default, Clone)]
    pub(super) struct RecordingRepository {
        records: Arc<Mutex<HashMap<QuoteReference, QuoteRecord>>>,
    }

    impl QuoteRepository for RecordingRepository {
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

        fn fetch(
            &self,
            reference: &QuoteReference,
        ) -> Result<Option<QuoteRecord>, RepositoryError> {
            let guard = self.records.lock().expect("repository mutex poisoned");
            Ok(guard.get(reference).cloned())
        }
    }

    pub(super) fn service() -> QuoteService<RecordingRepository> {
        let catalog = RateCatalog::from_csv_reader(Cursor::new(RATES_CSV)).expect("rates parse");
        let criteria =
            CriteriaCatalog::from_csv_reader(Cursor::new(CRITERIA_CSV)).expect("criteria parse");
        QuoteService::new(
            Arc::new(RecordingRepository::default()),
            catalog,
            criteria,
            PricingOverlay::default(),
        )
    }
}

use chrono::NaiveDate;
use common::service;
use quote_engine::catalog::ProductFamily;
use quote_engine::quoting::{ChargeType, LoanParams, QuoteRequest};
use std::collections::BTreeMap;

fn reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, 1).expect("valid date")
}

fn request(gross: f64) -> QuoteRequest {
    QuoteRequest {
        params: LoanParams {
            property_value: Some(1_000_000.0),
            monthly_rent: Some(4_000.0),
            specific_gross_loan: Some(gross),
            product_scope: "Residential".to_string(),
            ..LoanParams::default()
        },
        answers: BTreeMap::new(),
        today: Some(reference_date()),
        ..QuoteRequest::default()
    }
}

#[test]
fn one_representative_per_family() {
    let record = service()
        .quote_bridging(request(400_000.0))
        .expect("quote pass succeeds");

    assert_eq!(record.results.len(), 2);
    assert_eq!(record.results[0].family, ProductFamily::Bridge);
    assert_eq!(record.results[1].family, ProductFamily::Fusion);
}

#[test]
fn first_charge_value_feeds_the_ltv_bucket() {
    // 400k + 50k first charge over 1m property = 45% LTV.
    let mut req = request(400_000.0);
    req.params.first_charge_value = Some(50_000.0);

    let record = service()
        .quote_bridging(req)
        .expect("quote pass succeeds");
    let bridge = record
        .results
        .iter()
        .find(|rate| rate.family == ProductFamily::Bridge)
        .expect("bridge representative present");

    let ltv = bridge.ltv.expect("ltv computable");
    assert!((ltv - 45.0).abs() < 1e-9);
    assert_eq!(bridge.ltv, bridge.net_ltv);
    // 45% sits in the 0-60 bucket, which prices at 0.85.
    assert_eq!(bridge.initial_rate, Some(0.85));
}

#[test]
fn higher_ltv_moves_to_the_next_bucket() {
    let mut req = request(650_000.0);
    req.params.charge_type = ChargeType::First;
    let record = service()
        .quote_bridging(req)
        .expect("quote pass succeeds");
    let bridge = record
        .results
        .iter()
        .find(|rate| rate.family == ProductFamily::Bridge)
        .expect("bridge representative present");
    // 65% LTV lands in the 60-70 bucket.
    assert_eq!(bridge.initial_rate, Some(0.89));
}

#[test]
fn second_charge_requests_drop_fusion_entirely() {
    let mut req = request(400_000.0);
    req.params.charge_type = ChargeType::Second;

    let record = service()
        .quote_bridging(req)
        .expect("quote pass succeeds");
    assert_eq!(record.results.len(), 1);
    assert_eq!(record.results[0].family, ProductFamily::Bridge);
    assert_eq!(record.results[0].product_name, "Second Charge Bridge");
}

#[test]
fn sub_product_narrows_first_charge_bridges() {
    let mut req = request(400_000.0);
    req.params.sub_product = Some("Development Exit".to_string());

    let record = service()
        .quote_bridging(req)
        .expect("quote pass succeeds");
    let bridge = record
        .results
        .iter()
        .find(|rate| rate.family == ProductFamily::Bridge)
        .expect("bridge representative present");
    assert_eq!(bridge.product_name, "Development Exit Bridge");
}

#[test]
fn criteria_answers_fill_open_selection_fields() {
    // Sub-product arrives as a criteria answer instead of a parameter.
    let mut req = request(400_000.0);
    req.answers
        .insert("sub_product".to_string(), "development exit".to_string());

    let record = service()
        .quote_bridging(req)
        .expect("quote pass succeeds");
    let bridge = record
        .results
        .iter()
        .find(|rate| rate.family == ProductFamily::Bridge)
        .expect("bridge representative present");
    assert_eq!(bridge.product_name, "Development Exit Bridge");

    // A charge-type answer gates the families the same way the parameter
    // does.
    let mut req = request(400_000.0);
    req.answers
        .insert("charge_type".to_string(), "Second charge".to_string());

    let record = service()
        .quote_bridging(req)
        .expect("quote pass succeeds");
    assert_eq!(record.results.len(), 1);
    assert_eq!(record.results[0].product_name, "Second Charge Bridge");
}

#[test]
fn fusion_buckets_by_loan_size() {
    let record = service()
        .quote_bridging(request(400_000.0))
        .expect("quote pass succeeds");
    let fusion = record
        .results
        .iter()
        .find(|rate| rate.family == ProductFamily::Fusion)
        .expect("fusion representative present");
    assert_eq!(fusion.product_name, "Fusion Standard");
    assert_eq!(fusion.rate_text, "4.79% + BBR");

    let record = service()
        .quote_bridging(request(2_000_000.0))
        .expect("quote pass succeeds");
    let fusion = record
        .results
        .iter()
        .find(|rate| rate.family == ProductFamily::Fusion)
        .expect("fusion representative present");
    assert_eq!(fusion.product_name, "Fusion Large");
}

#[test]
fn bridging_gross_is_never_derived_from_property_value() {
    let mut req = request(400_000.0);
    req.params.specific_gross_loan = None;

    let record = service()
        .quote_bridging(req)
        .expect("quote pass succeeds");
    // No loan amount: nothing to bucket, nothing to price.
    assert!(record.results.is_empty());
}

#[test]
fn specific_net_fixes_the_net_loan() {
    let mut req = request(400_000.0);
    req.params.use_specific_net = true;
    req.params.specific_net_loan = Some(350_000.0);

    let record = service()
        .quote_bridging(req)
        .expect("quote pass succeeds");
    let bridge = record
        .results
        .iter()
        .find(|rate| rate.family == ProductFamily::Bridge)
        .expect("bridge representative present");
    assert_eq!(bridge.net_loan, Some(350_000.0));
    assert_eq!(bridge.gross_loan, Some(400_000.0));
}

#[test]
fn expired_sheets_never_reach_selection() {
    // Fusion Legacy prices cheaper but its window closed in 2020.
    let record = service()
        .quote_bridging(request(400_000.0))
        .expect("quote pass succeeds");
    let fusion = record
        .results
        .iter()
        .find(|rate| rate.family == ProductFamily::Fusion)
        .expect("fusion representative present");
    assert_eq!(fusion.product_name, "Fusion Standard");

    // Inside the legacy window its tighter bucket wins the selection.
    let mut req = request(400_000.0);
    req.today = NaiveDate::from_ymd_opt(2020, 6, 1);
    let record = service()
        .quote_bridging(req)
        .expect("quote pass succeeds");
    let fusion = record
        .results
        .iter()
        .find(|rate| rate.family == ProductFamily::Fusion)
        .expect("fusion representative present");
    assert_eq!(fusion.product_name, "Fusion Legacy");
}
