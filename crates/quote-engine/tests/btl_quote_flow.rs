//! Integration specifications for the buy-to-let quote flow.
//!
//! Scenarios run end-to-end through the public service facade and HTTP
//! router: criteria resolution, eligibility filtering, economics, and
//! persistence, without reaching into private modules.

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
set_key,property,tier,product,rate,product_fee,admin_fee,min_ltv,max_ltv,is_retention,rate_status,start_date,end_date
BTL,Residential,1,2yr Fix,5.49,2,150,0,75,no,Active,,
BTL,Residential,1,2yr Fix,5.19,4,150,0,75,no,Active,,
BTL,Residential,1,2yr Fix,5.09,5,150,0,75,no,Active,,
BTL,Residential,1,3yr Fix,5.39,2,150,0,75,no,Active,,
BTL,Residential,2,2yr Fix,5.89,2,150,0,75,no,Active,,
BTL,Residential,1,2yr Fix Retention,4.89,1.5,150,0,65,yes,Active,,
BTL,Residential,1,2yr Fix Retention,4.99,1.5,150,0,75,yes,Active,,
BTL,Residential,1,2yr Fix,4.25,2,150,0,75,no,Active,2020-01-01,2020-12-31
BTL,Commercial,1,2yr Fix,6.10,2,295,0,70,no,Active,,
BTL,Semi-Commercial,1,2yr Fix,5.95,2,295,0,70,no,Active,,
BTL,Flat above Commercial,2,2yr Fix,6.25,2,295,0,65,no,Active,,
BTL,Flat above Commercial,2,2yr Fix 75,6.35,2,295,0,75,no,Active,,
";

    pub(super) const CRITERIA_CSV: &str = "\
id,criteria_set,product_scope,question_key,question_label,option_label,tier,display_order
c1,BTL,Residential,adverse_credit,Adverse credit?,None,1,1
c2,BTL,Residential,adverse_credit,Adverse credit?,Up to 2 events,2,1
c3,BTL,Residential,adverse_credit,Adverse credit?,3 or more events,3,1
c4,BTL,Flat above Commercial,adverse_credit,Adverse credit?,None,1,1
c5,BTL,Flat above Commercial,adverse_credit,Adverse credit?,Up to 2 events,2,1
c6,BTL,Flat above Commercial,flat_above_commercial,Flat above a commercial unit?,No,1,2
c7,BTL,Flat above Commercial,flat_above_commercial,Flat above a commercial unit?,Yes,1,2
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
        service_with_repository(Arc::new(RecordingRepository::default()))
    }

    pub(super) fn service_with_repository(
        repository: Arc<RecordingRepository>,
    ) -> QuoteService<RecordingRepository> {
        let catalog = RateCatalog::from_csv_reader(Cursor::new(RATES_CSV)).expect("rates parse");
        let criteria =
            CriteriaCatalog::from_csv_reader(Cursor::new(CRITERIA_CSV)).expect("criteria parse");
        QuoteService::new(repository, catalog, criteria, PricingOverlay::default())
    }
}

use chrono::NaiveDate;
use common::{service, service_with_repository, RecordingRepository};
use quote_engine::quoting::{LoanParams, LoanType, QuoteRequest, RetentionChoice, RetentionLtv};
use std::collections::BTreeMap;
use std::sync::Arc;

fn reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, 1).expect("valid date")
}

fn residential_request() -> QuoteRequest {
    QuoteRequest {
        params: LoanParams {
            property_value: Some(1_200_000.0),
            monthly_rent: Some(4_500.0),
            loan_type: LoanType::MaxGross,
            product_scope: "Residential".to_string(),
            product_type: "2yr Fix".to_string(),
            ..LoanParams::default()
        },
        answers: BTreeMap::new(),
        today: Some(reference_date()),
        ..QuoteRequest::default()
    }
}

#[test]
fn max_gross_quote_reproduces_reference_economics() {
    let record = service()
        .quote_btl(residential_request())
        .expect("quote pass succeeds");

    assert_eq!(record.tier, 1);
    assert!(!record.results.is_empty());

    let two_percent = record
        .results
        .iter()
        .find(|rate| rate.product_fee_percent == Some(2.0))
        .expect("2% fee bucket present");

    assert_eq!(two_percent.gross_loan, Some(900_000.0));
    assert_eq!(two_percent.product_fee_amount, Some(18_000.0));
    // 900,000 - 18,000 fee - 150 admin fee
    assert_eq!(two_percent.net_loan, Some(881_850.0));
    assert_eq!(two_percent.ltv, Some(75.0));
}

#[test]
fn specific_net_round_trips_to_the_same_gross() {
    let mut request = residential_request();
    request.params.loan_type = LoanType::SpecificNet;
    request.params.specific_net_loan = Some(882_000.0);

    let record = service().quote_btl(request).expect("quote pass succeeds");
    let two_percent = record
        .results
        .iter()
        .find(|rate| rate.product_fee_percent == Some(2.0))
        .expect("2% fee bucket present");

    let gross = two_percent.gross_loan.expect("gross derivable");
    assert!((gross - 900_000.0).abs() < 1.0);
}

#[test]
fn unanswered_criteria_default_to_tier_one() {
    let record = service()
        .quote_btl(residential_request())
        .expect("quote pass succeeds");
    assert_eq!(record.tier, 1);
    // Tier 2 rows stay out of a tier 1 pass.
    assert!(record
        .results
        .iter()
        .all(|rate| rate.tier.trim() == "1" || rate.tier.trim().is_empty()));
}

#[test]
fn answered_criteria_raise_the_tier() {
    let mut request = residential_request();
    request.answers.insert(
        "adverse_credit".to_string(),
        "Up to 2 events".to_string(),
    );

    let record = service().quote_btl(request).expect("quote pass succeeds");
    assert_eq!(record.tier, 2);
    assert!(record
        .results
        .iter()
        .all(|rate| rate.tier.trim() == "2"));
}

#[test]
fn missing_product_type_is_the_empty_state() {
    let mut request = residential_request();
    request.params.product_type = String::new();

    let record = service().quote_btl(request).expect("quote pass succeeds");
    assert!(record.results.is_empty());
}

#[test]
fn retention_choice_partitions_the_results() {
    let mut request = residential_request();
    let record = service()
        .quote_btl(request.clone())
        .expect("quote pass succeeds");
    assert!(record
        .results
        .iter()
        .all(|rate| !rate.product_name.to_lowercase().contains("retention")));

    request.params.retention_choice = RetentionChoice::Yes;
    request.params.retention_ltv = RetentionLtv::Max65;
    let record = service().quote_btl(request).expect("quote pass succeeds");
    assert_eq!(record.results.len(), 1);
    assert!(record.results[0]
        .product_name
        .to_lowercase()
        .contains("retention"));
}

#[test]
fn fee_buckets_stay_inside_the_active_columns() {
    // Residential allows [6, 4, 3, 2]; the 5% sheet row must not appear.
    let record = service()
        .quote_btl(residential_request())
        .expect("quote pass succeeds");
    let allowed = [6.0, 4.0, 3.0, 2.0];
    for rate in &record.results {
        let fee = rate.product_fee_percent.expect("sheet rows carry fees");
        assert!(
            allowed.contains(&fee),
            "fee {fee} escaped the Residential columns"
        );
    }
}

#[test]
fn expired_rates_never_price() {
    let record = service()
        .quote_btl(residential_request())
        .expect("quote pass succeeds");
    assert!(record
        .results
        .iter()
        .all(|rate| rate.initial_rate != Some(4.25)));
}

#[test]
fn flat_above_commercial_bands_by_tier() {
    let mut request = residential_request();
    request.params.product_scope = "Flat above Commercial".to_string();
    request
        .answers
        .insert("adverse_credit".to_string(), "Up to 2 events".to_string());
    request
        .answers
        .insert("flat_above_commercial".to_string(), "Yes".to_string());

    let record = service().quote_btl(request).expect("quote pass succeeds");
    assert_eq!(record.tier, 2);
    assert_eq!(record.max_available_ltv, 65.0);
    assert_eq!(record.results.len(), 1);
    assert_eq!(record.results[0].product_name, "2yr Fix");
}

#[test]
fn identical_requests_yield_identically_ordered_results() {
    let service = service();
    let first = service
        .quote_btl(residential_request())
        .expect("first pass succeeds");
    let second = service
        .quote_btl(residential_request())
        .expect("second pass succeeds");
    assert_eq!(first.results, second.results);

    // Ordered ascending by rate.
    let rates: Vec<f64> = first
        .results
        .iter()
        .filter_map(|rate| rate.initial_rate)
        .collect();
    let mut sorted = rates.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("finite rates"));
    assert_eq!(rates, sorted);
}

#[test]
fn requested_commission_is_clamped_to_the_route_window() {
    let mut request = residential_request();
    request.broker_route = Some("Direct Broker".to_string());
    request.broker_commission_percent = Some(2.5);

    let record = service().quote_btl(request).expect("quote pass succeeds");
    // Direct Broker defaults to 0.9% with a 0.1 tolerance.
    assert_eq!(record.broker_commission_percent, Some(1.0));

    let record = service()
        .quote_btl(residential_request())
        .expect("quote pass succeeds");
    assert_eq!(record.broker_commission_percent, None);
}

#[test]
fn stored_quotes_are_retrievable_by_reference() {
    let repository = Arc::new(RecordingRepository::default());
    let service = service_with_repository(repository);

    let record = service
        .quote_btl(residential_request())
        .expect("quote pass succeeds");
    let fetched = service.get(&record.reference).expect("quote retrievable");
    assert_eq!(fetched.results, record.results);
    assert_eq!(fetched.status.label(), "draft");
}

mod router {
    use super::common::service;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use quote_engine::quoting::quote_router;
    use serde_json::json;
    use std::sync::Arc;
    use tower::util::ServiceExt;

    #[tokio::test]
    async fn btl_endpoint_returns_a_created_quote() {
        let app = quote_router(Arc::new(service()));
        let payload = json!({
            "params": {
                "property_value": 1_200_000.0,
                "monthly_rent": 4_500.0,
                "loan_type": "max_gross",
                "product_scope": "Residential",
                "product_type": "2yr Fix"
            },
            "today": "2026-06-01"
        });

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/quotes/btl")
                    .header("content-type", "application/json")
                    .body(Body::from(payload.to_string()))
                    .expect("request builds"),
            )
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::CREATED);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        let body: serde_json::Value = serde_json::from_slice(&bytes).expect("json body");
        assert_eq!(body["kind"], "btl");
        assert!(body["results"].as_array().expect("results array").len() > 1);
    }

    #[tokio::test]
    async fn unknown_references_return_not_found() {
        let app = quote_router(Arc::new(service()));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/quotes/qte-999999")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
