use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use super::bridging::{self, BridgingSelection, BucketMetric};
use super::btl::{self, BtlSelection};
use super::domain::{ChargeType, LoanParams, MatchedRate};
use super::repository::{
    QuoteKind, QuoteRecord, QuoteReference, QuoteRepository, QuoteStatus, RepositoryError,
};
use crate::catalog::normalize::normalize_text;
use crate::catalog::RateCatalog;
use crate::criteria::{
    build_questions, AnswerSet, CriteriaCatalog, FlagBindings, OptionOrder, Question, SemanticFlag,
};
use crate::overlay::PricingOverlay;

/// Criteria set keys used by the current catalogs.
const BTL_CRITERIA_SET: &str = "BTL";
const BRIDGING_CRITERIA_SET: &str = "Bridging";

/// Bridging question keys whose answers feed the selection directly.
const SUB_PRODUCT_QUESTION_KEY: &str = "sub_product";
const CHARGE_TYPE_QUESTION_KEY: &str = "charge_type";

/// One quote request: loan parameters plus the selected criteria answers
/// (question key -> option label). Unanswered questions default to each
/// question's first option. `today` pins the rate lifecycle window for
/// reproducible passes; it defaults to the current date.
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteRequest {
    pub params: LoanParams,
    #[serde(default)]
    pub answers: BTreeMap<String, String>,
    #[serde(default)]
    pub today: Option<NaiveDate>,
    /// Broker submission route; when present the requested commission is
    /// clamped into the tolerated window around the route default.
    #[serde(default)]
    pub broker_route: Option<String>,
    #[serde(default)]
    pub broker_commission_percent: Option<f64>,
}

impl Default for QuoteRequest {
    fn default() -> Self {
        Self {
            params: LoanParams::default(),
            answers: BTreeMap::new(),
            today: None,
            broker_route: None,
            broker_commission_percent: None,
        }
    }
}

/// Service composing criteria resolution, eligibility filtering, and the
/// economics calculators behind one facade. Each quote pass is pure given
/// its inputs; the repository write is the only side effect.
pub struct QuoteService<R> {
    repository: Arc<R>,
    catalog: RateCatalog,
    criteria: CriteriaCatalog,
    overlay: PricingOverlay,
    flags: FlagBindings,
}

static QUOTE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_quote_reference() -> QuoteReference {
    let id = QUOTE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    QuoteReference(format!("qte-{id:06}"))
}

impl<R> QuoteService<R>
where
    R: QuoteRepository + 'static,
{
    pub fn new(
        repository: Arc<R>,
        catalog: RateCatalog,
        criteria: CriteriaCatalog,
        overlay: PricingOverlay,
    ) -> Self {
        Self {
            repository,
            catalog,
            criteria,
            overlay,
            flags: FlagBindings::standard(),
        }
    }

    pub fn overlay(&self) -> &PricingOverlay {
        &self.overlay
    }

    /// Run a BTL matching and calculation pass and persist the result.
    pub fn quote_btl(&self, request: QuoteRequest) -> Result<QuoteRecord, QuoteServiceError> {
        let QuoteRequest {
            params,
            answers,
            today,
            broker_route,
            broker_commission_percent,
        } = request;
        let broker_commission_percent = self.clamped_commission(
            broker_route.as_deref(),
            broker_commission_percent,
        );

        let questions = build_questions(
            self.criteria.rows(),
            Some(BTL_CRITERIA_SET),
            Some(&params.product_scope),
            OptionOrder::ByTier,
        );
        let resolved = AnswerSet::from_labels(&questions, &answers);
        let tier = resolved.compute_tier();
        let flat_above_commercial = self
            .flags
            .answered_yes(&resolved, SemanticFlag::FlatAboveCommercial);

        let active = self.catalog.active(reference_date(today));
        let selection = BtlSelection::from_params(&params, tier, flat_above_commercial);
        let matched = btl::match_rates(&active, &selection, &self.overlay);
        let results = matched
            .iter()
            .map(|row| btl::economics::calculate(row, &params))
            .collect::<Vec<_>>();

        let max_available_ltv =
            self.overlay
                .max_available_ltv(&params.product_scope, tier, flat_above_commercial);

        info!(
            tier,
            matched = results.len(),
            scope = %params.product_scope,
            "btl quote pass complete"
        );

        self.persist(QuoteRecord {
            reference: next_quote_reference(),
            kind: QuoteKind::Btl,
            status: QuoteStatus::Draft,
            tier,
            params,
            answers,
            broker_commission_percent,
            max_available_ltv,
            results,
        })
    }

    /// Run a bridging pass: Bridge and Fusion filter independently and the
    /// best-match selector picks one representative row per family.
    pub fn quote_bridging(&self, request: QuoteRequest) -> Result<QuoteRecord, QuoteServiceError> {
        let QuoteRequest {
            params,
            answers,
            today,
            broker_route,
            broker_commission_percent,
        } = request;
        let broker_commission_percent = self.clamped_commission(
            broker_route.as_deref(),
            broker_commission_percent,
        );

        // Bridging criteria order options alphabetically; explicit answers
        // fill selection fields the caller left open.
        let questions = build_questions(
            self.criteria.rows(),
            Some(BRIDGING_CRITERIA_SET),
            None,
            OptionOrder::ByLabel,
        );
        let mut selection = BridgingSelection::from_params(&params);
        if selection
            .sub_product
            .as_deref()
            .map_or(true, |sub| sub.trim().is_empty())
        {
            selection.sub_product =
                answered_option(&questions, &answers, SUB_PRODUCT_QUESTION_KEY);
        }
        if selection.charge_type == ChargeType::All {
            if let Some(label) = answered_option(&questions, &answers, CHARGE_TYPE_QUESTION_KEY) {
                let label = normalize_text(&label);
                if label.contains("second") {
                    selection.charge_type = ChargeType::Second;
                } else if label.contains("first") {
                    selection.charge_type = ChargeType::First;
                }
            }
        }

        let active = self.catalog.active(reference_date(today));

        let bridge_rows = bridging::match_bridge(&active, &selection, &params);
        let fusion_rows = bridging::match_fusion(&active, &selection, &params);

        let best_bridge: Option<&MatchedRate> =
            bridging::pick_best(&bridge_rows, bridging::loan_ltv(&params), BucketMetric::Ltv);
        let best_fusion: Option<&MatchedRate> = bridging::pick_best(
            &fusion_rows,
            bridging::loan_size(&params),
            BucketMetric::LoanSize,
        );

        let results = best_bridge
            .into_iter()
            .chain(best_fusion)
            .map(|row| bridging::economics::calculate(row, &params))
            .collect::<Vec<_>>();

        info!(
            bridge_candidates = bridge_rows.len(),
            fusion_candidates = fusion_rows.len(),
            matched = results.len(),
            scope = %params.product_scope,
            "bridging quote pass complete"
        );

        self.persist(QuoteRecord {
            reference: next_quote_reference(),
            kind: QuoteKind::Bridging,
            // Bridging quotes carry no criteria tier; 1 is the floor.
            tier: 1,
            status: QuoteStatus::Draft,
            params,
            answers,
            broker_commission_percent,
            max_available_ltv: 75.0,
            results,
        })
    }

    /// Clamp a broker's requested commission into the tolerated window
    /// around the route default; no route means no commission capture.
    fn clamped_commission(&self, route: Option<&str>, requested: Option<f64>) -> Option<f64> {
        route.map(|route| self.overlay.broker_commission.clamp(route, requested))
    }

    /// Fetch a stored quote for API responses.
    pub fn get(&self, reference: &QuoteReference) -> Result<QuoteRecord, QuoteServiceError> {
        let record = self
            .repository
            .fetch(reference)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    fn persist(&self, record: QuoteRecord) -> Result<QuoteRecord, QuoteServiceError> {
        let stored = self.repository.insert(record)?;
        Ok(stored)
    }
}

fn reference_date(requested: Option<NaiveDate>) -> NaiveDate {
    requested.unwrap_or_else(|| chrono::Local::now().date_naive())
}

/// Resolve an explicitly answered question to the catalog's canonical
/// option label. Unanswered questions and unknown labels resolve to
/// nothing rather than guessing.
fn answered_option(
    questions: &[Question],
    answers: &BTreeMap<String, String>,
    question_key: &str,
) -> Option<String> {
    let label = answers.get(question_key)?;
    let question = questions.iter().find(|q| q.key == question_key)?;
    let wanted = normalize_text(label);
    question
        .options
        .iter()
        .find(|option| normalize_text(&option.label) == wanted)
        .map(|option| option.label.clone())
}

/// Error raised by the quote service.
#[derive(Debug, thiserror::Error)]
pub enum QuoteServiceError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
