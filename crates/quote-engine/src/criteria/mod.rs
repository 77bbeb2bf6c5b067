//! Qualifying-criteria resolution.
//!
//! Criteria rows arrive one option per row. This module groups them into
//! questions per (criteria set, product scope), derives the integer tier
//! from selected answers, and resolves semantic flags (such as "flat above
//! commercial") through an explicit question-key mapping instead of label
//! pattern-matching.

mod flags;

pub use flags::{FlagBindings, SemanticFlag};

use crate::catalog::normalize::{first_digit_run, normalize_text};
use crate::catalog::{CatalogError, RawRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

/// One criteria option row as sourced externally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriteriaRow {
    pub id: Option<String>,
    pub criteria_set: String,
    pub product_scope: String,
    pub question_key: String,
    pub question_label: String,
    pub option_label: String,
    /// Raw tier text; non-numeric tiers are ignored by tier derivation.
    pub tier: String,
    pub info_tip: Option<String>,
    pub display_order: Option<i64>,
}

/// The criteria catalog, normalized at ingestion like the rate catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CriteriaCatalog {
    rows: Vec<CriteriaRow>,
}

impl CriteriaCatalog {
    pub fn from_rows(rows: Vec<CriteriaRow>) -> Self {
        Self { rows }
    }

    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(file)
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, CatalogError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);
        let mut rows = Vec::new();
        for result in csv_reader.deserialize::<BTreeMap<String, String>>() {
            let record = RawRecord::from_csv_row(result?);
            if let Some(row) = canonical_row(&record) {
                rows.push(row);
            }
        }
        Ok(Self { rows })
    }

    pub fn from_json_values(values: &[serde_json::Value]) -> Self {
        let rows = values
            .iter()
            .filter_map(serde_json::Value::as_object)
            .map(RawRecord::from_json_object)
            .filter_map(|record| canonical_row(&record))
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[CriteriaRow] {
        &self.rows
    }

    /// Distinct product scopes present, in first-seen order.
    pub fn scopes(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for row in &self.rows {
            if !row.product_scope.is_empty()
                && !seen
                    .iter()
                    .any(|s: &String| normalize_text(s) == normalize_text(&row.product_scope))
            {
                seen.push(row.product_scope.clone());
            }
        }
        seen
    }
}

fn canonical_row(record: &RawRecord) -> Option<CriteriaRow> {
    let question_key = record
        .probe_owned(&["question_key", "question"])
        .unwrap_or_default();
    let option_label = record.probe_owned(&["option_label"]).unwrap_or_default();
    if question_key.is_empty() && option_label.is_empty() {
        return None;
    }

    Some(CriteriaRow {
        id: record.probe_owned(&["id"]),
        criteria_set: record.probe_owned(&["criteria_set"]).unwrap_or_default(),
        product_scope: record.probe_owned(&["product_scope"]).unwrap_or_default(),
        question_label: record
            .probe_owned(&["question_label"])
            .unwrap_or_else(|| question_key.clone()),
        tier: record.probe_owned(&["tier"]).unwrap_or_default(),
        info_tip: record.probe_owned(&["info_tip", "helper"]),
        display_order: record
            .probe(&["display_order"])
            .and_then(|raw| raw.trim().parse::<i64>().ok()),
        question_key,
        option_label,
    })
}

/// A selectable option within a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub id: Option<String>,
    pub label: String,
    pub tier: String,
}

impl QuestionOption {
    pub fn tier_value(&self) -> Option<u32> {
        self.tier
            .trim()
            .parse::<u32>()
            .ok()
            .or_else(|| first_digit_run(&self.tier))
    }

    fn matches(&self, other: &QuestionOption) -> bool {
        if let (Some(a), Some(b)) = (&self.id, &other.id) {
            if a == b {
                return true;
            }
        }
        normalize_text(&self.label) == normalize_text(&other.label)
    }
}

/// A grouped question with its ordered options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub key: String,
    pub label: String,
    pub info_tip: Option<String>,
    pub display_order: Option<i64>,
    pub options: Vec<QuestionOption>,
}

/// How a family orders options within a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionOrder {
    /// Ascending tier; the buy-to-let convention.
    ByTier,
    /// Alphabetical label; the bridging convention.
    ByLabel,
}

/// Group criteria rows into questions for one (criteria set, scope) pair.
///
/// The first non-empty info tip and display order per question win; options
/// deduplicate by id or case-insensitive label. Deterministic given
/// identical input ordering.
pub fn build_questions(
    rows: &[CriteriaRow],
    criteria_set: Option<&str>,
    scope: Option<&str>,
    order: OptionOrder,
) -> Vec<Question> {
    let set_filter = criteria_set.map(normalize_text);
    let scope_filter = scope.map(normalize_text);

    let mut questions: Vec<Question> = Vec::new();
    for row in rows {
        if let Some(wanted) = &set_filter {
            if normalize_text(&row.criteria_set) != *wanted {
                continue;
            }
        }
        if let Some(wanted) = &scope_filter {
            if normalize_text(&row.product_scope) != *wanted {
                continue;
            }
        }

        let option = QuestionOption {
            id: row.id.clone(),
            label: row.option_label.clone(),
            tier: row.tier.clone(),
        };

        match questions.iter_mut().find(|q| q.key == row.question_key) {
            Some(question) => {
                if question.info_tip.is_none() {
                    question.info_tip = row.info_tip.clone().filter(|tip| !tip.is_empty());
                }
                if question.display_order.is_none() {
                    question.display_order = row.display_order;
                }
                if !question.options.iter().any(|o| o.matches(&option)) {
                    question.options.push(option);
                }
            }
            None => questions.push(Question {
                key: row.question_key.clone(),
                label: row.question_label.clone(),
                info_tip: row.info_tip.clone().filter(|tip| !tip.is_empty()),
                display_order: row.display_order,
                options: vec![option],
            }),
        }
    }

    for question in &mut questions {
        match order {
            OptionOrder::ByTier => question
                .options
                .sort_by_key(|option| option.tier_value().unwrap_or(0)),
            OptionOrder::ByLabel => question
                .options
                .sort_by(|a, b| a.label.cmp(&b.label)),
        }
    }

    questions.sort_by(|a, b| {
        a.display_order
            .unwrap_or(i64::MAX)
            .cmp(&b.display_order.unwrap_or(i64::MAX))
            .then_with(|| a.key.cmp(&b.key))
    });

    questions
}

/// Selected answers keyed by question. Unanswered questions default to the
/// first option when built from a question list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnswerSet {
    answers: BTreeMap<String, QuestionOption>,
}

impl AnswerSet {
    /// Default every question to its first option.
    pub fn defaults(questions: &[Question]) -> Self {
        let mut answers = BTreeMap::new();
        for question in questions {
            if let Some(option) = question.options.first() {
                answers.insert(question.key.clone(), option.clone());
            }
        }
        Self { answers }
    }

    /// Defaults overridden by explicit selections, matched by option label
    /// (case-insensitive). Unknown questions and unknown labels are
    /// ignored.
    pub fn from_labels(questions: &[Question], selected: &BTreeMap<String, String>) -> Self {
        let mut set = Self::defaults(questions);
        for (key, label) in selected {
            let Some(question) = questions.iter().find(|q| &q.key == key) else {
                continue;
            };
            let wanted = normalize_text(label);
            if let Some(option) = question
                .options
                .iter()
                .find(|option| normalize_text(&option.label) == wanted)
            {
                set.answers.insert(key.clone(), option.clone());
            }
        }
        set
    }

    pub fn set(&mut self, question_key: impl Into<String>, option: QuestionOption) {
        self.answers.insert(question_key.into(), option);
    }

    pub fn answer(&self, question_key: &str) -> Option<&QuestionOption> {
        self.answers.get(question_key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &QuestionOption)> {
        self.answers.iter()
    }

    /// The derived tier: the highest numeric tier among answered options,
    /// never below 1. Non-numeric tiers are ignored, not errors.
    pub fn compute_tier(&self) -> u32 {
        self.answers
            .values()
            .filter_map(QuestionOption::tier_value)
            .fold(1, u32::max)
    }
}
