//! Semantic flag resolution for criteria questions.
//!
//! Some filter rules hinge on what a question *means*, not just its tier.
//! Rather than pattern-matching question labels at filter time, known
//! question keys are bound to semantic flags once, here, and filters only
//! consume the resolved flags.

use super::AnswerSet;
use crate::catalog::normalize::{normalize_text, normalize_token};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Semantic meanings a criteria question can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticFlag {
    /// The security is a flat above a commercial unit, which swaps the
    /// standard LTV gate for the tier-banded override.
    FlatAboveCommercial,
}

/// Mapping from question keys (normalized) to semantic flags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlagBindings {
    bindings: BTreeMap<String, SemanticFlag>,
}

impl FlagBindings {
    /// Bindings for the question keys used by the current criteria sets.
    pub fn standard() -> Self {
        let mut bindings = Self::default();
        for key in [
            "flat_above_commercial",
            "flat-above-commercial",
            "flatAboveCommercial",
            "flat_above_commercial_unit",
        ] {
            bindings.bind(key, SemanticFlag::FlatAboveCommercial);
        }
        bindings
    }

    pub fn bind(&mut self, question_key: &str, flag: SemanticFlag) {
        self.bindings.insert(normalize_token(question_key), flag);
    }

    pub fn flag_for(&self, question_key: &str) -> Option<SemanticFlag> {
        self.bindings.get(&normalize_token(question_key)).copied()
    }

    /// Whether any question bound to the flag is answered "Yes".
    pub fn answered_yes(&self, answers: &AnswerSet, flag: SemanticFlag) -> bool {
        answers.iter().any(|(key, option)| {
            self.flag_for(key) == Some(flag) && normalize_text(&option.label) == "yes"
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::QuestionOption;

    fn option(label: &str) -> QuestionOption {
        QuestionOption {
            id: None,
            label: label.to_string(),
            tier: String::new(),
        }
    }

    #[test]
    fn standard_bindings_recognize_key_spellings() {
        let bindings = FlagBindings::standard();
        assert_eq!(
            bindings.flag_for("flat_above_commercial"),
            Some(SemanticFlag::FlatAboveCommercial)
        );
        assert_eq!(
            bindings.flag_for("Flat Above Commercial"),
            Some(SemanticFlag::FlatAboveCommercial)
        );
        assert_eq!(bindings.flag_for("adverse_credit"), None);
    }

    #[test]
    fn yes_answer_sets_the_flag() {
        let bindings = FlagBindings::standard();
        let mut answers = AnswerSet::default();
        answers.set("flat_above_commercial", option("Yes"));
        assert!(bindings.answered_yes(&answers, SemanticFlag::FlatAboveCommercial));

        answers.set("flat_above_commercial", option("No"));
        assert!(!bindings.answered_yes(&answers, SemanticFlag::FlatAboveCommercial));
    }

    #[test]
    fn unbound_questions_never_set_flags() {
        let bindings = FlagBindings::standard();
        let mut answers = AnswerSet::default();
        answers.set("adverse_credit", option("Yes"));
        assert!(!bindings.answered_yes(&answers, SemanticFlag::FlatAboveCommercial));
    }
}
