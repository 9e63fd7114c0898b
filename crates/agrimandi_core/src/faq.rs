use crate::config::ChatConfig;
use crate::error::Result;
use crate::fuzzy::{top_k, top_match};
use crate::model::{Decision, FaqMatch};
use crate::normalize::TextNormalizer;
use crate::store::FaqStore;
use std::collections::HashSet;
use tracing::{info, warn};

pub const NO_MATCH_MESSAGE: &str =
    "Sorry, I could not understand your question. Could you please rephrase it?";
pub const LOOKUP_FAILED_MESSAGE: &str =
    "Sorry, something went wrong while searching the FAQ. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaqOutcome {
    Answer {
        question: String,
        answer: String,
        score: u8,
    },
    Suggestions {
        score: u8,
        questions: Vec<String>,
    },
    NoMatch {
        score: u8,
    },
    Unavailable {
        reason: String,
    },
}

impl FaqOutcome {
    /// Answers and suggestion lists end resolution; the rest fall through.
    pub fn is_terminal(&self) -> bool {
        matches!(self, FaqOutcome::Answer { .. } | FaqOutcome::Suggestions { .. })
    }

    pub fn message(&self) -> String {
        match self {
            FaqOutcome::Answer { answer, .. } => answer.clone(),
            FaqOutcome::Suggestions { questions, .. } => {
                let mut msg = String::from("I'm not sure I understood. Did you mean:");
                for q in questions {
                    msg.push_str("\n  - ");
                    msg.push_str(q);
                }
                msg
            }
            FaqOutcome::NoMatch { .. } => NO_MATCH_MESSAGE.to_string(),
            FaqOutcome::Unavailable { .. } => LOOKUP_FAILED_MESSAGE.to_string(),
        }
    }
}

/// Fuzzy lookup over normalized FAQ questions.
#[derive(Debug, Clone)]
pub struct FaqLookup {
    store: FaqStore,
    normalizer: TextNormalizer,
    normalized: Vec<String>,
    threshold: u8,
    suggestion_threshold: u8,
    max_suggestions: usize,
}

impl FaqLookup {
    pub fn new(store: FaqStore, normalizer: TextNormalizer, config: &ChatConfig) -> Self {
        let normalized: Vec<String> = store
            .entries()
            .iter()
            .map(|e| normalizer.normalize(&e.question))
            .collect();

        let mut seen = HashSet::new();
        for (entry, norm) in store.entries().iter().zip(&normalized) {
            if !seen.insert(norm.as_str()) {
                warn!(
                    question = %entry.question,
                    normalized = %norm,
                    "FAQ question collides with an earlier one after normalization; the earlier entry wins"
                );
            }
        }

        Self {
            store,
            normalizer,
            normalized,
            threshold: config.faq_threshold,
            suggestion_threshold: config.suggestion_threshold(),
            max_suggestions: config.max_suggestions,
        }
    }

    pub fn store(&self) -> &FaqStore {
        &self.store
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Best match for `text` and whether it clears the acceptance or the
    /// suggestion threshold.
    pub fn decide(&self, text: &str) -> Result<FaqMatch> {
        let query = self.normalizer.normalize(text);
        let best = top_match(&query, &self.normalized)?;
        let entry = &self.store.entries()[best.index];

        info!(
            user_input = %query,
            best_match = %entry.question,
            score = best.score,
            "FAQ match"
        );

        let (answer, decision) = if best.score >= self.threshold {
            (Some(entry.answer.clone()), Decision::Hit)
        } else if best.score >= self.suggestion_threshold {
            (None, Decision::Suggest)
        } else {
            (None, Decision::Miss)
        };

        Ok(FaqMatch {
            question: entry.question.clone(),
            answer,
            score: best.score,
            decision,
        })
    }

    /// Original question texts of the closest matches scoring at least the
    /// suggestion threshold, best first.
    pub fn suggestions(&self, text: &str) -> Result<Vec<String>> {
        let query = self.normalizer.normalize(text);
        let ranked = top_k(&query, &self.normalized, self.normalized.len())?;

        let mut seen = HashSet::new();
        Ok(ranked
            .into_iter()
            .take_while(|s| s.score >= self.suggestion_threshold)
            .filter(|s| seen.insert(s.candidate))
            .take(self.max_suggestions)
            .map(|s| self.store.entries()[s.index].question.clone())
            .collect())
    }

    pub fn lookup(&self, text: &str) -> FaqOutcome {
        match self.try_lookup(text) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(error = %err, "FAQ lookup failed");
                FaqOutcome::Unavailable {
                    reason: err.to_string(),
                }
            }
        }
    }

    fn try_lookup(&self, text: &str) -> Result<FaqOutcome> {
        let best = self.decide(text)?;
        Ok(match best.decision {
            Decision::Hit => FaqOutcome::Answer {
                question: best.question,
                answer: best.answer.unwrap_or_default(),
                score: best.score,
            },
            Decision::Suggest => FaqOutcome::Suggestions {
                score: best.score,
                questions: self.suggestions(text)?,
            },
            Decision::Miss => FaqOutcome::NoMatch { score: best.score },
        })
    }

    /// User-facing text for `text`: the answer, a suggestion list, or an
    /// apology.
    pub fn get_faq_response(&self, text: &str) -> String {
        self.lookup(text).message()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fuzzy::weighted_ratio;
    use crate::model::FaqEntry;
    use crate::normalize::clean_text;

    fn sample_store() -> FaqStore {
        FaqStore::from_json_str(
            r#"{
                "What is the mandi rate for wheat?": "₹2100 per quintal",
                "How do I register as a farmer?": "Visit the AgriMandi website.",
                "Which crops grow in winter?": "Wheat, mustard and peas."
            }"#,
        )
        .unwrap()
    }

    fn lookup_with(threshold: u8) -> FaqLookup {
        let config = ChatConfig {
            faq_threshold: threshold,
            ..ChatConfig::default()
        };
        FaqLookup::new(sample_store(), TextNormalizer::default(), &config)
    }

    #[test]
    fn accepts_close_paraphrase() {
        let lookup = lookup_with(65);
        let outcome = lookup.lookup("whats the mandi rate for wheat");
        assert_eq!(
            outcome,
            FaqOutcome::Answer {
                question: "What is the mandi rate for wheat?".to_string(),
                answer: "₹2100 per quintal".to_string(),
                score: 95,
            }
        );
        assert_eq!(
            lookup.get_faq_response("whats the mandi rate for wheat"),
            "₹2100 per quintal"
        );
    }

    #[test]
    fn near_miss_offers_original_questions() {
        let query = "whats the mandi rate for wheat";
        let score = weighted_ratio(&clean_text(query), "mandi rate wheat");
        // Put the best score inside the suggestion band.
        let lookup = lookup_with(score + 5);

        let outcome = lookup.lookup(query);
        let FaqOutcome::Suggestions { questions, .. } = &outcome else {
            panic!("expected suggestions, got {outcome:?}");
        };
        assert_eq!(questions[0], "What is the mandi rate for wheat?");
        assert!(questions.len() <= 3);
        assert!(outcome.is_terminal());
        assert!(outcome
            .message()
            .contains("Did you mean:\n  - What is the mandi rate for wheat?"));
    }

    #[test]
    fn suggestions_are_capped_best_first() {
        let entries = ["", " bran", " seed", " flour", " straw"]
            .iter()
            .map(|suffix| FaqEntry {
                question: format!("What is the mandi rate for wheat{suffix}?"),
                answer: format!("rate{suffix}"),
            })
            .collect();
        let config = ChatConfig {
            faq_threshold: 100,
            suggestion_margin: 30,
            ..ChatConfig::default()
        };
        let lookup = FaqLookup::new(
            FaqStore::from_entries(entries),
            TextNormalizer::default(),
            &config,
        );

        let query = "whats the mandi rate for wheat";
        let normalized = clean_text(query);
        for q in lookup.store().entries() {
            assert!(weighted_ratio(&normalized, &clean_text(&q.question)) >= 70);
        }

        assert_eq!(
            lookup.lookup(query),
            FaqOutcome::Suggestions {
                score: 95,
                questions: vec![
                    "What is the mandi rate for wheat?".to_string(),
                    "What is the mandi rate for wheat bran?".to_string(),
                    "What is the mandi rate for wheat seed?".to_string(),
                ],
            }
        );
    }

    #[test]
    fn suggestions_only_include_scores_in_band() {
        let lookup = lookup_with(65);
        let query = clean_text("register farmer");
        for q in lookup.suggestions("register farmer").unwrap() {
            assert!(weighted_ratio(&query, &clean_text(&q)) >= 55);
        }
    }

    #[test]
    fn unrelated_input_is_not_terminal() {
        let lookup = lookup_with(65);
        let outcome = lookup.lookup("zzzz qqqq");
        assert!(matches!(outcome, FaqOutcome::NoMatch { .. }));
        assert!(!outcome.is_terminal());
        assert_eq!(outcome.message(), NO_MATCH_MESSAGE);
    }

    #[test]
    fn empty_store_degrades_to_apology() {
        let lookup = FaqLookup::new(
            FaqStore::default(),
            TextNormalizer::default(),
            &ChatConfig::default(),
        );
        let outcome = lookup.lookup("mandi rate");
        assert!(matches!(outcome, FaqOutcome::Unavailable { .. }));
        assert_eq!(lookup.get_faq_response("mandi rate"), LOOKUP_FAILED_MESSAGE);
    }

    #[test]
    fn colliding_questions_resolve_to_first_entry() {
        let store = FaqStore::from_json_str(
            r#"{"What is the rate?": "first", "what is THE rate": "second"}"#,
        )
        .unwrap();
        let lookup = FaqLookup::new(store, TextNormalizer::default(), &ChatConfig::default());
        let best = lookup.decide("rate").unwrap();
        assert_eq!(best.decision, Decision::Hit);
        assert_eq!(best.answer.as_deref(), Some("first"));
        assert_eq!(lookup.suggestions("rate").unwrap().len(), 1);
    }
}
