//! Extractive question answering over a fixed context passage.

pub mod distilbert;
pub mod fallback;

use crate::normalize::TextNormalizer;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub use distilbert::DistilBertQaModel;
pub use fallback::{QaFallback, QaOutcome};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaAnswer {
    pub answer: String,
    pub confidence: f32,
}

/// An extractive QA capability: finds the span of `context` answering
/// `question` and reports how sure it is.
pub trait QaModel: Send + Sync {
    fn answer(&self, question: &str, context: &str) -> Result<QaAnswer>;
}

impl QaModel for Box<dyn QaModel> {
    fn answer(&self, question: &str, context: &str) -> Result<QaAnswer> {
        (**self).answer(question, context)
    }
}

/// Model-free reader: answers with the context sentence sharing the largest
/// fraction of the question's content words.
#[derive(Debug, Clone, Default)]
pub struct LexicalQaModel {
    normalizer: TextNormalizer,
}

impl LexicalQaModel {
    pub fn new(normalizer: TextNormalizer) -> Self {
        Self { normalizer }
    }

    fn words(&self, text: &str) -> HashSet<String> {
        self.normalizer
            .normalize(text)
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }
}

fn sentences(context: &str) -> impl Iterator<Item = &str> {
    context
        .split(['.', '!', '?', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

impl QaModel for LexicalQaModel {
    fn answer(&self, question: &str, context: &str) -> Result<QaAnswer> {
        let wanted = self.words(question);
        if wanted.is_empty() {
            return Ok(QaAnswer {
                answer: String::new(),
                confidence: 0.0,
            });
        }

        let mut best = QaAnswer {
            answer: String::new(),
            confidence: 0.0,
        };
        for sentence in sentences(context) {
            let have = self.words(sentence);
            let overlap = wanted.iter().filter(|w| have.contains(*w)).count();
            let confidence = overlap as f32 / wanted.len() as f32;
            if confidence > best.confidence {
                best = QaAnswer {
                    answer: sentence.to_string(),
                    confidence,
                };
            }
        }
        Ok(best)
    }
}
