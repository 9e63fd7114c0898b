//! Turns one user message into one reply by trying each strategy in turn:
//! greeting, intent template, FAQ, then the QA fallback.

use crate::config::{ChatConfig, GREETING_RESPONSE};
use crate::faq::FaqLookup;
use crate::intent::IntentClassifier;
use crate::normalize::TextNormalizer;
use crate::qa::QaFallback;
use crate::templates::ResponseTemplates;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Greeting,
    Intent,
    Faq,
    QaFallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub stage: Stage,
    pub text: String,
}

impl Resolution {
    fn new(stage: Stage, text: impl Into<String>) -> Self {
        Self {
            stage,
            text: text.into(),
        }
    }
}

pub struct ResponseResolver {
    normalizer: TextNormalizer,
    greetings: Vec<String>,
    classifier: Box<dyn IntentClassifier>,
    templates: ResponseTemplates,
    faq: FaqLookup,
    qa: QaFallback,
}

impl ResponseResolver {
    pub fn new(
        config: &ChatConfig,
        normalizer: TextNormalizer,
        classifier: Box<dyn IntentClassifier>,
        templates: ResponseTemplates,
        faq: FaqLookup,
        qa: QaFallback,
    ) -> Self {
        let greetings = config
            .greetings
            .iter()
            .map(|g| normalizer.normalize(g))
            .filter(|g| !g.is_empty())
            .collect();
        Self {
            normalizer,
            greetings,
            classifier,
            templates,
            faq,
            qa,
        }
    }

    pub fn faq(&self) -> &FaqLookup {
        &self.faq
    }

    pub fn qa(&self) -> &QaFallback {
        &self.qa
    }

    /// Greeting keywords match whole words of the normalized input.
    pub fn is_greeting(&self, normalized: &str) -> bool {
        let padded = format!(" {normalized} ");
        self.greetings
            .iter()
            .any(|g| padded.contains(&format!(" {g} ")))
    }

    pub fn resolve(&self, input: &str) -> Resolution {
        let normalized = self.normalizer.normalize(input);

        if self.is_greeting(&normalized) {
            return Resolution::new(Stage::Greeting, GREETING_RESPONSE);
        }

        match self.classifier.classify(&normalized) {
            Ok(intent) if intent.is_known() => match self.templates.respond(intent) {
                Some(template) => return Resolution::new(Stage::Intent, template),
                None => debug!(intent = intent.as_str(), "no template for intent"),
            },
            Ok(_) => {}
            Err(err) => warn!(error = ?err, "intent classifier failed"),
        }

        let faq = self.faq.lookup(&normalized);
        if faq.is_terminal() {
            return Resolution::new(Stage::Faq, faq.message());
        }
        debug!(outcome = ?faq, "FAQ stage fell through");

        Resolution::new(Stage::QaFallback, self.qa.respond(input))
    }

    pub fn get_response(&self, input: &str) -> String {
        self.resolve(input).text
    }
}
