pub mod config;
pub mod error;
pub mod eval;
pub mod faq;
pub mod fuzzy;
pub mod intent;
pub mod model;
pub mod normalize;
pub mod qa;
pub mod resolver;
pub mod store;
pub mod templates;

pub use config::{ChatConfig, FALLBACK_CONTEXT, GREETING_RESPONSE};
pub use error::{ChatError, Result};
pub use eval::{evaluate_cases, CaseExpectation, EvalCase, EvalOutcome, EvalSummary};
pub use faq::{FaqLookup, FaqOutcome};
pub use fuzzy::{top_k, top_match, weighted_ratio, Scored};
pub use intent::{DisabledIntentClassifier, IntentClassifier, KeywordIntentClassifier};
pub use model::{Decision, FaqEntry, FaqMatch, Intent};
pub use normalize::{clean_text, NormalizeOptions, TextNormalizer};
pub use qa::{DistilBertQaModel, LexicalQaModel, QaAnswer, QaFallback, QaModel, QaOutcome};
pub use resolver::{Resolution, ResponseResolver, Stage};
pub use store::FaqStore;
pub use templates::ResponseTemplates;
