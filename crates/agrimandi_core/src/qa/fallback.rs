use super::{QaAnswer, QaModel};
use crate::config::ChatConfig;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

pub const EMPTY_INPUT_MESSAGE: &str = "Please enter a valid question.";
pub const NO_ANSWER_MESSAGE: &str = "Sorry, I couldn't find an answer.";
pub const UNRELIABLE_ANSWER_MESSAGE: &str =
    "Sorry, the system couldn't find a reliable answer. Please try rephrasing your question.";
pub const QA_FAILED_MESSAGE: &str =
    "Sorry, I'm having trouble answering right now. Please try again later.";

const ELLIPSIS: &str = "...";

const APOLOGY_PREFIXES: &[&str] = &[
    "sorry",
    "i'm sorry",
    "i am sorry",
    "i apologize",
    "i apologise",
    "apologies",
    "unfortunately",
];

const UNKNOWN_MARKERS: &[&str] = &["i don't know", "i do not know", "i dont know"];

#[derive(Debug, Clone, PartialEq)]
pub enum QaOutcome {
    EmptyInput,
    Answered {
        answer: String,
        confidence: f32,
        truncated: bool,
        elapsed: Duration,
    },
    LowConfidence {
        confidence: f32,
        elapsed: Duration,
    },
    Unreliable {
        answer: String,
        confidence: f32,
        elapsed: Duration,
    },
    Failed {
        reason: String,
        elapsed: Duration,
    },
    TimedOut {
        after: Duration,
    },
}

impl QaOutcome {
    pub fn message(&self) -> String {
        match self {
            QaOutcome::EmptyInput => EMPTY_INPUT_MESSAGE.to_string(),
            QaOutcome::Answered { answer, .. } => answer.clone(),
            QaOutcome::LowConfidence { .. } => NO_ANSWER_MESSAGE.to_string(),
            QaOutcome::Unreliable { .. } => UNRELIABLE_ANSWER_MESSAGE.to_string(),
            QaOutcome::Failed { .. } | QaOutcome::TimedOut { .. } => QA_FAILED_MESSAGE.to_string(),
        }
    }
}

/// Answers that say nothing useful: apologies and admissions of ignorance.
pub fn is_boilerplate(answer: &str) -> bool {
    let lower = answer.trim().to_lowercase().replace('’', "'");
    APOLOGY_PREFIXES.iter().any(|p| lower.starts_with(p))
        || UNKNOWN_MARKERS.iter().any(|m| lower.contains(m))
}

/// Shortens `text` to at most `max_chars` characters, cutting back to the
/// last whole word and appending an ellipsis. Returns `None` when it fits.
pub fn truncate_at_word(text: &str, max_chars: usize) -> Option<String> {
    let (cut, _) = text.char_indices().nth(max_chars)?;
    let head = &text[..cut];

    let kept = if text[cut..].starts_with(char::is_whitespace) {
        head
    } else {
        match head.rfind(char::is_whitespace) {
            Some(i) => &head[..i],
            None => head,
        }
    };
    let kept = match kept.trim_end() {
        "" => head.trim_end(),
        k => k,
    };
    Some(format!("{kept}{ELLIPSIS}"))
}

/// Last stage of the pipeline: asks the QA model about the fixed context
/// and filters out answers that are unsure, empty or unhelpful.
pub struct QaFallback {
    model: Arc<dyn QaModel>,
    context: Arc<str>,
    confidence_threshold: f32,
    max_answer_len: usize,
    timeout: Option<Duration>,
}

impl QaFallback {
    pub fn new(model: Arc<dyn QaModel>, context: impl Into<String>, config: &ChatConfig) -> Self {
        let context: String = context.into();
        Self {
            model,
            context: Arc::from(context),
            confidence_threshold: config.qa_confidence_threshold,
            max_answer_len: config.qa_max_answer_len,
            timeout: config.qa_timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn ask(&self, question: &str) -> QaOutcome {
        let question = question.trim();
        if question.is_empty() {
            return QaOutcome::EmptyInput;
        }

        let start = Instant::now();
        let result = match self.invoke(question) {
            Some(result) => result,
            None => {
                let after = start.elapsed();
                warn!(timeout_ms = after.as_millis() as u64, "QA model timed out");
                return QaOutcome::TimedOut { after };
            }
        };
        let elapsed = start.elapsed();

        let QaAnswer { answer, confidence } = match result {
            Ok(answer) => answer,
            Err(err) => {
                error!(error = ?err, elapsed_ms = elapsed.as_millis() as u64, "QA model failed");
                return QaOutcome::Failed {
                    reason: format!("{err:#}"),
                    elapsed,
                };
            }
        };
        debug!(
            elapsed_ms = elapsed.as_millis() as u64,
            confidence,
            answer = %answer,
            "QA model answered"
        );

        let answer = answer.trim();
        if answer.is_empty() || confidence < self.confidence_threshold {
            return QaOutcome::LowConfidence {
                confidence,
                elapsed,
            };
        }
        if is_boilerplate(answer) {
            return QaOutcome::Unreliable {
                answer: answer.to_string(),
                confidence,
                elapsed,
            };
        }

        let (answer, truncated) = match truncate_at_word(answer, self.max_answer_len) {
            Some(short) => (short, true),
            None => (answer.to_string(), false),
        };
        QaOutcome::Answered {
            answer,
            confidence,
            truncated,
            elapsed,
        }
    }

    /// The user-facing text for `question`; never empty.
    pub fn respond(&self, question: &str) -> String {
        self.ask(question).message()
    }

    /// Runs the model, on a helper thread when a timeout is set. `None`
    /// means the deadline passed.
    fn invoke(&self, question: &str) -> Option<anyhow::Result<QaAnswer>> {
        let Some(timeout) = self.timeout else {
            return Some(self.model.answer(question, &self.context));
        };

        let (tx, rx) = mpsc::channel();
        let model = Arc::clone(&self.model);
        let context = Arc::clone(&self.context);
        let question = question.to_string();
        std::thread::spawn(move || {
            let _ = tx.send(model.answer(&question, &context));
        });

        match rx.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                Some(Err(anyhow::anyhow!("QA worker exited without a result")))
            }
        }
    }
}
