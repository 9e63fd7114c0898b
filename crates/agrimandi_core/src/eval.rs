use crate::resolver::{ResponseResolver, Stage};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// One labelled question: which stage should answer it and, optionally,
/// the exact reply expected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalCase {
    pub case_id: String,
    pub question: String,
    pub expected_stage: Stage,
    #[serde(default)]
    pub expected_answer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalOutcome {
    pub case_id: String,
    pub passed: bool,
    pub actual_stage: Stage,
    pub actual_answer: String,
    pub latency_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub pass_rate: f32,
    pub outcomes: Vec<EvalOutcome>,
}

impl EvalSummary {
    pub fn meets(&self, required_pass_rate: f32) -> bool {
        self.pass_rate >= required_pass_rate
    }
}

pub struct CaseExpectation;

impl CaseExpectation {
    pub fn matches(
        expected_stage: Stage,
        expected_answer: Option<&str>,
        actual_stage: Stage,
        actual_answer: &str,
    ) -> bool {
        if expected_stage != actual_stage {
            return false;
        }

        if let Some(expected) = expected_answer {
            if expected.trim() != actual_answer.trim() {
                return false;
            }
        }

        true
    }
}

pub fn evaluate_cases(resolver: &ResponseResolver, cases: &[EvalCase]) -> EvalSummary {
    let mut outcomes = Vec::with_capacity(cases.len());

    for case in cases {
        let start = Instant::now();
        let resolution = resolver.resolve(&case.question);
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        let passed = CaseExpectation::matches(
            case.expected_stage,
            case.expected_answer.as_deref(),
            resolution.stage,
            &resolution.text,
        );

        outcomes.push(EvalOutcome {
            case_id: case.case_id.clone(),
            passed,
            actual_stage: resolution.stage,
            actual_answer: resolution.text,
            latency_ms,
        });
    }

    let total = outcomes.len();
    let passed = outcomes.iter().filter(|o| o.passed).count();
    let failed = total.saturating_sub(passed);
    let pass_rate = if total == 0 {
        0.0
    } else {
        passed as f32 / total as f32
    };

    EvalSummary {
        total,
        passed,
        failed,
        pass_rate,
        outcomes,
    }
}
