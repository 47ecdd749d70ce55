//! Per-case outcomes and the Recall / Precision / F1 aggregate.
//!
//! A non-empty response that matches no accepted form is a false positive
//! ("confidently wrong"). An empty response or a failed call is a false
//! negative. Recall is therefore `tp / total` and Precision `tp / (tp + fp)`.

use serde::{Deserialize, Serialize};

use crate::error::ServiceResult;
use crate::matcher;
use crate::note::{Reply, TestCase};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    TruePositive,
    FalsePositive,
    FalseNegative,
}

/// Verdict for one test case, with the raw response kept for debugging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome {
    pub question: String,
    pub accepted_answers: Vec<String>,
    pub correct: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<String>,
    pub response: String,
    /// Set when the question could not be asked or the call failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_count: Option<usize>,
    pub latency_ms: u64,
}

impl Outcome {
    /// Score the result of asking `case`. A failed call is an incorrect answer.
    pub fn evaluate(case: &TestCase, result: ServiceResult<Reply>, latency_ms: u64) -> Self {
        match result {
            Ok(reply) => {
                let matched =
                    matcher::matched_answer(&reply.text, &case.accepted_answers).map(String::from);
                Self {
                    question: case.question.clone(),
                    accepted_answers: case.accepted_answers.clone(),
                    correct: matched.is_some(),
                    matched,
                    response: reply.text,
                    error: None,
                    source_count: reply.source_count,
                    latency_ms,
                }
            }
            Err(e) => Self::failed(case, e.to_string(), latency_ms),
        }
    }

    /// A case that was never answered (call failure or skipped).
    pub fn failed(case: &TestCase, reason: impl Into<String>, latency_ms: u64) -> Self {
        Self {
            question: case.question.clone(),
            accepted_answers: case.accepted_answers.clone(),
            correct: false,
            matched: None,
            response: String::new(),
            error: Some(reason.into()),
            source_count: None,
            latency_ms,
        }
    }

    pub fn classification(&self) -> Classification {
        if self.correct {
            Classification::TruePositive
        } else if self.error.is_none() && !self.response.trim().is_empty() {
            Classification::FalsePositive
        } else {
            Classification::FalseNegative
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub total: usize,
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub recall: f64,
    pub precision: f64,
    pub f1: f64,
}

impl Metrics {
    pub fn from_outcomes(outcomes: &[Outcome]) -> Self {
        let mut m = Self {
            total: outcomes.len(),
            ..Self::default()
        };
        for o in outcomes {
            match o.classification() {
                Classification::TruePositive => m.true_positives += 1,
                Classification::FalsePositive => m.false_positives += 1,
                Classification::FalseNegative => m.false_negatives += 1,
            }
        }

        m.recall = ratio(m.true_positives, m.total);
        m.precision = ratio(m.true_positives, m.true_positives + m.false_positives);
        m.f1 = f1(m.precision, m.recall);
        m
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Harmonic mean of precision and recall; 0 when both are 0.
pub fn f1(precision: f64, recall: f64) -> f64 {
    let sum = precision + recall;
    if sum == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / sum
    }
}
