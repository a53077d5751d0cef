//! Accuracy measurement over a labeled query set.
//!
//! [`Label::Illegal`] is the positive class: a true positive is a malicious
//! payload flagged as malicious.

use std::time::{Duration, Instant};

use corpus::{Label, LabeledVector};
use rayon::prelude::*;
use serde::Serialize;

use crate::engine::LegalityClassifier;
use crate::types::{ClassifyError, LabelScores};

/// Binary confusion counts with `Illegal` as the positive class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    pub true_positive: usize,
    pub false_positive: usize,
    pub true_negative: usize,
    pub false_negative: usize,
}

impl ConfusionMatrix {
    pub fn record(&mut self, expected: Label, predicted: Label) {
        match (expected.is_malicious(), predicted.is_malicious()) {
            (true, true) => self.true_positive += 1,
            (false, true) => self.false_positive += 1,
            (false, false) => self.true_negative += 1,
            (true, false) => self.false_negative += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }

    pub fn correct(&self) -> usize {
        self.true_positive + self.true_negative
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.correct(), self.total())
    }

    /// `tp / (tp + fp)`, or 0 when nothing was flagged.
    pub fn precision(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_positive)
    }

    /// `tp / (tp + fn)`, or 0 when there were no malicious queries.
    pub fn recall(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_negative)
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// A query whose verdict disagreed with its label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Misclassification {
    /// Position of the query in the evaluated set.
    pub position: usize,
    pub text: String,
    pub expected: Label,
    pub predicted: Label,
    pub scores: LabelScores,
}

/// Summary of an evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub k: usize,
    pub confusion: ConfusionMatrix,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub total: usize,
    /// Wall-clock time for the whole run.
    #[serde(rename = "elapsed_us", with = "crate::serde_micros")]
    pub elapsed: Duration,
    /// Mean time spent inside `classify` per query.
    #[serde(rename = "average_latency_us", with = "crate::serde_micros")]
    pub average_latency: Duration,
    pub wrong: Vec<Misclassification>,
}

/// Classify every query in parallel and compare verdicts with labels.
///
/// The first classification error aborts the run.
pub fn evaluate(
    classifier: &LegalityClassifier,
    queries: &[LabeledVector],
    k: usize,
) -> Result<Evaluation, ClassifyError> {
    let start = Instant::now();
    let outcomes = queries
        .par_iter()
        .map(|query| {
            let began = Instant::now();
            classifier
                .classify(&query.vector, k)
                .map(|result| (result, began.elapsed()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let elapsed = start.elapsed();

    let mut confusion = ConfusionMatrix::default();
    let mut wrong = Vec::new();
    let mut busy = Duration::ZERO;
    for (position, (query, (result, latency))) in queries.iter().zip(outcomes).enumerate() {
        busy += latency;
        confusion.record(query.label, result.verdict);
        if query.label != result.verdict {
            wrong.push(Misclassification {
                position,
                text: query.text.clone(),
                expected: query.label,
                predicted: result.verdict,
                scores: result.scores,
            });
        }
    }

    let total = confusion.total();
    let average_latency = match u32::try_from(total) {
        Ok(n) if n > 0 => busy / n,
        _ => Duration::ZERO,
    };
    let evaluation = Evaluation {
        k,
        confusion,
        accuracy: confusion.accuracy(),
        precision: confusion.precision(),
        recall: confusion.recall(),
        total,
        elapsed,
        average_latency,
        wrong,
    };

    tracing::info!(
        total,
        accuracy = evaluation.accuracy,
        precision = evaluation.precision,
        recall = evaluation.recall,
        wrong = evaluation.wrong.len(),
        elapsed_ms = elapsed.as_millis() as u64,
        "evaluation finished"
    );
    Ok(evaluation)
}
