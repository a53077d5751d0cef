//! # vectorguard classifier (`classifier`)
//!
//! ## Purpose
//!
//! `classifier` turns an embedded query into a legal/illegal verdict. It sits
//! on top of the `index` crate: the query is normalized, its `k` nearest
//! corpus records are retrieved, their similarity scores are summed per label,
//! and the label with the greatest total wins.
//!
//! ## Core Types
//!
//! - [`LegalityClassifier`]: the explicit context object holding the shared
//!   index and corpus. There is no global model or index.
//! - [`ClassifierConfig`]: default `k` and the [`TiePolicy`].
//! - [`QueryResult`]: verdict, per-label [`LabelScores`] (always covering every
//!   known label) and one [`MatchDetail`] per neighbor.
//! - [`Embedder`]: seam for the external text encoder; [`StubEmbedder`] is a
//!   deterministic stand-in for tests and demos.
//! - [`evaluate`]: accuracy, precision and recall over a labeled query set.
//!
//! ## Tie policy
//!
//! When label totals are exactly equal the verdict is a policy choice.
//! [`TiePolicy::FavorLegal`] (default) picks the lower-risk label;
//! [`TiePolicy::FavorIllegal`] fails closed.
//!
//! ## Example
//!
//! ```
//! use corpus::{Corpus, Label};
//! use index::IndexConfig;
//! use classifier::{ClassifierConfig, LegalityClassifier};
//!
//! let mut corpus = Corpus::new();
//! corpus.push(vec![1.0, 0.0], Label::Legal, "SELECT 1").unwrap();
//! corpus.push(vec![0.0, 1.0], Label::Illegal, "' OR 1=1--").unwrap();
//!
//! let classifier =
//!     LegalityClassifier::build(corpus, &IndexConfig::default(), ClassifierConfig::default())
//!         .unwrap();
//! let result = classifier.classify(&[1.0, 0.0], 2).unwrap();
//! assert_eq!(result.verdict, Label::Legal);
//! assert_eq!(result.matches[0].text, "SELECT 1");
//! ```
//!
//! ## Observability
//!
//! Attach a [`ClassifyMetrics`] implementation with
//! [`LegalityClassifier::with_metrics`] to record per-call latency, verdict and
//! neighbor count. Diagnostics are emitted through `tracing`.

pub mod embed;
pub mod engine;
pub mod evaluate;
pub mod metrics;
pub mod types;

mod serde_micros;

pub use crate::embed::{EmbedError, Embedder, StubEmbedder};
pub use crate::engine::LegalityClassifier;
pub use crate::evaluate::{evaluate, ConfusionMatrix, Evaluation, Misclassification};
pub use crate::metrics::ClassifyMetrics;
pub use crate::types::{
    ClassifierConfig, ClassifyError, LabelScores, MatchDetail, QueryResult, TiePolicy,
};
