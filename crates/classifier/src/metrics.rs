// Metrics hooks for the classifier.
//
// A `ClassifyMetrics` observer is attached to one `LegalityClassifier` with
// `with_metrics`; there is no process-wide recorder. Every successful call to
// `classify` reports its verdict, latency and neighbor count.
use std::time::Duration;

use corpus::Label;

/// Metrics observer for classification calls.
pub trait ClassifyMetrics: Send + Sync {
    /// Record the outcome of one classification.
    ///
    /// `latency` covers normalization, search and aggregation. `neighbors` is
    /// the number of matches actually returned, which is below `k` when the
    /// corpus is smaller than `k`.
    fn record_classification(&self, verdict: Label, latency: Duration, neighbors: usize);
}
