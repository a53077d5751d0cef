use super::*;

use std::sync::RwLock;
use std::thread;
use std::time::Duration;

use corpus::Label;
use index::SearchStrategy;

use crate::embed::{EmbedError, StubEmbedder};
use crate::types::TiePolicy;

fn classifier_with(entries: &[(Vec<f32>, Label, &str)], cfg: ClassifierConfig) -> LegalityClassifier {
    let mut corpus = Corpus::new();
    for (vector, label, text) in entries {
        corpus.push(vector.clone(), *label, *text).unwrap();
    }
    LegalityClassifier::build(corpus, &IndexConfig::default(), cfg).unwrap()
}

fn orthogonal_pair() -> LegalityClassifier {
    classifier_with(
        &[
            (vec![1.0, 0.0], Label::Legal, "SELECT 1"),
            (vec![0.0, 1.0], Label::Illegal, "' OR 1=1--"),
        ],
        ClassifierConfig::default(),
    )
}

#[test]
fn orthogonal_query_picks_its_own_label() {
    let result = orthogonal_pair().classify(&[1.0, 0.0], 2).unwrap();

    assert!((result.scores.get(Label::Legal) - 1.0).abs() < 1e-6);
    assert!(result.scores.get(Label::Illegal).abs() < 1e-6);
    assert_eq!(result.verdict, Label::Legal);
    assert_eq!(result.k, 2);

    assert_eq!(result.matches.len(), 2);
    assert_eq!(result.matches[0].record_id, 0);
    assert_eq!(result.matches[0].text, "SELECT 1");
    assert_eq!(result.matches[1].label, Label::Illegal);
}

#[test]
fn scores_cover_labels_absent_from_neighbors() {
    let classifier = classifier_with(
        &[
            (vec![1.0, 0.0], Label::Illegal, "a"),
            (vec![0.9, 0.1], Label::Illegal, "b"),
            (vec![0.0, 1.0], Label::Legal, "c"),
        ],
        ClassifierConfig::default(),
    );
    let result = classifier.classify(&[1.0, 0.0], 2).unwrap();
    assert_eq!(result.scores.len(), Label::ALL.len());
    assert_eq!(result.scores.get(Label::Legal), 0.0);
    assert_eq!(result.verdict, Label::Illegal);
}

#[test]
fn degenerate_query_is_an_error() {
    let classifier = classifier_with(
        &[(vec![1.0, 0.0, 0.0], Label::Legal, "x")],
        ClassifierConfig::default(),
    );
    let err = classifier.classify(&[0.0, 0.0, 0.0], 1).unwrap_err();
    assert!(matches!(
        err,
        ClassifyError::Index(IndexError::DegenerateVector { .. })
    ));
}

#[test]
fn zero_k_and_wrong_dimension_pass_through() {
    let classifier = orthogonal_pair();
    assert_eq!(
        classifier.classify(&[1.0, 0.0], 0).unwrap_err(),
        ClassifyError::Index(IndexError::InvalidK { k: 0 })
    );
    assert_eq!(
        classifier.classify(&[1.0, 0.0, 0.0], 1).unwrap_err(),
        ClassifyError::Index(IndexError::DimensionMismatch {
            expected: 2,
            got: 3
        })
    );
}

#[test]
fn k_beyond_corpus_returns_all_records() {
    let result = orthogonal_pair().classify(&[0.6, 0.8], 5).unwrap();
    assert_eq!(result.matches.len(), 2);
    assert_eq!(result.k, 5);
}

#[test]
fn exact_tie_uses_configured_policy() {
    // Query at 45 degrees: both neighbors score exactly 1/sqrt(2).
    let entries = [
        (vec![1.0, 0.0], Label::Legal, "SELECT 1"),
        (vec![0.0, 1.0], Label::Illegal, "' OR 1=1--"),
    ];
    let lenient = classifier_with(&entries, ClassifierConfig::default());
    let strict = classifier_with(
        &entries,
        ClassifierConfig::default().with_tie_policy(TiePolicy::FavorIllegal),
    );

    let a = lenient.classify(&[1.0, 1.0], 2).unwrap();
    let b = strict.classify(&[1.0, 1.0], 2).unwrap();
    assert_eq!(a.scores.get(Label::Legal), a.scores.get(Label::Illegal));
    assert_eq!(a.verdict, Label::Legal);
    assert_eq!(b.verdict, Label::Illegal);
}

#[test]
fn classify_default_uses_config_k() {
    let classifier = classifier_with(
        &[
            (vec![1.0, 0.0], Label::Legal, "a"),
            (vec![0.8, 0.2], Label::Legal, "b"),
            (vec![0.0, 1.0], Label::Illegal, "c"),
        ],
        ClassifierConfig::default().with_k(1),
    );
    let result = classifier.classify_default(&[1.0, 0.0]).unwrap();
    assert_eq!(result.k, 1);
    assert_eq!(result.matches.len(), 1);
}

#[test]
fn mismatched_handles_rejected() {
    let mut corpus = Corpus::new();
    corpus.push(vec![1.0, 0.0], Label::Legal, "a").unwrap();
    let index = SimilarityIndex::build(&corpus, &IndexConfig::default()).unwrap();
    corpus.push(vec![0.0, 1.0], Label::Illegal, "b").unwrap();

    let err = LegalityClassifier::new(index, corpus, ClassifierConfig::default()).unwrap_err();
    assert!(matches!(err, ClassifyError::InvalidConfig(msg) if msg.contains("rows")));
}

#[test]
fn empty_corpus_cannot_be_built() {
    let err = LegalityClassifier::build(Corpus::new(), &IndexConfig::default(), ClassifierConfig::default())
        .unwrap_err();
    assert_eq!(err, ClassifyError::Index(IndexError::EmptyCorpus));
}

#[test]
fn classify_text_records_query_and_propagates_encoder_errors() {
    let embedder = StubEmbedder::new(256);
    let mut corpus = Corpus::new();
    for (text, label) in [
        ("SELECT name FROM users WHERE id = 4", Label::Legal),
        ("SELECT * FROM orders", Label::Legal),
        ("' OR 1=1 --", Label::Illegal),
        ("<script> alert(1) </script>", Label::Illegal),
    ] {
        corpus.push(embedder.embed(text).unwrap(), label, text).unwrap();
    }
    let classifier =
        LegalityClassifier::build(corpus, &IndexConfig::default(), ClassifierConfig::default())
            .unwrap();

    let result = classifier
        .classify_text(&embedder, "<script> alert(1) </script>", 1)
        .unwrap();
    assert_eq!(result.query_text.as_deref(), Some("<script> alert(1) </script>"));
    assert_eq!(result.verdict, Label::Illegal);
    assert!((result.matches[0].score - 1.0).abs() < 1e-5);

    let err = classifier.classify_text(&embedder, "  ", 1).unwrap_err();
    assert_eq!(err, ClassifyError::Embedding(EmbedError::EmptyInput));
}

#[test]
fn batch_preserves_order_and_isolates_failures() {
    let classifier = orthogonal_pair();
    let queries = vec![
        vec![1.0, 0.0],
        vec![0.0, 0.0],
        vec![0.0, 1.0],
        vec![0.9, 0.1],
    ];
    let results = classifier.classify_batch(&queries, 1);

    assert_eq!(results.len(), 4);
    assert_eq!(results[0].as_ref().unwrap().verdict, Label::Legal);
    assert!(results[1].is_err());
    assert_eq!(results[2].as_ref().unwrap().verdict, Label::Illegal);
    assert_eq!(results[3].as_ref().unwrap().matches[0].record_id, 0);
}

#[test]
fn shared_classifier_across_threads() {
    let classifier = Arc::new(orthogonal_pair());
    let expected = classifier.classify(&[0.3, 0.7], 2).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let classifier = Arc::clone(&classifier);
            thread::spawn(move || classifier.classify(&[0.3, 0.7], 2).unwrap())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

#[test]
fn hnsw_backed_classifier_still_decides() {
    let mut corpus = Corpus::new();
    for i in 0..40 {
        let t = i as f32 * 0.05;
        let label = if i < 20 { Label::Legal } else { Label::Illegal };
        corpus.push(vec![t.cos(), t.sin()], label, format!("doc-{i}")).unwrap();
    }
    let index_cfg = IndexConfig::new()
        .with_strategy(SearchStrategy::Hnsw)
        .with_ann(index::AnnConfig::default().with_min_vectors_for_ann(10));
    let classifier =
        LegalityClassifier::build(corpus, &index_cfg, ClassifierConfig::default()).unwrap();
    assert!(classifier.index().is_approximate());

    let result = classifier.classify(&[1.0, 0.0], 3).unwrap();
    assert!(!result.matches.is_empty());
    assert_eq!(result.verdict, Label::Legal);
}

struct RecordingMetrics {
    events: RwLock<Vec<(Label, usize)>>,
}

impl ClassifyMetrics for RecordingMetrics {
    fn record_classification(&self, verdict: Label, _latency: Duration, neighbors: usize) {
        self.events.write().unwrap().push((verdict, neighbors));
    }
}

#[test]
fn metrics_observer_sees_successful_calls_only() {
    let metrics = Arc::new(RecordingMetrics {
        events: RwLock::new(Vec::new()),
    });
    let classifier = orthogonal_pair().with_metrics(metrics.clone());

    classifier.classify(&[0.0, 1.0], 1).unwrap();
    classifier.classify(&[1.0, 0.0], 5).unwrap();
    assert!(classifier.classify(&[0.0, 0.0], 1).is_err());

    let events = metrics.events.read().unwrap().clone();
    assert_eq!(events, vec![(Label::Illegal, 1), (Label::Legal, 2)]);
}
