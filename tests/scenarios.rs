//! End-to-end behavior of index construction and classification.

use vectorguard::{
    ClassifierConfig, ClassifyError, Corpus, IndexConfig, IndexError, Label, LegalityClassifier,
    SimilarityIndex, TiePolicy,
};

fn corpus_of(entries: &[(&[f32], Label, &str)]) -> Corpus {
    let mut corpus = Corpus::new();
    for (vector, label, text) in entries {
        corpus.push(vector.to_vec(), *label, *text).unwrap();
    }
    corpus
}

#[test]
fn orthogonal_corpus_votes_for_the_matching_label() {
    let corpus = corpus_of(&[
        (&[1.0, 0.0], Label::Legal, "SELECT 1"),
        (&[0.0, 1.0], Label::Illegal, "' OR 1=1--"),
    ]);
    let classifier =
        LegalityClassifier::build(corpus, &IndexConfig::default(), ClassifierConfig::default())
            .unwrap();

    let result = classifier.classify(&[1.0, 0.0], 2).unwrap();
    assert!((result.scores.get(Label::Legal) - 1.0).abs() < 1e-6);
    assert!(result.scores.get(Label::Illegal).abs() < 1e-6);
    assert_eq!(result.verdict, Label::Legal);
    assert_eq!(result.scores.len(), Label::ALL.len());

    let texts: Vec<&str> = result.matches.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, ["SELECT 1", "' OR 1=1--"]);
}

#[test]
fn empty_corpus_is_rejected() {
    assert_eq!(
        SimilarityIndex::build(&Corpus::new(), &IndexConfig::default()).unwrap_err(),
        IndexError::EmptyCorpus
    );
}

#[test]
fn mixed_dimensions_are_rejected() {
    let corpus = corpus_of(&[
        (&[1.0, 0.0], Label::Legal, "a"),
        (&[1.0, 0.0, 0.0], Label::Legal, "b"),
    ]);
    assert!(matches!(
        SimilarityIndex::build(&corpus, &IndexConfig::default()),
        Err(IndexError::DimensionMismatch { expected: 2, got: 3 })
    ));
}

#[test]
fn k_larger_than_corpus_returns_every_record() {
    let corpus = corpus_of(&[
        (&[1.0, 0.0], Label::Legal, "a"),
        (&[0.0, 1.0], Label::Illegal, "b"),
    ]);
    let index = SimilarityIndex::build(&corpus, &IndexConfig::default()).unwrap();
    assert_eq!(index.search(&[0.5, 0.5], 5).unwrap().len(), 2);
}

#[test]
fn degenerate_query_is_reported_not_classified() {
    let corpus = corpus_of(&[(&[1.0, 0.0, 0.0], Label::Legal, "a")]);
    let classifier =
        LegalityClassifier::build(corpus, &IndexConfig::default(), ClassifierConfig::default())
            .unwrap();
    assert!(matches!(
        classifier.classify(&[0.0, 0.0, 0.0], 1),
        Err(ClassifyError::Index(IndexError::DegenerateVector { .. }))
    ));
}

#[test]
fn self_similarity_for_every_record() {
    let vectors: Vec<Vec<f32>> = (0..25)
        .map(|i| {
            let t = i as f32 * 0.37;
            vec![t.sin(), t.cos(), (t * 0.5).sin() + 1.5, -0.2 * t]
        })
        .collect();
    let mut corpus = Corpus::new();
    for (i, v) in vectors.iter().enumerate() {
        let label = if i % 3 == 0 { Label::Illegal } else { Label::Legal };
        corpus.push(v.clone(), label, format!("payload-{i}")).unwrap();
    }
    let index = SimilarityIndex::build(&corpus, &IndexConfig::default()).unwrap();

    for (i, v) in vectors.iter().enumerate() {
        let hits = index.search(v, 1).unwrap();
        assert_eq!(hits[0].id as usize, i);
        assert!((hits[0].score - 1.0).abs() < 1e-5);
    }
}

#[test]
fn tie_policy_is_explicit() {
    let entries: [(&[f32], Label, &str); 4] = [
        (&[1.0, 0.0], Label::Legal, "SELECT 1"),
        (&[0.0, 1.0], Label::Illegal, "' OR 1=1--"),
        (&[-1.0, 0.0], Label::Legal, "SELECT 2"),
        (&[0.0, -1.0], Label::Illegal, "<script>"),
    ];
    let query = [1.0, 1.0];

    for (policy, expected) in [
        (TiePolicy::FavorLegal, Label::Legal),
        (TiePolicy::FavorIllegal, Label::Illegal),
    ] {
        let classifier = LegalityClassifier::build(
            corpus_of(&entries),
            &IndexConfig::default(),
            ClassifierConfig::default().with_tie_policy(policy),
        )
        .unwrap();
        let result = classifier.classify(&query, 2).unwrap();
        assert_eq!(
            result.scores.get(Label::Legal),
            result.scores.get(Label::Illegal)
        );
        assert_eq!(result.verdict, expected, "policy {policy:?}");
    }
}

#[test]
fn matches_follow_search_order() {
    let corpus = corpus_of(&[
        (&[0.0, 1.0], Label::Illegal, "far"),
        (&[1.0, 0.1], Label::Legal, "near"),
        (&[1.0, 0.5], Label::Illegal, "middle"),
    ]);
    let classifier =
        LegalityClassifier::build(corpus, &IndexConfig::default(), ClassifierConfig::default())
            .unwrap();
    let result = classifier.classify(&[1.0, 0.0], 3).unwrap();

    let ids: Vec<u32> = result.matches.iter().map(|m| m.record_id).collect();
    assert_eq!(ids, [1, 2, 0]);
    assert!(result.matches.windows(2).all(|w| w[0].score >= w[1].score));

    let legal: f32 = result
        .matches
        .iter()
        .filter(|m| m.label == Label::Legal)
        .map(|m| m.score)
        .sum();
    assert!((result.scores.get(Label::Legal) - legal).abs() < 1e-6);
}
