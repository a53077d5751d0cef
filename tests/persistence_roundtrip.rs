use std::fs;

use tempfile::tempdir;
use vectorguard::{
    ClassifierConfig, CompressionCodec, CompressionConfig, Corpus, IndexConfig, IndexError, Label,
    LegalityClassifier, SearchStrategy, SimilarityIndex, VectorGuardConfig, open_classifier,
};

fn sample_corpus(n: usize, dim: usize) -> Corpus {
    let mut corpus = Corpus::new();
    for i in 0..n {
        let vector: Vec<f32> = (0..dim)
            .map(|d| ((i * 31 + d * 7) as f32 * 0.13).sin() + if d == i % dim { 2.0 } else { 0.0 })
            .collect();
        let label = if i % 2 == 0 { Label::Legal } else { Label::Illegal };
        corpus.push(vector, label, format!("payload #{i}")).unwrap();
    }
    corpus
}

fn queries(dim: usize) -> Vec<Vec<f32>> {
    (0..10)
        .map(|q| (0..dim).map(|d| ((q * 5 + d) as f32 * 0.41).cos()).collect())
        .collect()
}

#[test]
fn save_then_load_preserves_rankings() {
    let dir = tempdir().unwrap();
    for codec in [CompressionCodec::None, CompressionCodec::Zstd] {
        let path = dir.path().join(format!("index-{codec:?}.vgi"));
        let cfg = IndexConfig::new().with_compression(CompressionConfig::default().with_codec(codec));
        let corpus = sample_corpus(60, 8);
        let original = SimilarityIndex::build(&corpus, &cfg).unwrap();
        index::save(&original, &corpus, &path).unwrap();

        let (restored, restored_corpus) = index::load(&path, &cfg).unwrap();
        assert_eq!(restored.len(), original.len());
        assert_eq!(restored.dimension(), 8);

        for q in queries(8) {
            let a = original.search(&q, 7).unwrap();
            let b = restored.search(&q, 7).unwrap();
            let ids_a: Vec<u32> = a.iter().map(|n| n.id).collect();
            let ids_b: Vec<u32> = b.iter().map(|n| n.id).collect();
            assert_eq!(ids_a, ids_b);
            for (x, y) in a.iter().zip(&b) {
                assert!((x.score - y.score).abs() < 1e-6);
            }
        }
        for (before, after) in corpus.iter().zip(restored_corpus.iter()) {
            assert_eq!(before.label(), after.label());
            assert_eq!(before.text(), after.text());
        }
    }
}

#[test]
fn classifier_roundtrip_through_config() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("classifier.vgi");
    let cfg = VectorGuardConfig::default();

    let built = LegalityClassifier::build(
        sample_corpus(40, 6),
        &cfg.index_config(),
        cfg.classifier_config(),
    )
    .unwrap();
    built.save(&path).unwrap();
    let reopened = open_classifier(&path, &cfg).unwrap();

    for q in queries(6) {
        let a = built.classify(&q, 3).unwrap();
        let b = reopened.classify(&q, 3).unwrap();
        assert_eq!(a.verdict, b.verdict);
        let texts_a: Vec<&str> = a.matches.iter().map(|m| m.text.as_str()).collect();
        let texts_b: Vec<&str> = b.matches.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts_a, texts_b);
    }
}

#[test]
fn hnsw_strategy_applies_on_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ann.vgi");
    let corpus = sample_corpus(80, 8);
    let exact = SimilarityIndex::build(&corpus, &IndexConfig::default()).unwrap();
    index::save(&exact, &corpus, &path).unwrap();

    let ann_cfg = IndexConfig::new()
        .with_strategy(SearchStrategy::Hnsw)
        .with_ann(vectorguard::AnnConfig::default().with_min_vectors_for_ann(20));
    let (restored, _) = index::load(&path, &ann_cfg).unwrap();
    assert!(restored.is_approximate());
    assert!(!restored.search(&queries(8)[0], 5).unwrap().is_empty());
}

#[test]
fn damaged_files_are_corrupt() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("index.vgi");
    let corpus = sample_corpus(10, 4);
    let index = SimilarityIndex::build(&corpus, &IndexConfig::default()).unwrap();
    index::save(&index, &corpus, &path).unwrap();
    let bytes = fs::read(&path).unwrap();

    let truncated = dir.path().join("truncated.vgi");
    fs::write(&truncated, &bytes[..bytes.len() / 2]).unwrap();
    assert!(matches!(
        index::load(&truncated, &IndexConfig::default()),
        Err(IndexError::CorruptIndex(_))
    ));

    let garbage = dir.path().join("garbage.vgi");
    fs::write(&garbage, b"definitely not an index").unwrap();
    assert!(matches!(
        index::load(&garbage, &IndexConfig::default()),
        Err(IndexError::CorruptIndex(_))
    ));

    let empty = dir.path().join("empty.vgi");
    fs::write(&empty, b"").unwrap();
    assert!(matches!(
        index::load(&empty, &IndexConfig::default()),
        Err(IndexError::CorruptIndex(_))
    ));
}

#[test]
fn loading_a_missing_file_is_io() {
    let dir = tempdir().unwrap();
    let err = LegalityClassifier::load(
        dir.path().join("nope.vgi"),
        &IndexConfig::default(),
        ClassifierConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, vectorguard::ClassifyError::Index(IndexError::Io(_))));
}
