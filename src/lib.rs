//! Workspace umbrella crate for vectorguard.
//!
//! This crate stitches corpus ingestion, index construction and the legality
//! classifier together so callers can go from a JSON-lines corpus (or a saved
//! snapshot) to verdicts with a single API entry point. The YAML configuration
//! layer and logging setup used by the `vectorguard` binary live here too.

pub mod config;
pub mod logging;

pub use classifier::{
    ClassifierConfig, ClassifyError, ClassifyMetrics, ConfusionMatrix, EmbedError, Embedder,
    Evaluation, LabelScores, LegalityClassifier, MatchDetail, Misclassification, QueryResult,
    StubEmbedder, TiePolicy, evaluate,
};
pub use corpus::{Corpus, CorpusError, Label, LabeledVector, RecordId, VectorRecord, load_jsonl};
pub use index::{
    AnnConfig, CompressionCodec, CompressionConfig, IndexConfig, IndexError, Neighbor,
    SearchStrategy, SimilarityIndex, UnitVector, normalize,
};

pub use crate::config::{ConfigLoadError, VectorGuardConfig};

use std::error::Error;
use std::fmt;
use std::path::Path;
use std::time::Instant;

/// Errors that can occur while assembling a classifier from files.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    Corpus(String),
    Classify(ClassifyError),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Corpus(msg) => write!(f, "corpus ingestion failure: {msg}"),
            PipelineError::Classify(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PipelineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PipelineError::Classify(err) => Some(err),
            PipelineError::Corpus(_) => None,
        }
    }
}

impl From<CorpusError> for PipelineError {
    fn from(value: CorpusError) -> Self {
        PipelineError::Corpus(value.to_string())
    }
}

impl From<ClassifyError> for PipelineError {
    fn from(value: ClassifyError) -> Self {
        PipelineError::Classify(value)
    }
}

impl From<IndexError> for PipelineError {
    fn from(value: IndexError) -> Self {
        PipelineError::Classify(ClassifyError::Index(value))
    }
}

/// Read a JSON-lines corpus file into a [`Corpus`], preserving line order as
/// record ids.
pub fn load_corpus<P: AsRef<Path>>(path: P) -> Result<Corpus, PipelineError> {
    let entries = load_jsonl(path)?;
    Ok(Corpus::from_entries(entries)?)
}

/// Build a classifier from a JSON-lines corpus using the `index` and
/// `classifier` sections of `cfg`.
pub fn build_classifier<P: AsRef<Path>>(
    corpus_path: P,
    cfg: &VectorGuardConfig,
) -> Result<LegalityClassifier, PipelineError> {
    let start = Instant::now();
    let corpus = load_corpus(corpus_path)?;
    let records = corpus.len();
    let classifier =
        LegalityClassifier::build(corpus, &cfg.index_config(), cfg.classifier_config())?;

    tracing::info!(
        records,
        dimension = classifier.index().dimension(),
        approximate = classifier.index().is_approximate(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "classifier built"
    );
    Ok(classifier)
}

/// Restore a classifier from a snapshot written by [`LegalityClassifier::save`].
pub fn open_classifier<P: AsRef<Path>>(
    index_path: P,
    cfg: &VectorGuardConfig,
) -> Result<LegalityClassifier, PipelineError> {
    Ok(LegalityClassifier::load(
        index_path,
        &cfg.index_config(),
        cfg.classifier_config(),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn corpus_file(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file
    }

    #[test]
    fn build_classifier_from_jsonl() {
        let file = corpus_file(&[
            r#"{"text": "SELECT 1", "label": 0, "vector": [1.0, 0.0]}"#,
            "",
            r#"{"Payload": "' OR 1=1--", "Label": "malicious", "vector": [0.0, 1.0]}"#,
        ]);
        let classifier = build_classifier(file.path(), &VectorGuardConfig::default()).unwrap();

        assert_eq!(classifier.corpus().len(), 2);
        let result = classifier.classify(&[0.1, 0.9], 2).unwrap();
        assert_eq!(result.verdict, Label::Illegal);
        assert_eq!(result.matches[0].text, "' OR 1=1--");
    }

    #[test]
    fn corpus_errors_carry_line_numbers() {
        let file = corpus_file(&[
            r#"{"text": "SELECT 1", "label": 0, "vector": [1.0, 0.0]}"#,
            r#"{"text": "oops", "label": 9, "vector": [0.0, 1.0]}"#,
        ]);
        let err = build_classifier(file.path(), &VectorGuardConfig::default()).unwrap_err();
        assert!(matches!(&err, PipelineError::Corpus(msg) if msg.contains("line 2")));
    }

    #[test]
    fn mixed_dimensions_surface_as_index_errors() {
        let file = corpus_file(&[
            r#"{"text": "a", "label": 0, "vector": [1.0, 0.0]}"#,
            r#"{"text": "b", "label": 1, "vector": [1.0, 0.0, 0.0]}"#,
        ]);
        let err = build_classifier(file.path(), &VectorGuardConfig::default()).unwrap_err();
        assert_eq!(
            err,
            PipelineError::Classify(ClassifyError::Index(IndexError::DimensionMismatch {
                expected: 2,
                got: 3
            }))
        );
        assert!(err.source().is_some());
    }
}
