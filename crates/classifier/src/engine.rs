use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use corpus::Corpus;
use index::{normalize, IndexConfig, IndexError, SimilarityIndex};
use rayon::prelude::*;

use crate::embed::Embedder;
use crate::metrics::ClassifyMetrics;
use crate::types::{ClassifierConfig, ClassifyError, LabelScores, MatchDetail, QueryResult};

#[cfg(test)]
mod tests;

/// k-NN legality classifier over a built (or loaded) index and its corpus.
///
/// Both handles are immutable and reference counted, so one classifier can be
/// cloned cheaply and queried from any number of threads.
#[derive(Clone)]
pub struct LegalityClassifier {
    index: Arc<SimilarityIndex>,
    corpus: Arc<Corpus>,
    cfg: ClassifierConfig,
    metrics: Option<Arc<dyn ClassifyMetrics>>,
}

impl std::fmt::Debug for LegalityClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegalityClassifier")
            .field("index", &self.index)
            .field("records", &self.corpus.len())
            .field("cfg", &self.cfg)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

impl LegalityClassifier {
    /// Construct a classifier that takes ownership of an index and its corpus.
    pub fn new(
        index: SimilarityIndex,
        corpus: Corpus,
        cfg: ClassifierConfig,
    ) -> Result<Self, ClassifyError> {
        Self::with_shared(Arc::new(index), Arc::new(corpus), cfg)
    }

    /// Construct a classifier from shared handles.
    ///
    /// Row `i` of `index` must describe record `i` of `corpus`; a length
    /// mismatch is rejected.
    pub fn with_shared(
        index: Arc<SimilarityIndex>,
        corpus: Arc<Corpus>,
        cfg: ClassifierConfig,
    ) -> Result<Self, ClassifyError> {
        cfg.validate()?;
        if index.len() != corpus.len() {
            return Err(ClassifyError::InvalidConfig(format!(
                "index has {} rows but corpus has {} records",
                index.len(),
                corpus.len()
            )));
        }
        Ok(Self {
            index,
            corpus,
            cfg,
            metrics: None,
        })
    }

    /// Build the index from `corpus` and wrap both.
    pub fn build(
        corpus: Corpus,
        index_cfg: &IndexConfig,
        cfg: ClassifierConfig,
    ) -> Result<Self, ClassifyError> {
        let index = SimilarityIndex::build(&corpus, index_cfg)?;
        Self::new(index, corpus, cfg)
    }

    /// Restore a classifier from a snapshot written by [`index::save`].
    pub fn load<P: AsRef<Path>>(
        path: P,
        index_cfg: &IndexConfig,
        cfg: ClassifierConfig,
    ) -> Result<Self, ClassifyError> {
        let (index, corpus) = index::load(path, index_cfg)?;
        Self::new(index, corpus, cfg)
    }

    /// Attach a metrics observer to this classifier.
    pub fn with_metrics(mut self, metrics: Arc<dyn ClassifyMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.cfg
    }

    pub fn index(&self) -> &SimilarityIndex {
        &self.index
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// Persist the index and corpus behind this classifier.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ClassifyError> {
        index::save(&self.index, &self.corpus, path)?;
        Ok(())
    }

    /// Classify an embedded query against its `k` nearest records.
    ///
    /// Every neighbor's score is added to its label's total; the label with
    /// the strictly greatest total wins and exact ties go to the configured
    /// [`crate::TiePolicy`]. A degenerate query fails with
    /// [`IndexError::DegenerateVector`] before any search runs.
    pub fn classify(&self, query: &[f32], k: usize) -> Result<QueryResult, ClassifyError> {
        let start = Instant::now();
        let query = normalize(query)?;
        let hits = self.index.search_unit(&query, k)?;

        let mut scores = LabelScores::new();
        let mut matches = Vec::with_capacity(hits.len());
        for hit in &hits {
            let record = self.corpus.get(hit.id).ok_or_else(|| {
                IndexError::CorruptIndex(format!("neighbor {} has no corpus record", hit.id))
            })?;
            scores.add(record.label(), hit.score);
            matches.push(MatchDetail {
                record_id: hit.id,
                label: record.label(),
                score: hit.score,
                text: record.text().to_string(),
            });
        }
        let verdict = scores.verdict(self.cfg.tie_policy);
        let latency = start.elapsed();

        tracing::debug!(
            k,
            neighbors = matches.len(),
            %verdict,
            latency_us = latency.as_micros() as u64,
            "classified query"
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_classification(verdict, latency, matches.len());
        }

        Ok(QueryResult {
            query_text: None,
            k,
            verdict,
            scores,
            matches,
        })
    }

    /// Classify with the configured `k`.
    pub fn classify_default(&self, query: &[f32]) -> Result<QueryResult, ClassifyError> {
        self.classify(query, self.cfg.k)
    }

    /// Embed `text` with `embedder`, then classify it.
    pub fn classify_text(
        &self,
        embedder: &dyn Embedder,
        text: &str,
        k: usize,
    ) -> Result<QueryResult, ClassifyError> {
        let vector = embedder.embed(text)?;
        let mut result = self.classify(&vector, k)?;
        result.query_text = Some(text.to_string());
        Ok(result)
    }

    /// Classify many queries in parallel.
    ///
    /// Output order matches input order; each query fails or succeeds on its own.
    pub fn classify_batch<Q>(&self, queries: &[Q], k: usize) -> Vec<Result<QueryResult, ClassifyError>>
    where
        Q: AsRef<[f32]> + Sync,
    {
        let start = Instant::now();
        let results: Vec<_> = queries
            .par_iter()
            .map(|query| self.classify(query.as_ref(), k))
            .collect();

        let failed = results.iter().filter(|r| r.is_err()).count();
        tracing::info!(
            queries = queries.len(),
            failed,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "batch classification finished"
        );
        results
    }
}
