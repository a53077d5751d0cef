//! # vectorguard index
//!
//! Exact k-nearest-neighbor search over a labeled embedding corpus, plus the
//! snapshot format used to share a built index between processes.
//!
//! ## Core pieces
//!
//! - [`normalize`]: L2 normalization into a [`UnitVector`]. Near-zero vectors
//!   are rejected with [`IndexError::DegenerateVector`] instead of being
//!   divided by an epsilon.
//! - [`SimilarityIndex`]: an immutable `n × D` matrix of unit rows built from a
//!   [`Corpus`]. Search is a single matrix-vector product; inner product on unit
//!   vectors is cosine similarity. Results are sorted by score descending with
//!   ties broken by the lowest record id, so identical queries always produce
//!   identical rankings.
//! - [`persist`]: `save` / `load` of the matrix together with the corpus labels
//!   and texts, positionally aligned and length-checked on load.
//! - [`ann`]: optional HNSW candidate generation for large corpora. It is
//!   approximate and must be opted into through [`SearchStrategy::Hnsw`].
//!
//! The index holds no interior mutability. Once built (or loaded) it can be
//! shared behind an `Arc` and queried from any number of threads.
//!
//! ## Example
//!
//! ```
//! use corpus::{Corpus, Label};
//! use index::{IndexConfig, SimilarityIndex};
//!
//! let mut corpus = Corpus::new();
//! corpus.push(vec![1.0, 0.0], Label::Legal, "SELECT 1").unwrap();
//! corpus.push(vec![0.0, 2.0], Label::Illegal, "' OR 1=1--").unwrap();
//!
//! let index = SimilarityIndex::build(&corpus, &IndexConfig::default()).unwrap();
//! let hits = index.search(&[3.0, 0.1], 1).unwrap();
//! assert_eq!(hits[0].id, 0);
//! ```

pub mod ann;
pub mod normalize;
pub mod persist;
mod query;

use corpus::{Corpus, RecordId};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::ann::AnnConfig;
pub use crate::normalize::{l2_norm, normalize, normalize_in_place, UnitVector, NORM_EPSILON};
pub use crate::persist::{
    from_bytes, load, save, to_bytes, CompressionCodec, CompressionConfig, SNAPSHOT_VERSION,
};
pub use crate::query::Neighbor;

use crate::ann::AnnIndex;

/// How [`SimilarityIndex::search`] finds candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    /// Score every row. Deterministic and complete.
    #[default]
    Exact,
    /// HNSW candidates rescored exactly. Approximate: may miss neighbors.
    Hnsw,
}

/// Config for building or loading an index.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IndexConfig {
    /// Candidate generation strategy.
    pub strategy: SearchStrategy,
    /// HNSW parameters, used only with [`SearchStrategy::Hnsw`].
    pub ann: AnnConfig,
    /// Compression applied to snapshots written by [`save`].
    pub compression: CompressionConfig,
}

impl IndexConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strategy(mut self, strategy: SearchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_ann(mut self, ann: AnnConfig) -> Self {
        self.ann = ann;
        self
    }

    pub fn with_compression(mut self, compression: CompressionConfig) -> Self {
        self.compression = compression;
        self
    }
}

/// Errors produced while building, querying, or persisting an index.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndexError {
    /// Vectors of inconsistent length within a corpus or against the index.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    /// A vector whose L2 norm is too small (or not finite) to normalize.
    #[error("degenerate vector: L2 norm {norm} cannot be normalized")]
    DegenerateVector { norm: f32 },
    #[error("cannot build an index from an empty corpus")]
    EmptyCorpus,
    #[error("k must be at least 1 (got {k})")]
    InvalidK { k: usize },
    /// The corpus passed to `save` is not the one the index was built from.
    #[error("corpus has {records} records but index has {rows} rows")]
    Misaligned { records: usize, rows: usize },
    /// Persisted data failed an integrity check.
    #[error("corrupt index: {0}")]
    CorruptIndex(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("snapshot encode error: {0}")]
    Encode(String),
    #[error("compression error: {0}")]
    Compression(String),
    #[error("hnsw error: {0}")]
    Ann(String),
}

impl IndexError {
    pub(crate) fn corrupt<E: std::fmt::Display>(err: E) -> Self {
        Self::CorruptIndex(err.to_string())
    }
}

impl From<std::io::Error> for IndexError {
    fn from(e: std::io::Error) -> Self {
        IndexError::Io(e.to_string())
    }
}

/// Read-only similarity index over unit-normalized corpus vectors.
///
/// Row `i` of the matrix is the normalized vector of record id `i`.
pub struct SimilarityIndex {
    cfg: IndexConfig,
    matrix: Array2<f32>,
    ann: Option<AnnIndex>,
}

impl std::fmt::Debug for SimilarityIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimilarityIndex")
            .field("len", &self.len())
            .field("dimension", &self.dimension())
            .field("strategy", &self.cfg.strategy)
            .field("ann_built", &self.ann.is_some())
            .finish()
    }
}

impl SimilarityIndex {
    /// Normalize every record of `corpus` and build the search structure.
    ///
    /// Fails with [`IndexError::EmptyCorpus`] for an empty corpus,
    /// [`IndexError::DimensionMismatch`] when a record's length differs from the
    /// first record's, and [`IndexError::DegenerateVector`] when a record cannot
    /// be normalized.
    pub fn build(corpus: &Corpus, cfg: &IndexConfig) -> Result<Self, IndexError> {
        let dimension = corpus.dimension().ok_or(IndexError::EmptyCorpus)?;

        let mut flat = Vec::with_capacity(corpus.len() * dimension);
        for record in corpus {
            if record.dimension() != dimension {
                log::debug!(
                    "record {} has dimension {}, corpus dimension is {dimension}",
                    record.id(),
                    record.dimension()
                );
                return Err(IndexError::DimensionMismatch {
                    expected: dimension,
                    got: record.dimension(),
                });
            }
            let start = flat.len();
            flat.extend_from_slice(record.vector());
            normalize_in_place(&mut flat[start..])?;
        }

        let index = Self::from_unit_rows(dimension, flat, cfg.clone())?;
        log::debug!(
            "similarity index built: {} rows, dimension {dimension}, strategy {:?}",
            index.len(),
            cfg.strategy
        );
        Ok(index)
    }

    /// Assemble an index from an already-normalized, row-major buffer.
    pub(crate) fn from_unit_rows(
        dimension: usize,
        flat: Vec<f32>,
        cfg: IndexConfig,
    ) -> Result<Self, IndexError> {
        if dimension == 0 {
            return Err(IndexError::DimensionMismatch {
                expected: 1,
                got: 0,
            });
        }
        let rows = flat.len() / dimension;
        let matrix = Array2::from_shape_vec((rows, dimension), flat).map_err(IndexError::corrupt)?;

        let ann = match cfg.strategy {
            SearchStrategy::Hnsw if cfg.ann.should_use_ann(rows) => {
                cfg.ann.validate()?;
                Some(AnnIndex::build(matrix.view(), cfg.ann))
            }
            _ => None,
        };

        Ok(Self { cfg, matrix, ann })
    }

    /// Number of indexed records.
    pub fn len(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.matrix.nrows() == 0
    }

    /// Dimension every query must match.
    pub fn dimension(&self) -> usize {
        self.matrix.ncols()
    }

    pub fn config(&self) -> &IndexConfig {
        &self.cfg
    }

    /// Strategy requested at build time.
    pub fn strategy(&self) -> SearchStrategy {
        self.cfg.strategy
    }

    /// Whether searches go through the HNSW graph.
    pub fn is_approximate(&self) -> bool {
        self.ann.is_some()
    }

    /// Normalized vector stored for `id`.
    pub fn row(&self, id: RecordId) -> Option<UnitVector> {
        let idx = id as usize;
        (idx < self.len()).then(|| UnitVector::from_normalized(self.matrix.row(idx).to_vec()))
    }

    /// Row-major view of the normalized matrix.
    pub(crate) fn matrix(&self) -> &Array2<f32> {
        &self.matrix
    }
}
