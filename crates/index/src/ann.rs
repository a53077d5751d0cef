//! Approximate nearest-neighbor candidates via HNSW graphs.
//!
//! The exact scan in [`crate::SimilarityIndex`] is the default and the only
//! path with the reproducibility guarantees callers rely on (every record is
//! scored, ties break by lowest id). HNSW trades those guarantees for
//! sub-linear search:
//!
//! - **Recall**: typically 95-99%, so a true neighbor may be missing and fewer
//!   than `k` candidates may come back.
//! - **Scores**: candidate scores are recomputed exactly against the stored
//!   unit rows, so reported similarities are not approximations.
//! - **Build time**: graph construction runs once, after the matrix is final.
//!
//! Below [`AnnConfig::min_vectors_for_ann`] rows the exact scan is used even
//! when HNSW is requested.

use hnsw_rs::prelude::*;
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use crate::IndexError;

/// HNSW needs a handful of points before its layer heuristics make sense.
const MIN_GRAPH_POINTS: usize = 10;

/// Configuration for HNSW construction and search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnConfig {
    /// Number of neighbors per node (higher = better recall, slower build).
    /// Default: 16
    pub m: usize,
    /// Candidate list size during construction.
    /// Default: 200
    pub ef_construction: usize,
    /// Candidate list size during search; raised to `k` when smaller.
    /// Default: 50
    pub ef_search: usize,
    /// Minimum number of rows before the graph is built at all.
    /// Default: 1000
    pub min_vectors_for_ann: usize,
}

impl Default for AnnConfig {
    fn default() -> Self {
        Self {
            m: 16,
            ef_construction: 200,
            ef_search: 50,
            min_vectors_for_ann: 1000,
        }
    }
}

impl AnnConfig {
    pub fn with_m(mut self, m: usize) -> Self {
        self.m = m;
        self
    }

    pub fn with_ef_construction(mut self, ef: usize) -> Self {
        self.ef_construction = ef;
        self
    }

    pub fn with_ef_search(mut self, ef: usize) -> Self {
        self.ef_search = ef;
        self
    }

    pub fn with_min_vectors_for_ann(mut self, min: usize) -> Self {
        self.min_vectors_for_ann = min;
        self
    }

    /// Whether a graph should be built for `num_vectors` rows.
    pub fn should_use_ann(&self, num_vectors: usize) -> bool {
        num_vectors >= self.min_vectors_for_ann.max(MIN_GRAPH_POINTS)
    }

    pub(crate) fn validate(&self) -> Result<(), IndexError> {
        if self.m == 0 || self.ef_construction == 0 || self.ef_search == 0 {
            return Err(IndexError::Ann(
                "m, ef_construction and ef_search must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// HNSW graph over the rows of a unit-vector matrix. Point ids are row ids.
pub(crate) struct AnnIndex {
    config: AnnConfig,
    dimension: usize,
    hnsw: Hnsw<'static, f32, DistCosine>,
}

impl AnnIndex {
    /// Build a graph over every row of `rows`.
    pub(crate) fn build(rows: ArrayView2<'_, f32>, config: AnnConfig) -> Self {
        let (nb_elem, dimension) = rows.dim();
        let nb_layer = 16.min((nb_elem as f32).ln().trunc() as usize).max(1);

        let hnsw = Hnsw::<f32, DistCosine>::new(
            config.m,
            nb_elem,
            nb_layer,
            config.ef_construction,
            DistCosine {},
        );

        let owned: Vec<Vec<f32>> = rows.outer_iter().map(|row| row.to_vec()).collect();
        let data_for_insertion: Vec<(&Vec<f32>, usize)> =
            owned.iter().enumerate().map(|(idx, v)| (v, idx)).collect();
        hnsw.parallel_insert(&data_for_insertion);

        log::debug!(
            "hnsw graph built: {nb_elem} points, {nb_layer} layers, m={}",
            config.m
        );

        Self {
            config,
            dimension,
            hnsw,
        }
    }

    /// Candidate row ids for `query`, nearest first. May return fewer than `k`.
    pub(crate) fn candidates(&self, query: &[f32], k: usize) -> Result<Vec<usize>, IndexError> {
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                got: query.len(),
            });
        }
        let ef = self.config.ef_search.max(k);
        Ok(self
            .hnsw
            .search(query, k, ef)
            .into_iter()
            .map(|neighbour| neighbour.get_origin_id())
            .collect())
    }
}
