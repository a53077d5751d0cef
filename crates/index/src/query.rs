use std::cmp::Ordering;

use corpus::RecordId;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

use crate::normalize::{normalize, UnitVector};
use crate::{IndexError, SimilarityIndex};

/// One search hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// Id of the matched corpus record.
    pub id: RecordId,
    /// Inner product with the query (cosine similarity, in `[-1.0, 1.0]`).
    pub score: f32,
}

/// Higher score first; equal scores by lower id.
#[inline]
fn rank(a: &Neighbor, b: &Neighbor) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.id.cmp(&b.id))
}

/// Keep the `k` best neighbors in rank order.
fn top_k(mut hits: Vec<Neighbor>, k: usize) -> Vec<Neighbor> {
    if hits.len() > k {
        hits.select_nth_unstable_by(k - 1, rank);
        hits.truncate(k);
    }
    hits.sort_unstable_by(rank);
    hits
}

impl SimilarityIndex {
    /// Normalize `query` and return its `min(k, len)` nearest records.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, IndexError> {
        if k == 0 {
            return Err(IndexError::InvalidK { k });
        }
        self.check_dimension(query.len())?;
        let query = normalize(query)?;
        self.search_unit(&query, k)
    }

    /// Search with a query that is already normalized.
    ///
    /// Results are sorted by score descending; exactly equal scores are
    /// ordered by ascending record id.
    pub fn search_unit(&self, query: &UnitVector, k: usize) -> Result<Vec<Neighbor>, IndexError> {
        if k == 0 {
            return Err(IndexError::InvalidK { k });
        }
        self.check_dimension(query.dimension())?;

        let q = ArrayView1::from(query.as_slice());
        let hits = match &self.ann {
            Some(ann) => ann
                .candidates(query, k)?
                .into_iter()
                .filter(|&idx| idx < self.len())
                .map(|idx| Neighbor {
                    id: idx as RecordId,
                    score: self.matrix().row(idx).dot(&q),
                })
                .collect(),
            None => self
                .matrix()
                .dot(&q)
                .iter()
                .enumerate()
                .map(|(idx, &score)| Neighbor {
                    id: idx as RecordId,
                    score,
                })
                .collect(),
        };

        let hits = top_k(hits, k);
        log::trace!("search k={k} returned {} hits", hits.len());
        Ok(hits)
    }

    fn check_dimension(&self, got: usize) -> Result<(), IndexError> {
        if got != self.dimension() {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension(),
                got,
            });
        }
        Ok(())
    }
}
