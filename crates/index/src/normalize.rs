//! L2 normalization with an explicit degenerate-vector check.
//!
//! All similarity decisions are defined over unit vectors, where the inner
//! product equals cosine similarity. Vectors whose norm falls below
//! [`NORM_EPSILON`], or that contain NaN or infinite components, cannot be
//! normalized meaningfully and are rejected with
//! [`IndexError::DegenerateVector`].

use std::ops::Deref;

use crate::IndexError;

/// Smallest L2 norm accepted by [`normalize`].
pub const NORM_EPSILON: f32 = 1e-6;

/// A vector with unit L2 norm (within floating-point tolerance).
///
/// Only [`normalize`] and the index itself construct values of this type, so
/// holding one is proof the normalization step already ran.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitVector(Vec<f32>);

impl UnitVector {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    /// Wrap a row that is already known to be unit-norm.
    pub(crate) fn from_normalized(v: Vec<f32>) -> Self {
        Self(v)
    }
}

impl Deref for UnitVector {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        &self.0
    }
}

impl AsRef<[f32]> for UnitVector {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}

/// Euclidean norm of `v`.
///
/// Squares are accumulated in `f64`, so large finite components do not
/// overflow. The result is infinite only when the norm itself exceeds
/// `f32::MAX` or an input component is not finite.
#[inline]
pub fn l2_norm(v: &[f32]) -> f32 {
    norm_f64(v) as f32
}

#[inline]
fn norm_f64(v: &[f32]) -> f64 {
    v.iter()
        .map(|&x| {
            let x = f64::from(x);
            x * x
        })
        .sum::<f64>()
        .sqrt()
}

/// Return a unit-norm copy of `v`.
pub fn normalize(v: &[f32]) -> Result<UnitVector, IndexError> {
    let mut out = v.to_vec();
    normalize_in_place(&mut out)?;
    Ok(UnitVector(out))
}

/// In-place variant used on hot paths where the caller already owns the buffer.
///
/// Components that are NaN or infinite make the vector degenerate; any finite
/// vector with a norm of at least [`NORM_EPSILON`] is accepted.
pub fn normalize_in_place(v: &mut [f32]) -> Result<(), IndexError> {
    let norm = norm_f64(v);
    if !norm.is_finite() || norm < f64::from(NORM_EPSILON) {
        return Err(IndexError::DegenerateVector { norm: norm as f32 });
    }
    for x in v.iter_mut() {
        *x = (f64::from(*x) / norm) as f32;
    }
    Ok(())
}
