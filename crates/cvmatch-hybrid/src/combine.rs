use cvmatch_core::types::{DenseVector, SparseVector};
use cvmatch_core::{Error, Result};

/// Convex weighting of a hybrid query: dense values scaled by `alpha`,
/// sparse values by `1 - alpha`, sparse indices untouched.
///
/// The index scores a record as dense dot plus sparse dot, so pre-scaling
/// the query sets the semantic/lexical balance.
pub fn hybrid_combine(dense: &[f32], sparse: &SparseVector, alpha: f32) -> Result<(DenseVector, SparseVector)> {
    if !(0.0..=1.0).contains(&alpha) {
        return Err(Error::InvalidWeight(alpha));
    }
    let dense = dense.iter().map(|v| v * alpha).collect();
    Ok((dense, sparse.scaled(1.0 - alpha)))
}
