//! Medoid selection for ranked clusters

use ndarray::ArrayView2;

use crate::errors::{HelmError, Result};
use crate::oracle::Dissimilarity;

/// Member-local index of the cluster medoid.
///
/// Deterministic for a given member order and metric. An empty member set is
/// an error rather than a silent zero.
pub fn select_medoid(
    oracle: &dyn Dissimilarity,
    frames: ArrayView2<'_, f64>,
    rank: usize,
) -> Result<usize> {
    if frames.nrows() == 0 {
        return Err(HelmError::EmptyCluster { rank });
    }

    let medoid = oracle
        .medoid(frames)
        .ok_or(HelmError::EmptyCluster { rank })?;

    log::debug!(
        "Rank {}: medoid at member {} of {} ({})",
        rank,
        medoid,
        frames.nrows(),
        oracle.metric()
    );

    Ok(medoid)
}
