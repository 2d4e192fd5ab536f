//! Population ranking of coarse clusters
//!
//! The ranking is an immutable mapping from ranks to plan positions (coarse
//! ids), where rank 0 is the most populated cluster. Every later
//! stage looks clusters up through it; the plan itself is never re-keyed.

use serde::{Deserialize, Serialize};

use crate::plan::CoarseEntry;

/// Rank → coarse id order with per-rank populations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankPermutation {
    /// `order[rank]` is the coarse id at that rank
    order: Vec<usize>,
    /// Declared population per rank
    populations: Vec<usize>,
    /// Denominator for population fractions
    total_frames: usize,
}

impl RankPermutation {
    /// Sort coarse clusters by descending population.
    ///
    /// The sort is stable: equal populations keep plan order.
    pub fn from_entries(entries: &[CoarseEntry], total_frames: usize) -> Self {
        let mut order: Vec<usize> = (0..entries.len()).collect();
        order.sort_by(|&a, &b| entries[b].population.cmp(&entries[a].population));

        let populations = order.iter().map(|&id| entries[id].population).collect();

        log::info!(
            "Ranked {} clusters by population (largest: {})",
            order.len(),
            order
                .first()
                .map(|&id| entries[id].population)
                .unwrap_or(0)
        );

        Self {
            order,
            populations,
            total_frames,
        }
    }

    /// Number of ranked clusters
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    /// Coarse id of the cluster at `rank`
    pub fn coarse_id(&self, rank: usize) -> usize {
        self.order[rank]
    }

    pub fn population(&self, rank: usize) -> usize {
        self.populations[rank]
    }

    /// Population share of the cluster at `rank`
    pub fn fraction(&self, rank: usize) -> f64 {
        if self.total_frames == 0 {
            return 0.0;
        }
        self.populations[rank] as f64 / self.total_frames as f64
    }
}
