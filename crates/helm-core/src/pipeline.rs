//! HELM intra-cluster assignment pipeline
//!
//! ```text
//! fine labels + merge plan ──► reconcile ──► rank
//!                                              │
//!                         per rank: medoid ──► representatives
//! ```
//!
//! Ranks are independent once the permutation and memberships exist, so the
//! per-rank loop runs on rayon when the `parallel` feature is on. Each rank
//! seeds its own RNG from `(seed, rank)`; results do not depend on thread
//! scheduling.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::AssignmentSettings;
use crate::errors::{HelmError, Result};
use crate::extract::{extract_representatives, ExtractPolicy};
use crate::labels::FineLabelTable;
use crate::medoid::select_medoid;
use crate::oracle::{oracle_for, Dissimilarity, Metric};
use crate::plan::MergePlan;
use crate::rank::RankPermutation;
use crate::reconcile::{reconcile, Reconciliation};
use crate::trajectory::Trajectory;

/// Odd 64-bit constant used to spread per-rank seeds
const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// One cluster after ranking, with its medoid and representatives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCluster {
    /// Position after sorting by population (0 = largest)
    pub rank: usize,
    /// Position of the cluster in the merge plan
    pub coarse_id: usize,
    /// Declared population
    pub population: usize,
    /// `population / total_frames`
    pub fraction: f64,
    /// Working frame indices in member order
    pub frames: Vec<usize>,
    /// Member-local medoid index
    pub medoid: usize,
    /// Member-local representative indices, medoid first
    pub representatives: Vec<usize>,
}

impl RankedCluster {
    /// Working frame index of the medoid
    pub fn medoid_frame(&self) -> usize {
        self.frames[self.medoid]
    }

    /// Working frame indices of the representatives
    pub fn representative_frames(&self) -> Vec<usize> {
        self.representatives.iter().map(|&j| self.frames[j]).collect()
    }
}

/// Full result of one assignment run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelmAssignment {
    pub n_clusters: usize,
    pub sieve: usize,
    pub metric: Metric,
    pub extract_type: ExtractPolicy,
    /// Seed actually used by the random policy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Frames assigned to some cluster
    pub total_frames: usize,
    /// Labeled frames left out because no coarse cluster claims their label
    pub dropped_frames: usize,
    /// Clusters in rank order
    pub clusters: Vec<RankedCluster>,
}

impl HelmAssignment {
    /// Summed population share of the `n` largest clusters, six-decimal terms
    pub fn top_fraction(&self, n: usize) -> f64 {
        self.clusters
            .iter()
            .take(n)
            .map(|c| {
                let rounded = format!("{:.6}", c.fraction);
                rounded.parse::<f64>().unwrap_or(c.fraction)
            })
            .sum()
    }
}

/// Run reconciliation, ranking, medoid selection and representative
/// extraction for `settings.n_clusters`.
pub fn assign_labels(
    trajectory: &Trajectory,
    labels: &FineLabelTable,
    plan: &MergePlan,
    settings: &AssignmentSettings,
) -> Result<HelmAssignment> {
    if trajectory.n_atoms() != settings.n_atoms {
        return Err(HelmError::dimension(
            "trajectory atom count",
            settings.n_atoms,
            trajectory.n_atoms(),
        ));
    }
    if trajectory.sieve() != settings.sieve {
        return Err(HelmError::config(format!(
            "trajectory was loaded with sieve {} but settings use sieve {}",
            trajectory.sieve(),
            settings.sieve
        )));
    }
    if settings.n_structures == 0 {
        return Err(HelmError::config("n_structures must be at least 1"));
    }

    let entries = plan.entries(settings.n_clusters)?;
    if entries.len() != settings.n_clusters {
        log::warn!(
            "Merge plan level {} lists {} clusters",
            settings.n_clusters,
            entries.len()
        );
    }

    labels.check_bounds(trajectory.n_frames())?;
    let reconciliation = reconcile(labels, entries)?;
    let ranking = RankPermutation::from_entries(entries, reconciliation.assigned_frames);

    let oracle = oracle_for(settings.metric, settings.n_atoms);
    let seed = match settings.extract_type {
        ExtractPolicy::Random => Some(settings.seed.unwrap_or_else(|| {
            let drawn = StdRng::from_entropy().gen::<u64>();
            log::info!("No seed configured for random extraction, using {}", drawn);
            drawn
        })),
        ExtractPolicy::Top => settings.seed,
    };

    let job = RankJob {
        trajectory,
        reconciliation: &reconciliation,
        ranking: &ranking,
        oracle: oracle.as_ref(),
        settings,
        seed: seed.unwrap_or(0),
    };

    #[cfg(feature = "parallel")]
    let clusters = (0..ranking.len())
        .into_par_iter()
        .map(|rank| job.run(rank))
        .collect::<Result<Vec<_>>>()?;

    #[cfg(not(feature = "parallel"))]
    let clusters = (0..ranking.len())
        .map(|rank| job.run(rank))
        .collect::<Result<Vec<_>>>()?;

    log::info!(
        "Assigned {} frames to {} ranked clusters ({} dropped)",
        reconciliation.assigned_frames,
        clusters.len(),
        reconciliation.dropped_frames
    );

    Ok(HelmAssignment {
        n_clusters: settings.n_clusters,
        sieve: settings.sieve,
        metric: settings.metric,
        extract_type: settings.extract_type,
        seed,
        total_frames: ranking.total_frames(),
        dropped_frames: reconciliation.dropped_frames,
        clusters,
    })
}

/// Read-only state shared by every rank
struct RankJob<'a> {
    trajectory: &'a Trajectory,
    reconciliation: &'a Reconciliation,
    ranking: &'a RankPermutation,
    oracle: &'a dyn Dissimilarity,
    settings: &'a AssignmentSettings,
    seed: u64,
}

impl RankJob<'_> {
    fn run(&self, rank: usize) -> Result<RankedCluster> {
        let coarse_id = self.ranking.coarse_id(rank);
        let frames = self.reconciliation.members_of(coarse_id).to_vec();
        if frames.is_empty() {
            return Err(HelmError::EmptyCluster { rank });
        }

        let coords = self.trajectory.select(&frames)?;
        let medoid = select_medoid(self.oracle, coords.view(), rank)?;

        let mut rng = StdRng::seed_from_u64(rank_seed(self.seed, rank));
        let representatives = extract_representatives(
            self.oracle,
            coords.view(),
            medoid,
            self.settings.n_structures,
            self.settings.extract_type,
            &mut rng,
        )?;

        log::info!(
            "Rank {}: coarse cluster {}, {} frames, medoid frame {}",
            rank,
            coarse_id,
            frames.len(),
            frames[medoid]
        );

        Ok(RankedCluster {
            rank,
            coarse_id,
            population: self.ranking.population(rank),
            fraction: self.ranking.fraction(rank),
            frames,
            medoid,
            representatives,
        })
    }
}

fn rank_seed(seed: u64, rank: usize) -> u64 {
    seed ^ (rank as u64 + 1).wrapping_mul(SEED_STRIDE)
}
