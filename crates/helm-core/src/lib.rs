//! # HELM intra-cluster assignment
//!
//! Turns a fine-grained frame labeling plus a coarse cluster-merge plan into
//! final cluster membership for a molecular dynamics trajectory, then picks a
//! medoid and a ranked set of representative frames for every cluster.
//!
//! ## Pipeline
//!
//! 1. **Reconcile**: fine labels → coarse cluster membership ([`reconcile`](mod@reconcile))
//! 2. **Rank**: clusters sorted by population, rank 0 largest ([`rank`])
//! 3. **Medoid**: most central member per cluster ([`medoid`])
//! 4. **Representatives**: medoid plus closest or random members ([`extract`])
//! 5. **Report**: four CSV artifacts in original frame numbering ([`report`])
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use helm_core::{assign_labels, FineLabelTable, HelmConfig, HelmReport, MergePlan, Trajectory};
//!
//! let config = HelmConfig::from_file(Path::new("helm.toml"))?;
//! let settings = config.assignment_settings();
//!
//! let trajectory = Trajectory::load_npy(Path::new("traj.npy"), settings.n_atoms, settings.sieve)?;
//! let labels = FineLabelTable::load_csv(Path::new("labels_60.csv"), settings.sieve)?;
//! let plan = MergePlan::load_json(Path::new("intra-helm.json"))?;
//!
//! let assignment = assign_labels(&trajectory, &labels, &plan, &settings)?;
//! HelmReport::render(&assignment).commit(Path::new("results"))?;
//! ```
//!
//! Frames are compared without superposition; the trajectory is expected to
//! be aligned already.

#![warn(clippy::all)]

pub mod config;
pub mod errors;
pub mod extract;
pub mod labels;
pub mod medoid;
pub mod oracle;
pub mod pipeline;
pub mod plan;
pub mod rank;
pub mod reconcile;
pub mod report;
pub mod trajectory;

// Re-exports for convenience
pub use config::{AssignmentSettings, HelmConfig, HelmSettings, InputPaths, OutputConfig, SystemConfig};
pub use errors::{HelmError, Result};
pub use extract::{extract_representatives, ExtractPolicy};
pub use labels::{FineLabel, FineLabelTable, LabeledFrame};
pub use medoid::select_medoid;
pub use oracle::{
    oracle_for, Dissimilarity, MeanSquareDeviation, Metric, RootMeanSquareDeviation,
};
pub use pipeline::{assign_labels, HelmAssignment, RankedCluster};
pub use plan::{CoarseEntry, MergePlan};
pub use rank::RankPermutation;
pub use reconcile::{reconcile, Reconciliation};
pub use report::{Artifact, HelmReport, SUMMARY_TOP_N};
pub use trajectory::Trajectory;
