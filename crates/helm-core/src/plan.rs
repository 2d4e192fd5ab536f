//! Coarse merge plan
//!
//! JSON object keyed by cluster count K. Each value lists the coarse clusters
//! at that level as `[fine_labels, medoid_hint, population]` triples:
//!
//! ```json
//! { "2": [[[0, 2], 14, 7], [[1], null, 2]] }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{HelmError, Result};
use crate::labels::FineLabel;

/// One coarse cluster in the plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawEntry", into = "RawEntry")]
pub struct CoarseEntry {
    /// Fine labels merged into this cluster, in merge order
    pub fine_labels: Vec<FineLabel>,
    /// Medoid recorded by the merge step; not used for reconciliation
    pub medoid_hint: serde_json::Value,
    /// Number of frames in the cluster
    pub population: usize,
}

impl CoarseEntry {
    pub fn new(fine_labels: Vec<FineLabel>, population: usize) -> Self {
        Self {
            fine_labels,
            medoid_hint: serde_json::Value::Null,
            population,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RawEntry(Vec<FineLabel>, serde_json::Value, usize);

impl From<RawEntry> for CoarseEntry {
    fn from(raw: RawEntry) -> Self {
        Self {
            fine_labels: raw.0,
            medoid_hint: raw.1,
            population: raw.2,
        }
    }
}

impl From<CoarseEntry> for RawEntry {
    fn from(entry: CoarseEntry) -> Self {
        RawEntry(entry.fine_labels, entry.medoid_hint, entry.population)
    }
}

/// Coarse clusters for every available cluster count
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MergePlan {
    levels: BTreeMap<usize, Vec<CoarseEntry>>,
}

impl MergePlan {
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let plan = Self::from_json_str(&content)?;
        log::info!(
            "Loaded merge plan {} with cluster counts {:?}",
            path.display(),
            plan.cluster_counts()
        );
        Ok(plan)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Add or replace the clusters for one cluster count
    pub fn insert(&mut self, n_clusters: usize, entries: Vec<CoarseEntry>) {
        self.levels.insert(n_clusters, entries);
    }

    /// Available cluster counts, ascending
    pub fn cluster_counts(&self) -> Vec<usize> {
        self.levels.keys().copied().collect()
    }

    /// Coarse clusters for `n_clusters`
    pub fn entries(&self, n_clusters: usize) -> Result<&[CoarseEntry]> {
        self.levels
            .get(&n_clusters)
            .map(Vec::as_slice)
            .ok_or_else(|| {
                HelmError::config(format!(
                    "n_clusters {} not present in merge plan (available: {:?})",
                    n_clusters,
                    self.cluster_counts()
                ))
            })
    }
}
