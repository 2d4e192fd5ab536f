//! HELM assignment configuration
//!
//! TOML file with four sections; every field has a default so an empty file
//! (or no file) is a valid starting point for command-line overrides.
//!
//! ```toml
//! [system]
//! n_atoms = 50
//! sieve = 1
//!
//! [helm]
//! n_clusters = 10
//! metric = "MSD"
//! extract_type = "top"
//! n_structures = 11
//!
//! [inputs]
//! trajectory = "traj.npy"
//! fine_labels = "labels_60.csv"
//! merge_plan = "intra-helm.json"
//!
//! [output]
//! dir = "results"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{HelmError, Result};
use crate::extract::ExtractPolicy;
use crate::oracle::Metric;

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HelmConfig {
    #[serde(default)]
    pub system: SystemConfig,

    #[serde(default)]
    pub helm: HelmSettings,

    #[serde(default)]
    pub inputs: InputPaths,

    #[serde(default)]
    pub output: OutputConfig,
}

impl HelmConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse configuration from TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Validate numeric settings
    pub fn validate(&self) -> Result<()> {
        self.system.validate()?;
        self.helm.validate()
    }

    /// Settings the pipeline needs, independent of file locations
    pub fn assignment_settings(&self) -> AssignmentSettings {
        AssignmentSettings {
            n_atoms: self.system.n_atoms,
            sieve: self.system.sieve,
            n_clusters: self.helm.n_clusters,
            metric: self.helm.metric,
            extract_type: self.helm.extract_type,
            n_structures: self.helm.n_structures,
            seed: self.helm.seed,
        }
    }
}

/// Trajectory layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Atoms per frame
    #[serde(default = "default_n_atoms")]
    pub n_atoms: usize,

    /// Keep every `sieve`-th trajectory frame
    #[serde(default = "default_sieve")]
    pub sieve: usize,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            n_atoms: default_n_atoms(),
            sieve: default_sieve(),
        }
    }
}

impl SystemConfig {
    fn validate(&self) -> Result<()> {
        if self.n_atoms == 0 {
            return Err(HelmError::config("n_atoms must be at least 1"));
        }
        if self.sieve == 0 {
            return Err(HelmError::config("sieve must be at least 1"));
        }
        Ok(())
    }
}

/// Cluster selection and representative extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelmSettings {
    /// Cluster count to read from the merge plan
    #[serde(default = "default_n_clusters")]
    pub n_clusters: usize,

    #[serde(default)]
    pub metric: Metric,

    #[serde(default)]
    pub extract_type: ExtractPolicy,

    /// Representatives per cluster, medoid included
    #[serde(default = "default_n_structures")]
    pub n_structures: usize,

    /// RNG seed for `extract_type = "random"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for HelmSettings {
    fn default() -> Self {
        Self {
            n_clusters: default_n_clusters(),
            metric: Metric::default(),
            extract_type: ExtractPolicy::default(),
            n_structures: default_n_structures(),
            seed: None,
        }
    }
}

impl HelmSettings {
    fn validate(&self) -> Result<()> {
        if self.n_clusters == 0 {
            return Err(HelmError::config("n_clusters must be at least 1"));
        }
        if self.n_structures == 0 {
            return Err(HelmError::config("n_structures must be at least 1"));
        }
        Ok(())
    }
}

/// Input file locations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputPaths {
    /// `.npy` trajectory array
    pub trajectory: Option<PathBuf>,
    /// `frame_index,label` CSV
    pub fine_labels: Option<PathBuf>,
    /// JSON merge plan keyed by cluster count
    pub merge_plan: Option<PathBuf>,
}

/// Report output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    /// Also write `helm_assignment_<K>.json`
    #[serde(default)]
    pub json_summary: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            json_summary: false,
        }
    }
}

/// Everything the assignment pipeline reads, shared read-only across ranks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssignmentSettings {
    pub n_atoms: usize,
    pub sieve: usize,
    pub n_clusters: usize,
    pub metric: Metric,
    pub extract_type: ExtractPolicy,
    pub n_structures: usize,
    pub seed: Option<u64>,
}

impl Default for AssignmentSettings {
    fn default() -> Self {
        HelmConfig::default().assignment_settings()
    }
}

fn default_n_atoms() -> usize {
    50
}

fn default_sieve() -> usize {
    1
}

fn default_n_clusters() -> usize {
    10
}

fn default_n_structures() -> usize {
    11
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HelmConfig::from_str("").unwrap();
        assert_eq!(config.system.n_atoms, 50);
        assert_eq!(config.system.sieve, 1);
        assert_eq!(config.helm.n_clusters, 10);
        assert_eq!(config.helm.metric, Metric::Msd);
        assert_eq!(config.helm.extract_type, ExtractPolicy::Top);
        assert_eq!(config.helm.n_structures, 11);
        assert_eq!(config.output.dir, PathBuf::from("."));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let config = HelmConfig::from_str(
            r#"
            [system]
            n_atoms = 304
            sieve = 5

            [helm]
            n_clusters = 4
            metric = "rmsd"
            extract_type = "random"
            n_structures = 3
            seed = 2024

            [inputs]
            trajectory = "traj.npy"
            fine_labels = "labels.csv"
            merge_plan = "plan.json"

            [output]
            dir = "out"
            json_summary = true
            "#,
        )
        .unwrap();

        let settings = config.assignment_settings();
        assert_eq!(settings.n_atoms, 304);
        assert_eq!(settings.sieve, 5);
        assert_eq!(settings.metric, Metric::Rmsd);
        assert_eq!(settings.extract_type, ExtractPolicy::Random);
        assert_eq!(settings.seed, Some(2024));
        assert_eq!(config.inputs.merge_plan, Some(PathBuf::from("plan.json")));
        assert!(config.output.json_summary);
    }

    #[test]
    fn test_unknown_metric_rejected() {
        let result = HelmConfig::from_str("[helm]\nmetric = \"Tanimoto\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let mut config = HelmConfig::default();
        config.system.sieve = 0;
        assert!(matches!(config.validate(), Err(HelmError::Configuration(_))));

        let mut config = HelmConfig::default();
        config.helm.n_structures = 0;
        assert!(matches!(config.validate(), Err(HelmError::Configuration(_))));
    }
}
