//! Error types for HELM assignment.
//!
//! One variant per failure class of the pipeline, plus wrappers for the
//! collaborators that read inputs from disk.

use thiserror::Error;

/// Unified error type for all HELM operations.
#[derive(Error, Debug)]
pub enum HelmError {
    /// Missing cluster count in the merge plan, unknown metric or policy,
    /// invalid numeric settings.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Inputs disagree with each other (population totals, frame bounds,
    /// fine labels claimed twice).
    #[error("Data mismatch: {0}")]
    DataMismatch(String),

    /// A ranked cluster ended up with no member frames.
    #[error("Cluster at rank {rank} has no member frames")]
    EmptyCluster { rank: usize },

    /// Frame coordinate layout inconsistent with the configured atom count.
    #[error("Dimension error in {context}: expected {expected}, found {found}")]
    Dimension {
        context: String,
        expected: usize,
        found: usize,
    },

    /// I/O errors (reading inputs, committing reports)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Fine label table parsing errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Merge plan / JSON summary errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Trajectory array loading errors
    #[error("NPY error: {0}")]
    Npy(#[from] ndarray_npy::ReadNpyError),
}

impl HelmError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        HelmError::Configuration(message.into())
    }

    /// Creates a data mismatch error.
    pub fn mismatch(message: impl Into<String>) -> Self {
        HelmError::DataMismatch(message.into())
    }

    /// Creates a dimension error.
    pub fn dimension(context: impl Into<String>, expected: usize, found: usize) -> Self {
        HelmError::Dimension {
            context: context.into(),
            expected,
            found,
        }
    }

    /// Returns a user-friendly error message with actionable guidance.
    pub fn user_message(&self) -> String {
        match self {
            HelmError::Configuration(msg) => {
                format!(
                    "Configuration error: {}\n\
                     → Check n_clusters against the keys present in the merge plan.\n\
                     → Supported metrics: MSD, RMSD. Supported extract types: top, random.",
                    msg
                )
            }
            HelmError::DataMismatch(msg) => {
                format!(
                    "Data mismatch: {}\n\
                     → The merge plan may be stale or built from a different label file.\n\
                     → Make sure sieve matches the stride used to produce the fine labels.",
                    msg
                )
            }
            HelmError::Dimension { .. } => {
                format!(
                    "{}\n\
                     → Verify n_atoms matches the trajectory array (frames x n_atoms*3).",
                    self
                )
            }
            _ => self.to_string(),
        }
    }
}

/// Result type alias for HELM operations.
pub type Result<T> = std::result::Result<T, HelmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_constructors() {
        let config_err = HelmError::config("n_clusters 7 not in plan");
        assert!(matches!(config_err, HelmError::Configuration(_)));

        let mismatch = HelmError::mismatch("populations sum to 10, 9 frames assigned");
        assert!(matches!(mismatch, HelmError::DataMismatch(_)));

        let dim = HelmError::dimension("trajectory", 150, 149);
        assert!(matches!(
            dim,
            HelmError::Dimension { expected: 150, found: 149, .. }
        ));
    }

    #[test]
    fn test_user_message_has_guidance() {
        let msg = HelmError::config("unknown metric 'XYZ'").user_message();
        assert!(msg.contains("unknown metric 'XYZ'"));
        assert!(msg.contains("Supported metrics"));

        let empty = HelmError::EmptyCluster { rank: 3 };
        assert_eq!(empty.user_message(), "Cluster at rank 3 has no member frames");
    }
}
