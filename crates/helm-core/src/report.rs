//! Report artifacts
//!
//! All four CSV artifacts (and the optional JSON dump) are rendered in
//! memory first. `commit` writes them to temporary siblings and renames them
//! into place only after every write succeeded. A failed write leaves no
//! report file behind; a failed rename removes the temporaries not yet moved.
//!
//! Frame indices are rescaled to original trajectory numbering
//! (`working * sieve`) here and nowhere else.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use crate::errors::Result;
use crate::pipeline::HelmAssignment;

/// Clusters counted in the summary header share
pub const SUMMARY_TOP_N: usize = 10;

/// One rendered output file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: String,
    pub contents: String,
}

/// Rendered report set for one cluster count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelmReport {
    pub n_clusters: usize,
    pub artifacts: Vec<Artifact>,
}

impl HelmReport {
    /// Render the four CSV artifacts.
    pub fn render(assignment: &HelmAssignment) -> Self {
        let k = assignment.n_clusters;
        let artifacts = vec![
            Artifact {
                file_name: format!("helm_cluster_labels_{}.csv", k),
                contents: render_labels(assignment),
            },
            Artifact {
                file_name: format!("helm_best_frames_indices_{}.csv", k),
                contents: render_best_frames(assignment),
            },
            Artifact {
                file_name: format!("helm_medoid_indices_{}.csv", k),
                contents: render_medoids(assignment),
            },
            Artifact {
                file_name: format!("helm_summary_{}.csv", k),
                contents: render_summary(assignment),
            },
        ];

        Self {
            n_clusters: k,
            artifacts,
        }
    }

    /// Add `helm_assignment_<K>.json` with the full per-rank result.
    pub fn with_json(mut self, assignment: &HelmAssignment) -> Result<Self> {
        let mut contents = serde_json::to_string_pretty(assignment)?;
        contents.push('\n');
        self.artifacts.push(Artifact {
            file_name: format!("helm_assignment_{}.json", self.n_clusters),
            contents,
        });
        Ok(self)
    }

    pub fn artifact(&self, file_name: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.file_name == file_name)
    }

    /// Write every artifact into `dir`. Nothing is renamed into place until
    /// all temporaries are written.
    pub fn commit(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;

        let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(self.artifacts.len());
        for artifact in &self.artifacts {
            let target = dir.join(&artifact.file_name);
            let temp = dir.join(format!(".{}.tmp", artifact.file_name));
            staged.push((temp.clone(), target));
            if let Err(e) = write_file(&temp, &artifact.contents) {
                discard(&staged);
                return Err(e.into());
            }
        }

        let mut written = Vec::with_capacity(staged.len());
        for (i, (temp, target)) in staged.iter().enumerate() {
            if let Err(e) = fs::rename(temp, target) {
                discard(&staged[i..]);
                return Err(e.into());
            }
            log::info!("Wrote {}", target.display());
            written.push(target.clone());
        }
        Ok(written)
    }
}

fn write_file(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()
}

fn discard(staged: &[(PathBuf, PathBuf)]) {
    for (temp, _) in staged {
        match fs::remove_file(temp) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                log::warn!("Failed to remove staged file {}: {}", temp.display(), e);
            }
            _ => {}
        }
    }
}

fn labels_header(n_clusters: usize) -> String {
    format!(
        "# Helm,number of clusters,{}\n# frame_index,cluster_index\n",
        n_clusters
    )
}

fn render_labels(assignment: &HelmAssignment) -> String {
    let mut out = labels_header(assignment.n_clusters);
    for cluster in &assignment.clusters {
        for &frame in &cluster.frames {
            out.push_str(&format!("{},{}\n", frame * assignment.sieve, cluster.rank));
        }
    }
    out
}

fn render_best_frames(assignment: &HelmAssignment) -> String {
    let mut out = labels_header(assignment.n_clusters);
    for cluster in &assignment.clusters {
        for frame in cluster.representative_frames() {
            out.push_str(&format!("{},{}\n", frame * assignment.sieve, cluster.rank));
        }
    }
    out
}

fn render_medoids(assignment: &HelmAssignment) -> String {
    let mut out = String::from("# cluster_index,medoid_index\n");
    for cluster in &assignment.clusters {
        out.push_str(&format!(
            "{},{}\n",
            cluster.rank,
            cluster.medoid_frame() * assignment.sieve
        ));
    }
    out
}

fn render_summary(assignment: &HelmAssignment) -> String {
    let mut out = String::from("# Population Summary\n");
    out.push_str(&format!(
        "# top {} frac,{:.6},number of clusters,{}\n",
        SUMMARY_TOP_N,
        assignment.top_fraction(SUMMARY_TOP_N),
        assignment.n_clusters
    ));
    out.push_str("# cluster index,frac of total frames\n");
    for cluster in &assignment.clusters {
        out.push_str(&format!("{},{:.6}\n", cluster.rank, cluster.fraction));
    }
    out
}
