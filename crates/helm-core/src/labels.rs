//! Fine label table
//!
//! Two integer columns per row: original frame index and fine cluster label.
//! Original indices are converted to working indices (`index / sieve`) on
//! load, so everything downstream addresses rows of the subsampled
//! trajectory.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use serde::{Deserialize, Serialize};

use crate::errors::{HelmError, Result};

/// Fine cluster label as written by the upstream clustering
pub type FineLabel = i64;

/// One labeled frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledFrame {
    /// Working (subsampled) frame index
    pub frame: usize,
    /// Fine cluster label
    pub label: FineLabel,
}

/// Per-frame fine labels in file order
#[derive(Debug, Clone, Default)]
pub struct FineLabelTable {
    entries: Vec<LabeledFrame>,
}

impl FineLabelTable {
    /// Read a `frame_index,label` file. Lines starting with `#` are skipped.
    pub fn load_csv(path: &Path, sieve: usize) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .comment(Some(b'#'))
            .trim(Trim::All)
            .from_path(path)?;

        let mut pairs = Vec::new();
        for (row, result) in reader.records().enumerate() {
            let record = result?;
            if record.len() < 2 {
                return Err(HelmError::mismatch(format!(
                    "{} row {}: expected frame_index,label but found {} field(s)",
                    path.display(),
                    row + 1,
                    record.len()
                )));
            }
            let frame = parse_int(&record[0], path, row)?;
            let label = parse_int(&record[1], path, row)?;
            pairs.push((frame, label));
        }

        let table = Self::from_pairs(&pairs, sieve)?;
        log::info!(
            "Loaded {} fine-labeled frames ({} distinct labels) from {}",
            table.len(),
            table.distinct_labels(),
            path.display()
        );
        Ok(table)
    }

    /// Build from `(original_frame_index, label)` pairs.
    ///
    /// Each working frame may carry only one label. Two rows that land on the
    /// same working index, directly or through the sieve, are rejected.
    pub fn from_pairs(pairs: &[(i64, FineLabel)], sieve: usize) -> Result<Self> {
        if sieve == 0 {
            return Err(HelmError::config("sieve must be a positive integer"));
        }

        let mut seen: HashMap<usize, i64> = HashMap::with_capacity(pairs.len());
        let mut entries = Vec::with_capacity(pairs.len());
        for &(original, label) in pairs {
            let index = usize::try_from(original).map_err(|_| {
                HelmError::mismatch(format!("negative frame index {} in fine labels", original))
            })?;
            let frame = index / sieve;
            if let Some(previous) = seen.insert(frame, original) {
                return Err(HelmError::mismatch(format!(
                    "frames {} and {} both map to working frame {} (sieve {}); \
                     each frame must carry exactly one fine label",
                    previous, original, frame, sieve
                )));
            }
            entries.push(LabeledFrame { frame, label });
        }

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[LabeledFrame] {
        &self.entries
    }

    /// Number of distinct fine labels
    pub fn distinct_labels(&self) -> usize {
        self.groups().len()
    }

    /// Working frame indices per fine label, in table order, built in a single pass.
    pub fn groups(&self) -> BTreeMap<FineLabel, Vec<usize>> {
        let mut groups: BTreeMap<FineLabel, Vec<usize>> = BTreeMap::new();
        for entry in &self.entries {
            groups.entry(entry.label).or_default().push(entry.frame);
        }
        groups
    }

    /// Fail if any working index lies outside a trajectory of `n_frames` frames.
    pub fn check_bounds(&self, n_frames: usize) -> Result<()> {
        if let Some(entry) = self.entries.iter().find(|e| e.frame >= n_frames) {
            return Err(HelmError::mismatch(format!(
                "fine label table references working frame {} but the trajectory has {} frames",
                entry.frame, n_frames
            )));
        }
        Ok(())
    }
}

fn parse_int(field: &str, path: &Path, row: usize) -> Result<i64> {
    field.parse::<i64>().map_err(|_| {
        HelmError::mismatch(format!(
            "{} row {}: '{}' is not an integer",
            path.display(),
            row + 1,
            field
        ))
    })
}
