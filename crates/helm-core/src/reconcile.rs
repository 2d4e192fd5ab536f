//! Label reconciliation
//!
//! Combines the per-frame fine labels with the coarse merge plan into one
//! membership list per coarse cluster. Members of a coarse cluster are the
//! frame groups of its fine labels, concatenated in the order the plan lists
//! those labels; within a group, frames keep table order. Member order is
//! what member-local indices refer to later on.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::{HelmError, Result};
use crate::labels::{FineLabel, FineLabelTable};
use crate::plan::CoarseEntry;

/// Frame membership per coarse cluster, indexed by plan position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reconciliation {
    /// Working frame indices of each coarse cluster, in plan order
    pub members: Vec<Vec<usize>>,
    /// Frames placed in some coarse cluster
    pub assigned_frames: usize,
    /// Frames whose fine label no coarse cluster claims
    pub dropped_frames: usize,
    /// Fine labels no coarse cluster claims, ascending
    pub unreferenced_labels: Vec<FineLabel>,
}

impl Reconciliation {
    /// Members of coarse cluster `coarse_id`
    pub fn members_of(&self, coarse_id: usize) -> &[usize] {
        self.members
            .get(coarse_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Build coarse cluster membership from fine labels and the plan entries for one K.
///
/// Errors when a fine label is claimed by two coarse clusters, or when the
/// declared populations do not add up to the number of frames assigned.
pub fn reconcile(table: &FineLabelTable, entries: &[CoarseEntry]) -> Result<Reconciliation> {
    let groups = table.groups();

    let mut claimed: HashMap<FineLabel, usize> = HashMap::new();
    let mut members = Vec::with_capacity(entries.len());

    for (coarse_id, entry) in entries.iter().enumerate() {
        let mut frames = Vec::new();
        for &label in &entry.fine_labels {
            if let Some(previous) = claimed.insert(label, coarse_id) {
                return Err(HelmError::mismatch(format!(
                    "fine label {} is claimed by coarse clusters {} and {}",
                    label, previous, coarse_id
                )));
            }
            match groups.get(&label) {
                Some(group) => frames.extend_from_slice(group),
                None => log::warn!(
                    "Coarse cluster {} references fine label {} which labels no frames",
                    coarse_id,
                    label
                ),
            }
        }

        if frames.len() != entry.population {
            log::warn!(
                "Coarse cluster {} declares {} frames but {} were assigned",
                coarse_id,
                entry.population,
                frames.len()
            );
        }
        members.push(frames);
    }

    let mut dropped_frames = 0;
    let mut unreferenced_labels = Vec::new();
    for (label, group) in &groups {
        if !claimed.contains_key(label) {
            dropped_frames += group.len();
            unreferenced_labels.push(*label);
        }
    }
    if dropped_frames > 0 {
        log::warn!(
            "Dropping {} frame(s) whose fine labels {:?} are not in any coarse cluster",
            dropped_frames,
            unreferenced_labels
        );
    }

    let assigned_frames: usize = members.iter().map(Vec::len).sum();
    let declared: usize = entries.iter().map(|e| e.population).sum();
    if declared != assigned_frames {
        return Err(HelmError::mismatch(format!(
            "merge plan populations sum to {} but {} fine-labeled frames were assigned \
             ({} labeled, {} dropped)",
            declared,
            assigned_frames,
            table.len(),
            dropped_frames
        )));
    }

    log::info!(
        "Reconciled {} frames into {} coarse clusters",
        assigned_frames,
        members.len()
    );

    Ok(Reconciliation {
        members,
        assigned_frames,
        dropped_frames,
        unreferenced_labels,
    })
}
