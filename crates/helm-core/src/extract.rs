//! Representative frame extraction
//!
//! Every representative set starts with the cluster medoid. The rest is
//! either the frames closest to the medoid (`top`) or a uniform sample
//! without replacement (`random`). All indices are member-local.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use ndarray::ArrayView2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::errors::{HelmError, Result};
use crate::oracle::Dissimilarity;

/// How representatives beyond the medoid are chosen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ExtractPolicy {
    /// Frames ranked by dissimilarity to the medoid
    #[default]
    Top,
    /// Medoid plus a uniform sample of the other members
    Random,
}

impl ExtractPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractPolicy::Top => "top",
            ExtractPolicy::Random => "random",
        }
    }
}

impl fmt::Display for ExtractPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExtractPolicy {
    type Err = HelmError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top" => Ok(ExtractPolicy::Top),
            "random" => Ok(ExtractPolicy::Random),
            other => Err(HelmError::config(format!(
                "unknown extract type '{}' (expected top or random)",
                other
            ))),
        }
    }
}

impl TryFrom<String> for ExtractPolicy {
    type Error = HelmError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ExtractPolicy> for String {
    fn from(policy: ExtractPolicy) -> Self {
        policy.as_str().to_string()
    }
}

/// Extract up to `n_structures` representatives, medoid first.
///
/// `n_structures` is clamped to the cluster population locally; the caller's
/// budget is never modified, so a small cluster cannot shrink the count used
/// for the next one.
pub fn extract_representatives<R: Rng + ?Sized>(
    oracle: &dyn Dissimilarity,
    frames: ArrayView2<'_, f64>,
    medoid: usize,
    n_structures: usize,
    policy: ExtractPolicy,
    rng: &mut R,
) -> Result<Vec<usize>> {
    let population = frames.nrows();
    if medoid >= population {
        return Err(HelmError::mismatch(format!(
            "medoid index {} outside cluster of {} frames",
            medoid, population
        )));
    }

    let budget = n_structures.min(population);
    if budget == 0 {
        return Ok(Vec::new());
    }

    let selected = match policy {
        ExtractPolicy::Top => closest_to_medoid(oracle, frames, medoid, budget),
        ExtractPolicy::Random => sample_around_medoid(population, medoid, budget, rng),
    };

    log::debug!(
        "Extracted {} of {} requested representatives ({} members, policy {})",
        selected.len(),
        n_structures,
        population,
        policy
    );

    Ok(selected)
}

/// Rank all members by dissimilarity to the medoid and keep the first `budget`.
///
/// Ties keep member order, except that the medoid always leads: a duplicate
/// of the medoid frame at a lower index would otherwise sort ahead of it.
fn closest_to_medoid(
    oracle: &dyn Dissimilarity,
    frames: ArrayView2<'_, f64>,
    medoid: usize,
    budget: usize,
) -> Vec<usize> {
    let medoid_frame = frames.row(medoid);
    let mut scored: Vec<(usize, f64)> = frames
        .outer_iter()
        .enumerate()
        .map(|(j, frame)| (j, oracle.pairwise(frame, medoid_frame)))
        .collect();

    scored.sort_by(|a, b| {
        (a.0 != medoid)
            .cmp(&(b.0 != medoid))
            .then_with(|| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
    });

    scored.into_iter().take(budget).map(|(j, _)| j).collect()
}

/// Medoid followed by `budget - 1` distinct non-medoid members.
fn sample_around_medoid<R: Rng + ?Sized>(
    population: usize,
    medoid: usize,
    budget: usize,
    rng: &mut R,
) -> Vec<usize> {
    let mut selected = Vec::with_capacity(budget);
    selected.push(medoid);

    // Sample over the population with the medoid removed, then shift
    // indices at or past the medoid back into member numbering.
    let others = rand::seq::index::sample(rng, population - 1, budget - 1);
    selected.extend(
        others
            .into_iter()
            .map(|j| if j >= medoid { j + 1 } else { j }),
    );
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::MeanSquareDeviation;
    use ndarray::Array2;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn line_frames(xs: &[f64]) -> Array2<f64> {
        let mut frames = Array2::zeros((xs.len(), 3));
        for (i, &x) in xs.iter().enumerate() {
            frames[[i, 0]] = x;
        }
        frames
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("top".parse::<ExtractPolicy>().unwrap(), ExtractPolicy::Top);
        assert_eq!("RANDOM".parse::<ExtractPolicy>().unwrap(), ExtractPolicy::Random);
        assert!("nearest".parse::<ExtractPolicy>().is_err());
    }

    #[test]
    fn test_top_orders_by_distance_to_medoid() {
        let oracle = MeanSquareDeviation::new(1);
        let frames = line_frames(&[9.0, 2.0, 3.0, 0.0, 2.5]);
        let mut rng = StdRng::seed_from_u64(0);

        let reps =
            extract_representatives(&oracle, frames.view(), 2, 4, ExtractPolicy::Top, &mut rng)
                .unwrap();
        assert_eq!(reps, vec![2, 4, 1, 3]);
    }

    #[test]
    fn test_top_single_structure_is_medoid() {
        let oracle = MeanSquareDeviation::new(1);
        let frames = line_frames(&[1.0, 2.0, 3.0]);
        let mut rng = StdRng::seed_from_u64(0);

        let reps =
            extract_representatives(&oracle, frames.view(), 1, 1, ExtractPolicy::Top, &mut rng)
                .unwrap();
        assert_eq!(reps, vec![1]);
    }

    #[test]
    fn test_top_medoid_leads_over_duplicate_frame() {
        let oracle = MeanSquareDeviation::new(1);
        let frames = line_frames(&[4.0, 1.0, 4.0]);
        let mut rng = StdRng::seed_from_u64(0);

        let reps =
            extract_representatives(&oracle, frames.view(), 2, 3, ExtractPolicy::Top, &mut rng)
                .unwrap();
        assert_eq!(reps, vec![2, 0, 1]);
    }

    #[test]
    fn test_random_clamps_to_population() {
        let oracle = MeanSquareDeviation::new(1);
        let frames = line_frames(&[1.0, 2.0, 3.0]);
        let mut rng = StdRng::seed_from_u64(7);

        let reps = extract_representatives(
            &oracle,
            frames.view(),
            1,
            5,
            ExtractPolicy::Random,
            &mut rng,
        )
        .unwrap();

        assert_eq!(reps.len(), 3);
        assert_eq!(reps[0], 1);
        let unique: HashSet<usize> = reps.iter().copied().collect();
        assert_eq!(unique, HashSet::from([0, 1, 2]));
    }

    #[test]
    fn test_random_never_duplicates() {
        let oracle = MeanSquareDeviation::new(1);
        let xs: Vec<f64> = (0..40).map(|i| i as f64).collect();
        let frames = line_frames(&xs);

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let reps = extract_representatives(
                &oracle,
                frames.view(),
                17,
                11,
                ExtractPolicy::Random,
                &mut rng,
            )
            .unwrap();
            assert_eq!(reps.len(), 11);
            assert_eq!(reps[0], 17);
            let unique: HashSet<usize> = reps.iter().copied().collect();
            assert_eq!(unique.len(), 11);
            assert!(reps.iter().all(|&j| j < 40));
        }
    }

    #[test]
    fn test_random_is_reproducible_with_seed() {
        let oracle = MeanSquareDeviation::new(1);
        let xs: Vec<f64> = (0..25).map(|i| i as f64).collect();
        let frames = line_frames(&xs);

        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            extract_representatives(&oracle, frames.view(), 3, 6, ExtractPolicy::Random, &mut rng)
                .unwrap()
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn test_medoid_out_of_range() {
        let oracle = MeanSquareDeviation::new(1);
        let frames = line_frames(&[1.0, 2.0]);
        let mut rng = StdRng::seed_from_u64(0);
        let result =
            extract_representatives(&oracle, frames.view(), 2, 1, ExtractPolicy::Top, &mut rng);
        assert!(matches!(result, Err(HelmError::DataMismatch(_))));
    }
}
