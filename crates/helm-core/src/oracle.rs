//! Structural dissimilarity oracle
//!
//! Frames are flat coordinate rows `[x0, y0, z0, x1, y1, z1, ...]`. No
//! superposition is performed: frames are assumed to be pre-aligned.
//!
//! Two metrics are provided:
//! - **MSD**: n-ary mean square deviation computed from column sums, so a
//!   whole cluster can be scored in one pass. The medoid is the member whose
//!   removal leaves the rest of the cluster most spread out.
//! - **RMSD**: pairwise root mean square deviation with an exhaustive
//!   sum-of-distances medoid.

use std::fmt;
use std::str::FromStr;

use ndarray::{ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::errors::HelmError;

/// Dissimilarity metric identifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Metric {
    /// Mean square deviation per atom
    #[default]
    Msd,
    /// Root mean square deviation per atom
    Rmsd,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Msd => "MSD",
            Metric::Rmsd => "RMSD",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = HelmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MSD" => Ok(Metric::Msd),
            "RMSD" => Ok(Metric::Rmsd),
            other => Err(HelmError::config(format!(
                "unknown metric '{}' (expected MSD or RMSD)",
                other
            ))),
        }
    }
}

impl TryFrom<String> for Metric {
    type Error = HelmError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Metric> for String {
    fn from(metric: Metric) -> Self {
        metric.as_str().to_string()
    }
}

/// Pairwise and multiway structural comparison.
///
/// Implementations must be pure: the per-cluster loop may call them from
/// several threads on disjoint frame sets.
pub trait Dissimilarity: Send + Sync {
    /// Metric this oracle implements
    fn metric(&self) -> Metric;

    /// Dissimilarity between two frames
    fn pairwise(&self, a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64;

    /// Row index of the most central frame, `None` for an empty set
    fn medoid(&self, frames: ArrayView2<'_, f64>) -> Option<usize>;
}

/// Build the oracle for a metric identifier
pub fn oracle_for(metric: Metric, n_atoms: usize) -> Box<dyn Dissimilarity> {
    match metric {
        Metric::Msd => Box::new(MeanSquareDeviation::new(n_atoms)),
        Metric::Rmsd => Box::new(RootMeanSquareDeviation::new(n_atoms)),
    }
}

/// n-ary mean square deviation
#[derive(Debug, Clone, Copy)]
pub struct MeanSquareDeviation {
    n_atoms: usize,
}

impl MeanSquareDeviation {
    pub fn new(n_atoms: usize) -> Self {
        Self { n_atoms: n_atoms.max(1) }
    }

    /// MSD of a set of `n` frames given only its column sums and squared
    /// column sums.
    ///
    /// MSD = sum_k 2 * (N * sq_sum_k - c_sum_k^2) / N^2 / n_atoms
    ///
    /// This is the mean over all ordered pairs (i, j) of the squared
    /// distance between frames i and j, normalised per atom.
    pub fn condensed(&self, c_sum: ArrayView1<'_, f64>, sq_sum: ArrayView1<'_, f64>, n: usize) -> f64 {
        if n == 0 {
            return 0.0;
        }
        let n = n as f64;
        let total: f64 = c_sum
            .iter()
            .zip(sq_sum.iter())
            .map(|(&c, &sq)| 2.0 * (n * sq - c * c))
            .sum();
        total / (n * n) / self.n_atoms as f64
    }

}

impl Dissimilarity for MeanSquareDeviation {
    fn metric(&self) -> Metric {
        Metric::Msd
    }

    /// The two-frame case of [`condensed`](Self::condensed), which reduces
    /// to half the summed squared coordinate difference per atom.
    fn pairwise(&self, a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
        let sum_sq: f64 = a
            .iter()
            .zip(b.iter())
            .map(|(&x, &y)| (x - y) * (x - y))
            .sum();
        sum_sq / 2.0 / self.n_atoms as f64
    }

    fn medoid(&self, frames: ArrayView2<'_, f64>) -> Option<usize> {
        let n = frames.nrows();
        match n {
            0 => None,
            1 | 2 => Some(0),
            _ => {
                let c_sum = frames.sum_axis(Axis(0));
                let sq_sum = frames.mapv(|x| x * x).sum_axis(Axis(0));

                // Complementary MSD: score of the set with frame i left out.
                let mut best_idx = 0;
                let mut best_score = f64::NEG_INFINITY;
                for (i, row) in frames.outer_iter().enumerate() {
                    let comp_c = &c_sum - &row;
                    let comp_sq = &sq_sum - &row.mapv(|x| x * x);
                    let score = self.condensed(comp_c.view(), comp_sq.view(), n - 1);
                    if score > best_score {
                        best_score = score;
                        best_idx = i;
                    }
                }
                Some(best_idx)
            }
        }
    }
}

/// Pairwise root mean square deviation
#[derive(Debug, Clone, Copy)]
pub struct RootMeanSquareDeviation {
    msd: MeanSquareDeviation,
}

impl RootMeanSquareDeviation {
    pub fn new(n_atoms: usize) -> Self {
        Self {
            msd: MeanSquareDeviation::new(n_atoms),
        }
    }
}

impl Dissimilarity for RootMeanSquareDeviation {
    fn metric(&self) -> Metric {
        Metric::Rmsd
    }

    fn pairwise(&self, a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
        self.msd.pairwise(a, b).sqrt()
    }

    fn medoid(&self, frames: ArrayView2<'_, f64>) -> Option<usize> {
        let n = frames.nrows();
        if n == 0 {
            return None;
        }

        let mut totals = vec![0.0f64; n];
        for i in 0..n {
            for j in (i + 1)..n {
                let d = self.pairwise(frames.row(i), frames.row(j));
                totals[i] += d;
                totals[j] += d;
            }
        }

        let mut best_idx = 0;
        for (i, &total) in totals.iter().enumerate() {
            if total < totals[best_idx] {
                best_idx = i;
            }
        }
        Some(best_idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    /// Single-atom frames placed along x
    fn line_frames(xs: &[f64]) -> Array2<f64> {
        let mut frames = Array2::zeros((xs.len(), 3));
        for (i, &x) in xs.iter().enumerate() {
            frames[[i, 0]] = x;
        }
        frames
    }

    #[test]
    fn test_metric_parse() {
        assert_eq!("MSD".parse::<Metric>().unwrap(), Metric::Msd);
        assert_eq!("rmsd".parse::<Metric>().unwrap(), Metric::Rmsd);
        assert!(matches!(
            "JT".parse::<Metric>(),
            Err(HelmError::Configuration(_))
        ));
    }

    #[test]
    fn test_pairwise_msd() {
        let msd = MeanSquareDeviation::new(2);
        let a = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let b = array![1.0, 0.0, 0.0, 2.0, 1.0, 1.0];
        // Each atom moved by 1 Å: (1 + 1) / 2 / 2 atoms
        assert!((msd.pairwise(a.view(), b.view()) - 0.5).abs() < 1e-12);
        assert!(msd.pairwise(a.view(), a.view()).abs() < 1e-12);
    }

    #[test]
    fn test_condensed_msd_matches_pairwise_for_two_frames() {
        let msd = MeanSquareDeviation::new(1);
        let frames = line_frames(&[1.0, 4.0]);
        let c_sum = frames.sum_axis(Axis(0));
        let sq_sum = frames.mapv(|x| x * x).sum_axis(Axis(0));

        let condensed = msd.condensed(c_sum.view(), sq_sum.view(), 2);
        let pairwise = msd.pairwise(frames.row(0), frames.row(1));
        assert!((condensed - 4.5).abs() < 1e-9);
        assert!((condensed - pairwise).abs() < 1e-9);
    }

    #[test]
    fn test_pairwise_msd_scales_per_atom() {
        let msd = MeanSquareDeviation::new(2);
        let frames = array![
            [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            [3.0, 0.0, 0.0, 0.0, 4.0, 0.0]
        ];
        let c_sum = frames.sum_axis(Axis(0));
        let sq_sum = frames.mapv(|x| x * x).sum_axis(Axis(0));

        // (9 + 16) / 2 / 2 atoms
        assert!((msd.pairwise(frames.row(0), frames.row(1)) - 6.25).abs() < 1e-12);
        assert!((msd.condensed(c_sum.view(), sq_sum.view(), 2) - 6.25).abs() < 1e-12);
    }

    #[test]
    fn test_msd_medoid_is_central_frame() {
        let msd = MeanSquareDeviation::new(1);
        // Mean is 3.2, frame at 3.0 minimises the summed squared distance
        let frames = line_frames(&[0.0, 1.0, 2.0, 3.0, 10.0]);
        assert_eq!(msd.medoid(frames.view()), Some(3));
    }

    #[test]
    fn test_msd_medoid_matches_brute_force() {
        let msd = MeanSquareDeviation::new(1);
        let frames = line_frames(&[5.0, -2.0, 0.5, 7.5, 1.0, 2.2]);

        let brute = (0..frames.nrows())
            .map(|i| {
                let total: f64 = (0..frames.nrows())
                    .map(|j| msd.pairwise(frames.row(i), frames.row(j)))
                    .sum();
                (i, total)
            })
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
            .map(|(i, _)| i);

        assert_eq!(msd.medoid(frames.view()), brute);
    }

    #[test]
    fn test_medoid_small_sets() {
        let msd = MeanSquareDeviation::new(1);
        assert_eq!(msd.medoid(Array2::<f64>::zeros((0, 3)).view()), None);
        assert_eq!(msd.medoid(line_frames(&[4.0]).view()), Some(0));
        assert_eq!(msd.medoid(line_frames(&[4.0, 9.0]).view()), Some(0));
    }

    #[test]
    fn test_rmsd_medoid() {
        let rmsd = RootMeanSquareDeviation::new(1);
        let frames = line_frames(&[10.0, 0.0, 1.0, 2.0]);
        // Sum of |x - y|: 10 -> 27, 0 -> 13, 1 -> 11, 2 -> 11; first wins
        assert_eq!(rmsd.medoid(frames.view()), Some(2));
        // sqrt(100 / 2)
        assert!((rmsd.pairwise(frames.row(0), frames.row(1)) - 50.0f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_oracle_for() {
        assert_eq!(oracle_for(Metric::Msd, 10).metric(), Metric::Msd);
        assert_eq!(oracle_for(Metric::Rmsd, 10).metric(), Metric::Rmsd);
    }
}
