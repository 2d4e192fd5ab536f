//! Trajectory loading and frame selection
//!
//! The working trajectory is a dense `(n_frames, n_atoms * 3)` array holding
//! every `sieve`-th frame of the original simulation. All frame indices used
//! inside the pipeline refer to rows of this array.

use std::path::Path;

use ndarray::{s, Array2, ArrayD, ArrayView1, Ix2, Ix3};
use ndarray_npy::ReadNpyError;

use crate::errors::{HelmError, Result};

/// Subsampled trajectory
#[derive(Debug, Clone)]
pub struct Trajectory {
    frames: Array2<f64>,
    n_atoms: usize,
    sieve: usize,
}

impl Trajectory {
    /// Load a `.npy` trajectory and keep every `sieve`-th frame.
    ///
    /// Accepts `(frames, n_atoms * 3)` or `(frames, n_atoms, 3)` arrays of
    /// `f64` or `f32`.
    pub fn load_npy(path: &Path, n_atoms: usize, sieve: usize) -> Result<Self> {
        let raw: ArrayD<f64> = match ndarray_npy::read_npy::<_, ArrayD<f64>>(path) {
            Ok(array) => array,
            Err(ReadNpyError::WrongDescriptor(_)) => {
                log::debug!("{} is not f64, retrying as f32", path.display());
                ndarray_npy::read_npy::<_, ArrayD<f32>>(path)?.mapv(f64::from)
            }
            Err(e) => return Err(e.into()),
        };

        let trajectory = Self::from_dyn(raw, n_atoms, sieve)?;
        log::info!(
            "Loaded trajectory {}: {} frames x {} atoms (sieve {})",
            path.display(),
            trajectory.n_frames(),
            n_atoms,
            sieve
        );
        Ok(trajectory)
    }

    /// Build from an in-memory array of any supported rank.
    pub fn from_dyn(raw: ArrayD<f64>, n_atoms: usize, sieve: usize) -> Result<Self> {
        let flat = match raw.ndim() {
            2 => raw
                .into_dimensionality::<Ix2>()
                .map_err(|e| HelmError::mismatch(format!("trajectory layout: {}", e)))?,
            3 => {
                let cube = raw
                    .into_dimensionality::<Ix3>()
                    .map_err(|e| HelmError::mismatch(format!("trajectory layout: {}", e)))?;
                let (n_frames, atoms, xyz) = cube.dim();
                if xyz != 3 {
                    return Err(HelmError::dimension("trajectory coordinates per atom", 3, xyz));
                }
                cube.as_standard_layout()
                    .into_owned()
                    .into_shape((n_frames, atoms * 3))
                    .map_err(|e| HelmError::mismatch(format!("trajectory layout: {}", e)))?
            }
            other => return Err(HelmError::dimension("trajectory array rank", 2, other)),
        };

        Self::from_array(flat, n_atoms, sieve)
    }

    /// Build from a `(frames, n_atoms * 3)` array, applying the stride.
    pub fn from_array(frames: Array2<f64>, n_atoms: usize, sieve: usize) -> Result<Self> {
        if sieve == 0 {
            return Err(HelmError::config("sieve must be a positive integer"));
        }
        let expected = n_atoms * 3;
        if frames.ncols() != expected {
            return Err(HelmError::dimension(
                "trajectory coordinates per frame",
                expected,
                frames.ncols(),
            ));
        }

        let frames = if sieve == 1 {
            frames
        } else {
            frames.slice(s![..;sieve, ..]).to_owned()
        };

        Ok(Self {
            frames,
            n_atoms,
            sieve,
        })
    }

    /// Number of frames in the working (subsampled) array
    pub fn n_frames(&self) -> usize {
        self.frames.nrows()
    }

    pub fn n_atoms(&self) -> usize {
        self.n_atoms
    }

    pub fn sieve(&self) -> usize {
        self.sieve
    }

    /// Coordinates of one working frame
    pub fn frame(&self, index: usize) -> Option<ArrayView1<'_, f64>> {
        (index < self.n_frames()).then(|| self.frames.row(index))
    }

    /// Gather frames in the given order into a new `(len, n_atoms * 3)` array.
    pub fn select(&self, indices: &[usize]) -> Result<Array2<f64>> {
        let mut out = Array2::zeros((indices.len(), self.frames.ncols()));
        for (row, &index) in indices.iter().enumerate() {
            let frame = self.frame(index).ok_or_else(|| {
                HelmError::mismatch(format!(
                    "frame {} outside trajectory of {} frames",
                    index,
                    self.n_frames()
                ))
            })?;
            out.row_mut(row).assign(&frame);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn ramp(n_frames: usize, n_atoms: usize) -> Array2<f64> {
        Array2::from_shape_fn((n_frames, n_atoms * 3), |(f, c)| (f * 100 + c) as f64)
    }

    #[test]
    fn test_sieve_keeps_every_nth_frame() {
        let traj = Trajectory::from_array(ramp(10, 2), 2, 3).unwrap();
        // Frames 0, 3, 6, 9
        assert_eq!(traj.n_frames(), 4);
        assert_eq!(traj.frame(1).unwrap()[0], 300.0);
        assert_eq!(traj.frame(3).unwrap()[0], 900.0);
        assert!(traj.frame(4).is_none());
    }

    #[test]
    fn test_wrong_atom_count() {
        let result = Trajectory::from_array(ramp(5, 2), 3, 1);
        assert!(matches!(
            result,
            Err(HelmError::Dimension { expected: 9, found: 6, .. })
        ));
    }

    #[test]
    fn test_three_dimensional_input() {
        let cube = Array3::from_shape_fn((4, 2, 3), |(f, a, x)| (f * 10 + a * 3 + x) as f64);
        let traj = Trajectory::from_dyn(cube.into_dyn(), 2, 1).unwrap();
        assert_eq!(traj.n_frames(), 4);
        assert_eq!(traj.frame(2).unwrap().to_vec(), vec![20.0, 21.0, 22.0, 23.0, 24.0, 25.0]);
    }

    #[test]
    fn test_select_preserves_order() {
        let traj = Trajectory::from_array(ramp(6, 1), 1, 1).unwrap();
        let picked = traj.select(&[4, 0, 2]).unwrap();
        assert_eq!(picked.nrows(), 3);
        assert_eq!(picked[[0, 0]], 400.0);
        assert_eq!(picked[[1, 0]], 0.0);
        assert_eq!(picked[[2, 0]], 200.0);

        assert!(matches!(traj.select(&[6]), Err(HelmError::DataMismatch(_))));
    }
}
