//! Uniform time grids and resampling of per-interval data.

use itertools::Itertools;
use ndarray::{ self as nd };
use num_complex::Complex64 as C64;
use crate::error::{ DynamicsError, DynamicsResult };

// relative tolerance on grid uniformity
const SPACING_TOL: f64 = 1e-9;

/// An ordered sequence of `n ≥ 2` uniformly spaced time points.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeGrid {
    t: nd::Array1<f64>,
    dt: f64,
}

impl TimeGrid {
    /// Validate a sequence of time points.
    ///
    /// Fails if fewer than two points are given, if the spacing is zero or
    /// negative, or if the spacing is not uniform.
    pub fn new(t: nd::Array1<f64>) -> DynamicsResult<Self> {
        if t.len() < 2 {
            return Err(DynamicsError::ShortTimeGrid(t.len()));
        }
        let dt = t[1] - t[0];
        if dt <= 0.0 {
            return Err(DynamicsError::NonpositiveTimeStep(dt));
        }
        for (index, (a, b)) in t.iter().tuple_windows().enumerate() {
            let step = *b - *a;
            if (step - dt).abs() > SPACING_TOL * dt.abs() {
                return Err(DynamicsError::NonuniformTimeGrid {
                    index, expected: dt, found: step,
                });
            }
        }
        Ok(Self { t, dt })
    }

    /// Build a grid of `n` points spanning `[0, total]`.
    pub fn linspace(total: f64, n: usize) -> DynamicsResult<Self> {
        Self::new(nd::Array1::linspace(0.0, total, n))
    }

    /// Number of time points.
    pub fn len(&self) -> usize { self.t.len() }

    pub fn is_empty(&self) -> bool { false }

    /// Number of grid intervals (`len() - 1`).
    pub fn num_intervals(&self) -> usize { self.t.len() - 1 }

    /// Grid spacing.
    pub fn dt(&self) -> f64 { self.dt }

    /// Final time point.
    pub fn total(&self) -> f64 { self.t[self.t.len() - 1] }

    /// The underlying time points.
    pub fn points(&self) -> &nd::Array1<f64> { &self.t }
}

/// Stretch a per-interval coefficient sequence of length `m` onto `target`
/// intervals by repeating each value `target / m` times.
///
/// If `target` is not an integer multiple of `m`, the sequence is repeated by
/// the floor factor, the remainder is zero-filled, and a diagnostic is
/// logged. Fails if the sequence is longer than `target` (there is no defined
/// policy for discarding values).
pub(crate) fn resample_coeffs(
    index: usize,
    seq: &nd::Array1<f64>,
    target: usize,
) -> DynamicsResult<Vec<f64>>
{
    let m = seq.len();
    if m == target {
        return Ok(seq.to_vec());
    }
    if m > target {
        return Err(DynamicsError::ControlSequenceTooLong {
            index, found: m, intervals: target,
        });
    }
    if m == 0 {
        return Ok(vec![0.0; target]);
    }
    let factor = target / m;
    let mut out: Vec<f64> = Vec::with_capacity(target);
    seq.iter()
        .for_each(|c| (0..factor).for_each(|_| out.push(*c)));
    if out.len() < target {
        log::warn!(
            "control sequence {} (length {}) does not divide the {} grid \
            intervals; zero-filling the remainder",
            index, m, target,
        );
        out.resize(target, 0.0);
    }
    Ok(out)
}

/// Resample a per-interval operator sequence onto `target` intervals by
/// entrywise linear interpolation over the original grid.
///
/// *Panics* if `ops` is empty.
pub(crate) fn interp_operators(ops: &[nd::Array2<C64>], target: usize)
    -> Vec<nd::Array2<C64>>
{
    if ops.is_empty() {
        panic!("interp_operators: empty operator sequence");
    }
    let m = ops.len();
    if m == target || m == 1 {
        return if m == target {
            ops.to_vec()
        } else {
            vec![ops[0].clone(); target]
        };
    }
    (0..target)
        .map(|j| {
            let x = j as f64 * (m - 1) as f64 / (target - 1).max(1) as f64;
            let k = (x.floor() as usize).min(m - 2);
            let w = x - k as f64;
            &ops[k] * C64::from(1.0 - w) + &ops[k + 1] * C64::from(w)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_degenerate_grids() {
        assert!(matches!(
            TimeGrid::new(nd::array![0.0]),
            Err(DynamicsError::ShortTimeGrid(1)),
        ));
        assert!(matches!(
            TimeGrid::new(nd::array![0.0, 0.0, 0.0]),
            Err(DynamicsError::NonpositiveTimeStep(_)),
        ));
        assert!(matches!(
            TimeGrid::new(nd::array![0.0, 1.0, 3.0]),
            Err(DynamicsError::NonuniformTimeGrid { index: 1, .. }),
        ));
    }

    #[test]
    fn linspace_grid() {
        let grid = TimeGrid::linspace(20.0, 5000).unwrap();
        assert_eq!(grid.len(), 5000);
        assert_eq!(grid.num_intervals(), 4999);
        assert!((grid.total() - 20.0).abs() < 1e-12);
        assert!((grid.dt() - 20.0 / 4999.0).abs() < 1e-12);
    }

    #[test]
    fn coeff_resampling() {
        let seq = nd::array![1.0, 2.0];
        assert_eq!(resample_coeffs(0, &seq, 4).unwrap(), vec![1.0, 1.0, 2.0, 2.0]);
        // non-divisible: floor-factor repeat plus zero fill
        assert_eq!(
            resample_coeffs(0, &seq, 5).unwrap(),
            vec![1.0, 1.0, 2.0, 2.0, 0.0],
        );
        assert!(matches!(
            resample_coeffs(0, &seq, 1),
            Err(DynamicsError::ControlSequenceTooLong { .. }),
        ));
    }

    #[test]
    fn operator_interpolation_endpoints() {
        let a = nd::Array2::from_elem((2, 2), C64::from(0.0));
        let b = nd::Array2::from_elem((2, 2), C64::from(2.0));
        let out = interp_operators(&[a.clone(), b.clone()], 3);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0][[0, 0]], C64::from(0.0));
        assert_eq!(out[1][[0, 0]], C64::from(1.0));
        assert_eq!(out[2][[0, 0]], C64::from(2.0));
    }
}
