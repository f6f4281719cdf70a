//! Closed-form evolution through an operator-sum (Kraus) channel.
//!
//! The non-time-stepped counterpart to [`crate::lindblad`]: the evolved state
//! `ρ = Σ_i K_i ρ0 K_i†` and its parameter derivatives
//! `∂ρ/∂θ_k = Σ_i (dK_i ρ0 K_i† + K_i ρ0 dK_i†)` come from a single
//! evaluation, with no time grid and no propagator cache.

use ndarray::{ self as nd };
use num_complex::Complex64 as C64;
use num_traits::{ One, Zero };
use crate::error::{ DynamicsError, DynamicsResult };

/// A validated set of Kraus operators with their parameter derivatives.
#[derive(Clone, Debug)]
pub struct KrausChannel {
    ops: Vec<nd::Array2<C64>>,
    // dops[k][i] = ∂K_i/∂θ_k
    dops: Vec<Vec<nd::Array2<C64>>>,
    dim: usize,
}

impl KrausChannel {
    /// Validate a Kraus operator set.
    ///
    /// All operators must be square with a common dimension, and `dops` must
    /// hold, for each unknown parameter, one derivative operator per Kraus
    /// operator.
    pub fn new(
        ops: Vec<nd::Array2<C64>>,
        dops: Vec<Vec<nd::Array2<C64>>>,
    ) -> DynamicsResult<Self>
    {
        let first = ops.first().ok_or(DynamicsError::EmptyKrausSet)?;
        if !first.is_square() {
            return Err(DynamicsError::NonSquareOperator {
                rows: first.shape()[0], cols: first.shape()[1],
            });
        }
        let dim = first.shape()[0];
        let all = ops.iter()
            .chain(dops.iter().flatten());
        for op in all {
            if !op.is_square() {
                return Err(DynamicsError::NonSquareOperator {
                    rows: op.shape()[0], cols: op.shape()[1],
                });
            }
            if op.shape()[0] != dim {
                return Err(DynamicsError::DimensionMismatch {
                    expected: dim, found: op.shape()[0],
                });
            }
        }
        for (param, dk) in dops.iter().enumerate() {
            if dk.len() != ops.len() {
                return Err(DynamicsError::KrausShapeMismatch {
                    param, expected: ops.len(), found: dk.len(),
                });
            }
        }
        Ok(Self { ops, dops, dim })
    }

    /// Hilbert-space dimension.
    pub fn dim(&self) -> usize { self.dim }

    /// Number of Kraus operators.
    pub fn num_operators(&self) -> usize { self.ops.len() }

    /// Number of unknown parameters.
    pub fn param_count(&self) -> usize { self.dops.len() }

    /// Whether `Σ_i K_i† K_i = I` holds to within `tol` (entrywise), i.e.
    /// whether the channel is trace-preserving.
    pub fn is_trace_preserving(&self, tol: f64) -> bool {
        let mut acc: nd::Array2<C64> = nd::Array2::zeros((self.dim, self.dim));
        for k in self.ops.iter() {
            acc += &k.t().mapv(|z| z.conj()).dot(k);
        }
        acc.indexed_iter()
            .all(|((i, j), z)| {
                let target = if i == j { C64::one() } else { C64::zero() };
                (z - target).norm() < tol
            })
    }

    /// Evolve a state through the channel: `Σ_i K_i ρ0 K_i†`.
    ///
    /// *Panics* if `rho0` does not match the channel dimension.
    pub fn evolve(&self, rho0: &nd::Array2<C64>) -> nd::Array2<C64> {
        if rho0.shape() != [self.dim, self.dim] {
            panic!("KrausChannel::evolve: state dimension mismatch");
        }
        let mut rho: nd::Array2<C64> = nd::Array2::zeros((self.dim, self.dim));
        for k in self.ops.iter() {
            rho += &k.dot(rho0).dot(&k.t().mapv(|z| z.conj()));
        }
        rho
    }

    /// Evolve a state and compute its derivative with respect to every
    /// unknown parameter: `∂ρ/∂θ_k = Σ_i (dK_i ρ0 K_i† + K_i ρ0 dK_i†)`.
    ///
    /// *Panics* if `rho0` does not match the channel dimension.
    pub fn evolve_with_derivatives(&self, rho0: &nd::Array2<C64>)
        -> (nd::Array2<C64>, Vec<nd::Array2<C64>>)
    {
        let rho = self.evolve(rho0);
        let drho: Vec<nd::Array2<C64>>
            = self.dops.iter()
            .map(|dk| {
                let mut d: nd::Array2<C64>
                    = nd::Array2::zeros((self.dim, self.dim));
                for (k, dki) in self.ops.iter().zip(dk) {
                    let kdag = k.t().mapv(|z| z.conj());
                    let dkdag = dki.t().mapv(|z| z.conj());
                    d += &dki.dot(rho0).dot(&kdag);
                    d += &k.dot(rho0).dot(&dkdag);
                }
                d
            })
            .collect();
        (rho, drho)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phase_damping(p: f64) -> Vec<nd::Array2<C64>> {
        vec![
            nd::array![
                [C64::from(1.0), C64::from(0.0)],
                [C64::from(0.0), C64::from((1.0 - p).sqrt())],
            ],
            nd::array![
                [C64::from(0.0), C64::from(0.0)],
                [C64::from(0.0), C64::from(p.sqrt())],
            ],
        ]
    }

    #[test]
    fn valid_channel_is_trace_preserving() {
        let ch = KrausChannel::new(phase_damping(0.3), Vec::new()).unwrap();
        assert!(ch.is_trace_preserving(1e-12));
    }

    #[test]
    fn evolution_damps_coherences() {
        let p = 0.3;
        let ch = KrausChannel::new(phase_damping(p), Vec::new()).unwrap();
        let rho0 = nd::Array2::from_elem((2, 2), C64::from(0.5));
        let rho = ch.evolve(&rho0);
        let tr: C64 = rho.diag().iter().sum();
        assert!((tr - C64::from(1.0)).norm() < 1e-12);
        assert!((rho[[0, 1]] - C64::from(0.5 * (1.0 - p).sqrt())).norm() < 1e-12);
    }

    #[test]
    fn shape_validation() {
        assert!(matches!(
            KrausChannel::new(Vec::new(), Vec::new()),
            Err(DynamicsError::EmptyKrausSet),
        ));
        let ops = phase_damping(0.1);
        let short = vec![vec![nd::Array2::zeros((2, 2))]];
        assert!(matches!(
            KrausChannel::new(ops.clone(), short),
            Err(DynamicsError::KrausShapeMismatch { param: 0, .. }),
        ));
        let wrong_dim = vec![vec![
            nd::Array2::zeros((3, 3)), nd::Array2::zeros((3, 3)),
        ]];
        assert!(matches!(
            KrausChannel::new(ops, wrong_dim),
            Err(DynamicsError::DimensionMismatch { expected: 2, found: 3 }),
        ));
    }
}
