//! Default probe-state policy.
//!
//! When no initial state is supplied, the engine draws a reproducible pure
//! state from a fixed seed: amplitudes from a uniform point on the unit
//! hypersphere, with an independent uniform phase per basis component.

use ndarray::{ self as nd };
use num_complex::Complex64 as C64;
use rand::{ Rng, SeedableRng, rngs::StdRng };
use std::f64::consts::TAU;

/// Draw the default probe state vector for a `dim`-dimensional system.
pub fn random_probe_state(dim: usize, seed: u64) -> nd::Array1<C64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let r: Vec<f64> = (0..dim).map(|_| 2.0 * rng.gen::<f64>() - 1.0).collect();
    let norm: f64 = r.iter().map(|x| x * x).sum::<f64>().sqrt();
    let phi: Vec<f64> = (0..dim).map(|_| TAU * rng.gen::<f64>()).collect();
    r.iter().zip(&phi)
        .map(|(ri, pi)| C64::from_polar(ri / norm, *pi))
        .collect()
}

/// The default probe state as a density matrix, `ρ0 = ψψ†`.
pub fn random_probe_density(dim: usize, seed: u64) -> nd::Array2<C64> {
    let psi = random_probe_state(dim, seed);
    let mut rho: nd::Array2<C64> = nd::Array2::zeros((dim, dim));
    for (i, a) in psi.iter().enumerate() {
        for (j, b) in psi.iter().enumerate() {
            rho[[i, j]] = a * b.conj();
        }
    }
    rho
}
