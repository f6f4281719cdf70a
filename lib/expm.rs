//! Dense matrix exponential.
//!
//! Scaling-and-squaring with a degree-13 Padé approximant. The engine only
//! requires the result to be accurate to working tolerance; any general dense
//! method would do, but this one behaves well for the non-normal generators
//! produced by dissipative dynamics, where an eigendecomposition cannot be
//! relied on.

use ndarray::{ self as nd };
use ndarray_linalg::Inverse;
use num_complex::Complex64 as C64;

// numerator/denominator coefficients of the [13/13] Padé approximant to exp
const PADE13: [f64; 14] = [
    64_764_752_532_480_000.0,
    32_382_376_266_240_000.0,
    7_771_770_303_897_600.0,
    1_187_353_796_428_800.0,
    129_060_195_264_000.0,
    10_559_470_521_600.0,
    670_442_572_800.0,
    33_522_128_640.0,
    1_323_241_920.0,
    40_840_800.0,
    960_960.0,
    16_380.0,
    182.0,
    1.0,
];

// scaling threshold θ₁₃ for the [13/13] approximant
const THETA13: f64 = 5.371920351148152;

/// Compute `exp(a)` for a square complex matrix.
///
/// *Panics* if `a` is not square.
pub fn expm(a: &nd::Array2<C64>) -> nd::Array2<C64> {
    if !a.is_square() {
        panic!("expm: non-square matrix");
    }
    let n = a.shape()[0];
    if n == 0 {
        return nd::Array2::zeros((0, 0));
    }
    if n == 1 {
        return nd::array![[a[[0, 0]].exp()]];
    }
    let norm = norm_1(a);
    let s: u32
        = if norm > THETA13 {
            (norm / THETA13).log2().ceil() as u32
        } else {
            0
        };
    let scaled = a / C64::from((1u64 << s) as f64);
    let mut e = pade13(&scaled);
    for _ in 0..s {
        e = e.dot(&e);
    }
    e
}

// [13/13] Padé approximant to exp(a), accurate for ‖a‖₁ ≤ θ₁₃
fn pade13(a: &nd::Array2<C64>) -> nd::Array2<C64> {
    let n = a.shape()[0];
    let eye: nd::Array2<C64> = nd::Array2::eye(n);
    let a2 = a.dot(a);
    let a4 = a2.dot(&a2);
    let a6 = a2.dot(&a4);
    let u_inner
        = &a6 * C64::from(PADE13[13])
        + &a4 * C64::from(PADE13[11])
        + &a2 * C64::from(PADE13[9]);
    let u
        = a.dot(&(
            u_inner.dot(&a6)
            + &a6 * C64::from(PADE13[7])
            + &a4 * C64::from(PADE13[5])
            + &a2 * C64::from(PADE13[3])
            + &eye * C64::from(PADE13[1])
        ));
    let v_inner
        = &a6 * C64::from(PADE13[12])
        + &a4 * C64::from(PADE13[10])
        + &a2 * C64::from(PADE13[8]);
    let v
        = v_inner.dot(&a6)
        + &a6 * C64::from(PADE13[6])
        + &a4 * C64::from(PADE13[4])
        + &a2 * C64::from(PADE13[2])
        + &eye * C64::from(PADE13[0]);
    let denom_inv = (&v - &u).inv()
        .expect("pade13: singular Padé denominator");
    denom_inv.dot(&(&v + &u))
}

// max absolute column sum
fn norm_1(a: &nd::Array2<C64>) -> f64 {
    a.columns().into_iter()
        .map(|col| col.iter().map(|z| z.norm()).sum::<f64>())
        .fold(0.0, f64::max)
}
