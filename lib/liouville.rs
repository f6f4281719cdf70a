//! Construction of Liouville-space (vectorized) superoperators.
//!
//! A density matrix ρ on a *d*-dimensional Hilbert space is encoded row-major
//! as a length-*d²* vector, `vec(ρ)[d * i + j] = ρ[[i, j]]`, so that
//! `vec(A ρ B) = (A ⊗ Bᵀ) vec(ρ)`. The same convention is applied to every
//! superoperator built here; mixing conventions silently corrupts results, so
//! no other vectorization appears anywhere in this crate.

use ndarray::{ self as nd, linalg::kron };
use num_complex::Complex64 as C64;

/// Vectorize a density matrix row-major into a length-*d²* column.
pub fn vectorize(rho: &nd::Array2<C64>) -> nd::Array1<C64> {
    rho.iter().copied().collect()
}

/// Inverse of [`vectorize`].
///
/// *Panics* if `v` does not have length `dim * dim`.
pub fn unvectorize(v: &nd::Array1<C64>, dim: usize) -> nd::Array2<C64> {
    v.clone().into_shape((dim, dim))
        .expect("unvectorize: vector length is not dim^2")
}

/// Compute the commutator superoperator `L_A = A ⊗ I − I ⊗ Aᵀ`, satisfying
/// `L_A vec(ρ) = vec([A, ρ])`.
///
/// *Panics* if `a` is not square.
pub fn commutator_superop(a: &nd::Array2<C64>) -> nd::Array2<C64> {
    if !a.is_square() {
        panic!("commutator_superop: non-square operator");
    }
    let eye: nd::Array2<C64> = nd::Array2::eye(a.shape()[0]);
    kron(a, &eye) - kron(&eye, &a.t())
}

/// Compute the dissipator superoperator
/// `D = γ (Γ ⊗ Γ* − ½ (Γ†Γ) ⊗ I − ½ I ⊗ (Γ†Γ)ᵀ)`, satisfying
/// `D vec(ρ) = vec(γ (Γ ρ Γ† − ½ {Γ†Γ, ρ}))`.
///
/// *Panics* if `op` is not square.
pub fn dissipator_superop(gamma: f64, op: &nd::Array2<C64>) -> nd::Array2<C64>
{
    if !op.is_square() {
        panic!("dissipator_superop: non-square jump operator");
    }
    let eye: nd::Array2<C64> = nd::Array2::eye(op.shape()[0]);
    let conj = op.mapv(|z| z.conj());
    let gg = conj.t().dot(op); // Γ†Γ
    let mut d = kron(op, &conj);
    d -= &(kron(&gg, &eye) * C64::from(0.5));
    d -= &(kron(&eye, &gg.t()) * C64::from(0.5));
    d * C64::from(gamma)
}

/// Snap every entry with magnitude below `eps` to exact zero.
///
/// Suppresses floating-point noise in assembled dissipators before they are
/// fed to the matrix exponential; purely a cleanup step, not required for
/// correctness.
pub fn clip_small(m: &mut nd::Array2<C64>, eps: f64) {
    m.mapv_inplace(|z| if z.norm() < eps { C64::from(0.0) } else { z });
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray as nd;

    fn sigma_minus() -> nd::Array2<C64> {
        nd::array![
            [C64::from(0.0), C64::from(0.0)],
            [C64::from(1.0), C64::from(0.0)],
        ]
    }

    fn test_rho() -> nd::Array2<C64> {
        nd::array![
            [C64::new(0.6, 0.0), C64::new(0.1, 0.2)],
            [C64::new(0.1, -0.2), C64::new(0.4, 0.0)],
        ]
    }

    fn mat_close(a: &nd::Array2<C64>, b: &nd::Array2<C64>, tol: f64) -> bool {
        a.shape() == b.shape()
            && a.iter().zip(b).all(|(x, y)| (x - y).norm() < tol)
    }

    #[test]
    fn vectorize_round_trip() {
        let rho = test_rho();
        let v = vectorize(&rho);
        assert_eq!(v[1], rho[[0, 1]]);
        assert!(mat_close(&unvectorize(&v, 2), &rho, 1e-15));
    }

    #[test]
    fn commutator_superop_action() {
        let a = nd::array![
            [C64::from(1.0), C64::new(0.0, 0.5)],
            [C64::new(0.0, -0.5), C64::from(-1.0)],
        ];
        let rho = test_rho();
        let direct = a.dot(&rho) - rho.dot(&a);
        let acted = unvectorize(
            &commutator_superop(&a).dot(&vectorize(&rho)), 2);
        assert!(mat_close(&acted, &direct, 1e-14));
    }

    #[test]
    fn dissipator_superop_action() {
        let g = sigma_minus();
        let gamma = 0.3;
        let rho = test_rho();
        let gdag = g.t().mapv(|z| z.conj());
        let gg = gdag.dot(&g);
        let direct = (g.dot(&rho).dot(&gdag)
            - (gg.dot(&rho) + rho.dot(&gg)) * C64::from(0.5))
            * C64::from(gamma);
        let acted = unvectorize(
            &dissipator_superop(gamma, &g).dot(&vectorize(&rho)), 2);
        assert!(mat_close(&acted, &direct, 1e-14));
    }

    #[test]
    fn dissipator_preserves_trace() {
        // the columns of a dissipator applied to any ρ must be traceless:
        // tr(D vec(ρ)) = 0 for the row-major convention means the sum of the
        // (d * k + k)-th rows vanishes
        let d = dissipator_superop(0.7, &sigma_minus());
        for col in 0..4 {
            let tr: C64 = (0..2).map(|k| d[[2 * k + k, col]]).sum();
            assert!(tr.norm() < 1e-14);
        }
    }

    #[test]
    fn clip_small_zeroes_noise() {
        let mut m = nd::array![
            [C64::from(1.0), C64::new(1e-12, -1e-12)],
            [C64::from(1e-11), C64::from(-2.0)],
        ];
        clip_small(&mut m, 1e-10);
        assert_eq!(m[[0, 1]], C64::from(0.0));
        assert_eq!(m[[1, 0]], C64::from(0.0));
        assert_eq!(m[[0, 0]], C64::from(1.0));
        assert_eq!(m[[1, 1]], C64::from(-2.0));
    }
}
