//! Finite-time propagators between grid indices.
//!
//! [`PropagatorCache::step`] is the atomic building block: the one-interval
//! propagator `exp(dt 𝓛(t_j))`. [`PropagatorCache::range`] composes steps by
//! explicit matrix multiplication; the generator is in general non-commuting
//! across time steps, so summed generators must never be exponentiated
//! together.
//!
//! With range caching enabled (required by the derivative recursion), every
//! `(a, b)` pair ever composed is kept in an arena. For an `n`-point grid on
//! a `d`-dimensional system this is the engine's dominant cost: O(n²)
//! matrices of size d² × d². Callers that only need the state trajectory
//! should construct the cache with caching disabled
//! ([`crate::lindblad::Lindblad::run_states`] does this), which keeps only
//! the O(n) one-step propagators.

use ndarray::{ self as nd };
use num_complex::Complex64 as C64;
use crate::{ expm::expm, generator::GeneratorAssembler };

/// Lazily computed one-interval propagators and their compositions for one
/// trajectory computation.
///
/// Entries are computed at most once; once present they are immutable, so
/// shared reads (e.g. parallel per-parameter derivative reductions) are safe
/// after the cache has been populated.
#[derive(Clone, Debug)]
pub struct PropagatorCache<'a> {
    assembler: &'a GeneratorAssembler,
    dt: f64,
    n_steps: usize,
    steps: Vec<Option<nd::Array2<C64>>>,
    ranges: Option<Vec<Option<nd::Array2<C64>>>>,
}

impl<'a> PropagatorCache<'a> {
    /// Create an empty cache over `n_steps` grid intervals of width `dt`.
    ///
    /// `cache_ranges` controls whether composed ranges are kept; disable it
    /// for state-only trajectories to avoid the O(n²) arena.
    pub fn new(
        assembler: &'a GeneratorAssembler,
        dt: f64,
        n_steps: usize,
        cache_ranges: bool,
    ) -> Self
    {
        Self {
            assembler,
            dt,
            n_steps,
            steps: vec![None; n_steps],
            ranges: cache_ranges
                .then(|| vec![None; n_steps * n_steps]),
        }
    }

    /// Whether composed ranges are being cached.
    pub fn caches_ranges(&self) -> bool { self.ranges.is_some() }

    /// Number of grid intervals covered.
    pub fn num_steps(&self) -> usize { self.n_steps }

    fn arena_idx(&self, a: usize, b: usize) -> usize {
        a * self.n_steps + b
    }

    /// The one-interval propagator `exp(dt 𝓛(t_j))`.
    ///
    /// *Panics* if `j` is not a valid interval index.
    pub fn step(&mut self, j: usize) -> &nd::Array2<C64> {
        if j >= self.n_steps {
            panic!("PropagatorCache::step: \
                time index {} out of range ({} intervals)", j, self.n_steps);
        }
        if self.steps[j].is_none() {
            let u = expm(&(self.assembler.generator(j) * C64::from(self.dt)));
            self.steps[j] = Some(u);
        }
        self.steps[j].as_ref().expect("PropagatorCache::step: just filled")
    }

    /// The composed propagator `step(b) · step(b−1) · … · step(a)` advancing
    /// a vectorized state across intervals `a..=b`.
    ///
    /// Degenerate cases: the identity for `a > b`, `step(a)` for `a == b`.
    /// Composition obeys `range(a, c) == range(b + 1, c) · range(a, b)` for
    /// `a ≤ b < c`.
    ///
    /// *Panics* if `b` is a valid index but out of range.
    pub fn range(&mut self, a: usize, b: usize) -> nd::Array2<C64> {
        let d2 = self.assembler.dim().pow(2);
        if a > b {
            return nd::Array2::eye(d2);
        }
        if a == b {
            return self.step(a).clone();
        }
        if let Some(arena) = &self.ranges {
            if let Some(hit) = &arena[self.arena_idx(a, b)] {
                return hit.clone();
            }
        }
        // walk down from b, extending the longest cached suffix one step at
        // a time
        let mut k = b;
        let mut acc: nd::Array2<C64> = 'suffix: {
            if let Some(arena) = &self.ranges {
                for s in (a + 1)..b {
                    if let Some(hit) = &arena[self.arena_idx(s, b)] {
                        k = s;
                        break 'suffix hit.clone();
                    }
                }
            }
            self.step(b).clone()
        };
        while k > a {
            k -= 1;
            acc = acc.dot(self.step(k));
            if let Some(arena) = &mut self.ranges {
                let idx = k * self.n_steps + b;
                if arena[idx].is_none() {
                    arena[idx] = Some(acc.clone());
                }
            }
        }
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{ DecayChannel, GeneratorAssembler, DEF_CLIP };

    fn mat_close(a: &nd::Array2<C64>, b: &nd::Array2<C64>, tol: f64) -> bool {
        a.shape() == b.shape()
            && a.iter().zip(b).all(|(x, y)| (x - y).norm() < tol)
    }

    // a time-dependent generator so that step ordering matters
    fn assembler(n: usize) -> GeneratorAssembler {
        let sz = nd::array![
            [C64::from(1.0), C64::from(0.0)],
            [C64::from(0.0), C64::from(-1.0)],
        ];
        let sx = nd::array![
            [C64::from(0.0), C64::from(1.0)],
            [C64::from(1.0), C64::from(0.0)],
        ];
        let sm = nd::array![
            [C64::from(0.0), C64::from(0.0)],
            [C64::from(1.0), C64::from(0.0)],
        ];
        let ctrl: nd::Array1<f64>
            = (0..n).map(|j| 0.3 * j as f64).collect();
        GeneratorAssembler::new(
            (sz * C64::from(0.5)).into(),
            vec![sx],
            vec![ctrl],
            vec![DecayChannel::new(sm, 0.05)],
            n,
            Some(DEF_CLIP),
        ).unwrap()
    }

    #[test]
    fn degenerate_ranges() {
        let gen = assembler(4);
        let mut cache = PropagatorCache::new(&gen, 0.1, 4, true);
        let eye = nd::Array2::eye(4);
        assert!(mat_close(&cache.range(3, 1), &eye, 1e-15));
        let s2 = cache.step(2).clone();
        assert!(mat_close(&cache.range(2, 2), &s2, 1e-15));
    }

    #[test]
    fn composition_law() {
        let gen = assembler(5);
        let mut cache = PropagatorCache::new(&gen, 0.1, 5, true);
        for a in 0..4 {
            for b in a..4 {
                for c in (b + 1)..5 {
                    let whole = cache.range(a, c);
                    let first = cache.range(a, b);
                    let second = cache.range(b + 1, c);
                    assert!(
                        mat_close(&whole, &second.dot(&first), 1e-12),
                        "composition failed for ({}, {}, {})", a, b, c,
                    );
                }
            }
        }
    }

    #[test]
    fn cached_and_uncached_ranges_agree() {
        let gen = assembler(6);
        let mut cached = PropagatorCache::new(&gen, 0.1, 6, true);
        let mut plain = PropagatorCache::new(&gen, 0.1, 6, false);
        // populate the arena in recursion order, then spot-check
        for b in 0..6 {
            for a in (0..=b).rev() {
                let _ = cached.range(a, b);
            }
        }
        assert!(mat_close(&cached.range(1, 4), &plain.range(1, 4), 1e-12));
        assert!(mat_close(&cached.range(0, 5), &plain.range(0, 5), 1e-12));
    }

    #[test]
    #[should_panic(expected = "time index")]
    fn out_of_range_step_panics() {
        let gen = assembler(3);
        let mut cache = PropagatorCache::new(&gen, 0.1, 3, false);
        cache.step(3);
    }
}
