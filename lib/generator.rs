//! Assembly of instantaneous Liouville-space generators.
//!
//! A [`GeneratorAssembler`] owns the validated free Hamiltonian, control
//! Hamiltonians with their per-interval coefficients, and decay channels for
//! one simulation, and produces the total generator
//! `𝓛(t_j) = −i L_{H(t_j)} + Σ_n D_{γ_n(t_j)}` at any interval index.
//!
//! All configuration checking happens in [`GeneratorAssembler::new`], before
//! any exponential is computed. Interval indices are generated internally by
//! the trajectory engine, so an out-of-range index here is an engine logic
//! error and panics.

use ndarray::{ self as nd };
use num_complex::Complex64 as C64;
use crate::{
    error::{ DynamicsError, DynamicsResult },
    grid::{ interp_operators, resample_coeffs },
    liouville::{ clip_small, commutator_superop, dissipator_superop },
};

/// Entries of an assembled dissipator below this magnitude are snapped to
/// zero unless the caller overrides the policy.
pub const DEF_CLIP: f64 = 1e-10;

/// A free Hamiltonian, either fixed or sampled once per grid interval.
#[derive(Clone, Debug)]
pub enum FreeHamiltonian {
    Static(nd::Array2<C64>),
    Sampled(Vec<nd::Array2<C64>>),
}

impl From<nd::Array2<C64>> for FreeHamiltonian {
    fn from(h: nd::Array2<C64>) -> Self { Self::Static(h) }
}

impl FreeHamiltonian {
    fn dim(&self) -> DynamicsResult<usize> {
        let h = match self {
            Self::Static(h) => h,
            Self::Sampled(hh) => hh.first()
                .ok_or(DynamicsError::EmptyHamiltonianSequence)?,
        };
        square_dim(h)
    }
}

/// A decay rate, either constant or sampled once per grid interval.
#[derive(Clone, Debug, PartialEq)]
pub enum DecayRate {
    Constant(f64),
    Sampled(Vec<f64>),
}

impl From<f64> for DecayRate {
    fn from(gamma: f64) -> Self { Self::Constant(gamma) }
}

impl DecayRate {
    fn at(&self, j: usize) -> f64 {
        match self {
            Self::Constant(g) => *g,
            Self::Sampled(gg) => gg[j],
        }
    }
}

/// A jump operator paired with its decay rate.
#[derive(Clone, Debug)]
pub struct DecayChannel {
    pub op: nd::Array2<C64>,
    pub rate: DecayRate,
}

impl DecayChannel {
    pub fn new<R: Into<DecayRate>>(op: nd::Array2<C64>, rate: R) -> Self {
        Self { op, rate: rate.into() }
    }

    /// Pair up parallel lists of jump operators and decay rates.
    pub fn from_lists<R: Into<DecayRate>>(
        ops: Vec<nd::Array2<C64>>,
        rates: Vec<R>,
    ) -> DynamicsResult<Vec<Self>>
    {
        if ops.len() != rates.len() {
            return Err(DynamicsError::DecayCountMismatch {
                ops: ops.len(), rates: rates.len(),
            });
        }
        Ok(
            ops.into_iter().zip(rates)
                .map(|(op, rate)| Self::new(op, rate))
                .collect()
        )
    }
}

fn square_dim(m: &nd::Array2<C64>) -> DynamicsResult<usize> {
    if !m.is_square() {
        return Err(DynamicsError::NonSquareOperator {
            rows: m.shape()[0], cols: m.shape()[1],
        });
    }
    Ok(m.shape()[0])
}

fn check_dim(m: &nd::Array2<C64>, expected: usize) -> DynamicsResult<()> {
    let found = square_dim(m)?;
    if found != expected {
        return Err(DynamicsError::DimensionMismatch { expected, found });
    }
    Ok(())
}

/// Builds instantaneous Liouville generators for one simulation.
#[derive(Clone, Debug)]
pub struct GeneratorAssembler {
    dim: usize,
    n_intervals: usize,
    h0: FreeHamiltonian,
    controls: Vec<nd::Array2<C64>>,
    coeffs: Vec<Vec<f64>>,
    channels: Vec<DecayChannel>,
    promoted: Vec<usize>,
    clip: Option<f64>,
}

impl GeneratorAssembler {
    /// Validate and assemble the generator inputs for a grid with
    /// `n_intervals` intervals.
    ///
    /// `coeffs` holds one per-interval sequence per control Hamiltonian;
    /// missing sequences are zero-filled with a diagnostic, surplus sequences
    /// are a configuration error, and sequences of the wrong length are
    /// resampled (see [`crate::grid`]). A `Sampled` free Hamiltonian of the
    /// wrong length is resampled by linear interpolation. `clip` is the
    /// magnitude below which assembled dissipator entries are snapped to
    /// zero ([`DEF_CLIP`] by default; `None` disables the cleanup).
    pub fn new(
        h0: FreeHamiltonian,
        controls: Vec<nd::Array2<C64>>,
        coeffs: Vec<nd::Array1<f64>>,
        channels: Vec<DecayChannel>,
        n_intervals: usize,
        clip: Option<f64>,
    ) -> DynamicsResult<Self>
    {
        let dim = h0.dim()?;
        let h0 = match h0 {
            FreeHamiltonian::Static(h) => FreeHamiltonian::Static(h),
            FreeHamiltonian::Sampled(hh) => {
                for h in hh.iter() { check_dim(h, dim)?; }
                FreeHamiltonian::Sampled(interp_operators(&hh, n_intervals))
            },
        };
        for hc in controls.iter() { check_dim(hc, dim)?; }
        for ch in channels.iter() {
            check_dim(&ch.op, dim)?;
        }
        for (k, ch) in channels.iter().enumerate() {
            if let DecayRate::Sampled(gg) = &ch.rate {
                if gg.len() != n_intervals {
                    return Err(DynamicsError::BadRateSequence {
                        channel: k, expected: n_intervals, found: gg.len(),
                    });
                }
            }
        }
        if coeffs.len() > controls.len() {
            return Err(DynamicsError::TooManyControlSequences {
                controls: controls.len(), sequences: coeffs.len(),
            });
        }
        if coeffs.len() < controls.len() {
            log::warn!(
                "{} control Hamiltonian(s) but {} coefficient sequence(s); \
                missing sequences are set to zero",
                controls.len(), coeffs.len(),
            );
        }
        let mut resampled: Vec<Vec<f64>> = Vec::with_capacity(controls.len());
        for (k, seq) in coeffs.iter().enumerate() {
            resampled.push(resample_coeffs(k, seq, n_intervals)?);
        }
        resampled.resize(controls.len(), vec![0.0; n_intervals]);
        Ok(Self {
            dim,
            n_intervals,
            h0,
            controls,
            coeffs: resampled,
            channels,
            promoted: Vec::new(),
            clip,
        })
    }

    /// Hilbert-space dimension.
    pub fn dim(&self) -> usize { self.dim }

    /// Number of decay channels.
    pub fn num_channels(&self) -> usize { self.channels.len() }

    /// Number of control Hamiltonians, counting promoted decay channels.
    pub fn num_controls(&self) -> usize {
        self.controls.len() + self.promoted.len()
    }

    /// Assemble the total Hamiltonian `H(t_j) = H0(t_j) + Σ_c Hc[c] u_c[j]`.
    ///
    /// *Panics* if `j` is not a valid interval index.
    pub fn hamiltonian(&self, j: usize) -> nd::Array2<C64> {
        if j >= self.n_intervals {
            panic!("GeneratorAssembler::hamiltonian: \
                time index {} out of range ({} intervals)",
                j, self.n_intervals);
        }
        let mut h = match &self.h0 {
            FreeHamiltonian::Static(h) => h.clone(),
            FreeHamiltonian::Sampled(hh) => hh[j].clone(),
        };
        for (hc, u) in self.controls.iter().zip(&self.coeffs) {
            if u[j] != 0.0 {
                h += &(hc * C64::from(u[j]));
            }
        }
        h
    }

    /// Assemble the dissipative part `Σ_n D_{γ_n(t_j)}` of the generator,
    /// with the clip policy applied.
    pub fn dissipator(&self, j: usize) -> nd::Array2<C64> {
        let d2 = self.dim * self.dim;
        let mut d: nd::Array2<C64> = nd::Array2::zeros((d2, d2));
        for ch in self.channels.iter() {
            let gamma = ch.rate.at(j);
            if gamma != 0.0 {
                d += &dissipator_superop(gamma, &ch.op);
            }
        }
        if let Some(eps) = self.clip {
            clip_small(&mut d, eps);
        }
        d
    }

    /// Assemble the instantaneous generator
    /// `𝓛(t_j) = −i L_{H(t_j)} + Σ_n D_{γ_n(t_j)}`.
    ///
    /// *Panics* if `j` is not a valid interval index.
    pub fn generator(&self, j: usize) -> nd::Array2<C64> {
        let mut l = commutator_superop(&self.hamiltonian(j))
            * C64::new(0.0, -1.0);
        l += &self.dissipator(j);
        l
    }

    /// Reclassify the named decay channels as controllable.
    ///
    /// The promoted channels keep their place in the dissipative sum (the
    /// generator is unchanged), but they are appended to the control list
    /// seen by [`Self::control_liouvilleans`] and
    /// [`Self::control_coefficients`], with the rate itself acting as the
    /// coefficient sequence.
    pub fn promote_channels(&mut self, orders: &[usize]) -> DynamicsResult<()> {
        for &k in orders {
            if k >= self.channels.len() {
                return Err(DynamicsError::ChannelIndexOutOfRange {
                    index: k, channels: self.channels.len(),
                });
            }
        }
        self.promoted = orders.to_vec();
        Ok(())
    }

    /// Indices of channels promoted by [`Self::promote_channels`].
    pub fn promoted_channels(&self) -> &[usize] { &self.promoted }

    /// The Liouville-space operators associated with each control, for
    /// consumption by gradient-based drivers: `L_{Hc}` per control
    /// Hamiltonian, then `i D_{Γ, γ=1}` per promoted channel. In both cases
    /// the generator's sensitivity to the matching coefficient is `−i` times
    /// the listed operator.
    pub fn control_liouvilleans(&self) -> Vec<nd::Array2<C64>> {
        let mut ops: Vec<nd::Array2<C64>>
            = self.controls.iter().map(commutator_superop).collect();
        ops.extend(
            self.promoted.iter()
                .map(|&k| {
                    dissipator_superop(1.0, &self.channels[k].op)
                        * C64::i()
                })
        );
        ops
    }

    /// Per-interval coefficient sequences matching
    /// [`Self::control_liouvilleans`]: the control coefficients, then the
    /// rates of the promoted channels.
    pub fn control_coefficients(&self) -> Vec<Vec<f64>> {
        let mut out = self.coeffs.clone();
        out.extend(
            self.promoted.iter()
                .map(|&k| match &self.channels[k].rate {
                    DecayRate::Constant(g) => vec![*g; self.n_intervals],
                    DecayRate::Sampled(gg) => gg.clone(),
                })
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::liouville::{ unvectorize, vectorize };

    fn sz() -> nd::Array2<C64> {
        nd::array![
            [C64::from(1.0), C64::from(0.0)],
            [C64::from(0.0), C64::from(-1.0)],
        ]
    }

    fn sx() -> nd::Array2<C64> {
        nd::array![
            [C64::from(0.0), C64::from(1.0)],
            [C64::from(1.0), C64::from(0.0)],
        ]
    }

    #[test]
    fn controls_enter_the_hamiltonian() {
        let gen = GeneratorAssembler::new(
            sz().into(),
            vec![sx()],
            vec![nd::array![0.0, 0.5]],
            Vec::new(),
            2,
            Some(DEF_CLIP),
        ).unwrap();
        assert_eq!(gen.hamiltonian(0), sz());
        let h1 = gen.hamiltonian(1);
        assert_eq!(h1[[0, 1]], C64::from(0.5));
        assert_eq!(h1[[0, 0]], C64::from(1.0));
    }

    #[test]
    fn missing_coefficients_are_zero_filled() {
        let gen = GeneratorAssembler::new(
            sz().into(),
            vec![sx(), sz()],
            vec![nd::array![1.0, 1.0]],
            Vec::new(),
            2,
            None,
        ).unwrap();
        assert_eq!(gen.control_coefficients()[1], vec![0.0, 0.0]);
    }

    #[test]
    fn surplus_coefficients_are_an_error() {
        let res = GeneratorAssembler::new(
            sz().into(),
            vec![sx()],
            vec![nd::array![1.0], nd::array![1.0]],
            Vec::new(),
            1,
            None,
        );
        assert!(matches!(
            res,
            Err(DynamicsError::TooManyControlSequences { .. }),
        ));
    }

    #[test]
    fn generator_acts_as_master_equation_rhs() {
        let sm = nd::array![
            [C64::from(0.0), C64::from(0.0)],
            [C64::from(1.0), C64::from(0.0)],
        ];
        let gamma = 0.1;
        let gen = GeneratorAssembler::new(
            sz().into(),
            Vec::new(),
            Vec::new(),
            vec![DecayChannel::new(sm.clone(), gamma)],
            1,
            Some(DEF_CLIP),
        ).unwrap();
        let rho = nd::array![
            [C64::new(0.7, 0.0), C64::new(0.1, 0.1)],
            [C64::new(0.1, -0.1), C64::new(0.3, 0.0)],
        ];
        let acted = unvectorize(&gen.generator(0).dot(&vectorize(&rho)), 2);
        let smdag = sm.t().mapv(|z| z.conj());
        let gg = smdag.dot(&sm);
        let direct
            = (sz().dot(&rho) - rho.dot(&sz())) * C64::new(0.0, -1.0)
            + (sm.dot(&rho).dot(&smdag)
                - (gg.dot(&rho) + rho.dot(&gg)) * C64::from(0.5))
                * C64::from(gamma);
        assert!(
            acted.iter().zip(&direct).all(|(x, y)| (x - y).norm() < 1e-12)
        );
    }

    #[test]
    fn promoted_channels_extend_the_control_list() {
        let sm = nd::array![
            [C64::from(0.0), C64::from(0.0)],
            [C64::from(1.0), C64::from(0.0)],
        ];
        let mut gen = GeneratorAssembler::new(
            sz().into(),
            vec![sx()],
            vec![nd::array![1.0, 1.0]],
            vec![DecayChannel::new(sm, 0.2)],
            2,
            None,
        ).unwrap();
        let before = gen.generator(0);
        gen.promote_channels(&[0]).unwrap();
        assert_eq!(gen.num_controls(), 2);
        assert_eq!(gen.control_liouvilleans().len(), 2);
        assert_eq!(gen.control_coefficients()[1], vec![0.2, 0.2]);
        // promotion only reclassifies; the generator itself is unchanged
        assert_eq!(gen.generator(0), before);
        assert!(matches!(
            gen.promote_channels(&[3]),
            Err(DynamicsError::ChannelIndexOutOfRange { .. }),
        ));
    }

    #[test]
    fn sampled_rates_enter_per_interval() {
        let sm = nd::array![
            [C64::from(0.0), C64::from(0.0)],
            [C64::from(1.0), C64::from(0.0)],
        ];
        let gen = GeneratorAssembler::new(
            sz().into(),
            Vec::new(),
            Vec::new(),
            vec![DecayChannel::new(
                sm.clone(), DecayRate::Sampled(vec![0.0, 0.4]),
            )],
            2,
            None,
        ).unwrap();
        assert!(gen.dissipator(0).iter().all(|z| z.norm() < 1e-15));
        assert_eq!(gen.dissipator(1), dissipator_superop(0.4, &sm));
    }

    #[test]
    fn sampled_rate_sequence_length_is_checked() {
        let res = GeneratorAssembler::new(
            sz().into(),
            Vec::new(),
            Vec::new(),
            vec![DecayChannel::new(
                sx(), DecayRate::Sampled(vec![0.1, 0.1, 0.1]),
            )],
            2,
            None,
        );
        assert!(matches!(
            res,
            Err(DynamicsError::BadRateSequence {
                channel: 0, expected: 2, found: 3,
            }),
        ));
    }

    #[test]
    fn paired_decay_lists_must_match() {
        let chans = DecayChannel::from_lists(vec![sx(), sz()], vec![0.1, 0.2])
            .unwrap();
        assert_eq!(chans.len(), 2);
        assert_eq!(chans[1].rate, DecayRate::Constant(0.2));
        assert!(matches!(
            DecayChannel::from_lists(vec![sx()], vec![0.1, 0.2]),
            Err(DynamicsError::DecayCountMismatch { ops: 1, rates: 2 }),
        ));
    }

    #[test]
    #[should_panic(expected = "time index")]
    fn out_of_range_index_panics() {
        let gen = GeneratorAssembler::new(
            sz().into(), Vec::new(), Vec::new(), Vec::new(), 2, None,
        ).unwrap();
        gen.hamiltonian(2);
    }
}
