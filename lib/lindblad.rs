//! Time-stepped evolution of a state and its parameter derivatives under the
//! Lindblad master equation.
//!
//! The engine walks the time grid once, advancing the vectorized state with
//! one-interval propagators and accumulating, for every unknown parameter,
//! the discretized Duhamel recursion
//! ```text
//! dρ_k(0) = dt dL_k ρ(0)
//! dρ_k(i) = dt dL_k ρ(i)
//!           + Σ_{m=1}^{i−1} range(i−m, i−1) (dt dL_k ρ(i−m)),    i ≥ 1
//! ```
//! with `dL_k = −i L_{dH_k}` the commutator superoperator of the k-th
//! derivative Hamiltonian. Each term pairs a "future" propagation segment
//! with a "past" state, which is why derivative runs need the full pairwise
//! propagator cache (see [`crate::propagator`] for the O(n²) cost and the
//! state-only opt-out).

use ndarray::{ self as nd };
use num_complex::Complex64 as C64;
use crate::{
    error::{ DynamicsError, DynamicsResult },
    generator::{ DecayChannel, FreeHamiltonian, GeneratorAssembler, DEF_CLIP },
    grid::TimeGrid,
    liouville::{ commutator_superop, unvectorize, vectorize },
    probe::random_probe_density,
    propagator::PropagatorCache,
};

/// Seed for the default probe state when none is provided.
pub const DEF_SEED: u64 = 1234;

/// Construction inputs for a [`Lindblad`] engine.
///
/// `rho0` falls back to the seeded default probe state when absent; `ctrl`
/// holds one per-interval sequence per entry of `Hc` (shorter lists are
/// zero-filled with a diagnostic); `clip` is the dissipator cleanup threshold
/// ([`crate::generator::DEF_CLIP`] by default, `None` to disable).
#[derive(Clone, Debug)]
pub struct LindbladParams {
    pub tspan: nd::Array1<f64>,
    pub rho0: Option<nd::Array2<C64>>,
    pub H0: FreeHamiltonian,
    pub Hc: Vec<nd::Array2<C64>>,
    pub ctrl: Vec<nd::Array1<f64>>,
    pub dH: Vec<nd::Array2<C64>>,
    pub decay: Vec<DecayChannel>,
    pub seed: u64,
    pub clip: Option<f64>,
}

impl LindbladParams {
    /// Start from the bare minimum: a time grid, a free Hamiltonian, and one
    /// derivative Hamiltonian per unknown parameter.
    pub fn new(
        tspan: nd::Array1<f64>,
        H0: FreeHamiltonian,
        dH: Vec<nd::Array2<C64>>,
    ) -> Self
    {
        Self {
            tspan,
            rho0: None,
            H0,
            Hc: Vec::new(),
            ctrl: Vec::new(),
            dH,
            decay: Vec::new(),
            seed: DEF_SEED,
            clip: Some(DEF_CLIP),
        }
    }

    pub fn with_initial_state(mut self, rho0: nd::Array2<C64>) -> Self {
        self.rho0 = Some(rho0);
        self
    }

    pub fn with_controls(
        mut self,
        Hc: Vec<nd::Array2<C64>>,
        ctrl: Vec<nd::Array1<f64>>,
    ) -> Self
    {
        self.Hc = Hc;
        self.ctrl = ctrl;
        self
    }

    pub fn with_decay(mut self, decay: Vec<DecayChannel>) -> Self {
        self.decay = decay;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_clip(mut self, clip: Option<f64>) -> Self {
        self.clip = clip;
        self
    }
}

/// The state and derivative trajectories produced by one [`Lindblad::run`].
///
/// `rho[i]` is the density matrix at the i-th time point; `drho[k][i]` is its
/// derivative with respect to the k-th unknown parameter. `drho` is empty for
/// state-only runs.
#[derive(Clone, Debug)]
pub struct Trajectory {
    pub rho: Vec<nd::Array2<C64>>,
    pub drho: Vec<Vec<nd::Array2<C64>>>,
}

impl Trajectory {
    /// Number of time points.
    pub fn len(&self) -> usize { self.rho.len() }

    pub fn is_empty(&self) -> bool { self.rho.is_empty() }

    /// Number of unknown parameters covered by `drho`.
    pub fn param_count(&self) -> usize { self.drho.len() }

    /// The final density matrix.
    pub fn final_state(&self) -> &nd::Array2<C64> {
        self.rho.last().expect("Trajectory::final_state: empty trajectory")
    }

    /// The final derivative matrices, one per parameter.
    pub fn final_derivatives(&self) -> Vec<&nd::Array2<C64>> {
        self.drho.iter()
            .map(|dk| {
                dk.last()
                    .expect("Trajectory::final_derivatives: empty trajectory")
            })
            .collect()
    }
}

/// Diagnostic summary of an engine instance, for logging outside the core.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EngineSummary {
    pub dim: usize,
    pub channels: usize,
    pub time_points: usize,
    pub params: usize,
    pub derivative_cache: bool,
}

impl std::fmt::Display for EngineSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f,
            "dim {}, {} decay channel(s), {} time point(s), \
            {} parameter(s), derivative cache {}",
            self.dim, self.channels, self.time_points, self.params,
            if self.derivative_cache { "on" } else { "off" },
        )
    }
}

/// Time-stepped Lindblad evolution engine for one simulation.
///
/// Owns its generator assembly and, during a run, the propagator cache; no
/// state is shared between instances.
#[derive(Clone, Debug)]
pub struct Lindblad {
    assembler: GeneratorAssembler,
    grid: TimeGrid,
    rho0: nd::Array2<C64>,
    dliou: Vec<nd::Array2<C64>>,
    derivative_cache: bool,
}

impl Lindblad {
    /// Validate the construction inputs.
    ///
    /// All configuration errors surface here, before any propagator is
    /// computed.
    pub fn new(params: LindbladParams) -> DynamicsResult<Self> {
        let LindbladParams { tspan, rho0, H0, Hc, ctrl, dH, decay, seed, clip }
            = params;
        let grid = TimeGrid::new(tspan)?;
        let assembler = GeneratorAssembler::new(
            H0, Hc, ctrl, decay, grid.num_intervals(), clip)?;
        let dim = assembler.dim();
        if dH.is_empty() {
            return Err(DynamicsError::NoDerivatives);
        }
        let mut dliou: Vec<nd::Array2<C64>> = Vec::with_capacity(dH.len());
        for dh in dH.iter() {
            if !dh.is_square() {
                return Err(DynamicsError::NonSquareOperator {
                    rows: dh.shape()[0], cols: dh.shape()[1],
                });
            }
            if dh.shape()[0] != dim {
                return Err(DynamicsError::DimensionMismatch {
                    expected: dim, found: dh.shape()[0],
                });
            }
            dliou.push(commutator_superop(dh) * C64::new(0.0, -1.0));
        }
        let rho0 = match rho0 {
            Some(r) => {
                if !r.is_square() {
                    return Err(DynamicsError::NonSquareOperator {
                        rows: r.shape()[0], cols: r.shape()[1],
                    });
                }
                if r.shape()[0] != dim {
                    return Err(DynamicsError::DimensionMismatch {
                        expected: dim, found: r.shape()[0],
                    });
                }
                r
            },
            None => random_probe_density(dim, seed),
        };
        Ok(Self {
            assembler,
            grid,
            rho0,
            dliou,
            derivative_cache: true,
        })
    }

    /// Hilbert-space dimension.
    pub fn dim(&self) -> usize { self.assembler.dim() }

    /// Number of unknown parameters.
    pub fn param_count(&self) -> usize { self.dliou.len() }

    /// The time grid.
    pub fn grid(&self) -> &TimeGrid { &self.grid }

    /// The generator assembly, e.g. for promoting decay channels to control
    /// channels.
    pub fn assembler_mut(&mut self) -> &mut GeneratorAssembler {
        &mut self.assembler
    }

    pub fn assembler(&self) -> &GeneratorAssembler { &self.assembler }

    /// Reclassify decay channels as controllable
    /// (see [`GeneratorAssembler::promote_channels`]).
    pub fn environment_assisted(&mut self, orders: &[usize])
        -> DynamicsResult<()>
    {
        self.assembler.promote_channels(orders)
    }

    /// Report dimension, channel count, grid length, parameter count, and
    /// whether the last configured run mode populates the derivative cache.
    pub fn summary(&self) -> EngineSummary {
        EngineSummary {
            dim: self.assembler.dim(),
            channels: self.assembler.num_channels(),
            time_points: self.grid.len(),
            params: self.dliou.len(),
            derivative_cache: self.derivative_cache,
        }
    }

    /// Produce the state trajectory only, skipping the derivative recursion
    /// and the O(n²) propagator arena.
    pub fn run_states(&mut self) -> Trajectory {
        self.derivative_cache = false;
        let n = self.grid.len();
        let dim = self.assembler.dim();
        let mut cache = PropagatorCache::new(
            &self.assembler, self.grid.dt(), self.grid.num_intervals(), false);
        let mut rho_vec: Vec<nd::Array1<C64>> = Vec::with_capacity(n);
        rho_vec.push(vectorize(&self.rho0));
        for i in 0..self.grid.num_intervals() {
            let next = cache.step(i).dot(&rho_vec[i]);
            rho_vec.push(next);
        }
        Trajectory {
            rho: rho_vec.iter().map(|v| unvectorize(v, dim)).collect(),
            drho: Vec::new(),
        }
    }

    /// Produce the full state and derivative trajectories.
    pub fn run(&mut self) -> Trajectory {
        let (traj, _) = self.run_cached();
        traj
    }

    /// As [`Self::run`], but hand the populated propagator cache back to the
    /// caller for reuse instead of discarding it.
    pub fn run_cached(&mut self) -> (Trajectory, PropagatorCache<'_>) {
        self.derivative_cache = true;
        let n = self.grid.len();
        let dim = self.assembler.dim();
        let dt = self.grid.dt();
        let n_params = self.dliou.len();
        let mut cache = PropagatorCache::new(
            &self.assembler, dt, self.grid.num_intervals(), true);

        let mut rho_vec: Vec<nd::Array1<C64>> = Vec::with_capacity(n);
        rho_vec.push(vectorize(&self.rho0));
        // dt dL_k ρ(i), retained for reuse as the recursion's past insertions
        let mut insertions: Vec<Vec<nd::Array1<C64>>>
            = vec![Vec::with_capacity(n); n_params];
        let mut drho_vec: Vec<Vec<nd::Array1<C64>>>
            = vec![Vec::with_capacity(n); n_params];
        for (k, dl) in self.dliou.iter().enumerate() {
            let ins = dl.dot(&rho_vec[0]) * C64::from(dt);
            drho_vec[k].push(ins.clone());
            insertions[k].push(ins);
        }

        for i in 1..n {
            let next = cache.step(i - 1).dot(&rho_vec[i - 1]);
            rho_vec.push(next);
            for (k, dl) in self.dliou.iter().enumerate() {
                let ins = dl.dot(&rho_vec[i]) * C64::from(dt);
                drho_vec[k].push(ins.clone());
                insertions[k].push(ins);
            }
            // past insertions, each advanced across the remaining segment;
            // the per-parameter reductions all read the same cached ranges
            for m in 1..i {
                let seg = cache.range(i - m, i - 1);
                for k in 0..n_params {
                    let term = seg.dot(&insertions[k][i - m]);
                    drho_vec[k][i] += &term;
                }
            }
        }

        let traj = Trajectory {
            rho: rho_vec.iter().map(|v| unvectorize(v, dim)).collect(),
            drho: drho_vec.iter()
                .map(|dk| dk.iter().map(|v| unvectorize(v, dim)).collect())
                .collect(),
        };
        (traj, cache)
    }
}
