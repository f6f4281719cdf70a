//! Mode selection over the two evolution variants.
//!
//! A [`Dynamics`] value is built once per simulation from whichever
//! construction inputs were supplied (a time grid for the Lindblad engine, a
//! Kraus operator set for the closed-form channel) and dispatched once;
//! the variant is never re-checked per step. Both variants expose the same
//! output contract, differing only in whether the output is a trajectory or
//! a single snapshot.

use std::str::FromStr;
use ndarray::{ self as nd };
use num_complex::Complex64 as C64;
use crate::{
    kraus::KrausChannel,
    lindblad::{ EngineSummary, Lindblad, Trajectory, DEF_SEED },
    probe::random_probe_density,
};

/// Logarithmic-derivative convention used by downstream Fisher-information
/// consumers.
///
/// The engine itself is agnostic to this choice; it is carried only so that
/// callers can hand it through alongside the produced trajectories.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum LogDerivative {
    /// Symmetric logarithmic derivative.
    #[default]
    Sld,
    /// Right logarithmic derivative.
    Rld,
    /// Left logarithmic derivative.
    Lld,
}

impl FromStr for LogDerivative {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SLD" => Ok(Self::Sld),
            "RLD" => Ok(Self::Rld),
            "LLD" => Ok(Self::Lld),
            _ => Err(format!(
                "{:?} is not a valid log-derivative convention; \
                supported values are 'SLD', 'RLD', and 'LLD'", s)),
        }
    }
}

impl std::fmt::Display for LogDerivative {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sld => write!(f, "SLD"),
            Self::Rld => write!(f, "RLD"),
            Self::Lld => write!(f, "LLD"),
        }
    }
}

/// Check a downstream objective request against the parameter count.
///
/// Asking for a multi-parameter-only bound with exactly one parameter is a
/// usage warning, not an error: the value degenerates to a known equivalent
/// of a simpler single-parameter quantity. Returns `false` in that case.
pub fn objective_supported(n_params: usize, requires_multi: bool) -> bool {
    if requires_multi && n_params == 1 {
        log::warn!(
            "a multi-parameter bound was requested with a single unknown \
            parameter; the result is equivalent to the single-parameter \
            quantity",
        );
        return false;
    }
    true
}

/// Single-evaluation output of the Kraus engine.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub rho: nd::Array2<C64>,
    pub drho: Vec<nd::Array2<C64>>,
}

/// Common output surface of the two evolution variants.
#[derive(Clone, Debug)]
pub enum Output {
    Trajectory(Trajectory),
    Snapshot(Snapshot),
}

impl Output {
    /// Number of unknown parameters covered by the derivative output.
    pub fn param_count(&self) -> usize {
        match self {
            Self::Trajectory(t) => t.param_count(),
            Self::Snapshot(s) => s.drho.len(),
        }
    }

    /// The evolved state at the end of the run.
    pub fn final_state(&self) -> &nd::Array2<C64> {
        match self {
            Self::Trajectory(t) => t.final_state(),
            Self::Snapshot(s) => &s.rho,
        }
    }

    /// The trajectory, if the Lindblad variant produced one.
    pub fn trajectory(&self) -> Option<&Trajectory> {
        match self {
            Self::Trajectory(t) => Some(t),
            Self::Snapshot(_) => None,
        }
    }
}

/// Construction inputs for the Kraus variant.
#[derive(Clone, Debug)]
pub struct KrausSim {
    channel: KrausChannel,
    rho0: nd::Array2<C64>,
}

impl KrausSim {
    /// Pair a channel with an initial state; a missing state falls back to
    /// the seeded default probe state.
    pub fn new(channel: KrausChannel, rho0: Option<nd::Array2<C64>>) -> Self {
        let rho0 = rho0
            .unwrap_or_else(|| random_probe_density(channel.dim(), DEF_SEED));
        Self { channel, rho0 }
    }

    pub fn channel(&self) -> &KrausChannel { &self.channel }
}

/// The engine, polymorphic over the two evolution variants.
#[derive(Clone, Debug)]
pub enum Dynamics {
    Lindblad(Lindblad),
    Kraus(KrausSim),
}

impl From<Lindblad> for Dynamics {
    fn from(engine: Lindblad) -> Self { Self::Lindblad(engine) }
}

impl From<KrausSim> for Dynamics {
    fn from(sim: KrausSim) -> Self { Self::Kraus(sim) }
}

impl Dynamics {
    /// Run the simulation, producing the state together with one derivative
    /// per unknown parameter.
    pub fn run(&mut self) -> Output {
        match self {
            Self::Lindblad(engine) => Output::Trajectory(engine.run()),
            Self::Kraus(sim) => {
                let (rho, drho)
                    = sim.channel.evolve_with_derivatives(&sim.rho0);
                Output::Snapshot(Snapshot { rho, drho })
            },
        }
    }

    /// Run the simulation for the state only, skipping derivative caching.
    pub fn run_states(&mut self) -> Output {
        match self {
            Self::Lindblad(engine) => Output::Trajectory(engine.run_states()),
            Self::Kraus(sim) => {
                let rho = sim.channel.evolve(&sim.rho0);
                Output::Snapshot(Snapshot { rho, drho: Vec::new() })
            },
        }
    }

    /// Diagnostic summary for logging outside the core.
    pub fn summary(&self) -> EngineSummary {
        match self {
            Self::Lindblad(engine) => engine.summary(),
            Self::Kraus(sim) => EngineSummary {
                dim: sim.channel.dim(),
                channels: sim.channel.num_operators(),
                time_points: 1,
                params: sim.channel.param_count(),
                derivative_cache: false,
            },
        }
    }
}
