#![allow(non_snake_case)]

//! Dynamics and sensitivity engine for quantum parameter estimation.
//!
//! Simulates the time evolution of an open system's density matrix together
//! with its derivatives with respect to unknown physical parameters, either
//! by time-stepped propagation under a Lindblad master equation or in closed
//! form through a Kraus operator sum. The produced state and derivative
//! trajectories are the inputs consumed by Fisher-information-type bound
//! computations and by external optimizers searching over control pulses,
//! probe states, or measurements.

pub mod error;
pub mod liouville;
pub mod expm;
pub mod grid;
pub mod probe;
pub mod generator;
pub mod propagator;
pub mod lindblad;
pub mod kraus;
pub mod engine;

pub use error::{ DynamicsError, DynamicsResult };
pub use generator::{ DecayChannel, DecayRate, FreeHamiltonian };
pub use lindblad::{ EngineSummary, Lindblad, LindbladParams, Trajectory };
pub use kraus::KrausChannel;
pub use engine::{ Dynamics, KrausSim, LogDerivative, Output, Snapshot };
