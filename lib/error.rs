//! Error taxonomy for engine construction.
//!
//! Everything here is a *configuration* error: it is detected while the
//! engine is being set up, before any matrix exponential is computed.
//! Recoverable shape mismatches (too few control sequences, non-divisible
//! resampling) are not errors; they are logged via [`log::warn!`] and
//! auto-corrected. Internal invariant violations (e.g. an out-of-range time
//! index generated by the engine itself) panic instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DynamicsError {
    /// An operator that must be square is not.
    #[error("non-square operator: {rows} x {cols}")]
    NonSquareOperator { rows: usize, cols: usize },

    /// An operator does not match the Hilbert-space dimension set by the free
    /// Hamiltonian.
    #[error("operator dimension mismatch: expected {expected}, got {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// The numbers of jump operators and decay rates disagree.
    #[error("expected one decay rate per jump operator: \
        {ops} operator(s), {rates} rate(s)")]
    DecayCountMismatch { ops: usize, rates: usize },

    /// A per-step decay rate sequence has the wrong length.
    #[error("per-step decay rate sequence for channel {channel} has length \
        {found}; expected {expected}")]
    BadRateSequence { channel: usize, expected: usize, found: usize },

    /// No derivative Hamiltonians were supplied.
    #[error("at least one Hamiltonian derivative is required")]
    NoDerivatives,

    /// More control coefficient sequences than control Hamiltonians.
    #[error("too many control coefficient sequences: \
        {controls} control Hamiltonian(s), {sequences} sequence(s)")]
    TooManyControlSequences { controls: usize, sequences: usize },

    /// A control coefficient sequence is longer than the number of grid
    /// intervals; there is no defined policy for discarding values.
    #[error("control sequence {index} has length {found}, which exceeds the \
        {intervals} grid interval(s)")]
    ControlSequenceTooLong { index: usize, found: usize, intervals: usize },

    /// A per-interval free Hamiltonian was supplied as an empty sequence.
    #[error("per-interval free Hamiltonian sequence is empty")]
    EmptyHamiltonianSequence,

    /// Fewer than two time points.
    #[error("time grid must contain at least two points, got {0}")]
    ShortTimeGrid(usize),

    /// Zero or negative grid spacing.
    #[error("time grid spacing must be positive, got {0}")]
    NonpositiveTimeStep(f64),

    /// The time grid is not uniformly spaced.
    #[error("time grid is not uniformly spaced at index {index}: \
        step {found} vs. {expected}")]
    NonuniformTimeGrid { index: usize, expected: f64, found: f64 },

    /// A decay channel index passed to the environment-assisted extension
    /// does not name an existing channel.
    #[error("decay channel index {index} out of range ({channels} channel(s))")]
    ChannelIndexOutOfRange { index: usize, channels: usize },

    /// A Kraus operator set is empty.
    #[error("at least one Kraus operator is required")]
    EmptyKrausSet,

    /// A derivative-operator list does not contain one operator per Kraus
    /// operator.
    #[error("Kraus derivative list for parameter {param} has {found} \
        operator(s); expected {expected}")]
    KrausShapeMismatch { param: usize, expected: usize, found: usize },
}

pub type DynamicsResult<T> = Result<T, DynamicsError>;
