use thiserror::Error;

/// Failures surfaced by lattice, learning and sampling operations.
#[derive(Debug, Error)]
pub enum SpinGlassError {
    /// A state, gradient or threshold vector does not match the size of the
    /// lattice or weighting it is applied to.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// The lattice cannot be laid out as the grid an operation needs.
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    #[error("at least one observation is required")]
    EmptyObservations,

    /// The learning budget ran out before the gradient norm reached tolerance.
    #[error("did not converge within {iterations} iterations (gradient norm {magnitude:e})")]
    NotConverged { iterations: usize, magnitude: f64 },

    /// Annealing used up its step budget, or the temperature is too large
    /// for the configured step to lower it.
    #[error("annealing stopped after {steps} steps at temperature {temperature}")]
    AnnealLimit { steps: usize, temperature: f64 },

    #[error("temperature must be finite and >= 0, got {0}")]
    InvalidTemperature(f64),

    #[error("zero-temperature relaxation did not reach a fixed point within {passes} passes")]
    RelaxationLimit { passes: usize },

    #[error("interrupted after {completed} steps")]
    Interrupted { completed: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] validator::ValidationErrors),
}

pub type Result<T> = std::result::Result<T, SpinGlassError>;
