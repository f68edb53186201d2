use validator::{Validate, ValidationError};

fn validate_anneal_config(cfg: &AnnealConfig) -> Result<(), ValidationError> {
    if !cfg.step.is_finite() || cfg.step <= 0.0 {
        return Err(ValidationError::new("anneal step must be a positive finite number"));
    }
    if cfg.max_relaxation_passes < 1 {
        return Err(ValidationError::new("max_relaxation_passes must be >= 1"));
    }
    if cfg.max_anneal_steps < 1 {
        return Err(ValidationError::new("max_anneal_steps must be >= 1"));
    }
    Ok(())
}

/// Schedule used by [`crate::Lattice::converge`] on self-interacting lattices.
///
/// Annealing lowers the temperature by `step` after every stochastic update
/// until it reaches zero, giving up after `max_anneal_steps` updates. The
/// zero-temperature relaxation that follows gives up after
/// `max_relaxation_passes` full passes without a fixed point.
#[derive(Debug, Clone, Copy, PartialEq, Validate)]
#[validate(schema(function = "validate_anneal_config"))]
pub struct AnnealConfig {
    pub step: f64,
    pub max_anneal_steps: usize,
    pub max_relaxation_passes: usize,
}

impl Default for AnnealConfig {
    fn default() -> Self {
        Self {
            step: 0.01,
            max_anneal_steps: 1_000_000,
            max_relaxation_passes: 10_000,
        }
    }
}

fn validate_mpf_config(cfg: &MpfConfig) -> Result<(), ValidationError> {
    if !cfg.learning_rate.is_finite() || cfg.learning_rate <= 0.0 {
        return Err(ValidationError::new("learning_rate must be a positive finite number"));
    }
    if !cfg.step_size.is_finite() || cfg.step_size <= 0.0 {
        return Err(ValidationError::new("step_size must be a positive finite number"));
    }
    if cfg.tolerance.is_nan() || cfg.tolerance < 0.0 {
        return Err(ValidationError::new("tolerance must be >= 0"));
    }
    if cfg.max_iterations < 1 {
        return Err(ValidationError::new("max_iterations must be >= 1"));
    }
    Ok(())
}

/// Minimum Probability Flow fitting parameters.
#[derive(Debug, Clone, Copy, PartialEq, Validate)]
#[validate(schema(function = "validate_mpf_config"))]
pub struct MpfConfig {
    /// Scale applied to every gradient entry (divided by the observation count).
    pub learning_rate: f64,
    /// Gradient-descent step: `w -= step_size * gradient`.
    pub step_size: f64,
    /// Fitting stops once the Euclidean norm of the gradient is at or below this.
    pub tolerance: f64,
    pub max_iterations: usize,
    /// When false, per-observation contributions are computed with rayon.
    pub sequential: bool,
}

impl Default for MpfConfig {
    fn default() -> Self {
        Self {
            learning_rate: 1.0,
            step_size: 0.05,
            tolerance: 1e-6,
            max_iterations: 1_000,
            sequential: true,
        }
    }
}
