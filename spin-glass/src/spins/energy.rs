use super::weighting::Weighting;

/// Where the pairwise term of a spin group takes its input activations from.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// The group couples to itself; inputs are the configuration being scored.
    SelfInteracting,
    /// Activations of a distinct predecessor group, fixed for this evaluation.
    Fixed(Vec<i8>),
}

/// Read-only view of a lattice's energy function.
///
/// Every method takes the receiving group's configuration (`+1/-1` per spin)
/// by reference and never mutates anything, so one model can score many
/// configurations, including from several threads at once.
///
/// Energy: `E = -1/2 * sum_ij w_ij * x_i * s_j + sum_j theta_j * s_j`, where
/// `x` is the input activation vector (`x = s` for a self-interacting group).
/// With a symmetric zero-diagonal matrix this is the usual
/// `-sum_{i<j} w_ij s_i s_j + sum_i theta_i s_i`.
#[derive(Debug, Clone)]
pub struct EnergyModel<'a> {
    weights: &'a Weighting,
    thresholds: Vec<i32>,
    input: Input,
}

impl<'a> EnergyModel<'a> {
    pub fn new(weights: &'a Weighting, thresholds: Vec<i32>, input: Input) -> Self {
        debug_assert_eq!(weights.n_to(), thresholds.len());
        if let Input::Fixed(ref x) = input {
            debug_assert_eq!(weights.n_from(), x.len());
        }
        Self {
            weights,
            thresholds,
            input,
        }
    }

    #[inline]
    pub fn n_spins(&self) -> usize {
        self.thresholds.len()
    }

    #[inline]
    pub fn n_inputs(&self) -> usize {
        self.weights.n_from()
    }

    #[inline]
    fn input_activation(&self, config: &[i8], i: usize) -> f64 {
        match &self.input {
            Input::SelfInteracting => config[i] as f64,
            Input::Fixed(x) => x[i] as f64,
        }
    }

    /// `sum_i w_ik * x_i`, skipping `i == k` for a self-interacting group.
    pub fn local_field(&self, config: &[i8], k: usize) -> f64 {
        let mut h = 0.0;
        for i in 0..self.n_inputs() {
            if i == k && matches!(self.input, Input::SelfInteracting) {
                continue;
            }
            h += self.weights.get(i, k) * self.input_activation(config, i);
        }
        h
    }

    /// Local field at `k` minus its threshold: the logistic argument of the
    /// stochastic update and the quantity the deterministic rule compares to 0.
    #[inline]
    pub fn energy_diff(&self, config: &[i8], k: usize) -> f64 {
        self.local_field(config, k) - self.thresholds[k] as f64
    }

    pub fn energy(&self, config: &[i8]) -> f64 {
        debug_assert_eq!(config.len(), self.n_spins());
        let mut pair = 0.0;
        for i in 0..self.n_inputs() {
            let xi = self.input_activation(config, i);
            for (j, w) in self.weights.row(i).iter().enumerate() {
                pair += w * xi * config[j] as f64;
            }
        }
        let field: f64 = self
            .thresholds
            .iter()
            .zip(config.iter())
            .map(|(&t, &s)| t as f64 * s as f64)
            .sum();
        -0.5 * pair + field
    }

    /// `E(spin k off) - E(spin k on)` with every other spin held fixed.
    pub fn activation_gap(&self, config: &[i8], k: usize) -> f64 {
        let h = self.local_field(config, k);
        let theta = self.thresholds[k] as f64;
        match self.input {
            // spin k appears on both sides of the symmetric pair sum
            Input::SelfInteracting => 2.0 * (h - theta),
            Input::Fixed(_) => h - 2.0 * theta,
        }
    }

    /// `E(config with spin n flipped) - E(config)`.
    pub fn flip_energy_delta(&self, config: &[i8], n: usize) -> f64 {
        let gap = self.activation_gap(config, n);
        if config[n] > 0 {
            // on -> off
            gap
        } else {
            // off -> on
            -gap
        }
    }

    /// `dE/dw_ij = -1/2 * x_i * s_j`.
    #[inline]
    pub fn d_e_d_w(&self, config: &[i8], i: usize, j: usize) -> f64 {
        -0.5 * self.input_activation(config, i) * config[j] as f64
    }

    /// `dE/dw_ij` at `config` minus the same derivative with spin `n` flipped.
    pub fn bit_flipped_partial(&self, config: &[i8], i: usize, j: usize, n: usize) -> f64 {
        let xi = self.input_activation(config, i);
        let sj = config[j] as f64;
        let xi_flipped = if i == n && matches!(self.input, Input::SelfInteracting) {
            -xi
        } else {
            xi
        };
        let sj_flipped = if j == n { -sj } else { sj };
        -0.5 * xi * sj + 0.5 * xi_flipped * sj_flipped
    }
}
