pub mod dynamics;

pub use dynamics::Convergence;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;
use validator::Validate;

use crate::config::AnnealConfig;
use crate::error::{Result, SpinGlassError};
use crate::spins::{EnergyModel, Gradient, Input, Spin, State, Weighting};

const DEFAULT_SEED: u64 = 42;

/// A lattice that other lattices can read their inputs from.
pub type SharedLattice = Rc<RefCell<Lattice>>;

/// Where a lattice's spins receive their input activations from.
#[derive(Debug, Clone)]
pub enum Topology {
    /// Hopfield network: every spin couples to every other spin of the same
    /// lattice through a symmetric, zero-diagonal weighting.
    SelfInteracting,
    /// RBM-style layer fed by a previously constructed lattice through a
    /// `|predecessor| x |self|` weighting.
    Layered(SharedLattice),
}

#[derive(Debug, Clone, Copy)]
struct CachedEnergy {
    value: f64,
    /// Predecessor revision the value was computed against (0 when self-interacting).
    input_revision: u64,
}

/// A fixed-size array of binary spins, the weights feeding them and a
/// temperature driving their stochastic updates.
///
/// All spins start deactivated with threshold 0 and all weights start at 0.
/// Energy is cached and invalidated by every spin or weight mutation; a
/// layered lattice additionally drops its cache when its predecessor changes.
#[derive(Debug)]
pub struct Lattice {
    spins: Vec<Spin>,
    weights: Weighting,
    topology: Topology,
    /// Value currently driving stochastic updates; lowered by annealing.
    temperature: f64,
    /// Value annealing starts from and [`Lattice::reset_temperature`] restores.
    set_temperature: f64,
    anneal: AnnealConfig,
    rng: Xoshiro256StarStar,
    revision: u64,
    energy: Cell<Option<CachedEnergy>>,
}

impl Lattice {
    /// A self-interacting (Hopfield) lattice of `n_spins`.
    pub fn interacting(n_spins: usize) -> Self {
        Self::build(n_spins, Weighting::symmetric(n_spins), Topology::SelfInteracting)
    }

    /// A layer of `n_spins` reading its input from `predecessor`.
    pub fn layered(n_spins: usize, predecessor: SharedLattice) -> Self {
        let n_from = predecessor.borrow().lattice_size();
        Self::build(
            n_spins,
            Weighting::directed(n_from, n_spins),
            Topology::Layered(predecessor),
        )
    }

    fn build(n_spins: usize, weights: Weighting, topology: Topology) -> Self {
        Self {
            spins: vec![Spin::default(); n_spins],
            weights,
            topology,
            temperature: 0.0,
            set_temperature: 0.0,
            anneal: AnnealConfig::default(),
            rng: Xoshiro256StarStar::seed_from_u64(DEFAULT_SEED),
            revision: 0,
            energy: Cell::new(None),
        }
    }

    /// Replace the (all-zero) thresholds. Thresholds are fixed afterwards.
    pub fn with_thresholds(mut self, thresholds: &[i32]) -> Result<Self> {
        if thresholds.len() != self.spins.len() {
            return Err(SpinGlassError::DimensionMismatch {
                expected: self.spins.len(),
                found: thresholds.len(),
            });
        }
        self.spins = self
            .spins
            .iter()
            .zip(thresholds.iter())
            .map(|(s, &t)| Spin::with_threshold(s.is_active(), t))
            .collect();
        self.touch();
        Ok(self)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.reseed(seed);
        self
    }

    pub fn reseed(&mut self, seed: u64) {
        self.rng = Xoshiro256StarStar::seed_from_u64(seed);
    }

    pub fn into_shared(self) -> SharedLattice {
        Rc::new(RefCell::new(self))
    }

    #[inline]
    pub fn lattice_size(&self) -> usize {
        self.spins.len()
    }

    /// Size of the group feeding this lattice (its own size when self-interacting).
    #[inline]
    pub fn predecessor_size(&self) -> usize {
        self.weights.n_from()
    }

    #[inline]
    pub fn is_self_interacting(&self) -> bool {
        matches!(self.topology, Topology::SelfInteracting)
    }

    /// Incremented on every spin or weight mutation.
    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[inline]
    fn touch(&mut self) {
        self.revision += 1;
        self.energy.set(None);
    }

    // --- spins ---

    /// +1 or -1.
    #[inline]
    pub fn get_spin(&self, i: usize) -> i8 {
        self.spins[i].get()
    }

    #[inline]
    pub fn get_threshold(&self, i: usize) -> i32 {
        self.spins[i].threshold()
    }

    pub fn thresholds(&self) -> Vec<i32> {
        self.spins.iter().map(Spin::threshold).collect()
    }

    pub fn set_spin(&mut self, i: usize, activated: bool) {
        self.spins[i].set(activated);
        self.touch();
    }

    /// Flip spin `i`; flipping twice restores the configuration.
    pub fn flip_spin(&mut self, i: usize) {
        self.spins[i].flip();
        self.touch();
    }

    /// Overwrite every spin from `state`.
    pub fn set_spins(&mut self, state: &State) -> Result<()> {
        self.check_state(state)?;
        for (i, spin) in self.spins.iter_mut().enumerate() {
            spin.set(state.spin(i));
        }
        self.touch();
        Ok(())
    }

    pub fn activations(&self) -> Vec<i8> {
        self.spins.iter().map(Spin::get).collect()
    }

    /// Snapshot of the current configuration.
    pub fn state(&self) -> State {
        State::from_activations(&self.activations())
    }

    fn check_state(&self, state: &State) -> Result<()> {
        if state.len() != self.spins.len() {
            return Err(SpinGlassError::DimensionMismatch {
                expected: self.spins.len(),
                found: state.len(),
            });
        }
        Ok(())
    }

    /// Cheap fingerprint of the configuration: spin `k`'s bit XORed into
    /// position `k % 64`. Not collision free; flipping exactly one spin
    /// always changes it.
    pub fn representation(&self) -> u64 {
        let mut repr = 0u64;
        for (k, spin) in self.spins.iter().enumerate() {
            if spin.is_active() {
                repr ^= 1u64 << (k % 64);
            }
        }
        repr
    }

    // --- temperature ---

    #[inline]
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    #[inline]
    pub fn set_point(&self) -> f64 {
        self.set_temperature
    }

    /// Set both the current temperature and the annealing set point.
    /// Zero gives a fully deterministic lattice. Negative, infinite and NaN
    /// temperatures are rejected and leave the lattice unchanged.
    pub fn set_temperature(&mut self, temp: f64) -> Result<()> {
        if !temp.is_finite() || temp < 0.0 {
            return Err(SpinGlassError::InvalidTemperature(temp));
        }
        self.set_temperature = temp;
        self.temperature = temp;
        Ok(())
    }

    /// Restore the current temperature to the set point after annealing.
    pub fn reset_temperature(&mut self) {
        self.temperature = self.set_temperature;
    }

    #[inline]
    pub fn anneal_config(&self) -> &AnnealConfig {
        &self.anneal
    }

    pub fn set_anneal_config(&mut self, config: AnnealConfig) -> Result<()> {
        config.validate()?;
        self.anneal = config;
        Ok(())
    }

    // --- weights ---

    #[inline]
    pub fn weights(&self) -> &Weighting {
        &self.weights
    }

    #[inline]
    pub fn weight(&self, i: usize, j: usize) -> f64 {
        self.weights.get(i, j)
    }

    pub fn set_weight(&mut self, i: usize, j: usize, w: f64) {
        self.weights.set(i, j, w);
        self.touch();
    }

    /// One gradient-descent step on the weighting: `w -= eps * gradient`.
    pub fn update_weights(&mut self, gradient: &Gradient, eps: f64) -> Result<()> {
        self.weights.gradient_descent(gradient, eps)?;
        self.touch();
        Ok(())
    }

    // --- energy ---

    /// Energy function of this lattice, with a layered lattice's predecessor
    /// activations captured as they are now.
    ///
    /// Panics if a layered lattice's predecessor is mutably borrowed.
    pub fn model(&self) -> EnergyModel<'_> {
        let input = match &self.topology {
            Topology::SelfInteracting => Input::SelfInteracting,
            Topology::Layered(pred) => Input::Fixed(pred.borrow().activations()),
        };
        EnergyModel::new(&self.weights, self.thresholds(), input)
    }

    fn input_revision(&self) -> u64 {
        match &self.topology {
            Topology::SelfInteracting => 0,
            Topology::Layered(pred) => pred.borrow().revision(),
        }
    }

    /// Energy of the current configuration, recomputed only after a mutation
    /// (of this lattice or of its predecessor).
    pub fn energy(&self) -> f64 {
        let input_revision = self.input_revision();
        match self.energy.get() {
            Some(cached) if cached.input_revision == input_revision => cached.value,
            _ => self.refresh_energy(),
        }
    }

    /// Recompute and cache the energy unconditionally.
    pub fn refresh_energy(&self) -> f64 {
        let value = self.model().energy(&self.activations());
        self.energy.set(Some(CachedEnergy {
            value,
            input_revision: self.input_revision(),
        }));
        value
    }

    /// Energy the lattice would have in configuration `state`. The lattice's
    /// own spins are left untouched.
    pub fn energy_of(&self, state: &State) -> Result<f64> {
        self.check_state(state)?;
        Ok(self.model().energy(&state.activations()))
    }

    /// Local field at spin `i` minus its threshold.
    pub fn energy_diff(&self, i: usize) -> f64 {
        self.model().energy_diff(&self.activations(), i)
    }

    /// `E(current with spin n flipped) - E(current)`.
    pub fn flip_energy_delta(&self, n: usize) -> f64 {
        self.model().flip_energy_delta(&self.activations(), n)
    }

    /// `dE/dw_ij = -1/2 * predecessor_i * self_j`.
    pub fn d_e_d_w(&self, i: usize, j: usize) -> f64 {
        self.model().d_e_d_w(&self.activations(), i, j)
    }

    /// [`Lattice::d_e_d_w`] now minus the same derivative with spin `n`
    /// flipped. Evaluated on a copy of the configuration, so the lattice
    /// never passes through the flipped state.
    pub fn bit_flipped_partial(&self, i: usize, j: usize, n: usize) -> f64 {
        self.model()
            .bit_flipped_partial(&self.activations(), i, j, n)
    }

    /// Probability of a Swendsen-Wang bond between spins `i` and `j` in
    /// configuration `state`: `1 - exp(-w_ij * s_i * s_j / T)`, clamped into
    /// `[0, 1]`. At zero temperature the limit is taken explicitly.
    pub fn pbond(&self, state: &State, i: usize, j: usize) -> Result<f64> {
        self.check_state(state)?;
        if !self.is_self_interacting() {
            return Err(SpinGlassError::InvalidTopology(
                "bond probabilities need a self-interacting lattice".to_string(),
            ));
        }
        let coupling =
            self.weights.get(i, j) * state.activation(i) as f64 * state.activation(j) as f64;
        if self.temperature <= 0.0 {
            return Ok(if coupling > 0.0 { 1.0 } else { 0.0 });
        }
        let raw = 1.0 - (-coupling / self.temperature).exp();
        Ok(raw.clamp(0.0, 1.0))
    }
}
