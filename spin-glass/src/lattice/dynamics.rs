use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, warn};

use super::{Lattice, Topology};
use crate::error::{Result, SpinGlassError};

/// Work done by one call to [`Lattice::converge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Convergence {
    /// Stochastic single-spin updates made while cooling to zero temperature.
    pub anneal_steps: usize,
    /// Full update passes, the last of which changed nothing (a single sweep
    /// for a layered lattice).
    pub passes: usize,
}

/// `1 / (1 + exp(-x))` without overflowing for large `|x|`.
#[inline]
fn logistic(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

impl Lattice {
    /// Update spin `i` from its inputs.
    ///
    /// At temperature 0 the unit is a deterministic binary threshold unit;
    /// above 0 it activates with the logistic probability of
    /// `energy_diff(i) / temperature`. The zero branch is what keeps the
    /// division well-defined.
    pub fn update_spin(&mut self, i: usize) {
        if self.temperature > 0.0 {
            self.boltzmann_spin_update(i);
        } else {
            self.zero_temp_spin_update(i);
        }
    }

    fn zero_temp_spin_update(&mut self, i: usize) {
        let sum = self.model().local_field(&self.activations(), i);
        let activate = sum > self.get_threshold(i) as f64;
        self.set_if_changed(i, activate);
    }

    fn boltzmann_spin_update(&mut self, i: usize) {
        debug_assert!(self.temperature > 0.0);
        let p_on = logistic(self.energy_diff(i) / self.temperature);
        let activate = self.rng.gen::<f64>() < p_on;
        self.set_if_changed(i, activate);
    }

    #[inline]
    fn set_if_changed(&mut self, i: usize, activate: bool) {
        if self.spins[i].is_active() != activate {
            self.set_spin(i, activate);
        }
    }

    /// Relax the lattice.
    ///
    /// - Layered: one in-order sweep of [`Lattice::update_spin`] at the current
    ///   temperature.
    /// - Self-interacting with a set point above zero: simulated annealing
    ///   from the set point, one stochastic update of a random spin per step
    ///   while the temperature drops by the configured step, down to exactly
    ///   0. Then the zero-temperature relaxation below. Every call anneals
    ///   again from the set point.
    /// - Self-interacting with a zero set point: passes over all spins in a
    ///   fresh random order until a whole pass changes nothing.
    ///
    /// Fails with [`SpinGlassError::AnnealLimit`] if annealing runs out of
    /// steps or the step is too small to lower the temperature, and with
    /// [`SpinGlassError::RelaxationLimit`] if no fixed point is reached within
    /// the configured number of passes.
    pub fn converge(&mut self) -> Result<Convergence> {
        if let Topology::Layered(_) = self.topology {
            for i in 0..self.lattice_size() {
                self.update_spin(i);
            }
            return Ok(Convergence {
                anneal_steps: 0,
                passes: 1,
            });
        }

        let anneal_steps = self.anneal()?;
        let passes = self.relax()?;
        Ok(Convergence {
            anneal_steps,
            passes,
        })
    }

    fn anneal(&mut self) -> Result<usize> {
        let n = self.lattice_size();
        let start = self.set_temperature;
        self.temperature = if n == 0 { 0.0 } else { start };

        let max_steps = self.anneal.max_anneal_steps;
        let mut steps = 0;
        while self.temperature > 0.0 {
            let next = (self.temperature - self.anneal.step).max(0.0);
            if steps == max_steps || next == self.temperature {
                warn!(start, steps, temperature = self.temperature, "annealing budget exhausted");
                return Err(SpinGlassError::AnnealLimit {
                    steps,
                    temperature: self.temperature,
                });
            }
            let i = self.rng.gen_range(0..n);
            self.update_spin(i);
            self.temperature = next;
            steps += 1;
        }
        if steps > 0 {
            debug!(start, steps, energy = self.energy(), "annealed to zero temperature");
        }
        Ok(steps)
    }

    fn relax(&mut self) -> Result<usize> {
        let n = self.lattice_size();
        let max_passes = self.anneal.max_relaxation_passes;
        let mut order: Vec<usize> = (0..n).collect();

        for pass in 1..=max_passes {
            order.shuffle(&mut self.rng);
            let before = self.state();
            for &i in &order {
                self.update_spin(i);
            }
            if self.state() == before {
                debug!(passes = pass, energy = self.energy(), "reached fixed point");
                return Ok(pass);
            }
        }

        warn!(max_passes, "relaxation pass limit reached");
        Err(SpinGlassError::RelaxationLimit { passes: max_passes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnnealConfig;
    use crate::spins::State;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;

    fn two_spin(weight: f64) -> Lattice {
        let mut lat = Lattice::interacting(2);
        lat.set_weight(0, 1, weight);
        lat
    }

    fn random_hopfield(n: usize, seed: u64) -> Lattice {
        let mut rng = Xoshiro256StarStar::seed_from_u64(seed);
        let mut lat = Lattice::interacting(n).with_seed(seed);
        for i in 0..n {
            for j in (i + 1)..n {
                lat.set_weight(i, j, rng.gen_range(-1.0..1.0));
            }
            lat.set_spin(i, rng.gen::<bool>());
        }
        lat
    }

    #[test]
    fn test_logistic_is_stable() {
        assert_eq!(logistic(0.0), 0.5);
        assert_eq!(logistic(1e4), 1.0);
        assert_eq!(logistic(-1e4), 0.0);
        assert!((logistic(2.0) + logistic(-2.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_off_pair_stays_off() {
        let mut lat = two_spin(5.0);
        let report = lat.converge().unwrap();
        assert_eq!(lat.get_spin(0), -1);
        assert_eq!(lat.get_spin(1), -1);
        assert_eq!(report.anneal_steps, 0);
        assert_eq!(report.passes, 1);
    }

    #[test]
    fn test_active_neighbor_turns_spin_on() {
        let mut lat = two_spin(5.0);
        lat.set_spin(0, true);
        lat.update_spin(1);
        assert_eq!(lat.get_spin(1), 1);
    }

    #[test]
    fn test_threshold_is_strict() {
        // field of exactly the threshold does not activate
        let mut lat = Lattice::interacting(2).with_thresholds(&[0, 5]).unwrap();
        lat.set_weight(0, 1, 5.0);
        lat.set_spin(0, true);
        lat.set_spin(1, true);
        lat.update_spin(1);
        assert_eq!(lat.get_spin(1), -1);
    }

    #[test]
    fn test_zero_temperature_converge_is_idempotent() {
        for seed in 0..8 {
            let mut lat = random_hopfield(12, seed);
            lat.converge().unwrap();
            let fixed = lat.state();
            let energy = lat.energy();
            let second = lat.converge().unwrap();
            assert_eq!(second.passes, 1);
            assert_eq!(lat.state(), fixed);
            assert_eq!(lat.energy(), energy);
        }
    }

    #[test]
    fn test_relaxation_never_raises_energy() {
        for seed in 0..8 {
            let mut lat = random_hopfield(10, 100 + seed);
            let start = lat.energy();
            lat.converge().unwrap();
            assert!(lat.energy() <= start + 1e-12);
        }
    }

    #[test]
    fn test_annealing_cools_to_zero_and_settles() {
        let mut lat = random_hopfield(9, 7);
        lat.set_anneal_config(AnnealConfig {
            step: 0.25,
            ..AnnealConfig::default()
        })
        .unwrap();
        lat.set_temperature(2.0).unwrap();

        let report = lat.converge().unwrap();
        assert_eq!(report.anneal_steps, 8);
        assert_eq!(lat.temperature(), 0.0);
        assert_eq!(lat.set_point(), 2.0);

        // the next call anneals again from the set point
        let again = lat.converge().unwrap();
        assert_eq!(again.anneal_steps, 8);
        assert_eq!(lat.temperature(), 0.0);

        lat.reset_temperature();
        assert_eq!(lat.temperature(), 2.0);
    }

    #[test]
    fn test_annealing_step_budget() {
        let mut lat = random_hopfield(4, 1);
        lat.set_anneal_config(AnnealConfig {
            step: 0.1,
            max_anneal_steps: 5,
            ..AnnealConfig::default()
        })
        .unwrap();
        lat.set_temperature(1.0).unwrap();
        match lat.converge() {
            Err(SpinGlassError::AnnealLimit { steps, temperature }) => {
                assert_eq!(steps, 5);
                assert!(temperature > 0.0 && temperature < 1.0);
            }
            other => panic!("expected AnnealLimit, got {other:?}"),
        }
    }

    #[test]
    fn test_annealing_step_below_float_resolution() {
        // 1e17 - 0.01 rounds back to 1e17, so the temperature can never drop
        let mut lat = Lattice::interacting(4);
        lat.set_temperature(1e17).unwrap();
        assert!(matches!(
            lat.converge(),
            Err(SpinGlassError::AnnealLimit { steps: 0, .. })
        ));
    }

    #[test]
    fn test_annealing_is_reproducible_with_seed() {
        let run = |seed| {
            let mut lat = random_hopfield(16, 3).with_seed(seed);
            lat.set_temperature(1.0).unwrap();
            lat.converge().unwrap();
            lat.state()
        };
        assert_eq!(run(11), run(11));
    }

    #[test]
    fn test_relaxation_limit() {
        let mut ferro = Lattice::interacting(4);
        for i in 0..4 {
            for j in (i + 1)..4 {
                ferro.set_weight(i, j, 1.0);
            }
        }
        ferro
            .set_anneal_config(AnnealConfig {
                step: 0.1,
                max_relaxation_passes: 1,
                ..AnnealConfig::default()
            })
            .unwrap();
        // spin 3 sees a field of 3 and must turn on in the first pass
        ferro
            .set_spins(&State::from_bools(&[true, true, true, false]))
            .unwrap();
        assert!(matches!(
            ferro.converge(),
            Err(SpinGlassError::RelaxationLimit { passes: 1 })
        ));
    }

    #[test]
    fn test_layered_converge_is_single_sweep() {
        let visible = Lattice::interacting(2).into_shared();
        visible.borrow_mut().set_spin(0, true);

        let mut hidden = Lattice::layered(3, visible.clone());
        hidden.set_weight(0, 0, 1.0); // driven on by visible 0
        hidden.set_weight(1, 1, 1.0); // visible 1 is off
        hidden.set_weight(0, 2, -1.0);
        hidden.set_weight(1, 2, -1.0); // 2 sees -1 + 1 = 0, stays off

        let report = hidden.converge().unwrap();
        assert_eq!(report.passes, 1);
        assert_eq!(hidden.activations(), vec![1, -1, -1]);
        // input lattice is read, never written
        assert_eq!(visible.borrow().activations(), vec![1, -1]);
    }

    #[test]
    fn test_boltzmann_update_follows_field() {
        let mut lat = two_spin(50.0).with_seed(9);
        lat.set_temperature(1.0).unwrap();
        lat.set_spin(0, true);
        let mut on = 0;
        for _ in 0..200 {
            lat.set_spin(1, false);
            lat.update_spin(1);
            if lat.get_spin(1) == 1 {
                on += 1;
            }
        }
        assert_eq!(on, 200);
    }
}
