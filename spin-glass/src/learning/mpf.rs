use rayon::prelude::*;
use tracing::{debug, info, warn};
use validator::Validate;

use crate::config::MpfConfig;
use crate::error::{Result, SpinGlassError};
use crate::lattice::Lattice;
use crate::spins::{EnergyModel, Gradient, State};

/// Outcome of a converged [`Mpf::fit`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitReport {
    /// Weight updates applied.
    pub iterations: usize,
    /// Gradient norm at the point fitting stopped.
    pub magnitude: f64,
}

/// Minimum Probability Flow learner.
///
/// Fits a lattice's weights so that observed configurations lose as little
/// probability as possible to their single-bit-flip neighbors. The flow from
/// an observation `x` to its neighbor `x_n` is `exp((E(x) - E(x_n)) / 2)`.
#[derive(Debug, Clone)]
pub struct Mpf {
    config: MpfConfig,
}

impl Mpf {
    pub fn new(config: MpfConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[inline]
    pub fn config(&self) -> &MpfConfig {
        &self.config
    }

    /// Gradient of the probability flow out of `observations` with respect to
    /// every weight of `lattice`, shaped like its weighting.
    ///
    /// Observations are scored against the lattice's energy function without
    /// touching its spins.
    pub fn gradient(&self, observations: &[State], lattice: &Lattice) -> Result<Gradient> {
        if observations.is_empty() {
            return Err(SpinGlassError::EmptyObservations);
        }
        let n_spins = lattice.lattice_size();
        if let Some(bad) = observations.iter().find(|obs| obs.len() != n_spins) {
            return Err(SpinGlassError::DimensionMismatch {
                expected: n_spins,
                found: bad.len(),
            });
        }

        let model = lattice.model();
        let shape = (model.n_inputs(), model.n_spins());
        let mut total = if self.config.sequential {
            observations
                .iter()
                .fold(Gradient::zeros(shape.0, shape.1), |mut acc, obs| {
                    accumulate(&model, obs, &mut acc);
                    acc
                })
        } else {
            observations
                .par_iter()
                .fold(
                    || Gradient::zeros(shape.0, shape.1),
                    |mut acc, obs| {
                        accumulate(&model, obs, &mut acc);
                        acc
                    },
                )
                .reduce(
                    || Gradient::zeros(shape.0, shape.1),
                    |mut a, b| {
                        for (x, y) in a.values.iter_mut().zip(b.values) {
                            *x += y;
                        }
                        a
                    },
                )
        };

        let scale = self.config.learning_rate / observations.len() as f64;
        for v in total.values.iter_mut() {
            *v *= scale;
        }
        Ok(total)
    }

    /// Descend the flow gradient until its norm drops to the configured
    /// tolerance.
    ///
    /// Only weights change; the lattice's spins are never written. Returns
    /// [`SpinGlassError::NotConverged`] once `max_iterations` updates have
    /// been applied without reaching tolerance, leaving the updated weights
    /// in place.
    pub fn fit(&self, observations: &[State], lattice: &mut Lattice) -> Result<FitReport> {
        let tolerance = self.config.tolerance;
        for iteration in 0..self.config.max_iterations {
            let gradient = self.gradient(observations, lattice)?;
            let magnitude = gradient.magnitude();
            debug!(iteration, magnitude, "mpf gradient");
            if magnitude <= tolerance {
                info!(iterations = iteration, magnitude, "mpf converged");
                return Ok(FitReport {
                    iterations: iteration,
                    magnitude,
                });
            }
            lattice.update_weights(&gradient, self.config.step_size)?;
        }

        let iterations = self.config.max_iterations;
        let magnitude = self.gradient(observations, lattice)?.magnitude();
        if magnitude <= tolerance {
            info!(iterations, magnitude, "mpf converged");
            return Ok(FitReport {
                iterations,
                magnitude,
            });
        }
        warn!(iterations, magnitude, tolerance, "mpf iteration budget exhausted");
        Err(SpinGlassError::NotConverged {
            iterations,
            magnitude,
        })
    }
}

/// Add one observation's unscaled contribution
/// `sum_k bitFlippedPartial(i, j, k) * flow_k` to every entry of `acc`.
fn accumulate(model: &EnergyModel<'_>, obs: &State, acc: &mut Gradient) {
    let config = obs.activations();
    let n_spins = model.n_spins();
    let flow: Vec<f64> = (0..n_spins)
        .map(|k| (-0.5 * model.flip_energy_delta(&config, k)).exp())
        .collect();

    for i in 0..acc.n_rows {
        for j in 0..acc.n_cols {
            // the partial vanishes unless the flipped spin is i or j
            let mut g = model.bit_flipped_partial(&config, i, j, j) * flow[j];
            if i != j && i < n_spins {
                g += model.bit_flipped_partial(&config, i, j, i) * flow[i];
            }
            acc.values[i * acc.n_cols + j] += g;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn capped(max_iterations: usize) -> Mpf {
        Mpf::new(MpfConfig {
            max_iterations,
            ..MpfConfig::default()
        })
        .unwrap()
    }

    /// Total probability flow out of `observations`.
    fn flow(lattice: &Lattice, observations: &[State]) -> f64 {
        let model = lattice.model();
        observations
            .iter()
            .map(|obs| {
                let config = obs.activations();
                (0..config.len())
                    .map(|k| (-0.5 * model.flip_energy_delta(&config, k)).exp())
                    .sum::<f64>()
            })
            .sum()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let err = Mpf::new(MpfConfig {
            learning_rate: 0.0,
            ..MpfConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, SpinGlassError::InvalidConfig(_)));
    }

    #[test]
    fn test_empty_observations_rejected() {
        let mut lat = Lattice::interacting(3);
        let mpf = capped(10);
        assert!(matches!(
            mpf.gradient(&[], &lat),
            Err(SpinGlassError::EmptyObservations)
        ));
        assert!(matches!(
            mpf.fit(&[], &mut lat),
            Err(SpinGlassError::EmptyObservations)
        ));
    }

    #[test]
    fn test_observation_size_checked() {
        let mut lat = Lattice::interacting(3);
        let obs = [State::zeros(3), State::zeros(4)];
        assert!(matches!(
            capped(10).fit(&obs, &mut lat),
            Err(SpinGlassError::DimensionMismatch {
                expected: 3,
                found: 4
            })
        ));
    }

    #[test]
    fn test_all_off_observation_terminates() {
        let mut lat = Lattice::interacting(3);
        let obs = [lat.state()];
        let before = lat.state();

        match capped(50).fit(&obs, &mut lat) {
            Ok(_) | Err(SpinGlassError::NotConverged { .. }) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
        assert!(lat.weight(0, 1) > 0.0);
        for i in 0..3 {
            assert_eq!(lat.weight(i, i), 0.0);
            for j in 0..3 {
                assert_eq!(lat.weight(i, j), lat.weight(j, i));
            }
        }
        assert_eq!(lat.state(), before);
    }

    #[test]
    fn test_first_gradient_of_flat_lattice() {
        // zero weights: every flow is 1 and each off-diagonal entry collects
        // -1 from flipping i and -1 from flipping j
        let lat = Lattice::interacting(3);
        let g = capped(1).gradient(&[State::zeros(3)], &lat).unwrap();
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 0.0 } else { -2.0 };
                assert_relative_eq!(g.get(i, j), expected);
            }
        }
        assert_relative_eq!(g.magnitude(), 24f64.sqrt());
    }

    #[test]
    fn test_converged_before_any_update() {
        let mut lat = Lattice::interacting(3);
        let mpf = Mpf::new(MpfConfig {
            tolerance: 5.0,
            ..MpfConfig::default()
        })
        .unwrap();
        let report = mpf.fit(&[State::zeros(3)], &mut lat).unwrap();
        assert_eq!(report.iterations, 0);
        assert_eq!(lat.weight(0, 1), 0.0);
    }

    #[test]
    fn test_gradient_is_symmetric_for_hopfield() {
        let mut lat = Lattice::interacting(4).with_thresholds(&[0, 1, -1, 0]).unwrap();
        lat.set_weight(0, 2, 0.3);
        lat.set_weight(1, 3, -0.7);
        let obs = [
            State::from_bools(&[true, false, true, false]),
            State::from_bools(&[false, false, true, true]),
        ];
        let g = capped(1).gradient(&obs, &lat).unwrap();
        for i in 0..4 {
            for j in 0..4 {
                assert_relative_eq!(g.get(i, j), g.get(j, i), epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut lat = Lattice::interacting(5);
        lat.set_weight(0, 4, 0.25);
        lat.set_weight(2, 3, -1.0);
        let obs: Vec<State> = (0..32u32)
            .map(|k| State::from_bools(&(0..5).map(|b| (k >> b) & 1 == 1).collect::<Vec<_>>()))
            .collect();

        let seq = capped(1).gradient(&obs, &lat).unwrap();
        let par = Mpf::new(MpfConfig {
            sequential: false,
            ..MpfConfig::default()
        })
        .unwrap()
        .gradient(&obs, &lat)
        .unwrap();
        for (a, b) in seq.values.iter().zip(par.values.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_fit_reduces_flow() {
        let mut lat = Lattice::interacting(4);
        let obs = [
            State::from_bools(&[true, true, false, false]),
            State::from_bools(&[false, false, true, true]),
        ];
        let before = flow(&lat, &obs);
        let _ = capped(25).fit(&obs, &mut lat);
        assert!(flow(&lat, &obs) < before);
    }

    #[test]
    fn test_fitted_hopfield_recalls_pattern() {
        let pattern = State::from_bools(&[true, false, true, true, false, false]);
        let mut lat = Lattice::interacting(6);
        match capped(200).fit(std::slice::from_ref(&pattern), &mut lat) {
            Ok(_) | Err(SpinGlassError::NotConverged { .. }) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }

        for k in 0..6 {
            lat.set_spins(&pattern.flipped(k)).unwrap();
            lat.converge().unwrap();
            assert_eq!(lat.state(), pattern, "corrupted bit {k} not restored");
        }
    }

    #[test]
    fn test_layered_fit_leaves_predecessor_alone() {
        let visible = Lattice::interacting(3).into_shared();
        visible.borrow_mut().set_spin(1, true);
        let mut hidden = Lattice::layered(2, visible.clone());

        let obs = [State::from_bools(&[true, false])];
        let g = capped(1).gradient(&obs, &hidden).unwrap();
        assert_eq!((g.n_rows, g.n_cols), (3, 2));

        let _ = capped(20).fit(&obs, &mut hidden);
        // hidden 0 should be driven by visible 1, which is on
        assert!(hidden.weight(1, 0) > 0.0);
        assert_eq!(visible.borrow().activations(), vec![-1, 1, -1]);
        assert_eq!(hidden.state(), State::zeros(2));
    }
}
