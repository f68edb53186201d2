use std::sync::atomic::{AtomicBool, Ordering};

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;
use tracing::{debug, warn};

use super::bonds::BondGrid;
use super::hoshen_kopelman::{hoshen_kopelman, ClusterLabels};
use super::union_find::LabelForest;
use crate::error::{Result, SpinGlassError};
use crate::geometry::SquareGrid;
use crate::lattice::Lattice;
use crate::spins::State;

/// Swendsen-Wang cluster sampler over a self-interacting lattice laid out as
/// a `d x d` square grid with open boundaries.
///
/// Each proposal percolates bonds between aligned nearest neighbors, labels
/// the resulting clusters and flips the cluster under one uniformly chosen
/// site. Proposals are filtered through a Metropolis test on the lattice
/// energy at the lattice's current temperature. The lattice itself is only
/// read.
pub struct SwendsenWang<'a> {
    lattice: &'a Lattice,
    grid: SquareGrid,
    bonds: BondGrid,
    forest: LabelForest,
    labels: Option<ClusterLabels>,
    rng: Xoshiro256StarStar,
}

impl<'a> SwendsenWang<'a> {
    pub fn new(lattice: &'a Lattice, seed: u64) -> Result<Self> {
        if !lattice.is_self_interacting() {
            return Err(SpinGlassError::InvalidTopology(
                "cluster sampling needs a self-interacting lattice".to_string(),
            ));
        }
        let grid = SquareGrid::try_from_spins(lattice.lattice_size())?;
        Ok(Self {
            lattice,
            grid,
            bonds: BondGrid::new(grid),
            forest: LabelForest::with_capacity(grid.n_sites()),
            labels: None,
            rng: Xoshiro256StarStar::seed_from_u64(seed),
        })
    }

    #[inline]
    pub fn grid(&self) -> &SquareGrid {
        &self.grid
    }

    /// Bonds drawn by the most recent proposal.
    #[inline]
    pub fn bonds(&self) -> &BondGrid {
        &self.bonds
    }

    /// Cluster labeling of the most recent proposal, if any.
    #[inline]
    pub fn cluster_labels(&self) -> Option<&ClusterLabels> {
        self.labels.as_ref()
    }

    fn check_state(&self, state: &State) -> Result<()> {
        if state.len() != self.grid.n_sites() {
            return Err(SpinGlassError::DimensionMismatch {
                expected: self.grid.n_sites(),
                found: state.len(),
            });
        }
        Ok(())
    }

    /// Redraw every nearest-neighbor bond for configuration `state`.
    pub fn update_bonds(&mut self, state: &State) -> Result<()> {
        self.check_state(state)?;
        self.bonds.clear();
        for (a, b, dir) in self.grid.bonds() {
            let p = self.lattice.pbond(state, a, b)?;
            let bonded = p >= 1.0 || (p > 0.0 && self.rng.gen::<f64>() < p);
            if bonded {
                self.bonds.set(a, dir, true);
            }
        }
        Ok(())
    }

    /// Propose the next state: draw bonds, label clusters, flip the cluster of
    /// a random site.
    pub fn pick_state(&mut self, current: &State) -> Result<State> {
        self.update_bonds(current)?;
        let labels = hoshen_kopelman(&self.bonds, &mut self.forest);

        let seed = self.rng.gen_range(0..self.grid.n_sites());
        let mut bits: Vec<bool> = (0..current.len()).map(|i| current.spin(i)).collect();
        for &site in labels.cluster_of(seed) {
            bits[site] = !bits[site];
        }
        self.labels = Some(labels);
        Ok(State::from_bools(&bits))
    }

    /// Metropolis test for moving from energy `current` to `proposed`.
    fn accept(&mut self, current: f64, proposed: f64) -> bool {
        let delta = proposed - current;
        if delta <= 0.0 {
            return true;
        }
        let temp = self.lattice.temperature();
        if temp <= 0.0 {
            return false;
        }
        self.rng.gen::<f64>() < (-delta / temp).exp()
    }

    /// Run `n_samples` Metropolis steps from `initial` and return the accepted
    /// states in order.
    pub fn sample(&mut self, n_samples: usize, initial: &State) -> Result<Vec<State>> {
        self.run_chain(n_samples, initial, &AtomicBool::new(false), &|| {})
    }

    /// [`SwendsenWang::sample`] with a cooperative interrupt flag, checked
    /// before every step, and a callback invoked after every step.
    pub fn run_chain(
        &mut self,
        n_samples: usize,
        initial: &State,
        interrupted: &AtomicBool,
        on_step: &(dyn Fn() + Sync),
    ) -> Result<Vec<State>> {
        self.check_state(initial)?;

        let mut current = initial.clone();
        let mut current_energy = self.lattice.energy_of(&current)?;
        let mut accepted = Vec::new();

        for step in 0..n_samples {
            if interrupted.load(Ordering::Relaxed) {
                warn!(completed = step, "sampling interrupted");
                return Err(SpinGlassError::Interrupted { completed: step });
            }

            let proposal = self.pick_state(&current)?;
            let proposal_energy = self.lattice.energy_of(&proposal)?;
            if self.accept(current_energy, proposal_energy) {
                current = proposal;
                current_energy = proposal_energy;
                accepted.push(current.clone());
            }
            on_step();
        }

        debug!(
            steps = n_samples,
            accepted = accepted.len(),
            temperature = self.lattice.temperature(),
            "sampling finished"
        );
        Ok(accepted)
    }
}
