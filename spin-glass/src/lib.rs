//! Binary-spin energy models.
//!
//! A [`Lattice`] is either a self-interacting Hopfield network or a layer fed
//! by another lattice. Lattices relax deterministically or by annealed
//! Boltzmann updates, learn weights with Minimum Probability Flow ([`Mpf`])
//! and are sampled with Swendsen-Wang cluster moves ([`SwendsenWang`]).

pub mod clusters;
pub mod config;
pub mod error;
pub mod geometry;
pub mod lattice;
pub mod learning;
pub mod spins;

pub use clusters::{ClusterLabels, SwendsenWang};
pub use config::{AnnealConfig, MpfConfig};
pub use error::{Result, SpinGlassError};
pub use geometry::SquareGrid;
pub use lattice::{Convergence, Lattice, SharedLattice, Topology};
pub use learning::{FitReport, Mpf};
pub use spins::{Gradient, Spin, State, Weighting};
