//! Bond percolation and cluster labeling on square grids.

pub mod bonds;
pub mod hoshen_kopelman;
pub mod swendsen_wang;
pub mod union_find;

pub use bonds::BondGrid;
pub use hoshen_kopelman::{hoshen_kopelman, ClusterLabels};
pub use swendsen_wang::SwendsenWang;
pub use union_find::LabelForest;
