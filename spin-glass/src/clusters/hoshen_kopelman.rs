use std::collections::HashMap;

use super::bonds::BondGrid;
use super::union_find::LabelForest;
use crate::geometry::Direction;

/// Connected components of a bonded square grid.
///
/// Cluster ids are canonical: `0..n_clusters`, numbered in raster order of
/// each cluster's first site. Sites without any open bond form singleton
/// clusters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterLabels {
    labels: Vec<u32>,
    members: Vec<Vec<usize>>,
}

impl ClusterLabels {
    #[inline]
    pub fn label(&self, site: usize) -> u32 {
        self.labels[site]
    }

    /// Cluster id of every site, indexed by site.
    #[inline]
    pub fn labels(&self) -> &[u32] {
        &self.labels
    }

    #[inline]
    pub fn n_clusters(&self) -> usize {
        self.members.len()
    }

    /// Sites of cluster `id`, in raster order.
    #[inline]
    pub fn members(&self, id: u32) -> &[usize] {
        &self.members[id as usize]
    }

    /// Sites sharing a cluster with `site`, including `site` itself.
    #[inline]
    pub fn cluster_of(&self, site: usize) -> &[usize] {
        self.members(self.labels[site])
    }

    /// Cluster sizes, largest first.
    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes: Vec<usize> = self.members.iter().map(Vec::len).collect();
        sizes.sort_unstable_by(|a, b| b.cmp(a));
        sizes
    }
}

/// Label the clusters of `bonds` with the Hoshen-Kopelman raster scan.
///
/// Each site looks back at its left and upper neighbors. With no open bond to
/// either it opens a new provisional label; bonded to one it takes that
/// neighbor's resolved label; bonded to both it unions the two labels and
/// takes the merged root. `forest` is cleared first and left holding the
/// provisional labels.
pub fn hoshen_kopelman(bonds: &BondGrid, forest: &mut LabelForest) -> ClusterLabels {
    let grid = bonds.grid();
    let dim = grid.dim();
    let n_sites = grid.n_sites();

    forest.clear();
    let mut provisional = vec![0u32; n_sites];

    for site in 0..n_sites {
        let (row, col) = grid.coords(site);
        let left = col > 0 && bonds.is_bonded(site - 1, Direction::Right);
        let up = row > 0 && bonds.is_bonded(site - dim, Direction::Below);

        provisional[site] = match (left, up) {
            (false, false) => forest.make_label(),
            (true, false) => forest.find(provisional[site - 1]),
            (false, true) => forest.find(provisional[site - dim]),
            (true, true) => forest.union(provisional[site - 1], provisional[site - dim]),
        };
    }

    let mut canonical: HashMap<u32, u32> = HashMap::new();
    let mut labels = vec![0u32; n_sites];
    let mut members: Vec<Vec<usize>> = Vec::new();
    for site in 0..n_sites {
        let root = forest.find(provisional[site]);
        let id = *canonical.entry(root).or_insert_with(|| {
            members.push(Vec::new());
            (members.len() - 1) as u32
        });
        labels[site] = id;
        members[id as usize].push(site);
    }

    ClusterLabels { labels, members }
}
