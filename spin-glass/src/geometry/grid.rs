use crate::error::{Result, SpinGlassError};

/// Forward bond directions on the open square grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Right,
    Below,
}

/// `dim x dim` square grid with open (non-periodic) boundaries.
///
/// Sites are indexed in row-major order: `(row, col) -> row * dim + col`.
///
/// Bonds live on a doubled grid of side `2 * dim - 1`. Site `(r, c)` sits at
/// cell `(2r, 2c)`, its bond to the right neighbor at `(2r, 2c + 1)` and its
/// bond to the neighbor below at `(2r + 1, 2c)`. Cells with both coordinates
/// odd are never addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SquareGrid {
    dim: usize,
}

impl SquareGrid {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    /// Lay `n_spins` out as a square grid; fails unless `n_spins` is a
    /// non-zero perfect square.
    pub fn try_from_spins(n_spins: usize) -> Result<Self> {
        let mut dim = (n_spins as f64).sqrt().round() as usize;
        // guard against float rounding on very large inputs
        while dim * dim > n_spins {
            dim -= 1;
        }
        while (dim + 1) * (dim + 1) <= n_spins {
            dim += 1;
        }
        if n_spins == 0 || dim * dim != n_spins {
            return Err(SpinGlassError::InvalidTopology(format!(
                "{n_spins} spins cannot be arranged on a square grid"
            )));
        }
        Ok(Self { dim })
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn n_sites(&self) -> usize {
        self.dim * self.dim
    }

    /// Number of nearest-neighbor bonds: `2 * dim * (dim - 1)`.
    #[inline]
    pub fn n_bonds(&self) -> usize {
        2 * self.dim * self.dim.saturating_sub(1)
    }

    #[inline]
    pub fn site(&self, row: usize, col: usize) -> usize {
        debug_assert!(row < self.dim && col < self.dim);
        row * self.dim + col
    }

    #[inline]
    pub fn coords(&self, site: usize) -> (usize, usize) {
        (site / self.dim, site % self.dim)
    }

    /// Forward neighbor of `site`, `None` on the right or bottom edge.
    #[inline]
    pub fn neighbor(&self, site: usize, dir: Direction) -> Option<usize> {
        let (row, col) = self.coords(site);
        match dir {
            Direction::Right if col + 1 < self.dim => Some(site + 1),
            Direction::Below if row + 1 < self.dim => Some(site + self.dim),
            _ => None,
        }
    }

    /// Every bond as `(site, neighbor, direction)` in raster order of `site`,
    /// the right bond before the one below.
    pub fn bonds(&self) -> impl Iterator<Item = (usize, usize, Direction)> + '_ {
        (0..self.n_sites()).flat_map(move |site| {
            [Direction::Right, Direction::Below]
                .into_iter()
                .filter_map(move |dir| self.neighbor(site, dir).map(|nb| (site, nb, dir)))
        })
    }

    /// Side length of the doubled cell grid.
    #[inline]
    pub fn cell_side(&self) -> usize {
        (2 * self.dim).saturating_sub(1)
    }

    #[inline]
    pub fn site_cell(&self, site: usize) -> (usize, usize) {
        let (row, col) = self.coords(site);
        (2 * row, 2 * col)
    }

    /// Doubled-grid cell holding the bond from `site` in direction `dir`.
    #[inline]
    pub fn bond_cell(&self, site: usize, dir: Direction) -> (usize, usize) {
        let (row, col) = self.site_cell(site);
        match dir {
            Direction::Right => (row, col + 1),
            Direction::Below => (row + 1, col),
        }
    }

    /// Cell of the bond joining two adjacent sites, in either order.
    /// `None` when the sites are not nearest neighbors.
    pub fn bond_between(&self, a: usize, b: usize) -> Option<(usize, usize)> {
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        [Direction::Right, Direction::Below]
            .into_iter()
            .find(|&dir| self.neighbor(lo, dir) == Some(hi))
            .map(|dir| self.bond_cell(lo, dir))
    }

    /// Flat offset of a doubled-grid cell.
    #[inline]
    pub fn cell_index(&self, cell: (usize, usize)) -> usize {
        cell.0 * self.cell_side() + cell.1
    }
}
