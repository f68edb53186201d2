use crate::geometry::{Direction, SquareGrid};

/// Open/closed state of every nearest-neighbor bond of a [`SquareGrid`],
/// stored on the grid's doubled cell layout.
#[derive(Debug, Clone)]
pub struct BondGrid {
    grid: SquareGrid,
    cells: Vec<bool>,
}

impl BondGrid {
    pub fn new(grid: SquareGrid) -> Self {
        let side = grid.cell_side();
        Self {
            grid,
            cells: vec![false; side * side],
        }
    }

    #[inline]
    pub fn grid(&self) -> &SquareGrid {
        &self.grid
    }

    pub fn clear(&mut self) {
        self.cells.fill(false);
    }

    /// Open or close the bond from `site` in direction `dir`.
    ///
    /// `site` must have a neighbor in that direction; debug builds check it.
    pub fn set(&mut self, site: usize, dir: Direction, bonded: bool) {
        debug_assert!(
            self.grid.neighbor(site, dir).is_some(),
            "site {site} has no {dir:?} neighbor"
        );
        let idx = self.grid.cell_index(self.grid.bond_cell(site, dir));
        self.cells[idx] = bonded;
    }

    /// False on the grid edge, where the bond does not exist.
    #[inline]
    pub fn is_bonded(&self, site: usize, dir: Direction) -> bool {
        match self.grid.neighbor(site, dir) {
            Some(_) => self.cells[self.grid.cell_index(self.grid.bond_cell(site, dir))],
            None => false,
        }
    }

    /// True iff `a` and `b` are nearest neighbors joined by an open bond.
    pub fn connects(&self, a: usize, b: usize) -> bool {
        self.grid
            .bond_between(a, b)
            .is_some_and(|cell| self.cells[self.grid.cell_index(cell)])
    }

    pub fn count(&self) -> usize {
        self.cells.iter().filter(|&&b| b).count()
    }
}
