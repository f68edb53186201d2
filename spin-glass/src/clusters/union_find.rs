/// Label-equivalence forest with path compression and union by rank.
///
/// Labels are dense `u32` ids handed out by [`LabelForest::make_label`]. The
/// forest knows nothing about grids, so any labeling pass can reuse it.
#[derive(Debug, Clone, Default)]
pub struct LabelForest {
    parent: Vec<u32>,
    rank: Vec<u8>,
}

impl LabelForest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(n: usize) -> Self {
        Self {
            parent: Vec::with_capacity(n),
            rank: Vec::with_capacity(n),
        }
    }

    /// Forest of `n` singleton labels `0..n`.
    pub fn singletons(n: usize) -> Self {
        Self {
            parent: (0..n as u32).collect(),
            rank: vec![0; n],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Drop every label, keeping the allocation.
    pub fn clear(&mut self) {
        self.parent.clear();
        self.rank.clear();
    }

    /// A fresh label that is its own root.
    pub fn make_label(&mut self) -> u32 {
        let label = self.parent.len() as u32;
        self.parent.push(label);
        self.rank.push(0);
        label
    }

    /// Root of `x`. Every label visited on the way is re-parented directly
    /// onto the root.
    pub fn find(&mut self, x: u32) -> u32 {
        let mut root = x;
        while self.parent[root as usize] != root {
            root = self.parent[root as usize];
        }
        let mut cur = x;
        while self.parent[cur as usize] != root {
            let next = self.parent[cur as usize];
            self.parent[cur as usize] = root;
            cur = next;
        }
        root
    }

    /// Merge the classes of `x` and `y`, returning the surviving root.
    pub fn union(&mut self, x: u32, y: u32) -> u32 {
        let rx = self.find(x);
        let ry = self.find(y);
        if rx == ry {
            return rx;
        }
        if self.rank[rx as usize] < self.rank[ry as usize] {
            self.parent[rx as usize] = ry;
            ry
        } else {
            self.parent[ry as usize] = rx;
            if self.rank[rx as usize] == self.rank[ry as usize] {
                self.rank[rx as usize] += 1;
            }
            rx
        }
    }

    /// Direct parent of `x` (for inspecting compression).
    #[inline]
    pub fn parent(&self, x: u32) -> u32 {
        self.parent[x as usize]
    }
}
