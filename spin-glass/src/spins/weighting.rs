use crate::error::{Result, SpinGlassError};

/// How a [`Weighting`] connects its two spin groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coupling {
    /// Square, symmetric, zero diagonal: a lattice interacting with itself.
    Symmetric,
    /// Rectangular `n_from x n_to`, unconstrained: predecessor feeding a layer.
    Directed,
}

/// Dense row-major matrix with the shape of a [`Weighting`].
#[derive(Debug, Clone, PartialEq)]
pub struct Gradient {
    pub n_rows: usize,
    pub n_cols: usize,
    pub values: Vec<f64>,
}

impl Gradient {
    pub fn zeros(n_rows: usize, n_cols: usize) -> Self {
        Self {
            n_rows,
            n_cols,
            values: vec![0.0; n_rows * n_cols],
        }
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.n_cols + j]
    }

    /// Euclidean norm over all entries.
    pub fn magnitude(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum::<f64>().sqrt()
    }
}

/// Pairwise coupling weights. Entry `(i, j)` couples spin `i` of the
/// predecessor group to spin `j` of the receiving group.
#[derive(Debug, Clone, PartialEq)]
pub struct Weighting {
    coupling: Coupling,
    n_from: usize,
    n_to: usize,
    weights: Vec<f64>,
}

impl Weighting {
    /// All-zero weights for a self-interacting (Hopfield) lattice of `n` spins.
    pub fn symmetric(n: usize) -> Self {
        Self {
            coupling: Coupling::Symmetric,
            n_from: n,
            n_to: n,
            weights: vec![0.0; n * n],
        }
    }

    /// All-zero weights from a predecessor of `n_from` spins into `n_to` spins.
    pub fn directed(n_from: usize, n_to: usize) -> Self {
        Self {
            coupling: Coupling::Directed,
            n_from,
            n_to,
            weights: vec![0.0; n_from * n_to],
        }
    }

    #[inline]
    pub fn coupling(&self) -> Coupling {
        self.coupling
    }

    #[inline]
    pub fn n_from(&self) -> usize {
        self.n_from
    }

    #[inline]
    pub fn n_to(&self) -> usize {
        self.n_to
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        debug_assert!(i < self.n_from && j < self.n_to, "weight ({i}, {j}) out of range");
        self.weights[i * self.n_to + j]
    }

    /// Set weight `(i, j)`. Symmetric weightings mirror the write to `(j, i)`
    /// and pin the diagonal to zero.
    pub fn set(&mut self, i: usize, j: usize, w: f64) {
        debug_assert!(i < self.n_from && j < self.n_to, "weight ({i}, {j}) out of range");
        match self.coupling {
            Coupling::Directed => self.weights[i * self.n_to + j] = w,
            Coupling::Symmetric if i == j => self.weights[i * self.n_to + j] = 0.0,
            Coupling::Symmetric => {
                self.weights[i * self.n_to + j] = w;
                self.weights[j * self.n_to + i] = w;
            }
        }
    }

    /// Row `i` of the matrix: the weights leaving predecessor spin `i`.
    #[inline]
    pub fn row(&self, i: usize) -> &[f64] {
        &self.weights[i * self.n_to..(i + 1) * self.n_to]
    }

    /// `w -= eps * gradient`. The gradient must have exactly this shape.
    ///
    /// Symmetric weightings step both mirrored entries by the mean of the two
    /// gradient entries, so symmetry and the zero diagonal survive any input.
    pub fn gradient_descent(&mut self, gradient: &Gradient, eps: f64) -> Result<()> {
        if gradient.n_rows != self.n_from {
            return Err(SpinGlassError::DimensionMismatch {
                expected: self.n_from,
                found: gradient.n_rows,
            });
        }
        if gradient.n_cols != self.n_to {
            return Err(SpinGlassError::DimensionMismatch {
                expected: self.n_to,
                found: gradient.n_cols,
            });
        }

        match self.coupling {
            Coupling::Directed => {
                for (w, g) in self.weights.iter_mut().zip(gradient.values.iter()) {
                    *w -= eps * g;
                }
            }
            Coupling::Symmetric => {
                let n = self.n_to;
                for i in 0..n {
                    for j in (i + 1)..n {
                        let g = 0.5 * (gradient.get(i, j) + gradient.get(j, i));
                        let w = self.weights[i * n + j] - eps * g;
                        self.weights[i * n + j] = w;
                        self.weights[j * n + i] = w;
                    }
                }
            }
        }
        Ok(())
    }
}
