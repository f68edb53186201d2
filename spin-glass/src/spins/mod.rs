pub mod energy;
pub mod state;
pub mod weighting;

pub use energy::{EnergyModel, Input};
pub use state::{BitFlips, State};
pub use weighting::{Coupling, Gradient, Weighting};

/// A binary unit with activation +1/-1 and a fixed activation threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spin {
    activation: i8,
    threshold: i32,
}

impl Spin {
    pub fn new(activated: bool) -> Self {
        Self::with_threshold(activated, 0)
    }

    pub fn with_threshold(activated: bool, threshold: i32) -> Self {
        Self {
            activation: if activated { 1 } else { -1 },
            threshold,
        }
    }

    /// +1 if activated, otherwise -1.
    #[inline]
    pub fn get(&self) -> i8 {
        self.activation
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.activation > 0
    }

    #[inline]
    pub fn threshold(&self) -> i32 {
        self.threshold
    }

    #[inline]
    pub fn set(&mut self, activated: bool) {
        self.activation = if activated { 1 } else { -1 };
    }

    #[inline]
    pub fn flip(&mut self) {
        self.activation = -self.activation;
    }
}

impl Default for Spin {
    fn default() -> Self {
        Self::new(false)
    }
}
