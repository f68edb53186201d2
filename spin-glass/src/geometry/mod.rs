pub mod grid;

pub use grid::{Direction, SquareGrid};
