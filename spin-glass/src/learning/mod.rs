//! Weight learning.

pub mod mpf;

pub use mpf::{FitReport, Mpf};
