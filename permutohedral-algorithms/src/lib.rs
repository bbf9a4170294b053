#![warn(clippy::all)]
//! Gaussian filtering on the permutohedral lattice.
//!
//! Both filters take their inputs as `nalgebra` matrices with one sample per row: a `N x d` feature matrix
//! and a `N x M` value matrix. The output is aligned row-for-row with the evaluated features.

// One-shot filtering: build a lattice from a set of samples and filter their own values over it.
pub mod filter;
// Build a lattice once from reference samples, then evaluate it at many query positions.
pub mod preload;
mod rows;

pub use self::filter::LatticeFilter;
pub use self::preload::PreloadedLattice;
