#![warn(clippy::all)]

//! Core data structures of the permutohedral lattice
//!
//! The permutohedral lattice tiles a d-dimensional feature space with simplices whose vertices are integer
//! points summing to zero. Gaussian filtering in feature space then becomes three cheap passes over the
//! sparse set of lattice vertices that the input actually touches: *splat*, *blur* and *slice*.
//!
//! This crate contains the building blocks: the [coordinate mapper](crate::lattice::LatticeCoordinateMapper),
//! the [hashed vertex table](crate::lattice::VertexHashTable), the [neighbor graph](crate::lattice::NeighborGraph)
//! and the scalar and wide-lane [compute kernels](crate::kernel::ComputeKernel). The filters that orchestrate
//! them live in `permutohedral-algorithms`.

pub extern crate nalgebra;

mod error;
pub use self::error::*;

/// Scalar and wide-lane row kernels used by the splat, blur and slice passes
pub mod kernel;
/// Lattice coordinates, the vertex table and the passes operating on them
pub mod lattice;
mod options;
pub use self::options::*;

#[cfg(test)]
pub(crate) mod test_utils;
