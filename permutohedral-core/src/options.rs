#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{LatticeError, Result};

/// Which row kernel the filters should use for splat, blur and slice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum KernelSelection {
    /// Use the wide-lane kernel if the platform supports it and the value rows are wide enough to profit
    Auto,
    /// Always use the scalar reference kernel
    Scalar,
    /// Always use the wide-lane kernel (emulated on platforms without vector registers)
    Wide,
}

/// How the extra neighbor-mixing pass of a preloaded lattice treats missing neighbors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PreloadMixing {
    /// Mix along every axis in turn. A missing neighbor's weight is dropped on both sides.
    Corrected,
    /// Follow the neighbor handling of the reference implementation: all axes mix from the same blurred buffer so
    /// only the last axis survives, and a missing *upper* neighbor is not flagged, so its weight reads the row of
    /// vertex 0. The center term always reads the vertex's own row, so results are close to the reference output
    /// but not identical to it.
    Reference,
}

/// Tunables shared by the `LatticeFilter` and `PreloadedLattice` types in `permutohedral-algorithms`
///
/// ```
/// # use permutohedral_core::*;
/// let options = FilterOptions::default()
///     .with_sigma(0.5)
///     .with_normalize(true)
///     .with_kernel(KernelSelection::Scalar);
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FilterOptions {
    /// Visit the blur axes from d down to 0 instead of 0 up to d
    pub reverse: bool,
    /// Append a homogeneous weight channel and divide the filtered values by it
    pub normalize: bool,
    /// Standard deviation of the Gaussian in feature units. Features are scaled by `1 / sigma` before elevation
    pub sigma: f32,
    pub kernel: KernelSelection,
    pub mixing: PreloadMixing,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            reverse: false,
            normalize: false,
            sigma: 1.0,
            kernel: KernelSelection::Auto,
            mixing: PreloadMixing::Corrected,
        }
    }
}

impl FilterOptions {
    pub fn with_reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn with_sigma(mut self, sigma: f32) -> Self {
        self.sigma = sigma;
        self
    }

    pub fn with_kernel(mut self, kernel: KernelSelection) -> Self {
        self.kernel = kernel;
        self
    }

    pub fn with_mixing(mut self, mixing: PreloadMixing) -> Self {
        self.mixing = mixing;
        self
    }

    /// Returns the factor that features are multiplied with before they are elevated onto the lattice
    pub fn feature_scale(&self) -> f32 {
        1.0 / self.sigma
    }

    /// Returns an error if these options can't be used to configure a filter
    pub fn validate(&self) -> Result<()> {
        if !(self.sigma.is_finite() && self.sigma > 0.0) {
            return Err(LatticeError::InvalidSigma(self.sigma));
        }
        Ok(())
    }
}
