use nalgebra::DMatrix;
use thiserror::Error;

/// Precondition violations reported by the lattice filters. All of them are detected before any vertex
/// table is touched, so a failed call leaves the filter exactly as it was.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LatticeError {
    #[error("feature rows have {found} columns, but the lattice was configured for {expected} dimensions")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("value matrix has {values} rows, but the feature matrix has {features} rows")]
    ShapeMismatch { features: usize, values: usize },
    #[error("the lattice has not been built yet")]
    NotBuilt,
    #[error("lattice dimensionality must be at least 1, got {0}")]
    InvalidDimension(usize),
    #[error("sigma must be a positive finite number, got {0}")]
    InvalidSigma(f32),
    #[error("feature row {row} is not finite or lies too far from the origin to be placed on the lattice")]
    FeatureOutOfRange { row: usize },
}

pub type Result<T> = std::result::Result<T, LatticeError>;

/// Checks that every row of `features` is a `dim`-dimensional feature vector
pub fn check_features(dim: usize, features: &DMatrix<f32>) -> Result<()> {
    if features.ncols() != dim {
        return Err(LatticeError::DimensionMismatch {
            expected: dim,
            found: features.ncols(),
        });
    }
    Ok(())
}

/// Checks that `values` holds exactly one row per row of `features`
pub fn check_values(features: &DMatrix<f32>, values: &DMatrix<f32>) -> Result<()> {
    if features.nrows() != values.nrows() {
        return Err(LatticeError::ShapeMismatch {
            features: features.nrows(),
            values: values.nrows(),
        });
    }
    Ok(())
}
