use crate::{LatticeError, Result};

/// Largest magnitude an elevated coordinate may have. Beyond it `f32` no longer resolves the lattice spacing
/// precisely enough for the rank correction in [`LatticeCoordinateMapper::map_into`].
const MAX_ELEVATED: f32 = (1u32 << 20) as f32;

/// The `d + 1` vertices of the simplex enclosing one feature vector, together with the barycentric weight of
/// each vertex
///
/// A `LatticeSimplex` also carries the scratch buffers of the mapping, so a single instance can be reused for
/// many calls to [`LatticeCoordinateMapper::map_into`] without allocating.
#[derive(Debug, Clone)]
pub struct LatticeSimplex {
    dim: usize,
    keys: Vec<i32>,
    weights: Vec<f32>,
    elevated: Vec<f32>,
    remainder: Vec<i32>,
    rank: Vec<i32>,
    barycentric: Vec<f32>,
}

impl LatticeSimplex {
    /// Creates an empty simplex for a `dim`-dimensional feature space
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            keys: vec![0; (dim + 1) * (dim + 1)],
            weights: vec![0.0; dim + 1],
            elevated: vec![0.0; dim + 1],
            remainder: vec![0; dim + 1],
            rank: vec![0; dim + 1],
            barycentric: vec![0.0; dim + 2],
        }
    }

    /// Key of the `index`-th vertex. Every key has `d + 1` components that sum to zero.
    pub fn key(&self, index: usize) -> &[i32] {
        let size = self.dim + 1;
        &self.keys[index * size..(index + 1) * size]
    }

    /// Barycentric weight of the `index`-th vertex
    pub fn weight(&self, index: usize) -> f32 {
        self.weights[index]
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Iterates over all `(key, weight)` pairs of this simplex
    pub fn vertices(&self) -> impl Iterator<Item = (&[i32], f32)> + '_ {
        self.keys
            .chunks_exact(self.dim + 1)
            .zip(self.weights.iter().copied())
    }
}

/// Maps feature vectors onto the permutohedral lattice
///
/// A feature `f` is scaled, elevated onto the hyperplane `x_0 + ... + x_d = 0` in `d + 1` dimensions and then
/// located inside a simplex of the lattice. The mapper is immutable and can be shared between threads.
///
/// ```
/// # use permutohedral_core::lattice::*;
/// let mapper = LatticeCoordinateMapper::new(2, true).unwrap();
/// let simplex = mapper.map(&[0.3, -1.2]);
/// let sum: f32 = simplex.weights().iter().sum();
/// assert!((sum - 1.0).abs() < 1e-4);
/// ```
#[derive(Debug, Clone)]
pub struct LatticeCoordinateMapper {
    dim: usize,
    scale: Vec<f32>,
    canonical: Vec<i32>,
}

impl LatticeCoordinateMapper {
    /// Creates a mapper for `dim`-dimensional features. The lattice spacing depends on whether the lattice will
    /// be blurred
    pub fn new(dim: usize, blur: bool) -> Result<Self> {
        Self::with_feature_scale(dim, blur, 1.0)
    }

    /// Like [`new`](Self::new), but every feature component is multiplied by `feature_scale` first
    pub fn with_feature_scale(dim: usize, blur: bool, feature_scale: f32) -> Result<Self> {
        if dim == 0 {
            return Err(LatticeError::InvalidDimension(dim));
        }
        let d1 = (dim + 1) as f64;
        let inv_std_dev = if blur {
            (2.0f64 / 3.0).sqrt() * d1
        } else {
            (1.0f64 / 6.0).sqrt() * d1
        };
        let scale = (0..dim)
            .map(|i| {
                let norm = (((i + 2) * (i + 1)) as f64).sqrt();
                (inv_std_dev / norm) as f32 * feature_scale
            })
            .collect();

        let size = dim + 1;
        let mut canonical = vec![0; size * size];
        for r in 0..size {
            for j in 0..size {
                canonical[r * size + j] = if j <= dim - r {
                    r as i32
                } else {
                    r as i32 - size as i32
                };
            }
        }

        Ok(Self {
            dim,
            scale,
            canonical,
        })
    }

    /// Dimensionality of the feature space
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Checks that every row of the row-major `features` buffer can be mapped onto the lattice. Rows with
    /// non-finite components, or whose elevated coordinates would not fit into the integer keys, are rejected.
    ///
    /// # Panics
    ///
    /// If the length of `features` is not a multiple of the dimensionality
    pub fn check_features(&self, features: &[f32]) -> Result<()> {
        assert_eq!(0, features.len() % self.dim);
        let mut elevated = vec![0.0; self.dim + 1];
        for (row, feature) in features.chunks_exact(self.dim).enumerate() {
            self.elevate(feature, &mut elevated);
            let in_range = feature.iter().all(|f| f.is_finite())
                && elevated.iter().all(|e| e.abs() <= MAX_ELEVATED);
            if !in_range {
                return Err(LatticeError::FeatureOutOfRange { row });
            }
        }
        Ok(())
    }

    /// Elevates `feature` onto the d-dimensional hyperplane of R^(d+1)
    fn elevate(&self, feature: &[f32], elevated: &mut [f32]) {
        let d = self.dim;
        let mut sm = 0.0;
        for j in (1..=d).rev() {
            let cf = feature[j - 1] * self.scale[j - 1];
            elevated[j] = sm - j as f32 * cf;
            sm += cf;
        }
        elevated[0] = sm;
    }

    /// Maps `feature` into a freshly allocated [`LatticeSimplex`]
    pub fn map(&self, feature: &[f32]) -> LatticeSimplex {
        let mut simplex = LatticeSimplex::new(self.dim);
        self.map_into(feature, &mut simplex);
        simplex
    }

    /// Maps `feature` into `simplex`, overwriting its previous contents
    ///
    /// # Panics
    ///
    /// If `feature` does not have `dim` components or `simplex` was created for a different dimensionality.
    /// May overflow for features that [`check_features`](Self::check_features) rejects.
    pub fn map_into(&self, feature: &[f32], simplex: &mut LatticeSimplex) {
        let d = self.dim;
        assert_eq!(d, feature.len());
        assert_eq!(d, simplex.dim);
        let size = d + 1;
        let down_factor = 1.0 / size as f32;
        let up_factor = size as f32;

        let LatticeSimplex {
            keys,
            weights,
            elevated,
            remainder,
            rank,
            barycentric,
            ..
        } = simplex;

        self.elevate(feature, elevated);

        // Closest remainder-0 point
        let mut sum = 0;
        for i in 0..size {
            let v = down_factor * elevated[i];
            let up = v.ceil() * up_factor;
            let down = v.floor() * up_factor;
            let rounded = if up - elevated[i] < elevated[i] - down {
                up
            } else {
                down
            };
            remainder[i] = rounded as i32;
            sum += remainder[i] / size as i32;
        }

        // Position of each coordinate in the sorted order of the residuals
        rank.iter_mut().for_each(|r| *r = 0);
        for i in 0..d {
            let di = elevated[i] - remainder[i] as f32;
            for j in (i + 1)..size {
                if di < elevated[j] - remainder[j] as f32 {
                    rank[i] += 1;
                } else {
                    rank[j] += 1;
                }
            }
        }

        // Bring the point back onto the plane if the rounded coordinates don't sum to zero
        for i in 0..size {
            rank[i] += sum;
            if rank[i] < 0 {
                rank[i] += size as i32;
                remainder[i] += size as i32;
            } else if rank[i] > d as i32 {
                rank[i] -= size as i32;
                remainder[i] -= size as i32;
            }
        }

        barycentric.iter_mut().for_each(|b| *b = 0.0);
        for i in 0..size {
            let v = (elevated[i] - remainder[i] as f32) * down_factor;
            let slot = d - rank[i] as usize;
            barycentric[slot] += v;
            barycentric[slot + 1] -= v;
        }
        barycentric[0] += 1.0 + barycentric[d + 1];

        for r in 0..size {
            let key = &mut keys[r * size..(r + 1) * size];
            let canonical = &self.canonical[r * size..(r + 1) * size];
            for i in 0..size {
                key[i] = remainder[i] + canonical[rank[i] as usize];
            }
            weights[r] = barycentric[r];
        }
    }
}
