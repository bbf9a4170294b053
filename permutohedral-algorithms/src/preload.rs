use log::debug;
use permutohedral_core::{
    check_features, check_values,
    kernel::ComputeKernel,
    lattice::{
        insert_features, passes, LatticeCoordinateMapper, LatticeSimplex, NeighborGraph,
        SimplexMembership, VertexHashTable, VertexId,
    },
    nalgebra::DMatrix,
    FilterOptions, LatticeError, Result,
};
use rayon::prelude::*;

use crate::rows::{feature_rows, into_output, value_rows};

/// A lattice whose vertex values are final. Queries only read from it.
struct FrozenLattice {
    mapper: LatticeCoordinateMapper,
    table: VertexHashTable,
    kernel: ComputeKernel,
    blur: bool,
}

/// Per-query scratch buffers, so that mapping a query does not allocate
struct QueryScratch {
    simplex: LatticeSimplex,
    vertices: Vec<Option<VertexId>>,
}

impl QueryScratch {
    fn new(dim: usize) -> Self {
        Self {
            simplex: LatticeSimplex::new(dim),
            vertices: vec![None; dim + 1],
        }
    }
}

impl FrozenLattice {
    /// Evaluates the lattice at `feature`. Returns `false` if none of the simplex vertices exist in the lattice.
    fn apply_row(&self, feature: &[f32], scratch: &mut QueryScratch, out: &mut [f32]) -> bool {
        let QueryScratch { simplex, vertices } = scratch;
        self.mapper.map_into(feature, simplex);
        for (vertex, (key, _)) in vertices.iter_mut().zip(simplex.vertices()) {
            *vertex = self.table.lookup(key);
        }
        let membership = SimplexMembership {
            vertices: vertices.as_slice(),
            weights: simplex.weights(),
        };
        passes::slice_row(self.kernel, membership, self.table.values(), 1.0, out)
    }
}

/// Gaussian filter that is built once from a set of reference samples and then evaluated at arbitrary query
/// positions
///
/// [`build`](Self::build) splats the reference values onto the lattice, blurs them if requested and then mixes
/// every vertex with its neighbors once more. The resulting vertex values are stored and frozen, so that
/// [`apply`](Self::apply) only has to locate each query in the lattice and interpolate. Query vertices that were
/// never created by the reference samples contribute nothing.
///
/// # Examples
///
/// ```
/// # use permutohedral_core::{nalgebra::DMatrix, FilterOptions};
/// # use permutohedral_algorithms::PreloadedLattice;
/// let reference = DMatrix::from_row_slice(3, 2, &[0.0, 0.0, 10.0, 0.0, 0.0, 10.0]);
/// let values = DMatrix::from_element(3, 1, 1.0);
///
/// let mut lattice = PreloadedLattice::new(2, FilterOptions::default().with_normalize(true)).unwrap();
/// lattice.build(&reference, &values, false).unwrap();
///
/// let queries = DMatrix::from_row_slice(2, 2, &[10.0, 0.0, 1000.0, 1000.0]);
/// let out = lattice.apply(&queries).unwrap();
/// assert!((out[(0, 0)] - 1.0).abs() < 1e-4);
/// assert_eq!(0.0, out[(1, 0)]);
/// ```
pub struct PreloadedLattice {
    dim: usize,
    options: FilterOptions,
    lattice: Option<FrozenLattice>,
}

impl PreloadedLattice {
    /// Creates an empty lattice for `dim`-dimensional features
    pub fn new(dim: usize, options: FilterOptions) -> Result<Self> {
        if dim == 0 {
            return Err(LatticeError::InvalidDimension(dim));
        }
        options.validate()?;
        Ok(Self {
            dim,
            options,
            lattice: None,
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn options(&self) -> &FilterOptions {
        &self.options
    }

    /// Builds the lattice from the reference samples `features` with their `values`, replacing any previously
    /// built lattice. Both matrices are validated before anything is changed.
    pub fn build(
        &mut self,
        features: &DMatrix<f32>,
        values: &DMatrix<f32>,
        blur: bool,
    ) -> Result<()> {
        check_features(self.dim, features)?;
        check_values(features, values)?;
        let mapper = LatticeCoordinateMapper::with_feature_scale(
            self.dim,
            blur,
            self.options.feature_scale(),
        )?;

        let reference = feature_rows(features);
        mapper.check_features(&reference)?;

        let (rows, width) = value_rows(values, self.options.normalize);
        let kernel = ComputeKernel::select(self.options.kernel, width);
        let samples = features.nrows();
        let mut table =
            VertexHashTable::with_capacity(self.dim + 1, width, samples * (self.dim + 1));
        let memberships = insert_features(&mapper, &mut table, &reference);
        passes::splat(kernel, &memberships, &rows, table.values_mut());

        if blur {
            let graph = NeighborGraph::build(&table);
            passes::blur(kernel, &graph, table.values_mut(), self.options.reverse);
            passes::mix_neighbors(kernel, &graph, table.values_mut(), self.options.mixing);
        }
        debug!(
            "Preloaded lattice from {} samples: {} vertices (d = {}, blur = {}, kernel = {:?})",
            samples,
            table.len(),
            self.dim,
            blur,
            kernel
        );

        self.lattice = Some(FrozenLattice {
            mapper,
            table,
            kernel,
            blur,
        });
        Ok(())
    }

    /// The built lattice together with the row-major query features, once both are known to be usable
    fn frozen(&self, queries: &DMatrix<f32>) -> Result<(&FrozenLattice, Vec<f32>)> {
        let lattice = self.lattice.as_ref().ok_or(LatticeError::NotBuilt)?;
        check_features(self.dim, queries)?;
        let features = feature_rows(queries);
        lattice.mapper.check_features(&features)?;
        Ok((lattice, features))
    }

    /// Evaluates the lattice at every row of `queries`. The lattice is never modified, so repeated calls with
    /// the same queries give identical results.
    pub fn apply(&self, queries: &DMatrix<f32>) -> Result<DMatrix<f32>> {
        let (lattice, features) = self.frozen(queries)?;
        let count = queries.nrows();
        let width = lattice.table.values().width();

        let mut out = vec![0.0; count * width];
        let mut scratch = QueryScratch::new(self.dim);
        let mut untouched = 0;
        for (index, feature) in features.chunks_exact(self.dim).enumerate() {
            let row = &mut out[index * width..(index + 1) * width];
            if !lattice.apply_row(feature, &mut scratch, row) {
                untouched += 1;
            }
        }
        self.log_untouched(untouched, count);
        Ok(into_output(&out, count, width, self.options.normalize))
    }

    /// Like [`apply`](Self::apply), but distributes the queries over the rayon thread pool. The result is
    /// identical to the one of `apply`.
    pub fn apply_par(&self, queries: &DMatrix<f32>) -> Result<DMatrix<f32>> {
        let (lattice, features) = self.frozen(queries)?;
        let count = queries.nrows();
        let width = lattice.table.values().width();
        if width == 0 {
            return Ok(DMatrix::zeros(count, 0));
        }

        let mut out = vec![0.0; count * width];
        let untouched = out
            .par_chunks_mut(width)
            .zip(features.par_chunks(self.dim))
            .map_init(
                || QueryScratch::new(self.dim),
                |scratch, (row, feature)| !lattice.apply_row(feature, scratch, row),
            )
            .filter(|untouched| *untouched)
            .count();
        self.log_untouched(untouched, count);
        Ok(into_output(&out, count, width, self.options.normalize))
    }

    fn log_untouched(&self, untouched: usize, count: usize) {
        if untouched > 0 {
            debug!(
                "{} of {} queries fall outside of the lattice",
                untouched, count
            );
        }
    }

    /// Returns `true` once [`build`](Self::build) succeeded
    pub fn is_built(&self) -> bool {
        self.lattice.is_some()
    }

    /// Whether the current lattice was built with blur enabled
    pub fn is_blurred(&self) -> Option<bool> {
        self.lattice.as_ref().map(|lattice| lattice.blur)
    }

    /// Number of distinct vertices created during the last [`build`](Self::build), `0` if nothing was built
    pub fn lattice_size(&self) -> usize {
        self.lattice
            .as_ref()
            .map_or(0, |lattice| lattice.table.len())
    }

    /// The frozen vertex table
    pub fn table(&self) -> Option<&VertexHashTable> {
        self.lattice.as_ref().map(|lattice| &lattice.table)
    }

    /// Keys of all lattice vertices in id order
    pub fn vertex_keys(&self) -> Vec<&[i32]> {
        self.table()
            .map(|table| table.keys().collect())
            .unwrap_or_default()
    }

    /// Stored value row of the vertex with the given key. Includes the weight channel if the lattice normalizes.
    pub fn vertex_values(&self, key: &[i32]) -> Option<&[f32]> {
        let table = self.table()?;
        if key.len() != table.key_size() {
            return None;
        }
        table
            .lookup(key)
            .map(|id| table.values().row(id.index()))
    }
}
