use log::debug;
use permutohedral_core::{
    check_features, check_values,
    kernel::ComputeKernel,
    lattice::{
        insert_features, passes, LatticeCoordinateMapper, Memberships, NeighborGraph,
        VertexHashTable, VertexValues,
    },
    nalgebra::DMatrix,
    FilterOptions, LatticeError, Result,
};

use crate::rows::{feature_rows, into_output, value_rows};

struct SampleLattice {
    blur: bool,
    table: VertexHashTable,
    memberships: Memberships,
    graph: Option<NeighborGraph>,
}

/// Gaussian filter that smooths the values of a set of samples over the lattice spanned by their own features
///
/// [`init`](Self::init) builds the lattice for a feature matrix. Afterwards [`compute`](Self::compute) can
/// filter any number of value matrices with the same row count over it. [`filter`](Self::filter) does both in
/// one call.
///
/// # Examples
///
/// ```
/// # use permutohedral_core::{nalgebra::DMatrix, FilterOptions};
/// # use permutohedral_algorithms::LatticeFilter;
/// let features = DMatrix::from_row_slice(3, 2, &[0.0, 0.0, 0.2, 0.1, 40.0, 40.0]);
/// let values = DMatrix::from_row_slice(3, 1, &[1.0, 1.0, 5.0]);
///
/// let mut filter = LatticeFilter::new(2, FilterOptions::default().with_normalize(true)).unwrap();
/// let smoothed = filter.filter(&features, &values, true).unwrap();
/// assert_eq!((3, 1), smoothed.shape());
/// // The third sample is too far away to be influenced by the other two
/// assert!((smoothed[(2, 0)] - 5.0).abs() < 1e-4);
/// ```
pub struct LatticeFilter {
    dim: usize,
    options: FilterOptions,
    lattice: Option<SampleLattice>,
}

impl LatticeFilter {
    /// Creates a filter for `dim`-dimensional features
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

    /// Builds the lattice for `features`, replacing any previously built one. If `blur` is set, values are
    /// diffused between neighboring vertices before they are sliced.
    pub fn init(&mut self, features: &DMatrix<f32>, blur: bool) -> Result<()> {
        check_features(self.dim, features)?;
        let mapper = LatticeCoordinateMapper::with_feature_scale(
            self.dim,
            blur,
            self.options.feature_scale(),
        )?;

        let rows = feature_rows(features);
        mapper.check_features(&rows)?;

        let samples = features.nrows();
        let mut table = VertexHashTable::with_capacity(self.dim + 1, 0, samples * (self.dim + 1));
        let memberships = insert_features(&mapper, &mut table, &rows);
        let graph = if blur {
            Some(NeighborGraph::build(&table))
        } else {
            None
        };
        debug!(
            "Built lattice from {} samples: {} vertices (d = {}, blur = {})",
            samples,
            table.len(),
            self.dim,
            blur
        );

        self.lattice = Some(SampleLattice {
            blur,
            table,
            memberships,
            graph,
        });
        Ok(())
    }

    /// Filters `values` over the lattice built by the last call to [`init`](Self::init)
    ///
    /// `values` must have one row per sample that the lattice was built from. The lattice itself is not changed,
    /// so `compute` can be called repeatedly with different values.
    pub fn compute(&self, values: &DMatrix<f32>) -> Result<DMatrix<f32>> {
        let lattice = self.lattice.as_ref().ok_or(LatticeError::NotBuilt)?;
        let samples = lattice.memberships.len();
        if values.nrows() != samples {
            return Err(LatticeError::ShapeMismatch {
                features: samples,
                values: values.nrows(),
            });
        }

        let normalize = self.options.normalize;
        let (rows, width) = value_rows(values, normalize);
        let kernel = ComputeKernel::select(self.options.kernel, width);

        let mut vertex_values = VertexValues::zeros(lattice.table.len(), width);
        passes::splat(kernel, &lattice.memberships, &rows, &mut vertex_values);

        if let Some(graph) = &lattice.graph {
            passes::blur(kernel, graph, &mut vertex_values, self.options.reverse);
        }

        let mut out = vec![0.0; samples * width];
        passes::slice(
            kernel,
            &lattice.memberships,
            &vertex_values,
            passes::blur_alpha(self.dim),
            &mut out,
        );
        Ok(into_output(&out, samples, width, normalize))
    }

    /// Builds the lattice for `features` and filters `values` over it. Both matrices are validated before the
    /// current lattice is touched.
    pub fn filter(
        &mut self,
        features: &DMatrix<f32>,
        values: &DMatrix<f32>,
        blur: bool,
    ) -> Result<DMatrix<f32>> {
        check_features(self.dim, features)?;
        check_values(features, values)?;
        self.init(features, blur)?;
        self.compute(values)
    }

    /// Returns `true` once [`init`](Self::init) succeeded
    pub fn is_built(&self) -> bool {
        self.lattice.is_some()
    }

    /// Whether the current lattice was built with blur enabled
    pub fn is_blurred(&self) -> Option<bool> {
        self.lattice.as_ref().map(|lattice| lattice.blur)
    }

    /// Number of distinct lattice vertices, `0` if no lattice has been built
    pub fn lattice_size(&self) -> usize {
        self.lattice
            .as_ref()
            .map_or(0, |lattice| lattice.table.len())
    }

    /// The vertex table of the current lattice
    pub fn table(&self) -> Option<&VertexHashTable> {
        self.lattice.as_ref().map(|lattice| &lattice.table)
    }

    /// Simplex memberships of the samples the current lattice was built from
    pub fn memberships(&self) -> Option<&Memberships> {
        self.lattice.as_ref().map(|lattice| &lattice.memberships)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use permutohedral_core::KernelSelection;

    /// Features on a diagonal, far enough apart that no two samples share a lattice vertex
    fn spread_features(count: usize, dim: usize) -> DMatrix<f32> {
        DMatrix::from_fn(count, dim, |row, column| {
            100.0 * row as f32 + 0.1 * column as f32
        })
    }

    #[test]
    fn test_identity_without_blur() {
        let features = spread_features(5, 3);
        let values = DMatrix::from_fn(5, 2, |row, column| (row * 2 + column) as f32 - 3.0);
        let mut filter =
            LatticeFilter::new(3, FilterOptions::default().with_normalize(true)).unwrap();
        let out = filter.filter(&features, &values, false).unwrap();
        for (expected, actual) in values.iter().zip(out.iter()) {
            assert_approx_eq!(expected, actual, 1e-4);
        }
    }

    #[test]
    fn test_unnormalized_without_blur() {
        // Every sample only sees its own vertices, so it gets back alpha * value * sum(w^2)
        let features = spread_features(3, 2);
        let values = DMatrix::from_row_slice(3, 1, &[1.0, 2.0, -4.0]);
        let mut filter = LatticeFilter::new(2, FilterOptions::default()).unwrap();
        let out = filter.filter(&features, &values, false).unwrap();
        let memberships = filter.memberships().unwrap();
        let alpha = passes::blur_alpha(2);
        for row in 0..3 {
            let sum_sq: f32 = memberships.get(row).weights.iter().map(|w| w * w).sum();
            assert_approx_eq!(alpha * values[(row, 0)] * sum_sq, out[(row, 0)], 1e-5);
        }
    }

    #[test]
    fn test_shape_errors() {
        let mut filter = LatticeFilter::new(2, FilterOptions::default()).unwrap();
        let features = DMatrix::zeros(4, 2);
        assert_eq!(
            Err(LatticeError::DimensionMismatch {
                expected: 2,
                found: 3
            }),
            filter.filter(&DMatrix::zeros(4, 3), &DMatrix::zeros(4, 1), true)
        );
        assert_eq!(
            Err(LatticeError::ShapeMismatch {
                features: 4,
                values: 3
            }),
            filter.filter(&features, &DMatrix::zeros(3, 1), true)
        );
        assert!(!filter.is_built());
    }

    #[test]
    fn test_failed_filter_keeps_lattice() {
        let mut filter = LatticeFilter::new(2, FilterOptions::default()).unwrap();
        filter.init(&spread_features(3, 2), true).unwrap();
        let size = filter.lattice_size();
        assert!(filter
            .filter(&spread_features(5, 2), &DMatrix::zeros(4, 1), false)
            .is_err());
        assert_eq!(size, filter.lattice_size());
        assert_eq!(Some(true), filter.is_blurred());
    }

    #[test]
    fn test_out_of_range_features() {
        let mut filter = LatticeFilter::new(2, FilterOptions::default()).unwrap();
        filter.init(&spread_features(3, 2), false).unwrap();
        let size = filter.lattice_size();

        let features = DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 3e9, -3e9]);
        let values = DMatrix::from_element(2, 1, 1.0);
        assert_eq!(
            Err(LatticeError::FeatureOutOfRange { row: 1 }),
            filter.filter(&features, &values, true)
        );
        let nan = DMatrix::from_row_slice(1, 2, &[f32::NAN, 0.0]);
        assert_eq!(
            Err(LatticeError::FeatureOutOfRange { row: 0 }),
            filter.init(&nan, false)
        );
        assert_eq!(size, filter.lattice_size());
        assert_eq!(Some(false), filter.is_blurred());
    }

    #[test]
    fn test_compute_before_init() {
        let filter = LatticeFilter::new(1, FilterOptions::default()).unwrap();
        assert_eq!(
            Err(LatticeError::NotBuilt),
            filter.compute(&DMatrix::zeros(1, 1))
        );
        assert_eq!(0, filter.lattice_size());
    }

    #[test]
    fn test_invalid_construction() {
        assert!(matches!(
            LatticeFilter::new(0, FilterOptions::default()),
            Err(LatticeError::InvalidDimension(0))
        ));
        assert!(matches!(
            LatticeFilter::new(2, FilterOptions::default().with_sigma(-1.0)),
            Err(LatticeError::InvalidSigma(_))
        ));
    }

    #[test]
    fn test_empty_input() {
        let mut filter = LatticeFilter::new(3, FilterOptions::default()).unwrap();
        let out = filter
            .filter(&DMatrix::zeros(0, 3), &DMatrix::zeros(0, 2), true)
            .unwrap();
        assert_eq!((0, 2), out.shape());
        assert_eq!(0, filter.lattice_size());
    }

    #[test]
    fn test_compute_reuses_lattice() {
        let features = DMatrix::from_fn(20, 2, |row, column| ((row * 7 + column * 3) % 11) as f32 * 0.3);
        let a = DMatrix::from_fn(20, 1, |row, _| row as f32);
        let b = DMatrix::from_fn(20, 3, |row, column| (row + column) as f32 * 0.5);

        let mut filter = LatticeFilter::new(2, FilterOptions::default()).unwrap();
        filter.init(&features, true).unwrap();
        let size = filter.lattice_size();
        let out_a = filter.compute(&a).unwrap();
        let out_b = filter.compute(&b).unwrap();
        assert_eq!(size, filter.lattice_size());

        let mut fresh = LatticeFilter::new(2, FilterOptions::default()).unwrap();
        assert_eq!(out_a, fresh.filter(&features, &a, true).unwrap());
        assert_eq!(out_b, fresh.filter(&features, &b, true).unwrap());
    }

    #[test]
    fn test_zero_width_values() {
        let mut filter = LatticeFilter::new(2, FilterOptions::default()).unwrap();
        let out = filter
            .filter(&spread_features(4, 2), &DMatrix::zeros(4, 0), true)
            .unwrap();
        assert_eq!((4, 0), out.shape());
    }

    #[test]
    fn test_kernels_agree() {
        let features = DMatrix::from_fn(50, 3, |row, column| {
            ((row * 13 + column * 5) % 17) as f32 * 0.25
        });
        let values = DMatrix::from_fn(50, 6, |row, column| ((row + column) % 5) as f32);
        let mut scalar = LatticeFilter::new(
            3,
            FilterOptions::default().with_kernel(KernelSelection::Scalar),
        )
        .unwrap();
        let mut wide =
            LatticeFilter::new(3, FilterOptions::default().with_kernel(KernelSelection::Wide))
                .unwrap();
        let a = scalar.filter(&features, &values, true).unwrap();
        let b = wide.filter(&features, &values, true).unwrap();
        for (x, y) in a.iter().zip(b.iter()) {
            assert_approx_eq!(x, y, 1e-5);
        }
    }

    #[test]
    fn test_normalized_constant_field() {
        let features = DMatrix::from_fn(30, 2, |row, column| ((row * 3 + column) % 7) as f32 * 0.4);
        let values = DMatrix::from_element(30, 1, 2.0);
        for reverse in &[false, true] {
            let options = FilterOptions::default()
                .with_normalize(true)
                .with_reverse(*reverse);
            let mut filter = LatticeFilter::new(2, options).unwrap();
            let out = filter.filter(&features, &values, true).unwrap();
            for value in out.iter() {
                assert_approx_eq!(2.0, *value, 1e-4);
            }
        }
    }
}
