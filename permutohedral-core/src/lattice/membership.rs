use super::{LatticeCoordinateMapper, LatticeSimplex, VertexHashTable, VertexId};

/// The simplex vertices of one sample and their barycentric weights
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimplexMembership<'a> {
    pub vertices: &'a [Option<VertexId>],
    pub weights: &'a [f32],
}

impl<'a> SimplexMembership<'a> {
    /// Iterates over all `(vertex, weight)` pairs. A vertex is `None` if its key is not part of the lattice.
    pub fn iter(&self) -> impl Iterator<Item = (Option<VertexId>, f32)> + 'a {
        self.vertices
            .iter()
            .copied()
            .zip(self.weights.iter().copied())
    }

    pub fn weight_sum(&self) -> f32 {
        self.weights.iter().sum()
    }
}

/// [`SimplexMembership`]s of a batch of samples, stored flat with `d + 1` entries per sample
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Memberships {
    stride: usize,
    vertices: Vec<Option<VertexId>>,
    weights: Vec<f32>,
}

impl Memberships {
    /// Creates an empty set of memberships for simplices with `stride` vertices each
    pub fn new(stride: usize) -> Self {
        Self {
            stride,
            vertices: vec![],
            weights: vec![],
        }
    }

    pub fn with_capacity(stride: usize, samples: usize) -> Self {
        Self {
            stride,
            vertices: Vec::with_capacity(stride * samples),
            weights: Vec::with_capacity(stride * samples),
        }
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        if self.stride == 0 {
            0
        } else {
            self.vertices.len() / self.stride
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Membership of the `index`-th sample
    ///
    /// # Panics
    ///
    /// If `index` is out of bounds
    pub fn get(&self, index: usize) -> SimplexMembership<'_> {
        assert!(index < self.len());
        let range = index * self.stride..(index + 1) * self.stride;
        SimplexMembership {
            vertices: &self.vertices[range.clone()],
            weights: &self.weights[range],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = SimplexMembership<'_>> + '_ {
        (0..self.len()).map(move |index| self.get(index))
    }

    /// Appends one sample
    ///
    /// # Panics
    ///
    /// If `vertices` and `weights` do not both have `stride` entries
    pub fn push(&mut self, vertices: &[Option<VertexId>], weights: &[f32]) {
        assert_eq!(self.stride, vertices.len());
        assert_eq!(self.stride, weights.len());
        self.vertices.extend_from_slice(vertices);
        self.weights.extend_from_slice(weights);
    }
}

/// Maps every row of the row-major `features` buffer onto the lattice and inserts all simplex vertices into
/// `table`
///
/// # Panics
///
/// If the length of `features` is not a multiple of the mapper's dimensionality, or the key size of `table`
/// does not match the mapper
pub fn insert_features(
    mapper: &LatticeCoordinateMapper,
    table: &mut VertexHashTable,
    features: &[f32],
) -> Memberships {
    collect_memberships(mapper, features, |key| Some(table.insert(key)))
}

/// Maps every row of the row-major `features` buffer onto the lattice and looks up the simplex vertices in
/// `table` without inserting
///
/// # Panics
///
/// If the length of `features` is not a multiple of the mapper's dimensionality, or the key size of `table`
/// does not match the mapper
pub fn lookup_features(
    mapper: &LatticeCoordinateMapper,
    table: &VertexHashTable,
    features: &[f32],
) -> Memberships {
    collect_memberships(mapper, features, |key| table.lookup(key))
}

fn collect_memberships<F: FnMut(&[i32]) -> Option<VertexId>>(
    mapper: &LatticeCoordinateMapper,
    features: &[f32],
    mut resolve: F,
) -> Memberships {
    let dim = mapper.dim();
    assert_eq!(0, features.len() % dim);
    let mut memberships = Memberships::with_capacity(dim + 1, features.len() / dim);
    let mut simplex = LatticeSimplex::new(dim);
    let mut vertices = vec![None; dim + 1];
    for feature in features.chunks_exact(dim) {
        mapper.map_into(feature, &mut simplex);
        for (vertex, (key, _)) in vertices.iter_mut().zip(simplex.vertices()) {
            *vertex = resolve(key);
        }
        memberships.push(&vertices, simplex.weights());
    }
    memberships
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_insert_then_lookup() {
        let mapper = LatticeCoordinateMapper::new(2, false).unwrap();
        let mut table = VertexHashTable::new(3, 1);
        let features = [0.0, 0.0, 0.1, 0.2, 50.0, -50.0];
        let inserted = insert_features(&mapper, &mut table, &features);
        assert_eq!(3, inserted.len());
        assert!(inserted.iter().all(|m| m.vertices.iter().all(Option::is_some)));
        for membership in inserted.iter() {
            assert_approx_eq!(1.0, membership.weight_sum(), 1e-4);
        }

        let looked_up = lookup_features(&mapper, &table, &features);
        assert_eq!(inserted, looked_up);

        let size = table.len();
        let far = lookup_features(&mapper, &table, &[1000.0, 1000.0]);
        assert_eq!(size, table.len());
        assert!(far.get(0).vertices.iter().all(Option::is_none));
    }

    #[test]
    fn test_empty_batch() {
        let mapper = LatticeCoordinateMapper::new(3, true).unwrap();
        let mut table = VertexHashTable::new(4, 1);
        let memberships = insert_features(&mapper, &mut table, &[]);
        assert!(memberships.is_empty());
        assert_eq!(0, memberships.len());
        assert!(table.is_empty());
    }
}
