use super::{VertexHashTable, VertexId};

/// The two neighbors of a vertex along one lattice axis. A neighbor is `None` if its key was never inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NeighborPair {
    pub lower: Option<VertexId>,
    pub upper: Option<VertexId>,
}

/// Neighbor pairs of every vertex along each of the `d + 1` lattice axes
///
/// Along axis `j`, the lower neighbor of key `k` is `k - 1` everywhere except `k_j + d` at component `j`, and the
/// upper neighbor is `k + 1` everywhere except `k_j - d` at component `j`. Both keys sum to zero again.
#[derive(Debug, Clone)]
pub struct NeighborGraph {
    axes: usize,
    vertices: usize,
    pairs: Vec<NeighborPair>,
}

impl NeighborGraph {
    /// Looks up the neighbors of every vertex of `table`. The table is not modified.
    pub fn build(table: &VertexHashTable) -> Self {
        let axes = table.key_size();
        let d = axes as i32 - 1;
        let mut pairs = Vec::with_capacity(axes * table.len());
        let mut lower = vec![0; axes];
        let mut upper = vec![0; axes];

        for axis in 0..axes {
            for key in table.keys() {
                for (i, k) in key.iter().enumerate() {
                    lower[i] = k - 1;
                    upper[i] = k + 1;
                }
                lower[axis] = key[axis] + d;
                upper[axis] = key[axis] - d;
                pairs.push(NeighborPair {
                    lower: table.lookup(&lower),
                    upper: table.lookup(&upper),
                });
            }
        }

        Self {
            axes,
            vertices: table.len(),
            pairs,
        }
    }

    /// Number of axes, `d + 1`
    pub fn axes(&self) -> usize {
        self.axes
    }

    /// Number of vertices this graph was built for
    pub fn vertices(&self) -> usize {
        self.vertices
    }

    /// Neighbors of `id` along `axis`
    ///
    /// # Panics
    ///
    /// If `axis` or `id` is out of bounds
    pub fn pair(&self, axis: usize, id: VertexId) -> NeighborPair {
        assert!(axis < self.axes);
        assert!(id.index() < self.vertices);
        self.pairs[axis * self.vertices + id.index()]
    }
}
