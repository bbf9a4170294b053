//! The splat, blur and slice passes, plus the neighbor mixing that turns a blurred lattice into a preloaded one

use super::{Memberships, NeighborGraph, SimplexMembership, VertexId, VertexValues};
use crate::{kernel::ComputeKernel, PreloadMixing};

/// Scaling that compensates the amplification of the blur in `dim` dimensions, `1 / (1 + 2^-dim)`
pub fn blur_alpha(dim: usize) -> f32 {
    1.0 / (1.0 + 2.0f32.powi(-(dim as i32)))
}

/// Accumulates `weight * value` of every sample at each vertex of its simplex
///
/// `values` holds one row of `target.width()` entries per sample, row-major. Vertices that are not part of the
/// lattice are skipped.
///
/// # Panics
///
/// If `values` does not hold exactly one row per membership
pub fn splat(
    kernel: ComputeKernel,
    memberships: &Memberships,
    values: &[f32],
    target: &mut VertexValues,
) {
    let width = target.width();
    assert_eq!(memberships.len() * width, values.len());
    for (sample, membership) in memberships.iter().enumerate() {
        let value = &values[sample * width..(sample + 1) * width];
        for (vertex, weight) in membership.iter() {
            if let Some(vertex) = vertex {
                kernel.axpy(target.row_mut(vertex.index()), weight, value);
            }
        }
    }
}

/// Diffuses `values` along every axis of `graph`: `new = old + 0.5 * (lower + upper)`
///
/// Axes are visited from `0` to `d`, or from `d` down to `0` if `reverse` is set. Each axis reads the result of
/// the previous one.
pub fn blur(
    kernel: ComputeKernel,
    graph: &NeighborGraph,
    values: &mut VertexValues,
    reverse: bool,
) {
    let mut scratch = VertexValues::zeros(values.rows(), values.width());
    for axis in axis_order(graph.axes(), reverse) {
        for index in 0..values.rows() {
            let pair = graph.pair(axis, VertexId::from_index(index));
            let current = &*values;
            kernel.blur(
                scratch.row_mut(index),
                current.row(index),
                pair.lower.map(|n| current.row(n.index())),
                pair.upper.map(|n| current.row(n.index())),
            );
        }
        values.swap(&mut scratch);
    }
}

/// Weighted sum of the vertex rows of each sample's simplex, times `alpha`
///
/// `out` receives one row of `values.width()` entries per membership. Returns the number of samples none of
/// whose vertices are part of the lattice. Their output rows are zero.
///
/// # Panics
///
/// If `out` does not hold exactly one row per membership
pub fn slice(
    kernel: ComputeKernel,
    memberships: &Memberships,
    values: &VertexValues,
    alpha: f32,
    out: &mut [f32],
) -> usize {
    let width = values.width();
    assert_eq!(memberships.len() * width, out.len());
    let mut untouched = 0;
    for (sample, membership) in memberships.iter().enumerate() {
        let row = &mut out[sample * width..(sample + 1) * width];
        if !slice_row(kernel, membership, values, alpha, row) {
            untouched += 1;
        }
    }
    untouched
}

/// [`slice`] for a single sample. Returns `false` if none of the simplex vertices are part of the lattice.
pub fn slice_row(
    kernel: ComputeKernel,
    membership: SimplexMembership<'_>,
    values: &VertexValues,
    alpha: f32,
    out: &mut [f32],
) -> bool {
    out.iter_mut().for_each(|v| *v = 0.0);
    let mut touched = false;
    for (vertex, weight) in membership.iter() {
        if let Some(vertex) = vertex {
            kernel.axpy(out, weight * alpha, values.row(vertex.index()));
            touched = true;
        }
    }
    touched
}

/// Mixes every vertex row with its neighbors, `0.25 * lower + 0.5 * self + 0.25 * upper`
///
/// See [`PreloadMixing`] for how missing neighbors are treated.
pub fn mix_neighbors(
    kernel: ComputeKernel,
    graph: &NeighborGraph,
    values: &mut VertexValues,
    mixing: PreloadMixing,
) {
    let rows = values.rows();
    if rows == 0 {
        return;
    }
    let mut scratch = VertexValues::zeros(rows, values.width());
    match mixing {
        PreloadMixing::Corrected => {
            for axis in 0..graph.axes() {
                mix_axis(kernel, graph, axis, values, &mut scratch, false);
                values.swap(&mut scratch);
            }
        }
        PreloadMixing::Reference => {
            // Every axis reads the same source buffer, so only the last axis is visible in the result
            mix_axis(kernel, graph, graph.axes() - 1, values, &mut scratch, true);
            values.swap(&mut scratch);
        }
    }
}

fn mix_axis(
    kernel: ComputeKernel,
    graph: &NeighborGraph,
    axis: usize,
    source: &VertexValues,
    target: &mut VertexValues,
    missing_upper_reads_first: bool,
) {
    for index in 0..source.rows() {
        let pair = graph.pair(axis, VertexId::from_index(index));
        let lower = pair.lower.map(|n| source.row(n.index()));
        let upper = match pair.upper {
            Some(n) => Some(source.row(n.index())),
            None if missing_upper_reads_first => Some(source.row(0)),
            None => None,
        };
        kernel.mix(target.row_mut(index), source.row(index), lower, upper);
    }
}

fn axis_order(axes: usize, reverse: bool) -> Box<dyn Iterator<Item = usize>> {
    if reverse {
        Box::new((0..axes).rev())
    } else {
        Box::new(0..axes)
    }
}
