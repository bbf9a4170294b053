use itertools::izip;
use wide::f32x4;

use super::{scalar, LANES};

#[inline(always)]
fn load(row: &[f32]) -> f32x4 {
    f32x4::new([row[0], row[1], row[2], row[3]])
}

#[inline(always)]
fn store(row: &mut [f32], v: f32x4) {
    row.copy_from_slice(&v.to_array());
}

/// Splits off the part of a row that is a multiple of `LANES` long. The tail goes through the scalar kernel.
fn split_body(row: &[f32]) -> (&[f32], &[f32]) {
    row.split_at(row.len() - row.len() % LANES)
}

fn split_neighbor(row: Option<&[f32]>) -> (Option<&[f32]>, Option<&[f32]>) {
    match row {
        Some(row) => {
            let (body, tail) = split_body(row);
            (Some(body), Some(tail))
        }
        None => (None, None),
    }
}

pub(super) fn axpy(dst: &mut [f32], weight: f32, src: &[f32]) {
    let split = dst.len() - dst.len() % LANES;
    let (dst, dst_tail) = dst.split_at_mut(split);
    let (src, src_tail) = split_body(src);

    let w = f32x4::splat(weight);
    for (d, s) in dst.chunks_exact_mut(LANES).zip(src.chunks_exact(LANES)) {
        let r = load(d) + w * load(s);
        store(d, r);
    }
    scalar::axpy(dst_tail, weight, src_tail);
}

pub(super) fn blur(dst: &mut [f32], old: &[f32], lower: Option<&[f32]>, upper: Option<&[f32]>) {
    let split = dst.len() - dst.len() % LANES;
    let (dst, dst_tail) = dst.split_at_mut(split);
    let (old, old_tail) = split_body(old);
    let (lower, lower_tail) = split_neighbor(lower);
    let (upper, upper_tail) = split_neighbor(upper);

    let half = f32x4::splat(0.5);
    match (lower, upper) {
        (Some(lower), Some(upper)) => {
            for (d, o, l, u) in izip!(
                dst.chunks_exact_mut(LANES),
                old.chunks_exact(LANES),
                lower.chunks_exact(LANES),
                upper.chunks_exact(LANES)
            ) {
                store(d, load(o) + half * (load(l) + load(u)));
            }
        }
        (Some(neighbor), None) | (None, Some(neighbor)) => {
            for (d, o, n) in izip!(
                dst.chunks_exact_mut(LANES),
                old.chunks_exact(LANES),
                neighbor.chunks_exact(LANES)
            ) {
                store(d, load(o) + half * load(n));
            }
        }
        (None, None) => dst.copy_from_slice(old),
    }
    scalar::blur(dst_tail, old_tail, lower_tail, upper_tail);
}

pub(super) fn mix(dst: &mut [f32], center: &[f32], lower: Option<&[f32]>, upper: Option<&[f32]>) {
    let split = dst.len() - dst.len() % LANES;
    let (dst, dst_tail) = dst.split_at_mut(split);
    let (center, center_tail) = split_body(center);
    let (lower, lower_tail) = split_neighbor(lower);
    let (upper, upper_tail) = split_neighbor(upper);

    let half = f32x4::splat(0.5);
    let quarter = f32x4::splat(0.25);
    match (lower, upper) {
        (Some(lower), Some(upper)) => {
            for (d, c, l, u) in izip!(
                dst.chunks_exact_mut(LANES),
                center.chunks_exact(LANES),
                lower.chunks_exact(LANES),
                upper.chunks_exact(LANES)
            ) {
                store(d, half * load(c) + quarter * load(l) + quarter * load(u));
            }
        }
        (Some(neighbor), None) | (None, Some(neighbor)) => {
            for (d, c, n) in izip!(
                dst.chunks_exact_mut(LANES),
                center.chunks_exact(LANES),
                neighbor.chunks_exact(LANES)
            ) {
                store(d, half * load(c) + quarter * load(n));
            }
        }
        (None, None) => {
            for (d, c) in dst.chunks_exact_mut(LANES).zip(center.chunks_exact(LANES)) {
                store(d, half * load(c));
            }
        }
    }
    scalar::mix(dst_tail, center_tail, lower_tail, upper_tail);
}
