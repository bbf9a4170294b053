use itertools::izip;

pub(super) fn axpy(dst: &mut [f32], weight: f32, src: &[f32]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d += weight * *s;
    }
}

pub(super) fn blur(dst: &mut [f32], old: &[f32], lower: Option<&[f32]>, upper: Option<&[f32]>) {
    match (lower, upper) {
        (Some(lower), Some(upper)) => {
            for (d, o, l, u) in izip!(dst.iter_mut(), old, lower, upper) {
                *d = *o + 0.5 * (*l + *u);
            }
        }
        (Some(neighbor), None) | (None, Some(neighbor)) => {
            for (d, o, n) in izip!(dst.iter_mut(), old, neighbor) {
                *d = *o + 0.5 * *n;
            }
        }
        (None, None) => dst.copy_from_slice(old),
    }
}

pub(super) fn mix(dst: &mut [f32], center: &[f32], lower: Option<&[f32]>, upper: Option<&[f32]>) {
    match (lower, upper) {
        (Some(lower), Some(upper)) => {
            for (d, c, l, u) in izip!(dst.iter_mut(), center, lower, upper) {
                *d = 0.5 * *c + 0.25 * *l + 0.25 * *u;
            }
        }
        (Some(neighbor), None) | (None, Some(neighbor)) => {
            for (d, c, n) in izip!(dst.iter_mut(), center, neighbor) {
                *d = 0.5 * *c + 0.25 * *n;
            }
        }
        (None, None) => {
            for (d, c) in dst.iter_mut().zip(center) {
                *d = 0.5 * *c;
            }
        }
    }
}
