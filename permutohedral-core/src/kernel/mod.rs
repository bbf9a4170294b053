use lazy_static::lazy_static;

use crate::KernelSelection;

mod lanes;
mod scalar;

/// Number of `f32` lanes processed at once by the wide kernel
pub const LANES: usize = 4;
/// Rows narrower than this are not worth loading into lanes when [`KernelSelection::Auto`] is used
pub const MIN_WIDE_WIDTH: usize = 3;

lazy_static! {
    static ref WIDE_LANES_SUPPORTED: bool = detect_wide_lanes();
}

#[cfg(target_arch = "x86_64")]
fn detect_wide_lanes() -> bool {
    is_x86_feature_detected!("sse2")
}

#[cfg(target_arch = "aarch64")]
fn detect_wide_lanes() -> bool {
    std::arch::is_aarch64_feature_detected!("neon")
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
fn detect_wide_lanes() -> bool {
    false
}

/// Returns `true` if the current CPU has native 4-wide `f32` registers. Detected once per process.
pub fn wide_lanes_supported() -> bool {
    *WIDE_LANES_SUPPORTED
}

/// The row arithmetic used by the lattice passes
///
/// Both variants evaluate the exact same sequence of IEEE operations per component (no fused multiply-add),
/// so they produce bit-identical rows. `Wide` merely processes four components per instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeKernel {
    Scalar,
    Wide,
}

impl ComputeKernel {
    /// Resolves a user-facing [`KernelSelection`] for value rows of the given `width`
    pub fn select(selection: KernelSelection, width: usize) -> Self {
        match selection {
            KernelSelection::Scalar => ComputeKernel::Scalar,
            KernelSelection::Wide => ComputeKernel::Wide,
            KernelSelection::Auto => {
                if width >= MIN_WIDE_WIDTH && wide_lanes_supported() {
                    ComputeKernel::Wide
                } else {
                    ComputeKernel::Scalar
                }
            }
        }
    }

    /// `dst += weight * src`. Used by splat (`src` is a value row) and slice (`src` is a vertex row).
    ///
    /// # Panics
    ///
    /// If `dst` and `src` differ in length
    pub fn axpy(self, dst: &mut [f32], weight: f32, src: &[f32]) {
        assert_eq!(dst.len(), src.len());
        match self {
            ComputeKernel::Scalar => scalar::axpy(dst, weight, src),
            ComputeKernel::Wide => lanes::axpy(dst, weight, src),
        }
    }

    /// `dst = old + 0.5 * (lower + upper)` where a missing neighbor contributes nothing
    ///
    /// # Panics
    ///
    /// If any of the given rows differ in length
    pub fn blur(
        self,
        dst: &mut [f32],
        old: &[f32],
        lower: Option<&[f32]>,
        upper: Option<&[f32]>,
    ) {
        assert_eq!(dst.len(), old.len());
        check_neighbor(dst.len(), lower);
        check_neighbor(dst.len(), upper);
        match self {
            ComputeKernel::Scalar => scalar::blur(dst, old, lower, upper),
            ComputeKernel::Wide => lanes::blur(dst, old, lower, upper),
        }
    }

    /// `dst = 0.5 * center + 0.25 * lower + 0.25 * upper` where a missing neighbor contributes nothing
    ///
    /// # Panics
    ///
    /// If any of the given rows differ in length
    pub fn mix(
        self,
        dst: &mut [f32],
        center: &[f32],
        lower: Option<&[f32]>,
        upper: Option<&[f32]>,
    ) {
        assert_eq!(dst.len(), center.len());
        check_neighbor(dst.len(), lower);
        check_neighbor(dst.len(), upper);
        match self {
            ComputeKernel::Scalar => scalar::mix(dst, center, lower, upper),
            ComputeKernel::Wide => lanes::mix(dst, center, lower, upper),
        }
    }
}

fn check_neighbor(width: usize, row: Option<&[f32]>) {
    if let Some(row) = row {
        assert_eq!(width, row.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{prelude::StdRng, Rng, SeedableRng};

    fn random_row(rng: &mut StdRng, width: usize) -> Vec<f32> {
        (0..width).map(|_| rng.gen_range(-10.0..10.0)).collect()
    }

    #[test]
    fn test_select() {
        assert_eq!(
            ComputeKernel::Scalar,
            ComputeKernel::select(KernelSelection::Scalar, 64)
        );
        assert_eq!(
            ComputeKernel::Wide,
            ComputeKernel::select(KernelSelection::Wide, 1)
        );
        assert_eq!(
            ComputeKernel::Scalar,
            ComputeKernel::select(KernelSelection::Auto, MIN_WIDE_WIDTH - 1)
        );
        let expected = if wide_lanes_supported() {
            ComputeKernel::Wide
        } else {
            ComputeKernel::Scalar
        };
        assert_eq!(
            expected,
            ComputeKernel::select(KernelSelection::Auto, MIN_WIDE_WIDTH)
        );
    }

    #[test]
    fn test_axpy() {
        let mut dst = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        ComputeKernel::Scalar.axpy(&mut dst, 2.0, &[1.0, 1.0, 1.0, 1.0, -1.0]);
        assert_eq!(vec![3.0, 4.0, 5.0, 6.0, 3.0], dst);
    }

    #[test]
    fn test_blur_missing_neighbors() {
        let old = [1.0, 2.0];
        let mut dst = [0.0; 2];
        ComputeKernel::Scalar.blur(&mut dst, &old, None, Some(&[2.0, 4.0][..]));
        assert_eq!([2.0, 4.0], dst);
        ComputeKernel::Scalar.blur(&mut dst, &old, None, None);
        assert_eq!(old, dst);
    }

    #[test]
    fn test_mix() {
        let mut dst = [0.0; 3];
        ComputeKernel::Scalar.mix(
            &mut dst,
            &[4.0, 4.0, 4.0],
            Some(&[4.0, 0.0, 8.0][..]),
            Some(&[0.0, 0.0, 8.0][..]),
        );
        assert_eq!([3.0, 2.0, 6.0], dst);
        ComputeKernel::Scalar.mix(&mut dst, &[4.0, 4.0, 4.0], None, None);
        assert_eq!([2.0, 2.0, 2.0], dst);
    }

    #[test]
    fn test_wide_matches_scalar() {
        let mut rng = StdRng::seed_from_u64(4711);
        for width in 0..12 {
            let src = random_row(&mut rng, width);
            let lower = random_row(&mut rng, width);
            let upper = random_row(&mut rng, width);
            let init = random_row(&mut rng, width);

            let mut scalar_dst = init.clone();
            let mut wide_dst = init.clone();
            ComputeKernel::Scalar.axpy(&mut scalar_dst, 0.3, &src);
            ComputeKernel::Wide.axpy(&mut wide_dst, 0.3, &src);
            assert_eq!(scalar_dst, wide_dst, "axpy differs for width {}", width);

            for (l, u) in &[
                (Some(&lower[..]), Some(&upper[..])),
                (None, Some(&upper[..])),
                (Some(&lower[..]), None),
                (None, None),
            ] {
                ComputeKernel::Scalar.blur(&mut scalar_dst, &src, *l, *u);
                ComputeKernel::Wide.blur(&mut wide_dst, &src, *l, *u);
                assert_eq!(scalar_dst, wide_dst, "blur differs for width {}", width);

                ComputeKernel::Scalar.mix(&mut scalar_dst, &src, *l, *u);
                ComputeKernel::Wide.mix(&mut wide_dst, &src, *l, *u);
                assert_eq!(scalar_dst, wide_dst, "mix differs for width {}", width);
            }
        }
    }

    #[test]
    #[should_panic]
    fn test_axpy_length_mismatch() {
        let mut dst = [0.0; 3];
        ComputeKernel::Wide.axpy(&mut dst, 1.0, &[1.0; 4]);
    }
}
