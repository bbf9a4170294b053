use permutohedral_core::nalgebra::DMatrix;
use rand::{distributions::Uniform, prelude::StdRng, Rng, SeedableRng};

/// `count` points uniformly scattered in a cube of side `extent` around `center`
pub fn random_cluster(center: &[f32], count: usize, extent: f32, seed: u64) -> DMatrix<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let offset = Uniform::new(-extent / 2.0, extent / 2.0);
    DMatrix::from_fn(count, center.len(), |_, column| {
        center[column] + rng.sample(offset)
    })
}

/// Stacks the rows of `a` on top of the rows of `b`
pub fn stack_rows(a: &DMatrix<f32>, b: &DMatrix<f32>) -> DMatrix<f32> {
    assert_eq!(a.ncols(), b.ncols());
    DMatrix::from_fn(a.nrows() + b.nrows(), a.ncols(), |row, column| {
        if row < a.nrows() {
            a[(row, column)]
        } else {
            b[(row - a.nrows(), column)]
        }
    })
}

/// Sorted copy of a set of lattice keys, for comparisons that don't depend on vertex ids
pub fn sorted_keys(keys: Vec<&[i32]>) -> Vec<Vec<i32>> {
    let mut keys: Vec<Vec<i32>> = keys.into_iter().map(|key| key.to_vec()).collect();
    keys.sort();
    keys
}
