use rand::{prelude::StdRng, Rng, SeedableRng};

/// `count` random feature vectors with components in `[-extent, extent)`
pub(crate) fn random_features(dim: usize, count: usize, extent: f32, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| (0..dim).map(|_| rng.gen_range(-extent..extent)).collect())
        .collect()
}
