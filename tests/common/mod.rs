//! Synthetic datasets shared by the integration tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Standard normal sample via the Box-Muller transform.
fn gaussian(rng: &mut StdRng) -> f32 {
    let u1: f64 = rng.random_range(f64::EPSILON..1.0);
    let u2: f64 = rng.random();
    ((-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()) as f32
}

/// `per_blob` points around each center with Gaussian noise of `spread`.
pub fn blobs(centers: &[[f32; 2]], per_blob: usize, spread: f32, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    centers
        .iter()
        .flat_map(|center| std::iter::repeat_n(*center, per_blob))
        .map(|[x, y]| vec![x + spread * gaussian(&mut rng), y + spread * gaussian(&mut rng)])
        .collect()
}

/// Three well-separated blobs at (0,0), (10,10) and (-10,10).
pub fn three_blobs(seed: u64) -> Vec<Vec<f32>> {
    blobs(&[[0.0, 0.0], [10.0, 10.0], [-10.0, 10.0]], 30, 0.5, seed)
}

/// Scattered points with no obvious structure.
pub fn scattered(n: usize, dimension: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| (0..dimension).map(|_| rng.random_range(-5.0..5.0)).collect())
        .collect()
}
