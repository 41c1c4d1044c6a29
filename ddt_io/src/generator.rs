//! Synthetic point sets for benchmarking and smoke-testing the engine.

use ddt_kernel::Point;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Draws points uniformly from `[-range, range]^dimension`, seeded for
/// reproducible runs across `--scheduler` variants (see property S3).
pub struct RandomPointGenerator {
	dimension: usize,
	range: f64,
	rng: StdRng,
}

impl RandomPointGenerator {
	pub fn new(dimension: usize, range: f64, seed: u64) -> Self {
		Self { dimension, range, rng: StdRng::seed_from_u64(seed) }
	}

	pub fn generate(&mut self, count: usize) -> Vec<Point> {
		(0..count).map(|_| self.next_point()).collect()
	}

	fn next_point(&mut self) -> Point {
		let coords = (0..self.dimension).map(|_| self.rng.random_range(-self.range..=self.range)).collect();
		Point::new(coords)
	}
}
