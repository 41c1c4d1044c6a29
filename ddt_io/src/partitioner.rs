//! Splits the ambient bounding box into an axis-aligned grid of tiles.

use ddt_engine::Partitioner;
use ddt_kernel::{Bbox, Point};
use ddt_tile::TileIndex;

/// Assigns each point to the cell of a `k_1 x k_2 x ... x k_D` grid over
/// `bbox` containing it. Points on the boundary between cells fall into the
/// lower-indexed cell (inclusive on the low edge, exclusive on the high
/// edge, except for the outermost edge which is inclusive).
pub struct GridPartitioner {
	bbox: Bbox,
	grid: Vec<usize>,
}

impl GridPartitioner {
	pub fn new(bbox: Bbox, grid: Vec<usize>) -> Self {
		assert!(grid.iter().all(|k| *k > 0), "grid dimensions must be positive");
		Self { bbox, grid }
	}

	pub fn number_of_tiles(&self) -> usize {
		self.grid.iter().product::<usize>().max(1)
	}

	fn cell_index(&self, p: &Point, axis: usize) -> usize {
		let k = self.grid[axis];
		let min = self.bbox.min()[axis];
		let max = self.bbox.max()[axis];
		let span = (max - min).max(1e-12);
		let normalized = ((p.coord(axis) - min) / span).clamp(0.0, 1.0);
		((normalized * k as f64) as usize).min(k - 1)
	}
}

impl Partitioner for GridPartitioner {
	fn assign(&self, p: &Point) -> TileIndex {
		let mut flat = 0u64;
		let mut stride = 1u64;
		for axis in 0..self.grid.len() {
			flat += self.cell_index(p, axis) as u64 * stride;
			stride *= self.grid[axis] as u64;
		}
		TileIndex::new(flat)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn bbox() -> Bbox {
		let mut b = Bbox::empty(2);
		b.extend(&Point::new(vec![-10.0, -10.0]));
		b.extend(&Point::new(vec![10.0, 10.0]));
		b
	}

	#[test]
	fn assigns_corner_points_to_distinct_tiles() {
		let partitioner = GridPartitioner::new(bbox(), vec![2, 2]);
		let bottom_left = partitioner.assign(&Point::new(vec![-9.0, -9.0]));
		let top_right = partitioner.assign(&Point::new(vec![9.0, 9.0]));
		assert_ne!(bottom_left, top_right);
	}

	#[test]
	fn number_of_tiles_is_grid_product() {
		let partitioner = GridPartitioner::new(bbox(), vec![3, 4]);
		assert_eq!(partitioner.number_of_tiles(), 12);
	}
}
