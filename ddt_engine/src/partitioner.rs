//! The capability trait a point-to-tile assignment must implement to drive
//! [`crate::facade::DistributedTriangulation::partition`]. `ddt_io` ships
//! the grid implementation; this crate only needs the contract.

use ddt_kernel::Point;
use ddt_tile::TileIndex;

pub trait Partitioner: Send + Sync {
	fn assign(&self, p: &Point) -> TileIndex;
}
