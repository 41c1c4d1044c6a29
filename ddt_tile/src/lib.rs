//! Tile-local Delaunay triangulation, tile-index labels and the
//! locality/canonical-owner predicates the splaying engine drives.

pub mod median;
pub mod statistics;
pub mod tile_index;
pub mod tile_triangulation;

pub use statistics::Statistics;
pub use tile_index::TileIndex;
pub use tile_triangulation::TileTriangulation;
