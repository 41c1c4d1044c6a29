use ddt_tile::{TileIndex, TileTriangulation};

/// Persists and restores one tile at a time, keyed by its index.
///
/// Implementations must make `save` and `load` atomic with respect to a
/// single tile; the container relies on that to evict tiles mid-run
/// without corrupting them.
pub trait Serializer: Send + Sync {
	fn has_tile(&self, index: TileIndex) -> bool;
	fn load(&self, index: TileIndex, dimension: usize) -> anyhow::Result<TileTriangulation>;
	fn save(&self, tile: &TileTriangulation) -> anyhow::Result<()>;
}

/// A serializer that never persists anything: every tile starts empty and
/// `save` is a no-op. Used when the container's memory cap is disabled, and
/// in tests that don't care about persistence.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSerializer;

impl Serializer for NullSerializer {
	fn has_tile(&self, _index: TileIndex) -> bool {
		false
	}

	fn load(&self, index: TileIndex, dimension: usize) -> anyhow::Result<TileTriangulation> {
		Ok(TileTriangulation::new(index, dimension))
	}

	fn save(&self, _tile: &TileTriangulation) -> anyhow::Result<()> {
		anyhow::bail!("NullSerializer cannot save a tile; set a memory cap only together with a real serializer")
	}
}
