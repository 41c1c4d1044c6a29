//! A flattened, once-per-write view of one tile's local complex: every
//! finite vertex renumbered to a dense per-tile local index, plus its
//! finite cells and facets expressed in those local indices. Every writer
//! in this crate builds one of these per tile instead of walking the
//! kernel triangulation directly, so the output formats agree on what
//! "local" means for a vertex, cell or facet.

use ddt_container::{Serializer, TileContainer};
use ddt_kernel::Point;
use ddt_tile::{TileIndex, TileTriangulation};
use std::collections::HashMap;

pub struct VertexRow {
	pub point: Point,
	pub is_local: bool,
}

pub struct CellRow {
	/// Local indices into [`TileSnapshot::vertices`], length `dimension + 1`.
	pub vertex_indices: Vec<usize>,
	/// Number of this cell's vertices whose label equals the owning tile.
	pub local_count: usize,
	pub is_main: bool,
}

pub struct FacetRow {
	pub vertex_indices: Vec<usize>,
	pub local_count: usize,
	pub is_main: bool,
}

pub struct TileSnapshot {
	pub index: TileIndex,
	pub dimension: usize,
	pub vertices: Vec<VertexRow>,
	pub cells: Vec<CellRow>,
	pub facets: Vec<FacetRow>,
}

pub fn snapshot<S: Serializer>(container: &TileContainer<S>, index: TileIndex) -> anyhow::Result<TileSnapshot> {
	container.with_tile(index, |tile| snapshot_of(tile))
}

fn snapshot_of(tile: &TileTriangulation) -> TileSnapshot {
	let local = tile.local();
	let mut local_index = HashMap::new();
	let mut vertices = Vec::new();
	for v in local.vertices() {
		let Some(p) = local.point(v) else { continue };
		local_index.insert(v, vertices.len());
		vertices.push(VertexRow { point: p.clone(), is_local: tile.vertex_is_local(v) });
	}

	let mut cells = Vec::new();
	for c in local.cells() {
		if local.is_cell_infinite(c) {
			continue;
		}
		let verts = local.cell_vertices(c);
		let Some(indices) = verts.iter().map(|v| local_index.get(v).copied()).collect::<Option<Vec<_>>>() else { continue };
		let local_count = verts.iter().filter(|v| tile.vertex_is_local(**v)).count();
		cells.push(CellRow { vertex_indices: indices, local_count, is_main: tile.cell_is_main(c) });
	}

	let mut facets = Vec::new();
	for f in local.facets() {
		if local.is_facet_infinite(f) {
			continue;
		}
		let verts = local.facet_vertices(f);
		let Some(indices) = verts.iter().map(|v| local_index.get(v).copied()).collect::<Option<Vec<_>>>() else { continue };
		let local_count = verts.iter().filter(|v| tile.vertex_is_local(*v)).count();
		facets.push(FacetRow { vertex_indices: indices, local_count, is_main: tile.facet_is_main(f) });
	}

	TileSnapshot { index: tile.id(), dimension: tile.dimension(), vertices, cells, facets }
}
