use crate::median;
use crate::statistics::Statistics;
use crate::tile_index::TileIndex;
use ddt_kernel::{are_cells_equal, are_facets_equal, CellHandle, Facet, Point, Triangulation, VertexHandle};
use std::collections::{HashMap, HashSet};

/// A local Delaunay complex plus the tile label carried by every finite
/// vertex, and the locality/canonical-owner predicates built on top of it.
#[derive(Clone)]
pub struct TileTriangulation {
	id: TileIndex,
	local: Triangulation,
	labels: HashMap<VertexHandle, TileIndex>,
	statistics: Option<Statistics>,
}

impl TileTriangulation {
	pub fn new(id: TileIndex, dimension: usize) -> Self {
		Self { id, local: Triangulation::new(dimension), labels: HashMap::new(), statistics: None }
	}

	pub fn id(&self) -> TileIndex {
		self.id
	}

	pub fn dimension(&self) -> usize {
		self.local.dimension()
	}

	pub fn local(&self) -> &Triangulation {
		&self.local
	}

	pub fn number_of_vertices(&self) -> usize {
		self.local.number_of_vertices()
	}

	pub fn number_of_cells(&self) -> usize {
		self.local.number_of_cells()
	}

	pub fn statistics(&self) -> Option<Statistics> {
		self.statistics
	}

	pub fn vertex_label(&self, v: VertexHandle) -> Option<TileIndex> {
		if self.local.is_vertex_infinite(v) {
			None
		} else {
			self.labels.get(&v).copied()
		}
	}

	pub fn vertex_is_local(&self, v: VertexHandle) -> bool {
		self.vertex_label(v) == Some(self.id)
	}

	pub fn vertex_is_foreign(&self, v: VertexHandle) -> bool {
		matches!(self.vertex_label(v), Some(l) if l != self.id)
	}

	pub fn vertex_is_main(&self, v: VertexHandle) -> bool {
		self.vertex_is_local(v)
	}

	fn finite_labels<I: IntoIterator<Item = VertexHandle>>(&self, vertices: I) -> Vec<TileIndex> {
		vertices.into_iter().filter(|v| !self.local.is_vertex_infinite(*v)).filter_map(|v| self.labels.get(&v).copied()).collect()
	}

	pub fn facet_labels(&self, f: Facet) -> Vec<TileIndex> {
		self.finite_labels(self.local.facet_vertices(f))
	}

	pub fn cell_labels(&self, c: CellHandle) -> Vec<TileIndex> {
		self.finite_labels(self.local.cell_vertices(c).iter().copied())
	}

	pub fn facet_is_local(&self, f: Facet) -> bool {
		let labels = self.facet_labels(f);
		!labels.is_empty() && labels.iter().all(|l| *l == self.id)
	}

	pub fn facet_is_foreign(&self, f: Facet) -> bool {
		let labels = self.facet_labels(f);
		!labels.is_empty() && labels.iter().all(|l| *l != self.id)
	}

	pub fn facet_is_mixed(&self, f: Facet) -> bool {
		!self.facet_is_local(f) && !self.facet_is_foreign(f)
	}

	pub fn facet_is_main(&self, f: Facet) -> bool {
		if self.local.is_facet_infinite(f) {
			return false;
		}
		let labels = self.facet_labels(f);
		!labels.is_empty() && median::is_main(&labels, self.id)
	}

	pub fn cell_is_local(&self, c: CellHandle) -> bool {
		let labels = self.cell_labels(c);
		!labels.is_empty() && labels.iter().all(|l| *l == self.id)
	}

	pub fn cell_is_foreign(&self, c: CellHandle) -> bool {
		let labels = self.cell_labels(c);
		!labels.is_empty() && labels.iter().all(|l| *l != self.id)
	}

	pub fn cell_is_mixed(&self, c: CellHandle) -> bool {
		!self.cell_is_local(c) && !self.cell_is_foreign(c)
	}

	pub fn cell_is_main(&self, c: CellHandle) -> bool {
		let labels = self.cell_labels(c);
		!labels.is_empty() && median::is_main(&labels, self.id)
	}

	/// Inserts `p` labeled with `label`. Does not simplify; callers batching
	/// many points should use [`Self::insert_many`] instead.
	pub fn insert(&mut self, p: Point, label: TileIndex) -> (VertexHandle, bool) {
		let (v, inserted) = self.local.insert(p);
		if inserted {
			self.labels.insert(v, label);
		} else {
			debug_assert_eq!(self.labels.get(&v).copied(), Some(label), "existing vertex re-inserted with a different tile label");
		}
		self.statistics = None;
		(v, inserted)
	}

	fn find_vertex_by_point(&self, p: &Point) -> Option<VertexHandle> {
		self.local.vertices().find(|v| self.local.point(*v).is_some_and(|q| q.same_as(p)))
	}

	/// Removes `v` by rebuilding the local triangulation without it. The
	/// rebuild reassigns every vertex handle, so this is the only path
	/// allowed to mutate `labels` wholesale; callers must not hold onto
	/// handles across a call to this method.
	pub fn remove(&mut self, v: VertexHandle) {
		self.remove_many(&HashSet::from([v]));
	}

	fn remove_many(&mut self, to_remove: &HashSet<VertexHandle>) {
		if to_remove.is_empty() {
			return;
		}
		let remaining: Vec<(Point, TileIndex)> = self
			.local
			.vertices()
			.filter(|v| !to_remove.contains(v))
			.filter_map(|v| self.local.point(v).cloned().map(|p| (p, self.labels[&v])))
			.collect();
		self.local.clear();
		self.labels.clear();
		for (p, label) in remaining {
			let (v, inserted) = self.local.insert(p);
			debug_assert!(inserted);
			self.labels.insert(v, label);
		}
		self.statistics = None;
	}

	/// If `v` is foreign and has no finite local neighbor, removes it and
	/// returns `true`.
	pub fn simplify(&mut self, v: VertexHandle) -> bool {
		if !self.vertex_is_foreign(v) {
			return false;
		}
		let has_local_neighbor = self.local.adjacent_vertices(v).into_iter().any(|w| !self.local.is_vertex_infinite(w) && self.vertex_is_local(w));
		if has_local_neighbor {
			return false;
		}
		self.remove(v);
		true
	}

	/// Up to `2 * dimension` distinct local vertices attaining the per-axis
	/// min/max among this tile's local finite vertices.
	pub fn get_axis_extreme_points(&self) -> Vec<Point> {
		let d = self.dimension();
		let mut selected: Vec<VertexHandle> = Vec::new();
		for axis in 0..d {
			let mut min_v = None;
			let mut max_v = None;
			let mut min_c = f64::INFINITY;
			let mut max_c = f64::NEG_INFINITY;
			for v in self.local.vertices() {
				if !self.vertex_is_local(v) {
					continue;
				}
				let c = self.local.approximate_cartesian_coordinate(v, axis);
				if c < min_c {
					min_c = c;
					min_v = Some(v);
				}
				if c > max_c {
					max_c = c;
					max_v = Some(v);
				}
			}
			for candidate in [min_v, max_v].into_iter().flatten() {
				if !selected.contains(&candidate) {
					selected.push(candidate);
				}
			}
		}
		selected.into_iter().filter_map(|v| self.local.point(v).cloned()).collect()
	}

	/// For each newly inserted vertex, the cross-tile neighbor pairs that
	/// need to learn about each other during splaying.
	pub fn get_finite_neighbors(&self, inserted: &[VertexHandle]) -> Vec<(TileIndex, Point, TileIndex)> {
		let mut out = Vec::new();
		for v in inserted {
			let Some(idv) = self.vertex_label(*v) else { continue };
			for w in self.local.adjacent_vertices(*v) {
				if self.local.is_vertex_infinite(w) {
					continue;
				}
				let Some(idw) = self.vertex_label(w) else { continue };
				if idw == idv {
					continue;
				}
				if idv != self.id {
					if let Some(p) = self.local.point(w) {
						out.push((idv, p.clone(), idw));
					}
				}
				if idw != self.id {
					if let Some(p) = self.local.point(*v) {
						out.push((idw, p.clone(), idv));
					}
				}
			}
		}
		out
	}

	/// Inserts `received` (spatially sorted first for locality). When
	/// `simplify_enabled` is set, any newly inserted vertex whose star is
	/// already entirely foreign is dropped again immediately (used by the
	/// INSERT and SPLAY phases; the BROADCAST phase disables this since a
	/// broadcast point may turn out to matter once more points arrive).
	/// Returns the surviving newly inserted vertices (filtered to only
	/// those touching a local vertex when `report_mixed_only` is set) and
	/// the total number of points actually inserted.
	pub fn insert_many(&mut self, mut received: Vec<(Point, TileIndex)>, report_mixed_only: bool, simplify_enabled: bool) -> (Vec<VertexHandle>, usize) {
		sort_points_morton(&mut received);

		let mut inserted_points: Vec<(Point, TileIndex)> = Vec::new();
		for (p, label) in received {
			let (v, inserted) = self.insert(p.clone(), label);
			if inserted {
				inserted_points.push((self.local.point(v).cloned().unwrap(), label));
			}
		}
		let count = inserted_points.len();

		let mut to_remove: HashSet<VertexHandle> = HashSet::new();
		let mut keep_and_report: Vec<(Point, bool)> = Vec::new();
		for (p, label) in &inserted_points {
			let v = self.find_vertex_by_point(p).expect("just-inserted point must be present");
			let is_foreign = *label != self.id;
			let touches_local = self.local.adjacent_vertices(v).into_iter().any(|w| !self.local.is_vertex_infinite(w) && self.vertex_is_local(w));
			if simplify_enabled && is_foreign && !touches_local {
				to_remove.insert(v);
				continue;
			}
			let report = if report_mixed_only { touches_local } else { true };
			keep_and_report.push((p.clone(), report));
		}

		self.remove_many(&to_remove);

		let newly_inserted = keep_and_report
			.into_iter()
			.filter(|(_, report)| *report)
			.filter_map(|(p, _)| self.find_vertex_by_point(&p))
			.collect();

		(newly_inserted, count)
	}

	/// Recomputes canonical-owner statistics using the fused
	/// lower/equal/finite counting rule: a label is the median of a small
	/// array iff its equal-value block straddles the middle index, which
	/// can be answered by two counting passes instead of a full sort.
	pub fn finalize(&mut self) {
		let main_vertices = self.local.vertices().filter(|v| self.vertex_is_local(*v)).count();

		let mut main_facets = 0;
		for f in self.local.facets() {
			if self.local.is_facet_infinite(f) {
				continue;
			}
			let labels = self.facet_labels(f);
			if !labels.is_empty() && self.is_median_fused(&labels) {
				main_facets += 1;
			}
		}

		let mut main_cells = 0;
		for c in self.local.cells() {
			if self.local.is_cell_infinite(c) {
				continue;
			}
			let labels = self.cell_labels(c);
			if !labels.is_empty() && self.is_median_fused(&labels) {
				main_cells += 1;
			}
		}

		self.statistics = Some(Statistics { main_vertices, main_facets, main_cells });
	}

	fn is_median_fused(&self, labels: &[TileIndex]) -> bool {
		let n = labels.len();
		let target = (n - 1) / 2;
		let lower = labels.iter().filter(|&&l| l < self.id).count();
		let equal = labels.iter().filter(|&&l| l == self.id).count();
		target >= lower && target < lower + equal
	}

	/// The local complex's own Delaunay validity (invariant I6); does not
	/// check relocatability against other tiles.
	pub fn is_locally_valid(&self, verbose: bool) -> bool {
		self.local.is_valid(verbose)
	}

	pub fn relocate_vertex(&self, other: &TileTriangulation, v: VertexHandle) -> Option<VertexHandle> {
		let p = other.local.point(v)?;
		self.find_vertex_by_point(p)
	}

	pub fn relocate_facet(&self, other: &TileTriangulation, f: Facet) -> Option<Facet> {
		self.local.facets().find(|candidate| are_facets_equal(&self.local, *candidate, &other.local, f))
	}

	pub fn relocate_cell(&self, other: &TileTriangulation, c: CellHandle) -> Option<CellHandle> {
		self.local.cells().find(|candidate| are_cells_equal(&self.local, *candidate, &other.local, c))
	}

	/// The persisted form the default serializer writes: every finite
	/// vertex's point and tile label. The cell graph is not persisted; it
	/// is reconstructed by re-triangulating on load.
	pub fn points_with_labels(&self) -> Vec<(Point, TileIndex)> {
		self.local.vertices().filter_map(|v| self.local.point(v).cloned().map(|p| (p, self.labels[&v]))).collect()
	}

	/// Rebuilds a tile triangulation from a persisted point/label stream.
	pub fn from_points(id: TileIndex, dimension: usize, points: Vec<(Point, TileIndex)>) -> Self {
		let mut tile = Self::new(id, dimension);
		for (p, label) in points {
			tile.insert(p, label);
		}
		tile
	}
}

/// Sorts `(point, label)` pairs along a Morton (Z-order) curve for locality
/// during batched insertion, mirroring `Triangulation::spatial_sort` for
/// inputs that do not have vertex handles yet.
fn sort_points_morton(items: &mut [(Point, TileIndex)]) {
	if items.is_empty() {
		return;
	}
	let d = items[0].0.dimension();
	let mut min = vec![f64::INFINITY; d];
	let mut max = vec![f64::NEG_INFINITY; d];
	for (p, _) in items.iter() {
		for i in 0..d {
			min[i] = min[i].min(p.coord(i));
			max[i] = max[i].max(p.coord(i));
		}
	}
	let bits_per_dim = (64 / d.max(1)).max(1);
	let morton = |p: &Point| -> u64 {
		let mut code: u64 = 0;
		for i in 0..d {
			let span = (max[i] - min[i]).max(1e-12);
			let normalized = ((p.coord(i) - min[i]) / span).clamp(0.0, 1.0);
			let quant = (normalized * ((1u64 << bits_per_dim) - 1) as f64) as u64;
			code |= quant << (i * bits_per_dim);
		}
		code
	};
	items.sort_by_key(|(p, _)| morton(p));
}

#[cfg(test)]
mod tests {
	use super::*;

	fn p(coords: &[f64]) -> Point {
		Point::new(coords.to_vec())
	}

	#[test]
	fn inserted_local_point_is_local_and_main() {
		let mut tt = TileTriangulation::new(TileIndex::new(0), 2);
		let (v, inserted) = tt.insert(p(&[0.0, 0.0]), TileIndex::new(0));
		assert!(inserted);
		assert!(tt.vertex_is_local(v));
		assert!(tt.vertex_is_main(v));
	}

	#[test]
	fn simplify_removes_isolated_foreign_vertex() {
		let mut tt = TileTriangulation::new(TileIndex::new(0), 2);
		tt.insert(p(&[-10.0, -10.0]), TileIndex::new(0));
		tt.insert(p(&[10.0, -10.0]), TileIndex::new(0));
		tt.insert(p(&[0.0, 10.0]), TileIndex::new(0));
		let (foreign, _) = tt.insert(p(&[100.0, 100.0]), TileIndex::new(1));
		let removed = tt.simplify(foreign);
		assert!(removed);
		assert_eq!(tt.number_of_vertices(), 3);
	}

	#[test]
	fn simplify_keeps_foreign_vertex_with_local_neighbor() {
		let mut tt = TileTriangulation::new(TileIndex::new(0), 2);
		tt.insert(p(&[-10.0, -10.0]), TileIndex::new(0));
		tt.insert(p(&[10.0, -10.0]), TileIndex::new(0));
		tt.insert(p(&[0.0, 10.0]), TileIndex::new(0));
		let (foreign, _) = tt.insert(p(&[0.0, 0.0]), TileIndex::new(1));
		let removed = tt.simplify(foreign);
		assert!(!removed);
		assert_eq!(tt.number_of_vertices(), 4);
	}

	#[test]
	fn finalize_counts_local_vertices_as_main() {
		let mut tt = TileTriangulation::new(TileIndex::new(0), 2);
		tt.insert(p(&[-10.0, -10.0]), TileIndex::new(0));
		tt.insert(p(&[10.0, -10.0]), TileIndex::new(0));
		tt.insert(p(&[0.0, 10.0]), TileIndex::new(0));
		tt.finalize();
		let stats = tt.statistics().unwrap();
		assert_eq!(stats.main_vertices, 3);
	}

	#[test]
	fn get_axis_extreme_points_returns_local_extrema() {
		let mut tt = TileTriangulation::new(TileIndex::new(0), 2);
		tt.insert(p(&[-10.0, 0.0]), TileIndex::new(0));
		tt.insert(p(&[10.0, 0.0]), TileIndex::new(0));
		tt.insert(p(&[0.0, -10.0]), TileIndex::new(0));
		tt.insert(p(&[0.0, 10.0]), TileIndex::new(0));
		let extremes = tt.get_axis_extreme_points();
		assert!(extremes.len() <= 4);
		assert!(!extremes.is_empty());
	}
}
