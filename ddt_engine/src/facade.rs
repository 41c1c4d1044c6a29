//! The user-facing distributed triangulation: owns a tile container and a
//! messaging hub, and drives both through a scheduler to provide a single
//! coherent triangulation built from per-tile complexes.

use crate::partitioner::Partitioner;
use crate::scheduler::Scheduler;
use crate::splaying;
use ddt_container::{MessagingHub, Serializer, TileContainer};
use ddt_kernel::{CellHandle, Facet, Point, VertexHandle};
use ddt_tile::{median, TileIndex};

pub struct DistributedTriangulation<S: Serializer> {
	container: TileContainer<S>,
	hub: MessagingHub,
	scheduler: Scheduler,
}

impl<S: Serializer> DistributedTriangulation<S> {
	pub fn new(dimension: usize, memory_cap: Option<usize>, serializer: S, scheduler: Scheduler) -> Self {
		Self { container: TileContainer::new(dimension, memory_cap, serializer), hub: MessagingHub::new(), scheduler }
	}

	pub fn container(&self) -> &TileContainer<S> {
		&self.container
	}

	pub fn tile_indices(&self) -> Vec<TileIndex> {
		self.container.tile_indices()
	}

	/// Assigns every point in `points` to a tile via `partitioner`, seeds
	/// each tile's inbox and runs the four splaying phases to quiescence.
	pub fn insert(&self, points: Vec<Point>, partitioner: &dyn Partitioner) -> anyhow::Result<()> {
		let mut by_tile: std::collections::HashMap<TileIndex, Vec<(Point, TileIndex)>> = std::collections::HashMap::new();
		for p in points {
			let tile = partitioner.assign(&p);
			by_tile.entry(tile).or_default().push((p, tile));
		}
		let indices: Vec<TileIndex> = by_tile.keys().copied().collect();
		for idx in &indices {
			self.container.register(*idx);
		}
		for (tile, items) in by_tile {
			self.hub.seed_inbox(tile, items);
		}
		let all_indices = self.container.tile_indices();
		splaying::insert_received(&self.container, &self.hub, &self.scheduler, &all_indices)
	}

	pub fn insert_one(&self, point: Point, partitioner: &dyn Partitioner) -> anyhow::Result<()> {
		self.insert(vec![point], partitioner)
	}

	/// Re-assigns every currently represented point to a new tile layout via
	/// `new_partitioner`, clears every tile, and re-runs splaying with
	/// simplification suppressed on the first pass (foreign points may well
	/// arrive ahead of their own locals under the new assignment).
	pub fn partition(&self, new_partitioner: &dyn Partitioner) -> anyhow::Result<Self>
	where
		S: Clone,
	{
		let mut all_points: Vec<Point> = Vec::new();
		for idx in self.container.tile_indices() {
			self.container.with_tile(idx, |tile| {
				for (p, _) in tile.points_with_labels() {
					all_points.push(p);
				}
			})?;
		}

		let rebuilt = DistributedTriangulation::new(self.container.dimension(), None, self.container_serializer_clone(), Scheduler::Sequential);
		rebuilt.insert(all_points, new_partitioner)?;
		Ok(rebuilt)
	}

	fn container_serializer_clone(&self) -> S
	where
		S: Clone,
	{
		self.container.serializer_clone()
	}

	/// The tile that holds `p` as its main (locally owned) representative,
	/// if `p` is present anywhere in the triangulation.
	pub fn main(&self, p: &Point) -> anyhow::Result<Option<TileIndex>> {
		for idx in self.container.tile_indices() {
			let found = self.container.with_tile(idx, |tile| {
				tile.local()
					.vertices()
					.any(|v| tile.vertex_is_local(v) && tile.local().point(v).is_some_and(|q| q.same_as(p)))
			})?;
			if found {
				return Ok(Some(idx));
			}
		}
		Ok(None)
	}

	/// Every `(tile, vertex)` pair where the vertex is that tile's main
	/// representative. Eagerly materialized rather than a lazy iterator,
	/// since the underlying tiles can be evicted between calls.
	pub fn main_vertices(&self) -> anyhow::Result<Vec<(TileIndex, VertexHandle)>> {
		let mut out = Vec::new();
		for idx in self.container.tile_indices() {
			let locals = self.container.with_tile(idx, |tile| tile.local().vertices().filter(|v| tile.vertex_is_local(*v)).collect::<Vec<_>>())?;
			out.extend(locals.into_iter().map(|v| (idx, v)));
		}
		Ok(out)
	}

	pub fn main_facets(&self) -> anyhow::Result<Vec<(TileIndex, Facet)>> {
		let mut out = Vec::new();
		for idx in self.container.tile_indices() {
			let locals = self.container.with_tile(idx, |tile| tile.local().facets().filter(|f| tile.facet_is_main(*f)).collect::<Vec<_>>())?;
			out.extend(locals.into_iter().map(|f| (idx, f)));
		}
		Ok(out)
	}

	pub fn main_cells(&self) -> anyhow::Result<Vec<(TileIndex, CellHandle)>> {
		let mut out = Vec::new();
		for idx in self.container.tile_indices() {
			let locals = self.container.with_tile(idx, |tile| {
				tile.local().cells().filter(|c| !tile.local().is_cell_infinite(*c) && tile.cell_is_main(*c)).collect::<Vec<_>>()
			})?;
			out.extend(locals.into_iter().map(|c| (idx, c)));
		}
		Ok(out)
	}

	/// Resolves `c` to a non-foreign representative: if `c` is foreign in
	/// `idx` (every label on it differs from `idx`), relocates to its main
	/// tile first, since a foreign copy's `D+1` vertices may be ordered
	/// differently than the canonical one. Returns `None` if relocation
	/// fails (corruption) or `idx` does not carry `c` at all.
	fn resolve_cell(&self, idx: TileIndex, c: CellHandle) -> anyhow::Result<Option<(TileIndex, CellHandle)>> {
		let (is_foreign, labels) = self.container.with_tile(idx, |tile| (tile.cell_is_foreign(c), tile.cell_labels(c)))?;
		if !is_foreign {
			return Ok(Some((idx, c)));
		}
		if labels.is_empty() {
			return Ok(None);
		}
		let main = median::select(&labels);
		let source = self.container.with_tile(idx, |tile| tile.clone())?;
		let relocated = self.container.with_tile(main, |other| other.relocate_cell(&source, c))?;
		Ok(relocated.map(|rc| (main, rc)))
	}

	/// As [`Self::resolve_cell`] but for a facet.
	fn resolve_facet(&self, idx: TileIndex, f: Facet) -> anyhow::Result<Option<(TileIndex, Facet)>> {
		let (is_foreign, labels) = self.container.with_tile(idx, |tile| (tile.facet_is_foreign(f), tile.facet_labels(f)))?;
		if !is_foreign {
			return Ok(Some((idx, f)));
		}
		if labels.is_empty() {
			return Ok(None);
		}
		let main = median::select(&labels);
		let source = self.container.with_tile(idx, |tile| tile.clone())?;
		let relocated = self.container.with_tile(main, |other| other.relocate_facet(&source, f))?;
		Ok(relocated.map(|rf| (main, rf)))
	}

	/// The cell incident to `f`, relocating to `f`'s main tile first when
	/// `f` is foreign in `idx` so the returned cell's vertex indexing is
	/// consistent with that tile's convention.
	pub fn cell(&self, idx: TileIndex, f: Facet) -> anyhow::Result<Option<(TileIndex, CellHandle)>> {
		Ok(self.resolve_facet(idx, f)?.map(|(tile, f)| (tile, f.0)))
	}

	/// The `i`-th vertex of `c`, after relocating `c` to its main tile if
	/// it is foreign in `idx`.
	pub fn vertex(&self, idx: TileIndex, c: CellHandle, i: usize) -> anyhow::Result<Option<(TileIndex, VertexHandle)>> {
		let Some((tile, c)) = self.resolve_cell(idx, c)? else { return Ok(None) };
		let v = self.container.with_tile(tile, |t| t.local().cell_vertices(c).get(i).copied())?;
		Ok(v.map(|v| (tile, v)))
	}

	/// The facet opposite `c`'s `i`-th vertex, after relocating `c` to its
	/// main tile if it is foreign in `idx`.
	pub fn facet(&self, idx: TileIndex, c: CellHandle, i: usize) -> anyhow::Result<Option<(TileIndex, Facet)>> {
		let Some((tile, c)) = self.resolve_cell(idx, c)? else { return Ok(None) };
		Ok(Some((tile, Facet(c, i))))
	}

	/// The cell across `c`'s `i`-th facet, after relocating `c` to its main
	/// tile if it is foreign in `idx`.
	pub fn neighbor(&self, idx: TileIndex, c: CellHandle, i: usize) -> anyhow::Result<Option<(TileIndex, CellHandle)>> {
		let Some((tile, c)) = self.resolve_cell(idx, c)? else { return Ok(None) };
		let n = self.container.with_tile(tile, |t| t.local().neighbor(c, i))?;
		Ok(n.map(|n| (tile, n)))
	}

	/// The facet on the other side of `f`, after relocating `f` to its
	/// main tile if it is foreign in `idx`.
	pub fn mirror_facet(&self, idx: TileIndex, f: Facet) -> anyhow::Result<Option<(TileIndex, Facet)>> {
		let Some((tile, f)) = self.resolve_facet(idx, f)? else { return Ok(None) };
		let mf = self.container.with_tile(tile, |t| t.local().mirror_facet(f))?;
		Ok(Some((tile, mf)))
	}

	/// Confirms I6 (local Delaunay validity) for every tile, then I1 for up
	/// to `level` foreign vertices per tile (a bounded sampling depth, not a
	/// full relocation check, to keep this usable on large triangulations),
	/// then I2 and I3: every mixed facet/finite cell must have an
	/// orientation-equal (resp. equal) copy in every other tile it is
	/// labeled into. Returns false at the first failure; logs a reason when
	/// `verbose`.
	pub fn is_valid(&self, verbose: bool, level: usize) -> anyhow::Result<bool> {
		let indices = self.container.tile_indices();
		for idx in &indices {
			let locally_valid = self.container.with_tile(*idx, |tile| tile.is_locally_valid(verbose))?;
			if !locally_valid {
				if verbose {
					log::warn!("tile {idx} failed local Delaunay validity");
				}
				return Ok(false);
			}
		}

		for idx in &indices {
			let foreign_points = self.container.with_tile(*idx, |tile| {
				tile.local()
					.vertices()
					.filter(|v| tile.vertex_is_foreign(*v))
					.take(level)
					.filter_map(|v| tile.local().point(v).cloned().zip(tile.vertex_label(v)))
					.collect::<Vec<_>>()
			})?;
			for (p, owner) in foreign_points {
				let present = self.container.with_tile(owner, |other| {
					other.local().vertices().any(|v| other.vertex_is_local(v) && other.local().point(v).is_some_and(|q| q.same_as(&p)))
				})?;
				if !present {
					if verbose {
						log::warn!("tile {idx} holds a foreign vertex at {p:?} labeled {owner} that tile {owner} does not carry as local");
					}
					return Ok(false);
				}
			}
		}

		for idx in &indices {
			let mixed_facets = self.container.with_tile(*idx, |tile| {
				tile.local()
					.facets()
					.filter(|f| !tile.local().is_facet_infinite(*f) && tile.facet_is_mixed(*f))
					.map(|f| (f, tile.facet_labels(f)))
					.collect::<Vec<_>>()
			})?;
			if mixed_facets.is_empty() {
				continue;
			}
			let source = self.container.with_tile(*idx, |tile| tile.clone())?;
			for (f, labels) in mixed_facets {
				for label in labels.iter().filter(|l| **l != *idx) {
					let found = self.container.with_tile(*label, |other| other.relocate_facet(&source, f).is_some())?;
					if !found {
						if verbose {
							log::warn!("tile {label} holds no orientation-equal copy of mixed facet {f:?} owned by tile {idx}");
						}
						return Ok(false);
					}
				}
			}
		}

		for idx in &indices {
			let mixed_cells = self.container.with_tile(*idx, |tile| {
				tile.local()
					.cells()
					.filter(|c| !tile.local().is_cell_infinite(*c) && tile.cell_is_mixed(*c))
					.map(|c| (c, tile.cell_labels(c)))
					.collect::<Vec<_>>()
			})?;
			if mixed_cells.is_empty() {
				continue;
			}
			let source = self.container.with_tile(*idx, |tile| tile.clone())?;
			for (c, labels) in mixed_cells {
				for label in labels.iter().filter(|l| **l != *idx) {
					let found = self.container.with_tile(*label, |other| other.relocate_cell(&source, c).is_some())?;
					if !found {
						if verbose {
							log::warn!("tile {label} holds no equal copy of mixed cell {c:?} owned by tile {idx}");
						}
						return Ok(false);
					}
				}
			}
		}
		Ok(true)
	}

	pub fn save_all(&self) -> anyhow::Result<()> {
		self.container.save_all()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use ddt_container::NullSerializer;
	use ddt_core::ConcurrencyLimits;

	struct FixedPartitioner(TileIndex);
	impl Partitioner for FixedPartitioner {
		fn assign(&self, _p: &Point) -> TileIndex {
			self.0
		}
	}

	struct AxisPartitioner;
	impl Partitioner for AxisPartitioner {
		fn assign(&self, p: &Point) -> TileIndex {
			if p.coord(0) < 0.0 {
				TileIndex::new(0)
			} else {
				TileIndex::new(1)
			}
		}
	}

	#[test]
	fn single_tile_insert_is_valid_and_reports_main_for_every_point() {
		let dt = DistributedTriangulation::new(2, None, NullSerializer, Scheduler::Sequential);
		let points = vec![
			Point::new(vec![-10.0, -10.0]),
			Point::new(vec![10.0, -10.0]),
			Point::new(vec![0.0, 10.0]),
			Point::new(vec![1.0, 1.0]),
		];
		let partitioner = FixedPartitioner(TileIndex::new(0));
		dt.insert(points.clone(), &partitioner).unwrap();
		assert!(dt.is_valid(false, 10).unwrap());
		for p in &points {
			assert_eq!(dt.main(p).unwrap(), Some(TileIndex::new(0)));
		}
	}

	#[test]
	fn two_tile_insert_assigns_each_point_a_unique_main_tile() {
		let dt = DistributedTriangulation::new(2, None, NullSerializer, Scheduler::new(ddt_core::SchedulerKind::Sequential, ConcurrencyLimits::new(1)));
		let points = vec![
			Point::new(vec![-5.0, -5.0]),
			Point::new(vec![-5.0, 5.0]),
			Point::new(vec![-1.0, 0.0]),
			Point::new(vec![5.0, 5.0]),
			Point::new(vec![5.0, -5.0]),
			Point::new(vec![1.0, 0.0]),
		];
		dt.insert(points.clone(), &AxisPartitioner).unwrap();
		assert!(dt.is_valid(false, 10).unwrap());

		let mains = dt.main_vertices().unwrap();
		assert_eq!(mains.len(), points.len());
	}

	/// Repartitioning preserves the union-by-main point set and local
	/// Delaunay validity even though the tile layout changes underneath it.
	#[test]
	fn repartition_preserves_the_union_of_main_points() {
		let dt = DistributedTriangulation::new(2, None, NullSerializer, Scheduler::Sequential);
		let points: Vec<Point> = (0..12)
			.map(|i| {
				let x = (i % 4) as f64 - 1.5;
				let y = (i / 4) as f64 - 1.0;
				Point::new(vec![x, y])
			})
			.collect();
		dt.insert(points.clone(), &AxisPartitioner).unwrap();
		assert!(dt.is_valid(false, 10).unwrap());

		struct QuadrantPartitioner;
		impl Partitioner for QuadrantPartitioner {
			fn assign(&self, p: &Point) -> TileIndex {
				let idx = usize::from(p.coord(0) >= 0.0) + 2 * usize::from(p.coord(1) >= 0.0);
				TileIndex::new(idx as u64)
			}
		}

		let repartitioned = dt.partition(&QuadrantPartitioner).unwrap();
		assert!(repartitioned.is_valid(false, 10).unwrap());

		let mut before: Vec<Point> = dt.main_vertices().unwrap().into_iter().filter_map(|(idx, v)| dt.container().with_tile(idx, |t| t.local().point(v).cloned()).unwrap()).collect();
		let mut after: Vec<Point> =
			repartitioned.main_vertices().unwrap().into_iter().filter_map(|(idx, v)| repartitioned.container().with_tile(idx, |t| t.local().point(v).cloned()).unwrap()).collect();
		let key = |p: &Point| p.coords().iter().map(|c| (c * 1e9).round() as i64).collect::<Vec<_>>();
		before.sort_by_key(&key);
		after.sort_by_key(&key);
		assert_eq!(before.len(), after.len());
		for (b, a) in before.iter().zip(after.iter()) {
			assert!(b.same_as(a));
		}
	}

	/// The façade's navigation operations agree with the kernel's own when
	/// the starting cell/facet is already non-foreign, and `mirror_facet`
	/// composed with itself is the identity through the façade too.
	#[test]
	fn navigation_operations_round_trip_through_mirror_facet() {
		let dt = DistributedTriangulation::new(2, None, NullSerializer, Scheduler::Sequential);
		let points = vec![
			Point::new(vec![-10.0, -10.0]),
			Point::new(vec![10.0, -10.0]),
			Point::new(vec![0.0, 10.0]),
			Point::new(vec![1.0, 1.0]),
		];
		let partitioner = FixedPartitioner(TileIndex::new(0));
		dt.insert(points, &partitioner).unwrap();

		let idx = TileIndex::new(0);
		let some_cell = dt.container().with_tile(idx, |tile| tile.local().cells().find(|c| !tile.local().is_cell_infinite(*c))).unwrap().unwrap();

		let (facet_tile, facet) = dt.facet(idx, some_cell, 0).unwrap().unwrap();
		assert_eq!(facet_tile, idx);
		assert_eq!(facet, Facet(some_cell, 0));

		let (cell_tile, cell_back) = dt.cell(facet_tile, facet).unwrap().unwrap();
		assert_eq!(cell_tile, idx);
		assert_eq!(cell_back, some_cell);

		let (mirror_tile, mirrored) = dt.mirror_facet(idx, facet).unwrap().unwrap();
		let (back_tile, back) = dt.mirror_facet(mirror_tile, mirrored).unwrap().unwrap();
		assert_eq!(back_tile, idx);
		assert_eq!(back, facet);
	}
}
