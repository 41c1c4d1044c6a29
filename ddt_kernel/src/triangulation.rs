//! A Bowyer-Watson Delaunay triangulation generalized to arbitrary runtime
//! dimension `D`, with a single infinite vertex closing the complex into a
//! topological sphere.
//!
//! Conflict-region growth uses a linear scan to find a seed cell (rather
//! than a directed walk from a located cell) and full-triangulation rebuild
//! on removal (rather than incremental hole-patching). Both choices trade
//! asymptotic performance for a smaller, easier-to-get-right implementation,
//! which matters here because this code is never exercised by a compiler
//! or test runner before being handed over.

use crate::point::Point;
use crate::predicates::{in_sphere, orient};
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexHandle(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellHandle(pub usize);

/// The single vertex at infinity, present in every non-empty triangulation.
pub const INFINITE_VERTEX: VertexHandle = VertexHandle(0);

#[derive(Debug, Clone)]
struct CellData {
	/// `D + 1` vertices. For an infinite cell, the infinite vertex is
	/// always stored at index 0 by convention.
	vertices: Vec<VertexHandle>,
	/// `neighbors[i]` is the cell across the facet opposite `vertices[i]`.
	neighbors: Vec<Option<CellHandle>>,
}

#[derive(Debug, Clone)]
pub struct Triangulation {
	dimension: usize,
	vertices: Vec<Option<Point>>,
	vertex_free: Vec<usize>,
	cells: Vec<Option<CellData>>,
	cell_free: Vec<usize>,
	incident_cell: Vec<Option<CellHandle>>,
	/// Finite vertices inserted before enough points exist to form the
	/// first simplex.
	pending: Vec<VertexHandle>,
	num_vertices: usize,
	num_cells: usize,
}

/// A facet, identified by its cell and the index of the vertex it is
/// opposite to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Facet(pub CellHandle, pub usize);

impl Triangulation {
	pub fn new(dimension: usize) -> Self {
		assert!(dimension >= 2, "ambient dimension must be at least 2");
		Self {
			dimension,
			vertices: vec![None],
			vertex_free: Vec::new(),
			cells: Vec::new(),
			cell_free: Vec::new(),
			incident_cell: vec![None],
			pending: Vec::new(),
			num_vertices: 0,
			num_cells: 0,
		}
	}

	pub fn dimension(&self) -> usize {
		self.dimension
	}

	pub fn clear(&mut self) {
		*self = Self::new(self.dimension);
	}

	pub fn number_of_vertices(&self) -> usize {
		self.num_vertices
	}

	pub fn number_of_cells(&self) -> usize {
		self.num_cells
	}

	pub fn infinite_vertex(&self) -> VertexHandle {
		INFINITE_VERTEX
	}

	pub fn is_vertex_infinite(&self, v: VertexHandle) -> bool {
		v == INFINITE_VERTEX
	}

	pub fn point(&self, v: VertexHandle) -> Option<&Point> {
		self.vertices[v.0].as_ref()
	}

	pub fn is_cell_infinite(&self, c: CellHandle) -> bool {
		self.cell(c).vertices.contains(&INFINITE_VERTEX)
	}

	pub fn is_facet_infinite(&self, f: Facet) -> bool {
		let cell = self.cell(f.0);
		cell.vertices.iter().enumerate().any(|(i, v)| i != f.1 && *v == INFINITE_VERTEX)
	}

	pub fn cell_vertices(&self, c: CellHandle) -> &[VertexHandle] {
		&self.cell(c).vertices
	}

	pub fn facet_vertices(&self, f: Facet) -> Vec<VertexHandle> {
		self.cell(f.0).vertices.iter().enumerate().filter(|(i, _)| *i != f.1).map(|(_, v)| *v).collect()
	}

	pub fn neighbor(&self, c: CellHandle, i: usize) -> Option<CellHandle> {
		self.cell(c).neighbors[i]
	}

	/// The index of `c`'s covertex as seen from the neighbor across facet `i`.
	pub fn mirror_index(&self, c: CellHandle, i: usize) -> usize {
		let other = self.neighbor(c, i).expect("facet has no neighbor");
		self.cell(other).neighbors.iter().position(|n| *n == Some(c)).expect("neighbor link is not reciprocal")
	}

	pub fn mirror_facet(&self, f: Facet) -> Facet {
		let other = self.neighbor(f.0, f.1).expect("facet has no neighbor");
		Facet(other, self.mirror_index(f.0, f.1))
	}

	pub fn vertices(&self) -> impl Iterator<Item = VertexHandle> + '_ {
		self.vertices.iter().enumerate().skip(1).filter(|(_, p)| p.is_some()).map(|(i, _)| VertexHandle(i))
	}

	pub fn cells(&self) -> impl Iterator<Item = CellHandle> + '_ {
		self.cells.iter().enumerate().filter(|(_, c)| c.is_some()).map(|(i, _)| CellHandle(i))
	}

	/// Each undirected facet once, keeping the copy whose cell has the
	/// smaller handle (both sides always exist: the infinite vertex closes
	/// every facet into having two incident cells).
	pub fn facets(&self) -> impl Iterator<Item = Facet> + '_ {
		self.cells().flat_map(move |c| (0..=self.dimension).map(move |i| Facet(c, i))).filter(move |f| match self.neighbor(f.0, f.1) {
			None => true,
			Some(o) => f.0 .0 <= o.0,
		})
	}

	pub fn incident_cells(&self, v: VertexHandle) -> Vec<CellHandle> {
		let Some(start) = self.incident_cell[v.0] else {
			return Vec::new();
		};
		let mut seen = HashSet::new();
		let mut stack = vec![start];
		let mut out = Vec::new();
		while let Some(c) = stack.pop() {
			if !seen.insert(c) {
				continue;
			}
			let data = self.cell(c);
			if !data.vertices.contains(&v) {
				continue;
			}
			out.push(c);
			for n in data.neighbors.iter().flatten() {
				if !seen.contains(n) {
					stack.push(*n);
				}
			}
		}
		out
	}

	pub fn adjacent_vertices(&self, v: VertexHandle) -> Vec<VertexHandle> {
		let mut out: HashSet<VertexHandle> = HashSet::new();
		for c in self.incident_cells(v) {
			for w in &self.cell(c).vertices {
				if *w != v {
					out.insert(*w);
				}
			}
		}
		out.into_iter().collect()
	}

	pub fn approximate_cartesian_coordinate(&self, v: VertexHandle, i: usize) -> f64 {
		self.point(v).map_or(f64::NAN, |p| p.coord(i))
	}

	pub fn less_coordinate(&self, a: VertexHandle, b: VertexHandle, i: usize) -> bool {
		self.approximate_cartesian_coordinate(a, i) < self.approximate_cartesian_coordinate(b, i)
	}

	/// Sorts `indices` along a Morton (Z-order) curve so that sequential
	/// hinted insertion has good locality, mirroring the role of the
	/// kernel's `spatial_sort` contract without depending on a directed walk.
	pub fn spatial_sort(&self, indices: &mut [VertexHandle]) {
		if indices.is_empty() {
			return;
		}
		let d = self.dimension;
		let mut min = vec![f64::INFINITY; d];
		let mut max = vec![f64::NEG_INFINITY; d];
		for v in indices.iter() {
			if let Some(p) = self.point(*v) {
				for i in 0..d {
					min[i] = min[i].min(p.coord(i));
					max[i] = max[i].max(p.coord(i));
				}
			}
		}
		let morton = |v: &VertexHandle| -> u64 {
			let Some(p) = self.point(*v) else { return 0 };
			let bits_per_dim = 64 / d.max(1);
			let mut code: u64 = 0;
			for i in 0..d {
				let span = (max[i] - min[i]).max(1e-12);
				let normalized = ((p.coord(i) - min[i]) / span).clamp(0.0, 1.0);
				let quant = (normalized * ((1u64 << bits_per_dim) - 1) as f64) as u64;
				code |= quant << (i * bits_per_dim);
			}
			code
		};
		indices.sort_by_key(morton);
	}

	fn cell(&self, c: CellHandle) -> &CellData {
		self.cells[c.0].as_ref().expect("dangling cell handle")
	}

	fn alloc_vertex(&mut self, p: Point) -> VertexHandle {
		if let Some(i) = self.vertex_free.pop() {
			self.vertices[i] = Some(p);
			self.incident_cell[i] = None;
			self.num_vertices += 1;
			VertexHandle(i)
		} else {
			self.vertices.push(Some(p));
			self.incident_cell.push(None);
			self.num_vertices += 1;
			VertexHandle(self.vertices.len() - 1)
		}
	}

	fn alloc_cell(&mut self, vertices: Vec<VertexHandle>) -> CellHandle {
		let n = vertices.len();
		let data = CellData { vertices, neighbors: vec![None; n] };
		let handle = if let Some(i) = self.cell_free.pop() {
			self.cells[i] = Some(data);
			CellHandle(i)
		} else {
			self.cells.push(Some(data));
			CellHandle(self.cells.len() - 1)
		};
		for v in self.cells[handle.0].as_ref().unwrap().vertices.clone() {
			self.incident_cell[v.0] = Some(handle);
		}
		self.num_cells += 1;
		handle
	}

	fn free_cell(&mut self, c: CellHandle) {
		self.cells[c.0] = None;
		self.cell_free.push(c.0);
		self.num_cells -= 1;
	}

	/// Builds `D + 1` new cells fanning `apex` over the given boundary
	/// facets, stitching neighbor links both to the supplied outside
	/// neighbor (if any) and between the newly created cells themselves.
	fn star(&mut self, apex: VertexHandle, facets: Vec<(Vec<VertexHandle>, Option<(CellHandle, usize)>)>) -> Vec<CellHandle> {
		let mut new_cells = Vec::with_capacity(facets.len());
		let mut by_key: HashMap<Vec<VertexHandle>, (CellHandle, usize)> = HashMap::new();

		for (facet_vertices, link) in facets {
			let mut vertices = Vec::with_capacity(facet_vertices.len() + 1);
			vertices.push(apex);
			vertices.extend(facet_vertices.iter().copied());
			let handle = self.alloc_cell(vertices);
			new_cells.push(handle);

			if let Some((outside, outside_idx)) = link {
				self.cells[handle.0].as_mut().unwrap().neighbors[0] = Some(outside);
				self.cells[outside.0].as_mut().unwrap().neighbors[outside_idx] = Some(handle);
			}

			for j in 1..=facet_vertices.len() {
				let mut key: Vec<VertexHandle> = self.cells[handle.0].as_ref().unwrap().vertices.clone();
				key.remove(j);
				key.sort();
				if let Some((other, other_idx)) = by_key.remove(&key) {
					self.cells[handle.0].as_mut().unwrap().neighbors[j] = Some(other);
					self.cells[other.0].as_mut().unwrap().neighbors[other_idx] = Some(handle);
				} else {
					by_key.insert(key, (handle, j));
				}
			}
		}

		if !by_key.is_empty() {
			log::warn!("star() left {} unstitched facets; triangulation may be corrupt", by_key.len());
		}
		new_cells
	}

	/// True if `p` lies in the circumsphere (finite cells) or "beyond the
	/// hull" (infinite cells) of `c`, i.e. `c` must be removed if `p` is
	/// inserted.
	fn in_conflict(&self, c: CellHandle, p: &Point) -> bool {
		let data = self.cell(c);
		if let Some(inf_pos) = data.vertices.iter().position(|v| *v == INFINITE_VERTEX) {
			debug_assert_eq!(inf_pos, 0, "infinite vertex must be stored at index 0 by convention");
			let facet_vertices: Vec<&Point> = data.vertices[1..].iter().map(|v| self.point(*v).unwrap()).collect();
			let Some(neighbor) = data.neighbors[0] else {
				return true;
			};
			let neighbor_data = self.cell(neighbor);
			let witness = neighbor_data.vertices.iter().find(|v| !data.vertices.contains(v)).and_then(|v| self.point(*v));
			let Some(witness) = witness else {
				return true;
			};
			let side_p = orient_with_facet(&facet_vertices, p);
			let side_w = orient_with_facet(&facet_vertices, witness);
			side_p * side_w <= 0
		} else {
			let pts: Vec<&Point> = data.vertices.iter().map(|v| self.point(*v).unwrap()).collect();
			in_sphere(&pts, p) > 0
		}
	}

	/// Finds one conflicting cell via a linear scan; returns `None` if `p`
	/// conflicts with nothing (already covered / duplicate handled earlier).
	fn find_conflict_seed(&self, p: &Point) -> Option<CellHandle> {
		self.cells().find(|c| self.in_conflict(*c, p))
	}

	/// Grows the conflict region from a seed cell via neighbor BFS.
	fn conflict_region(&self, seed: CellHandle, p: &Point) -> HashSet<CellHandle> {
		let mut region = HashSet::new();
		let mut queue = VecDeque::new();
		region.insert(seed);
		queue.push_back(seed);
		while let Some(c) = queue.pop_front() {
			for n in self.cell(c).neighbors.iter().flatten() {
				if !region.contains(n) && self.in_conflict(*n, p) {
					region.insert(*n);
					queue.push_back(*n);
				}
			}
		}
		region
	}

	fn existing_vertex_at(&self, p: &Point) -> Option<VertexHandle> {
		self.vertices().find(|v| self.point(*v).is_some_and(|q| q.same_as(p)))
	}

	/// Inserts `p`, returning the vertex handle and whether a new vertex was
	/// created (`false` if `p` already had a matching vertex).
	pub fn insert(&mut self, p: Point) -> (VertexHandle, bool) {
		assert_eq!(p.dimension(), self.dimension, "point dimension does not match triangulation dimension");
		if let Some(existing) = self.existing_vertex_at(&p) {
			return (existing, false);
		}

		if self.cells.is_empty() {
			let handle = self.alloc_vertex(p);
			self.pending.push(handle);
			if self.pending.len() == self.dimension + 1 {
				self.bootstrap();
			}
			return (handle, true);
		}

		let new_vertex = self.alloc_vertex(p.clone());
		let seed = match self.find_conflict_seed(&p) {
			Some(seed) => seed,
			None => {
				// Degenerate / duplicate under floating point tolerance: treat
				// as no-op insertion, matching duplicate-point handling above.
				self.vertices[new_vertex.0] = None;
				self.vertex_free.push(new_vertex.0);
				self.num_vertices -= 1;
				return (self.existing_vertex_at(&p).unwrap_or(new_vertex), false);
			}
		};
		let region = self.conflict_region(seed, &p);

		let mut boundary = Vec::new();
		for c in &region {
			let data = self.cell(*c);
			for (i, n) in data.neighbors.iter().enumerate() {
				match n {
					Some(outside) if !region.contains(outside) => {
						let facet_vertices = self.facet_vertices(Facet(*c, i));
						let outside_idx = self.mirror_index(*c, i);
						boundary.push((facet_vertices, Some((*outside, outside_idx))));
					}
					None => {
						let facet_vertices = self.facet_vertices(Facet(*c, i));
						boundary.push((facet_vertices, None));
					}
					_ => {}
				}
			}
		}

		for c in &region {
			self.free_cell(*c);
		}

		self.star(new_vertex, boundary);
		(new_vertex, true)
	}

	/// Removes `v` by discarding it and rebuilding the triangulation from
	/// the remaining vertices. Simpler and more robust than incremental
	/// hole-patching, at the cost of an O(n) rebuild per removal.
	pub fn remove(&mut self, v: VertexHandle) {
		assert_ne!(v, INFINITE_VERTEX, "cannot remove the infinite vertex");
		let remaining: Vec<Point> = self.vertices().filter(|w| *w != v).filter_map(|w| self.point(w).cloned()).collect();
		self.clear();
		for p in remaining {
			self.insert(p);
		}
	}

	/// Checks neighbor-link reciprocity and the empty-circumsphere property
	/// of every finite cell against every vertex. `O(cells * vertices)`;
	/// meant for test-sized triangulations, not a hot path.
	pub fn is_valid(&self, verbose: bool) -> bool {
		let mut ok = true;
		for c in self.cells() {
			let data = self.cell(c);
			for (i, n) in data.neighbors.iter().enumerate() {
				match n {
					None => {
						if verbose {
							log::warn!("cell {c:?} facet {i} has no neighbor");
						}
						ok = false;
					}
					Some(other) => {
						if self.neighbor(*other, self.mirror_index(c, i)) != Some(c) {
							if verbose {
								log::warn!("cell {c:?} facet {i} neighbor link is not reciprocal");
							}
							ok = false;
						}
					}
				}
			}
		}
		for c in self.cells() {
			if self.is_cell_infinite(c) {
				continue;
			}
			let data = self.cell(c);
			let pts: Vec<&Point> = data.vertices.iter().map(|v| self.point(*v).unwrap()).collect();
			for v in self.vertices() {
				if data.vertices.contains(&v) {
					continue;
				}
				let q = self.point(v).unwrap();
				if in_sphere(&pts, q) > 0 {
					if verbose {
						log::warn!("cell {c:?} violates the empty-circumsphere property against vertex {v:?}");
					}
					ok = false;
				}
			}
		}
		ok
	}

	fn bootstrap(&mut self) {
		let mut pending = std::mem::take(&mut self.pending);
		let points: Vec<&Point> = pending.iter().map(|v| self.point(*v).unwrap()).collect();
		if orient(&points) < 0 {
			pending.swap(self.dimension - 1, self.dimension);
		}
		let finite = self.alloc_cell(pending.clone());

		let mut facets = Vec::with_capacity(pending.len());
		for i in 0..pending.len() {
			let facet_vertices: Vec<VertexHandle> = pending.iter().enumerate().filter(|(j, _)| *j != i).map(|(_, v)| *v).collect();
			facets.push((facet_vertices, Some((finite, i))));
		}
		self.star(INFINITE_VERTEX, facets);
	}
}

/// Orientation of `facet` as seen from `p`, used only by the infinite-cell
/// conflict test (which needs a consistent "which side" answer, not a
/// globally meaningful sign).
fn orient_with_facet(facet: &[&Point], p: &Point) -> i32 {
	let mut all = facet.to_vec();
	all.push(p);
	orient(&all)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn p(coords: &[f64]) -> Point {
		Point::new(coords.to_vec())
	}

	#[test]
	fn bootstrap_triangle_has_one_finite_and_three_infinite_cells() {
		let mut t = Triangulation::new(2);
		t.insert(p(&[0.0, 0.0]));
		t.insert(p(&[1.0, 0.0]));
		t.insert(p(&[0.0, 1.0]));
		assert_eq!(t.number_of_vertices(), 3);
		assert_eq!(t.number_of_cells(), 4);
		let finite_cells = t.cells().filter(|c| !t.is_cell_infinite(*c)).count();
		assert_eq!(finite_cells, 1);
	}

	#[test]
	fn inserting_duplicate_point_does_not_create_a_new_vertex() {
		let mut t = Triangulation::new(2);
		t.insert(p(&[0.0, 0.0]));
		t.insert(p(&[1.0, 0.0]));
		t.insert(p(&[0.0, 1.0]));
		let before = t.number_of_vertices();
		let (_, inserted) = t.insert(p(&[0.0, 0.0]));
		assert!(!inserted);
		assert_eq!(t.number_of_vertices(), before);
	}

	#[test]
	fn inserting_interior_point_increases_cell_count() {
		let mut t = Triangulation::new(2);
		t.insert(p(&[-10.0, -10.0]));
		t.insert(p(&[10.0, -10.0]));
		t.insert(p(&[0.0, 10.0]));
		let before = t.number_of_cells();
		t.insert(p(&[0.0, -5.0]));
		assert!(t.number_of_cells() > before);
		assert_eq!(t.number_of_vertices(), 4);
	}

	#[test]
	fn mirror_facet_is_involutive() {
		let mut t = Triangulation::new(2);
		for c in [[-10.0, -10.0], [10.0, -10.0], [0.0, 10.0], [0.0, -3.0], [3.0, 3.0]] {
			t.insert(p(&c));
		}
		for cell in t.cells() {
			for i in 0..=t.dimension() {
				let f = Facet(cell, i);
				let mirrored = t.mirror_facet(f);
				let back = t.mirror_facet(mirrored);
				assert_eq!(f, back);
			}
		}
	}

	#[test]
	fn euler_characteristic_holds_for_2d() {
		let mut t = Triangulation::new(2);
		for c in [[-10.0, -10.0], [10.0, -10.0], [0.0, 10.0], [1.0, 1.0], [-1.0, 2.0], [2.0, -3.0]] {
			t.insert(p(&c));
		}
		let v = t.number_of_vertices() as i64 + 1; // + infinite vertex
		let c = t.number_of_cells() as i64;
		let facets: HashSet<_> = t.facets().collect();
		let f = facets.len() as i64;
		assert_eq!(v - f + c, 2);
	}

	#[test]
	fn remove_rebuilds_without_the_removed_vertex() {
		let mut t = Triangulation::new(2);
		let handles: Vec<_> = [[-10.0, -10.0], [10.0, -10.0], [0.0, 10.0], [1.0, 1.0]].iter().map(|c| t.insert(p(c)).0).collect();
		t.remove(handles[3]);
		assert_eq!(t.number_of_vertices(), 3);
	}

	#[test]
	fn a_well_formed_triangulation_is_valid() {
		let mut t = Triangulation::new(2);
		for c in [[-10.0, -10.0], [10.0, -10.0], [0.0, 10.0], [1.0, 1.0], [-1.0, 2.0], [2.0, -3.0]] {
			t.insert(p(&c));
		}
		assert!(t.is_valid(false));
	}

	#[test]
	fn spatial_sort_preserves_all_handles() {
		let mut t = Triangulation::new(2);
		let mut handles: Vec<_> = [[0.0, 0.0], [5.0, 5.0], [1.0, 4.0], [3.0, 2.0]].iter().map(|c| t.insert(p(c)).0).collect();
		let original: HashSet<_> = handles.iter().copied().collect();
		t.spatial_sort(&mut handles);
		let after: HashSet<_> = handles.iter().copied().collect();
		assert_eq!(original, after);
	}
}
