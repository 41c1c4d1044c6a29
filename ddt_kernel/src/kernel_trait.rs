//! The contract `ddt_tile` is generic over. `ddt_kernel::Triangulation` is
//! the one implementation shipped in this workspace; a different kernel
//! (e.g. one backed by exact arithmetic) only needs to implement this trait.

use crate::point::Point;
use crate::triangulation::{Facet, Triangulation, VertexHandle};

pub trait Kernel {
	type Vertex: Copy + Eq + std::hash::Hash;
	type Cell: Copy + Eq + std::hash::Hash;

	fn new(dimension: usize) -> Self;
	fn dimension(&self) -> usize;
	fn clear(&mut self);
	fn number_of_vertices(&self) -> usize;
	fn number_of_cells(&self) -> usize;
	fn infinite_vertex(&self) -> Self::Vertex;
	fn is_vertex_infinite(&self, v: Self::Vertex) -> bool;
	fn point(&self, v: Self::Vertex) -> Option<&Point>;
	fn insert(&mut self, p: Point) -> (Self::Vertex, bool);
	fn remove(&mut self, v: Self::Vertex);
}

impl Kernel for Triangulation {
	type Vertex = VertexHandle;
	type Cell = crate::triangulation::CellHandle;

	fn new(dimension: usize) -> Self {
		Triangulation::new(dimension)
	}

	fn dimension(&self) -> usize {
		Triangulation::dimension(self)
	}

	fn clear(&mut self) {
		Triangulation::clear(self)
	}

	fn number_of_vertices(&self) -> usize {
		Triangulation::number_of_vertices(self)
	}

	fn number_of_cells(&self) -> usize {
		Triangulation::number_of_cells(self)
	}

	fn infinite_vertex(&self) -> Self::Vertex {
		Triangulation::infinite_vertex(self)
	}

	fn is_vertex_infinite(&self, v: Self::Vertex) -> bool {
		Triangulation::is_vertex_infinite(self, v)
	}

	fn point(&self, v: Self::Vertex) -> Option<&Point> {
		Triangulation::point(self, v)
	}

	fn insert(&mut self, p: Point) -> (Self::Vertex, bool) {
		Triangulation::insert(self, p)
	}

	fn remove(&mut self, v: Self::Vertex) {
		Triangulation::remove(self, v)
	}
}

/// Two vertices (possibly in different triangulations) are equal iff their
/// points match exactly; infinite vertices are never equal to each other
/// across triangulations since they carry no tile label to compare.
pub fn are_vertices_equal(t1: &Triangulation, v1: VertexHandle, t2: &Triangulation, v2: VertexHandle) -> bool {
	match (t1.point(v1), t2.point(v2)) {
		(Some(a), Some(b)) => a.same_as(b),
		_ => false,
	}
}

/// Two facets are equal iff their vertex point-sets match and the
/// permutation carrying one ordering to the other has even sign. An
/// orientation-reversed match is never accepted, in any dimension.
pub fn are_facets_equal(t1: &Triangulation, f1: Facet, t2: &Triangulation, f2: Facet) -> bool {
	let v1 = t1.facet_vertices(f1);
	let v2 = t2.facet_vertices(f2);
	if v1.len() != v2.len() {
		return false;
	}
	let p1: Vec<&Point> = v1.iter().map(|v| t1.point(*v)).collect::<Option<_>>().unwrap_or_default();
	let p2: Vec<&Point> = v2.iter().map(|v| t2.point(*v)).collect::<Option<_>>().unwrap_or_default();
	if p1.len() != v1.len() || p2.len() != v2.len() {
		return false;
	}
	permutation_matches_with_even_sign(&p1, &p2)
}

pub fn are_cells_equal(t1: &Triangulation, c1: crate::triangulation::CellHandle, t2: &Triangulation, c2: crate::triangulation::CellHandle) -> bool {
	let v1 = t1.cell_vertices(c1);
	let v2 = t2.cell_vertices(c2);
	if v1.len() != v2.len() {
		return false;
	}
	let p1: Vec<&Point> = match v1.iter().map(|v| t1.point(*v)).collect::<Option<_>>() {
		Some(p) => p,
		None => return false,
	};
	let p2: Vec<&Point> = match v2.iter().map(|v| t2.point(*v)).collect::<Option<_>>() {
		Some(p) => p,
		None => return false,
	};
	permutation_matches_with_even_sign(&p1, &p2)
}

/// Finds a bijection from `a` to `b` by coordinate equality and reports
/// whether that bijection, applied as a permutation, is even.
fn permutation_matches_with_even_sign(a: &[&Point], b: &[&Point]) -> bool {
	if a.len() != b.len() {
		return false;
	}
	let mut used = vec![false; b.len()];
	let mut perm = Vec::with_capacity(a.len());
	for pa in a {
		let Some(j) = b.iter().enumerate().position(|(j, pb)| !used[j] && pa.same_as(pb)) else {
			return false;
		};
		used[j] = true;
		perm.push(j);
	}
	permutation_parity_even(&perm)
}

fn permutation_parity_even(perm: &[usize]) -> bool {
	let mut visited = vec![false; perm.len()];
	let mut swaps = 0;
	for start in 0..perm.len() {
		if visited[start] {
			continue;
		}
		let mut cycle_len = 0;
		let mut i = start;
		while !visited[i] {
			visited[i] = true;
			i = perm[i];
			cycle_len += 1;
		}
		if cycle_len > 0 {
			swaps += cycle_len - 1;
		}
	}
	swaps % 2 == 0
}
