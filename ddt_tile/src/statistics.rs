use std::fmt;
use std::ops::Add;

/// Canonical-owner counts for one tile, valid only until the next mutation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Statistics {
	pub main_vertices: usize,
	pub main_facets: usize,
	pub main_cells: usize,
}

impl Add for Statistics {
	type Output = Statistics;

	fn add(self, rhs: Statistics) -> Statistics {
		Statistics {
			main_vertices: self.main_vertices + rhs.main_vertices,
			main_facets: self.main_facets + rhs.main_facets,
			main_cells: self.main_cells + rhs.main_cells,
		}
	}
}

impl fmt::Display for Statistics {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "vertices={} facets={} cells={}", self.main_vertices, self.main_facets, self.main_cells)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn statistics_add_sums_componentwise() {
		let a = Statistics { main_vertices: 1, main_facets: 2, main_cells: 3 };
		let b = Statistics { main_vertices: 4, main_facets: 5, main_cells: 6 };
		let sum = a + b;
		assert_eq!(sum, Statistics { main_vertices: 5, main_facets: 7, main_cells: 9 });
	}
}
