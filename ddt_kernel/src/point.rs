use std::fmt;

/// A point in `D`-dimensional space. `D` is checked at construction time
/// rather than encoded as a const generic, so one binary can serve any
/// ambient dimension chosen at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct Point(Vec<f64>);

impl Point {
	pub fn new(coords: Vec<f64>) -> Self {
		Self(coords)
	}

	pub fn dimension(&self) -> usize {
		self.0.len()
	}

	pub fn coords(&self) -> &[f64] {
		&self.0
	}

	pub fn coord(&self, i: usize) -> f64 {
		self.0[i]
	}

	/// Exact (bit-level) equality. The system treats two points as the same
	/// vertex only when their coordinates match exactly; generators and
	/// partitioners are expected to hand out bit-identical coordinates for
	/// what is meant to be the same point (e.g. a broadcast axis-extreme
	/// point re-sent to a tile that already inserted it locally).
	pub fn same_as(&self, other: &Point) -> bool {
		self.0.len() == other.0.len() && self.0.iter().zip(other.0.iter()).all(|(a, b)| a.to_bits() == b.to_bits())
	}

	pub fn squared_norm(&self) -> f64 {
		self.0.iter().map(|c| c * c).sum()
	}
}

impl fmt::Display for Point {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "(")?;
		for (i, c) in self.0.iter().enumerate() {
			if i > 0 {
				write!(f, ", ")?;
			}
			write!(f, "{c}")?;
		}
		write!(f, ")")
	}
}

/// A hashable, exact-equality key for a point, used by the dedup sets that
/// guard against re-sending the same boundary point to the same tile twice.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PointKey(Vec<u64>);

impl From<&Point> for PointKey {
	fn from(p: &Point) -> Self {
		Self(p.0.iter().map(|c| c.to_bits()).collect())
	}
}

/// Axis-aligned bounding box in `D` dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct Bbox {
	min: Vec<f64>,
	max: Vec<f64>,
}

impl Bbox {
	pub fn empty(dimension: usize) -> Self {
		Self { min: vec![f64::INFINITY; dimension], max: vec![f64::NEG_INFINITY; dimension] }
	}

	pub fn from_point(p: &Point) -> Self {
		Self { min: p.coords().to_vec(), max: p.coords().to_vec() }
	}

	pub fn extend(&mut self, p: &Point) {
		for i in 0..self.min.len() {
			self.min[i] = self.min[i].min(p.coord(i));
			self.max[i] = self.max[i].max(p.coord(i));
		}
	}

	pub fn union(&mut self, other: &Bbox) {
		for i in 0..self.min.len() {
			self.min[i] = self.min[i].min(other.min[i]);
			self.max[i] = self.max[i].max(other.max[i]);
		}
	}

	pub fn min(&self) -> &[f64] {
		&self.min
	}

	pub fn max(&self) -> &[f64] {
		&self.max
	}

	pub fn is_empty(&self) -> bool {
		self.min.iter().zip(self.max.iter()).any(|(a, b)| a > b)
	}
}
