use serde::{Deserialize, Serialize};
use std::fmt;

/// A totally ordered, hashable key identifying a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TileIndex(pub u64);

impl TileIndex {
	pub fn new(index: u64) -> Self {
		Self(index)
	}

	pub fn value(&self) -> u64 {
		self.0
	}
}

impl fmt::Display for TileIndex {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl From<u64> for TileIndex {
	fn from(v: u64) -> Self {
		Self(v)
	}
}
