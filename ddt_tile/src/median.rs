//! The canonical-owner rule shared by facets and cells: the median of the
//! finite incident vertices' tile labels, tie-broken toward the lower
//! index. One reusable function, not duplicated per simplex kind.

use crate::tile_index::TileIndex;

/// Selects the median label, tie-broken toward the lower of the two middle
/// values when the count is even.
pub fn select(labels: &[TileIndex]) -> TileIndex {
	assert!(!labels.is_empty(), "median selector requires at least one label");
	let mut sorted = labels.to_vec();
	sorted.sort();
	sorted[(sorted.len() - 1) / 2]
}

pub fn is_main(labels: &[TileIndex], id: TileIndex) -> bool {
	select(labels) == id
}

#[cfg(test)]
mod tests {
	use super::*;

	fn l(values: &[u64]) -> Vec<TileIndex> {
		values.iter().map(|v| TileIndex::new(*v)).collect()
	}

	#[test]
	fn odd_count_picks_the_middle() {
		assert_eq!(select(&l(&[5, 1, 3])), TileIndex::new(3));
	}

	#[test]
	fn even_count_picks_the_lower_middle() {
		assert_eq!(select(&l(&[1, 2, 3, 4])), TileIndex::new(2));
	}

	#[test]
	fn single_label_is_its_own_median() {
		assert_eq!(select(&l(&[7])), TileIndex::new(7));
	}

	#[test]
	fn is_main_matches_select() {
		let labels = l(&[1, 2, 3, 4]);
		assert!(is_main(&labels, TileIndex::new(2)));
		assert!(!is_main(&labels, TileIndex::new(3)));
	}
}
