use crate::serializer::Serializer;
use dashmap::DashMap;
use ddt_tile::{TileIndex, TileTriangulation};
use parking_lot::Mutex;

struct Slot {
	tile: Option<TileTriangulation>,
	exists_on_disk: bool,
}

/// A map from tile index to tile, bounded to at most `memory_cap` resident
/// tiles at once. Beyond the cap, loading one tile evicts another via the
/// serializer.
///
/// Per-tile access is serialized by that tile's own `Mutex`; a short-held
/// `DashMap` read guard only ever gets us a reference to that mutex, never
/// a long-held map-wide lock, so eviction scanning other tiles cannot
/// deadlock against a tile currently in use.
pub struct TileContainer<S: Serializer> {
	serializer: S,
	dimension: usize,
	memory_cap: Option<usize>,
	slots: DashMap<TileIndex, Mutex<Slot>>,
	in_memory_count: Mutex<usize>,
}

impl<S: Serializer> TileContainer<S> {
	pub fn new(dimension: usize, memory_cap: Option<usize>, serializer: S) -> Self {
		Self { serializer, dimension, memory_cap, slots: DashMap::new(), in_memory_count: Mutex::new(0) }
	}

	pub fn dimension(&self) -> usize {
		self.dimension
	}

	pub fn tile_indices(&self) -> Vec<TileIndex> {
		self.slots.iter().map(|e| *e.key()).collect()
	}

	pub fn number_of_tiles(&self) -> usize {
		self.slots.len()
	}

	pub fn number_of_tiles_in_memory(&self) -> usize {
		*self.in_memory_count.lock()
	}

	/// Registers `index` as a known tile without forcing it resident.
	pub fn register(&self, index: TileIndex) {
		self.slots.entry(index).or_insert_with(|| Mutex::new(Slot { tile: None, exists_on_disk: self.serializer.has_tile(index) }));
	}

	/// Loads `index` into memory (creating or evicting as needed) and runs
	/// `f` against it while the tile's own lock is held.
	pub fn with_tile<R>(&self, index: TileIndex, f: impl FnOnce(&mut TileTriangulation) -> R) -> anyhow::Result<R> {
		self.register(index);
		let entry = self.slots.get(&index).expect("just registered");
		let mut slot = entry.lock();
		if slot.tile.is_none() {
			self.ensure_capacity(index)?;
			let tile = if slot.exists_on_disk {
				self.serializer.load(index, self.dimension)?
			} else {
				TileTriangulation::new(index, self.dimension)
			};
			slot.tile = Some(tile);
			*self.in_memory_count.lock() += 1;
		}
		Ok(f(slot.tile.as_mut().unwrap()))
	}

	pub fn serializer_clone(&self) -> S
	where
		S: Clone,
	{
		self.serializer.clone()
	}

	pub fn save_all(&self) -> anyhow::Result<()> {
		for index in self.tile_indices() {
			let entry = self.slots.get(&index).expect("just listed");
			let slot = entry.lock();
			if let Some(tile) = slot.tile.as_ref() {
				self.serializer.save(tile)?;
			}
		}
		Ok(())
	}

	fn ensure_capacity(&self, loading: TileIndex) -> anyhow::Result<()> {
		let Some(cap) = self.memory_cap else { return Ok(()) };
		const MAX_ATTEMPTS: usize = 10_000;
		for _ in 0..MAX_ATTEMPTS {
			if *self.in_memory_count.lock() < cap {
				return Ok(());
			}
			if self.evict_one(loading)? {
				return Ok(());
			}
			std::thread::yield_now();
		}
		anyhow::bail!("tile container: no unlocked tile available to evict after {MAX_ATTEMPTS} attempts");
	}

	/// Picks uniformly at random among unlocked in-memory slots (other than
	/// the one being loaded), saves it and frees its memory. Returns
	/// `false` if every candidate is currently locked by another worker, in
	/// which case the caller retries.
	fn evict_one(&self, loading: TileIndex) -> anyhow::Result<bool> {
		let candidates: Vec<TileIndex> = self.slots.iter().filter(|e| *e.key() != loading).map(|e| *e.key()).collect();
		if candidates.is_empty() {
			return Ok(false);
		}
		let start = rand::random::<u64>() as usize % candidates.len();
		for offset in 0..candidates.len() {
			let index = candidates[(start + offset) % candidates.len()];
			let Some(entry) = self.slots.get(&index) else { continue };
			let Some(mut slot) = entry.try_lock() else { continue };
			if let Some(tile) = slot.tile.as_ref() {
				self.serializer.save(tile)?;
				slot.tile = None;
				slot.exists_on_disk = true;
				drop(slot);
				*self.in_memory_count.lock() -= 1;
				return Ok(true);
			}
		}
		Ok(false)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::serializer::NullSerializer;
	use ddt_kernel::Point;
	use ddt_tile::TileIndex;

	#[test]
	fn with_tile_creates_an_empty_tile_on_first_access() {
		let container = TileContainer::new(2, None, NullSerializer);
		let n = container.with_tile(TileIndex::new(0), |t| t.number_of_vertices()).unwrap();
		assert_eq!(n, 0);
	}

	#[test]
	fn with_tile_preserves_state_across_calls() {
		let container = TileContainer::new(2, None, NullSerializer);
		container
			.with_tile(TileIndex::new(0), |t| {
				t.insert(Point::new(vec![0.0, 0.0]), TileIndex::new(0));
			})
			.unwrap();
		let n = container.with_tile(TileIndex::new(0), |t| t.number_of_vertices()).unwrap();
		assert_eq!(n, 1);
	}

	#[test]
	fn number_of_tiles_in_memory_never_exceeds_cap() {
		#[derive(Default)]
		struct RecordingSerializer {
			saves: Mutex<usize>,
		}
		impl Serializer for RecordingSerializer {
			fn has_tile(&self, _index: TileIndex) -> bool {
				false
			}
			fn load(&self, index: TileIndex, dimension: usize) -> anyhow::Result<TileTriangulation> {
				Ok(TileTriangulation::new(index, dimension))
			}
			fn save(&self, _tile: &TileTriangulation) -> anyhow::Result<()> {
				*self.saves.lock() += 1;
				Ok(())
			}
		}

		let container = TileContainer::new(2, Some(2), RecordingSerializer::default());
		for i in 0..9u64 {
			container.with_tile(TileIndex::new(i), |t| t.number_of_vertices()).unwrap();
			assert!(container.number_of_tiles_in_memory() <= 2);
		}
		let saves = *container.serializer.saves.lock();
		assert!(saves >= 7, "expected at least 7 save events evicting 9 tiles through a cap of 2, got {saves}");
	}
}
