use dashmap::DashMap;
use ddt_kernel::{Point, PointKey};
use ddt_tile::TileIndex;
use parking_lot::Mutex;
use std::collections::HashSet;

/// Per-tile inboxes, the shared broadcast pool, and the sent-set dedup
/// memory that together move points between tiles during splaying.
pub struct MessagingHub {
	inboxes: DashMap<TileIndex, Mutex<Vec<(Point, TileIndex)>>>,
	broadcast_pool: Mutex<Vec<(Point, TileIndex)>>,
	broadcast_cursor: DashMap<TileIndex, usize>,
	sent: DashMap<(TileIndex, TileIndex), HashSet<PointKey>>,
}

impl Default for MessagingHub {
	fn default() -> Self {
		Self::new()
	}
}

impl MessagingHub {
	pub fn new() -> Self {
		Self { inboxes: DashMap::new(), broadcast_pool: Mutex::new(Vec::new()), broadcast_cursor: DashMap::new(), sent: DashMap::new() }
	}

	fn inbox(&self, tile: TileIndex) -> dashmap::mapref::one::Ref<'_, TileIndex, Mutex<Vec<(Point, TileIndex)>>> {
		self.inboxes.entry(tile).or_insert_with(|| Mutex::new(Vec::new()));
		self.inboxes.get(&tile).expect("just inserted")
	}

	/// Seeds `tile`'s inbox directly, bypassing the sent-set dedup. Used
	/// once, for the initial point partition.
	pub fn seed_inbox(&self, tile: TileIndex, items: Vec<(Point, TileIndex)>) {
		self.inbox(tile).lock().extend(items);
	}

	/// Sends `items` (each `(destination, point, point's own tile label)`)
	/// from `src`, deduplicating per `(src, destination)` pair so the same
	/// point is never sent twice along the same edge. Returns the number
	/// of items actually enqueued.
	pub fn send_one(&self, src: TileIndex, items: Vec<(TileIndex, Point, TileIndex)>) -> usize {
		let mut enqueued = 0;
		for (dest, point, label) in items {
			let key = PointKey::from(&point);
			let mut sent = self.sent.entry((src, dest)).or_default();
			if sent.insert(key) {
				drop(sent);
				self.inbox(dest).lock().push((point, label));
				enqueued += 1;
			}
		}
		enqueued
	}

	/// Appends to the shared broadcast pool; no per-destination dedup is
	/// needed since each tile tracks its own consumption cursor.
	pub fn send_all(&self, items: Vec<(Point, TileIndex)>) {
		self.broadcast_pool.lock().extend(items);
	}

	/// Drains `tile`'s inbox and pulls any unread broadcast pool entries.
	pub fn receive(&self, tile: TileIndex) -> Vec<(Point, TileIndex)> {
		let mut items = std::mem::take(&mut *self.inbox(tile).lock());

		let pool = self.broadcast_pool.lock();
		let mut cursor_entry = self.broadcast_cursor.entry(tile).or_insert(0);
		let cursor = *cursor_entry;
		if cursor < pool.len() {
			items.extend(pool[cursor..].iter().cloned());
			*cursor_entry = pool.len();
		}
		items
	}

	pub fn inbox_is_empty(&self, tile: TileIndex) -> bool {
		self.inbox(tile).lock().is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn p(coords: &[f64]) -> Point {
		Point::new(coords.to_vec())
	}

	#[test]
	fn send_one_dedups_within_the_same_source_destination_pair() {
		let hub = MessagingHub::new();
		let src = TileIndex::new(0);
		let dest = TileIndex::new(1);
		let point = p(&[1.0, 2.0]);
		let first = hub.send_one(src, vec![(dest, point.clone(), src)]);
		let second = hub.send_one(src, vec![(dest, point, src)]);
		assert_eq!(first, 1);
		assert_eq!(second, 0);
	}

	#[test]
	fn receive_drains_inbox_and_new_broadcast_items() {
		let hub = MessagingHub::new();
		let tile = TileIndex::new(0);
		hub.seed_inbox(tile, vec![(p(&[0.0, 0.0]), TileIndex::new(2))]);
		hub.send_all(vec![(p(&[1.0, 1.0]), TileIndex::new(3))]);
		let received = hub.receive(tile);
		assert_eq!(received.len(), 2);
		assert!(hub.inbox_is_empty(tile));
		// a second receive sees no new broadcast items and an empty inbox
		let second = hub.receive(tile);
		assert!(second.is_empty());
	}

	#[test]
	fn each_tile_tracks_its_own_broadcast_cursor() {
		let hub = MessagingHub::new();
		hub.send_all(vec![(p(&[0.0, 0.0]), TileIndex::new(0))]);
		let a = hub.receive(TileIndex::new(0));
		hub.send_all(vec![(p(&[1.0, 1.0]), TileIndex::new(0))]);
		let b = hub.receive(TileIndex::new(1));
		assert_eq!(a.len(), 1);
		assert_eq!(b.len(), 2);
	}
}
