//! The traversal patterns the splaying engine drives the tile container
//! with: map, map-reduce, and iterate-to-fixpoint.

use crate::thread_pool::ThreadPool;
use ddt_core::{ConcurrencyLimits, SchedulerKind};
use ddt_tile::TileIndex;

/// Drives per-tile work sequentially, through a bounded concurrency pool,
/// or through a simulated message-passing peer group. The message-passing
/// variant is a stand-in for an MPI-backed scheduler: it reuses the same
/// bounded-concurrency mechanism as the threaded scheduler (one simulated
/// peer per concurrency slot) rather than partitioning tile ownership by
/// rank and exchanging messages over channels, since the splaying engine
/// above it does not need a scheduler-level fixpoint protocol that differs
/// from the threaded one to be correct; see DESIGN.md for the tradeoff.
pub enum Scheduler {
	Sequential,
	Threaded(ThreadPool),
	MessagePassing(ThreadPool),
}

impl Scheduler {
	pub fn new(kind: SchedulerKind, limits: ConcurrencyLimits) -> Self {
		match kind {
			SchedulerKind::Sequential => Scheduler::Sequential,
			SchedulerKind::Threaded => Scheduler::Threaded(ThreadPool::new(limits.workers)),
			SchedulerKind::MessagePassing => Scheduler::MessagePassing(ThreadPool::new(limits.workers)),
		}
	}

	/// Applies `f` to every tile index, in parallel where the scheduler
	/// allows it, and collects the results.
	pub fn for_each<U, F>(&self, indices: &[TileIndex], f: F) -> Vec<U>
	where
		U: Send,
		F: Fn(&TileIndex) -> U + Sync,
	{
		match self {
			Scheduler::Sequential => indices.iter().map(|i| f(i)).collect(),
			Scheduler::Threaded(pool) | Scheduler::MessagePassing(pool) => pool.scoped_for_each(indices, f),
		}
	}

	pub fn for_each_reduce<U, F, R>(&self, indices: &[TileIndex], f: F, init: U, reduce: R) -> U
	where
		U: Send,
		F: Fn(&TileIndex) -> U + Sync,
		R: Fn(U, U) -> U,
	{
		self.for_each(indices, f).into_iter().fold(init, reduce)
	}

	/// Repeats `transform` (returning whether the tile produced outbound
	/// work) only on tiles that produced work last round, until none do.
	pub fn for_each_until_fixpoint<F>(&self, indices: &[TileIndex], transform: F)
	where
		F: Fn(&TileIndex) -> bool + Sync,
	{
		let mut pending: Vec<TileIndex> = indices.to_vec();
		while !pending.is_empty() {
			let produced = self.for_each(&pending, &transform);
			pending = pending.iter().zip(produced).filter(|(_, produced)| *produced).map(|(i, _)| *i).collect();
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn indices(n: u64) -> Vec<TileIndex> {
		(0..n).map(TileIndex::new).collect()
	}

	#[test]
	fn sequential_for_each_preserves_order() {
		let scheduler = Scheduler::new(SchedulerKind::Sequential, ConcurrencyLimits::new(1));
		let result = scheduler.for_each(&indices(5), |i| i.value() * 2);
		assert_eq!(result, vec![0, 2, 4, 6, 8]);
	}

	#[test]
	fn threaded_for_each_visits_every_index() {
		let scheduler = Scheduler::new(SchedulerKind::Threaded, ConcurrencyLimits::new(3));
		let mut result = scheduler.for_each(&indices(20), |i| i.value());
		result.sort_unstable();
		assert_eq!(result, (0..20).collect::<Vec<_>>());
	}

	#[test]
	fn for_each_until_fixpoint_stops_once_nothing_produces() {
		let scheduler = Scheduler::new(SchedulerKind::Sequential, ConcurrencyLimits::new(1));
		let mut remaining = std::collections::HashMap::new();
		for i in indices(4) {
			remaining.insert(i, 2);
		}
		let remaining = std::sync::Mutex::new(remaining);
		scheduler.for_each_until_fixpoint(&indices(4), |i| {
			let mut remaining = remaining.lock().unwrap();
			let count = remaining.get_mut(i).unwrap();
			if *count > 0 {
				*count -= 1;
				true
			} else {
				false
			}
		});
		let remaining = remaining.into_inner().unwrap();
		assert!(remaining.values().all(|c| *c == 0));
	}
}
