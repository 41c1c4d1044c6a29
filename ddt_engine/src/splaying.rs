//! The four phases that turn a raw point partition into a mutually
//! consistent set of tile triangulations: INSERT, BROADCAST, SPLAY,
//! FINALIZE.

use crate::scheduler::Scheduler;
use ddt_container::{MessagingHub, Serializer, TileContainer};
use ddt_tile::TileIndex;

pub fn phase_insert<S: Serializer>(container: &TileContainer<S>, hub: &MessagingHub, scheduler: &Scheduler, indices: &[TileIndex]) -> anyhow::Result<()> {
	let results = scheduler.for_each(indices, |idx| -> anyhow::Result<()> {
		let received = hub.receive(*idx);
		container.with_tile(*idx, |tile| {
			tile.insert_many(received, false, true);
		})
	});
	results.into_iter().collect::<anyhow::Result<Vec<()>>>()?;
	Ok(())
}

pub fn phase_broadcast<S: Serializer>(container: &TileContainer<S>, hub: &MessagingHub, scheduler: &Scheduler, indices: &[TileIndex]) -> anyhow::Result<()> {
	let extremes = scheduler.for_each(indices, |idx| -> anyhow::Result<Vec<(ddt_kernel::Point, TileIndex)>> {
		container.with_tile(*idx, |tile| tile.get_axis_extreme_points().into_iter().map(|p| (p, *idx)).collect())
	});
	for batch in extremes {
		hub.send_all(batch?);
	}

	let results = scheduler.for_each(indices, |idx| -> anyhow::Result<()> {
		let received = hub.receive(*idx);
		container.with_tile(*idx, |tile| {
			tile.insert_many(received, false, false);
		})
	});
	results.into_iter().collect::<anyhow::Result<Vec<()>>>()?;
	Ok(())
}

pub fn phase_splay<S: Serializer>(container: &TileContainer<S>, hub: &MessagingHub, scheduler: &Scheduler, indices: &[TileIndex]) -> anyhow::Result<()> {
	let mut io_error: Option<anyhow::Error> = None;
	scheduler.for_each_until_fixpoint(indices, |idx| {
		let received = hub.receive(*idx);
		if received.is_empty() {
			return false;
		}
		let outcome = container.with_tile(*idx, |tile| {
			let (inserted, _) = tile.insert_many(received, true, true);
			if inserted.is_empty() {
				return Vec::new();
			}
			tile.get_finite_neighbors(&inserted)
		});
		match outcome {
			Ok(outgoing) => {
				if outgoing.is_empty() {
					false
				} else {
					let mut by_dest: std::collections::HashMap<TileIndex, Vec<(TileIndex, ddt_kernel::Point, TileIndex)>> = std::collections::HashMap::new();
					for (dest, point, label) in outgoing {
						by_dest.entry(dest).or_default().push((dest, point, label));
					}
					let mut sent_any = false;
					for (_, items) in by_dest {
						if hub.send_one(*idx, items) > 0 {
							sent_any = true;
						}
					}
					sent_any
				}
			}
			Err(e) => {
				io_error = Some(e);
				false
			}
		}
	});
	if let Some(e) = io_error {
		return Err(e);
	}
	Ok(())
}

pub fn phase_finalize<S: Serializer>(container: &TileContainer<S>, scheduler: &Scheduler, indices: &[TileIndex]) -> anyhow::Result<()> {
	let results = scheduler.for_each(indices, |idx| -> anyhow::Result<()> { container.with_tile(*idx, |tile| tile.finalize()) });
	results.into_iter().collect::<anyhow::Result<Vec<()>>>()?;
	Ok(())
}

/// Runs all four phases in sequence: local insert of the initial
/// partition, axis-extreme broadcast, iterative star splaying, then
/// canonical-owner statistics.
pub fn insert_received<S: Serializer>(container: &TileContainer<S>, hub: &MessagingHub, scheduler: &Scheduler, indices: &[TileIndex]) -> anyhow::Result<()> {
	phase_insert(container, hub, scheduler, indices)?;
	phase_broadcast(container, hub, scheduler, indices)?;
	phase_splay(container, hub, scheduler, indices)?;
	phase_finalize(container, scheduler, indices)?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use ddt_core::ConcurrencyLimits;
	use ddt_container::NullSerializer;
	use ddt_core::config::SchedulerKind;
	use ddt_kernel::Point;

	fn grid_indices(n: u64) -> Vec<TileIndex> {
		(0..n).map(TileIndex::new).collect()
	}

	#[test]
	fn two_tile_split_converges_and_reports_full_point_count() {
		let container = TileContainer::new(2, None, NullSerializer);
		let hub = MessagingHub::new();
		let scheduler = Scheduler::new(SchedulerKind::Sequential, ConcurrencyLimits::new(1));
		let indices = grid_indices(2);

		hub.seed_inbox(
			TileIndex::new(0),
			vec![
				(Point::new(vec![-2.0, -2.0]), TileIndex::new(0)),
				(Point::new(vec![-2.0, -1.0]), TileIndex::new(0)),
				(Point::new(vec![-1.0, -2.0]), TileIndex::new(0)),
				(Point::new(vec![-1.0, -1.0]), TileIndex::new(0)),
			],
		);
		hub.seed_inbox(
			TileIndex::new(1),
			vec![
				(Point::new(vec![2.0, 2.0]), TileIndex::new(1)),
				(Point::new(vec![2.0, 1.0]), TileIndex::new(1)),
				(Point::new(vec![1.0, 2.0]), TileIndex::new(1)),
				(Point::new(vec![1.0, 1.0]), TileIndex::new(1)),
			],
		);

		insert_received(&container, &hub, &scheduler, &indices).unwrap();

		let total_main_vertices: usize = indices
			.iter()
			.map(|idx| container.with_tile(*idx, |tile| tile.statistics().unwrap().main_vertices).unwrap())
			.sum();
		assert_eq!(total_main_vertices, 8);

		for idx in &indices {
			container
				.with_tile(*idx, |tile| {
					let local = tile.local();
					for f in local.facets() {
						assert_eq!(local.mirror_facet(local.mirror_facet(f)), f);
					}
					for c in local.cells() {
						if local.is_cell_infinite(c) {
							continue;
						}
						for i in 0..=local.dimension() {
							if let Some(n) = local.neighbor(c, i) {
								let back = local.mirror_index(c, i);
								assert_eq!(local.neighbor(n, back), Some(c));
							}
						}
					}
				})
				.unwrap();
		}
	}
}
