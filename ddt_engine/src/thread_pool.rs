//! A fixed-size concurrency limiter modeled on the bounded worker queue of
//! a classic thread pool, built on scoped threads so the borrow checker
//! proves each call's fan-out is sound without `Arc`-wrapping every
//! closure or requiring `'static` job types.

use crossbeam_channel::{bounded, Receiver, Sender};

pub struct ThreadPool {
	release: Sender<()>,
	acquire: Receiver<()>,
}

impl ThreadPool {
	pub fn new(workers: usize) -> Self {
		let workers = workers.max(1);
		let (release, acquire) = bounded(workers);
		for _ in 0..workers {
			release.send(()).expect("channel just created");
		}
		Self { release, acquire }
	}

	/// Runs `f(item)` for every item in `items`, at most `workers` at a
	/// time, returning results in the same order as `items`.
	pub fn scoped_for_each<T, U, F>(&self, items: &[T], f: F) -> Vec<U>
	where
		T: Sync,
		U: Send,
		F: Fn(&T) -> U + Sync,
	{
		std::thread::scope(|scope| {
			let handles: Vec<_> = items
				.iter()
				.map(|item| {
					self.acquire.recv().expect("pool is never closed while in use");
					let release = self.release.clone();
					let f = &f;
					scope.spawn(move || {
						let result = f(item);
						release.send(()).expect("channel outlives the scope");
						result
					})
				})
				.collect();
			handles.into_iter().map(|h| h.join().expect("worker thread panicked")).collect()
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};

	#[test]
	fn runs_every_item_exactly_once() {
		let pool = ThreadPool::new(4);
		let counter = AtomicUsize::new(0);
		let items: Vec<usize> = (0..50).collect();
		let results = pool.scoped_for_each(&items, |i| {
			counter.fetch_add(1, Ordering::SeqCst);
			i * 2
		});
		assert_eq!(counter.load(Ordering::SeqCst), 50);
		assert_eq!(results, items.iter().map(|i| i * 2).collect::<Vec<_>>());
	}

	#[test]
	fn single_worker_behaves_sequentially() {
		let pool = ThreadPool::new(1);
		let items = vec![1, 2, 3];
		let results = pool.scoped_for_each(&items, |i| i + 1);
		assert_eq!(results, vec![2, 3, 4]);
	}
}
