//! Worker-count tuning shared by the scheduler and by I/O traversal code.

/// Number of workers to use for the splaying engine's thread pool, and for
/// the message-passing scheduler's simulated peer count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcurrencyLimits {
	pub workers: usize,
}

impl ConcurrencyLimits {
	pub fn new(workers: usize) -> Self {
		Self { workers: workers.max(1) }
	}

	/// `0` means "auto": one worker per logical CPU.
	pub fn from_flag(requested: usize) -> Self {
		if requested == 0 {
			Self::default()
		} else {
			Self::new(requested)
		}
	}

	pub fn cpu_count() -> usize {
		num_cpus::get()
	}
}

impl Default for ConcurrencyLimits {
	fn default() -> Self {
		Self { workers: num_cpus::get().max(1) }
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_matches_cpu_count() {
		let limits = ConcurrencyLimits::default();
		assert_eq!(limits.workers, num_cpus::get().max(1));
	}

	#[test]
	fn zero_is_clamped_to_one() {
		assert_eq!(ConcurrencyLimits::new(0).workers, 1);
	}

	#[test]
	fn from_flag_zero_means_auto() {
		assert_eq!(ConcurrencyLimits::from_flag(0), ConcurrencyLimits::default());
	}

	#[test]
	fn from_flag_explicit_value_is_kept() {
		assert_eq!(ConcurrencyLimits::from_flag(7).workers, 7);
	}
}
