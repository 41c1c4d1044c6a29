//! Run configuration assembled once by the CLI and passed down by value.

use crate::ConcurrencyLimits;
use std::path::PathBuf;

/// Which scheduler drives the splaying engine's tile traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerKind {
	Sequential,
	Threaded,
	MessagePassing,
}

impl std::str::FromStr for SchedulerKind {
	type Err = anyhow::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"sequential" => Ok(Self::Sequential),
			"threaded" => Ok(Self::Threaded),
			"message-passing" => Ok(Self::MessagePassing),
			other => anyhow::bail!("unknown scheduler kind: \"{other}\" (expected sequential, threaded or message-passing)"),
		}
	}
}

/// Parameters threaded from the CLI down through the engine and I/O layers.
///
/// Library crates never parse flags themselves; this struct is the single
/// point where the binary's `clap::Args` are translated into domain values.
#[derive(Debug, Clone)]
pub struct RunConfig {
	pub dimension: usize,
	pub tile_grid: Vec<usize>,
	pub memory_cap: Option<usize>,
	pub scheduler: SchedulerKind,
	pub concurrency: ConcurrencyLimits,
	pub serialize_prefix: Option<PathBuf>,
	pub check: bool,
}

impl RunConfig {
	pub fn new(dimension: usize, tile_grid: Vec<usize>) -> Self {
		Self {
			dimension,
			tile_grid,
			memory_cap: None,
			scheduler: SchedulerKind::Sequential,
			concurrency: ConcurrencyLimits::default(),
			serialize_prefix: None,
			check: false,
		}
	}

	pub fn number_of_tiles(&self) -> usize {
		self.tile_grid.iter().product::<usize>().max(1)
	}
}
