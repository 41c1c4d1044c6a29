//! Ambient runtime stack shared by every `ddt_*` crate: concurrency tuning,
//! run configuration and the scheduler-kind enum consumed by `ddt_engine`.

pub mod concurrency;
pub mod config;

pub use concurrency::ConcurrencyLimits;
pub use config::{RunConfig, SchedulerKind};
