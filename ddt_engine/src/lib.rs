//! The star-splaying engine: a bounded-concurrency scheduler driving tile
//! triangulations through insert, broadcast, splay and finalize phases, and
//! the distributed-triangulation facade built on top of it.

pub mod facade;
pub mod partitioner;
pub mod scheduler;
pub mod splaying;
pub mod thread_pool;

pub use facade::DistributedTriangulation;
pub use partitioner::Partitioner;
pub use scheduler::Scheduler;
pub use thread_pool::ThreadPool;
