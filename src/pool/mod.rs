//! Worker pool: shared queue, coordination latches, result sink, workers and manager.

pub mod context;
pub mod manager;
pub mod queue;
pub mod results;
pub mod signal;
pub mod worker;

pub use manager::{BatchCallback, Manager, PoolConfig};
pub use queue::SharedQueue;
pub use results::{LocalResults, Results, ResultsSnapshot};
pub use signal::{Latch, PoolSignals, WorkerSignals};
pub use worker::{Step, Worker};
