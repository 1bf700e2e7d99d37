//! State shared by the manager and every worker of one pool.

use std::sync::Arc;
use std::time::Duration;

use crate::crawler::{CrawlResults, Crawler};

use super::queue::SharedQueue;
use super::signal::PoolSignals;

/// Passed by `Arc` into each worker at spawn time. The manager is the lifecycle root.
pub struct PoolContext<C: Crawler> {
    pub queue: SharedQueue<C::Link>,
    pub signals: PoolSignals,
    pub results: Arc<CrawlResults<C>>,
    /// Soft cap of a worker's private buffer; also the flush interval
    pub buffer_size: usize,
    /// Timeout of every blocking wait in the pool
    pub tick: Duration,
}

impl<C: Crawler> PoolContext<C> {
    pub fn new<I>(jobs: I, buffer_size: usize, tick: Duration) -> Self
    where
        I: IntoIterator<Item = C::Link>,
    {
        Self {
            queue: SharedQueue::new(jobs),
            signals: PoolSignals::default(),
            results: Arc::default(),
            buffer_size,
            tick,
        }
    }
}
