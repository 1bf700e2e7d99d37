//! Worker thread: drains a private link buffer, refills it from the shared queue and
//! donates overflow back when another worker has gone idle.
//!
//! Each worker:
//! - Blocks on its wake latch (timed) while idle or paused
//! - Processes exactly one job per step
//! - Flushes local results every `buffer_size` jobs and before going idle
//! - Catches job failures inside the crawl driver; a bad job never ends the worker

use crossbeam_channel::Sender;
use log::debug;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::crawler::{Crawl, Crawler};
use crate::error::PoolError;
use crate::types::WorkerState;

use super::context::PoolContext;
use super::queue::donate_overflow;
use super::signal::WorkerSignals;

/// What one step did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Pool is paused; worker parked itself
    Paused,
    /// One job was processed
    Crawled,
    /// Private buffer was refilled from the shared queue
    Refilled,
    /// Nothing left anywhere; worker went idle
    Idle,
}

/// Handle to a spawned worker thread.
pub struct Worker {
    id: usize,
    signals: Arc<WorkerSignals>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawn a worker thread. It stays idle until its wake latch is set.
    /// `ready_tx` receives the worker id the first time it wakes.
    pub fn spawn<C: Crawler>(
        id: usize,
        crawl: Crawl<C>,
        signals: Arc<WorkerSignals>,
        ctx: Arc<PoolContext<C>>,
        ready_tx: Sender<usize>,
    ) -> Result<Self, PoolError> {
        let runtime = WorkerRuntime::new(id, crawl, ctx, Arc::clone(&signals));
        let handle = thread::Builder::new()
            .name(format!("crawl-worker-{id}"))
            .spawn(move || runtime.run(ready_tx))?;
        Ok(Self {
            id,
            signals,
            handle: Some(handle),
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn signals(&self) -> &Arc<WorkerSignals> {
        &self.signals
    }

    pub fn wake(&self) {
        self.signals.wake.set();
    }

    pub fn stop(&self) {
        self.signals.request_stop();
    }

    /// The thread has exited. Before a stop request this only happens on a panic.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }

    /// Wait for the thread to exit.
    pub fn join(mut self) -> Result<(), PoolError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| PoolError::WorkerPanicked(self.id)),
            None => Ok(()),
        }
    }
}

pub(crate) struct WorkerRuntime<C: Crawler> {
    id: usize,
    crawl: Crawl<C>,
    ctx: Arc<PoolContext<C>>,
    signals: Arc<WorkerSignals>,
    processed: usize,
}

impl<C: Crawler> WorkerRuntime<C> {
    pub(crate) fn new(
        id: usize,
        crawl: Crawl<C>,
        ctx: Arc<PoolContext<C>>,
        signals: Arc<WorkerSignals>,
    ) -> Self {
        Self {
            id,
            crawl,
            ctx,
            signals,
            processed: 0,
        }
    }

    fn run(mut self, ready_tx: Sender<usize>) {
        debug!("worker {}: started", self.id);
        let mut ready = Some(ready_tx);
        loop {
            let woke = self.signals.wake.wait_timeout(self.ctx.tick);
            if self.signals.stop_requested() {
                break;
            }
            if !woke {
                continue;
            }
            if let Some(tx) = ready.take() {
                let _ = tx.send(self.id);
            }
            self.step();
        }
        self.finish();
    }

    /// Flush what is left and mark the worker stopped.
    pub(crate) fn finish(&mut self) {
        self.ctx.results.flush(self.crawl.results_mut());
        self.signals.set_state(WorkerState::Stopped);
        self.signals.idle.set();
        debug!(
            "worker {}: stopped after {} jobs ({} left in buffer)",
            self.id,
            self.processed,
            self.crawl.links().len()
        );
    }

    /// One scheduling tick while awake.
    pub(crate) fn step(&mut self) -> Step {
        let pool = &self.ctx.signals;
        // Publish Awake before reading `paused` so pause() never sees a stale quiescent state
        self.signals.set_state(WorkerState::Awake);
        if pool.paused.is_set() {
            self.signals.set_state(WorkerState::Paused);
            self.signals.wake.clear();
            self.signals.idle.set();
            return Step::Paused;
        }
        self.signals.idle.clear();

        let buffer_size = self.ctx.buffer_size;
        if self.crawl.crawl_next().is_some() {
            self.processed += 1;
            if pool.worker_idle.is_set() && self.crawl.links().len() > buffer_size {
                let donated = donate_overflow(self.crawl.links_mut(), buffer_size, &self.ctx.queue);
                debug!("worker {}: donated {} links", self.id, donated);
            }
            if self.processed.is_multiple_of(buffer_size) {
                self.ctx.results.flush(self.crawl.results_mut());
            }
            return Step::Crawled;
        }

        let pulled = self.ctx.queue.pull(buffer_size);
        if !pulled.is_empty() {
            self.crawl.links_mut().extend(pulled);
            return Step::Refilled;
        }

        self.ctx.results.flush(self.crawl.results_mut());
        self.signals.set_state(WorkerState::Idle);
        self.signals.wake.clear();
        self.signals.idle.set();
        pool.worker_idle.set();
        pool.idle_edge.set();
        Step::Idle
    }

    #[cfg(test)]
    fn buffer_len(&self) -> usize {
        self.crawl.links().len()
    }
}
