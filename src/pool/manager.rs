//! Pool manager: owns the configuration, spawns workers, detects batch completion and
//! drives pause/resume/stop.
//!
//! A run goes through:
//! 1. `prepare`: lifecycle check, results reset, one [`Crawl`] per worker
//! 2. Worker spawn (or the inline path when `worker_count == 1`)
//! 3. Orchestration loop until the batch drains (one-shot) or a stop is requested
//! 4. Shutdown: stop and join every worker, stamp `done_time`

use crossbeam_channel::{Sender, bounded};
use log::{debug, error, info};
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::crawler::{Crawl, CrawlResults, Crawler};
use crate::error::PoolError;
use crate::transform::Pipeline;
use crate::types::Mode;
use crate::utils::config::PoolConsts;

use super::context::PoolContext;
use super::signal::WorkerSignals;
use super::worker::{Step, Worker, WorkerRuntime};

/// Called once per drained batch with the new batch id.
pub type BatchCallback<C> = Arc<dyn Fn(u64, &CrawlResults<C>) + Send + Sync>;

/// Pool configuration. Validated by [`Manager::new`].
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Number of workers. `1` runs the crawler on the run thread without spawning.
    pub worker_count: usize,
    /// Soft cap of each worker's private buffer; also the flush interval.
    pub buffer_size: usize,
    /// Keep workers parked after a batch drains, waiting for `append_links`.
    pub keepalive: bool,
    pub mode: Mode,
    /// Timeout of every blocking wait; bounds stop latency.
    pub tick: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            worker_count: PoolConsts::WORKER_COUNT,
            buffer_size: PoolConsts::BUFFER_SIZE,
            keepalive: true,
            mode: Mode::default(),
            tick: PoolConsts::TICK,
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.worker_count == 0 {
            return Err(PoolError::Config("worker_count must be at least 1".into()));
        }
        if self.buffer_size == 0 {
            return Err(PoolError::Config("buffer_size must be at least 1".into()));
        }
        if self.tick.is_zero() {
            return Err(PoolError::Config("tick must be non-zero".into()));
        }
        Ok(())
    }
}

/// State shared between the manager handle and its run thread.
struct Shared<C: Crawler> {
    ctx: Arc<PoolContext<C>>,
    /// A run is in progress (set by start, cleared after shutdown)
    active: AtomicBool,
    /// Accepting new links
    running: AtomicBool,
    force_stop: AtomicBool,
    batch_id: AtomicU64,
    /// Serializes the batch-done decision against `append_links`
    batch_lock: Mutex<()>,
    workers: Mutex<Vec<Arc<WorkerSignals>>>,
}

pub struct Manager<C: Crawler> {
    config: PoolConfig,
    args: C::Args,
    pipeline: Arc<Pipeline<C::Artifact>>,
    on_batch_done: Option<BatchCallback<C>>,
    shared: Arc<Shared<C>>,
    run_handle: Mutex<Option<JoinHandle<()>>>,
}

impl<C: Crawler> Manager<C> {
    /// Validate `config`, check the crawler arguments and seed the queue with `initial_jobs`.
    pub fn new<I>(initial_jobs: I, config: PoolConfig, args: C::Args) -> Result<Self, PoolError>
    where
        I: IntoIterator<Item = C::Link>,
    {
        config.validate()?;
        if !C::crawl_modes().contains(&config.mode) {
            return Err(PoolError::Config(format!(
                "mode '{}' not supported by this crawler",
                config.mode
            )));
        }
        C::new(config.mode, &args)?;

        let ctx = PoolContext::new(initial_jobs, config.buffer_size, config.tick);
        ctx.results
            .set_headers(C::hits_header(config.mode), C::links_header(config.mode));
        debug!("manager created: {:?}", config);

        Ok(Self {
            config,
            args,
            pipeline: Arc::new(Pipeline::new()),
            on_batch_done: None,
            shared: Arc::new(Shared {
                ctx: Arc::new(ctx),
                active: AtomicBool::new(false),
                running: AtomicBool::new(false),
                force_stop: AtomicBool::new(false),
                batch_id: AtomicU64::new(0),
                batch_lock: Mutex::new(()),
                workers: Mutex::new(Vec::new()),
            }),
            run_handle: Mutex::new(None),
        })
    }

    pub fn with_on_batch_done<F>(mut self, callback: F) -> Self
    where
        F: Fn(u64, &CrawlResults<C>) + Send + Sync + 'static,
    {
        self.on_batch_done = Some(Arc::new(callback));
        self
    }

    pub fn with_pipeline(mut self, pipeline: Pipeline<C::Artifact>) -> Self {
        self.pipeline = Arc::new(pipeline);
        self
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn results(&self) -> Arc<CrawlResults<C>> {
        Arc::clone(&self.shared.ctx.results)
    }

    pub fn batch_id(&self) -> u64 {
        self.shared.batch_id.load(Ordering::SeqCst)
    }

    pub fn running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.shared.ctx.signals.paused.is_set()
    }

    /// Run on the calling thread until the batch drains (or, with keepalive, until
    /// [`stop`](Self::stop) is called from another thread).
    pub fn start(&self, reset_results: bool) -> Result<Arc<CrawlResults<C>>, PoolError> {
        let run = self.prepare(reset_results)?;
        let (ready_tx, _ready_rx) = bounded(run.crawls.len());
        run.execute(ready_tx)?;
        Ok(self.results())
    }

    /// Run on a background thread and hand the outcome to `callback` when it ends.
    ///
    /// Returns once every worker has reported its first wake, so `pause`/`append_links`
    /// are safe to call right away.
    pub fn start_with_callback<F>(&self, reset_results: bool, callback: F) -> Result<(), PoolError>
    where
        F: FnOnce(Result<Arc<CrawlResults<C>>, PoolError>) + Send + 'static,
    {
        let run = self.prepare(reset_results)?;
        let expected = run.crawls.len();
        let (ready_tx, ready_rx) = bounded(expected);
        let results = self.results();

        let spawned = thread::Builder::new()
            .name("crawl-manager".into())
            .spawn(move || callback(run.execute(ready_tx).map(|()| results)));
        let handle = match spawned {
            Ok(h) => h,
            Err(e) => {
                self.shared.running.store(false, Ordering::SeqCst);
                self.shared.active.store(false, Ordering::SeqCst);
                return Err(PoolError::Spawn(e));
            }
        };
        *self.run_handle.lock() = Some(handle);

        for _ in 0..expected {
            if ready_rx.recv().is_err() {
                break;
            }
        }
        Ok(())
    }

    /// Wait for the background run started by [`start_with_callback`](Self::start_with_callback).
    pub fn join(&self) -> Result<(), PoolError> {
        let handle = self.run_handle.lock().take();
        match handle {
            Some(h) if h.thread().id() != thread::current().id() => {
                h.join().map_err(|_| PoolError::OrchestratorPanicked)
            }
            _ => Ok(()),
        }
    }

    /// Request a stop. Does not abort an in-flight job; the run ends within a few ticks.
    pub fn stop(&self) {
        debug!("stop requested");
        self.shared.running.store(false, Ordering::SeqCst);
        self.shared.force_stop.store(true, Ordering::SeqCst);
        if self.is_paused() {
            self.resume();
        }
    }

    /// Pause the pool. Blocks until no worker will start another job.
    ///
    /// Workers are registered by `start` before any of them is spawned, so a pause that
    /// lands while a run is starting still holds every worker. A pause issued before
    /// `start` is cleared by it.
    pub fn pause(&self) {
        let shared = &self.shared;
        let signals = &shared.ctx.signals;
        let workers = {
            let workers = shared.workers.lock();
            signals.resumed.clear();
            signals.paused.set();
            workers.clone()
        };
        for worker in workers {
            while !worker.is_quiescent() {
                if shared.force_stop.load(Ordering::SeqCst)
                    || !shared.active.load(Ordering::SeqCst)
                {
                    return;
                }
                worker.idle.wait_timeout(shared.ctx.tick);
            }
        }
        debug!("pool paused");
    }

    pub fn resume(&self) {
        let signals = &self.shared.ctx.signals;
        signals.paused.clear();
        signals.resumed.set();
        for worker in self.shared.workers.lock().iter() {
            worker.wake.set();
        }
        debug!("pool resumed");
    }

    /// Push more links into the running pool and reopen the batch.
    pub fn append_links<I>(&self, links: I) -> Result<(), PoolError>
    where
        I: IntoIterator<Item = C::Link>,
    {
        let shared = &self.shared;
        let _guard = shared.batch_lock.lock();
        if !shared.running.load(Ordering::SeqCst) {
            return Err(PoolError::NotRunning);
        }
        shared.ctx.queue.push_many(links);
        shared.ctx.signals.batch_done.clear();
        for worker in shared.workers.lock().iter() {
            worker.wake.set();
        }
        Ok(())
    }

    fn prepare(&self, reset_results: bool) -> Result<Run<C>, PoolError> {
        let shared = &self.shared;
        if shared.active.swap(true, Ordering::SeqCst) {
            return Err(PoolError::AlreadyRunning);
        }

        let mut crawls = Vec::with_capacity(self.config.worker_count);
        for _ in 0..self.config.worker_count {
            match C::new(self.config.mode, &self.args) {
                Ok(crawler) => crawls.push((
                    Crawl::new(crawler, [], Arc::clone(&self.pipeline)),
                    WorkerSignals::new(),
                )),
                Err(e) => {
                    shared.active.store(false, Ordering::SeqCst);
                    return Err(e);
                }
            }
        }

        let results = &shared.ctx.results;
        if reset_results {
            results.reset();
        }
        results.stamp_start();
        shared.force_stop.store(false, Ordering::SeqCst);
        {
            // Same lock as pause(): a pause either precedes this reset or sees every worker
            let mut workers = shared.workers.lock();
            shared.ctx.signals.reset();
            *workers = crawls.iter().map(|(_, s)| Arc::clone(s)).collect();
        }
        shared.running.store(true, Ordering::SeqCst);
        info!(
            "starting {} worker(s), {} queued link(s)",
            crawls.len(),
            shared.ctx.queue.len()
        );

        Ok(Run {
            shared: Arc::clone(shared),
            crawls,
            keepalive: self.config.keepalive,
            on_batch_done: self.on_batch_done.clone(),
        })
    }
}

impl<C: Crawler> Drop for Manager<C> {
    fn drop(&mut self) {
        if self.shared.active.load(Ordering::SeqCst) {
            self.stop();
        }
        let _ = self.join();
    }
}

/// One run of the pool, moved onto whichever thread drives it.
struct Run<C: Crawler> {
    shared: Arc<Shared<C>>,
    /// One crawl per worker, paired with the signals already registered for it
    crawls: Vec<(Crawl<C>, Arc<WorkerSignals>)>,
    keepalive: bool,
    on_batch_done: Option<BatchCallback<C>>,
}

impl<C: Crawler> Run<C> {
    fn execute(mut self, ready_tx: Sender<usize>) -> Result<(), PoolError> {
        let mut crawls = std::mem::take(&mut self.crawls);
        let outcome = if crawls.len() > 1 {
            self.run_pool(crawls, ready_tx)
        } else {
            match crawls.pop() {
                Some((crawl, signals)) => {
                    panic::catch_unwind(AssertUnwindSafe(|| {
                        self.run_inline(crawl, signals, &ready_tx)
                    }))
                    .map_err(|_| {
                        error!("crawler panicked on the run thread; its buffered links are lost");
                        PoolError::WorkerPanicked(0)
                    })
                }
                None => Ok(()),
            }
        };

        let shared = &self.shared;
        shared.ctx.results.stamp_done();
        shared.running.store(false, Ordering::SeqCst);
        shared.workers.lock().clear();
        shared.active.store(false, Ordering::SeqCst);

        let results = &shared.ctx.results;
        info!(
            "run finished: {} hits, {} followed, {} skipped",
            results.hits_len(),
            results.links_followed_len(),
            results.links_skipped_len()
        );
        outcome
    }

    fn force_stopped(&self) -> bool {
        self.shared.force_stop.load(Ordering::SeqCst)
    }

    fn run_pool(
        &self,
        crawls: Vec<(Crawl<C>, Arc<WorkerSignals>)>,
        ready_tx: Sender<usize>,
    ) -> Result<(), PoolError> {
        let ctx = &self.shared.ctx;
        let signals = &ctx.signals;

        let mut workers = Vec::with_capacity(crawls.len());
        for (id, (crawl, worker_signals)) in crawls.into_iter().enumerate() {
            match Worker::spawn(id, crawl, worker_signals, Arc::clone(ctx), ready_tx.clone()) {
                Ok(worker) => workers.push(worker),
                Err(e) => {
                    // Join whatever did start; the spawn error wins
                    let _ = shutdown(workers);
                    return Err(e);
                }
            }
        }
        drop(ready_tx);
        for worker in &workers {
            worker.wake();
        }

        loop {
            if signals.idle_edge.wait_timeout(ctx.tick) {
                signals.idle_edge.clear();
            }
            if self.force_stopped() {
                break;
            }
            if let Some(dead) = workers.iter().find(|w| w.is_finished()) {
                error!("worker {} exited unexpectedly; stopping the pool", dead.id());
                break;
            }
            if signals.paused.is_set() {
                signals.resumed.wait_while(ctx.tick, || self.force_stopped());
                continue;
            }
            if !ctx.queue.is_empty() {
                for worker in workers.iter().filter(|w| w.signals().is_idle()) {
                    worker.wake();
                }
                signals.worker_idle.clear();
                continue;
            }
            if let Some((batch, finished)) = self.try_finish_batch() {
                self.notify_batch(batch);
                if finished {
                    break;
                }
            }
        }

        shutdown(workers)
    }

    /// Single-worker path: the crawler runs on this thread, no spawning.
    fn run_inline(
        &self,
        crawl: Crawl<C>,
        signals: Arc<WorkerSignals>,
        ready_tx: &Sender<usize>,
    ) {
        let ctx = &self.shared.ctx;
        let mut runtime = WorkerRuntime::new(0, crawl, Arc::clone(ctx), Arc::clone(&signals));
        let _ = ready_tx.send(0);

        while !self.force_stopped() {
            match runtime.step() {
                Step::Crawled | Step::Refilled => {}
                Step::Paused => {
                    ctx.signals
                        .resumed
                        .wait_while(ctx.tick, || self.force_stopped());
                }
                Step::Idle => {
                    // Nobody to rebalance with
                    ctx.signals.worker_idle.clear();
                    ctx.signals.idle_edge.clear();
                    if let Some((batch, finished)) = self.try_finish_batch() {
                        self.notify_batch(batch);
                        if finished {
                            break;
                        }
                    }
                    signals
                        .wake
                        .wait_while(ctx.tick, || self.force_stopped() || !ctx.queue.is_empty());
                }
            }
        }
        runtime.finish();
    }

    /// Latch batch-done if the queue is empty and every worker has drained.
    /// Returns the new batch id and whether the run should end.
    fn try_finish_batch(&self) -> Option<(u64, bool)> {
        let shared = &self.shared;
        let ctx = &shared.ctx;
        let _guard = shared.batch_lock.lock();
        if ctx.signals.batch_done.is_set() || !ctx.queue.is_empty() {
            return None;
        }
        if !shared.workers.lock().iter().all(|w| w.is_drained()) {
            return None;
        }
        ctx.signals.batch_done.set();
        let batch = shared.batch_id.fetch_add(1, Ordering::SeqCst) + 1;
        ctx.results.stamp_done();
        if !self.keepalive {
            shared.running.store(false, Ordering::SeqCst);
        }
        Some((batch, !self.keepalive))
    }

    fn notify_batch(&self, batch: u64) {
        let results = &self.shared.ctx.results;
        debug!(
            "batch {} done: {} hits, {} followed, {} skipped",
            batch,
            results.hits_len(),
            results.links_followed_len(),
            results.links_skipped_len()
        );
        if let Some(callback) = &self.on_batch_done {
            callback(batch, results);
        }
    }
}

/// Stop every worker, then join them all. Reports the first panic.
fn shutdown(workers: Vec<Worker>) -> Result<(), PoolError> {
    for worker in &workers {
        worker.stop();
    }
    let mut outcome = Ok(());
    for worker in workers {
        let id = worker.id();
        if let Err(e) = worker.join() {
            error!("worker {id} panicked; its buffered links are lost");
            if outcome.is_ok() {
                outcome = Err(e);
            }
        }
    }
    outcome
}
