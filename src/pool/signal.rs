//! Binary latches used for pool coordination.
//!
//! A [`Latch`] is a boolean guarded by a mutex plus a condvar: `set` wakes every waiter,
//! `wait_timeout` blocks until set or until the deadline passes. All waits in the pool
//! are timed so stop requests are observed without spinning.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::{Duration, Instant};

use crate::types::WorkerState;

#[derive(Default)]
pub struct Latch {
    flag: Mutex<bool>,
    cond: Condvar,
}

impl Latch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        let mut flag = self.flag.lock();
        *flag = true;
        self.cond.notify_all();
    }

    pub fn clear(&self) {
        *self.flag.lock() = false;
    }

    pub fn is_set(&self) -> bool {
        *self.flag.lock()
    }

    /// Block until the latch is set or `timeout` elapses. Returns the latch state.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut flag = self.flag.lock();
        while !*flag {
            if self.cond.wait_until(&mut flag, deadline).timed_out() {
                break;
            }
        }
        *flag
    }

    /// Block until the latch is set, re-checking `abort` every `tick`.
    /// Returns false if `abort` returned true before the latch was set.
    pub fn wait_while<F>(&self, tick: Duration, abort: F) -> bool
    where
        F: Fn() -> bool,
    {
        loop {
            if self.wait_timeout(tick) {
                return true;
            }
            if abort() {
                return false;
            }
        }
    }
}

/// Per-worker signals. Owned by the worker, written by both the worker and the manager.
pub struct WorkerSignals {
    pub wake: Latch,
    pub idle: Latch,
    stop: AtomicBool,
    state: AtomicU8,
}

impl Default for WorkerSignals {
    fn default() -> Self {
        Self {
            wake: Latch::new(),
            idle: Latch::new(),
            stop: AtomicBool::new(false),
            state: AtomicU8::new(WorkerState::Idle.as_u8()),
        }
    }
}

impl WorkerSignals {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Request a stop and wake the worker so it sees the request promptly.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        self.wake.set();
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub(crate) fn set_state(&self, state: WorkerState) {
        self.state.store(state.as_u8(), Ordering::SeqCst);
    }

    /// Wake latch is low.
    pub fn is_idle(&self) -> bool {
        !self.wake.is_set()
    }

    /// Ran out of work and nobody has woken it since.
    pub fn is_drained(&self) -> bool {
        self.state() == WorkerState::Idle && !self.wake.is_set()
    }

    /// Will not start another job until woken after a resume.
    pub fn is_quiescent(&self) -> bool {
        match self.state() {
            WorkerState::Paused | WorkerState::Stopped => true,
            WorkerState::Idle => !self.wake.is_set(),
            WorkerState::Awake => false,
        }
    }
}

/// Pool-wide signals, owned by the manager and read by every worker.
#[derive(Default)]
pub struct PoolSignals {
    pub paused: Latch,
    pub resumed: Latch,
    /// Some worker ran out of work. Busy workers donate overflow while it is set
    pub worker_idle: Latch,
    /// Wakes the manager loop whenever a worker goes idle; the manager clears it
    pub idle_edge: Latch,
    /// Level latch: the current batch has drained. Cleared when new work arrives.
    pub batch_done: Latch,
}

impl PoolSignals {
    /// Clear every latch except `resumed`, which starts high so nothing blocks on it.
    pub fn reset(&self) {
        self.paused.clear();
        self.resumed.set();
        self.worker_idle.clear();
        self.idle_edge.clear();
        self.batch_done.clear();
    }
}
