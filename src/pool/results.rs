//! Results aggregation: a shared append-only sink plus the per-worker accumulator that
//! is periodically flushed into it.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use crate::types::Schema;

/// Local, unshared accumulator owned by one crawl driver.
#[derive(Debug)]
pub struct LocalResults<H, L> {
    pub hits: Vec<H>,
    pub links_followed: Vec<L>,
    pub links_skipped: Vec<L>,
}

impl<H, L> Default for LocalResults<H, L> {
    fn default() -> Self {
        Self {
            hits: Vec::new(),
            links_followed: Vec::new(),
            links_skipped: Vec::new(),
        }
    }
}

impl<H, L> LocalResults<H, L> {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty() && self.links_followed.is_empty() && self.links_skipped.is_empty()
    }

    pub fn reset(&mut self) {
        self.hits.clear();
        self.links_followed.clear();
        self.links_skipped.clear();
    }
}

/// Shared results of a pool run. Safe for concurrent appends.
pub struct Results<H, L> {
    hits: Mutex<Vec<H>>,
    links_followed: Mutex<Vec<L>>,
    links_skipped: Mutex<Vec<L>>,
    hits_header: OnceLock<Schema>,
    links_header: OnceLock<Schema>,
    start_time: Mutex<Option<Instant>>,
    done_time: Mutex<Option<Instant>>,
}

impl<H, L> Default for Results<H, L> {
    fn default() -> Self {
        Self {
            hits: Mutex::new(Vec::new()),
            links_followed: Mutex::new(Vec::new()),
            links_skipped: Mutex::new(Vec::new()),
            hits_header: OnceLock::new(),
            links_header: OnceLock::new(),
            start_time: Mutex::new(None),
            done_time: Mutex::new(None),
        }
    }
}

impl<H, L> Results<H, L> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the schema descriptors. Only the first call has any effect.
    pub fn set_headers(&self, hits_header: Schema, links_header: Schema) {
        let _ = self.hits_header.set(hits_header);
        let _ = self.links_header.set(links_header);
    }

    pub fn hits_header(&self) -> &[crate::types::Field] {
        self.hits_header.get().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn links_header(&self) -> &[crate::types::Field] {
        self.links_header.get().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Empty the three sequences. Schema is kept.
    pub fn reset(&self) {
        self.hits.lock().clear();
        self.links_followed.lock().clear();
        self.links_skipped.lock().clear();
        *self.done_time.lock() = None;
    }

    /// Move everything accumulated in `local` onto the shared sequences.
    pub fn flush(&self, local: &mut LocalResults<H, L>) {
        if local.is_empty() {
            return;
        }
        if !local.hits.is_empty() {
            self.hits.lock().append(&mut local.hits);
        }
        if !local.links_followed.is_empty() {
            self.links_followed.lock().append(&mut local.links_followed);
        }
        if !local.links_skipped.is_empty() {
            self.links_skipped.lock().append(&mut local.links_skipped);
        }
    }

    pub(crate) fn stamp_start(&self) {
        *self.start_time.lock() = Some(Instant::now());
        *self.done_time.lock() = None;
    }

    pub(crate) fn stamp_done(&self) {
        *self.done_time.lock() = Some(Instant::now());
    }

    pub fn start_time(&self) -> Option<Instant> {
        *self.start_time.lock()
    }

    pub fn done_time(&self) -> Option<Instant> {
        *self.done_time.lock()
    }

    /// `done_time - start_time`, once both are stamped.
    pub fn duration(&self) -> Option<Duration> {
        let start = (*self.start_time.lock())?;
        let done = (*self.done_time.lock())?;
        Some(done.saturating_duration_since(start))
    }

    pub fn hits_len(&self) -> usize {
        self.hits.lock().len()
    }

    pub fn links_followed_len(&self) -> usize {
        self.links_followed.lock().len()
    }

    pub fn links_skipped_len(&self) -> usize {
        self.links_skipped.lock().len()
    }

    /// Run `f` over the hits without copying them out.
    pub fn with_hits<R>(&self, f: impl FnOnce(&[H]) -> R) -> R {
        f(&self.hits.lock())
    }
}

impl<H: Clone, L: Clone> Results<H, L> {
    pub fn hits(&self) -> Vec<H> {
        self.hits.lock().clone()
    }

    pub fn links_followed(&self) -> Vec<L> {
        self.links_followed.lock().clone()
    }

    pub fn links_skipped(&self) -> Vec<L> {
        self.links_skipped.lock().clone()
    }

    /// Point-in-time copy of everything, for serialization.
    pub fn snapshot(&self) -> ResultsSnapshot<H, L> {
        ResultsSnapshot {
            hits_header: self.hits_header().to_vec(),
            links_header: self.links_header().to_vec(),
            hits: self.hits(),
            links_followed: self.links_followed(),
            links_skipped: self.links_skipped(),
            duration_secs: self.duration().map(|d| d.as_secs_f64()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResultsSnapshot<H, L> {
    pub hits_header: Schema,
    pub links_header: Schema,
    pub hits: Vec<H>,
    pub links_followed: Vec<L>,
    pub links_skipped: Vec<L>,
    pub duration_secs: Option<f64>,
}
