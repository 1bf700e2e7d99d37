//! Shared job queue.
//!
//! Every job is either in this queue or in exactly one worker's private buffer. All size
//! changes happen under the single lock; any length read is stale as soon as it returns.

use parking_lot::Mutex;
use std::collections::VecDeque;

pub struct SharedQueue<L> {
    jobs: Mutex<VecDeque<L>>,
}

impl<L> Default for SharedQueue<L> {
    fn default() -> Self {
        Self {
            jobs: Mutex::new(VecDeque::new()),
        }
    }
}

impl<L> SharedQueue<L> {
    pub fn new<I>(jobs: I) -> Self
    where
        I: IntoIterator<Item = L>,
    {
        Self {
            jobs: Mutex::new(jobs.into_iter().collect()),
        }
    }

    /// Remove and return up to `n` jobs from the front.
    pub fn pull(&self, n: usize) -> Vec<L> {
        let mut jobs = self.jobs.lock();
        let take = n.min(jobs.len());
        jobs.drain(..take).collect()
    }

    /// Append jobs to the back.
    pub fn push_many<I>(&self, new_jobs: I)
    where
        I: IntoIterator<Item = L>,
    {
        self.jobs.lock().extend(new_jobs);
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }
}

/// Move everything past `keep` from `buffer` to the back of `queue`.
/// Returns how many jobs were donated.
pub fn donate_overflow<L>(buffer: &mut VecDeque<L>, keep: usize, queue: &SharedQueue<L>) -> usize {
    if buffer.len() <= keep {
        return 0;
    }
    let overflow: Vec<L> = buffer.drain(keep..).collect();
    let n = overflow.len();
    queue.push_many(overflow);
    n
}
