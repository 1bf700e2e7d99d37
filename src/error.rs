//! Error types for crawlpool
//!
//! Failures are contained at the smallest scope that can absorb them:
//! - [`CrawlError`] stays inside one job and ends up in `links_skipped`
//! - [`TransformError`] stays inside one artifact's pipeline run
//! - [`PoolError`] is the only thing that reaches the caller of the [`Manager`](crate::Manager)

use thiserror::Error;

/// Errors surfaced by the [`Manager`](crate::Manager) public API.
#[derive(Error, Debug)]
pub enum PoolError {
    /// Invalid configuration, rejected at construction
    #[error("Configuration error: {0}")]
    Config(String),

    /// `start()` called while the pool is running
    #[error("Pool is already running")]
    AlreadyRunning,

    /// `append_links()` called while the pool is not running
    #[error("Pool is not running")]
    NotRunning,

    /// A worker thread could not be created
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// A worker thread panicked; the jobs it held are lost
    #[error("Worker {0} panicked")]
    WorkerPanicked(usize),

    /// The orchestration thread panicked
    #[error("Orchestration thread panicked")]
    OrchestratorPanicked,
}

/// Job-level failure raised by a [`Crawler`](crate::crawler::Crawler).
///
/// The worker catches it, records the job as skipped, and moves on.
#[derive(Error, Debug)]
pub enum CrawlError {
    /// The entrypoint could not be opened (permissions, missing path, ...)
    #[error("Entrypoint '{entrypoint}' could not be accessed: {source}")]
    Inaccessible {
        entrypoint: String,
        #[source]
        source: std::io::Error,
    },

    /// The entrypoint is not something this crawler can expand
    #[error("Invalid entrypoint '{0}'")]
    InvalidEntrypoint(String),
}

/// Stage-level failure raised by a [`Transform`](crate::transform::Transform).
///
/// Aborts the pipeline for one artifact; the artifact is dropped.
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("{stage}: {source}")]
    Io {
        stage: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{stage}: {reason}")]
    Rejected { stage: &'static str, reason: String },
}

impl TransformError {
    pub fn io(stage: &'static str, source: std::io::Error) -> Self {
        TransformError::Io { stage, source }
    }
}
