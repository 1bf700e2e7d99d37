//! crawlpool: multi-worker crawl engine.
//!
//! A [`Manager`] fans entrypoints ("links") out across worker threads. Each worker drives a
//! [`Crawler`] over a private buffer, refills from the shared queue and donates overflow
//! back when a peer runs dry. The manager detects when a batch has drained and, with
//! keepalive, parks the pool for more links.
//!
//! ```no_run
//! use crawlpool::{FsArgs, FsCrawler, Manager, PoolConfig};
//! use std::path::PathBuf;
//!
//! let config = PoolConfig { keepalive: false, ..PoolConfig::default() };
//! let links = [PathBuf::from("/usr/share")];
//! let manager = Manager::<FsCrawler>::new(links, config, FsArgs::search(r"\.txt$"))?;
//! let results = manager.start(true)?;
//! println!("{} hits", results.hits_len());
//! # Ok::<(), crawlpool::PoolError>(())
//! ```

pub mod crawler;
pub mod engine;
pub mod error;
pub mod output;
pub mod pool;
pub mod transform;
pub mod types;
pub mod utils;

pub use crawler::{Crawl, CrawlResults, Crawler, FsArgs, FsCrawler, FsHit};
pub use error::{CrawlError, PoolError, TransformError};
pub use pool::{Manager, PoolConfig, Results};
pub use transform::{Pipeline, Transform};
/// Re-export types for API
pub use types::*;

use std::path::PathBuf;
use std::sync::Arc;

/// Result alias used by the CLI layer
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// One-shot filesystem crawl of `links`: run until the batch drains and return the results.
///
/// `config.keepalive` is ignored (always one-shot). For a long-lived pool use [`Manager`].
pub fn crawl_paths<I>(
    links: I,
    config: PoolConfig,
    args: FsArgs,
    pipeline: Pipeline<PathBuf>,
) -> Result<Arc<CrawlResults<FsCrawler>>>
where
    I: IntoIterator<Item = PathBuf>,
{
    let config = PoolConfig {
        keepalive: false,
        ..config
    };
    log::debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_uppercase(),
        config
    );
    let manager = Manager::<FsCrawler>::new(links, config, args)?.with_pipeline(pipeline);
    Ok(manager.start(true)?)
}
