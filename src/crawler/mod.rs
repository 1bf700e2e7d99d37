//! Crawler interface and the step driver that runs it.
//!
//! A [`Crawler`] knows how to expand one job (link) into hits and further links. It holds
//! no queue of its own: [`Crawl`] owns the private link buffer and the local results, pops
//! one link per step and records the outcome.

pub mod fs;

use log::debug;
use std::collections::VecDeque;
use std::fmt::Debug;
use std::sync::Arc;

use crate::error::{CrawlError, PoolError};
use crate::pool::results::LocalResults;
use crate::transform::Pipeline;
use crate::types::{Mode, Schema, Visit};

pub use fs::{FsArgs, FsCrawler, FsHit};

pub trait Crawler: Send + Sized + 'static {
    /// One unit of work. Opaque to the pool.
    type Link: Clone + Debug + Send + Sync + 'static;
    /// Artifact recorded in `Results::hits`.
    type Hit: Clone + Debug + Send + Sync + 'static;
    /// What the transform pipeline operates on.
    type Artifact: 'static;
    /// Whatever `init_entrypoint` learned about the current link.
    type Metadata;
    /// Domain arguments, forwarded verbatim by the manager.
    type Args: Clone + Send + Sync + 'static;

    /// Build a crawler. Invalid arguments are a configuration error.
    fn new(mode: Mode, args: &Self::Args) -> Result<Self, PoolError>;

    fn crawl_modes() -> &'static [Mode];

    fn hits_header(mode: Mode) -> Schema;

    fn links_header(mode: Mode) -> Schema;

    /// Open the entrypoint. Failing here skips the link.
    fn init_entrypoint(&mut self, entrypoint: &Self::Link) -> Result<Self::Metadata, CrawlError>;

    fn extract_hits(
        &mut self,
        entrypoint: &Self::Link,
        metadata: &Self::Metadata,
        pipeline: &Pipeline<Self::Artifact>,
    ) -> Vec<Self::Hit>;

    fn extract_links(&mut self, entrypoint: &Self::Link, metadata: &Self::Metadata)
    -> Vec<Self::Link>;

    /// Items found under the entrypoint that are neither hits nor links.
    fn extract_skipped(&mut self, _metadata: &Self::Metadata) -> Vec<Self::Link> {
        Vec::new()
    }

    /// Release whatever `init_entrypoint` allocated.
    fn close_entrypoint(&mut self, _metadata: Self::Metadata) {}

    fn is_hit(&self, item: &Self::Artifact) -> bool;

    fn is_link(&self, entrypoint: &Self::Link, item: &Self::Link) -> bool;
}

/// Hits/links sink type for a given crawler.
pub type CrawlResults<C> = crate::pool::Results<<C as Crawler>::Hit, <C as Crawler>::Link>;

/// Runs a [`Crawler`] over a private link buffer.
pub struct Crawl<C: Crawler> {
    crawler: C,
    links: VecDeque<C::Link>,
    results: LocalResults<C::Hit, C::Link>,
    pipeline: Arc<Pipeline<C::Artifact>>,
}

impl<C: Crawler> Crawl<C> {
    pub fn new<I>(crawler: C, links: I, pipeline: Arc<Pipeline<C::Artifact>>) -> Self
    where
        I: IntoIterator<Item = C::Link>,
    {
        Self {
            crawler,
            links: links.into_iter().collect(),
            results: LocalResults::default(),
            pipeline,
        }
    }

    pub fn links(&self) -> &VecDeque<C::Link> {
        &self.links
    }

    pub fn links_mut(&mut self) -> &mut VecDeque<C::Link> {
        &mut self.links
    }

    pub fn results(&self) -> &LocalResults<C::Hit, C::Link> {
        &self.results
    }

    pub fn results_mut(&mut self) -> &mut LocalResults<C::Hit, C::Link> {
        &mut self.results
    }

    pub fn into_results(self) -> LocalResults<C::Hit, C::Link> {
        self.results
    }

    /// Pop the next link and crawl it. `None` when the buffer is empty.
    pub fn crawl_next(&mut self) -> Option<Visit> {
        let link = self.links.pop_front()?;
        Some(self.visit(link))
    }

    /// Crawl until the buffer is empty. Returns the number of links visited.
    pub fn run(&mut self) -> usize {
        let mut steps = 0;
        while self.crawl_next().is_some() {
            steps += 1;
        }
        steps
    }

    fn visit(&mut self, link: C::Link) -> Visit {
        let metadata = match self.crawler.init_entrypoint(&link) {
            Ok(m) => m,
            Err(e) => {
                debug!("skipping {:?}: {}", link, e);
                self.results.links_skipped.push(link);
                return Visit::Skipped;
            }
        };
        let skipped = self.crawler.extract_skipped(&metadata);
        let hits = self.crawler.extract_hits(&link, &metadata, &self.pipeline);
        let found = self.crawler.extract_links(&link, &metadata);
        self.crawler.close_entrypoint(metadata);

        self.results.links_followed.push(link);
        self.results.hits.extend(hits);
        self.results.links_skipped.extend(skipped);
        self.links.extend(found);
        Visit::Followed
    }
}
