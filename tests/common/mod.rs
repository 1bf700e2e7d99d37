//! Shared fixtures: a synthetic tree crawler and a generated directory tree.
#![allow(dead_code)]

use crawlpool::{
    Crawl, CrawlError, Crawler, Field, FieldKind, Mode, Pipeline, PoolConfig, PoolError, Results,
    Schema, Transform, TransformError,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;
use walkdir::WalkDir;

// --- synthetic tree crawler ---

/// Node `n` has children `n*fanout + 1 ..= n*fanout + fanout` below `limit`.
/// Nodes with `n % 7 == 3` fail to open and end up skipped.
#[derive(Clone, Debug)]
pub struct TreeArgs {
    pub fanout: u64,
    pub limit: u64,
    /// Sleep per job, to keep the pool busy for a while
    pub delay: Duration,
    /// Panic while opening this node
    pub panic_on: Option<u64>,
}

impl TreeArgs {
    pub fn new(fanout: u64, limit: u64) -> Self {
        Self {
            fanout,
            limit,
            delay: Duration::ZERO,
            panic_on: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_panic_on(mut self, node: u64) -> Self {
        self.panic_on = Some(node);
        self
    }
}

pub struct Tree {
    args: TreeArgs,
}

impl Crawler for Tree {
    type Link = u64;
    type Hit = u64;
    type Artifact = u64;
    type Metadata = ();
    type Args = TreeArgs;

    fn new(_mode: Mode, args: &TreeArgs) -> Result<Self, PoolError> {
        if args.fanout == 0 {
            return Err(PoolError::Config("fanout must be positive".into()));
        }
        Ok(Self { args: args.clone() })
    }

    fn crawl_modes() -> &'static [Mode] {
        &[Mode::Simple]
    }

    fn hits_header(_mode: Mode) -> Schema {
        vec![Field::new("Node", FieldKind::Int, None)]
    }

    fn links_header(_mode: Mode) -> Schema {
        vec![Field::new("Node", FieldKind::Int, None)]
    }

    fn init_entrypoint(&mut self, node: &u64) -> Result<(), CrawlError> {
        if !self.args.delay.is_zero() {
            thread::sleep(self.args.delay);
        }
        if self.args.panic_on == Some(*node) {
            panic!("node {node} blew up");
        }
        if node % 7 == 3 {
            return Err(CrawlError::InvalidEntrypoint(node.to_string()));
        }
        Ok(())
    }

    fn extract_hits(&mut self, node: &u64, _meta: &(), pipeline: &Pipeline<u64>) -> Vec<u64> {
        pipeline
            .run(*node)
            .into_iter()
            .filter(|h| self.is_hit(h))
            .collect()
    }

    fn extract_links(&mut self, node: &u64, _meta: &()) -> Vec<u64> {
        let base = node * self.args.fanout;
        (1..=self.args.fanout)
            .map(|i| base + i)
            .filter(|c| self.is_link(node, c))
            .collect()
    }

    fn is_hit(&self, _item: &u64) -> bool {
        true
    }

    fn is_link(&self, _entrypoint: &u64, item: &u64) -> bool {
        *item < self.args.limit
    }
}

/// Drops even hits.
pub struct RejectEven;

impl Transform<u64> for RejectEven {
    fn name(&self) -> &'static str {
        "reject-even"
    }

    fn apply(&self, item: u64) -> Result<u64, TransformError> {
        if item % 2 == 0 {
            return Err(TransformError::Rejected {
                stage: self.name(),
                reason: format!("{item} is even"),
            });
        }
        Ok(item)
    }
}

/// Passes paths through unchanged after a short sleep.
pub struct Throttle(pub Duration);

impl Transform<PathBuf> for Throttle {
    fn name(&self) -> &'static str {
        "throttle"
    }

    fn apply(&self, item: PathBuf) -> Result<PathBuf, TransformError> {
        thread::sleep(self.0);
        Ok(item)
    }
}

// --- counting ---

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Counts {
    pub hits: usize,
    pub followed: usize,
    pub skipped: usize,
}

impl Counts {
    pub fn of<H, L>(results: &Results<H, L>) -> Self {
        Self {
            hits: results.hits_len(),
            followed: results.links_followed_len(),
            skipped: results.links_skipped_len(),
        }
    }

    pub fn times(self, n: usize) -> Self {
        Self {
            hits: self.hits * n,
            followed: self.followed * n,
            skipped: self.skipped * n,
        }
    }
}

/// Counts of a sequential crawl of `roots`, no pool involved.
pub fn sequential_counts(args: &TreeArgs, roots: &[u64], pipeline: Pipeline<u64>) -> Counts {
    let tree = Tree::new(Mode::Simple, args).unwrap();
    let mut crawl = Crawl::new(tree, roots.iter().copied(), Arc::new(pipeline));
    crawl.run();
    let local = crawl.into_results();
    Counts {
        hits: local.hits.len(),
        followed: local.links_followed.len(),
        skipped: local.links_skipped.len(),
    }
}

pub fn pool_config(worker_count: usize, keepalive: bool) -> PoolConfig {
    PoolConfig {
        worker_count,
        buffer_size: 8,
        keepalive,
        tick: Duration::from_millis(10),
        ..PoolConfig::default()
    }
}

// --- filesystem fixture ---

pub const TOP_DIRS: usize = 7;
pub const SUB_DIRS: usize = 20;
pub const FILES_PER_DIR: usize = 12;
pub const EXTRA_ROOT_FILES: usize = 35;

/// Generated tree with its expected counts, taken from an independent walk.
pub struct Fixture {
    pub dir: TempDir,
    pub files: usize,
    pub dirs: usize,
    /// Entries that are neither files nor directories (symlinks)
    pub other: usize,
}

impl Fixture {
    pub fn root(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    pub fn count_matching(&self, suffix: &str) -> usize {
        walk_files(self.dir.path())
            .filter(|p| p.to_string_lossy().ends_with(suffix))
            .count()
    }
}

fn write_files(dir: &Path, count: usize) {
    for i in 0..count {
        let ext = if i % 4 == 0 { "py" } else { "txt" };
        fs::write(dir.join(format!("f{i}.{ext}")), format!("{i}")).unwrap();
    }
}

fn walk_files(root: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
}

/// 148 directories, 1811 files and (on unix) 2 symlinks.
pub fn fs_fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_files(root, FILES_PER_DIR);
    for i in 0..EXTRA_ROOT_FILES {
        fs::write(root.join(format!("r{i}.log")), b"log").unwrap();
    }
    for t in 0..TOP_DIRS {
        let top = root.join(format!("d{t}"));
        fs::create_dir(&top).unwrap();
        write_files(&top, FILES_PER_DIR);
        for s in 0..SUB_DIRS {
            let sub = top.join(format!("s{s}"));
            fs::create_dir(&sub).unwrap();
            write_files(&sub, FILES_PER_DIR);
        }
    }
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(root.join("d0"), root.join("link_to_d0")).unwrap();
        std::os::unix::fs::symlink(root.join("missing"), root.join("d0").join("dangling"))
            .unwrap();
    }

    let (mut files, mut dirs, mut other) = (0, 0, 0);
    for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
        let ft = entry.file_type();
        if ft.is_file() {
            files += 1;
        } else if ft.is_dir() {
            dirs += 1;
        } else {
            other += 1;
        }
    }
    Fixture {
        dir,
        files,
        dirs,
        other,
    }
}

/// Small tree for transform tests: `a/`, `a/b/` with a few files each.
pub fn small_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("a/b")).unwrap();
    for (name, body) in [
        ("one.py", "1"),
        ("two.log", "2"),
        ("a/three.py", "3"),
        ("a/four.log", "4"),
        ("a/b/five.py", "5"),
    ] {
        fs::write(root.join(name), body).unwrap();
    }
    dir
}
