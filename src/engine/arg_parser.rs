use clap::Parser;
use std::path::PathBuf;

use crate::output::OutputFormat;
use crate::types::Mode;

/// Multi-worker filesystem crawler.
#[derive(Clone, Debug, Parser)]
#[command(name = "crawlpool")]
#[command(about = "Crawl directories across worker threads; optionally search, copy, move or remove hits.")]
pub struct Cli {
    /// Directories to crawl. Default: current directory.
    #[arg(value_name = "LINK")]
    pub links: Vec<PathBuf>,

    /// Number of workers. 1 crawls on the main thread.
    #[arg(long, short = 'w')]
    pub workers: Option<usize>,

    /// Soft cap of each worker's link buffer.
    #[arg(long, short = 'b')]
    pub buffer_size: Option<usize>,

    /// Only report files whose name matches this regex.
    #[arg(long, short = 's', value_name = "PATTERN")]
    pub search: Option<String>,

    /// Do not descend below this depth (number of path components).
    #[arg(long, short = 'd')]
    pub max_depth: Option<usize>,

    /// Data collection mode: simple (path, name) or extended (adds size and times).
    #[arg(long, short = 'm')]
    pub mode: Option<Mode>,

    /// Output format. Can be repeated: -o summary -o list
    #[arg(long, short = 'o', value_enum)]
    pub output: Vec<OutputFormat>,

    /// Copy every hit into DIR.
    #[arg(long, value_name = "DIR", conflicts_with_all = ["move_to", "remove"])]
    pub copy_to: Option<PathBuf>,

    /// Move every hit into DIR.
    #[arg(long, value_name = "DIR", conflicts_with = "remove")]
    pub move_to: Option<PathBuf>,

    /// Remove every hit.
    #[arg(long)]
    pub remove: bool,

    /// Verbose output.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,
}
