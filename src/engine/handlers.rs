//! CLI run handler: merge file settings and flags, crawl, print.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::Arc;

use crate::crawler::{FsArgs, FsCrawler};
use crate::engine::arg_parser::Cli;
use crate::output::{OutputFormat, print_json, print_list, print_summary};
use crate::pool::{Manager, PoolConfig};
use crate::transform::{CopyTo, MoveTo, Pipeline, Remove};
use crate::types::Mode;
use crate::utils::config::PoolConsts;
use crate::utils::crawlpool_toml::{apply_file_to_opts, load_crawlpool_toml};
use crate::utils::setup_logging;

struct DefaultArgs;

impl DefaultArgs {
    pub const LINK: &'static str = ".";
}

/// Effective CLI options after `.crawlpool.toml` and flags are merged.
#[derive(Clone, Debug)]
pub struct RunOpts {
    pub links: Vec<PathBuf>,
    pub workers: usize,
    pub buffer_size: usize,
    pub mode: Mode,
    pub max_depth: Option<usize>,
    pub pattern: Option<String>,
    pub output: Vec<OutputFormat>,
    pub copy_to: Option<PathBuf>,
    pub move_to: Option<PathBuf>,
    pub remove: bool,
    pub verbose: bool,
}

impl Default for RunOpts {
    fn default() -> Self {
        Self {
            links: vec![PathBuf::from(DefaultArgs::LINK)],
            workers: PoolConsts::WORKER_COUNT,
            buffer_size: PoolConsts::BUFFER_SIZE,
            mode: Mode::default(),
            max_depth: None,
            pattern: None,
            output: vec![OutputFormat::default()],
            copy_to: None,
            move_to: None,
            remove: false,
            verbose: false,
        }
    }
}

impl RunOpts {
    /// Flags override whatever the file set.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if !cli.links.is_empty() {
            self.links = cli.links.clone();
        }
        if let Some(n) = cli.workers {
            self.workers = n;
        }
        if let Some(n) = cli.buffer_size {
            self.buffer_size = n;
        }
        if let Some(mode) = cli.mode {
            self.mode = mode;
        }
        if cli.max_depth.is_some() {
            self.max_depth = cli.max_depth;
        }
        if cli.search.is_some() {
            self.pattern = cli.search.clone();
        }
        if !cli.output.is_empty() {
            self.output = cli.output.clone();
        }
        if let Some(v) = cli.verbose {
            self.verbose = v;
        }
        self.copy_to = cli.copy_to.clone();
        self.move_to = cli.move_to.clone();
        self.remove = cli.remove;
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            worker_count: self.workers,
            buffer_size: self.buffer_size,
            keepalive: false,
            mode: self.mode,
            ..PoolConfig::default()
        }
    }

    pub fn fs_args(&self) -> FsArgs {
        FsArgs {
            max_depth: self.max_depth,
            pattern: self.pattern.clone(),
        }
    }

    /// Transform stages in the order they run on each hit.
    pub fn pipeline(&self) -> Result<Pipeline<PathBuf>> {
        let mut pipeline = Pipeline::new();
        if let Some(dir) = &self.copy_to {
            pipeline.push(CopyTo::new(dir).context("--copy-to")?);
        }
        if let Some(dir) = &self.move_to {
            pipeline.push(MoveTo::new(dir).context("--move-to")?);
        }
        if self.remove {
            pipeline.push(Remove);
        }
        Ok(pipeline)
    }
}

/// Load the settings file, apply flags, then set up logging.
fn setup_opts(cli: &Cli) -> Result<RunOpts> {
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let file = load_crawlpool_toml(&cwd);
    let mut opts = RunOpts::default();
    if let Ok(Some(ref f)) = file {
        apply_file_to_opts(f, &mut opts);
    }
    opts.apply_cli(cli);
    setup_logging(opts.verbose);
    if let Err(e) = file {
        warn!("{:#}", e);
    }
    Ok(opts)
}

/// Crawl the requested links and print the results in every requested format.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let opts = setup_opts(cli)?;
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_uppercase(),
        opts
    );

    let pipeline = opts.pipeline()?;
    if !pipeline.is_empty() {
        info!("{} transform stage(s) will run on every hit", pipeline.len());
    }
    let manager = Manager::<FsCrawler>::new(opts.links.clone(), opts.pool_config(), opts.fs_args())
        .context("invalid crawl configuration")?
        .with_pipeline(pipeline);
    let manager = Arc::new(manager);

    let stopper = Arc::clone(&manager);
    ctrlc::set_handler(move || {
        warn!("Interrupted; stopping workers...");
        stopper.stop();
    })
    .context("failed to install Ctrl+C handler")?;

    let results = manager.start(true)?;
    let skipped = results.links_skipped_len();
    if skipped > 0 {
        warn!("{} link(s) skipped (unreadable or not a regular file/directory)", skipped);
    }

    for format in &opts.output {
        let written = match format {
            OutputFormat::Summary => print_summary(&results),
            OutputFormat::List => print_list(&results),
            OutputFormat::Json => print_json(&results),
        };
        written.context("failed to write results")?;
    }
    Ok(())
}
