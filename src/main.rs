//! crawlpool CLI: crawl directories across worker threads and print what was found.

use anyhow::Result;
use clap::Parser;
use crawlpool::engine::arg_parser::Cli;
use crawlpool::engine::handle_run;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
