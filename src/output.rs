//! Printing of pool results: a count summary, a bare hit list, or JSON.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::io::{self, Write};

use crate::pool::Results;
use crate::utils::Colors;

/// How results are printed after a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Duration and count of each result sequence
    #[default]
    Summary,
    /// One hit per line
    List,
    /// Headers and all three sequences as JSON
    Json,
}

pub fn write_summary<W: Write, H, L>(out: &mut W, results: &Results<H, L>) -> io::Result<()> {
    match results.duration() {
        Some(d) => writeln!(out, "Crawled in: {:.3} s", d.as_secs_f64())?,
        None => writeln!(out, "Crawled in: n/a")?,
    }
    writeln!(
        out,
        "{}",
        Colors::colorize(Colors::HITS, &format!("Number of hits: {}", results.hits_len()))
    )?;
    writeln!(
        out,
        "{}",
        Colors::colorize(
            Colors::FOLLOWED,
            &format!("Number of links followed: {}", results.links_followed_len())
        )
    )?;
    writeln!(
        out,
        "{}",
        Colors::colorize(
            Colors::SKIPPED,
            &format!("Number of links skipped: {}", results.links_skipped_len())
        )
    )
}

/// One hit per line, suitable for piping.
pub fn write_list<W: Write, H: Display, L>(out: &mut W, results: &Results<H, L>) -> io::Result<()> {
    results.with_hits(|hits| hits.iter().try_for_each(|hit| writeln!(out, "{hit}")))
}

pub fn write_json<W, H, L>(out: &mut W, results: &Results<H, L>) -> io::Result<()>
where
    W: Write,
    H: Serialize + Clone,
    L: Serialize + Clone,
{
    serde_json::to_writer_pretty(&mut *out, &results.snapshot())?;
    writeln!(out)
}

pub fn print_summary<H, L>(results: &Results<H, L>) -> io::Result<()> {
    write_summary(&mut io::stdout().lock(), results)
}

pub fn print_list<H: Display, L>(results: &Results<H, L>) -> io::Result<()> {
    write_list(&mut io::stdout().lock(), results)
}

pub fn print_json<H, L>(results: &Results<H, L>) -> io::Result<()>
where
    H: Serialize + Clone,
    L: Serialize + Clone,
{
    write_json(&mut io::stdout().lock(), results)
}
