//! Load `.crawlpool.toml` from a directory (CLI only). The library takes its settings
//! through `PoolConfig` and `FsArgs`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::engine::RunOpts;
use crate::output::OutputFormat;
use crate::types::Mode;
use crate::utils::config::PackagePaths;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CrawlpoolToml {
    #[serde(default)]
    settings: SettingsSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsSection {
    workers: Option<usize>,
    buffer_size: Option<usize>,
    mode: Option<Mode>,
    max_depth: Option<usize>,
    pattern: Option<String>,
    output: Option<Vec<OutputFormat>>,
    verbose: Option<bool>,
}

/// Load the settings file from `dir`. `Ok(None)` when there is no file.
pub(crate) fn load_crawlpool_toml(dir: &Path) -> Result<Option<CrawlpoolToml>> {
    let path = dir.join(PackagePaths::get().config_filename());
    if !path.is_file() {
        return Ok(None);
    }
    let s = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file = parse_crawlpool_toml(&s).with_context(|| format!("{}: ignored", path.display()))?;
    Ok(Some(file))
}

pub(crate) fn parse_crawlpool_toml(s: &str) -> Result<CrawlpoolToml, toml::de::Error> {
    toml::from_str(s)
}

/// Overwrite an opts field from the file when present.
macro_rules! apply_file_opt {
    ($file:expr, $opts:expr, $file_field:ident => $opts_field:ident) => {
        if let Some(v) = $file.$file_field.clone() {
            $opts.$opts_field = v;
        }
    };
}

/// Apply file settings to opts. Call before applying CLI flags so the CLI wins.
pub(crate) fn apply_file_to_opts(file: &CrawlpoolToml, opts: &mut RunOpts) {
    let s = &file.settings;
    apply_file_opt!(s, opts, workers => workers);
    apply_file_opt!(s, opts, buffer_size => buffer_size);
    apply_file_opt!(s, opts, mode => mode);
    apply_file_opt!(s, opts, output => output);
    apply_file_opt!(s, opts, verbose => verbose);
    if let Some(depth) = s.max_depth {
        opts.max_depth = Some(depth);
    }
    if let Some(ref pattern) = s.pattern {
        opts.pattern = Some(pattern.clone());
    }
}
