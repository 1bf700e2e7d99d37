//! Filesystem crawler: every directory is a link, every regular file is a hit candidate.
//!
//! Entries are classified without following symlinks. Anything that is neither a regular
//! file nor a directory (symlinks, sockets, FIFOs) is recorded as skipped.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;

use crate::error::{CrawlError, PoolError};
use crate::transform::Pipeline;
use crate::types::{Field, FieldKind, Mode, Schema};

use super::Crawler;

pub struct Headers;

impl Headers {
    pub const PATH: &'static str = "Path";
    pub const NAME: &'static str = "Name";
    pub const SIZE: &'static str = "Size";
    pub const MODIFIED: &'static str = "Modified";
    pub const ACCESSED: &'static str = "Accessed";
}

/// Arguments for [`FsCrawler`].
#[derive(Clone, Debug, Default)]
pub struct FsArgs {
    /// Directories deeper than this are not followed. `None` = unlimited.
    pub max_depth: Option<usize>,
    /// Regex matched against file names. `None` = every file is a hit.
    pub pattern: Option<String>,
}

impl FsArgs {
    pub fn search(pattern: impl Into<String>) -> Self {
        Self {
            pattern: Some(pattern.into()),
            ..Self::default()
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }
}

/// One discovered file. `size`/`modified`/`accessed` are only filled in extended mode.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FsHit {
    pub path: PathBuf,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accessed: Option<f64>,
}

impl fmt::Display for FsHit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Contents of one directory, split by kind.
#[derive(Debug, Default)]
pub struct Listing {
    pub dirs: Vec<PathBuf>,
    pub files: Vec<(String, PathBuf)>,
    pub other: Vec<PathBuf>,
}

pub struct FsCrawler {
    mode: Mode,
    max_depth: Option<usize>,
    pattern: Option<Regex>,
}

/// Depth of a directory: number of normal components in its path.
pub fn path_depth(path: &Path) -> usize {
    path.components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .count()
}

fn secs_since_epoch(t: std::io::Result<std::time::SystemTime>) -> Option<f64> {
    t.ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs_f64())
}

impl FsCrawler {
    fn build_hit(&self, name: &str, path: &Path) -> Option<FsHit> {
        let mut hit = FsHit {
            path: path.to_path_buf(),
            name: name.to_string(),
            size: None,
            modified: None,
            accessed: None,
        };
        if self.mode == Mode::Extended {
            // The file may be gone by now (e.g. /proc entries); drop it
            let meta = fs::metadata(path).ok()?;
            hit.size = Some(meta.len());
            hit.modified = secs_since_epoch(meta.modified());
            hit.accessed = secs_since_epoch(meta.accessed());
        }
        Some(hit)
    }
}

impl Crawler for FsCrawler {
    type Link = PathBuf;
    type Hit = FsHit;
    type Artifact = PathBuf;
    type Metadata = Listing;
    type Args = FsArgs;

    fn new(mode: Mode, args: &FsArgs) -> Result<Self, PoolError> {
        let pattern = args
            .pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| PoolError::Config(format!("invalid search pattern: {e}")))?;
        Ok(Self {
            mode,
            max_depth: args.max_depth,
            pattern,
        })
    }

    fn crawl_modes() -> &'static [Mode] {
        &[Mode::Simple, Mode::Extended]
    }

    fn hits_header(mode: Mode) -> Schema {
        let mut header = vec![
            Field::new(Headers::PATH, FieldKind::Str, None),
            Field::new(Headers::NAME, FieldKind::Str, None),
        ];
        if mode == Mode::Extended {
            header.extend([
                Field::new(Headers::SIZE, FieldKind::Int, Some("byte")),
                Field::new(Headers::MODIFIED, FieldKind::Float, Some("timestamp")),
                Field::new(Headers::ACCESSED, FieldKind::Float, Some("timestamp")),
            ]);
        }
        header
    }

    fn links_header(_mode: Mode) -> Schema {
        vec![Field::new(Headers::PATH, FieldKind::Str, None)]
    }

    fn init_entrypoint(&mut self, entrypoint: &PathBuf) -> Result<Listing, CrawlError> {
        let inaccessible = |source| CrawlError::Inaccessible {
            entrypoint: entrypoint.display().to_string(),
            source,
        };
        let mut listing = Listing::default();
        for entry in fs::read_dir(entrypoint).map_err(inaccessible)? {
            let entry = entry.map_err(inaccessible)?;
            let file_type = entry.file_type().map_err(inaccessible)?;
            let path = entry.path();
            if file_type.is_file() {
                let name = entry.file_name().to_string_lossy().into_owned();
                listing.files.push((name, path));
            } else if file_type.is_dir() {
                listing.dirs.push(path);
            } else {
                listing.other.push(path);
            }
        }
        Ok(listing)
    }

    fn extract_hits(
        &mut self,
        _entrypoint: &PathBuf,
        listing: &Listing,
        pipeline: &Pipeline<PathBuf>,
    ) -> Vec<FsHit> {
        let mut hits = Vec::new();
        for (name, path) in &listing.files {
            if !self.is_hit(path) {
                continue;
            }
            let Some(mut hit) = self.build_hit(name, path) else {
                continue;
            };
            // A failed transform drops this hit only
            let Some(out) = pipeline.run(path.clone()) else {
                continue;
            };
            hit.path = out;
            hits.push(hit);
        }
        hits
    }

    fn extract_links(&mut self, entrypoint: &PathBuf, listing: &Listing) -> Vec<PathBuf> {
        listing
            .dirs
            .iter()
            .filter(|d| self.is_link(entrypoint, d))
            .cloned()
            .collect()
    }

    fn extract_skipped(&mut self, listing: &Listing) -> Vec<PathBuf> {
        listing.other.clone()
    }

    fn is_hit(&self, item: &PathBuf) -> bool {
        match (&self.pattern, item.file_name()) {
            (None, _) => true,
            (Some(re), Some(name)) => re.is_match(&name.to_string_lossy()),
            (Some(_), None) => false,
        }
    }

    fn is_link(&self, entrypoint: &PathBuf, _item: &PathBuf) -> bool {
        match self.max_depth {
            None => true,
            Some(max) => path_depth(entrypoint) < max,
        }
    }
}
