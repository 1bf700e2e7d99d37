//! Public types shared by the pool, the crawlers and the output layer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Data collection mode. Selects which schema a crawler reports hits with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Simple,
    Extended,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Simple => "simple",
            Mode::Extended => "extended",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "s" | "simple" => Ok(Mode::Simple),
            "e" | "extended" => Ok(Mode::Extended),
            other => Err(format!("unknown crawl mode '{other}'")),
        }
    }
}

/// Value type of one schema column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Str,
    Int,
    Float,
}

/// One column of a hits/links schema: `(name, type, unit)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
    pub unit: Option<&'static str>,
}

impl Field {
    pub const fn new(name: &'static str, kind: FieldKind, unit: Option<&'static str>) -> Self {
        Self { name, kind, unit }
    }
}

/// Ordered list of columns describing hits or links.
pub type Schema = Vec<Field>;

/// Lifecycle state of a worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    /// Blocked on wake, idle signal set
    Idle,
    /// Processing or refilling
    Awake,
    /// Blocked on resume, idle signal set
    Paused,
    /// Terminal
    Stopped,
}

impl WorkerState {
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            WorkerState::Idle => 0,
            WorkerState::Awake => 1,
            WorkerState::Paused => 2,
            WorkerState::Stopped => 3,
        }
    }

    pub(crate) fn from_u8(v: u8) -> Self {
        match v {
            0 => WorkerState::Idle,
            1 => WorkerState::Awake,
            2 => WorkerState::Paused,
            _ => WorkerState::Stopped,
        }
    }
}

/// Outcome of one crawl step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visit {
    /// The job was expanded and recorded in `links_followed`
    Followed,
    /// The job failed and was recorded in `links_skipped`
    Skipped,
}
