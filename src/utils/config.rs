//! Application configuration constants.
//! Pool tuning and CLI defaults in one place.

use std::sync::OnceLock;
use std::time::Duration;

// ---- Package names (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    config_filename: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                config_filename: format!(".{pkg}.toml"),
            }
        })
    }

    /// Name of the optional settings file looked up in the working directory.
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }
}

// ---- Pool ----

/// Pool defaults and timing.
pub struct PoolConsts;

impl PoolConsts {
    pub const WORKER_COUNT: usize = 4;
    /// Soft cap of a worker's private buffer (and its flush interval).
    pub const BUFFER_SIZE: usize = 96;
    /// Timeout of every blocking wait in the pool. Upper bound on stop latency per job.
    pub const TICK: Duration = Duration::from_millis(50);
}
