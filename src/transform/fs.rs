//! Filesystem transforms: copy, move and remove hit files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::TransformError;

use super::Transform;

/// Create `dir` (and parents) when missing.
fn ensure_target_dir(stage: &'static str, dir: &Path) -> Result<PathBuf, TransformError> {
    if !dir.is_dir() {
        fs::create_dir_all(dir).map_err(|e| TransformError::io(stage, e))?;
    }
    Ok(dir.to_path_buf())
}

fn target_for(
    stage: &'static str,
    target_dir: &Path,
    src: &Path,
) -> Result<PathBuf, TransformError> {
    let name = src.file_name().ok_or_else(|| TransformError::Rejected {
        stage,
        reason: format!("'{}' has no file name", src.display()),
    })?;
    Ok(target_dir.join(name))
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Copy the file into `target_dir`; yields the new path.
pub struct CopyTo {
    target_dir: PathBuf,
}

impl CopyTo {
    pub fn new(target_dir: impl AsRef<Path>) -> Result<Self, TransformError> {
        Ok(Self {
            target_dir: ensure_target_dir("copy", target_dir.as_ref())?,
        })
    }
}

impl Transform<PathBuf> for CopyTo {
    fn name(&self) -> &'static str {
        "copy"
    }

    fn apply(&self, src: PathBuf) -> Result<PathBuf, TransformError> {
        let dst = target_for(self.name(), &self.target_dir, &src)?;
        // Copying a file onto itself is a valid outcome, not an error
        if same_file(&src, &dst) {
            return Ok(dst);
        }
        fs::copy(&src, &dst).map_err(|e| TransformError::io(self.name(), e))?;
        Ok(dst)
    }
}

/// Move the file into `target_dir`; yields the new path.
pub struct MoveTo {
    target_dir: PathBuf,
}

impl MoveTo {
    pub fn new(target_dir: impl AsRef<Path>) -> Result<Self, TransformError> {
        Ok(Self {
            target_dir: ensure_target_dir("move", target_dir.as_ref())?,
        })
    }
}

impl Transform<PathBuf> for MoveTo {
    fn name(&self) -> &'static str {
        "move"
    }

    fn apply(&self, src: PathBuf) -> Result<PathBuf, TransformError> {
        let dst = target_for(self.name(), &self.target_dir, &src)?;
        match fs::rename(&src, &dst) {
            Ok(()) => Ok(dst),
            // rename cannot cross filesystems
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                fs::copy(&src, &dst).map_err(|e| TransformError::io(self.name(), e))?;
                fs::remove_file(&src).map_err(|e| TransformError::io(self.name(), e))?;
                Ok(dst)
            }
            Err(e) => Err(TransformError::io(self.name(), e)),
        }
    }
}

/// Delete the file; yields the path it had.
pub struct Remove;

impl Transform<PathBuf> for Remove {
    fn name(&self) -> &'static str {
        "remove"
    }

    fn apply(&self, src: PathBuf) -> Result<PathBuf, TransformError> {
        fs::remove_file(&src).map_err(|e| TransformError::io(self.name(), e))?;
        Ok(src)
    }
}
