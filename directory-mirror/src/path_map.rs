//! Mapping between source and target paths.

use std::path::{Path, PathBuf};

use crate::error::{MirrorError, Result};

/// Maps paths under the source root to the same relative location under the
/// target root, and back.
///
/// Inputs must lie under the root they are mapped from. A path outside it is
/// a caller bug and is reported as [`MirrorError::OutsideRoot`]; it is never
/// mapped to a guessed location. `..` segments are not normalized.
#[derive(Debug, Clone)]
pub struct PathMapper {
    source_root: PathBuf,
    target_root: PathBuf,
}

impl PathMapper {
    /// Create a mapper for a pair of roots.
    pub fn new(source_root: impl Into<PathBuf>, target_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            target_root: target_root.into(),
        }
    }

    /// The source root.
    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    /// The target root.
    pub fn target_root(&self) -> &Path {
        &self.target_root
    }

    /// The part of `path` below the source root.
    pub fn relative<'a>(&self, path: &'a Path) -> Result<&'a Path> {
        strip_root(&self.source_root, path)
    }

    /// Map a source path to its target path.
    pub fn to_target(&self, path: &Path) -> Result<PathBuf> {
        to_target(&self.source_root, &self.target_root, path)
    }

    /// Map a target path back to its source path.
    pub fn to_source(&self, path: &Path) -> Result<PathBuf> {
        to_target(&self.target_root, &self.source_root, path)
    }
}

/// Map `path` under `source_root` to the same relative location under
/// `target_root`.
pub fn to_target(source_root: &Path, target_root: &Path, path: &Path) -> Result<PathBuf> {
    let relative = strip_root(source_root, path)?;
    Ok(target_root.join(relative))
}

fn strip_root<'a>(root: &Path, path: &'a Path) -> Result<&'a Path> {
    // strip_prefix compares whole components, so `/a/bc` is not under `/a/b`.
    path.strip_prefix(root)
        .map_err(|_| MirrorError::OutsideRoot {
            path: path.to_path_buf(),
            root: root.to_path_buf(),
        })
}
