//! Copy and delete against the target tree.

use std::io::ErrorKind;
use std::path::Path;

use tokio::fs;
use tracing::debug;

use crate::error::Result;

/// Copy `source` over `target`, creating or truncating it.
///
/// Fails if `source` no longer exists or the parent of `target` is missing.
/// Missing target directories are never created.
pub async fn copy(source: &Path, target: &Path) -> Result<()> {
    let bytes = fs::copy(source, target).await?;
    debug!("Copied {bytes} bytes to {}", target.display());
    Ok(())
}

/// Remove `target` if it exists.
///
/// Returns whether a file was removed. A missing target is not an error,
/// including one that disappears between the check and the removal.
pub async fn delete(target: &Path) -> Result<bool> {
    if !fs::try_exists(target).await? {
        return Ok(false);
    }

    match fs::remove_file(target).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
