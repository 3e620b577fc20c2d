//! Translating change events into mirror actions.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tracing::{debug, error, info};

use crate::config::MirrorConfig;
use crate::error::Result;
use crate::event::{ChangeEvent, ChangeKind};
use crate::filter::Filter;
use crate::mirror;
use crate::path_map::PathMapper;

/// What handling one event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The file was copied to this target path.
    Copied(PathBuf),

    /// This target path was removed.
    Deleted(PathBuf),

    /// The target path was already absent.
    AlreadyAbsent(PathBuf),

    /// The event was filtered out.
    Skipped,

    /// The mirror action failed. The error has been logged.
    Failed,
}

/// Applies change events from the source tree to the target tree.
#[derive(Debug, Clone)]
pub struct EventHandler {
    mapper: PathMapper,
    filter: Filter,
    stats: Arc<MirrorStats>,
}

impl EventHandler {
    /// Create a handler for the roots and blacklists of `config`.
    pub fn new(config: &MirrorConfig, stats: Arc<MirrorStats>) -> Self {
        Self {
            mapper: PathMapper::new(&config.source_root, &config.target_root),
            filter: Filter::from_config(config),
            stats,
        }
    }

    /// Handle one event reported by the watch on `watch_root`.
    ///
    /// Failures stop here: they are logged and counted, and the caller keeps
    /// processing later events.
    pub async fn handle(&self, event: &ChangeEvent, watch_root: &Path) -> Outcome {
        self.stats.received.fetch_add(1, Ordering::Relaxed);
        debug!(
            "Handling {} '{}' after {} ms in queue",
            event.kind.label(),
            event.path.display(),
            (Utc::now() - event.timestamp).num_milliseconds()
        );

        match self.try_handle(event, watch_root).await {
            Ok(outcome) => {
                self.stats.record(&outcome);
                outcome
            }
            Err(e) => {
                if event.kind.is_copy() {
                    error!(
                        "Could not copy {} file '{}'. {e}",
                        event.kind.label(),
                        event.path.display()
                    );
                } else {
                    error!("Could not delete file '{}'. {e}", event.path.display());
                }
                self.stats.record(&Outcome::Failed);
                Outcome::Failed
            }
        }
    }

    async fn try_handle(&self, event: &ChangeEvent, watch_root: &Path) -> Result<Outcome> {
        if self.filter.is_extension_blacklisted(&event.path) {
            return Ok(Outcome::Skipped);
        }

        let target = self.mapper.to_target(&event.path)?;

        match event.kind {
            ChangeKind::Created | ChangeKind::Modified | ChangeKind::Renamed => {
                if event.path.is_dir() {
                    debug!("Ignoring directory '{}'", event.path.display());
                    return Ok(Outcome::Skipped);
                }

                info!(
                    "File changed ({}), '{}' watcher '{}'",
                    event.kind,
                    event.path.display(),
                    watch_root.display()
                );
                info!("Copying file to '{}'", target.display());
                mirror::copy(&event.path, &target).await?;
                Ok(Outcome::Copied(target))
            }
            ChangeKind::Deleted => {
                if mirror::delete(&target).await? {
                    info!("Deleting file '{}'", target.display());
                    Ok(Outcome::Deleted(target))
                } else {
                    debug!("Nothing to delete at '{}'", target.display());
                    Ok(Outcome::AlreadyAbsent(target))
                }
            }
        }
    }
}

/// Counters shared by every watch tree of a mirror.
#[derive(Debug, Default)]
pub struct MirrorStats {
    received: AtomicU64,
    copied: AtomicU64,
    deleted: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
}

impl MirrorStats {
    fn record(&self, outcome: &Outcome) {
        let counter = match outcome {
            Outcome::Copied(_) => &self.copied,
            Outcome::Deleted(_) | Outcome::AlreadyAbsent(_) => &self.deleted,
            Outcome::Skipped => &self.skipped,
            Outcome::Failed => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time copy of the counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            copied: self.copied.load(Ordering::Relaxed),
            deleted: self.deleted.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Statistics about mirrored events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Events handed to a handler.
    pub received: u64,

    /// Successful copies.
    pub copied: u64,

    /// Delete events handled, whether or not a file was present.
    pub deleted: u64,

    /// Events filtered out.
    pub skipped: u64,

    /// Events whose mirror action failed.
    pub failed: u64,
}
