//! Lifetime management for all watch trees of a mirror.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::MirrorConfig;
use crate::error::{MirrorError, Result};
use crate::handler::{MirrorStats, StatsSnapshot};
use crate::watch_tree::WatchTree;

/// Owns one [`WatchTree`] per configured pattern and keeps them alive until
/// cancelled.
///
/// Failures while handling individual events never reach the supervisor;
/// only startup problems are returned as errors.
pub struct Supervisor {
    /// Shared, read-only configuration.
    config: Arc<MirrorConfig>,

    /// One tree per pattern while running.
    trees: Vec<WatchTree>,

    /// Counters shared by all trees.
    stats: Arc<MirrorStats>,
}

impl Supervisor {
    /// Create a supervisor for a validated configuration.
    pub fn new(config: MirrorConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config: Arc::new(config),
            trees: Vec::new(),
            stats: Arc::new(MirrorStats::default()),
        })
    }

    /// The configuration being mirrored.
    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// Check that the source and target roots exist.
    pub fn check_preconditions(&self) -> Result<()> {
        self.config.check_roots()
    }

    /// Install every watch tree.
    ///
    /// Nothing is installed when a root is missing. If installing a later
    /// tree fails, the trees already started are stopped again.
    pub async fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Err(MirrorError::AlreadyRunning(
                self.config.source_root.display().to_string(),
            ));
        }

        self.check_preconditions()?;

        let config = self.config.clone();
        for pattern in &config.patterns {
            match WatchTree::start(config.clone(), pattern, self.stats.clone()) {
                Ok(tree) => self.trees.push(tree),
                Err(e) => {
                    self.stop().await;
                    return Err(e);
                }
            }
        }

        info!(
            "Mirroring '{}' to '{}' ({} watches)",
            self.config.source_root.display(),
            self.config.target_root.display(),
            self.watch_count()
        );

        Ok(())
    }

    /// Start, then mirror until `cancel` fires, then stop.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<()> {
        self.start().await?;

        cancel.cancelled().await;
        info!("Shutdown requested");

        self.stop().await;
        Ok(())
    }

    /// Stop every watch tree. Safe to call when not running.
    pub async fn stop(&mut self) {
        for tree in &mut self.trees {
            tree.stop().await;
        }
        self.trees.clear();
    }

    /// Check if the watch trees are installed.
    pub fn is_running(&self) -> bool {
        !self.trees.is_empty()
    }

    /// Number of directories with a live watch, across all patterns.
    pub fn watch_count(&self) -> usize {
        self.trees.iter().map(|tree| tree.nodes().len()).sum()
    }

    /// Current event counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WatchStrategy;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn roots(temp_dir: &TempDir) -> (std::path::PathBuf, std::path::PathBuf) {
        let source = temp_dir.path().join("A");
        let target = temp_dir.path().join("B");
        std::fs::create_dir(&source).unwrap();
        std::fs::create_dir(&target).unwrap();
        (source, target)
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let temp_dir = TempDir::new().unwrap();
        let (source, target) = roots(&temp_dir);

        let result = Supervisor::new(MirrorConfig::new(source, target));
        assert!(matches!(result, Err(MirrorError::Config(_))));
    }

    #[tokio::test]
    async fn test_start_fails_before_watching_when_source_missing() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("B");
        std::fs::create_dir(&target).unwrap();

        let config =
            MirrorConfig::new(temp_dir.path().join("missing"), &target).with_pattern("*.json");
        let mut supervisor = Supervisor::new(config).unwrap();

        let err = supervisor.start().await.unwrap_err();
        assert!(matches!(err, MirrorError::SourceNotFound(_)));
        assert!(!supervisor.is_running());
        assert_eq!(supervisor.watch_count(), 0);
    }

    #[tokio::test]
    async fn test_one_tree_per_pattern() {
        let temp_dir = TempDir::new().unwrap();
        let (source, target) = roots(&temp_dir);
        std::fs::create_dir_all(source.join("views")).unwrap();
        std::fs::create_dir_all(source.join("obj")).unwrap();

        let config = MirrorConfig::new(&source, &target)
            .with_patterns(["*.json", "*.pdf"])
            .with_strategy(WatchStrategy::PerDirectory);
        let mut supervisor = Supervisor::new(config).unwrap();

        supervisor.start().await.unwrap();
        assert!(supervisor.is_running());
        // Root and views, for each of the two patterns.
        assert_eq!(supervisor.watch_count(), 4);

        assert!(matches!(
            supervisor.start().await,
            Err(MirrorError::AlreadyRunning(_))
        ));

        supervisor.stop().await;
        assert!(!supervisor.is_running());
        supervisor.stop().await;
    }

    #[tokio::test]
    async fn test_run_returns_after_cancel() {
        let temp_dir = TempDir::new().unwrap();
        let (source, target) = roots(&temp_dir);

        let config = MirrorConfig::new(&source, &target).with_pattern("*.json");
        let mut supervisor = Supervisor::new(config).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        supervisor.run(cancel).await.unwrap();

        assert!(!supervisor.is_running());
        assert_eq!(supervisor.stats(), StatsSnapshot::default());
    }
}
