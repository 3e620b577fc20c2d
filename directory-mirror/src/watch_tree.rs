//! Native watches for one pattern, feeding a single-consumer worker.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{MirrorConfig, WatchStrategy};
use crate::error::{MirrorError, Result};
use crate::event::ChangeEvent;
use crate::filter::{Filter, WatchPattern};
use crate::handler::{EventHandler, MirrorStats};
use crate::tree::{self, WatchNode};

/// Everything installed for one watch pattern: the OS watches, the bounded
/// event queue and the worker draining it.
///
/// Events of one tree are handled one at a time, in the order the OS
/// reported them. Separate trees run independently.
pub struct WatchTree {
    /// Pattern this tree is restricted to.
    pattern: WatchPattern,

    /// Directories with a live watch.
    nodes: Vec<WatchNode>,

    /// Internal notify watcher. Dropping it releases every OS handle.
    watcher: Option<RecommendedWatcher>,

    /// Worker consuming the event queue.
    worker: Option<JoinHandle<()>>,

    /// Tells the worker to drain and exit.
    cancel: CancellationToken,
}

impl WatchTree {
    /// Install the watches for `pattern` below the source root and start the
    /// worker. Must be called from within a tokio runtime.
    pub fn start(
        config: Arc<MirrorConfig>,
        pattern: &str,
        stats: Arc<MirrorStats>,
    ) -> Result<Self> {
        let pattern = WatchPattern::new(pattern)?;
        let filter = Filter::from_config(&config);
        let planned = tree::plan(
            &config.source_root,
            pattern.as_str(),
            config.watch_strategy,
            &filter,
        );

        let (event_tx, event_rx) = mpsc::channel(config.queue_capacity);

        let source_root = config.source_root.clone();
        let callback_pattern = pattern.clone();
        let mut watcher = notify::recommended_watcher(
            move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    for change in ChangeEvent::from_notify(&event) {
                        if !accepts(&change, &callback_pattern, &filter, &source_root) {
                            continue;
                        }

                        // Blocks the notification thread while the queue is
                        // full, so events are never dropped.
                        if let Err(e) = enqueue(&event_tx, change) {
                            debug!("Dropping event after shutdown: {e}");
                            return;
                        }
                    }
                }
                Err(e) => {
                    error!("Watch error: {e}");
                }
            },
        )?;

        let mut nodes = Vec::with_capacity(planned.len());
        for node in planned {
            let mode = if node.recursive {
                RecursiveMode::Recursive
            } else {
                RecursiveMode::NonRecursive
            };
            // Only a failure on the root is fatal; a subdirectory that cannot
            // be watched is left out of the tree.
            if let Err(e) = watcher.watch(&node.directory, mode) {
                if node.directory == config.source_root {
                    return Err(e.into());
                }
                warn!("Failed to watch {}: {e}", node.directory.display());
                continue;
            }
            info!(
                "Created watcher for {} '{}'",
                node.pattern,
                node.directory.display()
            );
            nodes.push(node);
        }

        let cancel = CancellationToken::new();
        let handler = EventHandler::new(&config, stats);
        let worker = tokio::spawn(run_worker(
            handler,
            event_rx,
            cancel.clone(),
            config.source_root.clone(),
            config.watch_strategy,
        ));

        Ok(Self {
            pattern,
            nodes,
            watcher: Some(watcher),
            worker: Some(worker),
            cancel,
        })
    }

    /// Release the OS watches, let the worker finish what is already queued
    /// and wait for it to exit.
    pub async fn stop(&mut self) {
        self.watcher = None;
        self.cancel.cancel();

        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.await {
                warn!("Worker for {} ended abnormally: {e}", self.pattern);
            }
            info!("Stopped watching {}", self.pattern);
        }
    }

    /// The pattern this tree is restricted to.
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Directories with a live watch.
    pub fn nodes(&self) -> &[WatchNode] {
        &self.nodes
    }

    /// Whether the watches are still installed.
    pub fn is_running(&self) -> bool {
        self.watcher.is_some()
    }
}

impl Drop for WatchTree {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Whether a change below the source root should be queued for this tree.
fn accepts(
    change: &ChangeEvent,
    pattern: &WatchPattern,
    filter: &Filter,
    source_root: &Path,
) -> bool {
    if !pattern.matches(&change.path) {
        return false;
    }

    match change.path.strip_prefix(source_root) {
        Ok(relative) => !filter.is_path_blacklisted(relative),
        Err(_) => {
            debug!("Ignoring event outside source root: {}", change.path.display());
            false
        }
    }
}

fn enqueue(event_tx: &mpsc::Sender<ChangeEvent>, change: ChangeEvent) -> Result<()> {
    event_tx
        .blocking_send(change)
        .map_err(|_| MirrorError::ChannelSend)
}

async fn run_worker(
    handler: EventHandler,
    mut event_rx: mpsc::Receiver<ChangeEvent>,
    cancel: CancellationToken,
    source_root: PathBuf,
    strategy: WatchStrategy,
) {
    let watch_root = |path: &Path| -> PathBuf {
        match strategy {
            WatchStrategy::Recursive => source_root.clone(),
            WatchStrategy::PerDirectory => path
                .parent()
                .map_or_else(|| source_root.clone(), Path::to_path_buf),
        }
    };

    loop {
        tokio::select! {
            maybe_event = event_rx.recv() => match maybe_event {
                Some(event) => {
                    handler.handle(&event, &watch_root(&event.path)).await;
                }
                None => break,
            },
            () = cancel.cancelled() => {
                event_rx.close();
                while let Some(event) = event_rx.recv().await {
                    handler.handle(&event, &watch_root(&event.path)).await;
                }
                break;
            }
        }
    }

    debug!("Event worker exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use crate::event::ChangeKind;

    #[test]
    fn test_accepts_filters_pattern_and_blacklisted_directories() {
        let root = Path::new("/repo/src/A");
        let pattern = WatchPattern::new("*.json").unwrap();
        let filter = Filter::new(["node_modules", "bin", "obj"], [".tmp"]);

        let accepted = |path: &str| {
            accepts(
                &ChangeEvent::new(ChangeKind::Created, path),
                &pattern,
                &filter,
                root,
            )
        };

        assert!(accepted("/repo/src/A/config.json"));
        assert!(accepted("/repo/src/A/views/x.json"));
        assert!(!accepted("/repo/src/A/readme.md"));
        assert!(!accepted("/repo/src/A/node_modules/x.json"));
        assert!(!accepted("/repo/src/A/lib/OBJ/x.json"));
        assert!(!accepted("/elsewhere/x.json"));
    }

    #[tokio::test]
    async fn test_start_and_stop() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("A");
        let target = temp_dir.path().join("B");
        std::fs::create_dir_all(source.join("views")).unwrap();
        std::fs::create_dir_all(source.join("node_modules")).unwrap();
        std::fs::create_dir(&target).unwrap();

        let config = Arc::new(
            MirrorConfig::new(&source, &target)
                .with_pattern("*.json")
                .with_strategy(WatchStrategy::PerDirectory),
        );
        let mut tree =
            WatchTree::start(config, "*.json", Arc::new(MirrorStats::default())).unwrap();

        assert!(tree.is_running());
        assert_eq!(tree.pattern(), "*.json");
        assert_eq!(tree.nodes().len(), 2);

        tree.stop().await;
        assert!(!tree.is_running());
    }

    #[tokio::test]
    async fn test_worker_drains_queue_on_cancel() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("A");
        let target = temp_dir.path().join("B");
        std::fs::create_dir(&source).unwrap();
        std::fs::create_dir(&target).unwrap();
        std::fs::write(source.join("a.json"), b"a").unwrap();
        std::fs::write(source.join("b.json"), b"b").unwrap();

        let config = MirrorConfig::new(&source, &target).with_pattern("*.json");
        let stats = Arc::new(MirrorStats::default());
        let handler = EventHandler::new(&config, stats.clone());

        let (event_tx, event_rx) = mpsc::channel(8);
        event_tx
            .send(ChangeEvent::new(ChangeKind::Created, source.join("a.json")))
            .await
            .unwrap();
        event_tx
            .send(ChangeEvent::new(ChangeKind::Modified, source.join("b.json")))
            .await
            .unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        run_worker(handler, event_rx, cancel, source.clone(), WatchStrategy::Recursive).await;

        assert_eq!(std::fs::read(target.join("a.json")).unwrap(), b"a");
        assert_eq!(std::fs::read(target.join("b.json")).unwrap(), b"b");
        assert_eq!(stats.snapshot().copied, 2);
    }
}
