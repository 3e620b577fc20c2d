//! Planning which directories get a watch.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::WatchStrategy;
use crate::filter::Filter;

/// A directory bound to one watch pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchNode {
    /// Directory being watched.
    pub directory: PathBuf,

    /// File name pattern the watch is restricted to.
    pub pattern: String,

    /// Whether the watch covers the whole subtree.
    pub recursive: bool,
}

/// Work out the watch nodes for one pattern below `source_root`.
///
/// A blacklisted directory is never visited: no node is produced for it or
/// for anything below it. If `source_root` itself carries a blacklisted name
/// the plan is empty.
pub fn plan(
    source_root: &Path,
    pattern: &str,
    strategy: WatchStrategy,
    filter: &Filter,
) -> Vec<WatchNode> {
    if is_blacklisted_dir(source_root, filter) {
        warn!(
            "Source directory '{}' is black-listed, nothing to watch",
            source_root.display()
        );
        return Vec::new();
    }

    match strategy {
        WatchStrategy::Recursive => vec![WatchNode {
            directory: source_root.to_path_buf(),
            pattern: pattern.to_string(),
            recursive: true,
        }],
        WatchStrategy::PerDirectory => {
            let walker = WalkDir::new(source_root)
                .follow_links(false)
                .into_iter()
                .filter_entry(|entry| {
                    entry.depth() == 0
                        || !entry.file_type().is_dir()
                        || !is_blacklisted_dir(entry.path(), filter)
                });

            let mut nodes = Vec::new();
            for entry in walker {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!("Skipping unreadable entry below '{}': {e}", source_root.display());
                        continue;
                    }
                };

                if !entry.file_type().is_dir() {
                    continue;
                }

                debug!("Planned watch for {pattern} '{}'", entry.path().display());
                nodes.push(WatchNode {
                    directory: entry.into_path(),
                    pattern: pattern.to_string(),
                    recursive: false,
                });
            }
            nodes
        }
    }
}

fn is_blacklisted_dir(path: &Path, filter: &Filter) -> bool {
    path.file_name()
        .is_some_and(|name| filter.is_directory_blacklisted(&name.to_string_lossy()))
}
