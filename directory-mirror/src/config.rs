//! Configuration types for directory mirroring.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MirrorError, Result};
use crate::filter::WatchPattern;

/// Directory names that are never mirrored unless the caller removes them.
pub const DEFAULT_BLACKLISTED_DIRS: [&str; 3] = ["node_modules", "bin", "obj"];

/// File extensions that are never mirrored.
pub const DEFAULT_BLACKLISTED_EXTENSIONS: [&str; 1] = [".tmp"];

/// Default bound of each watch tree's event queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Configuration for mirroring one source tree into one target tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Absolute path of the directory being watched.
    pub source_root: PathBuf,

    /// Absolute path of the directory receiving copies.
    pub target_root: PathBuf,

    /// File name globs, one watch tree each (e.g. `*.json`).
    pub patterns: Vec<String>,

    /// Directory names excluded from watching (case-insensitive).
    pub blacklisted_dir_names: Vec<String>,

    /// File extensions excluded from mirroring, with leading dot (case-insensitive).
    pub blacklisted_extensions: Vec<String>,

    /// How watches are installed below the source root.
    pub watch_strategy: WatchStrategy,

    /// Maximum number of queued events per watch tree.
    pub queue_capacity: usize,
}

impl MirrorConfig {
    /// Create a new mirror config with the default blacklists and no patterns.
    pub fn new(source_root: impl Into<PathBuf>, target_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            target_root: target_root.into(),
            patterns: Vec::new(),
            blacklisted_dir_names: DEFAULT_BLACKLISTED_DIRS
                .iter()
                .map(ToString::to_string)
                .collect(),
            blacklisted_extensions: DEFAULT_BLACKLISTED_EXTENSIONS
                .iter()
                .map(ToString::to_string)
                .collect(),
            watch_strategy: WatchStrategy::default(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    /// Add a watch pattern. Repeated patterns are ignored.
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        if !self.patterns.contains(&pattern) {
            self.patterns.push(pattern);
        }
        self
    }

    /// Add several watch patterns, keeping their order.
    pub fn with_patterns<I, S>(self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        patterns
            .into_iter()
            .fold(self, |config, pattern| config.with_pattern(pattern))
    }

    /// Append a blacklisted directory name.
    pub fn blacklist_dir(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !contains_ignore_case(&self.blacklisted_dir_names, &name) {
            self.blacklisted_dir_names.push(name);
        }
        self
    }

    /// Append a blacklisted extension. A missing leading dot is added.
    pub fn blacklist_extension(mut self, extension: impl Into<String>) -> Self {
        let extension = normalize_extension(&extension.into());
        if !contains_ignore_case(&self.blacklisted_extensions, &extension) {
            self.blacklisted_extensions.push(extension);
        }
        self
    }

    /// Set the watch strategy.
    pub fn with_strategy(mut self, strategy: WatchStrategy) -> Self {
        self.watch_strategy = strategy;
        self
    }

    /// Set the per-tree queue capacity.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Check that the configuration can be used to start watching.
    ///
    /// This does not touch the filesystem; missing roots are reported by
    /// [`MirrorConfig::check_roots`].
    pub fn validate(&self) -> Result<()> {
        if self.patterns.is_empty() {
            return Err(MirrorError::Config(
                "at least one watch pattern is required".to_string(),
            ));
        }

        for pattern in &self.patterns {
            WatchPattern::new(pattern)?;
        }

        require_absolute("source", &self.source_root)?;
        require_absolute("target", &self.target_root)?;

        if self.queue_capacity == 0 {
            return Err(MirrorError::Config(
                "queue capacity must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Check that both roots exist and are directories.
    pub fn check_roots(&self) -> Result<()> {
        if !self.source_root.is_dir() {
            return Err(MirrorError::SourceNotFound(
                self.source_root.display().to_string(),
            ));
        }

        if !self.target_root.is_dir() {
            return Err(MirrorError::TargetNotFound(
                self.target_root.display().to_string(),
            ));
        }

        Ok(())
    }
}

/// How watches are installed below the source root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchStrategy {
    /// One recursive watch on the source root. Directories created after
    /// startup are covered; blacklisting is applied per event.
    #[default]
    Recursive,

    /// One non-recursive watch per non-blacklisted directory, discovered once
    /// at startup. Directories created later are not watched.
    PerDirectory,
}

/// Add a leading dot to an extension if it lacks one.
pub fn normalize_extension(extension: &str) -> String {
    if extension.starts_with('.') {
        extension.to_string()
    } else {
        format!(".{extension}")
    }
}

fn contains_ignore_case(items: &[String], value: &str) -> bool {
    let value = value.to_lowercase();
    items.iter().any(|item| item.to_lowercase() == value)
}

fn require_absolute(which: &str, path: &Path) -> Result<()> {
    if path.is_absolute() {
        Ok(())
    } else {
        Err(MirrorError::Config(format!(
            "{which} directory must be an absolute path: {}",
            path.display()
        )))
    }
}
