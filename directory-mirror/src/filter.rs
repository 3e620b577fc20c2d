//! Blacklist and pattern filtering.

use std::collections::HashSet;
use std::path::{Component, Path};

use glob::{MatchOptions, Pattern};

use crate::config::{MirrorConfig, normalize_extension};
use crate::error::{MirrorError, Result};

/// Decides which directories and files are excluded from mirroring.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    /// Lower-cased blacklisted directory names.
    dir_names: HashSet<String>,

    /// Lower-cased blacklisted extensions, each with a leading dot.
    extensions: HashSet<String>,
}

impl Filter {
    /// Create a filter from directory names and extensions.
    pub fn new<D, E>(dir_names: D, extensions: E) -> Self
    where
        D: IntoIterator,
        D::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        Self {
            dir_names: dir_names
                .into_iter()
                .map(|name| name.as_ref().to_lowercase())
                .collect(),
            extensions: extensions
                .into_iter()
                .map(|ext| normalize_extension(ext.as_ref()).to_lowercase())
                .collect(),
        }
    }

    /// Create a filter from the blacklists of a mirror config.
    pub fn from_config(config: &MirrorConfig) -> Self {
        Self::new(&config.blacklisted_dir_names, &config.blacklisted_extensions)
    }

    /// Check whether a directory name is blacklisted.
    pub fn is_directory_blacklisted(&self, name: &str) -> bool {
        self.dir_names.contains(&name.to_lowercase())
    }

    /// Check whether the extension of `path` is blacklisted.
    pub fn is_extension_blacklisted(&self, path: &Path) -> bool {
        match extension_of(path) {
            Some(ext) => self.extensions.contains(&ext.to_lowercase()),
            None => false,
        }
    }

    /// Check whether any directory component of `relative` is blacklisted.
    ///
    /// `relative` is a path below the source root. Its last component is the
    /// file name and is not treated as a directory.
    pub fn is_path_blacklisted(&self, relative: &Path) -> bool {
        let Some(parent) = relative.parent() else {
            return false;
        };

        parent.components().any(|component| match component {
            Component::Normal(name) => self.is_directory_blacklisted(&name.to_string_lossy()),
            _ => false,
        })
    }
}

/// The extension of the file name in `path`, including the leading dot.
///
/// `data.tmp` yields `.tmp`, a dotfile such as `.tmp` yields `.tmp`, and a
/// name ending in a dot has no extension.
pub fn extension_of(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_string_lossy();
    let dot = name.rfind('.')?;
    if dot + 1 == name.len() {
        return None;
    }
    Some(name[dot..].to_string())
}

/// A compiled glob matched against file names.
#[derive(Debug, Clone)]
pub struct WatchPattern {
    raw: String,
    glob: Pattern,
}

impl WatchPattern {
    /// Compile a file name glob such as `*.json`.
    pub fn new(pattern: &str) -> Result<Self> {
        if pattern.contains('/') || pattern.contains('\\') {
            return Err(MirrorError::InvalidPattern {
                pattern: pattern.to_string(),
                message: "patterns match file names and cannot contain separators".to_string(),
            });
        }

        let glob = Pattern::new(pattern).map_err(|e| MirrorError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.msg.to_string(),
        })?;

        Ok(Self {
            raw: pattern.to_string(),
            glob,
        })
    }

    /// Check whether the file name of `path` matches.
    pub fn matches(&self, path: &Path) -> bool {
        let Some(name) = path.file_name() else {
            return false;
        };

        let options = MatchOptions {
            case_sensitive: !cfg!(windows),
            require_literal_separator: false,
            require_literal_leading_dot: false,
        };

        self.glob.matches_with(&name.to_string_lossy(), options)
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl std::fmt::Display for WatchPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn default_filter() -> Filter {
        Filter::new(["node_modules", "bin", "obj"], [".tmp"])
    }

    #[test]
    fn test_directory_blacklist_is_case_insensitive() {
        let filter = default_filter();

        assert!(filter.is_directory_blacklisted("node_modules"));
        assert!(filter.is_directory_blacklisted("BIN"));
        assert!(filter.is_directory_blacklisted("Obj"));
    }

    #[test]
    fn test_directory_blacklist_is_exact_match() {
        let filter = default_filter();

        assert!(!filter.is_directory_blacklisted("binaries"));
        assert!(!filter.is_directory_blacklisted("my_node_modules"));
        assert!(!filter.is_directory_blacklisted("ob"));
    }

    #[test]
    fn test_extension_blacklist() {
        let filter = default_filter();

        assert!(filter.is_extension_blacklisted(Path::new("/repo/src/A/data.tmp")));
        assert!(filter.is_extension_blacklisted(Path::new("/repo/src/A/DATA.TMP")));
        assert!(filter.is_extension_blacklisted(Path::new("/repo/src/A/.tmp")));
        assert!(!filter.is_extension_blacklisted(Path::new("/repo/src/A/data.tmpx")));
        assert!(!filter.is_extension_blacklisted(Path::new("/repo/src/A/tmp")));
        assert!(!filter.is_extension_blacklisted(Path::new("/repo/src/A/config.json")));
    }

    #[test]
    fn test_extension_without_dot_is_normalized() {
        let filter = Filter::new(Vec::<String>::new(), ["bak"]);
        assert!(filter.is_extension_blacklisted(Path::new("notes.bak")));
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of(Path::new("a/b.json")), Some(".json".to_string()));
        assert_eq!(extension_of(Path::new("a/archive.tar.gz")), Some(".gz".to_string()));
        assert_eq!(extension_of(Path::new("a/trailing.")), None);
        assert_eq!(extension_of(Path::new("a/README")), None);
    }

    #[test]
    fn test_path_blacklist_checks_directories_only() {
        let filter = default_filter();

        assert!(filter.is_path_blacklisted(Path::new("node_modules/x.json")));
        assert!(filter.is_path_blacklisted(Path::new("lib/Bin/Debug/x.json")));
        assert!(!filter.is_path_blacklisted(Path::new("lib/x.json")));
        assert!(!filter.is_path_blacklisted(Path::new("bin")));
        assert!(!filter.is_path_blacklisted(Path::new("x.json")));
    }

    #[test]
    fn test_watch_pattern_matches_file_name() {
        let pattern = WatchPattern::new("*.json").unwrap();

        assert!(pattern.matches(Path::new("/repo/src/A/config.json")));
        assert!(pattern.matches(Path::new("/repo/src/A/nested/deep/x.json")));
        assert!(!pattern.matches(Path::new("/repo/src/A/config.json.bak")));
        assert!(!pattern.matches(Path::new("/repo/src/A/readme.md")));
        assert_eq!(pattern.as_str(), "*.json");
    }

    #[test]
    fn test_watch_pattern_rejects_separators() {
        assert!(WatchPattern::new("sub/*.json").is_err());
        assert!(WatchPattern::new("[abc").is_err());
    }
}
