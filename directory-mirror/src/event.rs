//! Change events produced from file system notifications.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use notify::EventKind;
use notify::event::{ModifyKind, RenameMode};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A change to a file below a watched directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// The kind of change.
    pub kind: ChangeKind,

    /// Full path of the affected file.
    pub path: PathBuf,

    /// When the notification was received.
    pub timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    /// Create a new change event.
    pub fn new(kind: ChangeKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            timestamp: Utc::now(),
        }
    }

    /// Translate a notify event into the changes that need mirroring.
    ///
    /// Metadata and access notifications carry no mirror action and yield
    /// nothing. For a rename reported with both paths only the new path is
    /// kept. Any other rename notification is resolved against the file
    /// system: a path that still exists is the new name and is copied, a path
    /// that is gone was moved away and is deleted.
    pub fn from_notify(event: &notify::Event) -> Vec<Self> {
        if event.need_rescan() {
            warn!(
                "Notifications were lost, changes below {:?} may not be mirrored",
                event.paths
            );
        }

        let all = |kind: ChangeKind| -> Vec<Self> {
            event.paths.iter().map(|p| Self::new(kind, p)).collect()
        };

        match event.kind {
            EventKind::Create(_) => all(ChangeKind::Created),
            EventKind::Modify(ModifyKind::Metadata(_)) => Vec::new(),
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => event
                .paths
                .get(1)
                .map(|to| vec![Self::new(ChangeKind::Renamed, to)])
                .unwrap_or_default(),
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => all(ChangeKind::Renamed),
            EventKind::Modify(ModifyKind::Name(_)) => event
                .paths
                .iter()
                .map(|p| {
                    let kind = if p.exists() {
                        ChangeKind::Renamed
                    } else {
                        ChangeKind::Deleted
                    };
                    Self::new(kind, p)
                })
                .collect(),
            EventKind::Modify(_) => all(ChangeKind::Modified),
            EventKind::Remove(_) => all(ChangeKind::Deleted),
            _ => Vec::new(),
        }
    }

    /// The path of the affected file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Kind of change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// File was created.
    Created,

    /// File contents changed.
    Modified,

    /// File was renamed; the event path is the new name.
    Renamed,

    /// File was deleted.
    Deleted,
}

impl ChangeKind {
    /// Whether this change is mirrored by copying the file.
    pub fn is_copy(self) -> bool {
        !matches!(self, Self::Deleted)
    }

    /// Lower-case label used in log lines.
    pub fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Renamed => "renamed",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "Created",
            Self::Modified => "Modified",
            Self::Renamed => "Renamed",
            Self::Deleted => "Deleted",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, Flag, MetadataKind, RemoveKind};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn kinds(event: notify::Event) -> Vec<(ChangeKind, PathBuf)> {
        ChangeEvent::from_notify(&event)
            .into_iter()
            .map(|e| (e.kind, e.path))
            .collect()
    }

    #[test]
    fn test_change_event_creation() {
        let event = ChangeEvent::new(ChangeKind::Created, "/test/file.json");
        assert_eq!(event.kind, ChangeKind::Created);
        assert_eq!(event.path(), Path::new("/test/file.json"));
    }

    #[test]
    fn test_create_modify_remove_translation() {
        let create =
            notify::Event::new(EventKind::Create(CreateKind::File)).add_path("/a/x.json".into());
        assert_eq!(kinds(create), vec![(ChangeKind::Created, "/a/x.json".into())]);

        let modify = notify::Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
            .add_path("/a/x.json".into());
        assert_eq!(kinds(modify), vec![(ChangeKind::Modified, "/a/x.json".into())]);

        let remove =
            notify::Event::new(EventKind::Remove(RemoveKind::File)).add_path("/a/x.json".into());
        assert_eq!(kinds(remove), vec![(ChangeKind::Deleted, "/a/x.json".into())]);
    }

    #[test]
    fn test_metadata_and_access_are_ignored() {
        let metadata =
            notify::Event::new(EventKind::Modify(ModifyKind::Metadata(MetadataKind::Any)))
                .add_path("/a/x.json".into());
        assert!(kinds(metadata).is_empty());

        let access =
            notify::Event::new(EventKind::Access(AccessKind::Any)).add_path("/a/x.json".into());
        assert!(kinds(access).is_empty());
    }

    #[test]
    fn test_rescan_notice_yields_nothing() {
        let rescan = notify::Event::new(EventKind::Other).set_flag(Flag::Rescan);
        assert!(rescan.need_rescan());
        assert!(kinds(rescan).is_empty());
    }

    #[test]
    fn test_rename_keeps_new_path() {
        let both = notify::Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path("/a/old.json".into())
            .add_path("/a/new.json".into());
        assert_eq!(kinds(both), vec![(ChangeKind::Renamed, "/a/new.json".into())]);

        let to = notify::Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::To)))
            .add_path("/a/new.json".into());
        assert_eq!(kinds(to), vec![(ChangeKind::Renamed, "/a/new.json".into())]);
    }

    #[test]
    fn test_undirected_rename_resolved_by_existence() {
        let temp_dir = TempDir::new().unwrap();
        let existing = temp_dir.path().join("new.json");
        std::fs::write(&existing, b"{}").unwrap();
        let gone = temp_dir.path().join("old.json");

        // Moved out of the tree: only the old name is reported.
        let from = notify::Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::From)))
            .add_path(gone.clone());
        assert_eq!(kinds(from), vec![(ChangeKind::Deleted, gone.clone())]);

        let any = notify::Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Any)))
            .add_path(existing.clone());
        assert_eq!(kinds(any), vec![(ChangeKind::Renamed, existing)]);

        let any_gone = notify::Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Any)))
            .add_path(gone.clone());
        assert_eq!(kinds(any_gone), vec![(ChangeKind::Deleted, gone)]);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ChangeKind::Modified.to_string(), "Modified");
        assert_eq!(ChangeKind::Renamed.label(), "renamed");
        assert!(ChangeKind::Created.is_copy());
        assert!(!ChangeKind::Deleted.is_copy());
    }
}
