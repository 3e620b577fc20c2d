//! # Directory Mirror
//!
//! This crate keeps a target directory tree in sync with a source tree by
//! reacting to file system notifications. Files matching the configured
//! patterns are copied on create, change and rename, and removed from the
//! target when deleted from the source.
//!
//! ## Features
//!
//! - **Real-time Mirroring**: One watch tree per file name pattern
//! - **Blacklists**: Directory names and file extensions that are never mirrored
//! - **Ordered Handling**: A bounded queue and single worker per pattern
//! - **Graceful Shutdown**: Watches end when a cancellation token fires
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Directory Mirror                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  MirrorConfig ──► Supervisor ──► WatchTree (per pattern)        │
//! │                                      │                          │
//! │                       notify ──► queue ──► EventHandler         │
//! │                                              │                  │
//! │                              Filter ──► PathMapper ──► mirror   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use directory_mirror::{MirrorConfig, Supervisor};
//! use tokio_util::sync::CancellationToken;
//!
//! let config = MirrorConfig::new("/repo/src/A", "/repo/src/B").with_pattern("*.json");
//! let mut supervisor = Supervisor::new(config)?;
//! supervisor.run(CancellationToken::new()).await?;
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod filter;
pub mod handler;
pub mod mirror;
pub mod path_map;
pub mod supervisor;
pub mod tree;
pub mod watch_tree;

pub use config::{MirrorConfig, WatchStrategy};
pub use error::{MirrorError, Result};
pub use event::{ChangeEvent, ChangeKind};
pub use filter::{Filter, WatchPattern};
pub use handler::{EventHandler, MirrorStats, Outcome, StatsSnapshot};
pub use path_map::PathMapper;
pub use supervisor::Supervisor;
pub use tree::WatchNode;
pub use watch_tree::WatchTree;
