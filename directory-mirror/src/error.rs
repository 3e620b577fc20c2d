//! Error types for the directory mirror.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for mirror operations.
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Errors that can occur while mirroring a directory tree.
#[derive(Error, Debug)]
pub enum MirrorError {
    /// Source root missing at startup.
    #[error("Source directory '{0}' does not exist")]
    SourceNotFound(String),

    /// Target root missing at startup.
    #[error("Target directory '{0}' does not exist")]
    TargetNotFound(String),

    /// Path is not below the root it is being mapped from.
    #[error("path '{path}' is not under root '{root}'")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    /// Invalid watch pattern.
    #[error("invalid watch pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// Supervisor already started.
    #[error("mirror already running for: {0}")]
    AlreadyRunning(String),

    /// Notify error.
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel send error.
    #[error("channel error: failed to queue event")]
    ChannelSend,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl MirrorError {
    /// Startup found a root directory missing. Nothing was watched.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::SourceNotFound(_) | Self::TargetNotFound(_))
    }

    /// The configuration itself is unusable.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Config(_) | Self::InvalidPattern { .. })
    }
}
