//! File watching trait for monitoring a recording directory

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileWatcherError {
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),
    #[error("Watch error: {0}")]
    WatchError(String),
}

/// Raw event emitted when something under a watched root changes.
///
/// Events fire while a file is still being written; stability is decided
/// downstream by the tracker, never here.
#[derive(Debug, Clone)]
pub struct FileEvent {
    pub path: PathBuf,
    pub kind: FileEventKind,
    /// Whether the path refers to a directory at event time.
    pub is_dir: bool,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEventKind {
    Created,
    Modified,
}

/// Trait for file system watching
///
/// Production: recursive watch via the `notify` crate
/// Testing: manual event emission
pub trait FileWatcher: Send + Sync {
    /// Start watching a path recursively
    fn watch(&self, path: PathBuf) -> Result<(), FileWatcherError>;

    /// Stop watching a path
    fn unwatch(&self, path: PathBuf) -> Result<(), FileWatcherError>;

    /// Get the list of currently watched roots
    fn watched_paths(&self) -> Vec<PathBuf>;

    /// Register the consumer of raw events. Called from the watcher's
    /// notification thread, concurrently with the scan loop.
    fn set_event_handler(&self, handler: Arc<dyn Fn(FileEvent) + Send + Sync>);
}
