//! Trait definitions for dependency injection
//!
//! The filesystem event source and the broker transport are abstracted behind
//! traits to enable testing.

use std::sync::{Arc, Mutex};

mod broker;
mod file_watcher;

pub use broker::{BrokerError, BrokerTransport};
pub use file_watcher::{FileEvent, FileEventKind, FileWatcher, FileWatcherError};

/// Shared event handler type used by file watchers
pub type EventHandler = Arc<Mutex<Option<Arc<dyn Fn(FileEvent) + Send + Sync>>>>;
