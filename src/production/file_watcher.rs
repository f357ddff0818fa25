//! notify-based recursive file watcher implementation

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::traits::{EventHandler, FileEvent, FileEventKind, FileWatcher, FileWatcherError};

/// Recursive filesystem watcher over the `notify` crate.
///
/// Events are forwarded raw, without debouncing: the stability tracker does
/// its own quiescence detection and needs every modify event it can get.
/// The handler runs on the watcher's own notification thread.
pub struct NotifyWatcher {
    watcher: Arc<Mutex<RecommendedWatcher>>,
    watched_paths: Arc<Mutex<Vec<PathBuf>>>,
    event_handler: EventHandler,
}

impl NotifyWatcher {
    pub fn new() -> Result<Self, FileWatcherError> {
        let (tx, rx) = std::sync::mpsc::channel::<notify::Result<notify::Event>>();
        let event_handler: EventHandler = Arc::new(Mutex::new(None));
        let event_handler_clone = Arc::clone(&event_handler);

        // Forward raw notify events to the registered handler
        std::thread::spawn(move || {
            for result in rx {
                match result {
                    Ok(event) => {
                        let kind = match event.kind {
                            EventKind::Create(_) => FileEventKind::Created,
                            EventKind::Modify(_) => FileEventKind::Modified,
                            _ => continue,
                        };
                        if let Some(handler) = event_handler_clone.lock().unwrap().as_ref() {
                            for path in &event.paths {
                                handler(FileEvent {
                                    path: path.clone(),
                                    kind,
                                    is_dir: path.is_dir(),
                                    timestamp: chrono::Utc::now(),
                                });
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!("Watch error: {:?}", e);
                    }
                }
            }
        });

        let watcher = notify::recommended_watcher(tx)
            .map_err(|e| FileWatcherError::WatchError(e.to_string()))?;

        Ok(Self {
            watcher: Arc::new(Mutex::new(watcher)),
            watched_paths: Arc::new(Mutex::new(Vec::new())),
            event_handler,
        })
    }
}

impl FileWatcher for NotifyWatcher {
    fn watch(&self, path: PathBuf) -> Result<(), FileWatcherError> {
        if !path.exists() {
            return Err(FileWatcherError::PathNotFound(path));
        }

        let mut watcher = self.watcher.lock().unwrap();
        watcher
            .watch(&path, RecursiveMode::Recursive)
            .map_err(|e| FileWatcherError::WatchError(e.to_string()))?;

        self.watched_paths.lock().unwrap().push(path.clone());
        tracing::info!(path = %path.display(), "Watching path recursively");

        Ok(())
    }

    fn unwatch(&self, path: PathBuf) -> Result<(), FileWatcherError> {
        let mut watcher = self.watcher.lock().unwrap();
        watcher
            .unwatch(&path)
            .map_err(|e| FileWatcherError::WatchError(e.to_string()))?;

        self.watched_paths.lock().unwrap().retain(|p| p != &path);
        tracing::info!(path = %path.display(), "Unwatched path");

        Ok(())
    }

    fn watched_paths(&self) -> Vec<PathBuf> {
        self.watched_paths.lock().unwrap().clone()
    }

    fn set_event_handler(&self, handler: Arc<dyn Fn(FileEvent) + Send + Sync>) {
        *self.event_handler.lock().unwrap() = Some(handler);
        tracing::debug!("File event handler set");
    }
}
