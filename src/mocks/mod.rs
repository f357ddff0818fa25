//! Test doubles for dependency injection
//!
//! Provides in-memory implementations of the watcher and broker seams for
//! isolated testing.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::traits::{
    BrokerError, BrokerTransport, EventHandler, FileEvent, FileEventKind, FileWatcher,
    FileWatcherError,
};

// ============================================================================
// ManualFileWatcher
// ============================================================================

/// Manual file watcher for testing
///
/// Does not touch the file system. Tests call the `simulate_*` methods to
/// feed events to the registered handler.
#[derive(Clone)]
pub struct ManualFileWatcher {
    watched: Arc<Mutex<Vec<PathBuf>>>,
    event_handler: EventHandler,
}

impl ManualFileWatcher {
    pub fn new() -> Self {
        Self {
            watched: Arc::new(Mutex::new(Vec::new())),
            event_handler: Arc::new(Mutex::new(None)),
        }
    }

    /// Check if a path is currently watched
    pub fn is_watching(&self, path: &PathBuf) -> bool {
        self.watched.lock().unwrap().contains(path)
    }

    /// Feed an arbitrary event to the handler
    pub fn simulate(&self, event: FileEvent) {
        if let Some(handler) = self.event_handler.lock().unwrap().as_ref() {
            handler(event);
        }
    }

    /// Simulate a file-created event
    pub fn simulate_created(&self, path: PathBuf) {
        self.simulate(FileEvent {
            path,
            kind: FileEventKind::Created,
            is_dir: false,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Simulate a file-modified event
    pub fn simulate_modified(&self, path: PathBuf) {
        self.simulate(FileEvent {
            path,
            kind: FileEventKind::Modified,
            is_dir: false,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Simulate a directory-created event
    pub fn simulate_dir_created(&self, path: PathBuf) {
        self.simulate(FileEvent {
            path,
            kind: FileEventKind::Created,
            is_dir: true,
            timestamp: chrono::Utc::now(),
        });
    }
}

impl Default for ManualFileWatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl FileWatcher for ManualFileWatcher {
    fn watch(&self, path: PathBuf) -> Result<(), FileWatcherError> {
        let mut watched = self.watched.lock().unwrap();
        if !watched.contains(&path) {
            watched.push(path);
        }
        Ok(())
    }

    fn unwatch(&self, path: PathBuf) -> Result<(), FileWatcherError> {
        let mut watched = self.watched.lock().unwrap();
        watched.retain(|p| p != &path);
        Ok(())
    }

    fn watched_paths(&self) -> Vec<PathBuf> {
        self.watched.lock().unwrap().clone()
    }

    fn set_event_handler(&self, handler: Arc<dyn Fn(FileEvent) + Send + Sync>) {
        *self.event_handler.lock().unwrap() = Some(handler);
    }
}

// ============================================================================
// RecordedBrokerTransport
// ============================================================================

/// Failure configuration for the recorded broker transport
#[derive(Debug, Clone)]
pub enum BrokerBehavior {
    /// Every publish attempt is accepted
    AlwaysSucceed,
    /// Fail N publish attempts, then succeed
    FailThenSucceed { fail_count: usize, error: BrokerError },
    /// Every publish attempt fails
    AlwaysFail(BrokerError),
}

/// Recorded broker transport for testing
///
/// Records successful deliveries and counts every attempt. A failed publish
/// marks the transport disconnected, the way a real torn connection would.
#[derive(Clone)]
pub struct RecordedBrokerTransport {
    published: Arc<Mutex<Vec<String>>>,
    behavior: Arc<Mutex<BrokerBehavior>>,
    publish_attempts: Arc<Mutex<usize>>,
    connect_attempts: Arc<Mutex<usize>>,
    connect_failures: Arc<Mutex<Option<(usize, BrokerError)>>>,
    connected: Arc<Mutex<bool>>,
}

impl RecordedBrokerTransport {
    pub fn new() -> Self {
        Self {
            published: Arc::new(Mutex::new(Vec::new())),
            behavior: Arc::new(Mutex::new(BrokerBehavior::AlwaysSucceed)),
            publish_attempts: Arc::new(Mutex::new(0)),
            connect_attempts: Arc::new(Mutex::new(0)),
            connect_failures: Arc::new(Mutex::new(None)),
            connected: Arc::new(Mutex::new(false)),
        }
    }

    /// Every publish succeeds
    pub fn success() -> Self {
        Self::new()
    }

    /// Fail N publish attempts, then succeed
    pub fn fail_then_succeed(fail_count: usize, error: BrokerError) -> Self {
        let transport = Self::new();
        transport.set_behavior(BrokerBehavior::FailThenSucceed { fail_count, error });
        transport
    }

    /// Every publish fails
    pub fn always_fail(error: BrokerError) -> Self {
        let transport = Self::new();
        transport.set_behavior(BrokerBehavior::AlwaysFail(error));
        transport
    }

    /// Set the behavior for subsequent publish attempts
    pub fn set_behavior(&self, behavior: BrokerBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    /// Make the next N connect attempts fail with the given error
    pub fn set_connect_failures(&self, count: usize, error: BrokerError) {
        *self.connect_failures.lock().unwrap() = Some((count, error));
    }

    /// Messages the broker accepted, in delivery order
    pub fn published(&self) -> Vec<String> {
        self.published.lock().unwrap().clone()
    }

    /// Number of publish attempts made (including failures)
    pub fn publish_attempts(&self) -> usize {
        *self.publish_attempts.lock().unwrap()
    }

    /// Number of connect attempts made (including failures)
    pub fn connect_attempts(&self) -> usize {
        *self.connect_attempts.lock().unwrap()
    }
}

impl Default for RecordedBrokerTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrokerTransport for RecordedBrokerTransport {
    async fn connect(&self) -> Result<(), BrokerError> {
        *self.connect_attempts.lock().unwrap() += 1;

        let mut failures = self.connect_failures.lock().unwrap();
        if let Some((remaining, error)) = failures.as_mut() {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(error.clone());
            }
        }
        drop(failures);

        *self.connected.lock().unwrap() = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        *self.connected.lock().unwrap()
    }

    async fn publish(&self, message: &str) -> Result<(), BrokerError> {
        let mut attempts = self.publish_attempts.lock().unwrap();
        *attempts += 1;
        let current_attempt = *attempts;
        drop(attempts);

        let behavior = self.behavior.lock().unwrap().clone();
        let result = match behavior {
            BrokerBehavior::AlwaysSucceed => Ok(()),
            BrokerBehavior::FailThenSucceed { fail_count, error } => {
                if current_attempt <= fail_count {
                    Err(error)
                } else {
                    Ok(())
                }
            }
            BrokerBehavior::AlwaysFail(error) => Err(error),
        };

        match result {
            Ok(()) => {
                self.published.lock().unwrap().push(message.to_string());
                Ok(())
            }
            Err(e) => {
                *self.connected.lock().unwrap() = false;
                Err(e)
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
