//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::production::{AmqpTransport, NotifyWatcher};
use crate::tracker::StabilityTracker;
use crate::traits::{BrokerTransport, FileWatcher, FileWatcherError};

/// Application state containing all dependencies
pub struct AppState {
    pub file_watcher: Arc<dyn FileWatcher>,
    pub transport: Arc<dyn BrokerTransport>,
    pub tracker: Arc<StabilityTracker>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState with production implementations
    pub fn new_production(config: Config) -> Result<Self, FileWatcherError> {
        tracing::info!("Initializing AppState");

        let tracker = Arc::new(StabilityTracker::new(
            config.watch.quiet_period(),
            config.watch.extension_set(),
        ));

        let file_watcher = Arc::new(NotifyWatcher::new()?);
        tracing::info!("File watcher initialized");

        let transport = Arc::new(AmqpTransport::new(&config.broker));
        tracing::info!("AMQP transport initialized");

        Ok(Self {
            file_watcher,
            transport,
            tracker,
            config: Arc::new(config),
        })
    }

    /// Create a new AppState with test implementations
    #[cfg(test)]
    pub fn new_test() -> Self {
        use crate::mocks::{ManualFileWatcher, RecordedBrokerTransport};

        let config = Config::default();
        let tracker = Arc::new(StabilityTracker::new(
            config.watch.quiet_period(),
            config.watch.extension_set(),
        ));

        Self {
            file_watcher: Arc::new(ManualFileWatcher::new()),
            transport: Arc::new(RecordedBrokerTransport::success()),
            tracker,
            config: Arc::new(config),
        }
    }
}
