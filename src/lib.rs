//! RecPush - Announce finished audio recordings to RabbitMQ with guaranteed delivery
//!
//! Filesystem events fire before a recording is fully written, so RecPush
//! watches for size quiescence and only then publishes the file's absolute
//! path to a durable queue, retrying through broker outages. Organized
//! around trait-based dependency injection for testability.

pub mod broker;
pub mod config;
pub mod mocks;
pub mod production;
pub mod tracker;
pub mod traits;
pub mod worker;

mod state;
pub use state::AppState;

use std::sync::Arc;
use std::time::Instant;

use tracing_appender::rolling;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::broker::BrokerLink;
use crate::config::Config;
use crate::tracker::StabilityTracker;
use crate::traits::FileEvent;

#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("Logging setup failed: {0}")]
    Logging(String),
    #[error("Watcher error: {0}")]
    Watcher(#[from] crate::traits::FileWatcherError),
}

/// Initialize logging to both stdout and a daily-rolling file.
pub fn init_logging(config: &Config) -> Result<(), SetupError> {
    std::fs::create_dir_all(&config.log.dir).map_err(|e| SetupError::Logging(e.to_string()))?;
    let file_appender = rolling::daily(&config.log.dir, "recpush.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "recpush=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer()) // stdout
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        ) // file
        .init();

    // Keep guard alive for the process lifetime
    std::mem::forget(guard);
    Ok(())
}

/// Feed one raw watcher event into the tracker.
///
/// Directory events and unwatched extensions are ignored silently. The
/// observed size is taken at event time; if the path is already unreadable
/// the event is skipped and the next event or scan pass catches up.
pub fn handle_file_event(tracker: &StabilityTracker, event: &FileEvent) {
    if event.is_dir || !tracker.accepts(&event.path) {
        return;
    }
    match worker::file_size(&event.path) {
        Ok(size) => tracker.record(event.path.clone(), size, Instant::now()),
        Err(e) => {
            tracing::debug!(
                path = %event.path.display(),
                error = %e,
                "Skipping unreadable event path"
            );
        }
    }
}

/// Run the watcher until an external stop signal (SIGINT) arrives.
///
/// Blocks until the broker is reachable before subscribing to filesystem
/// events. On shutdown the watcher subscription is torn down and any file
/// still mid-tracking is lost; tracking restarts fresh from new events on
/// the next run.
pub async fn run(config: Config) -> Result<(), SetupError> {
    tracing::info!("RecPush starting up");

    let state = AppState::new_production(config)?;
    let link = BrokerLink::new(
        state.transport.clone(),
        state.config.broker.reconnect_backoff(),
    );

    link.connect().await;

    let tracker_for_events = state.tracker.clone();
    state.file_watcher.set_event_handler(Arc::new(move |event| {
        handle_file_event(&tracker_for_events, &event);
    }));

    let root = state.config.watch.root.clone();
    state.file_watcher.watch(root.clone())?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Stop signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    tracing::info!(root = %root.display(), "RecPush initialized, watching for recordings");
    worker::run(
        state.tracker.clone(),
        &link,
        state.config.watch.scan_interval(),
        shutdown_rx,
    )
    .await;

    state.file_watcher.unwatch(root)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::Path;

    fn tracker() -> StabilityTracker {
        let watch = config::WatchConfig::default();
        StabilityTracker::new(watch.quiet_period(), watch.extension_set())
    }

    fn event(path: &Path, is_dir: bool) -> FileEvent {
        FileEvent {
            path: path.to_path_buf(),
            kind: traits::FileEventKind::Created,
            is_dir,
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_handle_file_event_records_audio_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("call.wav");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&[0u8; 42]).unwrap();
        file.flush().unwrap();

        let tracker = tracker();
        handle_file_event(&tracker, &event(&path, false));

        assert_eq!(tracker.tracked_count(), 1);
    }

    #[test]
    fn test_handle_file_event_ignores_directories() {
        let dir = tempfile::tempdir().unwrap();
        // A directory named like an audio file must still be ignored
        let subdir = dir.path().join("takes.wav");
        std::fs::create_dir(&subdir).unwrap();

        let tracker = tracker();
        handle_file_event(&tracker, &event(&subdir, true));

        assert_eq!(tracker.tracked_count(), 0);
    }

    #[test]
    fn test_handle_file_event_ignores_other_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();

        let tracker = tracker();
        handle_file_event(&tracker, &event(&path, false));

        assert_eq!(tracker.tracked_count(), 0);
    }

    #[test]
    fn test_handle_file_event_skips_vanished_path() {
        let tracker = tracker();
        handle_file_event(&tracker, &event(Path::new("/nonexistent/call.wav"), false));

        assert_eq!(tracker.tracked_count(), 0);
    }
}
