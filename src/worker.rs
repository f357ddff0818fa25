//! Periodic scan loop tying the tracker to broker delivery
//!
//! Every tick the loop asks the tracker for newly stabilized files and hands
//! each one to the broker link synchronously, in scan-yield order. Delivery
//! retries block the loop on purpose: while the broker is unreachable no
//! further files are declared ready, so the tracked set is bounded by
//! filesystem churn rather than by a publish backlog.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;

use crate::broker::BrokerLink;
use crate::tracker::StabilityTracker;

/// Stat function used by production scans.
pub fn file_size(path: &Path) -> std::io::Result<u64> {
    std::fs::metadata(path).map(|m| m.len())
}

/// Run one scan pass and publish every ready path.
///
/// Returns the number of files announced.
pub async fn scan_once(tracker: &StabilityTracker, link: &BrokerLink) -> usize {
    let ready = tracker.scan(Instant::now(), &file_size);
    let mut announced = 0;
    for path in ready {
        // Announce the absolute path; fall back to the recorded path if the
        // file vanished between the final scan and canonicalization
        let abs = path.canonicalize().unwrap_or_else(|_| path.clone());
        link.publish(&abs.to_string_lossy()).await;
        announced += 1;
    }
    announced
}

/// Drive the scan loop until the shutdown signal flips.
///
/// Shutdown is only observed between ticks: a publish mid-retry keeps
/// retrying until the message is delivered, so shutdown during a broker
/// outage is not instantaneous.
pub async fn run(
    tracker: Arc<StabilityTracker>,
    link: &BrokerLink,
    scan_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::info!(
        interval_ms = scan_interval.as_millis() as u64,
        "Scan loop started"
    );
    let mut interval = tokio::time::interval(scan_interval);
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                tracing::info!("Stop signal received, leaving scan loop");
                return;
            }
            _ = interval.tick() => {
                scan_once(&tracker, link).await;
            }
        }
    }
}
