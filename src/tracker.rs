//! Stability tracking for in-progress recordings
//!
//! Filesystem events fire while a recording is still being written, so raw
//! create/modify notifications cannot be announced downstream directly. The
//! tracker keeps one entry per observed path and promotes a path to "ready"
//! only once its size has stopped changing for a full quiet period. Polling
//! the size on every scan (instead of trusting individual modify events)
//! covers writers whose events get coalesced by the event source.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Per-path observation state.
#[derive(Debug, Clone)]
struct TrackedFile {
    /// Byte size observed at the last event or scan.
    last_seen_size: u64,
    /// When the size last changed. Not the time of the last scan.
    last_change: Instant,
}

/// Decides, from a stream of size observations over time, when a file write
/// is complete.
///
/// `record` is called from the watcher's notification thread while `scan`
/// runs on the main loop, so the map is guarded by a single lock. Expected
/// file counts are tens, not millions.
pub struct StabilityTracker {
    files: Mutex<HashMap<PathBuf, TrackedFile>>,
    quiet_period: Duration,
    extensions: HashSet<String>,
}

impl StabilityTracker {
    pub fn new(quiet_period: Duration, extensions: HashSet<String>) -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            quiet_period,
            extensions,
        }
    }

    /// Whether a path carries one of the accepted extensions.
    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.contains(&e.to_lowercase()))
            .unwrap_or(false)
    }

    /// Record a create/modify observation for a path.
    ///
    /// Inserts or overwrites the entry with the observed size and `now` as
    /// the last change time. Paths without an accepted extension are ignored
    /// silently; directory events must be filtered by the caller, which is
    /// the only party that knows whether the event path is a directory.
    pub fn record(&self, path: PathBuf, observed_size: u64, now: Instant) {
        if !self.accepts(&path) {
            return;
        }
        tracing::debug!(path = %path.display(), size = observed_size, "Recording file event");
        self.files.lock().unwrap().insert(
            path,
            TrackedFile {
                last_seen_size: observed_size,
                last_change: now,
            },
        );
    }

    /// Run one scan pass, returning the paths that became ready.
    ///
    /// For every tracked path: a failed stat on a vanished file drops the
    /// entry (expected when files are moved or deleted mid-write); a size
    /// change resets the quiet timer; an unchanged size older than the quiet
    /// period removes the entry and yields the path. Yield order follows map
    /// iteration order; no cross-file ordering is promised.
    pub fn scan(
        &self,
        now: Instant,
        stat: &dyn Fn(&Path) -> io::Result<u64>,
    ) -> Vec<PathBuf> {
        let mut ready = Vec::new();
        let mut files = self.files.lock().unwrap();

        files.retain(|path, entry| {
            let current_size = match stat(path) {
                Ok(size) => size,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    tracing::warn!(
                        path = %path.display(),
                        "File vanished before stabilizing (may have been moved or deleted)"
                    );
                    return false;
                }
                Err(e) => {
                    // Transient stat failure; keep the entry for the next pass
                    tracing::warn!(path = %path.display(), error = %e, "Failed to stat tracked file");
                    return true;
                }
            };

            if current_size != entry.last_seen_size {
                entry.last_seen_size = current_size;
                entry.last_change = now;
                return true;
            }

            if now.duration_since(entry.last_change) > self.quiet_period {
                tracing::info!(path = %path.display(), size = current_size, "File write completed");
                ready.push(path.clone());
                return false;
            }

            true
        });

        ready
    }

    /// Number of paths currently being observed.
    pub fn tracked_count(&self) -> usize {
        self.files.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_mp3() -> HashSet<String> {
        ["wav", "mp3"].iter().map(|s| s.to_string()).collect()
    }

    fn tracker() -> StabilityTracker {
        StabilityTracker::new(Duration::from_secs(5), wav_mp3())
    }

    fn fixed_size(size: u64) -> impl Fn(&Path) -> io::Result<u64> {
        move |_| Ok(size)
    }

    fn not_found() -> impl Fn(&Path) -> io::Result<u64> {
        |_| Err(io::Error::new(io::ErrorKind::NotFound, "gone"))
    }

    #[test]
    fn test_quiet_file_becomes_ready_after_quiet_period() {
        // Scenario A: created at t=0 size 100, no further events, scan at t=5.1
        let tracker = tracker();
        let t0 = Instant::now();
        tracker.record(PathBuf::from("/rec/call.wav"), 100, t0);

        let ready = tracker.scan(t0 + Duration::from_millis(5100), &fixed_size(100));

        assert_eq!(ready, vec![PathBuf::from("/rec/call.wav")]);
        assert_eq!(tracker.tracked_count(), 0);
    }

    #[test]
    fn test_not_ready_before_quiet_period_elapses() {
        let tracker = tracker();
        let t0 = Instant::now();
        tracker.record(PathBuf::from("/rec/call.wav"), 100, t0);

        let ready = tracker.scan(t0 + Duration::from_secs(2), &fixed_size(100));

        assert!(ready.is_empty());
        assert_eq!(tracker.tracked_count(), 1);
    }

    #[test]
    fn test_quiet_period_boundary_is_strict() {
        // Exactly quiet_period elapsed is not "strictly more than"
        let tracker = tracker();
        let t0 = Instant::now();
        tracker.record(PathBuf::from("/rec/call.wav"), 100, t0);

        let ready = tracker.scan(t0 + Duration::from_secs(5), &fixed_size(100));

        assert!(ready.is_empty());
        assert_eq!(tracker.tracked_count(), 1);
    }

    #[test]
    fn test_later_event_resets_quiet_timer() {
        // Scenario B: created t=0 size 100, modified t=3 size 200
        let tracker = tracker();
        let t0 = Instant::now();
        tracker.record(PathBuf::from("/rec/call.wav"), 100, t0);
        tracker.record(PathBuf::from("/rec/call.wav"), 200, t0 + Duration::from_secs(3));

        // t=5: only 2s since the last change
        let ready = tracker.scan(t0 + Duration::from_secs(5), &fixed_size(200));
        assert!(ready.is_empty());

        // t=9: 6s since the last change
        let ready = tracker.scan(t0 + Duration::from_secs(9), &fixed_size(200));
        assert_eq!(ready, vec![PathBuf::from("/rec/call.wav")]);
    }

    #[test]
    fn test_scan_observed_growth_resets_quiet_timer() {
        // Size changes seen by the scan itself must also reset the timer,
        // covering writers whose modify events were coalesced away
        let tracker = tracker();
        let t0 = Instant::now();
        tracker.record(PathBuf::from("/rec/call.wav"), 100, t0);

        // File grew between event and scan
        let ready = tracker.scan(t0 + Duration::from_secs(3), &fixed_size(250));
        assert!(ready.is_empty());

        // t=7: only 4s since the scan-observed change at t=3
        let ready = tracker.scan(t0 + Duration::from_secs(7), &fixed_size(250));
        assert!(ready.is_empty());

        // t=8.2: 5.2s since the change
        let ready = tracker.scan(t0 + Duration::from_millis(8200), &fixed_size(250));
        assert_eq!(ready, vec![PathBuf::from("/rec/call.wav")]);
    }

    #[test]
    fn test_vanished_file_is_dropped_without_yield() {
        // Scenario C: tracked file deleted before a scan
        let tracker = tracker();
        let t0 = Instant::now();
        tracker.record(PathBuf::from("/rec/call.wav"), 100, t0);

        let ready = tracker.scan(t0 + Duration::from_secs(10), &not_found());

        assert!(ready.is_empty());
        assert_eq!(tracker.tracked_count(), 0);
    }

    #[test]
    fn test_transient_stat_failure_keeps_entry() {
        let tracker = tracker();
        let t0 = Instant::now();
        tracker.record(PathBuf::from("/rec/call.wav"), 100, t0);

        let denied = |_: &Path| -> io::Result<u64> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        };
        let ready = tracker.scan(t0 + Duration::from_secs(10), &denied);

        assert!(ready.is_empty());
        assert_eq!(tracker.tracked_count(), 1);
    }

    #[test]
    fn test_ready_path_is_yielded_exactly_once() {
        let tracker = tracker();
        let t0 = Instant::now();
        tracker.record(PathBuf::from("/rec/call.wav"), 100, t0);

        let ready = tracker.scan(t0 + Duration::from_secs(6), &fixed_size(100));
        assert_eq!(ready.len(), 1);

        let ready = tracker.scan(t0 + Duration::from_secs(20), &fixed_size(100));
        assert!(ready.is_empty());
    }

    #[test]
    fn test_new_record_reinserts_after_yield() {
        let tracker = tracker();
        let t0 = Instant::now();
        tracker.record(PathBuf::from("/rec/call.wav"), 100, t0);
        tracker.scan(t0 + Duration::from_secs(6), &fixed_size(100));
        assert_eq!(tracker.tracked_count(), 0);

        // Writer re-opened the file
        tracker.record(PathBuf::from("/rec/call.wav"), 150, t0 + Duration::from_secs(7));
        assert_eq!(tracker.tracked_count(), 1);

        let ready = tracker.scan(t0 + Duration::from_secs(13), &fixed_size(150));
        assert_eq!(ready, vec![PathBuf::from("/rec/call.wav")]);
    }

    #[test]
    fn test_rejects_unwatched_extensions() {
        let tracker = tracker();
        let t0 = Instant::now();

        tracker.record(PathBuf::from("/rec/notes.txt"), 100, t0);
        tracker.record(PathBuf::from("/rec/no_extension"), 100, t0);

        assert_eq!(tracker.tracked_count(), 0);
    }

    #[test]
    fn test_extension_match_is_case_insensitive() {
        let tracker = tracker();
        let t0 = Instant::now();

        tracker.record(PathBuf::from("/rec/CALL.WAV"), 100, t0);

        assert_eq!(tracker.tracked_count(), 1);
    }

    #[test]
    fn test_accepts() {
        let tracker = tracker();

        assert!(tracker.accepts(Path::new("/rec/a.wav")));
        assert!(tracker.accepts(Path::new("/rec/a.MP3")));
        assert!(!tracker.accepts(Path::new("/rec/a.flac")));
        assert!(!tracker.accepts(Path::new("/rec/wav")));
    }

    #[test]
    fn test_multiple_files_promote_independently() {
        let tracker = tracker();
        let t0 = Instant::now();
        tracker.record(PathBuf::from("/rec/a.wav"), 100, t0);
        tracker.record(PathBuf::from("/rec/b.mp3"), 50, t0 + Duration::from_secs(4));

        let sizes = |p: &Path| -> io::Result<u64> {
            if p.ends_with("a.wav") {
                Ok(100)
            } else {
                Ok(50)
            }
        };

        // t=6: a is quiet for 6s, b only for 2s
        let ready = tracker.scan(t0 + Duration::from_secs(6), &sizes);
        assert_eq!(ready, vec![PathBuf::from("/rec/a.wav")]);
        assert_eq!(tracker.tracked_count(), 1);

        let ready = tracker.scan(t0 + Duration::from_secs(10), &sizes);
        assert_eq!(ready, vec![PathBuf::from("/rec/b.mp3")]);
        assert_eq!(tracker.tracked_count(), 0);
    }
}
