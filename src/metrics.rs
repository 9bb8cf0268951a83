// Console metrics
//
// Lightweight counters for resource discipline and submission outcomes

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Console-wide counters.
///
/// Uses atomic operations so the media manager, the state manager and spawned
/// submission tasks can record without sharing a lock. Acquisition/release
/// pairs let tests and the shutdown summary verify that no camera stream or
/// preview file leaked.
#[derive(Debug)]
pub struct Metrics {
    /// Camera streams opened
    pub camera_acquisitions: AtomicU64,

    /// Camera streams stopped
    pub camera_releases: AtomicU64,

    /// Preview files written
    pub previews_created: AtomicU64,

    /// Preview files deleted
    pub previews_released: AtomicU64,

    pub submissions_started: AtomicU64,
    pub submissions_succeeded: AtomicU64,
    pub submissions_failed: AtomicU64,

    /// Responses dropped because the selection moved on while they were in flight
    pub stale_responses: AtomicU64,

    /// Total round-trip time of completed submissions in milliseconds
    pub total_submission_time_ms: AtomicU64,

    /// Number of state updates performed
    pub state_updates: AtomicU64,

    /// Number of state change events broadcast
    pub state_broadcasts: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            camera_acquisitions: AtomicU64::new(0),
            camera_releases: AtomicU64::new(0),
            previews_created: AtomicU64::new(0),
            previews_released: AtomicU64::new(0),
            submissions_started: AtomicU64::new(0),
            submissions_succeeded: AtomicU64::new(0),
            submissions_failed: AtomicU64::new(0),
            stale_responses: AtomicU64::new(0),
            total_submission_time_ms: AtomicU64::new(0),
            state_updates: AtomicU64::new(0),
            state_broadcasts: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_camera_acquired(&self) {
        self.camera_acquisitions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_camera_released(&self) {
        self.camera_releases.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_preview_created(&self) {
        self.previews_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_preview_released(&self) {
        self.previews_released.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_submission_started(&self) {
        self.submissions_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_submission_succeeded(&self, duration: Duration) {
        self.submissions_succeeded.fetch_add(1, Ordering::Relaxed);
        self.total_submission_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn record_submission_failed(&self) {
        self.submissions_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_response(&self) {
        self.stale_responses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_state_update(&self) {
        self.state_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_state_broadcast(&self) {
        self.state_broadcasts.fetch_add(1, Ordering::Relaxed);
    }

    /// Camera streams currently open (acquisitions minus releases)
    pub fn open_camera_streams(&self) -> u64 {
        self.camera_acquisitions
            .load(Ordering::Relaxed)
            .saturating_sub(self.camera_releases.load(Ordering::Relaxed))
    }

    /// Preview files currently on disk
    pub fn live_previews(&self) -> u64 {
        self.previews_created
            .load(Ordering::Relaxed)
            .saturating_sub(self.previews_released.load(Ordering::Relaxed))
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Average round-trip of successful submissions in milliseconds
    pub fn avg_submission_time_ms(&self) -> f64 {
        let total = self.total_submission_time_ms.load(Ordering::Relaxed);
        let count = self.submissions_succeeded.load(Ordering::Relaxed);
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!("=== Console Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Submissions: {} started, {} succeeded, {} failed, {} stale (avg: {:.2}ms)",
            self.submissions_started.load(Ordering::Relaxed),
            self.submissions_succeeded.load(Ordering::Relaxed),
            self.submissions_failed.load(Ordering::Relaxed),
            self.stale_responses.load(Ordering::Relaxed),
            self.avg_submission_time_ms()
        );
        tracing::info!(
            "Camera streams: {} opened, {} released; previews: {} created, {} released",
            self.camera_acquisitions.load(Ordering::Relaxed),
            self.camera_releases.load(Ordering::Relaxed),
            self.previews_created.load(Ordering::Relaxed),
            self.previews_released.load(Ordering::Relaxed)
        );
        tracing::info!(
            "State updates: {}, broadcasts: {}",
            self.state_updates.load(Ordering::Relaxed),
            self.state_broadcasts.load(Ordering::Relaxed)
        );

        if self.open_camera_streams() > 0 || self.live_previews() > 0 {
            tracing::warn!(
                "Resources still held at shutdown: {} camera stream(s), {} preview(s)",
                self.open_camera_streams(),
                self.live_previews()
            );
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new();
        assert_eq!(metrics.submissions_started.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.open_camera_streams(), 0);
        assert_eq!(metrics.live_previews(), 0);
    }

    #[test]
    fn test_camera_balance() {
        let metrics = Metrics::new();

        metrics.record_camera_acquired();
        metrics.record_camera_acquired();
        metrics.record_camera_released();
        assert_eq!(metrics.open_camera_streams(), 1);

        metrics.record_camera_released();
        assert_eq!(metrics.open_camera_streams(), 0);
    }

    #[test]
    fn test_preview_balance() {
        let metrics = Metrics::new();

        metrics.record_preview_created();
        assert_eq!(metrics.live_previews(), 1);
        metrics.record_preview_released();
        assert_eq!(metrics.live_previews(), 0);
    }

    #[test]
    fn test_submission_timing() {
        let metrics = Metrics::new();

        metrics.record_submission_started();
        metrics.record_submission_succeeded(Duration::from_millis(100));
        metrics.record_submission_started();
        metrics.record_submission_succeeded(Duration::from_millis(300));
        metrics.record_submission_started();
        metrics.record_submission_failed();

        assert_eq!(metrics.submissions_started.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.submissions_failed.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.avg_submission_time_ms(), 200.0);
    }

    #[test]
    fn test_avg_submission_time_no_submissions() {
        let metrics = Metrics::new();
        assert_eq!(metrics.avg_submission_time_ms(), 0.0);
    }

    #[test]
    fn test_uptime() {
        let metrics = Metrics::new();
        thread::sleep(Duration::from_millis(10));
        assert!(metrics.uptime().as_millis() >= 10);
    }
}
