use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::trace;

/// Name under which progress events are published to the caller.
pub const PROGRESS_EVENT: &str = "onProgress";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub progress: f64,
    pub message: String,
}

pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// A callback that drops every event.
pub fn no_progress() -> ProgressCallback {
    Arc::new(|_: ProgressEvent| {})
}

/// Fraction of the whole run reached by a video sample at `sample_us` in input `file_index`.
pub fn overall_fraction(file_index: usize, total_files: usize, sample_us: i64, file_duration_us: Option<i64>) -> f64 {
    if total_files == 0 {
        return 0.0;
    }
    let within_file = match file_duration_us {
        Some(duration) if duration > 0 => (sample_us as f64 / duration as f64).clamp(0.0, 1.0),
        _ => 0.0,
    };
    (file_index as f64 + within_file) / total_files as f64
}

/// Rate-limited progress forwarding, one instance per run.
pub struct ProgressReporter {
    callback: ProgressCallback,
    min_interval: Duration,
    last_emit: Option<Instant>,
    last_progress: f64,
}

impl ProgressReporter {
    pub fn new(callback: ProgressCallback, min_interval: Duration) -> Self {
        Self {
            callback,
            min_interval,
            last_emit: None,
            last_progress: 0.0,
        }
    }

    pub fn report(&mut self, progress: f64, message: &str) -> bool {
        self.report_at(Instant::now(), progress, message)
    }

    /// Forwards the event when `min_interval` has passed since the last forwarded one,
    /// or when `progress` reached 1.0. Returns whether it was forwarded.
    ///
    /// Forwarded values never go backwards; B-frame reordering can make raw fractions dip.
    pub fn report_at(&mut self, now: Instant, progress: f64, message: &str) -> bool {
        let progress = progress.clamp(0.0, 1.0).max(self.last_progress);
        let due = match self.last_emit {
            Some(last) => now.saturating_duration_since(last) >= self.min_interval,
            None => true,
        };
        if !due && progress < 1.0 {
            return false;
        }

        self.last_emit = Some(now);
        self.last_progress = progress;
        trace!(progress, text = message, "Progress");
        (self.callback)(ProgressEvent {
            progress,
            message: message.to_string(),
        });
        true
    }
}
