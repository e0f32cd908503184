//! Frame-rate limiting for progress callbacks

use hotswap_types::DownloadProgress;
use std::time::{Duration, Instant};

/// Default delivery interval, one display frame at 60 Hz
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

type ProgressCallback<'a> = Box<dyn FnMut(DownloadProgress) + Send + 'a>;

/// Delivers progress at most once per frame interval.
///
/// The report that completes a transfer is always delivered immediately.
pub struct ProgressThrottle<'a> {
    callback: Option<ProgressCallback<'a>>,
    interval: Duration,
    last_delivery: Option<Instant>,
}

impl std::fmt::Debug for ProgressThrottle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressThrottle")
            .field("enabled", &self.callback.is_some())
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl<'a> ProgressThrottle<'a> {
    pub fn new(interval: Duration, callback: impl FnMut(DownloadProgress) + Send + 'a) -> Self {
        Self {
            callback: Some(Box::new(callback)),
            interval,
            last_delivery: None,
        }
    }

    /// A throttle that never delivers
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            callback: None,
            interval: DEFAULT_FRAME_INTERVAL,
            last_delivery: None,
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.callback.is_some()
    }

    /// Report progress now; returns whether it was delivered
    pub fn report(&mut self, progress: DownloadProgress) -> bool {
        self.report_at(progress, Instant::now())
    }

    /// Report progress observed at `now`; returns whether it was delivered
    pub fn report_at(&mut self, progress: DownloadProgress, now: Instant) -> bool {
        let Some(callback) = self.callback.as_mut() else {
            return false;
        };

        let due = progress.is_completed()
            || self
                .last_delivery
                .is_none_or(|last| now.saturating_duration_since(last) >= self.interval);
        if !due {
            return false;
        }

        self.last_delivery = Some(now);
        callback(progress);
        true
    }
}
