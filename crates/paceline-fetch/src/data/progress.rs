use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use http::{HeaderMap, StatusCode};
use paceline_format::{pretty_duration, pretty_percent, pretty_size, pretty_speed};
use tokio::time::Instant;
use url::Url;

use crate::core;
use crate::data::options::{DEFAULT_REPORT_INTERVAL, FetchPhase};

/// Point-in-time view of a transfer.
///
/// Raw counters are stored; everything human-readable is derived on demand
/// through the `*_string` methods.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    /// Current lifecycle stage.
    pub phase: FetchPhase,

    /// Set once, together with [`FetchPhase::Finished`].
    pub done: bool,

    /// When body copying began. `None` until the downloading phase.
    pub started_at: Option<Instant>,

    /// Time since `started_at`, recomputed on every refresh.
    pub elapsed: Duration,

    /// Bytes written to the sink so far.
    pub bytes_transferred: u64,

    /// Declared body length, if the response carried one.
    pub content_length: Option<u64>,

    /// `bytes_transferred / content_length` when the length is known and
    /// non-zero. May exceed `1.0` if the body outgrows its declared length.
    /// A finished transfer of unknown length reports `1.0`.
    pub fraction: Option<f64>,

    /// Bytes per second. While downloading this is the last reporting window
    /// extrapolated to one second; once finished it is the whole-transfer average.
    pub instant_rate: u64,

    /// Window used to extrapolate `instant_rate`.
    pub report_interval: Duration,

    /// Status of the final response, from the header-received phase on.
    pub status: Option<StatusCode>,

    /// Headers of the final response, from the header-received phase on.
    pub headers: Option<Arc<HeaderMap>>,

    /// Target of the redirect being followed. Only set while redirecting.
    pub redirect_target: Option<Url>,
}

impl Default for Progress {
    fn default() -> Self { Self::connecting(DEFAULT_REPORT_INTERVAL) }
}

impl Progress {
    pub fn connecting(report_interval: Duration) -> Self {
        Self {
            phase: FetchPhase::Connecting,
            done: false,
            started_at: None,
            elapsed: Duration::ZERO,
            bytes_transferred: 0,
            content_length: None,
            fraction: None,
            instant_rate: 0,
            report_interval,
            status: None,
            headers: None,
            redirect_target: None,
        }
    }

    /// Recomputes the time-dependent and derived fields. Idempotent.
    pub fn refresh(&mut self, now: Instant) {
        if let Some(started) = self.started_at {
            self.elapsed = now.saturating_duration_since(started);
        }
        self.fraction = match core::fraction(self.bytes_transferred, self.content_length) {
            Some(f) => Some(f),
            None if self.done => Some(1.0),
            None => None,
        };
    }

    pub(crate) fn finish(&mut self, now: Instant) {
        self.phase = FetchPhase::Finished;
        self.done = true;
        self.refresh(now);
        self.instant_rate = core::average_rate(self.bytes_transferred, self.elapsed);
    }

    #[must_use]
    pub fn is_finished(&self) -> bool { self.done }

    /// Header lookup on the final response.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.as_deref()?.get(name)?.to_str().ok()
    }

    pub fn percent_string(&self) -> String {
        self.fraction.map(pretty_percent).unwrap_or_else(|| "--".to_string())
    }

    pub fn size_string(&self) -> String { pretty_size(self.bytes_transferred) }

    pub fn length_string(&self) -> String {
        self.content_length.map(pretty_size).unwrap_or_else(|| "unknown".to_string())
    }

    pub fn speed_string(&self) -> String { pretty_speed(self.instant_rate) }

    pub fn elapsed_string(&self) -> String { pretty_duration(self.elapsed) }
}

/// Shared storage receiving live snapshot updates.
///
/// The transfer writes into it; any task may read a freshly refreshed copy
/// through [`ProgressSlot::snapshot`]. The lock is never held across I/O or
/// while a progress callback runs.
#[derive(Debug, Clone, Default)]
pub struct ProgressSlot {
    inner: Arc<Mutex<Progress>>,
}

impl ProgressSlot {
    pub fn new() -> Self { Self::default() }

    /// Copy of the current state with elapsed time and fraction recomputed.
    pub fn snapshot(&self) -> Progress {
        let mut progress = self.lock().clone();
        progress.refresh(Instant::now());
        progress
    }

    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut Progress) -> R) -> R {
        f(&mut self.lock())
    }

    pub(crate) fn reset(&self, progress: Progress) { *self.lock() = progress; }

    fn lock(&self) -> MutexGuard<'_, Progress> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
