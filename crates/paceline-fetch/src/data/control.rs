use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::progress::{Progress, ProgressSlot};

/// Cross-task handle for steering a running transfer.
///
/// Clones share the same state. Stop requests are cooperative: the transfer
/// notices them on its next reporting tick, so a stop takes effect within one
/// reporting interval. An in-flight read on a stalled connection is not
/// interrupted by the stop flag itself; the transfer gives up on it when the
/// tick fires and the copy is dropped, or through the read timeout and
/// deadline policies.
///
/// # Examples
///
/// ```
/// use paceline_fetch::{Control, FetchPhase};
///
/// let control = Control::new();
/// control.set_speed_cap(512 * 1024);
/// assert_eq!(control.snapshot().phase, FetchPhase::Connecting);
/// control.request_stop();
/// assert!(control.stop_requested());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Control {
    inner: Arc<Shared>,
}

#[derive(Debug, Default)]
struct Shared {
    stop: AtomicBool,
    speed_cap: AtomicU64,
    slot: Mutex<Option<ProgressSlot>>,
}

impl Control {
    pub fn new() -> Self { Self::default() }

    /// Ask the transfer to stop. Idempotent.
    pub fn request_stop(&self) { self.inner.stop.store(true, Ordering::SeqCst); }

    pub fn stop_requested(&self) -> bool { self.inner.stop.load(Ordering::SeqCst) }

    /// Change the throughput cap in bytes per second; 0 removes it.
    /// Takes effect from the next copy chunk and reporting window.
    pub fn set_speed_cap(&self, bytes_per_second: u64) {
        self.inner.speed_cap.store(bytes_per_second, Ordering::SeqCst);
    }

    pub fn speed_cap(&self) -> u64 { self.inner.speed_cap.load(Ordering::SeqCst) }

    /// Freshly recomputed copy of the live snapshot, or a connecting-phase
    /// snapshot if no transfer has been attached yet.
    ///
    /// The handle keeps the last attached snapshot readable after the
    /// transfer completes.
    pub fn snapshot(&self) -> Progress {
        match self.attached() {
            Some(slot) => slot.snapshot(),
            None => Progress::default(),
        }
    }

    pub(crate) fn attach(&self, slot: &ProgressSlot) {
        *self.inner.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(slot.clone());
    }

    fn attached(&self) -> Option<ProgressSlot> {
        self.inner.slot.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}
