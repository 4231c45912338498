use std::fmt;
use std::time::Duration;

use http::{HeaderMap, Method};
use tokio::time::Instant;

use super::body::RequestBody;
use super::control::Control;
use super::options::ProgressCallback;
use super::progress::{Progress, ProgressSlot};
use crate::error::{FetchError, Result};

/// Validated request line and payload.
#[derive(Debug)]
pub struct RequestParts {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<RequestBody>,
}

impl Default for RequestParts {
    fn default() -> Self {
        Self { method: Method::GET, headers: HeaderMap::new(), body: None }
    }
}

/// Timing and transport switches, fixed for the lifetime of a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSettings {
    pub dial_timeout: Option<Duration>,
    pub read_timeout: Option<Duration>,
    pub deadline: Option<Instant>,
    pub report_interval: Duration,
    pub follow_redirects: bool,
    pub disable_compression: bool,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            dial_timeout: None,
            read_timeout: None,
            deadline: None,
            report_interval: super::DEFAULT_REPORT_INTERVAL,
            follow_redirects: true,
            disable_compression: false,
        }
    }
}

/// Everyone interested in a transfer's progress: the callback, the control
/// handle and the snapshot slot.
///
/// Exactly one party writes the slot at a time (the dial, then the transfer
/// loop), always through [`Observer::publish`].
#[derive(Clone)]
pub struct Observer {
    callback: Option<ProgressCallback>,
    control: Control,
    slot: ProgressSlot,
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("callback", &self.callback.as_ref().map(|_| "{ ... }"))
            .field("control", &self.control)
            .field("slot", &self.slot)
            .finish()
    }
}

impl Default for Observer {
    fn default() -> Self { Self::new(None, Control::new(), ProgressSlot::new()) }
}

impl Observer {
    /// Binds the slot to the control handle so [`Control::snapshot`] sees it.
    pub fn new(callback: Option<ProgressCallback>, control: Control, slot: ProgressSlot) -> Self {
        control.attach(&slot);
        Self { callback, control, slot }
    }

    pub fn control(&self) -> &Control { &self.control }

    pub fn slot(&self) -> &ProgressSlot { &self.slot }

    /// Applies `change` to the live snapshot, refreshes it and hands a copy to
    /// the callback. The slot lock is released before the callback runs, so
    /// the callback may read the control handle freely.
    pub(crate) fn publish(&self, change: impl FnOnce(&mut Progress)) -> Result<Progress> {
        let snapshot = self.slot.update(|progress| {
            change(progress);
            progress.refresh(Instant::now());
            progress.clone()
        });
        self.notify(&snapshot)?;
        Ok(snapshot)
    }

    fn notify(&self, progress: &Progress) -> Result<()> {
        match self.callback {
            Some(ref callback) => callback(progress).map_err(FetchError::UserAborted),
            None => Ok(()),
        }
    }
}
