//! Data layer: configuration, snapshots and the shared control handle.
//!
//! These types carry no I/O. The only shared mutable state lives behind
//! [`ProgressSlot`] and [`Control`], both cheap to clone and safe to read from
//! any task while a transfer runs.

pub mod body;
pub mod control;
pub mod options;
pub mod progress;
pub mod resolved;

pub use body::{BodyStream, BoxStream, RequestBody};
pub use control::Control;
pub use options::{DEFAULT_REPORT_INTERVAL, FetchOptions, FetchPhase, ProgressCallback};
pub use progress::{Progress, ProgressSlot};
pub use resolved::{Observer, RequestParts, TransferSettings};
