//! Instrumented, rate-limited and cancellable HTTP transfers.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - [`data`] - Configuration, progress snapshots and the control handle
//! - [`core`] - Pure derivations and policies (rates, timeouts, redirects)
//! - effects - The dial, the transfer loop and the throttled sink, over an
//!   [`HttpClient`]
//!
//! # Key Features
//!
//! - **Live Progress**: a [`Progress`] snapshot on every phase change and every
//!   reporting tick, readable any time through [`Control::snapshot`]
//! - **Speed Cap**: adjustable while the transfer runs
//! - **Cooperative Stop**: [`Control::request_stop`] ends the transfer on the next tick
//! - **Timing Policies**: dial timeout, idle read timeout and absolute deadline
//!
//! # Example
//!
//! ```no_run
//! use paceline_fetch::{FetchOptions, Fetcher, ReqwestClient};
//!
//! # async fn run() -> paceline_fetch::Result<()> {
//! let fetcher = Fetcher::new(ReqwestClient::new());
//! let options = FetchOptions::default().max_speed(1024 * 1024).on_progress(|p| {
//!     println!("{} {} {}", p.phase, p.percent_string(), p.speed_string());
//!     Ok(())
//! });
//! let fetched = fetcher.fetch_file("https://example.com/file.bin", "file.bin", options).await?;
//! println!("{} in {}", fetched.progress.size_string(), fetched.progress.elapsed_string());
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod data;
mod effects;
mod error;

pub use self::core::MAX_REDIRECTS;
pub use data::{
    BodyStream, BoxStream, Control, DEFAULT_REPORT_INTERVAL, FetchOptions, FetchPhase, Observer,
    Progress, ProgressCallback, ProgressSlot, RequestBody, RequestParts, TransferSettings,
};
pub use effects::{
    DialRequest, Fetched, Fetcher, HttpClient, RedirectPolicy, RedirectRefused, Response,
    TransferSource, dial, transfer,
};
pub use error::{BoxError, FetchError, Result};
pub use http;
pub use url;

#[cfg(feature = "reqwest")]
pub use effects::ReqwestClient;
