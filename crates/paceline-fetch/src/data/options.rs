use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::Method;
use tokio::time::Instant;

use super::body::RequestBody;
use super::control::Control;
use super::progress::{Progress, ProgressSlot};
use super::resolved::{Observer, RequestParts, TransferSettings};
use crate::core;
use crate::error::{BoxError, FetchError, Result};

pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Phases of a transfer.
///
/// Transfers move through these phases in order:
/// Connecting → Redirecting* → HeaderReceived → Downloading → Finished
///
/// Connecting and Redirecting may repeat; nothing is ever skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum FetchPhase {
    /// Request issued, no response yet. Re-reported on every reporting tick.
    #[default]
    Connecting,

    /// The server answered with a redirect that is about to be followed.
    /// [`Progress::redirect_target`] names the next URL.
    Redirecting,

    /// Final response headers are available.
    HeaderReceived,

    /// Body bytes are flowing into the sink.
    Downloading,

    /// Terminal state for successful transfers.
    Finished,
}

impl FetchPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchPhase::Connecting => "connecting",
            FetchPhase::Redirecting => "redirecting",
            FetchPhase::HeaderReceived => "header-received",
            FetchPhase::Downloading => "downloading",
            FetchPhase::Finished => "finished",
        }
    }
}

impl fmt::Display for FetchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Progress callback. Returning an error aborts the transfer with
/// [`FetchError::UserAborted`] carrying that error.
pub type ProgressCallback = Arc<dyn Fn(&Progress) -> std::result::Result<(), BoxError> + Send + Sync>;

/// Configuration for one transfer.
///
/// # Examples
///
/// ```
/// use paceline_fetch::FetchOptions;
/// use std::time::Duration;
///
/// let options = FetchOptions::default()
///     .method("post")
///     .body("{\"asd\": \"test\"}")
///     .header("X-My-Header", "Gopher")
///     .timeout(Duration::from_secs(10))
///     .report_interval(Duration::from_millis(500))
///     .max_speed(3 * 1024 * 1024)
///     .follow_redirects(false);
/// ```
pub struct FetchOptions {
    /// HTTP method, upper-cased on resolution. Default: `GET`.
    pub method: Option<String>,

    /// Request payload. Default: none.
    pub body: Option<RequestBody>,

    /// Request headers, in insertion order. Repeated names are all sent.
    pub headers: Vec<(String, String)>,

    /// Applies to both the dial and the idle-read phase unless the specific
    /// timeout is set.
    pub timeout: Option<Duration>,

    /// Dial-phase timeout; overrides `timeout`.
    pub dial_timeout: Option<Duration>,

    /// Longest tolerated stall while copying the body; overrides `timeout`.
    /// Measured in whole reporting intervals.
    pub read_timeout: Option<Duration>,

    /// Absolute deadline. Wins over `deadline_in`.
    pub deadline_at: Option<Instant>,

    /// Deadline relative to option resolution.
    pub deadline_in: Option<Duration>,

    /// How often snapshots are published. Default: 1 second.
    pub report_interval: Duration,

    /// Throughput cap in bytes per second; `Some(0)` means unlimited.
    /// `None` keeps whatever the supplied [`Control`] already carries.
    pub max_speed: Option<u64>,

    /// Default: `true`, up to 10 requests per dial.
    pub follow_redirects: bool,

    /// Default: `false`.
    pub disable_compression: bool,

    /// Caller-owned storage receiving live snapshots.
    pub progress_slot: Option<ProgressSlot>,

    /// Caller-owned handle for stopping or re-capping the transfer.
    pub control: Option<Control>,

    /// Invoked on every phase transition and every reporting tick.
    pub on_progress: Option<ProgressCallback>,
}

impl fmt::Debug for FetchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchOptions")
            .field("method", &self.method)
            .field("body", &self.body)
            .field("headers", &self.headers)
            .field("timeout", &self.timeout)
            .field("dial_timeout", &self.dial_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("deadline_at", &self.deadline_at)
            .field("deadline_in", &self.deadline_in)
            .field("report_interval", &self.report_interval)
            .field("max_speed", &self.max_speed)
            .field("follow_redirects", &self.follow_redirects)
            .field("disable_compression", &self.disable_compression)
            .field("control", &self.control)
            .field("on_progress", &self.on_progress.as_ref().map(|_| "{ ... }"))
            .finish_non_exhaustive()
    }
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            method: None,
            body: None,
            headers: Vec::new(),
            timeout: None,
            dial_timeout: None,
            read_timeout: None,
            deadline_at: None,
            deadline_in: None,
            report_interval: DEFAULT_REPORT_INTERVAL,
            max_speed: None,
            follow_redirects: true,
            disable_compression: false,
            progress_slot: None,
            control: None,
            on_progress: None,
        }
    }
}

impl FetchOptions {
    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Add a single request header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Replace all request headers.
    #[must_use]
    pub fn headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn deadline_at(mut self, at: impl Into<Instant>) -> Self {
        self.deadline_at = Some(at.into());
        self
    }

    #[must_use]
    pub fn deadline_in(mut self, within: Duration) -> Self {
        self.deadline_in = Some(within);
        self
    }

    #[must_use]
    pub fn report_interval(mut self, interval: Duration) -> Self {
        self.report_interval = interval;
        self
    }

    #[must_use]
    pub fn max_speed(mut self, bytes_per_second: u64) -> Self {
        self.max_speed = Some(bytes_per_second);
        self
    }

    #[must_use]
    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    #[must_use]
    pub fn disable_compression(mut self, disable: bool) -> Self {
        self.disable_compression = disable;
        self
    }

    #[must_use]
    pub fn progress_slot(mut self, slot: ProgressSlot) -> Self {
        self.progress_slot = Some(slot);
        self
    }

    #[must_use]
    pub fn control(mut self, control: Control) -> Self {
        self.control = Some(control);
        self
    }

    /// Set the progress callback.
    ///
    /// # Examples
    ///
    /// ```
    /// use paceline_fetch::{FetchOptions, FetchPhase};
    ///
    /// let options = FetchOptions::default().on_progress(|progress| {
    ///     if progress.phase == FetchPhase::Downloading {
    ///         println!("{} {}", progress.percent_string(), progress.speed_string());
    ///     }
    ///     Ok(())
    /// });
    /// ```
    #[must_use]
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Progress) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    /// Validates the options and splits them into what the dial needs, what
    /// the timing policies need and who gets told about progress.
    ///
    /// Relative deadlines are anchored here, and the snapshot slot is reset to
    /// a fresh connecting-phase snapshot.
    pub fn resolve(self) -> Result<(RequestParts, TransferSettings, Observer)> {
        let report_interval = core::report_period(self.report_interval)?;
        let method = parse_method(self.method.as_deref())?;
        let headers = parse_headers(&self.headers)?;

        let (dial_timeout, read_timeout) =
            core::resolve_timeouts(self.timeout, self.dial_timeout, self.read_timeout);
        let deadline = core::resolve_deadline(self.deadline_at, self.deadline_in, Instant::now());

        let settings = TransferSettings {
            dial_timeout,
            read_timeout,
            deadline,
            report_interval,
            follow_redirects: self.follow_redirects,
            disable_compression: self.disable_compression,
        };

        let control = self.control.unwrap_or_default();
        if let Some(cap) = self.max_speed {
            control.set_speed_cap(cap);
        }
        let slot = self.progress_slot.unwrap_or_default();
        slot.reset(Progress::connecting(report_interval));

        let request = RequestParts { method, headers, body: self.body };
        let observer = Observer::new(self.on_progress, control, slot);
        Ok((request, settings, observer))
    }
}

fn parse_method(method: Option<&str>) -> Result<Method> {
    let Some(name) = method else {
        return Ok(Method::GET);
    };
    let upper = name.trim().to_ascii_uppercase();
    if upper.is_empty() {
        return Err(FetchError::InvalidRequest("empty method".into()));
    }
    Method::from_bytes(upper.as_bytes())
        .map_err(|e| FetchError::InvalidRequest(format!("method {name:?}: {e}")))
}

fn parse_headers(headers: &[(String, String)]) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.trim().as_bytes())
            .map_err(|e| FetchError::InvalidRequest(format!("header name {name:?}: {e}")))?;
        let header_value = HeaderValue::from_str(value.trim())
            .map_err(|e| FetchError::InvalidRequest(format!("header {name}: {e}")))?;
        map.append(header_name, header_value);
    }
    Ok(map)
}
