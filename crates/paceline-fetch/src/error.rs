//! Error types for paceline-fetch.

use std::io;
use thiserror::Error;

/// Boxed error used for opaque failures crossing the crate boundary:
/// transport errors from the HTTP client and errors returned by progress callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T> = std::result::Result<T, FetchError>;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("dial timeout")]
    DialTimeout,

    #[error("stopped after {} redirects", crate::core::MAX_REDIRECTS)]
    TooManyRedirects,

    #[error("following redirects not allowed")]
    RedirectsDisabled,

    #[error("aborted by progress callback: {0}")]
    UserAborted(#[source] BoxError),

    #[error("read timeout")]
    ReadTimeout,

    #[error("deadline reached")]
    DeadlineExceeded,

    #[error("transfer stopped through control handle")]
    UserStopped,

    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    #[error("sink I/O error: {0}")]
    Io(#[from] io::Error),
}

impl FetchError {
    pub fn transport(e: impl Into<BoxError>) -> Self { FetchError::Transport(e.into()) }

    /// Returns `true` for failures the caller asked for, either through the
    /// progress callback or the control handle.
    pub fn is_user_initiated(&self) -> bool {
        matches!(self, FetchError::UserAborted(_) | FetchError::UserStopped)
    }

    /// Returns `true` for the timing policies: dial timeout, idle read timeout
    /// and the absolute deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            FetchError::DialTimeout | FetchError::ReadTimeout | FetchError::DeadlineExceeded
        )
    }
}

#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_builder() {
            FetchError::InvalidRequest(e.to_string())
        } else {
            FetchError::Transport(Box::new(e))
        }
    }
}
