//! Dial phase: issue the request, report while waiting, police redirects.

use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::debug;
use url::Url;

use super::http::{DialRequest, HttpClient, Response};
use crate::core::{self, redirect_verdict};
use crate::data::{FetchPhase, Observer, RequestParts, TransferSettings};
use crate::error::{FetchError, Result};

/// Marker handed to the transport when a redirect is refused. The actual
/// reason is kept by the [`RedirectPolicy`].
#[derive(Debug, Error)]
#[error("redirect refused")]
pub struct RedirectRefused;

/// Per-dial redirect interceptor.
///
/// Each hop is checked against the follow switch and the hop limit, then
/// reported to the observer as [`FetchPhase::Redirecting`]; the callback may
/// veto it. The first refusal is recorded so the client can return it once
/// the transport has unwound.
#[derive(Debug, Clone)]
pub struct RedirectPolicy {
    follow: bool,
    observer: Observer,
    refusal: Arc<Mutex<Option<FetchError>>>,
}

impl RedirectPolicy {
    pub fn new(follow: bool, observer: Observer) -> Self {
        Self { follow, observer, refusal: Arc::new(Mutex::new(None)) }
    }

    pub fn follows(&self) -> bool { self.follow }

    /// Vets the hop to `target`. `previous` counts the requests already made
    /// for this dial, the original one included.
    pub fn check(&self, target: &Url, previous: usize) -> std::result::Result<(), RedirectRefused> {
        let verdict = redirect_verdict(self.follow, previous).and_then(|()| {
            debug!(%target, hop = previous, "following redirect");
            self.observer
                .publish(|p| {
                    p.phase = FetchPhase::Redirecting;
                    p.redirect_target = Some(target.clone());
                })
                .map(drop)
        });

        verdict.map_err(|reason| {
            debug!(%target, %reason, "redirect refused");
            let mut slot = self.refusal.lock().unwrap_or_else(PoisonError::into_inner);
            slot.get_or_insert(reason);
            RedirectRefused
        })
    }

    /// The reason the first refused hop was refused, if any.
    pub fn take_refusal(&self) -> Option<FetchError> {
        self.refusal.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}

/// Issues the request and waits for the response headers.
///
/// The request runs concurrently with a reporting ticker: `connecting` is
/// published immediately and again on every tick until the response arrives.
/// Each tick also enforces the dial timeout. Once headers are in,
/// `header-received` is published; a callback abort at that point drops the
/// response, releasing its body.
pub async fn dial<C: HttpClient>(
    client: &C,
    url: &str,
    request: RequestParts,
    settings: &TransferSettings,
    observer: &Observer,
) -> Result<Response> {
    let url = Url::parse(url).map_err(|e| FetchError::InvalidRequest(format!("url {url:?}: {e}")))?;
    let period = core::report_period(settings.report_interval)?;
    let RequestParts { method, headers, body } = request;
    debug!(%method, %url, "dialing");

    let dial_request = DialRequest {
        method,
        url,
        headers,
        body,
        connect_timeout: settings.dial_timeout,
        disable_compression: settings.disable_compression,
        redirects: RedirectPolicy::new(settings.follow_redirects, observer.clone()),
    };

    let started = Instant::now();
    observer.publish(|p| p.phase = FetchPhase::Connecting)?;

    let pending = client.execute(dial_request);
    tokio::pin!(pending);

    let mut ticker = interval_at(core::window_end(started, period), period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let response = loop {
        tokio::select! {
            biased;
            result = &mut pending => break result?,
            _ = ticker.tick() => {
                if let Some(limit) = settings.dial_timeout
                    && started.elapsed() >= limit
                {
                    debug!(?limit, "dial timed out");
                    return Err(FetchError::DialTimeout);
                }
                observer.publish(|p| {
                    p.phase = FetchPhase::Connecting;
                    p.redirect_target = None;
                })?;
            }
        }
    };

    debug!(status = %response.status, url = %response.url, length = ?response.content_length, "headers received");
    observer.publish(|p| {
        p.phase = FetchPhase::HeaderReceived;
        p.redirect_target = None;
        p.status = Some(response.status);
        p.headers = Some(Arc::new(response.headers.clone()));
        p.content_length = response.content_length;
    })?;

    Ok(response)
}
