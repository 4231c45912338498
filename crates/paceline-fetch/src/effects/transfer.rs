//! Body-copy phase: the copy worker races a reporting ticker.

use tokio::io::AsyncWrite;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, trace, warn};

use super::http::Response;
use super::sink::{BodyReader, ThrottledSink, WindowMeter, copy_body};
use crate::core;
use crate::data::{BodyStream, FetchPhase, Observer, Progress, TransferSettings};
use crate::error::{FetchError, Result};

/// The readable half of a response.
pub struct TransferSource {
    pub body: BodyStream,
    pub content_length: Option<u64>,
}

impl From<Response> for TransferSource {
    fn from(response: Response) -> Self {
        Self { body: response.body, content_length: response.content_length }
    }
}

impl std::fmt::Debug for TransferSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferSource")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Drains `source` into `sink`, publishing a snapshot every reporting interval.
///
/// Each tick, in order: a pending stop request fails the transfer with
/// [`FetchError::UserStopped`]; the snapshot is refreshed and handed to the
/// callback; the idle-read and deadline policies are applied; the sink's
/// throttling window is rolled over with the current speed cap. When the
/// copy finishes the final snapshot carries the whole-transfer average speed.
///
/// The copy runs in this task, so returning on any path drops it together
/// with the body stream. A read stalled on the peer is abandoned at the tick
/// that gives up on it.
pub async fn transfer<W>(
    source: TransferSource,
    sink: &mut W,
    settings: &TransferSettings,
    observer: &Observer,
) -> Result<Progress>
where
    W: AsyncWrite + Unpin + Send,
{
    let interval = core::report_period(settings.report_interval)?;
    let control = observer.control();
    let content_length = source.content_length;

    let started = Instant::now();
    observer.publish(|p| {
        p.phase = FetchPhase::Downloading;
        p.started_at = Some(started);
        p.bytes_transferred = 0;
        p.content_length = content_length;
        p.instant_rate = 0;
        p.report_interval = interval;
    })?;
    debug!(length = ?content_length, cap = control.speed_cap(), "transfer started");

    let meter = WindowMeter::new(started);
    let first_end = core::window_end(started, interval);
    meter.roll(first_end, core::window_cap(control.speed_cap(), interval));

    let mut reader = BodyReader::new(source.body);
    let worker = async {
        let mut throttled = ThrottledSink::new(sink, &meter);
        copy_body(&mut reader, &mut throttled, control).await
    };
    tokio::pin!(worker);

    let mut ticker = interval_at(first_end, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut last_total = 0;
    let mut idle_ticks = 0u32;

    loop {
        tokio::select! {
            biased;
            _ = ticker.tick() => {
                if control.stop_requested() {
                    debug!(bytes = meter.total(), "stop requested");
                    return Err(FetchError::UserStopped);
                }

                let total = meter.total();
                let window_bytes = total - last_total;
                last_total = total;

                let snapshot = observer.publish(|p| {
                    p.bytes_transferred = total;
                    p.instant_rate = core::instant_rate(window_bytes, interval);
                })?;
                trace!(bytes = total, rate = snapshot.instant_rate, "tick");
                warn_overlong(&snapshot);

                idle_ticks = if window_bytes == 0 { idle_ticks.saturating_add(1) } else { 0 };
                if core::idle_exceeded(idle_ticks, interval, settings.read_timeout) {
                    warn!(idle_ticks, ?interval, "no data received within read timeout");
                    return Err(FetchError::ReadTimeout);
                }
                let now = Instant::now();
                if core::deadline_passed(settings.deadline, now) {
                    warn!(bytes = total, "deadline reached before transfer finished");
                    return Err(FetchError::DeadlineExceeded);
                }

                let cap = core::window_cap(control.speed_cap(), interval);
                meter.roll(core::window_end(now, interval), cap);
            }
            result = &mut worker => {
                result?;
                break;
            }
        }
    }

    let total = meter.total();
    let snapshot = observer.publish(|p| {
        p.bytes_transferred = total;
        p.finish(Instant::now());
    })?;
    warn_overlong(&snapshot);
    debug!(bytes = total, elapsed = ?snapshot.elapsed, rate = snapshot.instant_rate, "transfer finished");
    Ok(snapshot)
}

fn warn_overlong(progress: &Progress) {
    if let (Some(fraction), Some(length)) = (progress.fraction, progress.content_length)
        && fraction > 1.0
    {
        warn!(bytes = progress.bytes_transferred, length, "body exceeds declared length");
    }
}
