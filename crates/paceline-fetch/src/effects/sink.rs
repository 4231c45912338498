//! Throttled copying from a body stream into a sink.
//!
//! Two throttles cooperate, both driven by the same speed cap:
//!
//! - the copy worker moves data in one-second chunks of `speed_cap` bytes and
//!   sleeps out whatever is left of the second after each chunk;
//! - the sink counts bytes per reporting window and, once a window's budget
//!   (`speed_cap * interval`) is spent, parks the writer until the window ends.
//!
//! The second one smooths bursts inside a chunk so per-window speed readings
//! do not saw-tooth. The monitor loop rolls the window over on every tick.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::{Instant, sleep, sleep_until};

use crate::data::{BodyStream, Control};
use crate::error::{FetchError, Result};

const CHUNK_PERIOD: Duration = Duration::from_secs(1);

/// Byte counters shared by the sink and the monitor loop.
#[derive(Debug)]
pub(crate) struct WindowMeter {
    origin: Instant,
    total: AtomicU64,
    window: AtomicU64,
    window_cap: AtomicU64,
    window_end: AtomicU64,
}

impl WindowMeter {
    pub(crate) fn new(origin: Instant) -> Self {
        Self {
            origin,
            total: AtomicU64::new(0),
            window: AtomicU64::new(0),
            window_cap: AtomicU64::new(0),
            window_end: AtomicU64::new(0),
        }
    }

    /// Starts a new window ending at `end` with a budget of `cap` bytes
    /// (0 = unlimited).
    pub(crate) fn roll(&self, end: Instant, cap: u64) {
        let offset = end.saturating_duration_since(self.origin).as_nanos();
        self.window_end.store(u64::try_from(offset).unwrap_or(u64::MAX), Ordering::SeqCst);
        self.window_cap.store(cap, Ordering::SeqCst);
        self.window.store(0, Ordering::SeqCst);
    }

    pub(crate) fn total(&self) -> u64 { self.total.load(Ordering::SeqCst) }

    fn record(&self, n: u64) {
        self.total.fetch_add(n, Ordering::SeqCst);
        self.window.fetch_add(n, Ordering::SeqCst);
    }

    /// End of the current window, if its budget is overspent.
    fn exhausted_until(&self) -> Option<Instant> {
        let cap = self.window_cap.load(Ordering::SeqCst);
        if cap == 0 || self.window.load(Ordering::SeqCst) <= cap {
            return None;
        }
        let end = Duration::from_nanos(self.window_end.load(Ordering::SeqCst));
        Some(self.origin + end)
    }
}

/// Destination writer with per-window throttling.
pub(crate) struct ThrottledSink<'a, W> {
    inner: &'a mut W,
    meter: &'a WindowMeter,
}

impl<'a, W: AsyncWrite + Unpin> ThrottledSink<'a, W> {
    pub(crate) fn new(inner: &'a mut W, meter: &'a WindowMeter) -> Self { Self { inner, meter } }

    pub(crate) async fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.inner.write_all(buf).await?;
        self.meter.record(buf.len() as u64);
        if let Some(until) = self.meter.exhausted_until() {
            sleep_until(until).await;
            // let the monitor roll the window before writing again
            tokio::task::yield_now().await;
        }
        Ok(())
    }

    pub(crate) async fn flush(&mut self) -> io::Result<()> { self.inner.flush().await }
}

/// Response body with support for reading bounded pieces.
pub(crate) struct BodyReader {
    stream: BodyStream,
    pending: Bytes,
}

impl BodyReader {
    pub(crate) fn new(stream: BodyStream) -> Self { Self { stream, pending: Bytes::new() } }

    /// Next piece of at most `limit` bytes, or `None` at end of stream.
    async fn next_piece(&mut self, limit: usize) -> Result<Option<Bytes>> {
        while self.pending.is_empty() {
            match self.stream.next().await {
                Some(Ok(bytes)) => self.pending = bytes,
                Some(Err(e)) => return Err(FetchError::Transport(e)),
                None => return Ok(None),
            }
        }
        let take = limit.min(self.pending.len());
        Ok(Some(self.pending.split_to(take)))
    }
}

/// Copies up to `n` bytes, returning how many were moved. Fewer than `n`
/// means the body ended.
async fn copy_n<W: AsyncWrite + Unpin>(
    reader: &mut BodyReader,
    sink: &mut ThrottledSink<'_, W>,
    n: u64,
) -> Result<u64> {
    let mut moved = 0;
    while moved < n {
        let limit = usize::try_from(n - moved).unwrap_or(usize::MAX);
        let Some(piece) = reader.next_piece(limit).await? else {
            break;
        };
        sink.write_all(&piece).await?;
        moved += piece.len() as u64;
    }
    Ok(moved)
}

/// Drains the body into the sink until end of stream.
///
/// The speed cap is re-read before every piece (uncapped) or chunk (capped),
/// so changes through the control handle apply from the next boundary.
pub(crate) async fn copy_body<W: AsyncWrite + Unpin>(
    reader: &mut BodyReader,
    sink: &mut ThrottledSink<'_, W>,
    control: &Control,
) -> Result<()> {
    loop {
        let cap = control.speed_cap();
        if cap == 0 {
            match reader.next_piece(usize::MAX).await? {
                Some(piece) => sink.write_all(&piece).await?,
                None => break,
            }
            continue;
        }

        let chunk_started = Instant::now();
        let moved = copy_n(reader, sink, cap).await?;
        if moved < cap {
            break;
        }
        let spent = chunk_started.elapsed();
        if spent < CHUNK_PERIOD {
            sleep(CHUNK_PERIOD - spent).await;
        }
    }
    sink.flush().await?;
    Ok(())
}
