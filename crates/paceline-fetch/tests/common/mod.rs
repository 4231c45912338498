//! Scripted HTTP client and progress recorder shared by the integration tests.

#![allow(dead_code)]

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures_util::stream;
use paceline_fetch::http::{HeaderMap, Method, StatusCode};
use paceline_fetch::url::Url;
use paceline_fetch::{
    BodyStream, BoxError, DialRequest, FetchError, FetchPhase, HttpClient, Progress, Response,
    Result,
};
use tokio::io::AsyncWrite;
use tokio::time::Instant;

pub const PIECE: usize = 100;

/// Serves a body of `length` zero bytes in `PIECE`-sized pieces, optionally
/// after a delay, a chain of redirects or a stall.
#[derive(Debug, Clone)]
pub struct ScriptedClient {
    pub delay: Duration,
    pub hops: usize,
    pub length: u64,
    pub declared_length: Option<u64>,
    pub stall_after: Option<u64>,
    pub fail_after: Option<u64>,
    pub released: Arc<AtomicBool>,
    pub requests: Arc<Mutex<Vec<(Method, Url, HeaderMap)>>>,
}

impl ScriptedClient {
    pub fn new(length: u64) -> Self {
        Self {
            delay: Duration::ZERO,
            hops: 0,
            length,
            declared_length: Some(length),
            stall_after: None,
            fail_after: None,
            released: Arc::new(AtomicBool::new(false)),
            requests: Arc::default(),
        }
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn hops(mut self, hops: usize) -> Self {
        self.hops = hops;
        self
    }

    pub fn stall_after(mut self, bytes: u64) -> Self {
        self.stall_after = Some(bytes);
        self
    }

    /// Breaks the body with a transport error once `bytes` have been served.
    pub fn fail_after(mut self, bytes: u64) -> Self {
        self.fail_after = Some(bytes);
        self
    }

    pub fn body_released(&self) -> bool { self.released.load(Ordering::SeqCst) }

    fn body(&self) -> BodyStream {
        let cut = self.stall_after.or(self.fail_after);
        let served = cut.map_or(self.length, |n| n.min(self.length));
        let stalls = self.stall_after.is_some();
        let fails = self.fail_after.is_some();
        let guard = ReleaseGuard(Arc::clone(&self.released));

        let pieces = stream::unfold((served, fails, guard), move |(left, fails, guard)| async move {
            if left == 0 {
                if stalls {
                    std::future::pending::<()>().await;
                }
                if fails {
                    let err: std::result::Result<Bytes, BoxError> = Err("connection reset".into());
                    return Some((err, (0, false, guard)));
                }
                return None;
            }
            let n = left.min(PIECE as u64);
            let piece: std::result::Result<Bytes, BoxError> = Ok(Bytes::from(vec![0u8; n as usize]));
            Some((piece, (left - n, fails, guard)))
        });
        Box::pin(pieces)
    }
}

impl HttpClient for ScriptedClient {
    async fn execute(&self, request: DialRequest) -> Result<Response> {
        self.requests.lock().unwrap().push((
            request.method.clone(),
            request.url.clone(),
            request.headers.clone(),
        ));
        tokio::time::sleep(self.delay).await;

        let mut url = request.url.clone();
        for hop in 0..self.hops {
            let target = url.join(&format!("/hop/{}", hop + 1)).unwrap();
            if request.redirects.check(&target, hop + 1).is_err() {
                return Err(request
                    .redirects
                    .take_refusal()
                    .unwrap_or_else(|| FetchError::transport("redirect refused")));
            }
            url = target;
        }

        let mut headers = HeaderMap::new();
        headers.insert("server", "scripted".parse().unwrap());
        Ok(Response {
            status: StatusCode::OK,
            url,
            headers,
            content_length: self.declared_length,
            body: self.body(),
        })
    }
}

/// Accepts `capacity` bytes, then fails every write.
#[derive(Debug)]
pub struct FullDisk {
    pub capacity: usize,
    pub written: usize,
}

impl FullDisk {
    pub fn new(capacity: usize) -> Self { Self { capacity, written: 0 } }
}

impl AsyncWrite for FullDisk {
    fn poll_write(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if self.written + buf.len() > self.capacity {
            return Poll::Ready(Err(io::Error::other("disk full")));
        }
        self.written += buf.len();
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Flags the body as released when the stream is dropped.
#[derive(Debug)]
struct ReleaseGuard(Arc<AtomicBool>);

impl Drop for ReleaseGuard {
    fn drop(&mut self) { self.0.store(true, Ordering::SeqCst); }
}

/// One observed callback: time since recording began and the snapshot.
#[derive(Debug, Clone)]
pub struct Seen {
    pub at: Duration,
    pub progress: Progress,
}

/// Collects every snapshot handed to a progress callback.
#[derive(Debug, Clone)]
pub struct Recorder {
    origin: Instant,
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl Recorder {
    pub fn start() -> Self { Self { origin: Instant::now(), seen: Arc::default() } }

    pub fn callback(&self) -> impl Fn(&Progress) -> std::result::Result<(), BoxError> + Send + Sync + 'static {
        let recorder = self.clone();
        move |progress| {
            recorder.record(progress);
            Ok(())
        }
    }

    pub fn record(&self, progress: &Progress) {
        let at = self.origin.elapsed();
        self.seen.lock().unwrap().push(Seen { at, progress: progress.clone() });
    }

    pub fn seen(&self) -> Vec<Seen> { self.seen.lock().unwrap().clone() }

    pub fn in_phase(&self, phase: FetchPhase) -> Vec<Seen> {
        self.seen().into_iter().filter(|s| s.progress.phase == phase).collect()
    }

    /// Phases in callback order with consecutive repeats collapsed.
    pub fn phases(&self) -> Vec<FetchPhase> {
        let mut phases: Vec<FetchPhase> = self.seen().iter().map(|s| s.progress.phase).collect();
        phases.dedup();
        phases
    }
}

pub fn secs(s: u64) -> Duration { Duration::from_secs(s) }
