//! Dial-phase behaviour: connecting ticks, timeouts and redirect policy.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use common::{Recorder, ScriptedClient, secs};
use paceline_fetch::http::Method;
use paceline_fetch::{
    FetchError, FetchOptions, FetchPhase, Fetcher, Observer, RequestParts, TransferSettings, dial,
    transfer,
};
use tokio::time::Instant;

const URL: &str = "http://example.com/start";

#[tokio::test(start_paused = true)]
async fn test_connecting_is_reported_every_tick() {
    let recorder = Recorder::start();
    let fetcher = Fetcher::new(ScriptedClient::new(10).delay(Duration::from_millis(2500)));
    let options = FetchOptions::default().on_progress(recorder.callback());

    fetcher.fetch_bytes(URL, options).await.unwrap();

    let connecting: Vec<Duration> =
        recorder.in_phase(FetchPhase::Connecting).iter().map(|s| s.at).collect();
    assert_eq!(connecting, vec![secs(0), secs(1), secs(2)]);
    let header = recorder.in_phase(FetchPhase::HeaderReceived);
    assert_eq!(header.len(), 1);
    assert_eq!(header[0].at, Duration::from_millis(2500));
    assert_eq!(header[0].progress.header("server"), Some("scripted"));
}

#[tokio::test(start_paused = true)]
async fn test_dial_timeout() {
    let recorder = Recorder::start();
    let fetcher = Fetcher::new(ScriptedClient::new(10).delay(secs(60)));
    let options =
        FetchOptions::default().dial_timeout(secs(3)).on_progress(recorder.callback());

    let started = Instant::now();
    let err = fetcher.fetch_bytes(URL, options).await.unwrap_err();

    assert!(matches!(err, FetchError::DialTimeout));
    assert_eq!(started.elapsed(), secs(3));
    assert_eq!(recorder.in_phase(FetchPhase::Connecting).len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_read_timeout_does_not_bound_dial() {
    let fetcher = Fetcher::new(ScriptedClient::new(10).delay(secs(5)));
    let options = FetchOptions::default().timeout(secs(1)).dial_timeout(secs(10));

    let fetched = fetcher.fetch_bytes(URL, options).await.unwrap();
    assert_eq!(fetched.body.len(), 10);
}

#[tokio::test(start_paused = true)]
async fn test_callback_abort_while_connecting() {
    let fetcher = Fetcher::new(ScriptedClient::new(10).delay(secs(60)));
    let counter = Arc::new(AtomicUsize::new(0));
    let options = FetchOptions::default().on_progress(move |p| {
        if p.phase == FetchPhase::Connecting
            && counter.fetch_add(1, Ordering::SeqCst) == 2
        {
            return Err("gave up waiting".into());
        }
        Ok(())
    });
    let started = Instant::now();
    let err = fetcher.fetch_bytes(URL, options).await.unwrap_err();
    assert!(matches!(err, FetchError::UserAborted(_)));
    assert_eq!(started.elapsed(), secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_redirect_abort_copies_nothing() {
    let recorder = Recorder::start();
    let client = ScriptedClient::new(1000).hops(3);
    let fetcher = Fetcher::new(client.clone());
    let seen = recorder.clone();
    let options = FetchOptions::default().on_progress(move |p| {
        seen.record(p);
        if p.phase == FetchPhase::Redirecting {
            return Err("no redirects".into());
        }
        Ok(())
    });

    let mut out = Vec::new();
    let err = fetcher.write_to(URL, &mut out, options).await.unwrap_err();

    assert!(matches!(err, FetchError::UserAborted(ref e) if e.to_string() == "no redirects"));
    assert!(out.is_empty());
    assert_eq!(recorder.phases(), vec![FetchPhase::Connecting, FetchPhase::Redirecting]);
    let hop = &recorder.in_phase(FetchPhase::Redirecting)[0];
    assert_eq!(hop.progress.redirect_target.as_ref().unwrap().path(), "/hop/1");
}

#[tokio::test(start_paused = true)]
async fn test_redirects_disabled() {
    let recorder = Recorder::start();
    let fetcher = Fetcher::new(ScriptedClient::new(10).hops(1));
    let options =
        FetchOptions::default().follow_redirects(false).on_progress(recorder.callback());

    let err = fetcher.fetch_bytes(URL, options).await.unwrap_err();
    assert!(matches!(err, FetchError::RedirectsDisabled));
    assert!(recorder.in_phase(FetchPhase::Redirecting).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_redirect_hop_limit() {
    let fetcher = Fetcher::new(ScriptedClient::new(10).hops(9));
    let fetched = fetcher.fetch_bytes(URL, FetchOptions::default()).await.unwrap();
    assert_eq!(fetched.url.path(), "/hop/9");

    let fetcher = Fetcher::new(ScriptedClient::new(10).hops(10));
    let err = fetcher.fetch_bytes(URL, FetchOptions::default()).await.unwrap_err();
    assert!(matches!(err, FetchError::TooManyRedirects));
    assert_eq!(err.to_string(), "stopped after 10 redirects");
}

#[tokio::test(start_paused = true)]
async fn test_header_abort_releases_body() {
    let client = ScriptedClient::new(1000);
    let fetcher = Fetcher::new(client.clone());
    let options = FetchOptions::default().on_progress(|p| match p.phase {
        FetchPhase::HeaderReceived => Err("not interested".into()),
        _ => Ok(()),
    });

    let err = fetcher.fetch_bytes(URL, options).await.unwrap_err();
    assert!(matches!(err, FetchError::UserAborted(_)));
    assert!(client.body_released());
}

#[tokio::test(start_paused = true)]
async fn test_request_parts_reach_client() {
    let client = ScriptedClient::new(10);
    let fetcher = Fetcher::new(client.clone());
    let options = FetchOptions::default()
        .method("put")
        .header("X-My-Header", "Gopher")
        .body("payload");

    fetcher.fetch_bytes(URL, options).await.unwrap();

    let requests = client.requests.lock().unwrap();
    let (method, url, headers) = &requests[0];
    assert_eq!(*method, Method::PUT);
    assert_eq!(url.as_str(), URL);
    assert_eq!(headers["x-my-header"], "Gopher");
}

#[tokio::test(start_paused = true)]
async fn test_invalid_request_fails_before_dial() {
    let client = ScriptedClient::new(10);
    let fetcher = Fetcher::new(client.clone());

    let err = fetcher.fetch_bytes(URL, FetchOptions::default().method("BAD METHOD")).await.unwrap_err();
    assert!(matches!(err, FetchError::InvalidRequest(_)));
    let err = fetcher.fetch_bytes("::not a url::", FetchOptions::default()).await.unwrap_err();
    assert!(matches!(err, FetchError::InvalidRequest(_)));
    assert!(client.requests.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_dial_and_transfer_compose_by_hand() {
    let recorder = Recorder::start();
    let options = FetchOptions::default().on_progress(recorder.callback());
    let (request, settings, observer) = options.resolve().unwrap();

    let response = dial(&ScriptedClient::new(640), URL, request, &settings, &observer).await.unwrap();
    assert_eq!(observer.control().snapshot().phase, FetchPhase::HeaderReceived);

    let mut out = Vec::new();
    let progress = transfer(response.into(), &mut out, &settings, &observer).await.unwrap();
    assert_eq!(out.len(), 640);
    assert_eq!(progress, observer.control().snapshot());
    assert_eq!(progress.status.map(|s| s.as_u16()), Some(200));
}

#[tokio::test(start_paused = true)]
async fn test_hand_built_settings_are_checked() {
    let client = ScriptedClient::new(10);
    let settings = TransferSettings { report_interval: Duration::ZERO, ..Default::default() };

    let err = dial(&client, URL, RequestParts::default(), &settings, &Observer::default())
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::InvalidRequest(_)));
    assert!(client.requests.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_huge_report_interval_dials() {
    let recorder = Recorder::start();
    let fetcher = Fetcher::new(ScriptedClient::new(10).delay(secs(3)));
    let options = FetchOptions::default()
        .report_interval(Duration::MAX)
        .deadline_in(Duration::MAX)
        .on_progress(recorder.callback());

    let fetched = fetcher.fetch_bytes(URL, options).await.unwrap();
    assert_eq!(fetched.body.len(), 10);
    assert_eq!(recorder.in_phase(FetchPhase::Connecting).len(), 1);
}
