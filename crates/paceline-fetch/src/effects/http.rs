use std::future::Future;
use std::time::Duration;

use http::{HeaderMap, Method, StatusCode};
use url::Url;

use super::dial::RedirectPolicy;
use crate::data::{BodyStream, RequestBody};
use crate::error::Result;

/// Everything a client needs to issue one request.
#[derive(Debug)]
pub struct DialRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<RequestBody>,

    /// Bound on establishing the TCP connection.
    pub connect_timeout: Option<Duration>,

    /// When `false`, compressed transfer encodings are neither requested nor decoded.
    pub disable_compression: bool,

    /// Must be consulted on every redirect hop. Whether redirects are
    /// followed at all is part of the policy.
    pub redirects: RedirectPolicy,
}

/// Final response: headers plus an unread body.
pub struct Response {
    pub status: StatusCode,
    /// URL after all redirects.
    pub url: Url,
    pub headers: HeaderMap,
    pub content_length: Option<u64>,
    pub body: BodyStream,
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("url", &self.url.as_str())
            .field("headers", &self.headers)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Asynchronous HTTP client abstraction.
///
/// This is the whole contract with the network: issue a request and produce
/// response headers plus a readable body, or fail. Connection pooling, DNS
/// and TLS are the implementation's business.
///
/// # Implementations
///
/// - [`ReqwestClient`]: production implementation using `reqwest`
/// - Scripted clients in tests
pub trait HttpClient: Send + Sync {
    /// Issue the request, following redirects as `request.redirects` allows.
    ///
    /// # Errors
    ///
    /// A refused redirect must surface as the error recorded by
    /// [`RedirectPolicy::take_refusal`]; anything else the transport reports
    /// maps to [`FetchError::Transport`](crate::FetchError::Transport).
    fn execute(&self, request: DialRequest) -> impl Future<Output = Result<Response>> + Send;
}

#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use futures_util::TryStreamExt;

    use super::*;
    use crate::error::{BoxError, FetchError};

    /// Production HTTP client implementation using reqwest.
    ///
    /// Compression and redirect handling are client-level switches in reqwest,
    /// so a client is built for every request.
    #[derive(Debug, Clone, Default)]
    pub struct ReqwestClient {
        user_agent: Option<String>,
    }

    impl ReqwestClient {
        pub fn new() -> Self { Self::default() }

        #[must_use]
        pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
            self.user_agent = Some(user_agent.into());
            self
        }

        fn build(&self, request: &DialRequest) -> Result<reqwest::Client> {
            let compression = !request.disable_compression;
            let policy = request.redirects.clone();
            let mut builder = reqwest::Client::builder()
                .gzip(compression)
                .brotli(compression)
                .deflate(compression)
                .redirect(reqwest::redirect::Policy::custom(move |attempt| {
                    match policy.check(attempt.url(), attempt.previous().len()) {
                        Ok(()) => attempt.follow(),
                        Err(refused) => attempt.error(refused),
                    }
                }));
            if let Some(timeout) = request.connect_timeout {
                builder = builder.connect_timeout(timeout);
            }
            if let Some(ref agent) = self.user_agent {
                builder = builder.user_agent(agent);
            }
            builder.build().map_err(FetchError::transport)
        }
    }

    impl HttpClient for ReqwestClient {
        async fn execute(&self, request: DialRequest) -> Result<Response> {
            let client = self.build(&request)?;
            let DialRequest { method, url, headers, body, redirects, .. } = request;

            let mut builder = client.request(method, url).headers(headers);
            match body {
                Some(RequestBody::Full(bytes)) => builder = builder.body(bytes),
                Some(RequestBody::Stream(stream)) => {
                    builder = builder.body(reqwest::Body::wrap_stream(stream))
                }
                None => {}
            }

            let response = match builder.send().await {
                Ok(response) => response,
                Err(e) => return Err(redirects.take_refusal().unwrap_or_else(|| e.into())),
            };

            let status = response.status();
            let url = response.url().clone();
            let headers = response.headers().clone();
            let content_length = response.content_length();
            let body = response.bytes_stream().map_err(|e| -> BoxError { Box::new(e) });

            Ok(Response { status, url, headers, content_length, body: Box::pin(body) })
        }
    }
}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::ReqwestClient;
