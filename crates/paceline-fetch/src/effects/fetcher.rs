use std::path::Path;

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use url::Url;

use super::dial::dial;
use super::http::{HttpClient, Response};
use super::transfer::{TransferSource, transfer};
use crate::data::{FetchOptions, Progress};
use crate::error::Result;

/// Outcome of a completed transfer.
#[derive(Debug, Clone)]
pub struct Fetched<T> {
    pub status: StatusCode,
    /// URL of the final response, after redirects.
    pub url: Url,
    pub headers: HeaderMap,
    /// The finished snapshot.
    pub progress: Progress,
    pub body: T,
}

impl<T> Fetched<T> {
    fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetched<U> {
        Fetched {
            status: self.status,
            url: self.url,
            headers: self.headers,
            progress: self.progress,
            body: f(self.body),
        }
    }
}

/// Composes the dial and the transfer around a chosen sink.
///
/// Non-success status codes are not errors: the body is transferred and the
/// status is reported in [`Fetched::status`].
pub struct Fetcher<C: HttpClient> {
    pub(crate) client: C,
}

impl<C: HttpClient> Fetcher<C> {
    pub fn new(client: C) -> Self { Self { client } }

    pub fn client(&self) -> &C { &self.client }

    /// Transfer the response body into `sink`.
    pub async fn write_to<W>(&self, url: &str, sink: &mut W, options: FetchOptions) -> Result<Fetched<()>>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let (request, settings, observer) = options.resolve()?;
        let Response { status, url, headers, content_length, body } =
            dial(&self.client, url, request, &settings, &observer).await?;

        let progress = transfer(TransferSource { body, content_length }, sink, &settings, &observer).await?;
        Ok(Fetched { status, url, headers, progress, body: () })
    }

    pub async fn fetch_bytes(&self, url: &str, options: FetchOptions) -> Result<Fetched<Bytes>> {
        let mut buffer = Vec::new();
        let fetched = self.write_to(url, &mut buffer, options).await?;
        Ok(fetched.map(|()| Bytes::from(buffer)))
    }

    /// Invalid UTF-8 sequences are replaced with `U+FFFD`.
    pub async fn fetch_string(&self, url: &str, options: FetchOptions) -> Result<Fetched<String>> {
        let mut buffer = Vec::new();
        let fetched = self.write_to(url, &mut buffer, options).await?;
        Ok(fetched.map(|()| match String::from_utf8(buffer) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }))
    }

    /// Create (or truncate) the file at `path` and transfer into it.
    ///
    /// The file is created before dialing and closed on every path; a failed
    /// transfer leaves whatever was written so far.
    pub async fn fetch_file(
        &self,
        url: &str,
        path: impl AsRef<Path>,
        options: FetchOptions,
    ) -> Result<Fetched<()>> {
        let mut file = tokio::fs::File::create(path.as_ref()).await?;
        let fetched = self.write_to(url, &mut file, options).await?;
        file.flush().await?;
        Ok(fetched)
    }
}
