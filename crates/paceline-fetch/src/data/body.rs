use std::fmt;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::{Stream, TryStreamExt};

use crate::error::BoxError;

/// A boxed, sendable stream.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// Response body as handed over by an [`HttpClient`](crate::HttpClient).
/// Dropping it releases the underlying connection.
pub type BodyStream = BoxStream<'static, Result<Bytes, BoxError>>;

/// Request payload: either a buffer or a readable stream passed through as-is.
pub enum RequestBody {
    Full(Bytes),
    Stream(BodyStream),
}

impl RequestBody {
    pub fn stream<S, E>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        RequestBody::Stream(Box::pin(stream.map_err(|e| -> BoxError { e.into() })))
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestBody::Full(bytes) => f.debug_tuple("Full").field(&bytes.len()).finish(),
            RequestBody::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<Bytes> for RequestBody {
    fn from(bytes: Bytes) -> Self { RequestBody::Full(bytes) }
}

impl From<Vec<u8>> for RequestBody {
    fn from(bytes: Vec<u8>) -> Self { RequestBody::Full(bytes.into()) }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self { RequestBody::Full(text.into()) }
}

impl From<&'static str> for RequestBody {
    fn from(text: &'static str) -> Self { RequestBody::Full(Bytes::from_static(text.as_bytes())) }
}
