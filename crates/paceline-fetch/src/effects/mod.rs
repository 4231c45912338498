//! Network and sink I/O behind the [`HttpClient`] seam.

mod dial;
mod fetcher;
mod http;
mod sink;
mod transfer;

pub use dial::{RedirectPolicy, RedirectRefused, dial};
pub use fetcher::{Fetched, Fetcher};
pub use http::{DialRequest, HttpClient, Response};
pub use transfer::{TransferSource, transfer};

#[cfg(feature = "reqwest")]
pub use http::ReqwestClient;
