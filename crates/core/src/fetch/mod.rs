//! Page retrieval with at most one request in flight.
//!
//! The network itself sits behind [`Transport`]; the reqwest-backed
//! [`HttpTransport`] is gated behind the "fetch" feature flag.

#[cfg(feature = "fetch")]
mod http;

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;

use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::error::{NavigationError, TransportError};

#[cfg(feature = "fetch")]
pub use http::{FetchConfig, HttpTransport};

/// A completed HTTP exchange, whatever its status.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    /// Final URL after redirects.
    pub url: Url,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues a GET for a page. Implementations report transport-level failures
/// only; status handling is the caller's job.
pub trait Transport {
    fn get(
        &self,
        url: &Url,
        headers: &[(&str, &str)],
    ) -> impl Future<Output = Result<RawResponse, TransportError>>;
}

impl<T: Transport + ?Sized> Transport for Rc<T> {
    fn get(
        &self,
        url: &Url,
        headers: &[(&str, &str)],
    ) -> impl Future<Output = Result<RawResponse, TransportError>> {
        (**self).get(url, headers)
    }
}

struct InFlight {
    id: u64,
    token: CancellationToken,
}

/// Wraps a transport so that starting a fetch cancels whatever fetch is still
/// outstanding.
pub struct Fetcher<T> {
    transport: T,
    header: String,
    inflight: RefCell<Option<InFlight>>,
    next_id: Cell<u64>,
}

impl<T: Transport> Fetcher<T> {
    /// `header` is the marker header name; it is always sent with value `true`.
    pub fn new(transport: T, header: impl Into<String>) -> Self {
        Self {
            transport,
            header: header.into(),
            inflight: RefCell::new(None),
            next_id: Cell::new(0),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Whether a fetch is outstanding.
    pub fn is_busy(&self) -> bool {
        self.inflight.borrow().is_some()
    }

    /// Fetch the page body. Fails with `Cancelled` when a newer fetch or an
    /// explicit [`Fetcher::cancel`] supersedes this one before it completes.
    pub async fn fetch(&self, url: &Url) -> Result<String, NavigationError> {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        let token = CancellationToken::new();
        if let Some(previous) = self.inflight.replace(Some(InFlight {
            id,
            token: token.clone(),
        })) {
            debug!(url = %url, "superseding outstanding fetch");
            previous.token.cancel();
        }

        let headers = [(self.header.as_str(), "true")];
        let result = tokio::select! {
            biased;
            _ = token.cancelled() => Err(NavigationError::Cancelled),
            response = self.transport.get(url, &headers) => match response {
                Ok(response) if response.is_success() => Ok(response.body),
                Ok(response) => Err(NavigationError::HttpStatus(response.status)),
                Err(e) => Err(NavigationError::Network(e.to_string())),
            },
        };

        self.settle(id);
        result
    }

    /// Cancel the outstanding fetch, if any.
    pub fn cancel(&self) {
        if let Some(previous) = self.inflight.take() {
            previous.token.cancel();
        }
    }

    fn settle(&self, id: u64) {
        let mut slot = self.inflight.borrow_mut();
        if slot.as_ref().is_some_and(|f| f.id == id) {
            *slot = None;
        }
    }
}
