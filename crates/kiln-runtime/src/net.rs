//! Blocking HTTP retrieval.
//!
//! Every network read in kiln goes through the `Fetch` seam so tests can
//! substitute an in-memory fetcher and count requests.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use tracing::debug;

use crate::error::RuntimeError;

/// Connect and read timeouts applied to every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Time allowed to establish the connection.
    pub connect: Duration,
    /// Time allowed for the whole response body.
    pub read: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_millis(8_000),
            read: Duration::from_millis(20_000),
        }
    }
}

/// Retrieves the full body of a URL.
pub trait Fetch: Send + Sync {
    /// Returns the response body of a 2xx GET on `url`.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeError::Network` on transport failure or a non-2xx status.
    fn get(&self, url: &str) -> Result<Vec<u8>, RuntimeError>;
}

/// `Fetch` implementation over a blocking reqwest client.
///
/// Follows up to ten redirects. Never retries.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Builds a client with the given timeouts.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeError::Internal` if the TLS backend cannot initialise.
    pub fn new(timeouts: Timeouts) -> Result<Self, RuntimeError> {
        let client = Client::builder()
            .connect_timeout(timeouts.connect)
            .timeout(timeouts.read)
            .redirect(Policy::limited(10))
            .user_agent(concat!("kiln/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RuntimeError::internal("http_client", "build", e))?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    #[tracing::instrument(skip(self))]
    fn get(&self, url: &str) -> Result<Vec<u8>, RuntimeError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| RuntimeError::transport(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RuntimeError::http_status(url, status.as_u16()));
        }

        let body = response
            .bytes()
            .map_err(|e| RuntimeError::transport(url, e))?;
        debug!(bytes = body.len(), "fetched");
        Ok(body.to_vec())
    }
}
