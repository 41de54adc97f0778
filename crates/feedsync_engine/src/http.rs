//! HTTP client abstraction.
//!
//! The sync engine never opens sockets itself. The actual HTTP client
//! (and with it TLS, proxies and connection pooling) is supplied through
//! the [`HttpClient`] trait. A blocking `reqwest` implementation is
//! available behind the `reqwest-client` feature.

use std::sync::Arc;
use thiserror::Error;

/// A failed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpFailure {
    /// The request never produced a response (refused, reset, timed out).
    ///
    /// This is the only failure class the client retries.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The server answered with a non-success status.
    #[error("HTTP status {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },

    /// The request could not be built or sent as given.
    #[error("invalid request: {0}")]
    Request(String),
}

impl HttpFailure {
    /// Returns true for connection-level failures.
    pub fn is_connection(&self) -> bool {
        matches!(self, HttpFailure::Connection(_))
    }
}

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual HTTP transport.
pub trait HttpClient: Send + Sync {
    /// Sends a POST request with a JSON body and returns the response body.
    fn post(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>, HttpFailure>;
}

impl<C: HttpClient + ?Sized> HttpClient for Arc<C> {
    fn post(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>, HttpFailure> {
        (**self).post(url, body)
    }
}

#[cfg(feature = "reqwest-client")]
pub use reqwest_client::ReqwestClient;

#[cfg(feature = "reqwest-client")]
mod reqwest_client {
    use super::{HttpClient, HttpFailure};
    use crate::config::SyncConfig;
    use crate::error::{SyncError, SyncResult};
    use reqwest::header::{ACCEPT, CONTENT_TYPE};
    use std::time::Duration;

    /// Blocking `reqwest` client.
    pub struct ReqwestClient {
        inner: reqwest::blocking::Client,
        timeout: Duration,
    }

    impl ReqwestClient {
        /// Creates a client with the given request timeout.
        pub fn new(timeout: Duration) -> SyncResult<Self> {
            let inner = reqwest::blocking::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| SyncError::transport_fatal(e.to_string()))?;
            Ok(Self { inner, timeout })
        }

        /// Creates a client using [`SyncConfig::timeout`].
        pub fn from_config(config: &SyncConfig) -> SyncResult<Self> {
            Self::new(config.timeout)
        }

        /// Returns the request timeout.
        pub fn timeout(&self) -> Duration {
            self.timeout
        }
    }

    fn classify(err: reqwest::Error) -> HttpFailure {
        if err.is_connect() || err.is_timeout() || err.is_request() {
            HttpFailure::Connection(err.to_string())
        } else {
            HttpFailure::Request(err.to_string())
        }
    }

    impl HttpClient for ReqwestClient {
        fn post(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>, HttpFailure> {
            let response = self
                .inner
                .post(url)
                .header(CONTENT_TYPE, "application/json")
                .header(ACCEPT, "application/json")
                .body(body)
                .send()
                .map_err(classify)?;

            let status = response.status();
            if !status.is_success() {
                let message = response.text().unwrap_or_default();
                return Err(HttpFailure::Status {
                    status: status.as_u16(),
                    message,
                });
            }

            response
                .bytes()
                .map(|b| b.to_vec())
                .map_err(|e| HttpFailure::Connection(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl HttpClient for Echo {
        fn post(&self, _url: &str, body: Vec<u8>) -> Result<Vec<u8>, HttpFailure> {
            Ok(body)
        }
    }

    #[test]
    fn arc_forwards() {
        let client = Arc::new(Echo);
        assert_eq!(client.post("http://x", vec![1, 2]).unwrap(), vec![1, 2]);
    }

    #[test]
    fn failure_classes() {
        assert!(HttpFailure::Connection("reset".into()).is_connection());
        assert!(!HttpFailure::Status {
            status: 400,
            message: "bad".into()
        }
        .is_connection());
        assert!(!HttpFailure::Request("url".into()).is_connection());
    }

    #[cfg(feature = "reqwest-client")]
    #[test]
    fn reqwest_client_takes_the_configured_timeout() {
        use crate::config::SyncConfig;
        use std::time::Duration;

        let config = SyncConfig::new().with_timeout(Duration::from_secs(7));
        let client = ReqwestClient::from_config(&config).unwrap();
        assert_eq!(client.timeout(), Duration::from_secs(7));
    }
}
