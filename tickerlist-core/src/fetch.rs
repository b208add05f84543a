//! HTTP document fetcher.
//!
//! One GET per call, bounded by the client timeout. Retries belong to the
//! resiliency controller, never to the fetcher.

use crate::error::NetworkError;
use crate::parse::{DocumentShape, RawDocument};
use std::time::Duration;
use tracing::debug;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Default identifying `User-Agent`, sent so third-party sources can reach the operator.
pub const DEFAULT_USER_AGENT: &str = concat!(
    "tickerlist/",
    env!("CARGO_PKG_VERSION"),
    " (+symbol list builder)"
);

/// Something that can retrieve a raw document from a URL.
///
/// The controller only sees this trait, so tests can script failures and
/// payloads without a network.
pub trait Fetch {
    fn fetch(&self, url: &str) -> Result<RawDocument, NetworkError>;
}

/// Blocking HTTP fetcher.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    /// Build a fetcher with the given timeout and optional `User-Agent`.
    pub fn new(timeout: Duration, user_agent: Option<&str>) -> Result<Self, NetworkError> {
        let mut builder = reqwest::blocking::Client::builder().timeout(timeout);
        if let Some(ua) = user_agent {
            builder = builder.user_agent(ua.to_string());
        }
        let client = builder
            .build()
            .map_err(|e| NetworkError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    fn classify(url: &str, e: reqwest::Error) -> NetworkError {
        if e.is_timeout() {
            NetworkError::Timeout {
                url: url.to_string(),
                reason: e.to_string(),
            }
        } else if e.is_connect() || e.is_request() {
            NetworkError::Connect {
                url: url.to_string(),
                reason: e.to_string(),
            }
        } else {
            NetworkError::Client(e.to_string())
        }
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<RawDocument, NetworkError> {
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| Self::classify(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(NetworkError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let shape = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(DocumentShape::from_content_type)
            .unwrap_or_default();

        let body = resp.text().map_err(|e| {
            if e.is_timeout() {
                Self::classify(url, e)
            } else {
                NetworkError::Body {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        debug!(url, status = status.as_u16(), ?shape, bytes = body.len(), "fetched document");

        Ok(RawDocument {
            body,
            shape,
            status: status.as_u16(),
        })
    }
}
