//! Structured error types for the build pipeline.
//!
//! Network, parse and validation failures are retryable and never escape the
//! resiliency controller. Persistence failures are fatal.

use std::path::PathBuf;
use thiserror::Error;

/// Fetch failed: timeout, connection failure, or non-2xx status.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("request to {url} timed out: {reason}")]
    Timeout { url: String, reason: String },

    #[error("connection to {url} failed: {reason}")]
    Connect { url: String, reason: String },

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("failed to read response body from {url}: {reason}")]
    Body { url: String, reason: String },

    #[error("HTTP client error: {0}")]
    Client(String),
}

/// The document did not have a shape we know how to read.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no table with a 'Symbol' header column found in HTML document")]
    NoQualifyingTable,

    #[error("malformed CSV: {0}")]
    InvalidCsv(String),
}

/// The validated set is too small to be trusted.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("only {observed} valid symbols found, at least {required} required (source layout likely changed)")]
    TooFewSymbols { observed: usize, required: usize },
}

/// Reading or writing the artifact failed for I/O reasons.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize symbol list: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A failed attempt of the fetch→parse→normalize→validate unit of work.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("NetworkError: {0}")]
    Network(#[from] NetworkError),

    #[error("ParseError: {0}")]
    Parse(#[from] ParseError),

    #[error("ValidationError: {0}")]
    Validation(#[from] ValidationError),
}

impl BuildError {
    /// Taxonomy name of the underlying failure.
    pub fn kind(&self) -> &'static str {
        match self {
            BuildError::Network(_) => "NetworkError",
            BuildError::Parse(_) => "ParseError",
            BuildError::Validation(_) => "ValidationError",
        }
    }
}

/// Configuration could not be loaded or is inconsistent.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_error_names_its_kind() {
        let err: BuildError = ValidationError::TooFewSymbols {
            observed: 12,
            required: 80,
        }
        .into();
        assert_eq!(err.kind(), "ValidationError");
        let msg = err.to_string();
        assert!(msg.starts_with("ValidationError"));
        assert!(msg.contains("12"));
        assert!(msg.contains("80"));
    }

    #[test]
    fn network_status_message_carries_code() {
        let err = BuildError::from(NetworkError::Status {
            status: 503,
            url: "https://example.test/list".into(),
        });
        assert_eq!(err.kind(), "NetworkError");
        assert!(err.to_string().contains("HTTP 503"));
    }
}
