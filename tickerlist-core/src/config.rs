//! Build configuration, loaded from TOML with every field defaulted.
//!
//! ```toml
//! [source]
//! url = "https://docs.google.com/spreadsheets/d/.../pub?output=csv"
//! timeout_secs = 20
//!
//! [output]
//! path = "public/sp100.json"
//! format = "pretty"
//!
//! [validation]
//! min_count = 80
//! separator = "dot"
//!
//! [retry]
//! max_attempts = 3
//! ```

use crate::error::ConfigError;
use crate::fetch::{DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
use crate::normalize::Normalizer;
use crate::resilience::RetryPolicy;
use crate::seed::DEFAULT_MUST_HAVE;
use crate::snapshot::ArtifactFormat;
use crate::symbol::ClassSeparator;
use crate::validate::{Validator, DEFAULT_MIN_COUNT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Encyclopedia page listing the index constituents.
pub const DEFAULT_SOURCE_URL: &str = "https://en.wikipedia.org/wiki/S%26P_100";

/// Environment variable overriding the source URL.
pub const SOURCE_URL_ENV: &str = "SOURCE_URL";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub source: SourceConfig,
    pub output: OutputConfig,
    pub validation: ValidationConfig,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub url: String,
    /// Identifying `User-Agent`; empty string sends the HTTP client's default.
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SOURCE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn user_agent(&self) -> Option<&str> {
        Some(self.user_agent.as_str()).filter(|ua| !ua.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: PathBuf,
    pub format: ArtifactFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("sp100.json"),
            format: ArtifactFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub min_count: usize,
    pub must_have: Vec<String>,
    /// Missing must-have symbols tolerated before a warning is raised.
    pub max_missing: usize,
    pub separator: ClassSeparator,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_count: DEFAULT_MIN_COUNT,
            must_have: DEFAULT_MUST_HAVE.iter().map(|s| s.to_string()).collect(),
            max_missing: 1,
            separator: ClassSeparator::Dot,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub factor: f64,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            factor: policy.factor,
            min_delay_ms: policy.min_delay.as_millis() as u64,
            max_delay_ms: policy.max_delay.as_millis() as u64,
            jitter: policy.jitter,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            factor: self.factor,
            min_delay: Duration::from_millis(self.min_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            jitter: self.jitter,
        }
    }
}

impl BuildConfig {
    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `SOURCE_URL` from the environment, if set and non-empty.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(SOURCE_URL_ENV) {
            if !url.trim().is_empty() {
                self.source.url = url.trim().to_string();
            }
        }
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source.url.trim().is_empty() {
            return Err(ConfigError::Invalid("source.url is empty".into()));
        }
        if self.source.timeout_secs == 0 {
            return Err(ConfigError::Invalid("source.timeout_secs must be > 0".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry.max_attempts must be >= 1".into()));
        }
        if !(self.retry.factor >= 1.0 && self.retry.factor.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "retry.factor must be a finite number >= 1 (got {})",
                self.retry.factor
            )));
        }
        if self.retry.min_delay_ms > self.retry.max_delay_ms {
            return Err(ConfigError::Invalid(format!(
                "retry.min_delay_ms ({}) exceeds retry.max_delay_ms ({})",
                self.retry.min_delay_ms, self.retry.max_delay_ms
            )));
        }
        Ok(())
    }

    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new(self.validation.separator)
    }

    pub fn validator(&self) -> Validator {
        let v = &self.validation;
        Validator::new(v.separator, v.min_count).with_must_have(
            v.must_have.iter(),
            v.max_missing,
            &self.normalizer(),
        )
    }
}
