//! Sync configuration.
//!
//! # Invariants
//! - `endpoint` is an absolute `http`/`https` base URL.
//! - `batch_limit` is within `1..=MAX_BATCH_LIMIT`.
//! - `interval` and `request_timeout` are non-zero.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://jsonplaceholder.typicode.com";
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_BATCH_LIMIT: usize = 10;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const MAX_BATCH_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Base URL; `/posts` is appended by the HTTP client.
    pub endpoint: String,
    /// Period between scheduled sync cycles.
    pub interval: Duration,
    /// Maximum remote quotes processed per cycle.
    pub batch_limit: usize,
    /// Per-request timeout; exceeding it counts as a fetch failure.
    pub request_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            interval: DEFAULT_SYNC_INTERVAL,
            batch_limit: DEFAULT_BATCH_LIMIT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidEndpoint(String),
    BatchLimitOutOfRange(usize),
    ZeroDuration(&'static str),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidEndpoint(value) => {
                write!(f, "endpoint must be an http(s) URL, got `{value}`")
            }
            Self::BatchLimitOutOfRange(value) => write!(
                f,
                "batch limit {value} is out of range; expected 1..={MAX_BATCH_LIMIT}"
            ),
            Self::ZeroDuration(field) => write!(f, "{field} must be greater than zero"),
        }
    }
}

impl Error for ConfigError {}

impl SyncConfig {
    /// Checks config invariants, returning the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let endpoint = self.endpoint.trim();
        let has_scheme = endpoint.starts_with("http://") || endpoint.starts_with("https://");
        let has_host = endpoint
            .split_once("://")
            .is_some_and(|(_, rest)| !rest.trim_matches('/').is_empty());
        if !has_scheme || !has_host {
            return Err(ConfigError::InvalidEndpoint(self.endpoint.clone()));
        }
        if !(1..=MAX_BATCH_LIMIT).contains(&self.batch_limit) {
            return Err(ConfigError::BatchLimitOutOfRange(self.batch_limit));
        }
        if self.interval.is_zero() {
            return Err(ConfigError::ZeroDuration("interval"));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("request_timeout"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, SyncConfig};
    use std::time::Duration;

    #[test]
    fn defaults_are_valid() {
        let config = SyncConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.batch_limit, 10);
        assert_eq!(config.interval, Duration::from_secs(30));
    }

    #[test]
    fn rejects_bad_values() {
        let bad_endpoint = SyncConfig {
            endpoint: "ftp://example.com".to_string(),
            ..SyncConfig::default()
        };
        assert!(matches!(
            bad_endpoint.validate(),
            Err(ConfigError::InvalidEndpoint(_))
        ));

        let no_host = SyncConfig {
            endpoint: "https://".to_string(),
            ..SyncConfig::default()
        };
        assert!(matches!(
            no_host.validate(),
            Err(ConfigError::InvalidEndpoint(_))
        ));

        let zero_batch = SyncConfig {
            batch_limit: 0,
            ..SyncConfig::default()
        };
        assert_eq!(
            zero_batch.validate(),
            Err(ConfigError::BatchLimitOutOfRange(0))
        );

        let zero_interval = SyncConfig {
            interval: Duration::ZERO,
            ..SyncConfig::default()
        };
        assert_eq!(
            zero_interval.validate(),
            Err(ConfigError::ZeroDuration("interval"))
        );
    }
}
