//! Typed errors for the monitor, its node source, and configuration.
//!
//! Command-level code wraps these in `anyhow` with context; the polling loop
//! absorbs `TransportError` into data and never propagates it.

use thiserror::Error;

/// Failure talking to the cluster's node info endpoint.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("{url} returned {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("malformed node info from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Invalid construction parameters. The only error class that fails fast.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("poll_interval_ms must be greater than zero")]
    InvalidPollInterval,

    #[error("application_version must be set (config file, NODEWATCH_MONITOR__APPLICATION_VERSION, or --app-version)")]
    MissingApplicationVersion,

    #[error("application_version {0:?} is not a MAJOR.MINOR.PATCH version")]
    InvalidApplicationVersion(String),

    #[error("source url {url:?} is invalid: {reason}")]
    InvalidSourceUrl { url: String, reason: String },

    #[error("unknown version strictness {0:?} (expected \"strict\" or \"major_only\")")]
    InvalidStrictness(String),

    #[error("loading configuration: {0}")]
    Load(#[from] Box<figment::Error>),
}

/// Lifecycle misuse of a `PollingMonitor`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MonitorError {
    #[error("monitor is already polling")]
    AlreadyStarted,

    #[error("monitor has been stopped and cannot be restarted")]
    Stopped,
}
