//! Error types for the dork runner.
//!
//! Errors are split by how far they are allowed to propagate:
//! [`ConfigError`] stops a run before any query is issued, [`BackendError`]
//! is scoped to a single query, [`CacheError`] is always swallowed and
//! [`OutputError`] is reported as a warning after results are written.
//! None of the messages carry API keys.

use thiserror::Error;

/// Fatal configuration problems, detected before any query runs.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A keyed engine has no API key.
    #[error("Missing API key for engine '{engine}'. Set {env_var} or add it to the config file.")]
    MissingApiKey {
        engine: String,
        env_var: String,
    },

    /// The resolved endpoint is not a usable http(s) URL.
    #[error("Invalid endpoint for engine '{engine}': {reason}")]
    InvalidEndpoint { engine: String, reason: String },

    /// The engine name is not in the registration table.
    #[error("Unknown engine '{0}'")]
    UnknownEngine(String),

    /// The config file exists but could not be read or parsed.
    #[error("Invalid config file {path}: {reason}")]
    ConfigFile { path: String, reason: String },

    /// The query file could not be read.
    #[error("Cannot read query file {path}: {reason}")]
    QueryFile { path: String, reason: String },

    /// The query file contains no queries.
    #[error("No queries found in {0}")]
    NoQueries(String),

    /// A proxy entry could not be parsed.
    #[error("Invalid proxy '{entry}': {reason}")]
    InvalidProxy { entry: String, reason: String },

    /// A numeric or structural run setting is out of range.
    #[error("Invalid setting: {0}")]
    InvalidSetting(String),

    /// The engine rejected the configured credentials.
    #[error("Engine '{engine}' rejected the credentials: {reason}")]
    AuthRejected { engine: String, reason: String },
}

/// Per-query backend failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// HTTP 429, a block page or a CAPTCHA.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Missing or invalid API key. Never retried.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// Network failure, timeout or server error.
    #[error("unreachable: {0}")]
    Unreachable(String),

    /// The response did not have the expected shape.
    #[error("parse failure: {0}")]
    ParseFailure(String),
}

impl BackendError {
    /// Short label used in logs and failure reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RateLimited(_) => "rate_limited",
            Self::AuthFailed(_) => "auth_failed",
            Self::Unreachable(_) => "unreachable",
            Self::ParseFailure(_) => "parse_failure",
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        // Strip the URL: keyed engines may carry the key in the query string.
        let err = err.without_url();
        if err.is_decode() {
            Self::ParseFailure(err.to_string())
        } else {
            Self::Unreachable(err.to_string())
        }
    }
}

/// Cache failures. Never fatal; the cache is bypassed instead.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupted cache entry: {0}")]
    Corrupted(#[from] serde_json::Error),
}

/// Output writer failures, surfaced as warnings at the end of a run.
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("output I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
