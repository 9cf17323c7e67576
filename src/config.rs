//! Layered configuration: file defaults, then environment overrides.
//!
//! The config file is JSON with one optional section per engine:
//!
//! ```json
//! {
//!   "bing":    { "api_key": "...", "endpoint": "https://api.bing.microsoft.com/v7.0/search" },
//!   "brave":   { "api_key": "..." },
//!   "searxng": { "endpoint": "http://localhost:8080" }
//! }
//! ```
//!
//! `<ENGINE>_API_KEY` and `<ENGINE>_ENDPOINT` override the file. The result
//! is resolved once per run into an immutable [`BackendConfig`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::cache::MAX_TTL;
use crate::engine::{EngineConfig, EngineId};
use crate::error::ConfigError;

/// Resolved settings for one engine.
#[derive(Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub engine: EngineId,
    pub api_key: Option<String>,
    pub endpoint: String,
}

impl BackendConfig {
    /// Creates a config with the engine's default endpoint and no key.
    pub fn new(engine: EngineId) -> Self {
        Self {
            engine,
            api_key: None,
            endpoint: engine.default_endpoint().to_string(),
        }
    }

    /// Sets the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Checks that keyed engines have a key and the endpoint is an http(s) URL.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.requires_api_key() && self.api_key.is_none() {
            return Err(ConfigError::MissingApiKey {
                engine: self.engine.name().to_string(),
                env_var: self.engine.api_key_env(),
            });
        }

        let invalid = |reason: String| ConfigError::InvalidEndpoint {
            engine: self.engine.name().to_string(),
            reason,
        };
        let url = url::Url::parse(&self.endpoint).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
        }
        Ok(())
    }
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("engine", &self.engine)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// One engine section of the config file.
#[derive(Debug, Clone, Default, Deserialize)]
struct EngineSection {
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    endpoint: Option<String>,
}

/// Parsed config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Settings {
    engines: HashMap<String, EngineSection>,
}

impl Settings {
    /// Parses settings from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Loads the config file. A missing file yields empty settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ConfigFile`] if the file exists but cannot be
    /// read or is not valid JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let to_error = |reason: String| ConfigError::ConfigFile {
            path: path.display().to_string(),
            reason,
        };
        let content = std::fs::read_to_string(path).map_err(|e| to_error(e.to_string()))?;
        Self::from_json(&content).map_err(|e| to_error(e.to_string()))
    }

    /// Resolves an engine against the process environment.
    pub fn resolve(&self, engine: EngineId) -> Result<BackendConfig, ConfigError> {
        self.resolve_with(engine, |name| std::env::var(name).ok())
    }

    /// Resolves an engine with an explicit environment lookup.
    ///
    /// Non-empty environment values win over file values; empty values on
    /// either layer count as unset. The endpoint falls back to the engine
    /// default. The result is validated before it is returned.
    pub fn resolve_with<F>(&self, engine: EngineId, env: F) -> Result<BackendConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let section = self.engines.get(engine.name()).cloned().unwrap_or_default();

        let api_key = non_empty(env(&engine.api_key_env())).or_else(|| non_empty(section.api_key));
        let endpoint = non_empty(env(&engine.endpoint_env()))
            .or_else(|| non_empty(section.endpoint))
            .unwrap_or_else(|| engine.default_endpoint().to_string());

        let config = BackendConfig {
            engine,
            api_key,
            endpoint,
        };
        config.validate()?;
        debug!(engine = %engine, endpoint = %config.endpoint, keyed = config.api_key.is_some(), "Resolved backend config");
        Ok(config)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Response cache settings.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Persist entries to `dir` so later runs can reuse them.
    pub persist: bool,
    /// Directory holding persisted entries.
    pub dir: PathBuf,
    /// Age after which an entry is treated as a miss.
    pub ttl: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            persist: false,
            dir: PathBuf::from(".cache"),
            ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Per-run pacing, retry and request settings.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Minimum spacing between request starts.
    pub delay: Duration,
    /// Upper bound of the random extra delay added to `delay`.
    pub jitter: Duration,
    /// Attempts per query, including the first.
    pub max_attempts: u32,
    /// Backoff before the first retry.
    pub initial_backoff: Duration,
    /// Cap on any single backoff.
    pub max_backoff: Duration,
    /// Per-request network timeout.
    pub timeout: Duration,
    /// Results requested per query.
    pub max_results: usize,
    pub cache: CacheSettings,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(2),
            jitter: Duration::from_secs(1),
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            timeout: Duration::from_secs(10),
            max_results: 10,
            cache: CacheSettings::default(),
        }
    }
}

impl RunConfig {
    /// Sets the delay from (possibly fractional) seconds.
    pub fn with_delay_secs(mut self, secs: f64) -> Result<Self, ConfigError> {
        self.delay = Duration::try_from_secs_f64(secs)
            .map_err(|_| ConfigError::InvalidSetting(format!("delay must be >= 0, got {}", secs)))?;
        Ok(self)
    }

    /// Disables the random extra delay.
    pub fn without_jitter(mut self) -> Self {
        self.jitter = Duration::ZERO;
        self
    }

    /// Builds the adapter configuration for `backend` with this run's
    /// timeout and result count.
    pub fn engine_config(&self, backend: BackendConfig) -> EngineConfig {
        EngineConfig::new(backend)
            .with_timeout(self.timeout.as_secs().max(1))
            .with_max_results(self.max_results)
    }

    /// Validates this configuration.
    ///
    /// Checks:
    /// - `max_attempts` must be at least 1
    /// - `timeout` must be non-zero
    /// - `max_results` must be non-zero
    /// - `initial_backoff` must not exceed `max_backoff`
    /// - `cache.ttl` must not exceed ten years
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidSetting(
                "max_attempts must be at least 1".into(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidSetting(
                "timeout must be greater than 0".into(),
            ));
        }
        if self.max_results == 0 {
            return Err(ConfigError::InvalidSetting(
                "max_results must be greater than 0".into(),
            ));
        }
        if self.initial_backoff > self.max_backoff {
            return Err(ConfigError::InvalidSetting(
                "initial backoff must be <= max backoff".into(),
            ));
        }
        if self.cache.ttl > MAX_TTL {
            return Err(ConfigError::InvalidSetting(format!(
                "cache TTL must be at most {} hours",
                MAX_TTL.as_secs() / 3600
            )));
        }
        Ok(())
    }
}
