//! Search engine trait and identifiers.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::BackendConfig;
use crate::error::{BackendError, ConfigError};
use crate::identity::Identity;
use crate::proxy::ProxyConfig;
use crate::SearchResult;

/// How an engine is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// HTML results page parsed with CSS selectors.
    Scrape,
    /// JSON web-search API.
    Api,
}

/// The fixed set of supported engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineId {
    Google,
    DuckDuckGo,
    Bing,
    Brave,
    Searxng,
}

impl EngineId {
    /// Returns all engines in listing order.
    pub fn all() -> &'static [EngineId] {
        &[
            Self::Google,
            Self::DuckDuckGo,
            Self::Bing,
            Self::Brave,
            Self::Searxng,
        ]
    }

    /// Lowercase identifier, also the config file section name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::DuckDuckGo => "duckduckgo",
            Self::Bing => "bing",
            Self::Brave => "brave",
            Self::Searxng => "searxng",
        }
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Google => "Google",
            Self::DuckDuckGo => "DuckDuckGo",
            Self::Bing => "Bing Web Search API",
            Self::Brave => "Brave Search API",
            Self::Searxng => "SearXNG",
        }
    }

    pub fn kind(&self) -> EngineKind {
        match self {
            Self::Google | Self::DuckDuckGo => EngineKind::Scrape,
            Self::Bing | Self::Brave | Self::Searxng => EngineKind::Api,
        }
    }

    /// Whether a run must be refused when no API key is configured.
    ///
    /// SearXNG is an API engine but the key is optional.
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::Bing | Self::Brave)
    }

    /// Endpoint used when neither the config file nor the environment sets one.
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Self::Google => "https://www.google.com/search",
            Self::DuckDuckGo => "https://html.duckduckgo.com/html/",
            Self::Bing => "https://api.bing.microsoft.com/v7.0/search",
            Self::Brave => "https://api.search.brave.com/res/v1/web/search",
            Self::Searxng => "http://localhost:8080",
        }
    }

    /// Environment variable overriding the API key, e.g. `BING_API_KEY`.
    pub fn api_key_env(&self) -> String {
        format!("{}_API_KEY", self.name().to_uppercase())
    }

    /// Environment variable overriding the endpoint, e.g. `SEARXNG_ENDPOINT`.
    pub fn endpoint_env(&self) -> String {
        format!("{}_ENDPOINT", self.name().to_uppercase())
    }
}

impl fmt::Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EngineId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "google" | "g" => Ok(Self::Google),
            "duckduckgo" | "ddg" => Ok(Self::DuckDuckGo),
            "bing" => Ok(Self::Bing),
            "brave" => Ok(Self::Brave),
            "searxng" | "searx" => Ok(Self::Searxng),
            other => Err(ConfigError::UnknownEngine(other.to_string())),
        }
    }
}

/// Runtime configuration for one engine adapter.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Resolved key and endpoint.
    pub backend: BackendConfig,
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Number of results requested per query.
    pub max_results: usize,
}

impl EngineConfig {
    /// Creates an engine configuration with default timeout and result count.
    pub fn new(backend: BackendConfig) -> Self {
        Self {
            backend,
            timeout: default_timeout(),
            max_results: default_max_results(),
        }
    }

    /// Sets the request timeout in seconds.
    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the number of results requested per query.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }
}

fn default_timeout() -> u64 {
    10
}

fn default_max_results() -> usize {
    10
}

/// Trait for implementing search backends.
///
/// Adapters turn one query into normalized results. They hold no mutable
/// state: the caller supplies the identity and proxy for every request and
/// decides what to do with failures.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Returns the engine configuration.
    fn config(&self) -> &EngineConfig;

    /// Issues one request and parses the response, preserving result order.
    async fn search(
        &self,
        query: &str,
        identity: &Identity,
        proxy: Option<&ProxyConfig>,
    ) -> Result<Vec<SearchResult>, BackendError>;

    /// Returns the engine identifier.
    fn id(&self) -> EngineId {
        self.config().backend.engine
    }

    /// Returns the engine name.
    fn name(&self) -> &'static str {
        self.id().name()
    }

    /// Returns the configured endpoint.
    fn endpoint(&self) -> &str {
        &self.config().backend.endpoint
    }
}
