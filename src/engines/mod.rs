//! Search engine implementations.

use std::time::Duration;

use reqwest::Client;
use scraper::{ElementRef, Selector};

use crate::error::{BackendError, ConfigError};
use crate::http::build_client;
use crate::identity::Identity;
use crate::proxy::ProxyConfig;
use crate::{Engine, EngineConfig, EngineId};

// Scrape engines
mod duckduckgo;
mod google;

// Keyed API engines
mod bing;
mod brave;
mod searxng;

pub use bing::Bing;
pub use brave::Brave;
pub use duckduckgo::DuckDuckGo;
pub use google::Google;
pub use searxng::Searxng;

/// Snippet recorded when a result carries none.
pub const MISSING_SNIPPET: &str = "N/A";

type Constructor = fn(EngineConfig) -> Box<dyn Engine>;

/// Registration table: one constructor per engine identifier.
const REGISTRY: &[(EngineId, Constructor)] = &[
    (EngineId::Google, google),
    (EngineId::DuckDuckGo, duckduckgo),
    (EngineId::Bing, bing),
    (EngineId::Brave, brave),
    (EngineId::Searxng, searxng),
];

fn google(config: EngineConfig) -> Box<dyn Engine> {
    Box::new(Google::new(config))
}

fn duckduckgo(config: EngineConfig) -> Box<dyn Engine> {
    Box::new(DuckDuckGo::new(config))
}

fn bing(config: EngineConfig) -> Box<dyn Engine> {
    Box::new(Bing::new(config))
}

fn brave(config: EngineConfig) -> Box<dyn Engine> {
    Box::new(Brave::new(config))
}

fn searxng(config: EngineConfig) -> Box<dyn Engine> {
    Box::new(Searxng::new(config))
}

/// Creates the adapter selected by `config.backend.engine`.
///
/// Fails when the backend configuration is unusable, before any request is
/// sent.
pub fn create_engine(config: EngineConfig) -> Result<Box<dyn Engine>, ConfigError> {
    config.backend.validate()?;
    let engine = config.backend.engine;
    REGISTRY
        .iter()
        .find(|(id, _)| *id == engine)
        .map(|(_, construct)| construct(config))
        .ok_or_else(|| ConfigError::UnknownEngine(engine.name().to_string()))
}

/// Builds the per-request client for an adapter.
pub(crate) fn client_for(
    config: &EngineConfig,
    identity: &Identity,
    proxy: Option<&ProxyConfig>,
) -> Result<Client, BackendError> {
    build_client(identity, proxy, Duration::from_secs(config.timeout))
}

pub(crate) fn selector(css: &str) -> Result<Selector, BackendError> {
    Selector::parse(css)
        .map_err(|e| BackendError::ParseFailure(format!("Failed to parse selector: {:?}", e)))
}

/// Collapses the text of an element into a single trimmed line.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Returns the trimmed snippet, or [`MISSING_SNIPPET`] when it is blank.
pub(crate) fn snippet_or_missing(snippet: Option<String>) -> String {
    snippet
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| MISSING_SNIPPET.to_string())
}
