//! Self-hosted SearXNG instance, queried through its JSON API.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{client_for, snippet_or_missing};
use crate::engine::EngineKind;
use crate::error::BackendError;
use crate::http::read_body;
use crate::identity::Identity;
use crate::proxy::ProxyConfig;
use crate::{Engine, EngineConfig, SearchResult};

#[derive(Debug, Deserialize)]
struct SearxngResponse {
    #[serde(default)]
    results: Vec<SearxngItem>,
}

#[derive(Debug, Deserialize)]
struct SearxngItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    content: Option<String>,
    snippet: Option<String>,
}

/// SearXNG search engine. The API key is optional.
pub struct Searxng {
    config: EngineConfig,
}

impl Searxng {
    /// Creates a new SearXNG engine.
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    fn search_url(&self) -> String {
        format!("{}/search", self.endpoint().trim_end_matches('/'))
    }

    fn parse_results(&self, query: &str, body: &str) -> Result<Vec<SearchResult>, BackendError> {
        let response: SearxngResponse = serde_json::from_str(body)
            .map_err(|e| BackendError::ParseFailure(format!("invalid SearXNG response: {}", e)))?;

        Ok(response
            .results
            .into_iter()
            .filter(|item| !item.url.is_empty())
            .take(self.config.max_results)
            .map(|item| {
                SearchResult::new(
                    query,
                    item.title,
                    item.url,
                    snippet_or_missing(item.content.or(item.snippet)),
                )
            })
            .collect())
    }
}

#[async_trait]
impl Engine for Searxng {
    fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn search(
        &self,
        query: &str,
        identity: &Identity,
        proxy: Option<&ProxyConfig>,
    ) -> Result<Vec<SearchResult>, BackendError> {
        let client = client_for(&self.config, identity, proxy)?;

        let mut params = vec![("q", query), ("format", "json")];
        if let Some(key) = self.config.backend.api_key.as_deref() {
            params.push(("api_key", key));
        }

        let response = client.get(self.search_url()).query(&params).send().await?;
        let body = read_body(response, EngineKind::Api).await?;

        let results = self.parse_results(query, &body)?;
        debug!(count = results.len(), "Parsed SearXNG results");
        Ok(results)
    }
}
