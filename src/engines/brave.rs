//! Brave Search API.

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

const KEY_HEADER: &str = "X-Subscription-Token";

#[derive(Debug, Deserialize)]
struct BraveResponse {
    web: Option<WebSection>,
}

#[derive(Debug, Deserialize)]
struct WebSection {
    #[serde(default)]
    results: Vec<BraveItem>,
}

#[derive(Debug, Deserialize)]
struct BraveItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    description: Option<String>,
    snippet: Option<String>,
}

/// Brave search engine, queried through the keyed API.
pub struct Brave {
    config: EngineConfig,
}

impl Brave {
    /// Creates a new Brave engine.
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    fn parse_results(&self, query: &str, body: &str) -> Result<Vec<SearchResult>, BackendError> {
        let response: BraveResponse = serde_json::from_str(body)
            .map_err(|e| BackendError::ParseFailure(format!("invalid Brave response: {}", e)))?;

        let items = response.web.map(|w| w.results).unwrap_or_default();
        Ok(items
            .into_iter()
            .filter(|item| !item.url.is_empty())
            .take(self.config.max_results)
            .map(|item| {
                SearchResult::new(
                    query,
                    item.title,
                    item.url,
                    snippet_or_missing(item.description.or(item.snippet)),
                )
            })
            .collect())
    }
}

#[async_trait]
impl Engine for Brave {
    fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn search(
        &self,
        query: &str,
        identity: &Identity,
        proxy: Option<&ProxyConfig>,
    ) -> Result<Vec<SearchResult>, BackendError> {
        let api_key = self
            .config
            .backend
            .api_key
            .as_deref()
            .ok_or_else(|| BackendError::AuthFailed("no API key configured".to_string()))?;

        let client = client_for(&self.config, identity, proxy)?;
        let count = self.config.max_results.to_string();

        let response = client
            .get(self.endpoint())
            .header(KEY_HEADER, api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&[("q", query), ("count", count.as_str())])
            .send()
            .await?;
        let body = read_body(response, EngineKind::Api).await?;

        let results = self.parse_results(query, &body)?;
        debug!(count = results.len(), "Parsed Brave results");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use crate::EngineId;
    use wiremock::matchers::{header, method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_brave(endpoint: &str) -> Brave {
        let backend = BackendConfig::new(EngineId::Brave)
            .with_api_key("brave-key")
            .with_endpoint(endpoint);
        Brave::new(EngineConfig::new(backend))
    }

    fn identity() -> Identity {
        Identity::new("Mozilla/5.0 (test)", "https://www.google.com/")
    }

    #[test]
    fn test_brave_new() {
        let engine = make_brave("https://api.search.brave.com/res/v1/web/search");
        assert_eq!(engine.name(), "brave");
        assert_eq!(engine.config().backend.api_key.as_deref(), Some("brave-key"));
    }

    #[test]
    fn test_parse_results() {
        let engine = make_brave("https://api.example.com");
        let body = r#"{
            "type": "search",
            "web": {
                "results": [
                    {"title": "Index of /", "url": "https://files.example.com/", "description": "Parent Directory"},
                    {"title": "Snippet only", "url": "https://b.example.com/", "snippet": "alt text"},
                    {"title": "Nothing", "url": "https://c.example.com/"}
                ]
            }
        }"#;
        let results = engine.parse_results("intitle:\"index of\"", body).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].title(), "Index of /");
        assert_eq!(results[0].snippet(), "Parent Directory");
        assert_eq!(results[1].snippet(), "alt text");
        assert_eq!(results[2].snippet(), "N/A");
        assert_eq!(results[0].query(), "intitle:\"index of\"");
    }

    #[test]
    fn test_parse_results_without_web_section() {
        let engine = make_brave("https://api.example.com");
        let results = engine.parse_results("q", r#"{"type": "search"}"#).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_parse_results_invalid_json() {
        let engine = make_brave("https://api.example.com");
        let err = engine.parse_results("q", "not json").unwrap_err();
        assert!(matches!(err, BackendError::ParseFailure(_)));
    }

    #[tokio::test]
    async fn test_search_sends_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("X-Subscription-Token", "brave-key"))
            .and(query_param("q", "filetype:log"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "web": {"results": [{"title": "Log", "url": "https://example.com/app.log", "description": "ERROR"}]}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let engine = make_brave(&server.uri());
        let results = engine.search("filetype:log", &identity(), None).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].snippet(), "ERROR");
    }

    #[tokio::test]
    async fn test_search_forbidden_is_auth_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let engine = make_brave(&server.uri());
        let err = engine.search("q", &identity(), None).await.unwrap_err();
        assert!(matches!(err, BackendError::AuthFailed(_)));
    }

    #[tokio::test]
    async fn test_search_server_error_is_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let engine = make_brave(&server.uri());
        let err = engine.search("q", &identity(), None).await.unwrap_err();
        assert!(matches!(err, BackendError::Unreachable(_)));
    }
}
