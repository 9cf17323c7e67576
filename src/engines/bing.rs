//! Bing Web Search API.

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

const KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

#[derive(Debug, Deserialize)]
struct BingResponse {
    #[serde(rename = "webPages")]
    web_pages: Option<WebPages>,
}

#[derive(Debug, Deserialize)]
struct WebPages {
    #[serde(default)]
    value: Vec<BingItem>,
}

#[derive(Debug, Deserialize)]
struct BingItem {
    #[serde(default)]
    name: String,
    #[serde(default)]
    url: String,
    snippet: Option<String>,
    description: Option<String>,
}

/// Bing search engine, queried through the keyed API.
pub struct Bing {
    config: EngineConfig,
}

impl Bing {
    /// Creates a new Bing engine.
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    fn parse_results(&self, query: &str, body: &str) -> Result<Vec<SearchResult>, BackendError> {
        let response: BingResponse = serde_json::from_str(body)
            .map_err(|e| BackendError::ParseFailure(format!("invalid Bing response: {}", e)))?;

        // A response without `webPages` means no results.
        let items = response.web_pages.map(|p| p.value).unwrap_or_default();
        Ok(items
            .into_iter()
            .filter(|item| !item.url.is_empty())
            .take(self.config.max_results)
            .map(|item| {
                SearchResult::new(
                    query,
                    item.name,
                    item.url,
                    snippet_or_missing(item.snippet.or(item.description)),
                )
            })
            .collect())
    }
}

#[async_trait]
impl Engine for Bing {
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
            .query(&[("q", query), ("count", count.as_str()), ("offset", "0")])
            .send()
            .await?;
        let body = read_body(response, EngineKind::Api).await?;

        let results = self.parse_results(query, &body)?;
        debug!(count = results.len(), "Parsed Bing results");
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

    fn make_bing(endpoint: &str) -> Bing {
        let backend = BackendConfig::new(EngineId::Bing)
            .with_api_key("bing-key")
            .with_endpoint(endpoint);
        Bing::new(EngineConfig::new(backend))
    }

    fn identity() -> Identity {
        Identity::new("Mozilla/5.0 (test)", "https://www.google.com/")
    }

    #[test]
    fn test_parse_results() {
        let engine = make_bing("https://api.example.com");
        let body = r#"{
            "webPages": {
                "value": [
                    {"name": "Config", "url": "https://example.com/.env", "snippet": "DB_PASSWORD="},
                    {"name": "Docs", "url": "https://docs.example.com/", "description": "Documentation"},
                    {"name": "Bare", "url": "https://bare.example.com/"},
                    {"name": "No URL"}
                ]
            }
        }"#;
        let results = engine.parse_results("ext:env", body).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].title(), "Config");
        assert_eq!(results[0].snippet(), "DB_PASSWORD=");
        assert_eq!(results[1].snippet(), "Documentation");
        assert_eq!(results[2].snippet(), "N/A");
        assert_eq!(results[1].domain(), "docs.example.com");
    }

    #[test]
    fn test_parse_results_without_web_pages() {
        let engine = make_bing("https://api.example.com");
        let results = engine.parse_results("q", r#"{"_type": "SearchResponse"}"#).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_parse_results_invalid_json() {
        let engine = make_bing("https://api.example.com");
        let err = engine.parse_results("q", "<html>oops</html>").unwrap_err();
        assert!(matches!(err, BackendError::ParseFailure(_)));
    }

    #[tokio::test]
    async fn test_search_sends_key_and_params() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("Ocp-Apim-Subscription-Key", "bing-key"))
            .and(query_param("q", "inurl:admin"))
            .and(query_param("count", "10"))
            .and(query_param("offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "webPages": {"value": [{"name": "Admin", "url": "https://example.com/admin", "snippet": "Login"}]}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let engine = make_bing(&server.uri());
        let results = engine.search("inurl:admin", &identity(), None).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].url(), "https://example.com/admin");
    }

    #[tokio::test]
    async fn test_search_bad_key_is_auth_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let engine = make_bing(&server.uri());
        let err = engine.search("q", &identity(), None).await.unwrap_err();
        assert!(matches!(err, BackendError::AuthFailed(_)));
    }

    #[tokio::test]
    async fn test_search_quota_exceeded_is_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let engine = make_bing(&server.uri());
        let err = engine.search("q", &identity(), None).await.unwrap_err();
        assert!(matches!(err, BackendError::RateLimited(_)));
    }
}
