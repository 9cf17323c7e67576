//! DuckDuckGo search engine implementation.

use async_trait::async_trait;
use scraper::Html;
use tracing::debug;
use url::Url;

use super::{client_for, element_text, selector, snippet_or_missing};
use crate::engine::EngineKind;
use crate::error::BackendError;
use crate::http::{browser_headers, detect_block_page, read_body};
use crate::identity::Identity;
use crate::proxy::ProxyConfig;
use crate::{Engine, EngineConfig, SearchResult};

/// DuckDuckGo search engine, using the JavaScript-free HTML endpoint.
pub struct DuckDuckGo {
    config: EngineConfig,
}

impl DuckDuckGo {
    /// Creates a new DuckDuckGo engine.
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    fn parse_results(&self, query: &str, html: &str) -> Result<Vec<SearchResult>, BackendError> {
        let document = Html::parse_document(html);
        let result_selector = selector("div.result")?;
        let title_selector = selector("a.result__a")?;
        let snippet_selector = selector(".result__snippet")?;

        let mut results = Vec::new();

        for element in document.select(&result_selector) {
            let Some(title_elem) = element.select(&title_selector).next() else {
                continue;
            };
            let title = element_text(title_elem);
            let href = title_elem.value().attr("href").unwrap_or_default();

            let url = if href.contains("duckduckgo.com/l/") {
                extract_redirect_url(href).unwrap_or_else(|| href.to_string())
            } else {
                href.to_string()
            };
            if !url.starts_with("http") {
                continue;
            }

            let snippet = element.select(&snippet_selector).next().map(element_text);

            if !title.is_empty() {
                results.push(SearchResult::new(query, title, url, snippet_or_missing(snippet)));
            }
            if results.len() >= self.config.max_results {
                break;
            }
        }

        Ok(results)
    }
}

/// Unwraps the target from a `//duckduckgo.com/l/?uddg=` redirect link.
fn extract_redirect_url(href: &str) -> Option<String> {
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };
    let parsed = Url::parse(&absolute).ok()?;
    parsed
        .query_pairs()
        .find(|(k, _)| k == "uddg")
        .map(|(_, v)| v.into_owned())
}

#[async_trait]
impl Engine for DuckDuckGo {
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

        let response = client
            .get(self.endpoint())
            .headers(browser_headers(identity))
            .query(&[("q", query)])
            .send()
            .await?;
        let html = read_body(response, EngineKind::Scrape).await?;

        let results = self.parse_results(query, &html)?;
        if results.is_empty() {
            if let Some(blocked) = detect_block_page(&html) {
                return Err(blocked);
            }
        }
        debug!(count = results.len(), "Parsed DuckDuckGo results");
        Ok(results)
    }
}
