//! Google web search, scraped from the HTML results page.

use async_trait::async_trait;
use scraper::Html;
use tracing::debug;
use url::Url;

use super::{client_for, element_text, selector, snippet_or_missing};
use crate::engine::EngineKind;
use crate::error::BackendError;
use crate::http::{browser_headers, check_status, detect_block_page};
use crate::identity::Identity;
use crate::proxy::ProxyConfig;
use crate::{Engine, EngineConfig, SearchResult};

/// Google search engine.
pub struct Google {
    config: EngineConfig,
}

impl Google {
    /// Creates a new Google engine.
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    fn parse_results(&self, query: &str, html: &str) -> Result<Vec<SearchResult>, BackendError> {
        let document = Html::parse_document(html);

        let container_selector = selector("div.g")?;
        let title_selector = selector("h3")?;
        let link_selector = selector("a[href]")?;
        let snippet_selector = selector("div[data-sncf], div.VwiC3b, span.st")?;

        let mut results = Vec::new();

        for element in document.select(&container_selector) {
            let title = match element.select(&title_selector).next() {
                Some(el) => element_text(el),
                None => continue,
            };

            let url = match element
                .select(&link_selector)
                .next()
                .and_then(|el| el.value().attr("href"))
                .and_then(resolve_link)
            {
                Some(url) => url,
                None => continue,
            };

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

/// Resolves a result href to the target URL.
///
/// Unwraps `/url?q=` redirects and drops Google's own pages and anything
/// that is not http(s).
fn resolve_link(href: &str) -> Option<String> {
    let target = if href.starts_with("/url?") {
        let base = Url::parse("https://www.google.com").ok()?;
        let redirect = base.join(href).ok()?;
        redirect
            .query_pairs()
            .find(|(k, _)| k == "q" || k == "url")
            .map(|(_, v)| v.into_owned())?
    } else {
        href.to_string()
    };

    let parsed = Url::parse(&target).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    let host = parsed.host_str()?.to_lowercase();
    if host == "google.com" || host.ends_with(".google.com") {
        return None;
    }
    Some(target)
}

#[async_trait]
impl Engine for Google {
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
        let num = self.config.max_results.to_string();

        let response = client
            .get(self.endpoint())
            .headers(browser_headers(identity))
            .query(&[("q", query), ("num", num.as_str()), ("start", "0"), ("hl", "en")])
            .send()
            .await?;

        // Google redirects blocked clients to /sorry/ before any status check.
        if response.url().path().contains("/sorry/") {
            return Err(BackendError::RateLimited(
                "redirected to CAPTCHA page".to_string(),
            ));
        }
        check_status(response.status(), EngineKind::Scrape)?;
        let html = response.text().await?;

        let results = self.parse_results(query, &html)?;
        if results.is_empty() {
            if let Some(blocked) = detect_block_page(&html) {
                return Err(blocked);
            }
        }
        debug!(count = results.len(), "Parsed Google results");
        Ok(results)
    }
}
