//! HTTP plumbing shared by all engine adapters.
//!
//! A client is built per request so that each request carries its own
//! identity and proxy. Status codes and block pages are mapped onto
//! [`BackendError`] here so every adapter classifies failures the same way.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER};
use reqwest::{Client, Response, StatusCode};
use scraper::{Html, Selector};
use tracing::debug;

use crate::engine::EngineKind;
use crate::error::BackendError;
use crate::identity::Identity;
use crate::proxy::ProxyConfig;

/// Elements that only appear on CAPTCHA / bot-block pages.
const BLOCK_SELECTORS: &[&str] = &[
    r#"form[action*="/sorry/"]"#,
    r#"a[href*="/sorry/index"]"#,
    "#captcha-form",
    "div.g-recaptcha",
    r#"iframe[src*="recaptcha"]"#,
    r#"iframe[src*="reCAPTCHA"]"#,
    r#"[class*="anomaly-modal"]"#,
];

/// Builds a client presenting `identity` and routed through `proxy`.
pub fn build_client(
    identity: &Identity,
    proxy: Option<&ProxyConfig>,
    timeout: Duration,
) -> Result<Client, BackendError> {
    let mut builder = Client::builder()
        .user_agent(identity.user_agent.as_str())
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::limited(10));

    if let Some(proxy_config) = proxy {
        debug!("Routing request via {}:{}", proxy_config.host, proxy_config.port);
        let proxy = proxy_config
            .to_reqwest()
            .map_err(|e| BackendError::Unreachable(format!("invalid proxy: {}", e.without_url())))?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| BackendError::Unreachable(format!("failed to create HTTP client: {}", e)))
}

/// Browser-like headers sent by scrape engines.
pub fn browser_headers(identity: &Identity) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert("DNT", HeaderValue::from_static("1"));
    headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));
    if let Ok(referer) = HeaderValue::from_str(&identity.referer) {
        headers.insert(REFERER, referer);
    }
    headers
}

/// Maps an HTTP status onto the backend error taxonomy.
///
/// 401/403 mean bad credentials for API engines but a block for scrape
/// engines.
pub fn check_status(status: StatusCode, kind: EngineKind) -> Result<(), BackendError> {
    if status.is_success() {
        return Ok(());
    }
    match status {
        StatusCode::TOO_MANY_REQUESTS => Err(BackendError::RateLimited(format!("HTTP {}", status))),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => match kind {
            EngineKind::Api => Err(BackendError::AuthFailed(format!("HTTP {}", status))),
            EngineKind::Scrape => Err(BackendError::RateLimited(format!("blocked: HTTP {}", status))),
        },
        s if s.is_server_error() => Err(BackendError::Unreachable(format!("HTTP {}", status))),
        _ => Err(BackendError::ParseFailure(format!("unexpected HTTP {}", status))),
    }
}

/// Returns a rate-limit error if the page is a CAPTCHA or block page.
///
/// Only page structure is inspected, so result text that mentions a
/// CAPTCHA does not count. Callers check this when a page yielded no
/// results.
pub fn detect_block_page(html: &str) -> Option<BackendError> {
    let document = Html::parse_document(html);
    BLOCK_SELECTORS
        .iter()
        .filter_map(|css| Selector::parse(css).ok().map(|sel| (css, sel)))
        .find(|(_, sel)| document.select(sel).next().is_some())
        .map(|(css, _)| BackendError::RateLimited(format!("block page detected ({})", css)))
}

/// Checks the status of a response and reads its body.
pub async fn read_body(response: Response, kind: EngineKind) -> Result<String, BackendError> {
    check_status(response.status(), kind)?;
    let body = response.text().await?;
    debug!(bytes = body.len(), "Response received");
    Ok(body)
}
