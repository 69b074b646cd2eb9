//! Text-Rendering Mirror transport.
//!
//! Asks a public read-only rendering proxy for the page. Used for scanning
//! only; document bytes never go through the mirror since it may rewrite
//! binary content.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use tracing::{debug, info, instrument};
use url::Url;

use crate::config::HttpTimeouts;
use crate::links::{LinkRecord, dedupe_by_url, extract_pdf_links};
use crate::user_agent::DESKTOP_USER_AGENT;

use super::headers;
use super::http_client::{ClientSpec, build_http_client};
use super::{Transport, TransportError, TransportKind};

const NAME: &str = "mirror";

/// Literal PDF URLs in free text. The `.pdf` must end the path (an optional
/// query or fragment may follow) and trailing sentence punctuation is left out.
#[allow(clippy::expect_used)]
static PDF_URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)(https?://[^\s"'<>()\[\]]+?\.pdf(?:[?#][^\s"'<>()\[\]]*)?)[.,;:!]*(?:[\s"'<>()\[\]]|$)"#,
    )
    .expect("PDF URL regex is valid")
});

pub struct MirrorTransport {
    client: Client,
    base_url: String,
}

impl MirrorTransport {
    /// # Errors
    ///
    /// Returns [`TransportError::Unavailable`] when the HTTP client cannot be built.
    pub fn new(timeouts: HttpTimeouts, base_url: impl Into<String>) -> Result<Self, TransportError> {
        let client = build_http_client(&ClientSpec {
            transport: NAME,
            user_agent: DESKTOP_USER_AGENT.to_string(),
            timeouts,
            default_headers: headers::to_header_map(&headers::identity_headers()),
            cookie_jar: None,
        })?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Mirror address for a page: the base URL with the page URL appended.
    #[must_use]
    pub fn mirror_url(&self, page_url: &str) -> String {
        format!("{}{page_url}", self.base_url)
    }
}

#[async_trait]
impl Transport for MirrorTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Mirror
    }

    #[instrument(skip(self), fields(transport = NAME))]
    async fn scan(&mut self, page_url: &str) -> Result<String, TransportError> {
        let mirror_url = self.mirror_url(page_url);
        let response = self
            .client
            .get(&mirror_url)
            .send()
            .await
            .map_err(|e| TransportError::network(&mirror_url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::http_status(&mirror_url, status.as_u16()));
        }
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::network(&mirror_url, e))?;
        info!(bytes = body.len(), "mirror scan succeeded");
        Ok(body)
    }

    fn extract_links(&self, page_url: &Url, body: &str) -> Vec<LinkRecord> {
        let from_html = extract_pdf_links(page_url, body);
        if !from_html.is_empty() {
            return from_html;
        }
        let from_text = extract_pdf_urls_from_text(body);
        debug!(count = from_text.len(), "mirror HTML yielded no links; used text pattern fallback");
        from_text
    }

    async fn close(&mut self) {}
}

/// Finds literal `http(s)://....pdf` URLs in text, in discovery order,
/// de-duplicated, each with empty anchor text.
#[must_use]
pub fn extract_pdf_urls_from_text(text: &str) -> Vec<LinkRecord> {
    let records = PDF_URL_PATTERN
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| LinkRecord::new(m.as_str(), ""))
        .collect();
    dedupe_by_url(records)
}
