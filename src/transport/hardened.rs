//! Hardened Direct HTTP transport.
//!
//! A plain HTTP client made to look like a returning desktop browser:
//! rotating User-Agents, browser fingerprint headers, and a cookie warm-up
//! walk through progressively deeper path prefixes before the real request.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::cookie::Jar;
use reqwest::header::USER_AGENT;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::{HardenedSettings, HttpTimeouts};
use crate::fetch::retry::{BackoffPolicy, classify_error, jitter_between};
use crate::user_agent::{DESKTOP_USER_AGENT, user_agent_for_attempt};

use super::headers::{self, HeaderSet};
use super::http_client::{ClientSpec, build_http_client, content_type_of, is_document_content_type};
use super::{FetchRequest, Transport, TransportError, TransportKind};

const NAME: &str = "hardened";

/// Directory prefixes warmed below the origin root.
const MAX_WARMUP_PREFIXES: usize = 2;

pub struct HardenedTransport {
    timeouts: HttpTimeouts,
    settings: HardenedSettings,
    backoff: BackoffPolicy,
    client: Option<Client>,
    /// URLs already warmed in this session.
    warmed: HashSet<String>,
}

impl HardenedTransport {
    /// Creates the transport and verifies the HTTP client can be built.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Unavailable`] when client construction fails.
    pub fn new(timeouts: HttpTimeouts, settings: HardenedSettings) -> Result<Self, TransportError> {
        let backoff = BackoffPolicy::new(settings.backoff_base, settings.backoff_max);
        let mut transport = Self {
            timeouts,
            settings,
            backoff,
            client: None,
            warmed: HashSet::new(),
        };
        transport.ensure_client()?;
        Ok(transport)
    }

    fn ensure_client(&mut self) -> Result<Client, TransportError> {
        if let Some(client) = &self.client {
            return Ok(client.clone());
        }
        let client = build_http_client(&ClientSpec {
            transport: NAME,
            user_agent: DESKTOP_USER_AGENT.to_string(),
            timeouts: self.timeouts,
            default_headers: headers::to_header_map(&headers::identity_headers()),
            cookie_jar: Some(Arc::new(Jar::default())),
        })?;
        self.client = Some(client.clone());
        Ok(client)
    }

    /// Walks the warm-up chain for `base`, skipping URLs already warmed.
    ///
    /// Advisory: returns whether every issued warm-up got a response.
    async fn warm_up(&mut self, client: &Client, base: &Url, referer: Option<&str>) -> bool {
        let mut all_ok = true;
        let mut previous: Option<String> = None;

        for url in warmup_chain(base, referer) {
            if !self.warmed.insert(url.clone()) {
                previous = Some(url);
                continue;
            }

            let request = client
                .get(&url)
                .headers(headers::to_header_map(&headers::page_headers(
                    previous.as_deref(),
                )));
            match request.send().await {
                Ok(response) => {
                    debug!(url = %url, status = response.status().as_u16(), "warm-up request");
                }
                Err(error) => {
                    debug!(url = %url, error = %error, "warm-up request failed; ignoring");
                    all_ok = false;
                }
            }

            tokio::time::sleep(jitter_between(
                self.settings.warmup_pause_min,
                self.settings.warmup_pause_max,
            ))
            .await;
            previous = Some(url);
        }

        all_ok
    }

    async fn get_page(
        &self,
        client: &Client,
        page_url: &str,
        referer: Option<&str>,
        attempt: u32,
    ) -> Result<String, TransportError> {
        let header_set: HeaderSet = headers::merge(&[
            headers::page_headers(referer),
            headers::hardened_extras(referer),
        ]);
        let response = client
            .get(page_url)
            .headers(headers::to_header_map(&header_set))
            .header(USER_AGENT, user_agent_for_attempt(attempt))
            .send()
            .await
            .map_err(|e| TransportError::network(page_url, e))?;

        check_status_200(page_url, response.status().as_u16())?;

        let body = response
            .text()
            .await
            .map_err(|e| TransportError::network(page_url, e))?;
        if body.len() <= self.settings.min_scan_bytes {
            return Err(TransportError::rejected(
                page_url,
                format!(
                    "page body of {} bytes is not above {} bytes",
                    body.len(),
                    self.settings.min_scan_bytes
                ),
            ));
        }
        Ok(body)
    }
}

#[async_trait]
impl Transport for HardenedTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Hardened
    }

    #[instrument(skip(self), fields(transport = NAME))]
    async fn scan(&mut self, page_url: &str) -> Result<String, TransportError> {
        let url = Url::parse(page_url).map_err(|_| TransportError::invalid_url(page_url))?;
        let client = self.ensure_client()?;
        self.warm_up(&client, &url, None).await;

        let referer = origin_root(&url);
        let max_attempts = self.settings.scan_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self
                .get_page(&client, page_url, referer.as_deref(), attempt)
                .await
            {
                Ok(body) => {
                    info!(bytes = body.len(), attempt, "hardened scan succeeded");
                    return Ok(body);
                }
                Err(error) => {
                    if attempt >= max_attempts || !classify_error(&error).is_retryable() {
                        return Err(error);
                    }
                    let delay = self.backoff.delay_for(attempt);
                    debug!(
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %error,
                        "hardened scan attempt failed; backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    #[instrument(skip(self, request), fields(transport = NAME, url = %request.url, attempt = request.attempt))]
    async fn fetch(&mut self, request: &FetchRequest) -> Result<Vec<u8>, TransportError> {
        let target = Url::parse(&request.url).map_err(|_| TransportError::invalid_url(&request.url))?;
        let base = Url::parse(&request.referer).unwrap_or_else(|_| target.clone());
        let client = self.ensure_client()?;
        self.warm_up(&client, &base, Some(&request.referer)).await;

        let header_set = headers::merge(&[
            headers::document_headers(&request.referer),
            headers::hardened_extras(Some(&request.referer)),
        ]);
        let response = client
            .get(&request.url)
            .headers(headers::to_header_map(&header_set))
            .header(USER_AGENT, user_agent_for_attempt(request.attempt))
            .send()
            .await
            .map_err(|e| TransportError::network(&request.url, e))?;

        check_status_200(&request.url, response.status().as_u16())?;
        let content_type = content_type_of(&response);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::network(&request.url, e))?;
        accept_document(
            &request.url,
            &content_type,
            bytes.to_vec(),
            self.settings.min_pdf_bytes,
        )
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.backoff.delay_for(attempt)
    }

    async fn close(&mut self) {
        if self.client.take().is_some() {
            debug!(warmed = self.warmed.len(), "closing hardened session");
        }
        self.warmed.clear();
    }
}

fn check_status_200(url: &str, status: u16) -> Result<(), TransportError> {
    match status {
        200 => Ok(()),
        201..=299 => Err(TransportError::rejected(url, format!("status {status} is not 200"))),
        _ => Err(TransportError::http_status(url, status)),
    }
}

/// Accepts document bytes when the content type is PDF, octet-stream or
/// absent, or when the body is larger than `min_bytes`. Empty bodies are
/// always rejected.
pub(crate) fn accept_document(
    url: &str,
    content_type: &str,
    bytes: Vec<u8>,
    min_bytes: usize,
) -> Result<Vec<u8>, TransportError> {
    if bytes.is_empty() {
        return Err(TransportError::rejected(url, "empty body"));
    }
    if is_document_content_type(content_type) || bytes.len() > min_bytes {
        return Ok(bytes);
    }
    warn!(url, content_type, bytes = bytes.len(), "rejecting non-document response");
    Err(TransportError::rejected(
        url,
        format!("content-type {content_type} with {} byte body", bytes.len()),
    ))
}

/// `scheme://host[:port]/` of a URL.
fn origin_root(url: &Url) -> Option<String> {
    headers::origin_of(url.as_str()).map(|origin| format!("{origin}/"))
}

/// Warm-up URLs for `base`: the origin root, up to two cumulative directory
/// prefixes of its path, then `referer` itself when given.
pub(crate) fn warmup_chain(base: &Url, referer: Option<&str>) -> Vec<String> {
    let Some(root) = origin_root(base) else {
        return Vec::new();
    };
    let mut chain = vec![root.clone()];

    let directories: Vec<&str> = base
        .path_segments()
        .map(|segments| {
            let all: Vec<&str> = segments.filter(|s| !s.is_empty()).collect();
            // The last segment is the page itself, not a directory.
            let dir_count = all.len().saturating_sub(1);
            all.into_iter().take(dir_count).collect()
        })
        .unwrap_or_default();

    let mut prefix = root;
    for segment in directories.into_iter().take(MAX_WARMUP_PREFIXES) {
        prefix.push_str(segment);
        prefix.push('/');
        chain.push(prefix.clone());
    }

    if let Some(referer) = referer
        && !chain.iter().any(|u| u == referer)
    {
        chain.push(referer.to_string());
    }
    chain
}
