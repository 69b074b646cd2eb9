//! Script-Level Request Context transport.
//!
//! Same network identity as the browser session (user agent, locale,
//! headers, cookie jar) but nothing is ever rendered.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::cookie::Jar;
use tracing::{debug, info, instrument};

use crate::config::HttpTimeouts;
use crate::user_agent::DESKTOP_USER_AGENT;

use super::hardened::accept_document;
use super::headers;
use super::http_client::{ClientSpec, build_http_client, content_type_of};
use super::{FetchRequest, Transport, TransportError, TransportKind};

const NAME: &str = "request-context";

/// Bodies above this size are accepted even with an unexpected content type.
const MIN_DOCUMENT_BYTES: usize = 1024;

struct Session {
    client: Client,
}

pub struct RequestContextTransport {
    timeouts: HttpTimeouts,
    referer: String,
    session: Option<Session>,
}

impl RequestContextTransport {
    /// Creates the transport. `referer` is primed once per session for cookies.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Unavailable`] when the HTTP client cannot be built.
    pub fn new(timeouts: HttpTimeouts, referer: impl Into<String>) -> Result<Self, TransportError> {
        // Fail early so the orchestrator never holds a transport that cannot open.
        build_client(timeouts)?;
        Ok(Self {
            timeouts,
            referer: referer.into(),
            session: None,
        })
    }

    async fn ensure_open(&mut self) -> Result<&Session, TransportError> {
        if self.session.is_none() {
            let client = build_client(self.timeouts)?;
            prime_cookies(&client, &self.referer).await;
            self.session = Some(Session { client });
        }
        self.session
            .as_ref()
            .ok_or_else(|| TransportError::unavailable(NAME, "session not open"))
    }
}

fn build_client(timeouts: HttpTimeouts) -> Result<Client, TransportError> {
    build_http_client(&ClientSpec {
        transport: NAME,
        user_agent: DESKTOP_USER_AGENT.to_string(),
        timeouts,
        default_headers: headers::to_header_map(&headers::identity_headers()),
        cookie_jar: Some(Arc::new(Jar::default())),
    })
}

/// GETs the referer page purely to collect cookies. Advisory.
async fn prime_cookies(client: &Client, referer: &str) -> bool {
    match client.get(referer).send().await {
        Ok(response) => {
            debug!(referer, status = response.status().as_u16(), "primed cookies");
            true
        }
        Err(error) => {
            debug!(referer, error = %error, "cookie priming failed; continuing");
            false
        }
    }
}

#[async_trait]
impl Transport for RequestContextTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::RequestContext
    }

    #[instrument(skip(self), fields(transport = NAME))]
    async fn scan(&mut self, page_url: &str) -> Result<String, TransportError> {
        let referer = self.referer.clone();
        let session = self.ensure_open().await?;
        let response = session
            .client
            .get(page_url)
            .headers(headers::to_header_map(&headers::page_headers(Some(&referer))))
            .send()
            .await
            .map_err(|e| TransportError::network(page_url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::http_status(page_url, status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| TransportError::network(page_url, e))?;
        info!(bytes = body.len(), "request-context scan succeeded");
        Ok(body)
    }

    #[instrument(skip(self, request), fields(transport = NAME, url = %request.url))]
    async fn fetch(&mut self, request: &FetchRequest) -> Result<Vec<u8>, TransportError> {
        let session = self.ensure_open().await?;
        let response = session
            .client
            .get(&request.url)
            .headers(headers::to_header_map(&headers::document_headers(
                &request.referer,
            )))
            .send()
            .await
            .map_err(|e| TransportError::network(&request.url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::http_status(&request.url, status.as_u16()));
        }
        let content_type = content_type_of(&response);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::network(&request.url, e))?;
        accept_document(&request.url, &content_type, bytes.to_vec(), MIN_DOCUMENT_BYTES)
    }

    async fn close(&mut self) {
        if self.session.take().is_some() {
            debug!("closed request-context session");
        }
    }
}
