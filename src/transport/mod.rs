//! Interchangeable ways of retrieving page HTML and document bytes.
//!
//! # Architecture
//!
//! - [`Transport`] - async trait every strategy implements (scan + fetch)
//! - [`TransportKind`] - fixed preference ranking of the four strategies
//! - [`BrowserTransport`] - real rendering engine over CDP
//! - [`RequestContextTransport`] - browser network identity, no rendering
//! - [`HardenedTransport`] - rotating identities, warm-up chain, backoff
//! - [`MirrorTransport`] - third-party text rendering, scan only
//!
//! Every transport opens its expensive resource lazily and releases it in
//! [`Transport::close`].

mod browser;
mod capability;
mod error;
mod hardened;
pub mod headers;
pub mod http_client;
mod mirror;
mod request_context;

pub use browser::BrowserTransport;
pub use capability::{
    browser_executable, browser_runtime_available, launch_failed, record_launch_failure,
};
pub use error::TransportError;
pub use hardened::HardenedTransport;
pub use mirror::MirrorTransport;
pub use request_context::RequestContextTransport;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};
use url::Url;

use crate::config::HarvestConfig;
use crate::links::{LinkRecord, extract_pdf_links};

/// Transport strategies in preference order.
///
/// Derives `Ord` so that `Browser < RequestContext < Hardened < Mirror`
/// sorts the most reliable strategy first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TransportKind {
    Browser = 0,
    RequestContext = 1,
    Hardened = 2,
    Mirror = 3,
}

impl TransportKind {
    /// Whether the orchestrator uses this strategy for file downloads.
    ///
    /// Downloads go browser first, then hardened HTTP. The mirror never
    /// serves bytes because it may rewrite binary content.
    #[must_use]
    pub fn supports_download(self) -> bool {
        matches!(self, Self::Browser | Self::Hardened)
    }

    /// Stable label for logs and error listings.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Browser => "browser",
            Self::RequestContext => "request-context",
            Self::Hardened => "hardened",
            Self::Mirror => "mirror",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One download attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Absolute document URL.
    pub url: String,
    /// Page the document was linked from.
    pub referer: String,
    /// 1-indexed attempt number within the current transport.
    pub attempt: u32,
}

impl FetchRequest {
    #[must_use]
    pub fn new(url: impl Into<String>, referer: impl Into<String>, attempt: u32) -> Self {
        Self {
            url: url.into(),
            referer: referer.into(),
            attempt,
        }
    }
}

/// A page-scan and document-fetch strategy.
///
/// # Object Safety
///
/// Uses `async_trait` so the orchestrator can hold `Box<dyn Transport>`.
#[async_trait]
pub trait Transport: Send {
    /// Short name for logs (e.g. "browser", "mirror").
    fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Position in the preference ranking.
    fn kind(&self) -> TransportKind;

    /// Retrieves the page body (rendered HTML or mirrored text).
    async fn scan(&mut self, page_url: &str) -> Result<String, TransportError>;

    /// Retrieves document bytes. One call is one attempt.
    async fn fetch(&mut self, request: &FetchRequest) -> Result<Vec<u8>, TransportError> {
        let _ = request;
        Err(TransportError::unsupported(self.name(), "fetch"))
    }

    /// Turns a scanned body into PDF link records.
    fn extract_links(&self, page_url: &Url, body: &str) -> Vec<LinkRecord> {
        extract_pdf_links(page_url, body)
    }

    /// Extra pause the orchestrator adds after a failed fetch attempt.
    fn backoff(&self, attempt: u32) -> Duration {
        let _ = attempt;
        Duration::ZERO
    }

    /// Releases the session resource. Safe to call more than once and on a
    /// transport that never opened.
    async fn close(&mut self);
}

/// Builds the enabled transports in preference order.
///
/// A transport whose constructor fails is logged and skipped; the browser
/// transport is skipped when disabled or when no browser runtime is found.
#[must_use]
pub fn build_default_transports(config: &HarvestConfig) -> Vec<Box<dyn Transport>> {
    let mut transports: Vec<Box<dyn Transport>> = Vec::new();

    if !config.browser.enabled {
        debug!("browser transport disabled by configuration");
    } else if browser_runtime_available(config.browser.executable.as_deref()) {
        transports.push(Box::new(BrowserTransport::new(
            config.browser.clone(),
            config.page_url.clone(),
        )));
    } else {
        warn!("no browser runtime found; continuing with HTTP transports");
    }

    match RequestContextTransport::new(config.http, config.page_url.clone()) {
        Ok(transport) => transports.push(Box::new(transport)),
        Err(error) => warn!(
            error = %error,
            "request-context transport unavailable; continuing with remaining transports"
        ),
    }

    match HardenedTransport::new(config.http, config.hardened.clone()) {
        Ok(transport) => transports.push(Box::new(transport)),
        Err(error) => warn!(
            error = %error,
            "hardened transport unavailable; continuing with remaining transports"
        ),
    }

    match MirrorTransport::new(config.http, config.mirror_base_url.clone()) {
        Ok(transport) => transports.push(Box::new(transport)),
        Err(error) => warn!(
            error = %error,
            "mirror transport unavailable; continuing without it"
        ),
    }

    transports
}
