//! Ranked fallback across transports.

use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::HarvestConfig;
use crate::links::LinkRecord;
use crate::transport::{
    FetchRequest, Transport, TransportError, TransportKind, build_default_transports,
};

use super::DownloadOptions;
use super::error::{FetchError, StrategyFailure};
use super::retry::{FailureType, classify_error};

/// Owns one session per transport for the duration of a batch.
///
/// Call [`FetchOrchestrator::close`] when the batch ends, on every path.
pub struct FetchOrchestrator {
    transports: Vec<Box<dyn Transport>>,
}

impl FetchOrchestrator {
    /// Takes ownership of the transports and sorts them by preference.
    #[must_use]
    pub fn new(mut transports: Vec<Box<dyn Transport>>) -> Self {
        transports.sort_by_key(|t| t.kind());
        for transport in &transports {
            debug!(
                transport = transport.name(),
                downloads = transport.kind().supports_download(),
                "registering transport"
            );
        }
        Self { transports }
    }

    /// Builds the default transport chain for `config`.
    #[must_use]
    pub fn from_config(config: &HarvestConfig) -> Self {
        Self::new(build_default_transports(config))
    }

    /// Kinds in the order they are tried.
    #[must_use]
    pub fn kinds(&self) -> Vec<TransportKind> {
        self.transports.iter().map(|t| t.kind()).collect()
    }

    /// Scans `page_url` with each transport in turn and returns the links
    /// found by the first one that produces a non-blank body.
    ///
    /// # Errors
    ///
    /// [`FetchError::InvalidUrl`] for a relative or malformed URL and
    /// [`FetchError::AllStrategiesFailed`] when every transport failed.
    #[instrument(skip(self), fields(url = %page_url))]
    pub async fn scan_page(&mut self, page_url: &str) -> Result<Vec<LinkRecord>, FetchError> {
        let parsed = Url::parse(page_url).map_err(|_| FetchError::invalid_url(page_url))?;
        let mut failures = Vec::new();

        for transport in &mut self.transports {
            let name = transport.name();
            debug!(transport = name, "trying scan");

            let error = match transport.scan(page_url).await {
                Ok(body) if !body.trim().is_empty() => {
                    let links = transport.extract_links(&parsed, &body);
                    info!(transport = name, links = links.len(), "scan succeeded");
                    return Ok(links);
                }
                Ok(_) => TransportError::rejected(page_url, "blank page body"),
                Err(error) => error,
            };

            if classify_error(&error) == FailureType::Unavailable {
                debug!(transport = name, error = %error, "transport unavailable, trying next");
            } else {
                warn!(transport = name, error = %error, "scan failed, trying next transport");
            }
            failures.push(StrategyFailure {
                transport: transport.kind(),
                error,
            });
        }

        Err(FetchError::all_failed(page_url, failures))
    }

    /// Downloads one document. Download-capable transports are tried in
    /// order, each for up to `options.max_attempts` attempts. Transient
    /// failures are retried after `delay + jitter + transport backoff`;
    /// permanent and unavailable failures move on to the next transport.
    ///
    /// # Errors
    ///
    /// [`FetchError::Exhausted`] with the last recorded error, or
    /// [`FetchError::UnknownFailure`] when no transport attempted the URL.
    #[instrument(skip(self, options), fields(url = %url))]
    pub async fn download(
        &mut self,
        url: &str,
        referer: &str,
        options: &DownloadOptions,
    ) -> Result<Vec<u8>, FetchError> {
        Url::parse(url).map_err(|_| FetchError::invalid_url(url))?;
        let max_attempts = options.max_attempts.max(1);
        let mut last_error: Option<TransportError> = None;

        for transport in self
            .transports
            .iter_mut()
            .filter(|t| t.kind().supports_download())
        {
            let name = transport.name();
            for attempt in 1..=max_attempts {
                debug!(transport = name, attempt, "trying download");
                let request = FetchRequest::new(url, referer, attempt);

                let error = match transport.fetch(&request).await {
                    Ok(bytes) => {
                        info!(transport = name, attempt, bytes = bytes.len(), "download succeeded");
                        return Ok(bytes);
                    }
                    Err(error) => error,
                };

                let failure = classify_error(&error);
                if failure == FailureType::Unavailable {
                    debug!(transport = name, error = %error, "transport unavailable, trying next");
                } else {
                    warn!(transport = name, attempt, error = %error, "download attempt failed");
                }
                last_error = Some(error);

                if !failure.is_retryable() || attempt == max_attempts {
                    break;
                }
                let pause = options.attempt_pause() + transport.backoff(attempt);
                if !pause.is_zero() {
                    debug!(
                        transport = name,
                        pause_ms = u64::try_from(pause.as_millis()).unwrap_or(u64::MAX),
                        "pausing before next attempt"
                    );
                    tokio::time::sleep(pause).await;
                }
            }
        }

        match last_error {
            Some(last_error) => Err(FetchError::Exhausted {
                url: url.to_string(),
                last_error,
            }),
            None => Err(FetchError::UnknownFailure {
                url: url.to_string(),
            }),
        }
    }

    /// Tears down every transport session.
    pub async fn close(&mut self) {
        for transport in &mut self.transports {
            transport.close().await;
        }
        debug!(transports = self.transports.len(), "closed transport sessions");
    }
}
