//! Errors surfaced by the orchestrator after every fallback is spent.

use thiserror::Error;

use crate::transport::{TransportError, TransportKind};

/// One transport's failure, kept for the exhaustion report.
#[derive(Debug)]
pub struct StrategyFailure {
    pub transport: TransportKind,
    pub error: TransportError,
}

/// Failure of a whole scan or of one file's download.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The page or document URL is not absolute.
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    /// Every scan strategy failed.
    #[error("all fetch strategies failed for {url}: {}", format_failures(.attempts))]
    AllStrategiesFailed {
        url: String,
        attempts: Vec<StrategyFailure>,
    },

    /// Every download attempt failed; carries the last recorded error.
    #[error("download failed for {url}: {last_error}")]
    Exhausted {
        url: String,
        #[source]
        last_error: TransportError,
    },

    /// Nothing was attempted (no transport able to download was configured).
    #[error("download failed for {url}: no transport attempted the request")]
    UnknownFailure { url: String },
}

impl FetchError {
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    pub fn all_failed(url: impl Into<String>, attempts: Vec<StrategyFailure>) -> Self {
        Self::AllStrategiesFailed {
            url: url.into(),
            attempts,
        }
    }

    /// The document or page URL this error is about.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::InvalidUrl { url }
            | Self::AllStrategiesFailed { url, .. }
            | Self::Exhausted { url, .. }
            | Self::UnknownFailure { url } => url,
        }
    }
}

fn format_failures(attempts: &[StrategyFailure]) -> String {
    if attempts.is_empty() {
        return "no transports available".to_string();
    }
    attempts
        .iter()
        .map(|f| format!("{}: {}", f.transport, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}
