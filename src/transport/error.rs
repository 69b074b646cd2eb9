//! Errors raised by a single transport attempt.

use std::path::PathBuf;

use thiserror::Error;

/// Failure of one scan or fetch attempt on one transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network-level error (DNS, connection reset, TLS, body read).
    #[error("network error fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The request or a bounded wait ran out of time.
    #[error("timeout fetching {url}")]
    Timeout { url: String },

    /// Non-success HTTP status.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus { url: String, status: u16 },

    /// The response arrived but is not acceptable (wrong content type, empty
    /// or undersized body).
    #[error("content rejected for {url}: {reason}")]
    ContentRejected { url: String, reason: String },

    /// The transport cannot run on this host (browser runtime missing,
    /// launch failure, client construction failure).
    #[error("{transport} transport unavailable: {reason}")]
    Unavailable {
        transport: &'static str,
        reason: String,
    },

    /// The transport does not implement the requested operation.
    #[error("{transport} transport does not support {operation}")]
    Unsupported {
        transport: &'static str,
        operation: &'static str,
    },

    /// Browser automation failure (CDP command, script evaluation, download
    /// event).
    #[error("browser error for {url}: {message}")]
    Browser { url: String, message: String },

    /// Local file system failure (temporary download directory).
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The URL could not be parsed or joined.
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },
}

impl TransportError {
    /// Wraps a reqwest error, mapping its timeouts to [`TransportError::Timeout`].
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            return Self::Timeout { url };
        }
        Self::Network { url, source }
    }

    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    pub fn rejected(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ContentRejected {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn unavailable(transport: &'static str, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            transport,
            reason: reason.into(),
        }
    }

    pub fn unsupported(transport: &'static str, operation: &'static str) -> Self {
        Self::Unsupported {
            transport,
            operation,
        }
    }

    pub fn browser(url: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Browser {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }
}

// No `From<reqwest::Error>` or `From<std::io::Error>`: every variant needs the
// URL or path that the source error does not carry.
