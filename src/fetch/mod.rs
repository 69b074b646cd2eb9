//! Page scanning and document download across ranked transports.
//!
//! # Architecture
//!
//! - [`FetchOrchestrator`] - walks the transports in preference order
//! - [`retry`] - failure classification, backoff and jitter
//! - [`download_links`] / [`download_batch`] - sequential batch with
//!   per-file failure reporting
//!
//! The library entry points [`scan_page`] and [`download_batch`] build a
//! fresh orchestrator per call and always close it.

mod batch;
mod error;
mod orchestrator;
pub mod retry;

pub use batch::{
    BatchProgress, BatchReport, DownloadFailure, DownloadResult, download_batch, download_links,
    scan_page,
};
pub use error::{FetchError, StrategyFailure};
pub use orchestrator::FetchOrchestrator;

use std::ops::RangeInclusive;
use std::time::Duration;

/// Default attempts per transport per file.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default base delay between download attempts.
pub const DEFAULT_DELAY_MS: u64 = 500;

/// Knobs for one download batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    /// Attempts per transport per file.
    pub max_attempts: u32,
    /// Base pause after a failed attempt.
    pub delay: Duration,
    /// Random component added to `delay`, in milliseconds.
    pub jitter_ms: RangeInclusive<u64>,
    /// Random pause between consecutive files, in milliseconds.
    pub between_files_ms: RangeInclusive<u64>,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: Duration::from_millis(DEFAULT_DELAY_MS),
            jitter_ms: 100..=400,
            between_files_ms: 50..=150,
        }
    }
}

impl DownloadOptions {
    /// Options that never sleep. Handy for tests and local mirrors.
    #[must_use]
    pub fn without_pauses(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            delay: Duration::ZERO,
            jitter_ms: 0..=0,
            between_files_ms: 0..=0,
        }
    }

    /// Pause inserted after a failed attempt, before the transport's own backoff.
    #[must_use]
    pub fn attempt_pause(&self) -> Duration {
        self.delay + retry::jitter(&self.jitter_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_download_options() {
        let options = DownloadOptions::default();
        assert_eq!(options.max_attempts, 3);
        assert_eq!(options.delay, Duration::from_millis(500));
        let pause = options.attempt_pause();
        assert!(pause >= Duration::from_millis(600));
        assert!(pause <= Duration::from_millis(900));
    }

    #[test]
    fn test_without_pauses_never_sleeps() {
        let options = DownloadOptions::without_pauses(2);
        assert_eq!(options.max_attempts, 2);
        assert_eq!(options.attempt_pause(), Duration::ZERO);
    }
}
