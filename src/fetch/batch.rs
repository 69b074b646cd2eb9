//! Sequential batch download with per-file failure reporting.

use tracing::{info, instrument, warn};

use crate::config::HarvestConfig;
use crate::links::{ClassifiedLink, UniqueNames, classify_all};

use super::error::FetchError;
use super::orchestrator::FetchOrchestrator;
use super::retry::jitter;
use super::DownloadOptions;

/// One fetched document, named uniquely within its batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// One document that could not be fetched.
#[derive(Debug)]
pub struct DownloadFailure {
    pub filename: String,
    pub url: String,
    pub error: FetchError,
}

/// Outcome of a batch. Failed files never abort their siblings.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub files: Vec<DownloadResult>,
    pub failures: Vec<DownloadFailure>,
    /// Number of links the batch was asked to fetch.
    pub requested: usize,
}

impl BatchReport {
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// True when files were requested and none arrived.
    #[must_use]
    pub fn is_total_failure(&self) -> bool {
        self.requested > 0 && self.files.is_empty()
    }

    /// `(filename, bytes)` pairs in download order, ready for the archive.
    #[must_use]
    pub fn archive_entries(&self) -> Vec<(String, Vec<u8>)> {
        self.files
            .iter()
            .map(|f| (f.filename.clone(), f.bytes.clone()))
            .collect()
    }
}

/// Progress events for a UI collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchProgress<'a> {
    Started {
        index: usize,
        total: usize,
        filename: &'a str,
    },
    Finished {
        index: usize,
        total: usize,
        filename: &'a str,
        ok: bool,
    },
}

/// Downloads `links` one after another through `orchestrator`.
///
/// Output names are claimed only for successful downloads, so a batch with
/// a failed `x.pdf` followed by another `x.pdf` still yields `x.pdf`.
pub async fn download_links<F>(
    orchestrator: &mut FetchOrchestrator,
    links: &[ClassifiedLink],
    referer: &str,
    options: &DownloadOptions,
    mut progress: F,
) -> BatchReport
where
    F: FnMut(BatchProgress<'_>),
{
    let total = links.len();
    let mut names = UniqueNames::new();
    let mut report = BatchReport {
        requested: total,
        ..BatchReport::default()
    };

    for (index, link) in links.iter().enumerate() {
        if index > 0 {
            let pause = jitter(&options.between_files_ms);
            if !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }
        }
        progress(BatchProgress::Started {
            index,
            total,
            filename: &link.filename,
        });

        let ok = match orchestrator.download(&link.url, referer, options).await {
            Ok(bytes) => {
                let filename = names.claim(&link.filename);
                info!(filename = %filename, bytes = bytes.len(), "fetched document");
                report.files.push(DownloadResult { filename, bytes });
                true
            }
            Err(error) => {
                warn!(filename = %link.filename, url = %link.url, error = %error, "document failed");
                report.failures.push(DownloadFailure {
                    filename: link.filename.clone(),
                    url: link.url.clone(),
                    error,
                });
                false
            }
        };

        progress(BatchProgress::Finished {
            index,
            total,
            filename: &link.filename,
            ok,
        });
    }

    info!(
        requested = report.requested,
        succeeded = report.succeeded(),
        failed = report.failed(),
        "batch complete"
    );
    report
}

/// Scans `page_url` with a fresh transport chain and classifies the links.
///
/// Every opened session is closed before returning, on success or error.
///
/// # Errors
///
/// See [`FetchOrchestrator::scan_page`].
#[instrument(skip(config))]
pub async fn scan_page(
    config: &HarvestConfig,
    page_url: &str,
) -> Result<Vec<ClassifiedLink>, FetchError> {
    let mut orchestrator = FetchOrchestrator::from_config(config);
    let result = orchestrator.scan_page(page_url).await;
    orchestrator.close().await;
    Ok(classify_all(&result?))
}

/// Downloads `links` with a fresh transport chain, using `config.page_url`
/// as the referer. Sessions are closed before returning.
pub async fn download_batch<F>(
    config: &HarvestConfig,
    links: &[ClassifiedLink],
    options: &DownloadOptions,
    progress: F,
) -> BatchReport
where
    F: FnMut(BatchProgress<'_>),
{
    let mut orchestrator = FetchOrchestrator::from_config(config);
    let report = download_links(&mut orchestrator, links, &config.page_url, options, progress).await;
    orchestrator.close().await;
    report
}
