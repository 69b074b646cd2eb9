//! CPD Harvester Library
//!
//! Scans a document-index page for PDF links, flags the ones that look
//! English, fetches them through a ranked chain of fallback transports, and
//! packages the results as a ZIP archive. A separate metadata module infers
//! year, country and region for a downloaded document.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`text`] - Unicode folding and whole-token matching
//! - [`links`] - link extraction, English classification, output names
//! - [`transport`] - browser, request-context, hardened HTTP and mirror strategies
//! - [`fetch`] - fallback orchestration, retry policy, batch downloads
//! - [`archive`] - ZIP packaging with collision renaming
//! - [`metadata`] - year / country / region inference
//! - [`config`] - runtime settings and the TOML config file

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod archive;
pub mod config;
pub mod fetch;
pub mod links;
pub mod metadata;
pub mod text;
pub mod transport;
pub mod user_agent;

// Re-export commonly used types
pub use archive::{ArchiveError, build_archive};
pub use config::{
    BrowserSettings, DEFAULT_ARCHIVE_NAME, DEFAULT_PAGE_URL, FileConfig, HardenedSettings,
    HarvestConfig, HttpTimeouts,
};
pub use fetch::{
    BatchProgress, BatchReport, DownloadFailure, DownloadOptions, DownloadResult, FetchError,
    FetchOrchestrator, download_batch, scan_page,
};
pub use links::{ClassifiedLink, LinkRecord, is_english, select_for_download};
pub use metadata::{DocumentMetadata, detect_country, detect_region, detect_year, extract_metadata};
pub use transport::{FetchRequest, Transport, TransportError, TransportKind};
