//! Runtime configuration and TOML config file loading.
//!
//! [`HarvestConfig`] is what the library runs with. [`FileConfig`] is the
//! optional on-disk layer; every field is optional and is applied over the
//! defaults before CLI flags are applied over it.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::fetch::DownloadOptions;

/// Institutional document-index page scanned when no URL is given.
pub const DEFAULT_PAGE_URL: &str =
    "https://www.unicef.org/executiveboard/country-programme-documents";

/// Archive name written by the download command when `-o` is absent.
pub const DEFAULT_ARCHIVE_NAME: &str = "cpd_english_pdfs.zip";

/// Rendering mirror that returns a text rendering of any public page.
pub const DEFAULT_MIRROR_BASE_URL: &str = "https://r.jina.ai/";

const CONNECT_TIMEOUT_SECS: u64 = 10;
const READ_TIMEOUT_SECS: u64 = 30;

/// Browser Session settings.
#[derive(Debug, Clone)]
pub struct BrowserSettings {
    /// Try the browser transport at all.
    pub enabled: bool,
    /// Explicit Chromium/Chrome executable; autodetected when `None`.
    pub executable: Option<PathBuf>,
    pub headless: bool,
    /// Bound on a single navigation.
    pub navigation_timeout: Duration,
    /// Bound on the advisory network-quiescence wait after navigation.
    pub network_idle_timeout: Duration,
    /// Bound on waiting for a DOM-triggered download to complete.
    pub download_event_timeout: Duration,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            executable: None,
            headless: true,
            navigation_timeout: Duration::from_secs(30),
            network_idle_timeout: Duration::from_millis(8000),
            download_event_timeout: Duration::from_secs(30),
        }
    }
}

/// Timeouts shared by every reqwest client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub connect: Duration,
    pub read: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read: Duration::from_secs(READ_TIMEOUT_SECS),
        }
    }
}

/// Hardened Direct HTTP settings.
#[derive(Debug, Clone)]
pub struct HardenedSettings {
    /// Attempt budget for a hardened scan (fetch attempts are driven by the
    /// orchestrator).
    pub scan_attempts: u32,
    /// First backoff step; doubles per attempt.
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    pub warmup_pause_min: Duration,
    pub warmup_pause_max: Duration,
    /// A scanned page must be larger than this many bytes.
    pub min_scan_bytes: usize,
    /// A fetched body larger than this is accepted even with an odd content type.
    pub min_pdf_bytes: usize,
}

impl Default for HardenedSettings {
    fn default() -> Self {
        Self {
            scan_attempts: 3,
            backoff_base: Duration::from_millis(1000),
            backoff_max: Duration::from_secs(16),
            warmup_pause_min: Duration::from_millis(200),
            warmup_pause_max: Duration::from_millis(600),
            min_scan_bytes: 512,
            min_pdf_bytes: 1024,
        }
    }
}

/// Everything a scan or download batch needs.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub page_url: String,
    pub browser: BrowserSettings,
    pub http: HttpTimeouts,
    pub hardened: HardenedSettings,
    pub mirror_base_url: String,
    pub download: DownloadOptions,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            page_url: DEFAULT_PAGE_URL.to_string(),
            browser: BrowserSettings::default(),
            http: HttpTimeouts::default(),
            hardened: HardenedSettings::default(),
            mirror_base_url: DEFAULT_MIRROR_BASE_URL.to_string(),
            download: DownloadOptions::default(),
        }
    }
}

/// TOML-backed file configuration. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Default page to scan.
    pub page_url: Option<String>,
    /// Try the browser transport.
    pub browser: Option<bool>,
    /// Chromium/Chrome executable path.
    pub browser_executable: Option<PathBuf>,
    /// Show the browser window.
    pub headful: Option<bool>,
    pub connect_timeout_secs: Option<u64>,
    pub read_timeout_secs: Option<u64>,
    pub navigation_timeout_secs: Option<u64>,
    pub download_event_timeout_secs: Option<u64>,
    /// Attempts per transport per file.
    pub max_attempts: Option<u32>,
    /// Base delay between download attempts in milliseconds.
    pub delay_ms: Option<u64>,
    /// Attempt budget for hardened page scans.
    pub hardened_scan_attempts: Option<u32>,
    pub mirror_base_url: Option<String>,
}

impl FileConfig {
    /// Validates config values against runtime and CLI constraints.
    pub fn validate(&self) -> Result<()> {
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;
        validate_timeout_secs("navigation_timeout_secs", self.navigation_timeout_secs)?;
        validate_timeout_secs(
            "download_event_timeout_secs",
            self.download_event_timeout_secs,
        )?;
        validate_attempts("max_attempts", self.max_attempts)?;
        validate_attempts("hardened_scan_attempts", self.hardened_scan_attempts)?;

        if let Some(delay_ms) = self.delay_ms
            && delay_ms > 60_000
        {
            bail!("Invalid config value for `delay_ms`: {delay_ms}. Expected range: 0..=60000");
        }

        for (field, value) in [
            ("page_url", self.page_url.as_deref()),
            ("mirror_base_url", self.mirror_base_url.as_deref()),
        ] {
            if let Some(value) = value
                && url::Url::parse(value).is_err()
            {
                bail!("Invalid config value for `{field}`: '{value}' is not an absolute URL");
            }
        }

        Ok(())
    }

    /// Layers the file values over `config`.
    pub fn apply_to(&self, config: &mut HarvestConfig) {
        if let Some(page_url) = &self.page_url {
            config.page_url.clone_from(page_url);
        }
        if let Some(enabled) = self.browser {
            config.browser.enabled = enabled;
        }
        if let Some(executable) = &self.browser_executable {
            config.browser.executable = Some(executable.clone());
        }
        if let Some(headful) = self.headful {
            config.browser.headless = !headful;
        }
        if let Some(secs) = self.connect_timeout_secs {
            config.http.connect = Duration::from_secs(secs);
        }
        if let Some(secs) = self.read_timeout_secs {
            config.http.read = Duration::from_secs(secs);
        }
        if let Some(secs) = self.navigation_timeout_secs {
            config.browser.navigation_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.download_event_timeout_secs {
            config.browser.download_event_timeout = Duration::from_secs(secs);
        }
        if let Some(max_attempts) = self.max_attempts {
            config.download.max_attempts = max_attempts;
        }
        if let Some(delay_ms) = self.delay_ms {
            config.download.delay = Duration::from_millis(delay_ms);
        }
        if let Some(attempts) = self.hardened_scan_attempts {
            config.hardened.scan_attempts = attempts;
        }
        if let Some(base) = &self.mirror_base_url {
            config.mirror_base_url.clone_from(base);
        }
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

fn validate_attempts(field: &str, value: Option<u32>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=10).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=10");
    }
    Ok(())
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
}

impl LoadedConfig {
    #[must_use]
    pub fn loaded_from_file(&self) -> bool {
        self.config.is_some()
    }
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/cpd-harvester/config.toml`
/// 2. `$HOME/.config/cpd-harvester/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("cpd-harvester")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("cpd-harvester")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from the default path if present.
pub fn load_default_file_config() -> Result<LoadedConfig> {
    let path = resolve_default_config_path();
    let config = match path.as_deref() {
        Some(path_ref) if path_ref.exists() => Some(load_file_config(path_ref)?),
        _ => None,
    };
    Ok(LoadedConfig { path, config })
}

/// Loads and validates an explicit config file. A missing file is an error.
pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let cfg: FileConfig = toml::from_str(raw)?;
    cfg.validate()?;
    Ok(cfg)
}
