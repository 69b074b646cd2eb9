//! Browser Session transport.
//!
//! Drives a real Chromium over CDP with a desktop identity. Scans return the
//! rendered DOM. Fetches first try an in-page `fetch()` from the referer
//! page, then fall back to clicking a temporary `<a download>` and reading
//! the file the browser saves.

#[cfg(feature = "browser")]
use std::path::PathBuf;
#[cfg(feature = "browser")]
use std::time::Duration;

use async_trait::async_trait;
#[cfg(feature = "browser")]
use serde::Deserialize;
#[cfg(feature = "browser")]
use tracing::{debug, info, instrument, warn};

#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::browser::{
    DownloadProgressState, EventDownloadProgress, SetDownloadBehaviorBehavior,
    SetDownloadBehaviorParams,
};
#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::network::{
    Headers, SetExtraHttpHeadersParams, SetUserAgentOverrideParams,
};
#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
#[cfg(feature = "browser")]
use chromiumoxide::{Browser, BrowserConfig, Page};
#[cfg(feature = "browser")]
use futures_util::StreamExt;
#[cfg(feature = "browser")]
use tokio::task::JoinHandle;

use crate::config::BrowserSettings;
#[cfg(feature = "browser")]
use crate::user_agent::{DESKTOP_LOCALE, DESKTOP_USER_AGENT};

#[cfg(feature = "browser")]
use super::capability::{browser_executable, launch_failed, record_launch_failure};
#[cfg(feature = "browser")]
use super::headers::{self, ACCEPT_LANGUAGE, ACCEPT_PDF, HeaderSet};
#[cfg(feature = "browser")]
use super::http_client::is_document_content_type;
use super::{FetchRequest, Transport, TransportError, TransportKind};

const NAME: &str = "browser";

#[cfg(feature = "browser")]
const LAUNCH_ARGS: &[&str] = &[
    "--disable-blink-features=AutomationControlled",
    "--disable-infobars",
    "--disable-dev-shm-usage",
    "--no-first-run",
    "--no-default-browser-check",
    "--disable-sync",
    "--no-sandbox",
    "--disable-gpu",
];

/// Injected before any page script runs.
#[cfg(feature = "browser")]
const STEALTH_SCRIPT: &str = r"
    Object.defineProperty(navigator, 'webdriver', { get: () => undefined, configurable: true });
    Object.defineProperty(navigator, 'languages', { get: () => ['en-US', 'en'], configurable: true });
    window.chrome = window.chrome || { runtime: {}, app: {} };
";

/// Resolves once the document has finished loading.
#[cfg(feature = "browser")]
const WAIT_FOR_READY_SCRIPT: &str = r"
    new Promise((resolve) => {
        if (document.readyState === 'complete') {
            resolve(document.readyState);
        } else {
            window.addEventListener('load', () => resolve(document.readyState));
        }
    })
";

#[cfg(feature = "browser")]
struct BrowserSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

#[cfg(feature = "browser")]
impl Drop for BrowserSession {
    fn drop(&mut self) {
        // `Browser` kills its child process on drop; the CDP pump goes with it.
        self.handler.abort();
    }
}

/// Outcome of the in-page `fetch()` script.
#[cfg(feature = "browser")]
#[derive(Debug, Deserialize)]
struct InPageFetch {
    #[serde(default)]
    status: u16,
    #[serde(default, rename = "contentType")]
    content_type: String,
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

pub struct BrowserTransport {
    #[cfg_attr(not(feature = "browser"), allow(dead_code))]
    settings: BrowserSettings,
    #[cfg_attr(not(feature = "browser"), allow(dead_code))]
    referer: String,
    #[cfg(feature = "browser")]
    session: Option<BrowserSession>,
    /// Set once a launch fails; later calls report it without relaunching.
    #[cfg(feature = "browser")]
    launch_error: Option<String>,
    #[cfg(feature = "browser")]
    launch_attempts: u32,
}

impl BrowserTransport {
    /// Creates the transport. Nothing launches until the first scan or fetch.
    #[must_use]
    pub fn new(settings: BrowserSettings, referer: impl Into<String>) -> Self {
        Self {
            settings,
            referer: referer.into(),
            #[cfg(feature = "browser")]
            session: None,
            #[cfg(feature = "browser")]
            launch_error: None,
            #[cfg(feature = "browser")]
            launch_attempts: 0,
        }
    }
}

#[cfg(feature = "browser")]
impl BrowserTransport {
    /// Opens the session on first use. A failed launch is final for this
    /// transport and for the executable process-wide.
    async fn ensure_open(&mut self) -> Result<(), TransportError> {
        if self.session.is_some() {
            return Ok(());
        }
        if let Some(reason) = &self.launch_error {
            return Err(TransportError::unavailable(NAME, reason.clone()));
        }

        let executable = browser_executable(self.settings.executable.as_deref())
            .ok_or_else(|| TransportError::unavailable(NAME, "no Chromium or Chrome executable found"))?;
        if launch_failed(&executable) {
            let reason = format!("{} failed to launch earlier", executable.display());
            self.launch_error = Some(reason.clone());
            return Err(TransportError::unavailable(NAME, reason));
        }

        match self.launch(executable.clone()).await {
            Ok(session) => {
                self.session = Some(session);
                Ok(())
            }
            Err(error) => {
                record_launch_failure(&executable);
                self.launch_error = Some(error.to_string());
                Err(error)
            }
        }
    }

    /// Launches the browser, prepares one page and lands it on the referer.
    async fn launch(&mut self, executable: PathBuf) -> Result<BrowserSession, TransportError> {
        self.launch_attempts += 1;
        info!(executable = %executable.display(), headless = self.settings.headless, "launching browser");

        let mut builder = BrowserConfig::builder()
            .chrome_executable(executable)
            .request_timeout(self.settings.navigation_timeout);
        if !self.settings.headless {
            builder = builder.with_head();
        }
        for arg in LAUNCH_ARGS {
            builder = builder.arg(*arg);
        }
        builder = builder.arg(format!("--lang={DESKTOP_LOCALE}"));
        let config = builder
            .build()
            .map_err(|e| TransportError::unavailable(NAME, format!("invalid browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| TransportError::unavailable(NAME, format!("launch failed: {e}")))?;
        let handler = tokio::spawn(async move { while handler.next().await.is_some() {} });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(TransportError::unavailable(NAME, format!("could not open page: {e}")));
            }
        };
        let session = BrowserSession {
            browser,
            page,
            handler,
        };

        prepare_page(&session.page).await?;
        navigate_advisory(&session.page, &self.referer, self.settings.navigation_timeout).await;
        Ok(session)
    }

    fn session(&self) -> Result<&BrowserSession, TransportError> {
        self.session
            .as_ref()
            .ok_or_else(|| TransportError::unavailable(NAME, "session not open"))
    }
}

#[cfg(feature = "browser")]
async fn prepare_page(page: &Page) -> Result<(), TransportError> {
    let user_agent = SetUserAgentOverrideParams::builder()
        .user_agent(DESKTOP_USER_AGENT)
        .accept_language(ACCEPT_LANGUAGE)
        .build()
        .map_err(|e| TransportError::unavailable(NAME, e))?;
    page.execute(user_agent)
        .await
        .map_err(|e| TransportError::unavailable(NAME, format!("user agent override failed: {e}")))?;

    if let Err(e) = page
        .execute(AddScriptToEvaluateOnNewDocumentParams::new(STEALTH_SCRIPT))
        .await
    {
        debug!(error = %e, "stealth script injection skipped");
    }

    set_extra_headers(page, &headers::identity_headers()).await;
    Ok(())
}

/// Replaces the extra headers sent with every page request. Advisory.
#[cfg(feature = "browser")]
async fn set_extra_headers(page: &Page, set: &HeaderSet) -> bool {
    let params = SetExtraHttpHeadersParams::new(Headers::new(headers::to_json_object(set)));
    match page.execute(params).await {
        Ok(_) => true,
        Err(e) => {
            debug!(error = %e, "setting extra HTTP headers failed");
            false
        }
    }
}

/// Navigates without failing the caller. Advisory.
#[cfg(feature = "browser")]
async fn navigate_advisory(page: &Page, url: &str, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, page.goto(url)).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            warn!(url, error = %e, "navigation failed; continuing");
            false
        }
        Err(_) => {
            warn!(url, "navigation timed out; continuing");
            false
        }
    }
}

/// Waits for the load event, bounded by `timeout`. Advisory.
#[cfg(feature = "browser")]
async fn wait_for_quiescence(page: &Page, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, page.evaluate(WAIT_FOR_READY_SCRIPT)).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            debug!(error = %e, "ready-state check failed");
            false
        }
        Err(_) => {
            debug!("timed out waiting for page quiescence; proceeding");
            false
        }
    }
}

#[cfg(feature = "browser")]
async fn current_url(page: &Page) -> Option<String> {
    page.url().await.ok().flatten()
}

/// Lands on the referer unless the page is already on the referer's origin.
#[cfg(feature = "browser")]
async fn ensure_on_referer(page: &Page, referer: &str, timeout: Duration) -> bool {
    let current = current_url(page).await;
    let same_origin = match (current.as_deref().and_then(headers::origin_of), headers::origin_of(referer)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    };
    if same_origin {
        return true;
    }
    navigate_advisory(page, referer, timeout).await
}

#[cfg(feature = "browser")]
fn in_page_fetch_script(url: &str, referer: &str) -> Result<String, TransportError> {
    let url_js = serde_json::to_string(url).map_err(|e| TransportError::browser(url, e))?;
    let referer_js = serde_json::to_string(referer).map_err(|e| TransportError::browser(url, e))?;
    let accept_js = serde_json::to_string(ACCEPT_PDF).map_err(|e| TransportError::browser(url, e))?;
    Ok(format!(
        r"
        (async () => {{
            try {{
                const response = await fetch({url_js}, {{
                    method: 'GET',
                    credentials: 'include',
                    referrer: {referer_js},
                    headers: {{ 'Accept': {accept_js} }}
                }});
                const contentType = response.headers.get('content-type') || '';
                if (!response.ok) {{
                    return {{ status: response.status, contentType, error: 'HTTP ' + response.status }};
                }}
                const bytes = new Uint8Array(await response.arrayBuffer());
                let binary = '';
                for (let i = 0; i < bytes.length; i += 0x8000) {{
                    binary += String.fromCharCode.apply(null, bytes.subarray(i, i + 0x8000));
                }}
                return {{ status: response.status, contentType, data: btoa(binary) }};
            }} catch (e) {{
                return {{ status: 0, error: e.toString() }};
            }}
        }})()
        "
    ))
}

#[cfg(feature = "browser")]
fn click_download_script(url: &str) -> Result<String, TransportError> {
    let url_js = serde_json::to_string(url).map_err(|e| TransportError::browser(url, e))?;
    Ok(format!(
        r"
        (() => {{
            const a = document.createElement('a');
            a.href = {url_js};
            a.download = '';
            a.rel = 'noopener';
            a.target = '_self';
            document.body.appendChild(a);
            a.click();
            a.remove();
            return true;
        }})()
        "
    ))
}

/// In-page `fetch()` carrying the session's cookies and a first-party referer.
#[cfg(feature = "browser")]
async fn fetch_in_context(page: &Page, request: &FetchRequest) -> Result<Vec<u8>, TransportError> {
    use base64::Engine;

    let url = request.url.as_str();
    let header_set = headers::merge(&[
        headers::identity_headers(),
        headers::document_headers(&request.referer),
    ]);
    set_extra_headers(page, &header_set).await;

    let script = in_page_fetch_script(url, &request.referer)?;
    let evaluated = page.evaluate(script).await;
    // Page-wide document headers must not leak into later navigations.
    set_extra_headers(page, &headers::identity_headers()).await;

    let outcome: InPageFetch = evaluated
        .map_err(|e| TransportError::browser(url, e))?
        .into_value()
        .map_err(|e| TransportError::browser(url, format!("unexpected fetch result: {e}")))?;

    if let Some(error) = outcome.error {
        if outcome.status == 0 {
            return Err(TransportError::browser(url, format!("in-page fetch failed: {error}")));
        }
        return Err(TransportError::http_status(url, outcome.status));
    }
    if !is_document_content_type(&outcome.content_type) {
        return Err(TransportError::rejected(
            url,
            format!("content-type {}", outcome.content_type),
        ));
    }

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(outcome.data.unwrap_or_default())
        .map_err(|e| TransportError::browser(url, format!("bad base64 body: {e}")))?;
    if bytes.is_empty() {
        return Err(TransportError::rejected(url, "empty body"));
    }
    Ok(bytes)
}

/// Triggers a user-style download and reads the saved file.
///
/// The temporary directory is removed when it drops, on every path.
#[cfg(feature = "browser")]
async fn fetch_via_download_event(
    session: &BrowserSession,
    request: &FetchRequest,
    settings: &BrowserSettings,
) -> Result<Vec<u8>, TransportError> {
    let url = request.url.as_str();
    let dir = tempfile::Builder::new()
        .prefix("cpd_dl_")
        .tempdir()
        .map_err(|e| TransportError::io(std::env::temp_dir(), e))?;

    let behavior = SetDownloadBehaviorParams::builder()
        .behavior(SetDownloadBehaviorBehavior::AllowAndName)
        .download_path(dir.path().to_string_lossy().into_owned())
        .events_enabled(true)
        .build()
        .map_err(|e| TransportError::browser(url, e))?;
    session
        .browser
        .execute(behavior)
        .await
        .map_err(|e| TransportError::browser(url, e))?;

    let mut progress = session
        .browser
        .event_listener::<EventDownloadProgress>()
        .await
        .map_err(|e| TransportError::browser(url, e))?;

    ensure_on_referer(&session.page, &request.referer, settings.navigation_timeout).await;
    session
        .page
        .evaluate(click_download_script(url)?)
        .await
        .map_err(|e| TransportError::browser(url, e))?;

    let wait = async {
        while let Some(event) = progress.next().await {
            match event.state {
                DownloadProgressState::Completed => return Ok(event.guid.clone()),
                DownloadProgressState::Canceled => {
                    return Err(TransportError::browser(url, "download canceled"));
                }
                DownloadProgressState::InProgress => {}
            }
        }
        Err(TransportError::browser(url, "download event stream ended"))
    };
    let guid = tokio::time::timeout(settings.download_event_timeout, wait)
        .await
        .map_err(|_| TransportError::timeout(url))??;

    let path = dir.path().join(&guid);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| TransportError::io(&path, e))?;
    if bytes.is_empty() {
        return Err(TransportError::rejected(url, "empty download"));
    }
    debug!(bytes = bytes.len(), "download event completed");
    Ok(bytes)
}

#[cfg(feature = "browser")]
#[async_trait]
impl Transport for BrowserTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Browser
    }

    #[instrument(skip(self), fields(transport = NAME))]
    async fn scan(&mut self, page_url: &str) -> Result<String, TransportError> {
        self.ensure_open().await?;
        let settings = &self.settings;
        let session = self.session()?;
        let page = &session.page;

        if current_url(page).await.as_deref() != Some(page_url) {
            tokio::time::timeout(settings.navigation_timeout, page.goto(page_url))
                .await
                .map_err(|_| TransportError::timeout(page_url))?
                .map_err(|e| TransportError::browser(page_url, e))?;
        }
        wait_for_quiescence(page, settings.network_idle_timeout).await;

        let html = page
            .content()
            .await
            .map_err(|e| TransportError::browser(page_url, e))?;
        info!(bytes = html.len(), "browser scan succeeded");
        Ok(html)
    }

    #[instrument(skip(self, request), fields(transport = NAME, url = %request.url, attempt = request.attempt))]
    async fn fetch(&mut self, request: &FetchRequest) -> Result<Vec<u8>, TransportError> {
        self.ensure_open().await?;
        let settings = &self.settings;
        let session = self.session()?;

        ensure_on_referer(&session.page, &request.referer, settings.navigation_timeout).await;
        match fetch_in_context(&session.page, request).await {
            Ok(bytes) => return Ok(bytes),
            Err(error) => debug!(error = %error, "in-context request failed; trying download event"),
        }
        fetch_via_download_event(session, request, settings).await
    }

    async fn close(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        if let Err(e) = session.browser.close().await {
            debug!(error = %e, "browser close command failed");
        }
        if let Err(e) = session.browser.wait().await {
            debug!(error = %e, "waiting for browser exit failed");
        }
        info!("browser session closed");
    }
}

#[cfg(not(feature = "browser"))]
#[async_trait]
impl Transport for BrowserTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Browser
    }

    async fn scan(&mut self, _page_url: &str) -> Result<String, TransportError> {
        Err(TransportError::unavailable(
            NAME,
            "built without browser support; rebuild with --features browser",
        ))
    }

    async fn fetch(&mut self, _request: &FetchRequest) -> Result<Vec<u8>, TransportError> {
        Err(TransportError::unavailable(
            NAME,
            "built without browser support; rebuild with --features browser",
        ))
    }

    async fn close(&mut self) {}
}

#[cfg(all(test, feature = "browser"))]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_in_page_fetch_script_escapes_urls() {
        let script =
            in_page_fetch_script("https://example.org/a'b\".pdf", "https://example.org/").unwrap();
        assert!(script.contains(r#""https://example.org/a'b\".pdf""#));
        assert!(script.contains("credentials: 'include'"));
    }

    #[test]
    fn test_click_script_embeds_url_as_json() {
        let script = click_download_script("https://example.org/x.pdf").unwrap();
        assert!(script.contains(r#"a.href = "https://example.org/x.pdf";"#));
        assert!(script.contains("a.download = ''"));
    }

    #[test]
    fn test_in_page_fetch_outcome_parses() {
        let outcome: InPageFetch = serde_json::from_value(serde_json::json!({
            "status": 200,
            "contentType": "application/pdf",
            "data": "JVBERg=="
        }))
        .unwrap();
        assert_eq!(outcome.status, 200);
        assert_eq!(outcome.content_type, "application/pdf");
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn test_failed_launch_is_not_retried() {
        let dir = tempfile::TempDir::new().unwrap();
        let broken = dir.path().join("chrome");
        std::fs::write(&broken, b"not a browser").unwrap();
        let settings = BrowserSettings {
            executable: Some(broken.clone()),
            ..BrowserSettings::default()
        };
        let request = FetchRequest::new("https://example.org/a.pdf", "https://example.org/", 1);

        let mut transport = BrowserTransport::new(settings.clone(), "https://example.org/");
        for _ in 0..3 {
            assert!(matches!(
                transport.fetch(&request).await,
                Err(TransportError::Unavailable { .. })
            ));
        }
        assert_eq!(transport.launch_attempts, 1);

        let mut fresh = BrowserTransport::new(settings, "https://example.org/");
        assert!(matches!(
            fresh.scan("https://example.org/").await,
            Err(TransportError::Unavailable { .. })
        ));
        assert_eq!(fresh.launch_attempts, 0);
        assert!(!crate::transport::browser_runtime_available(Some(&broken)));
    }

    #[tokio::test]
    async fn test_close_without_open_is_noop() {
        let mut transport = BrowserTransport::new(BrowserSettings::default(), "https://example.org/");
        transport.close().await;
        assert!(transport.session.is_none());
    }
}
