//! Scripted transports with call counters for orchestrator tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use cpd_harvester::transport::{FetchRequest, Transport, TransportError, TransportKind};

/// What a scripted scan returns.
#[derive(Debug, Clone)]
pub enum ScanScript {
    Body(String),
    Status(u16),
    Unavailable,
}

/// What a scripted fetch returns for a request.
pub type FetchScript = fn(&FetchRequest) -> Result<Vec<u8>, TransportError>;

#[derive(Debug, Default)]
pub struct Calls {
    pub scans: AtomicU32,
    pub fetches: AtomicU32,
    pub closes: AtomicU32,
}

impl Calls {
    pub fn scans(&self) -> u32 {
        self.scans.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> u32 {
        self.closes.load(Ordering::SeqCst)
    }
}

pub struct ScriptedTransport {
    kind: TransportKind,
    scan: ScanScript,
    fetch: Option<FetchScript>,
    calls: Arc<Calls>,
}

impl ScriptedTransport {
    pub fn new(kind: TransportKind, scan: ScanScript) -> Self {
        Self {
            kind,
            scan,
            fetch: None,
            calls: Arc::new(Calls::default()),
        }
    }

    #[must_use]
    pub fn with_fetch(mut self, fetch: FetchScript) -> Self {
        self.fetch = Some(fetch);
        self
    }

    pub fn calls(&self) -> Arc<Calls> {
        Arc::clone(&self.calls)
    }

    pub fn boxed(self) -> Box<dyn Transport> {
        Box::new(self)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    async fn scan(&mut self, page_url: &str) -> Result<String, TransportError> {
        self.calls.scans.fetch_add(1, Ordering::SeqCst);
        match &self.scan {
            ScanScript::Body(body) => Ok(body.clone()),
            ScanScript::Status(status) => Err(TransportError::http_status(page_url, *status)),
            ScanScript::Unavailable => Err(TransportError::unavailable(self.name(), "scripted")),
        }
    }

    async fn fetch(&mut self, request: &FetchRequest) -> Result<Vec<u8>, TransportError> {
        self.calls.fetches.fetch_add(1, Ordering::SeqCst);
        match self.fetch {
            Some(script) => script(request),
            None => Err(TransportError::unsupported(self.name(), "fetch")),
        }
    }

    async fn close(&mut self) {
        self.calls.closes.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn pdf_bytes(request: &FetchRequest) -> Result<Vec<u8>, TransportError> {
    Ok(format!("%PDF-1.7 {}", request.url).into_bytes())
}

pub fn not_found(request: &FetchRequest) -> Result<Vec<u8>, TransportError> {
    Err(TransportError::http_status(&request.url, 404))
}

pub fn service_unavailable(request: &FetchRequest) -> Result<Vec<u8>, TransportError> {
    Err(TransportError::http_status(&request.url, 503))
}

pub fn runtime_missing(_request: &FetchRequest) -> Result<Vec<u8>, TransportError> {
    Err(TransportError::unavailable("browser", "scripted"))
}

/// Succeeds on the third attempt of any transport.
pub fn third_time_lucky(request: &FetchRequest) -> Result<Vec<u8>, TransportError> {
    if request.attempt >= 3 {
        pdf_bytes(request)
    } else {
        Err(TransportError::timeout(&request.url))
    }
}

/// 404 for any URL ending in `b.pdf`, a PDF otherwise.
pub fn missing_b(request: &FetchRequest) -> Result<Vec<u8>, TransportError> {
    if request.url.ends_with("b.pdf") {
        not_found(request)
    } else {
        pdf_bytes(request)
    }
}

pub fn page_with_links(links: &[(&str, &str)]) -> String {
    let anchors: String = links
        .iter()
        .map(|(href, text)| format!(r#"<li><a href="{href}">{text}</a></li>"#))
        .collect();
    format!("<html><body><ul>{anchors}</ul></body></html>")
}
