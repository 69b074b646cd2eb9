//! Browser-fingerprint header sets.
//!
//! Kept as plain name/value pairs so the same set can be sent through
//! reqwest ([`to_header_map`]) or through CDP as a JSON object
//! ([`to_json_object`]).

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::trace;
use url::Url;

/// Ordered header name/value pairs.
pub type HeaderSet = Vec<(&'static str, String)>;

pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";
pub const ACCEPT_PDF: &str = "application/pdf,application/octet-stream;q=0.9,*/*;q=0.8";
pub const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

/// Headers every session carries regardless of the request.
#[must_use]
pub fn identity_headers() -> HeaderSet {
    vec![
        ("Accept-Language", ACCEPT_LANGUAGE.to_string()),
        ("DNT", "1".to_string()),
    ]
}

/// Headers for a first-party document download triggered from `referer`.
#[must_use]
pub fn document_headers(referer: &str) -> HeaderSet {
    vec![
        ("Accept", ACCEPT_PDF.to_string()),
        ("Referer", referer.to_string()),
        ("Sec-Fetch-Dest", "document".to_string()),
        ("Sec-Fetch-Mode", "navigate".to_string()),
        ("Sec-Fetch-Site", "same-site".to_string()),
        ("Upgrade-Insecure-Requests", "1".to_string()),
    ]
}

/// Headers for a top-level page navigation.
///
/// Without a referer the request looks like a typed-in address.
#[must_use]
pub fn page_headers(referer: Option<&str>) -> HeaderSet {
    let mut headers = vec![
        ("Accept", ACCEPT_HTML.to_string()),
        ("Sec-Fetch-Dest", "document".to_string()),
        ("Sec-Fetch-Mode", "navigate".to_string()),
        ("Upgrade-Insecure-Requests", "1".to_string()),
    ];
    match referer {
        Some(referer) => {
            headers.push(("Referer", referer.to_string()));
            headers.push(("Sec-Fetch-Site", "same-origin".to_string()));
        }
        None => headers.push(("Sec-Fetch-Site", "none".to_string())),
    }
    headers
}

/// Extra cache-busting and origin headers layered on by the hardened transport.
#[must_use]
pub fn hardened_extras(referer: Option<&str>) -> HeaderSet {
    let mut headers = vec![
        ("Cache-Control", "no-cache".to_string()),
        ("Pragma", "no-cache".to_string()),
    ];
    if let Some(origin) = referer.and_then(origin_of) {
        headers.push(("Origin", origin));
    }
    headers
}

/// `scheme://host[:port]` of a URL, if it has one.
#[must_use]
pub fn origin_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let origin = parsed.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}

/// Converts a header set to a reqwest map, skipping pairs that are not
/// valid header syntax.
#[must_use]
pub fn to_header_map(headers: &HeaderSet) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                map.insert(name, value);
            }
            _ => trace!(header = name, "skipping invalid header"),
        }
    }
    map
}

/// Converts a header set to a JSON object for CDP `Network.setExtraHTTPHeaders`.
#[must_use]
pub fn to_json_object(headers: &HeaderSet) -> serde_json::Value {
    let map: serde_json::Map<String, serde_json::Value> = headers
        .iter()
        .map(|(name, value)| ((*name).to_string(), serde_json::Value::from(value.as_str())))
        .collect();
    serde_json::Value::Object(map)
}

/// Merges sets left to right; later entries replace earlier ones with the
/// same (case-insensitive) name.
#[must_use]
pub fn merge(sets: &[HeaderSet]) -> HeaderSet {
    let mut merged: HeaderSet = Vec::new();
    for set in sets {
        for (name, value) in set {
            if let Some(existing) = merged.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
                existing.1.clone_from(value);
            } else {
                merged.push((*name, value.clone()));
            }
        }
    }
    merged
}
