//! Shared HTTP client construction for the HTTP-speaking transports.
//!
//! Keeps timeouts, compression, cookie storage and proxy handling identical
//! across the request-context, hardened and mirror transports.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use reqwest::cookie::Jar;
use reqwest::header::HeaderMap;
use reqwest::{Client, ClientBuilder, Proxy};
use tracing::warn;

use crate::config::HttpTimeouts;

use super::TransportError;

/// Client settings for one transport.
#[derive(Debug, Clone)]
pub struct ClientSpec {
    /// Transport name, used in errors and logs only.
    pub transport: &'static str,
    pub user_agent: String,
    pub timeouts: HttpTimeouts,
    /// Headers sent on every request.
    pub default_headers: HeaderMap,
    pub cookie_jar: Option<Arc<Jar>>,
}

/// Builds a reqwest client using the shared policy.
///
/// # Errors
///
/// Returns [`TransportError::Unavailable`] when client construction fails.
pub fn build_http_client(spec: &ClientSpec) -> Result<Client, TransportError> {
    match try_build_client(spec, false) {
        Ok(client) => Ok(client),
        Err(BuildClientFailure::Panic) => {
            // Some sandboxed hosts panic when querying system proxy settings.
            // The fallback keeps env-proxy support but skips the system lookup.
            warn!(
                transport = spec.transport,
                "HTTP client hit system proxy panic; using env-proxy fallback builder"
            );
            match try_build_client(spec, true) {
                Ok(client) => Ok(client),
                Err(BuildClientFailure::Panic) => Err(TransportError::unavailable(
                    spec.transport,
                    "HTTP client construction panicked",
                )),
                Err(BuildClientFailure::Build(error)) => Err(TransportError::unavailable(
                    spec.transport,
                    format!("HTTP client construction failed: {error}"),
                )),
            }
        }
        Err(BuildClientFailure::Build(error)) => Err(TransportError::unavailable(
            spec.transport,
            format!("HTTP client construction failed: {error}"),
        )),
    }
}

enum BuildClientFailure {
    Panic,
    Build(reqwest::Error),
}

fn try_build_client(
    spec: &ClientSpec,
    disable_system_proxy_lookup: bool,
) -> Result<Client, BuildClientFailure> {
    catch_unwind(AssertUnwindSafe(|| {
        let mut builder = base_builder(spec);
        if disable_system_proxy_lookup {
            builder = apply_env_proxy_fallback(builder.no_proxy());
        }
        builder.build().map_err(BuildClientFailure::Build)
    }))
    .map_err(|_| BuildClientFailure::Panic)?
}

fn base_builder(spec: &ClientSpec) -> ClientBuilder {
    let mut builder = Client::builder()
        .connect_timeout(spec.timeouts.connect)
        .timeout(spec.timeouts.read)
        .user_agent(spec.user_agent.clone())
        .default_headers(spec.default_headers.clone())
        .gzip(true);

    if let Some(jar) = &spec.cookie_jar {
        builder = builder.cookie_provider(Arc::clone(jar));
    }

    builder
}

fn apply_env_proxy_fallback(mut builder: ClientBuilder) -> ClientBuilder {
    if let Some(proxy) = env_proxy_for_scheme("https")
        && let Ok(resolved) = Proxy::https(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    if let Some(proxy) = env_proxy_for_scheme("http")
        && let Ok(resolved) = Proxy::http(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    builder
}

fn env_proxy_for_scheme(scheme: &str) -> Option<String> {
    match scheme {
        "https" => find_first_proxy_var(&["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"]),
        "http" => find_first_proxy_var(&["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"]),
        _ => None,
    }
}

fn find_first_proxy_var(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

/// Lowercased `Content-Type` of a response, empty when absent.
pub(crate) fn content_type_of(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_lowercase()
}

/// True for the content types accepted as document bytes: PDF,
/// octet-stream, or no content type at all.
#[must_use]
pub fn is_document_content_type(content_type: &str) -> bool {
    let content_type = content_type.trim().to_lowercase();
    content_type.is_empty()
        || content_type.contains("application/pdf")
        || content_type.contains("application/octet-stream")
}
