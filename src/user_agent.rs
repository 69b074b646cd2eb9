//! Shared User-Agent strings for every HTTP-speaking transport.
//!
//! The browser, the request context and the first hardened attempt all
//! present the same desktop identity so cookies primed by one stay valid for
//! the others.

/// Desktop Chrome identity used by the browser and request-context transports.
pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Locale advertised alongside the desktop identity.
pub const DESKTOP_LOCALE: &str = "en-US";

/// Rotating identities for the hardened transport, cycled per attempt.
pub const USER_AGENT_POOL: &[&str] = &[
    DESKTOP_USER_AGENT,
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 \
     (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
];

/// Picks the pool entry for a 1-indexed attempt, wrapping around.
#[must_use]
pub fn user_agent_for_attempt(attempt: u32) -> &'static str {
    let index = (attempt.saturating_sub(1) as usize) % USER_AGENT_POOL.len();
    USER_AGENT_POOL[index]
}
