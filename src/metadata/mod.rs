//! Year, country and region inference from a filename and document text.
//!
//! Text extraction (OCR, PDF parsing) happens elsewhere; callers pass the
//! first-pages text and the full text in, either possibly empty.

mod gazetteer;

pub use gazetteer::{HQ, META_ENTRIES};

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::text::{contains_token_sequence, normalize, tokens};

use gazetteer::{ALIASES, COUNTRY_REGIONS, HQ_TOKENS, is_known_country};

/// Two years joined by a dash, slash or "to" (the class is loose on purpose:
/// `[–\-/to]{1,3}` also accepts runs like `-t`).
#[allow(clippy::expect_used)]
static YEAR_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^0-9])((?:19|20)[0-9]{2})\s*[–\-/to]{1,3}\s*((?:19|20)[0-9]{2})(?:[^0-9]|$)")
        .expect("year range regex is valid")
});

#[allow(clippy::expect_used)]
static SINGLE_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^0-9])((?:19|20)[0-9]{2})(?:[^0-9]|$)").expect("year regex is valid")
});

/// A gazetteer name, pre-normalized for token matching.
struct Pattern {
    normalized: String,
    canonical: &'static str,
}

static ALIAS_PATTERNS: LazyLock<Vec<Pattern>> = LazyLock::new(|| compile_patterns(ALIASES));

/// Canonical names, longest first so "South Sudan" wins over "Sudan".
static COUNTRY_PATTERNS: LazyLock<Vec<Pattern>> = LazyLock::new(|| {
    let names: Vec<(&'static str, &'static str)> = COUNTRY_REGIONS
        .iter()
        .map(|(country, _)| (*country, *country))
        .filter(|(country, _)| !META_ENTRIES.contains(country))
        .collect();
    let mut patterns = compile_patterns(&names);
    patterns.sort_by(|a, b| b.normalized.len().cmp(&a.normalized.len()));
    patterns
});

fn compile_patterns(entries: &[(&'static str, &'static str)]) -> Vec<Pattern> {
    entries
        .iter()
        .map(|(name, canonical)| Pattern {
            normalized: normalize(name),
            canonical: *canonical,
        })
        .collect()
}

/// Inferred document metadata. Every field is `None` when nothing matched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentMetadata {
    pub year: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
}

/// Runs all three detectors.
#[must_use]
#[instrument(skip(first_pages_text, full_text))]
pub fn extract_metadata(filename: &str, first_pages_text: &str, full_text: &str) -> DocumentMetadata {
    let country = detect_country(filename, first_pages_text, full_text);
    let metadata = DocumentMetadata {
        year: detect_year(first_pages_text, filename, full_text),
        region: detect_region(country.as_deref()).map(str::to_string),
        country,
    };
    debug!(?metadata, "extracted metadata");
    metadata
}

/// Country from the filename, then the first pages, then the full text.
///
/// Per source: aliases first (only those whose target is a known country),
/// then canonical names longest first, then the headquarters tokens.
#[must_use]
pub fn detect_country(filename: &str, first_pages_text: &str, full_text: &str) -> Option<String> {
    [filename, first_pages_text, full_text]
        .into_iter()
        .find_map(|source| country_in(source, &ALIAS_PATTERNS, &COUNTRY_PATTERNS))
        .map(str::to_string)
}

fn country_in(
    source: &str,
    aliases: &[Pattern],
    countries: &[Pattern],
) -> Option<&'static str> {
    if source.trim().is_empty() {
        return None;
    }
    let normalized = normalize(source);
    let haystack = tokens(&normalized);
    let matches =
        |pattern: &&Pattern| contains_token_sequence(&haystack, &tokens(&pattern.normalized));

    if let Some(alias) = aliases
        .iter()
        .filter(|p| is_known_country(p.canonical))
        .find(matches)
    {
        return Some(alias.canonical);
    }
    if let Some(country) = countries.iter().find(matches) {
        return Some(country.canonical);
    }
    if haystack.iter().any(|token| HQ_TOKENS.contains(token)) {
        return Some(HQ);
    }
    None
}

/// Year or `"Y1-Y2"` range from the first pages, then the filename, then the
/// full text. Within one source a range beats a single year; across
/// sources the earlier source wins.
#[must_use]
pub fn detect_year(first_pages_text: &str, filename: &str, full_text: &str) -> Option<String> {
    [first_pages_text, filename, full_text]
        .into_iter()
        .find_map(year_in)
}

fn year_in(source: &str) -> Option<String> {
    if let Some(caps) = YEAR_RANGE.captures(source) {
        return Some(format!("{}-{}", &caps[1], &caps[2]));
    }
    SINGLE_YEAR.captures(source).map(|caps| caps[1].to_string())
}

/// Regional office code for a canonical country; [`HQ`] for meta entries.
#[must_use]
pub fn detect_region(country: Option<&str>) -> Option<&'static str> {
    let country = country?;
    if META_ENTRIES.contains(&country) {
        return Some(HQ);
    }
    let wanted = normalize(country);
    COUNTRY_REGIONS
        .iter()
        .find(|(name, _)| *name == country || normalize(name) == wanted)
        .map(|(_, region)| *region)
}
