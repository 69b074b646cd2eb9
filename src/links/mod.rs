//! PDF links discovered on a scanned page.
//!
//! A scan produces [`LinkRecord`]s in order of first discovery, one per
//! distinct absolute URL. [`ClassifiedLink`] adds the English flag and the
//! output filename, both pure functions of the record.

mod classifier;
mod filename;

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{Html, Selector};
use serde::Serialize;
use tracing::{debug, trace};
use url::Url;

pub use classifier::is_english;
pub use filename::{DEFAULT_PDF_NAME, UniqueNames, pdf_filename_from_url, with_suffix};

#[allow(clippy::expect_used)]
static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("anchor selector is valid"));

/// One distinct PDF link found on a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkRecord {
    /// Absolute URL, resolved against the scanned page.
    pub url: String,
    /// Anchor text with whitespace runs collapsed. Empty when unknown.
    pub anchor_text: String,
}

impl LinkRecord {
    #[must_use]
    pub fn new(url: impl Into<String>, anchor_text: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anchor_text: anchor_text.into(),
        }
    }
}

/// A [`LinkRecord`] with its derived English flag and output filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedLink {
    pub url: String,
    pub anchor_text: String,
    pub is_english: bool,
    pub filename: String,
}

impl ClassifiedLink {
    #[must_use]
    pub fn classify(record: &LinkRecord) -> Self {
        Self {
            url: record.url.clone(),
            anchor_text: record.anchor_text.clone(),
            is_english: is_english(&record.url, &record.anchor_text),
            filename: pdf_filename_from_url(&record.url),
        }
    }
}

impl From<LinkRecord> for ClassifiedLink {
    fn from(record: LinkRecord) -> Self {
        Self::classify(&record)
    }
}

/// Classifies every record, preserving order.
#[must_use]
pub fn classify_all(records: &[LinkRecord]) -> Vec<ClassifiedLink> {
    records.iter().map(ClassifiedLink::classify).collect()
}

/// Keeps the links a download should target.
///
/// With `english_only` set, non-English links are dropped; otherwise all
/// links pass through unchanged.
#[must_use]
pub fn select_for_download(links: &[ClassifiedLink], english_only: bool) -> Vec<ClassifiedLink> {
    links
        .iter()
        .filter(|link| !english_only || link.is_english)
        .cloned()
        .collect()
}

/// Extracts PDF anchors from an HTML document.
///
/// An anchor counts when its trimmed `href` ends with `.pdf`
/// (case-insensitive). Hrefs are resolved against `page_url`; ones that do
/// not resolve are skipped. Duplicates by exact URL string are collapsed
/// and the first anchor text wins.
#[must_use]
pub fn extract_pdf_links(page_url: &Url, html: &str) -> Vec<LinkRecord> {
    let document = Html::parse_document(html);
    let mut records = Vec::new();

    for element in document.select(&ANCHOR_SELECTOR) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if !href.to_lowercase().ends_with(".pdf") {
            continue;
        }

        let full_url = match page_url.join(href) {
            Ok(url) => url.to_string(),
            Err(e) => {
                trace!(href, error = %e, "skipping unresolvable href");
                continue;
            }
        };

        let text = collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "));
        records.push(LinkRecord::new(full_url, text));
    }

    let deduped = dedupe_by_url(records);
    debug!(page = %page_url, count = deduped.len(), "extracted PDF links");
    deduped
}

/// Collapses records that share a URL, keeping the first one seen.
#[must_use]
pub fn dedupe_by_url(records: Vec<LinkRecord>) -> Vec<LinkRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(record.url.clone()))
        .collect()
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn page() -> Url {
        Url::parse("https://example.org/executiveboard/cpd").unwrap()
    }

    #[test]
    fn test_extract_resolves_relative_hrefs() {
        let html = r#"<html><body>
            <a href="/media/1/file/cpd-en.pdf">Country A (EN)</a>
            <a href="docs/b.PDF">B</a>
            <a href="https://cdn.example.net/c.pdf">C</a>
        </body></html>"#;
        let links = extract_pdf_links(&page(), html);
        let urls: Vec<_> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.org/media/1/file/cpd-en.pdf",
                "https://example.org/executiveboard/docs/b.PDF",
                "https://cdn.example.net/c.pdf",
            ]
        );
    }

    #[test]
    fn test_extract_skips_non_pdf_links() {
        let html = r#"<a href="/about">About</a><a href="/x.pdf?download=1">Q</a><a>none</a>"#;
        assert!(extract_pdf_links(&page(), html).is_empty());
    }

    #[test]
    fn test_duplicate_urls_keep_first_anchor_text() {
        let html = r#"
            <a href="/doc.pdf">First   label</a>
            <a href="/other.pdf">Other</a>
            <a href="/doc.pdf">Second label</a>
        "#;
        let links = extract_pdf_links(&page(), html);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].url, "https://example.org/doc.pdf");
        assert_eq!(links[0].anchor_text, "First label");
        assert_eq!(links[1].anchor_text, "Other");
    }

    #[test]
    fn test_dedupe_is_case_sensitive() {
        let records = vec![
            LinkRecord::new("https://example.org/A.pdf", "a"),
            LinkRecord::new("https://example.org/a.pdf", "b"),
            LinkRecord::new("https://example.org/A.pdf", "c"),
        ];
        let deduped = dedupe_by_url(records);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].anchor_text, "a");
    }

    #[test]
    fn test_nested_anchor_text_is_collapsed() {
        let html = r#"<a href="/z.pdf"><span>Report</span>
            <em>(EN)</em></a>"#;
        let links = extract_pdf_links(&page(), html);
        assert_eq!(links[0].anchor_text, "Report (EN)");
    }

    #[test]
    fn test_classify_derives_flag_and_filename() {
        let link = ClassifiedLink::classify(&LinkRecord::new(
            "https://example.org/files/cpd_eng.pdf",
            "",
        ));
        assert!(link.is_english);
        assert_eq!(link.filename, "cpd_eng.pdf");
    }

    #[test]
    fn test_select_for_download_filters_non_english() {
        let links = classify_all(&[
            LinkRecord::new("https://example.org/a-en.pdf", ""),
            LinkRecord::new("https://example.org/b-fr.pdf", ""),
        ]);
        assert_eq!(select_for_download(&links, true).len(), 1);
        assert_eq!(select_for_download(&links, false).len(), 2);
    }
}
