//! English-language heuristics for linked PDFs.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Filename suffixes that mark an English edition.
const ENGLISH_SUFFIXES: &[&str] = &["-en.pdf", "_en.pdf", "-eng.pdf", "_eng.pdf"];

/// Substrings of the combined URL + anchor text that mark English content.
const ENGLISH_MARKERS: &[&str] = &["/en/", "lang=en", "language=en", "locale=en", "english"];

#[allow(clippy::expect_used)]
static STANDALONE_EN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[(\[\s]en[)\]\s]").expect("standalone language token regex is valid")
});

/// Decides whether a linked PDF is likely an English document.
///
/// Rules are checked in order and the first match wins:
/// 1. The URL's basename ends with `-en.pdf`, `_en.pdf`, `-eng.pdf` or `_eng.pdf`
/// 2. The lowercased `url + " " + anchor_text` contains `/en/`, `lang=en`,
///    `language=en`, `locale=en` or `english`
/// 3. The combined text has an `en` token bounded by parentheses, brackets
///    or whitespace, as in `Report (EN)`
///
/// Anything else is treated as non-English.
#[must_use]
pub fn is_english(url: &str, anchor_text: &str) -> bool {
    let filename = basename(url).to_lowercase();
    if ENGLISH_SUFFIXES.iter().any(|sfx| filename.ends_with(sfx)) {
        return true;
    }

    let combined = format!("{url} {anchor_text}").to_lowercase();
    if ENGLISH_MARKERS.iter().any(|marker| combined.contains(marker)) {
        return true;
    }

    STANDALONE_EN.is_match(&combined)
}

fn basename(url: &str) -> String {
    if let Ok(parsed) = Url::parse(url)
        && let Some(mut segments) = parsed.path_segments()
    {
        return segments.next_back().unwrap_or_default().to_string();
    }
    let path = url.split(['?', '#']).next().unwrap_or_default();
    path.rsplit('/').next().unwrap_or_default().to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_suffix_marker() {
        assert!(is_english("doc-en.pdf", ""));
        assert!(is_english("https://example.org/x/CPD_ENG.PDF", ""));
        assert!(is_english("https://example.org/x/cpd_en.pdf?v=2", ""));
    }

    #[test]
    fn test_suffix_only_checks_basename() {
        assert!(!is_english("https://example.org/draft-en.pdf/fr.pdf", ""));
    }

    #[test]
    fn test_marker_substrings() {
        assert!(is_english("https://example.org/en/doc.pdf", ""));
        assert!(is_english("https://example.org/doc.pdf?lang=en", ""));
        assert!(is_english("https://example.org/doc.pdf", "English version"));
    }

    #[test]
    fn test_standalone_token_in_anchor() {
        assert!(is_english("doc.pdf", "Report (EN)"));
        assert!(is_english("doc.pdf", "Report [en] draft"));
    }

    #[test]
    fn test_en_inside_word_is_not_english() {
        assert!(!is_english("doc.pdf", "England report"));
        assert!(!is_english("https://example.org/doc.pdf", "Enfants et adolescents"));
    }

    #[test]
    fn test_no_signal_is_not_english() {
        assert!(!is_english("https://example.org/cpd-fr.pdf", "Programme de pays"));
        assert!(!is_english("", ""));
    }

    #[test]
    fn test_deterministic() {
        for _ in 0..3 {
            assert!(is_english("doc.pdf", "Report (EN)"));
            assert!(!is_english("doc.pdf", "England report"));
        }
    }
}
