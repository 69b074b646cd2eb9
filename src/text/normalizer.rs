//! Text folding for robust substring and alias matching.
//!
//! Everything that compares free text against a known phrase (country
//! aliases, meta tokens) goes through [`normalize`] first, so that
//! `"Côte-d'Ivoire"`, `"cote d ivoire"` and `"COTE_D_IVOIRE"` all end up
//! with the same [`tokens`].

use tracing::instrument;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Folds text to lowercase ASCII-ish tokens separated by single spaces.
///
/// Steps:
/// 1. Decompose (NFKD), lowercase the decomposed characters, and drop
///    combining marks (diacritics)
/// 2. Fold curly apostrophes to `'`
/// 3. Hyphens, slashes, underscores and dots become spaces
/// 4. Any other character that is not a letter, digit, whitespace or
///    apostrophe becomes a space
/// 5. Whitespace runs collapse to one space; edges are trimmed
///
/// The result is idempotent: `normalize(&normalize(x)) == normalize(x)`.
#[must_use]
#[instrument(level = "trace", skip(text), fields(len = text.len()))]
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .nfkd()
        .flat_map(char::to_lowercase)
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| match c {
            '\u{2019}' | '\u{2018}' | '`' => '\'',
            '-' | '\u{2013}' | '\u{2014}' | '/' | '\\' | '_' | '.' => ' ',
            c if c.is_alphanumeric() || c.is_whitespace() || c == '\'' => c,
            _ => ' ',
        })
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Splits normalized text into match tokens.
///
/// Apostrophes act as token separators here so `d'ivoire` and `d ivoire`
/// compare equal while [`normalize`] itself keeps the apostrophe.
#[must_use]
pub fn tokens(normalized: &str) -> Vec<&str> {
    normalized
        .split(|c: char| c.is_whitespace() || c == '\'')
        .filter(|t| !t.is_empty())
        .collect()
}

/// Returns true if `needle` occurs in `haystack` as a whole-token sequence.
///
/// Both sides are normalized first. Matching is anchored at token
/// boundaries: `"en"` does not match inside `"english"`.
#[must_use]
pub fn contains_phrase(haystack: &str, needle: &str) -> bool {
    let haystack = normalize(haystack);
    let needle = normalize(needle);
    contains_token_sequence(&tokens(&haystack), &tokens(&needle))
}

/// Token-level containment for callers that already hold normalized tokens.
#[must_use]
pub fn contains_token_sequence(haystack: &[&str], needle: &[&str]) -> bool {
    if needle.is_empty() || needle.len() > haystack.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|window| window == needle)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_folds_case_diacritics_and_punctuation() {
        let a = normalize("Côte-d'Ivoire");
        let b = normalize("cote d ivoire");
        let c = normalize("COTE_D_IVOIRE");
        assert_eq!(a, "cote d'ivoire");
        assert_eq!(tokens(&a), tokens(&b));
        assert_eq!(tokens(&b), tokens(&c));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            "Côte-d'Ivoire",
            "  Türkiye / Syria  cross-border.pdf ",
            "São Tomé and Príncipe",
            "Report (EN) [draft] 2020–2022",
            "l’Afrique",
            "ℍaiti",
            "𝐊enya ᴺ",
            "İstanbul",
            "",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn test_normalize_lowercases_after_compatibility_decomposition() {
        assert_eq!(normalize("ℍaiti"), "haiti");
        assert_eq!(normalize("𝐊enya"), "kenya");
        assert_eq!(normalize("İstanbul"), "istanbul");
    }

    #[test]
    fn test_normalize_collapses_separators_and_trims() {
        assert_eq!(normalize("  cpd__viet-nam...2020  "), "cpd viet nam 2020");
        assert_eq!(normalize("a\t\nb"), "a b");
    }

    #[test]
    fn test_normalize_folds_curly_apostrophe() {
        assert_eq!(normalize("Côte d’Ivoire"), "cote d'ivoire");
    }

    #[test]
    fn test_normalize_strips_other_symbols() {
        assert_eq!(normalize("Report (EN) [v2]!"), "report en v2");
    }

    #[test]
    fn test_contains_phrase_matches_whole_tokens() {
        assert!(contains_phrase("Draft report (EN)", "en"));
        assert!(!contains_phrase("English report", "en"));
        assert!(!contains_phrase("England", "en"));
    }

    #[test]
    fn test_contains_phrase_multi_word_with_flexible_spacing() {
        assert!(contains_phrase("cpd_viet_nam_2020.pdf", "viet nam"));
        assert!(contains_phrase("Republic of Côte d'Ivoire", "cote d ivoire"));
        assert!(!contains_phrase("vietnamese nam", "viet nam"));
    }

    #[test]
    fn test_contains_token_sequence_empty_needle_never_matches() {
        assert!(!contains_token_sequence(&["a", "b"], &[]));
        assert!(!contains_token_sequence(&[], &["a"]));
    }
}
