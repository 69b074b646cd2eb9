//! Output filenames for downloaded documents.
//!
//! Names come from the URL basename with `.pdf` forced, and are made unique
//! within a batch or archive by inserting `_2`, `_3`, ... before the extension.

use std::collections::HashSet;

use url::Url;

/// Name used when a URL has no usable basename.
pub const DEFAULT_PDF_NAME: &str = "document.pdf";

/// Derives the archive filename for a PDF URL.
///
/// Takes the last path segment (query and fragment ignored), replaces
/// characters that are unsafe in archive entry names, and appends `.pdf`
/// unless the name already ends with it (case-insensitive).
#[must_use]
pub fn pdf_filename_from_url(url: &str) -> String {
    let last_segment = Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .or_else(|| {
            // Relative or unparsable input: fall back to the raw path tail.
            let path = url.split(['?', '#']).next().unwrap_or_default();
            path.rsplit('/').next().map(str::to_string)
        })
        .unwrap_or_default();

    let sanitized = sanitize_filename(&last_segment);
    if sanitized.trim_matches('_').is_empty() {
        return DEFAULT_PDF_NAME.to_string();
    }

    if sanitized.to_lowercase().ends_with(".pdf") {
        sanitized
    } else {
        format!("{sanitized}.pdf")
    }
}

/// Replaces characters that are invalid in archive entry names on common
/// filesystems: / \ : * ? " < > | and control characters.
pub(crate) fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    // Dot-only names would extract as `.` or `..`
    if sanitized.chars().all(|c| c == '.') {
        return sanitized.replace('.', "_");
    }
    sanitized
}

/// Inserts `_{n}` before the extension: `x.pdf` -> `x_2.pdf`.
#[must_use]
pub fn with_suffix(filename: &str, n: usize) -> String {
    match filename.rfind('.') {
        Some(pos) => format!("{}_{n}{}", &filename[..pos], &filename[pos..]),
        _ => format!("{filename}_{n}"),
    }
}

/// Tracks names already handed out and resolves collisions.
///
/// The first occurrence keeps its name; later ones scan upward from `_2`
/// until an unused name is found. Nothing is ever overwritten.
#[derive(Debug, Default, Clone)]
pub struct UniqueNames {
    taken: HashSet<String>,
}

impl UniqueNames {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a name not handed out before and reserves it.
    pub fn claim(&mut self, filename: &str) -> String {
        if self.taken.insert(filename.to_string()) {
            return filename.to_string();
        }

        let mut n = 2;
        loop {
            let candidate = with_suffix(filename, n);
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Number of names reserved so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.taken.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.taken.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_filename_from_url_uses_basename() {
        assert_eq!(
            pdf_filename_from_url("https://example.org/docs/2022/cpd-en.pdf"),
            "cpd-en.pdf"
        );
    }

    #[test]
    fn test_pdf_filename_from_url_ignores_query_and_fragment() {
        assert_eq!(
            pdf_filename_from_url("https://example.org/a/report.PDF?download=1#page=2"),
            "report.PDF"
        );
    }

    #[test]
    fn test_pdf_filename_from_url_forces_pdf_extension() {
        assert_eq!(
            pdf_filename_from_url("https://example.org/file/12345"),
            "12345.pdf"
        );
    }

    #[test]
    fn test_pdf_filename_from_url_empty_path_falls_back() {
        assert_eq!(pdf_filename_from_url("https://example.org/"), DEFAULT_PDF_NAME);
        assert_eq!(pdf_filename_from_url("https://example.org"), DEFAULT_PDF_NAME);
        assert_eq!(pdf_filename_from_url(""), DEFAULT_PDF_NAME);
    }

    #[test]
    fn test_pdf_filename_from_url_relative_input() {
        assert_eq!(pdf_filename_from_url("/docs/x.pdf?y=1"), "x.pdf");
    }

    #[test]
    fn test_sanitize_filename_removes_invalid_chars() {
        assert_eq!(sanitize_filename("a:b*c?.pdf"), "a_b_c_.pdf");
        assert_eq!(sanitize_filename("file<name>.pdf"), "file_name_.pdf");
        assert_eq!(sanitize_filename(".."), "__");
    }

    #[test]
    fn test_with_suffix_inserts_before_extension() {
        assert_eq!(with_suffix("x.pdf", 2), "x_2.pdf");
        assert_eq!(with_suffix("a.b.pdf", 3), "a.b_3.pdf");
        assert_eq!(with_suffix("noext", 2), "noext_2");
        assert_eq!(with_suffix(".pdf", 2), "_2.pdf");
    }

    #[test]
    fn test_unique_names_suffix_sequence() {
        let mut names = UniqueNames::new();
        assert_eq!(names.claim("x.pdf"), "x.pdf");
        assert_eq!(names.claim("x.pdf"), "x_2.pdf");
        assert_eq!(names.claim("x.pdf"), "x_3.pdf");
        assert_eq!(names.claim("y.pdf"), "y.pdf");
        assert_eq!(names.len(), 4);
    }

    #[test]
    fn test_unique_names_skips_names_already_taken() {
        let mut names = UniqueNames::new();
        assert_eq!(names.claim("x_2.pdf"), "x_2.pdf");
        assert_eq!(names.claim("x.pdf"), "x.pdf");
        assert_eq!(names.claim("x.pdf"), "x_3.pdf");
    }
}
