//! # Document Loader
//!
//! Extracts plain text from a raw file buffer given its declared content
//! type. Modeled as a discriminated union: a dispatcher picks a
//! `SourceFormat` from the declared MIME type/filename extension, and each
//! variant owns its own extraction logic (see the per-format submodules).

mod docx;
mod pdf;
mod text;

use crate::errors::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Pdf,
    Docx,
    PlainText,
    Markdown,
}

impl SourceFormat {
    /// Resolves a format from a declared MIME type, falling back to the
    /// filename extension when the MIME type is generic
    /// (`application/octet-stream`, as many upload clients send).
    pub fn detect(content_type: &str, filename: &str) -> Result<Self, CoreError> {
        let from_mime = match content_type {
            "application/pdf" => Some(SourceFormat::Pdf),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(SourceFormat::Docx)
            }
            "text/plain" => Some(SourceFormat::PlainText),
            "text/markdown" => Some(SourceFormat::Markdown),
            _ => None,
        };
        if let Some(fmt) = from_mime {
            return Ok(fmt);
        }

        let ext = filename.rsplit('.').next().unwrap_or("").to_lowercase();
        match ext.as_str() {
            "pdf" => Ok(SourceFormat::Pdf),
            "docx" => Ok(SourceFormat::Docx),
            "txt" => Ok(SourceFormat::PlainText),
            "md" | "markdown" => Ok(SourceFormat::Markdown),
            _ => Err(CoreError::UnsupportedFormat(format!(
                "content_type='{content_type}' filename='{filename}'"
            ))),
        }
    }
}

/// Loads raw bytes into a single normalized UTF-8 string.
///
/// The caller's buffer is consumed, not borrowed, so no loader can retain a
/// reference past return.
pub fn load(format: SourceFormat, bytes: Vec<u8>) -> Result<String, CoreError> {
    let raw = match format {
        SourceFormat::Pdf => pdf::extract(&bytes)?,
        SourceFormat::Docx => docx::extract(&bytes)?,
        SourceFormat::PlainText | SourceFormat::Markdown => text::extract(bytes)?,
    };

    let normalized = normalize(&raw);
    if normalized.trim().is_empty() {
        return Err(CoreError::EmptyContent);
    }
    Ok(normalized)
}

/// Post-processing pass applied uniformly to every format.
fn normalize(raw: &str) -> String {
    let no_ff = raw.replace('\x0c', " ").replace('\r', "");
    let quotes_normalized = normalize_quotes(&no_ff);

    let whitespace_re = regex::Regex::new(r"[ \t]+").unwrap();
    let collapsed_spaces = whitespace_re.replace_all(&quotes_normalized, " ");

    let newline_re = regex::Regex::new(r"\n{3,}").unwrap();
    let collapsed_newlines = newline_re.replace_all(&collapsed_spaces, "\n\n");

    let page_header_re = regex::Regex::new(r"(?m)^Page \d+.*$").unwrap();
    let no_page_headers = page_header_re.replace_all(&collapsed_newlines, "");

    let digit_line_re = regex::Regex::new(r"(?m)^\s*\d+\s*$").unwrap();
    let no_digit_lines = digit_line_re.replace_all(&no_page_headers, "");

    no_digit_lines.trim().to_string()
}

fn normalize_quotes(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{2032}' => '\'',
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{2033}' => '"',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_by_extension_when_mime_is_generic() {
        assert_eq!(
            SourceFormat::detect("application/octet-stream", "notes.md").unwrap(),
            SourceFormat::Markdown
        );
        assert_eq!(
            SourceFormat::detect("application/octet-stream", "report.PDF").unwrap(),
            SourceFormat::Pdf
        );
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let err = SourceFormat::detect("application/octet-stream", "image.png").unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedFormat(_)));
    }

    #[test]
    fn normalize_collapses_whitespace_and_page_headers() {
        let raw = "Hello   world\n\n\n\nPage 3 of 10\n\n5\n\nThis is “curly” and ‘fine’.";
        let out = normalize(raw);
        assert!(!out.contains("Page 3"));
        assert!(!out.lines().any(|l| l.trim() == "5"));
        assert!(out.contains("\"curly\""));
        assert!(out.contains("'fine'"));
        assert!(!out.contains("   "));
    }

    #[test]
    fn empty_after_normalization_is_empty_content() {
        let err = load(SourceFormat::PlainText, b"   \n\n  ".to_vec()).unwrap_err();
        assert!(matches!(err, CoreError::EmptyContent));
    }
}
