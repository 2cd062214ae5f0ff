//! Text extraction from uploaded or downloaded documents.

use lopdf::Document;
use thiserror::Error;
use tracing::debug;

/// Errors raised while turning document bytes into text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("extraction failed: {0}")]
    ExtractionFailed(String),
}

/// Turns raw file bytes into plain text.
///
/// Implementations are synchronous and CPU bound; async callers run them on the
/// blocking thread pool.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, filename: &str, bytes: &[u8]) -> Result<String, ExtractionError>;
}

/// Plain text passthrough (`.txt`, `.md`) and best-effort PDF extraction.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTextExtractor;

impl DefaultTextExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Whether the file name has an extension this extractor understands.
    pub fn supports(filename: &str) -> bool {
        let lower = filename.to_lowercase();
        lower.ends_with(".txt") || lower.ends_with(".md") || lower.ends_with(".pdf")
    }
}

impl TextExtractor for DefaultTextExtractor {
    fn extract(&self, filename: &str, bytes: &[u8]) -> Result<String, ExtractionError> {
        let lower = filename.to_lowercase();

        let text = if lower.ends_with(".txt") || lower.ends_with(".md") {
            String::from_utf8_lossy(bytes).into_owned()
        } else if lower.ends_with(".pdf") {
            extract_pdf_text(bytes)
        } else {
            return Err(ExtractionError::UnsupportedFileType(filename.to_string()));
        };

        if text.trim().is_empty() {
            return Err(ExtractionError::ExtractionFailed(format!(
                "no usable text in {}",
                filename
            )));
        }
        Ok(text)
    }
}

/// Page text via lopdf, then a text-operator scan, then printable ASCII salvage.
fn extract_pdf_text(bytes: &[u8]) -> String {
    match Document::load_mem(bytes) {
        Ok(doc) => {
            let mut page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
            page_numbers.sort_unstable();

            let pages: Vec<String> = page_numbers
                .iter()
                .filter_map(|page| doc.extract_text(&[*page]).ok())
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty())
                .collect();

            if !pages.is_empty() {
                return pages.join("\n\n");
            }
            debug!("PDF parsed but yielded no page text, scanning raw content");
        }
        Err(err) => debug!(error = %err, "PDF could not be parsed, scanning raw content"),
    }

    let scanned = scan_text_operators(bytes);
    if !scanned.is_empty() {
        return scanned;
    }
    salvage_printable(bytes)
}

/// Collects the string literals inside `BT ... ET` text objects.
fn scan_text_operators(bytes: &[u8]) -> String {
    let mut out = String::new();
    let mut in_text = false;
    let mut i = 0;

    while i < bytes.len() {
        match (bytes[i], bytes.get(i + 1)) {
            (b'B', Some(b'T')) => {
                in_text = true;
                i += 2;
                continue;
            }
            (b'E', Some(b'T')) => {
                in_text = false;
                out.push(' ');
                i += 2;
                continue;
            }
            (b'(', _) if in_text => {
                let mut j = i + 1;
                while j < bytes.len() && bytes[j] != b')' {
                    if is_printable(bytes[j]) {
                        out.push(bytes[j] as char);
                    }
                    j += 1;
                }
                i = j;
            }
            _ => {}
        }
        i += 1;
    }

    out.trim().to_string()
}

fn salvage_printable(bytes: &[u8]) -> String {
    let salvaged: String = bytes
        .iter()
        .filter_map(|&b| match b {
            b'\n' | b'\r' | b'\t' => Some(' '),
            b if is_printable(b) => Some(b as char),
            _ => None,
        })
        .collect();
    salvaged.trim().to_string()
}

fn is_printable(b: u8) -> bool {
    (32..127).contains(&b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_passthrough() {
        let extractor = DefaultTextExtractor::new();
        assert_eq!(extractor.extract("notes.TXT", b"hello world").unwrap(), "hello world");
        assert_eq!(extractor.extract("readme.md", "# Títle".as_bytes()).unwrap(), "# Títle");
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let text = DefaultTextExtractor::new().extract("a.txt", &[b'o', b'k', 0xff]).unwrap();
        assert!(text.starts_with("ok"));
    }

    #[test]
    fn test_unsupported_extension() {
        let error = DefaultTextExtractor::new().extract("image.png", b"\x89PNG").unwrap_err();
        assert_eq!(error, ExtractionError::UnsupportedFileType("image.png".to_string()));
    }

    #[test]
    fn test_empty_text_is_failure() {
        let error = DefaultTextExtractor::new().extract("blank.txt", b"  \n\t ").unwrap_err();
        assert!(matches!(error, ExtractionError::ExtractionFailed(_)));
    }

    #[test]
    fn test_pdf_text_operators_are_scanned() {
        let raw = b"%PDF-1.4\nstream\nBT /F1 12 Tf 72 712 Td (Hello PDF) Tj ET\nendstream";
        let text = DefaultTextExtractor::new().extract("doc.pdf", raw).unwrap();
        assert_eq!(text, "Hello PDF");
    }

    #[test]
    fn test_pdf_without_text_objects_salvages_ascii() {
        let raw = b"%PDF-1.4\n\x00\x01some readable words\x02";
        let text = DefaultTextExtractor::new().extract("doc.pdf", raw).unwrap();
        assert!(text.contains("some readable words"));
    }

    #[test]
    fn test_supports() {
        assert!(DefaultTextExtractor::supports("a.PDF"));
        assert!(DefaultTextExtractor::supports("a.txt"));
        assert!(!DefaultTextExtractor::supports("a.docx"));
    }
}
