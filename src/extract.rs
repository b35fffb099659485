//! Text extraction from PDF attachments.

use crate::error::{Error, Result};
use std::panic::{self, AssertUnwindSafe};

/// Turns attachment bytes into searchable text.
pub trait TextExtractor: Send + Sync {
    /// Extracts the text of a document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PdfExtract`] if the document cannot be read.
    fn extract(&self, data: &[u8]) -> Result<String>;
}

/// [`TextExtractor`] backed by the `pdf-extract` crate.
///
/// Encrypted, truncated and otherwise unreadable documents are reported as errors.
/// A panic inside the PDF parser is caught and reported the same way.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract(&self, data: &[u8]) -> Result<String> {
        if !data.starts_with(b"%PDF") {
            return Err(Error::PdfExtract {
                message: "missing %PDF header".into(),
            });
        }

        match panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem(data)
        })) {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(Error::PdfExtract {
                message: e.to_string(),
            }),
            Err(_) => Err(Error::PdfExtract {
                message: "PDF parser panicked".into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{Matcher, RegexMatcher};

    const INVOICE_PDF: &[u8] = include_bytes!("../tests/fixtures/invoice.pdf");

    #[test]
    fn test_extracts_text_from_pdf() {
        let text = PdfTextExtractor.extract(INVOICE_PDF).unwrap();

        assert!(text.contains("ACME Corp"));
        assert!(text.contains("Invoice 4471"));
    }

    #[test]
    fn test_extracted_text_matches_pattern() {
        let text = PdfTextExtractor.extract(INVOICE_PDF).unwrap();

        let matcher = RegexMatcher::new(r"Invoice (\d+)").unwrap();
        assert_eq!(matcher.find_match(&text).as_deref(), Some("4471"));
        assert!(!RegexMatcher::new(r"Receipt \d+").unwrap().is_match(&text));
    }

    #[test]
    fn test_rejects_non_pdf() {
        let err = PdfTextExtractor.extract(b"GIF89a not a pdf").unwrap_err();
        assert!(matches!(err, Error::PdfExtract { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_rejects_empty() {
        assert!(PdfTextExtractor.extract(b"").is_err());
    }

    #[test]
    fn test_rejects_truncated_pdf() {
        let err = PdfTextExtractor
            .extract(b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog")
            .unwrap_err();
        assert!(matches!(err, Error::PdfExtract { .. }));
    }
}
