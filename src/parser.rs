//! Internal module for parsing fetched messages and finding PDF attachments.

use crate::error::{Error, Result};
use mailparse::{parse_mail, ParsedMail};
use tracing::{debug, warn};

const PDF_MIME_TYPE: &str = "application/pdf";

/// A decoded PDF attachment of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PdfAttachment {
    /// File name from `Content-Disposition` or the `name` content-type parameter.
    pub filename: Option<String>,
    /// Decoded attachment bytes.
    pub data: Vec<u8>,
}

impl PdfAttachment {
    /// Name used in log fields.
    pub fn display_name(&self) -> &str {
        self.filename.as_deref().unwrap_or("<unnamed>")
    }
}

/// Parses a raw RFC 822 message and returns its PDF attachments in MIME order.
///
/// Parts whose transfer encoding cannot be decoded are logged and skipped.
pub(crate) fn pdf_attachments(uid: u32, raw: &[u8]) -> Result<Vec<PdfAttachment>> {
    let parsed = parse_mail(raw).map_err(|source| Error::ParseEmail { source })?;

    let mut attachments = Vec::new();
    collect_pdfs(uid, &parsed, &mut attachments);

    debug!(uid, pdf_count = attachments.len(), "Scanned message parts");

    Ok(attachments)
}

/// Walks the MIME tree depth-first, collecting parts declared as `application/pdf`.
fn collect_pdfs(uid: u32, part: &ParsedMail<'_>, out: &mut Vec<PdfAttachment>) {
    if !part.subparts.is_empty() {
        for subpart in &part.subparts {
            collect_pdfs(uid, subpart, out);
        }
        return;
    }

    if !part.ctype.mimetype.eq_ignore_ascii_case(PDF_MIME_TYPE) {
        return;
    }

    let filename = attachment_filename(part);
    match part.get_body_raw() {
        Ok(data) => out.push(PdfAttachment { filename, data }),
        Err(e) => warn!(
            uid,
            attachment = filename.as_deref().unwrap_or("<unnamed>"),
            error = %e,
            "Failed to decode PDF attachment, skipping"
        ),
    }
}

fn attachment_filename(part: &ParsedMail<'_>) -> Option<String> {
    part.get_content_disposition()
        .params
        .get("filename")
        .or_else(|| part.ctype.params.get("name"))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    // "%PDF-1.4 Invoice 4471 total due"
    const PDF_BASE64: &str = "JVBERi0xLjQgSW52b2ljZSA0NDcxIHRvdGFsIGR1ZQ==";

    fn multipart(parts: &str) -> Vec<u8> {
        format!(
            "From: billing@example.com\r\n\
             To: scanner@example.com\r\n\
             Subject: Your invoice\r\n\
             MIME-Version: 1.0\r\n\
             Content-Type: multipart/mixed; boundary=\"OUTER\"\r\n\
             \r\n\
             {parts}--OUTER--\r\n"
        )
        .into_bytes()
    }

    fn pdf_part(filename: &str) -> String {
        format!(
            "--OUTER\r\n\
             Content-Type: application/pdf; name=\"{filename}\"\r\n\
             Content-Disposition: attachment; filename=\"{filename}\"\r\n\
             Content-Transfer-Encoding: base64\r\n\
             \r\n\
             {PDF_BASE64}\r\n"
        )
    }

    const TEXT_PART: &str = "--OUTER\r\n\
                             Content-Type: text/plain\r\n\
                             \r\n\
                             Invoice attached.\r\n";

    #[test]
    fn test_finds_base64_pdf() {
        let raw = multipart(&format!("{TEXT_PART}{}", pdf_part("invoice.pdf")));

        let pdfs = pdf_attachments(1, &raw).unwrap();
        assert_eq!(pdfs.len(), 1);
        assert_eq!(pdfs[0].filename.as_deref(), Some("invoice.pdf"));
        assert_eq!(pdfs[0].data, b"%PDF-1.4 Invoice 4471 total due");
    }

    #[test]
    fn test_ignores_non_pdf_parts() {
        let image = "--OUTER\r\n\
                     Content-Type: image/png; name=\"logo.png\"\r\n\
                     Content-Transfer-Encoding: base64\r\n\
                     \r\n\
                     iVBORw0KGgo=\r\n";
        let raw = multipart(&format!("{TEXT_PART}{image}"));

        assert!(pdf_attachments(2, &raw).unwrap().is_empty());
    }

    #[test]
    fn test_finds_nested_and_multiple_pdfs() {
        let nested = format!(
            "--OUTER\r\n\
             Content-Type: multipart/mixed; boundary=\"INNER\"\r\n\
             \r\n\
             --INNER\r\n\
             Content-Type: Application/PDF\r\n\
             Content-Transfer-Encoding: base64\r\n\
             \r\n\
             {PDF_BASE64}\r\n\
             --INNER--\r\n"
        );
        let raw = multipart(&format!("{}{nested}", pdf_part("first.pdf")));

        let pdfs = pdf_attachments(3, &raw).unwrap();
        assert_eq!(pdfs.len(), 2);
        assert_eq!(pdfs[0].display_name(), "first.pdf");
        assert_eq!(pdfs[1].display_name(), "<unnamed>");
    }

    #[test]
    fn test_plain_message_has_no_pdfs() {
        let raw = b"From: a@example.com\r\nTo: b@example.com\r\n\r\nNo attachments here.";
        assert!(pdf_attachments(4, raw).unwrap().is_empty());
    }

    #[test]
    fn test_single_part_pdf_message() {
        let raw = format!(
            "From: scanner@example.com\r\n\
             Content-Type: application/pdf\r\n\
             Content-Transfer-Encoding: base64\r\n\
             \r\n\
             {PDF_BASE64}\r\n"
        );

        let pdfs = pdf_attachments(5, raw.as_bytes()).unwrap();
        assert_eq!(pdfs.len(), 1);
    }
}
