//! Subject and body of the notification email.
//!
//! The template file holds the subject on its first line, a blank line, and the
//! body on all remaining lines:
//!
//! ```text
//! Matching invoice received
//!
//! A PDF matching the configured pattern arrived in the inbox.
//! ```

use crate::error::{Error, Result};
use std::path::Path;
use tracing::debug;

/// Subject and body of the notification, loaded once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplate {
    /// Subject line.
    pub subject: String,
    /// Body text, lines joined with `\n`.
    pub body: String,
}

impl MessageTemplate {
    /// Reads and parses the template at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TemplateRead`] if the file cannot be read, or
    /// [`Error::TemplateMalformed`] if it does not follow the layout.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| Error::TemplateRead {
            path: path.display().to_string(),
            source,
        })?;

        let template = Self::parse(&text)?;
        debug!(path = %path.display(), subject = %template.subject, "Loaded message template");
        Ok(template)
    }

    /// Parses template text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TemplateMalformed`] if the subject is blank or is not followed
    /// by a blank line.
    ///
    /// # Example
    ///
    /// ```
    /// use pdf_notifier::MessageTemplate;
    ///
    /// let template = MessageTemplate::parse("Alert\n\nFirst line\nSecond line\n").unwrap();
    /// assert_eq!(template.subject, "Alert");
    /// assert_eq!(template.body, "First line\nSecond line");
    /// ```
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines();

        let subject = lines.next().map(str::trim_end).unwrap_or_default();
        if subject.trim().is_empty() {
            return Err(malformed("first line must hold the subject"));
        }

        match lines.next() {
            Some(separator) if separator.trim().is_empty() => {}
            _ => return Err(malformed("subject must be followed by a blank line")),
        }

        Ok(Self {
            subject: subject.to_string(),
            body: lines.collect::<Vec<_>>().join("\n"),
        })
    }
}

fn malformed(message: &str) -> Error {
    Error::TemplateMalformed {
        message: message.to_string(),
    }
}
