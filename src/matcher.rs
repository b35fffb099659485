//! Pattern matching against text extracted from PDF attachments.
//!
//! Text is searched line by line, so `^` and `$` anchor to the start and end of each
//! extracted line and a match never spans a line break.
//!
//! # Example
//!
//! ```
//! use pdf_notifier::matcher::{Matcher, RegexMatcher};
//!
//! let matcher = RegexMatcher::new(r"^Invoice (\d+)$").unwrap();
//! let text = "ACME Corp\nInvoice 4471\nTotal due: 12.00";
//! assert_eq!(matcher.find_match(text).as_deref(), Some("4471"));
//! assert!(!matcher.is_match("Receipt 4471"));
//! ```

use crate::error::{Error, Result};
use regex::Regex;
use std::borrow::Cow;

/// Trait for deciding whether extracted text is interesting.
///
/// Implement this trait to define custom matching logic.
pub trait Matcher: Send + Sync {
    /// Attempts to find matching content in the text.
    ///
    /// Returns `Some(matched_value)` if found, `None` otherwise.
    fn find_match<'a>(&self, text: &'a str) -> Option<Cow<'a, str>>;

    /// Returns `true` if the text contains a match.
    fn is_match(&self, text: &str) -> bool {
        self.find_match(text).is_some()
    }

    /// Returns a human-readable description of what this matcher looks for.
    ///
    /// Used in logging and error messages.
    fn description(&self) -> &str;
}

/// Regex-based matcher applied to each line of the text.
///
/// The match result is the first capture group if the pattern has one, otherwise the
/// whole match.
#[derive(Debug, Clone)]
pub struct RegexMatcher {
    regex: Regex,
    description: String,
}

impl RegexMatcher {
    /// Creates a new regex matcher.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] if the regex pattern is invalid.
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|source| Error::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            description: format!("regex pattern: {pattern}"),
            regex,
        })
    }

    /// Returns the source pattern.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

impl Matcher for RegexMatcher {
    fn find_match<'a>(&self, text: &'a str) -> Option<Cow<'a, str>> {
        text.lines().find_map(|line| {
            self.regex.captures(line).map(|caps| {
                let m = caps.get(1).or_else(|| caps.get(0));
                Cow::Borrowed(m.map_or("", |m| m.as_str()))
            })
        })
    }

    fn is_match(&self, text: &str) -> bool {
        text.lines().any(|line| self.regex.is_match(line))
    }

    fn description(&self) -> &str {
        &self.description
    }
}
