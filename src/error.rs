//! Error types for the pdf-notifier crate.
//!
//! All errors implement [`std::error::Error`] and carry enough context to name the
//! precondition that failed. Errors are grouped into categories (see
//! [`Error::category`]); a run aborts on fatal categories only (see [`Error::is_fatal`]).

use std::time::Duration;
use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while checking the inbox and sending notifications.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    // ─────────────────────────────────────────────────────────────────────────
    // Configuration errors (FATAL)
    // ─────────────────────────────────────────────────────────────────────────
    /// A required environment variable is not set or is empty.
    #[error("required environment variable {name} is not set")]
    MissingVar {
        /// Name of the missing variable.
        name: &'static str,
    },

    /// Invalid configuration provided.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    /// Invalid email address format.
    #[error("invalid email format: {email}")]
    InvalidEmailFormat {
        /// The invalid email address.
        email: String,
    },

    /// The pattern could not be compiled.
    #[error("invalid regex pattern '{pattern}'")]
    InvalidPattern {
        /// The rejected pattern.
        pattern: String,
        /// The underlying regex error.
        #[source]
        source: regex::Error,
    },

    /// An address could not be used as an SMTP mailbox.
    #[error("invalid mailbox address '{address}'")]
    InvalidMailbox {
        /// The rejected address.
        address: String,
        /// The underlying address error.
        #[source]
        source: lettre::address::AddressError,
    },

    /// Invalid DNS name for TLS.
    #[error("invalid DNS name for host '{host}'")]
    InvalidDnsName {
        /// The invalid hostname.
        host: String,
        /// The underlying DNS name error.
        #[source]
        source: rustls::client::InvalidDnsNameError,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Template errors (FATAL)
    // ─────────────────────────────────────────────────────────────────────────
    /// The template file could not be read.
    #[error("failed to read message template {path}")]
    TemplateRead {
        /// Path of the template file.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The template file does not have the subject / blank line / body layout.
    #[error("malformed message template: {message}")]
    TemplateMalformed {
        /// What is wrong with the template.
        message: String,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Connection errors (FATAL)
    // ─────────────────────────────────────────────────────────────────────────
    /// Failed to establish TCP connection.
    #[error("failed to connect to {target}")]
    TcpConnect {
        /// The target address that failed.
        target: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The server refused or failed the STARTTLS upgrade.
    #[error("STARTTLS negotiation with {target} failed")]
    StartTls {
        /// The target address.
        target: String,
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    /// Failed to establish TLS connection.
    #[error("failed to establish TLS connection to {target}")]
    TlsConnect {
        /// The target address that failed.
        target: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The IMAP connection broke while a command was in flight.
    #[error("IMAP connection to {target} failed during {command}")]
    ImapConnection {
        /// The target address.
        target: String,
        /// The IMAP command that was running.
        command: &'static str,
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    /// Connection timeout.
    #[error("connection timeout to {target} after {timeout:?}")]
    ConnectTimeout {
        /// The target address.
        target: String,
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// Authentication timeout.
    #[error("authentication timeout for {user} after {timeout:?}")]
    AuthTimeout {
        /// The username used for authentication.
        user: String,
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// Mailbox selection timeout.
    #[error("mailbox selection timeout for '{mailbox}' after {timeout:?}")]
    SelectTimeout {
        /// The mailbox name.
        mailbox: String,
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Authentication errors (FATAL for IMAP, isolated per message for SMTP)
    // ─────────────────────────────────────────────────────────────────────────
    /// The server rejected the IMAP login.
    #[error("IMAP login failed for {user}")]
    ImapLogin {
        /// The username used for login.
        user: String,
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    /// SMTP server rejected the credentials.
    #[error("SMTP authentication failed for {user}")]
    SmtpAuth {
        /// The username used for login.
        user: String,
        /// The underlying SMTP error.
        #[source]
        source: lettre::transport::smtp::Error,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Inbox errors (FATAL)
    // ─────────────────────────────────────────────────────────────────────────
    /// The server rejected the mailbox selection.
    #[error("failed to select mailbox '{mailbox}'")]
    SelectMailbox {
        /// The mailbox name.
        mailbox: String,
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // IMAP protocol errors
    // ─────────────────────────────────────────────────────────────────────────
    /// IMAP search failed.
    #[error("IMAP search failed")]
    ImapSearch {
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    /// Unread search timeout.
    #[error("unread search timeout after {timeout:?}")]
    SearchTimeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// IMAP fetch failed.
    #[error("IMAP fetch failed for UID {uid}")]
    ImapFetch {
        /// The UID that failed.
        uid: u32,
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    /// Message fetch timeout.
    #[error("message fetch timeout for UID {uid} after {timeout:?}")]
    FetchTimeout {
        /// The UID being fetched.
        uid: u32,
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// IMAP logout failed.
    #[error("IMAP logout failed")]
    ImapLogout {
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    /// Logout timeout (not critical).
    #[error("logout timeout after {timeout:?}")]
    LogoutTimeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Content errors (recovered locally, treated as "no match")
    // ─────────────────────────────────────────────────────────────────────────
    /// Failed to parse email message.
    #[error("failed to parse email")]
    ParseEmail {
        /// The underlying parse error.
        #[source]
        source: mailparse::MailParseError,
    },

    /// Text could not be extracted from a PDF attachment.
    #[error("failed to extract text from PDF: {message}")]
    PdfExtract {
        /// Description of the extraction failure.
        message: String,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Delivery errors (recovered locally, per message)
    // ─────────────────────────────────────────────────────────────────────────
    /// The notification message could not be assembled.
    #[error("failed to build notification message")]
    BuildMessage {
        /// The underlying builder error.
        #[source]
        source: lettre::error::Error,
    },

    /// The SMTP transport could not be set up or the server rejected the message.
    #[error("failed to deliver notification to {recipient}")]
    SmtpSend {
        /// The notification recipient.
        recipient: String,
        /// The underlying SMTP error.
        #[source]
        source: lettre::transport::smtp::Error,
    },
}

impl Error {
    /// Returns `true` if this error aborts a run when it reaches the top level.
    ///
    /// Content and delivery errors (including SMTP credential rejection) are handled
    /// per message by the pipeline and never abort a run. Everything else means a
    /// precondition of the run is not met.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        if matches!(self, Error::SmtpAuth { .. }) {
            return false;
        }
        !matches!(
            self.category(),
            ErrorCategory::Extraction | ErrorCategory::Delivery
        )
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::MissingVar { .. }
            | Error::InvalidConfig { .. }
            | Error::InvalidEmailFormat { .. }
            | Error::InvalidPattern { .. }
            | Error::InvalidMailbox { .. }
            | Error::InvalidDnsName { .. } => ErrorCategory::Configuration,

            Error::TemplateRead { .. } | Error::TemplateMalformed { .. } => {
                ErrorCategory::Template
            }

            Error::TcpConnect { .. }
            | Error::StartTls { .. }
            | Error::TlsConnect { .. }
            | Error::ImapConnection { .. }
            | Error::ConnectTimeout { .. }
            | Error::AuthTimeout { .. }
            | Error::SelectTimeout { .. } => ErrorCategory::Connection,

            Error::ImapLogin { .. } | Error::SmtpAuth { .. } => ErrorCategory::Authentication,

            Error::SelectMailbox { .. } => ErrorCategory::Inbox,

            Error::ImapSearch { .. }
            | Error::SearchTimeout { .. }
            | Error::ImapFetch { .. }
            | Error::FetchTimeout { .. }
            | Error::ImapLogout { .. }
            | Error::LogoutTimeout { .. } => ErrorCategory::Protocol,

            Error::ParseEmail { .. } | Error::PdfExtract { .. } => ErrorCategory::Extraction,

            Error::BuildMessage { .. } | Error::SmtpSend { .. } => ErrorCategory::Delivery,
        }
    }
}

/// Error categories for logging and exit status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Missing or invalid configuration.
    Configuration,
    /// Missing or malformed message template.
    Template,
    /// Transport-level failure reaching a server.
    Connection,
    /// Credentials rejected by IMAP or SMTP.
    Authentication,
    /// The configured mailbox could not be selected.
    Inbox,
    /// IMAP command failures after login.
    Protocol,
    /// Unreadable message or PDF content.
    Extraction,
    /// Notification could not be sent.
    Delivery,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Template => write!(f, "template"),
            ErrorCategory::Connection => write!(f, "connection"),
            ErrorCategory::Authentication => write!(f, "authentication"),
            ErrorCategory::Inbox => write!(f, "inbox"),
            ErrorCategory::Protocol => write!(f, "protocol"),
            ErrorCategory::Extraction => write!(f, "extraction"),
            ErrorCategory::Delivery => write!(f, "delivery"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        let err = Error::MissingVar {
            name: "PYTHON_EMAIL_HOST",
        };
        assert!(err.is_fatal());

        let err = Error::TcpConnect {
            target: "mail.example.com:143".into(),
            source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
        };
        assert!(err.is_fatal());

        // Per-attachment failures never abort a run
        let err = Error::PdfExtract {
            message: "encrypted".into(),
        };
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_error_categories() {
        let err = Error::TemplateMalformed {
            message: "missing blank line".into(),
        };
        assert_eq!(err.category(), ErrorCategory::Template);

        let err = Error::ConnectTimeout {
            target: "mail.example.com:143".into(),
            timeout: Duration::from_secs(10),
        };
        assert_eq!(err.category(), ErrorCategory::Connection);

        let err = Error::ImapConnection {
            target: "mail.example.com:143".into(),
            command: "LOGIN",
            source: async_imap::error::Error::ConnectionLost,
        };
        assert_eq!(err.category(), ErrorCategory::Connection);
        assert!(err.to_string().contains("LOGIN"));

        let err = Error::FetchTimeout {
            uid: 7,
            timeout: Duration::from_secs(10),
        };
        assert_eq!(err.category(), ErrorCategory::Protocol);
    }

    #[test]
    fn test_missing_var_names_the_variable() {
        let err = Error::MissingVar {
            name: "PYTHON_EMAIL_RECIPIENT",
        };
        assert!(err.to_string().contains("PYTHON_EMAIL_RECIPIENT"));
        assert_eq!(err.category().to_string(), "configuration");
    }
}
