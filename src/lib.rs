//! # pdf-notifier
//!
//! Scans an IMAP inbox for unread messages with PDF attachments and sends a
//! notification email when the text of an attachment matches a pattern.
//!
//! One run:
//! - Reads [`NotifierConfig`] from the environment and the [`MessageTemplate`] from disk
//! - Connects to the IMAP server, upgrades with STARTTLS, logs in and selects the inbox
//! - Fetches each unread message (which marks it as read) and extracts its PDF text
//! - Sends one notification per message whose PDF text matches, via SMTP with STARTTLS
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdf_notifier::NotifierConfig;
//!
//! # async fn example() -> pdf_notifier::Result<()> {
//! let config = NotifierConfig::from_env()?;
//! let report = pdf_notifier::run_once(&config).await?;
//!
//! println!("{} notifications sent", report.notified);
//! # Ok(())
//! # }
//! ```
//!
//! ## Custom Sources and Mailers
//!
//! [`Notifier`] only depends on the [`MailSource`], [`Mailer`] and
//! [`TextExtractor`](extract::TextExtractor) traits, so the workflow can be driven
//! by anything that yields raw RFC 822 messages.
//!
//! ## Error Handling
//!
//! All errors implement `std::error::Error`. Use [`Error::category`] to report which
//! precondition failed and [`Error::is_fatal`] to tell run-aborting errors from
//! per-message ones:
//!
//! ```
//! use pdf_notifier::Error;
//!
//! fn handle_error(error: &Error) {
//!     if error.is_fatal() {
//!         eprintln!("{} error, aborting: {}", error.category(), error);
//!     } else {
//!         eprintln!("skipping message: {}", error);
//!     }
//! }
//! ```
//!
//! ## Observability
//!
//! The crate uses `tracing` for instrumentation. Spans are named after the operation:
//!
//! - `ImapInbox::connect` - Connection, login and mailbox selection
//! - `connection::establish_starttls` - Plaintext connect and STARTTLS upgrade
//! - `session::search_unseen` / `session::fetch_message` - IMAP commands
//! - `Notifier::run` - One pass over the unread messages
//! - `SmtpMailer::send` - Notification delivery
//!
//! Events carry `uid`, `mailbox`, `attachment` and `error` fields.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Public modules
pub mod config;
pub mod error;
pub mod extract;
pub mod matcher;
pub mod template;

// Internal modules
mod client;
mod connection;
mod parser;
mod pipeline;
mod session;
mod smtp;

// Re-exports for ergonomic API
pub use client::ImapInbox;
pub use config::{NotifierConfig, NotifierConfigBuilder, TimeoutConfig};
pub use error::{Error, ErrorCategory, Result};
pub use pipeline::{run_once, MailSource, Mailer, Notifier, RunReport};
pub use smtp::SmtpMailer;
pub use template::MessageTemplate;
