//! The check-and-notify workflow.
//!
//! [`Notifier::run`] drives one pass over the unread messages of a [`MailSource`]:
//! every PDF attachment is extracted and matched, and each message with a matching
//! attachment produces exactly one notification through a [`Mailer`].
//!
//! Failures are isolated per message. Fetch, parse, extraction and delivery errors are
//! logged with the message UID and counted in the [`RunReport`]; only a failure to list
//! the unread messages aborts the run. Both the source and the mailer are closed on
//! every path.

use crate::client::ImapInbox;
use crate::config::NotifierConfig;
use crate::error::Result;
use crate::extract::{PdfTextExtractor, TextExtractor};
use crate::matcher::Matcher;
use crate::parser;
use crate::smtp::SmtpMailer;
use crate::template::MessageTemplate;
use async_trait::async_trait;
use tracing::{debug, error, info, instrument, warn};

/// Where unread messages come from.
#[async_trait]
pub trait MailSource: Send {
    /// Returns the identifiers of unread messages, in processing order.
    async fn unread_uids(&mut self) -> Result<Vec<u32>>;

    /// Fetches the raw RFC 822 source of a message. This may mark it as read.
    async fn fetch(&mut self, uid: u32) -> Result<Option<Vec<u8>>>;

    /// Releases the connection.
    async fn close(&mut self) -> Result<()>;
}

/// Where notifications go.
#[async_trait]
pub trait Mailer: Send {
    /// Sends one notification built from `template`.
    async fn send(&mut self, template: &MessageTemplate) -> Result<()>;

    /// Releases any open connection.
    async fn close(&mut self) {}
}

/// Counters describing one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Unread messages found.
    pub unread: usize,
    /// Messages fetched successfully.
    pub fetched: usize,
    /// Messages that could not be fetched.
    pub fetch_failures: usize,
    /// Messages that could not be parsed.
    pub parse_failures: usize,
    /// PDF attachments handed to the extractor.
    pub pdfs_scanned: usize,
    /// PDF attachments whose text could not be extracted.
    pub extraction_failures: usize,
    /// Messages with at least one matching PDF.
    pub matched: usize,
    /// Notifications delivered.
    pub notified: usize,
    /// Notifications that could not be delivered.
    pub delivery_failures: usize,
}

impl RunReport {
    /// Returns `true` if the run completed but a message could not be fetched or a
    /// notification could not be delivered.
    ///
    /// Extraction and parse failures count as "no match" and do not degrade a run.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.fetch_failures > 0 || self.delivery_failures > 0
    }
}

/// One configured scan: what to look for and what to send.
pub struct Notifier<'a> {
    matcher: &'a dyn Matcher,
    extractor: &'a dyn TextExtractor,
    template: &'a MessageTemplate,
}

impl<'a> Notifier<'a> {
    /// Creates a notifier.
    #[must_use]
    pub fn new(
        matcher: &'a dyn Matcher,
        extractor: &'a dyn TextExtractor,
        template: &'a MessageTemplate,
    ) -> Self {
        Self {
            matcher,
            extractor,
            template,
        }
    }

    /// Processes every unread message of `source`, then closes `mailer` and `source`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the unread messages cannot be listed. Per-message
    /// failures are reported through [`RunReport`].
    #[instrument(
        name = "Notifier::run",
        skip_all,
        fields(matcher = %self.matcher.description())
    )]
    pub async fn run<S, M>(&self, source: &mut S, mailer: &mut M) -> Result<RunReport>
    where
        S: MailSource + ?Sized,
        M: Mailer + ?Sized,
    {
        let outcome = self.process_inbox(source, mailer).await;

        mailer.close().await;
        match source.close().await {
            Ok(()) => debug!("Mail source closed"),
            Err(e) => warn!(error = %e, "Failed to close mail source"),
        }

        outcome
    }

    async fn process_inbox<S, M>(&self, source: &mut S, mailer: &mut M) -> Result<RunReport>
    where
        S: MailSource + ?Sized,
        M: Mailer + ?Sized,
    {
        let uids = source.unread_uids().await?;
        let mut report = RunReport {
            unread: uids.len(),
            ..RunReport::default()
        };

        if uids.is_empty() {
            info!("No unread emails");
            return Ok(report);
        }

        info!(unread = uids.len(), "Scanning unread emails");

        for uid in uids {
            let raw = match source.fetch(uid).await {
                Ok(Some(raw)) => raw,
                Ok(None) => {
                    warn!(uid, "Server returned no message body, skipping");
                    report.fetch_failures += 1;
                    continue;
                }
                Err(e) => {
                    error!(uid, error = %e, "Failed to fetch message, skipping");
                    report.fetch_failures += 1;
                    continue;
                }
            };
            report.fetched += 1;

            if !self.scan_message(uid, &raw, &mut report) {
                continue;
            }
            report.matched += 1;

            match mailer.send(self.template).await {
                Ok(()) => {
                    info!(uid, "Notification sent");
                    report.notified += 1;
                }
                Err(e) => {
                    error!(
                        uid,
                        error = %e,
                        category = %e.category(),
                        "Failed to send notification"
                    );
                    report.delivery_failures += 1;
                }
            }
        }

        Ok(report)
    }

    /// Returns `true` as soon as one PDF attachment of the message matches.
    fn scan_message(&self, uid: u32, raw: &[u8], report: &mut RunReport) -> bool {
        let pdfs = match parser::pdf_attachments(uid, raw) {
            Ok(pdfs) => pdfs,
            Err(e) => {
                warn!(uid, error = %e, "Failed to parse email, skipping message");
                report.parse_failures += 1;
                return false;
            }
        };

        if pdfs.is_empty() {
            debug!(uid, "No PDF attachments");
            return false;
        }

        for pdf in &pdfs {
            report.pdfs_scanned += 1;

            let text = match self.extractor.extract(&pdf.data) {
                Ok(text) => text,
                Err(e) => {
                    warn!(
                        uid,
                        attachment = pdf.display_name(),
                        error = %e,
                        "Failed to extract PDF text, treating as no match"
                    );
                    report.extraction_failures += 1;
                    continue;
                }
            };

            if let Some(found) = self.matcher.find_match(&text) {
                info!(
                    uid,
                    attachment = pdf.display_name(),
                    matched = %found,
                    "PDF matches pattern"
                );
                return true;
            }

            debug!(uid, attachment = pdf.display_name(), "No match in PDF");
        }

        false
    }
}

/// Runs the whole workflow once against the configured servers.
///
/// The template and the sender and recipient mailboxes are checked before any connection
/// is made; the pattern was already compiled with the configuration.
///
/// # Errors
///
/// Returns an error if a precondition of the run fails: template, addresses,
/// IMAP connection, login, inbox selection or the unread search.
pub async fn run_once(config: &NotifierConfig) -> Result<RunReport> {
    let template = MessageTemplate::load(&config.template_path)?;
    let mut mailer = SmtpMailer::new(config)?;

    info!(
        imap_host = %config.host,
        imap_port = config.imap_port,
        user = %config.username(),
        mailbox = %config.inbox,
        "Connecting to IMAP server"
    );
    let mut inbox = ImapInbox::connect(config).await?;

    Notifier::new(config.matcher(), &PdfTextExtractor, &template)
        .run(&mut inbox, &mut mailer)
        .await
}
