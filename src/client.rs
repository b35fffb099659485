//! IMAP inbox access for one notifier run.
//!
//! [`ImapInbox::connect`] performs every fatal step up front: TCP connect, STARTTLS,
//! login and mailbox selection. Once it returns, the inbox can only fail per
//! operation, and the pipeline decides what is fatal.
//!
//! # Example
//!
//! ```no_run
//! use pdf_notifier::{ImapInbox, MailSource, NotifierConfig};
//!
//! # async fn example() -> pdf_notifier::Result<()> {
//! let config = NotifierConfig::from_env()?;
//! let mut inbox = ImapInbox::connect(&config).await?;
//!
//! let unread = inbox.unread_uids().await?;
//! println!("{} unread messages", unread.len());
//!
//! inbox.close().await?;
//! # Ok(())
//! # }
//! ```

use crate::config::{NotifierConfig, TimeoutConfig};
use crate::connection;
use crate::error::{Error, Result};
use crate::pipeline::MailSource;
use crate::session::{self, AuthConfig, ImapSession};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Authenticated IMAP session with the configured inbox selected.
pub struct ImapInbox {
    session: Box<ImapSession>,
    host: String,
    mailbox: String,
    timeouts: TimeoutConfig,
}

impl ImapInbox {
    /// Connects, upgrades with STARTTLS, logs in and selects the configured inbox.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Connection or STARTTLS upgrade cannot be established
    /// - Authentication fails
    /// - Mailbox selection fails
    #[instrument(
        name = "ImapInbox::connect",
        skip_all,
        fields(
            user = %config.username(),
            imap_host = %config.host,
            mailbox = %config.inbox
        )
    )]
    pub async fn connect(config: &NotifierConfig) -> Result<Self> {
        let session = Self::initialize_session(config).await?;

        debug!("Inbox ready");

        Ok(Self {
            session: Box::new(session),
            host: config.host.clone(),
            mailbox: config.inbox.clone(),
            timeouts: config.timeouts.clone(),
        })
    }

    /// Returns the IMAP host used for this connection.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the selected mailbox.
    #[must_use]
    pub fn mailbox(&self) -> &str {
        &self.mailbox
    }

    /// Initializes IMAP session with connection, authentication, and mailbox selection.
    async fn initialize_session(config: &NotifierConfig) -> Result<ImapSession> {
        let target_addr = config.imap_address();
        let timeouts = &config.timeouts;

        let tls_stream = tokio::time::timeout(
            timeouts.connect,
            connection::establish_starttls_connection(&config.host, &target_addr),
        )
        .await
        .map_err(|_| Error::ConnectTimeout {
            target: target_addr.clone(),
            timeout: timeouts.connect,
        })??;

        debug!("TLS connection established");

        let auth_config = AuthConfig {
            user: config.username(),
            password: config.password(),
            target: &target_addr,
        };

        let mut session = tokio::time::timeout(
            timeouts.auth,
            session::authenticate(tls_stream, &auth_config),
        )
        .await
        .map_err(|_| Error::AuthTimeout {
            user: config.username().to_string(),
            timeout: timeouts.auth,
        })??;

        debug!("Authenticated");

        tokio::time::timeout(
            timeouts.select,
            session::select_mailbox(&mut session, &config.inbox, &target_addr),
        )
        .await
        .map_err(|_| Error::SelectTimeout {
            mailbox: config.inbox.clone(),
            timeout: timeouts.select,
        })??;

        Ok(session)
    }
}

#[async_trait]
impl MailSource for ImapInbox {
    async fn unread_uids(&mut self) -> Result<Vec<u32>> {
        let timeout = self.timeouts.search;

        tokio::time::timeout(timeout, session::search_unseen(&mut self.session))
            .await
            .map_err(|_| Error::SearchTimeout { timeout })?
    }

    async fn fetch(&mut self, uid: u32) -> Result<Option<Vec<u8>>> {
        let timeout = self.timeouts.fetch;

        tokio::time::timeout(timeout, session::fetch_message(&mut self.session, uid))
            .await
            .map_err(|_| Error::FetchTimeout { uid, timeout })?
    }

    #[instrument(name = "ImapInbox::close", skip(self), fields(mailbox = %self.mailbox))]
    async fn close(&mut self) -> Result<()> {
        let timeout = self.timeouts.logout;

        tokio::time::timeout(timeout, session::logout(&mut *self.session))
            .await
            .map_err(|_| Error::LogoutTimeout { timeout })?
    }
}

impl std::fmt::Debug for ImapInbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImapInbox")
            .field("host", &self.host)
            .field("mailbox", &self.mailbox)
            .finish_non_exhaustive()
    }
}
