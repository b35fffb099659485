//! Notification delivery over SMTP with STARTTLS.

use crate::config::NotifierConfig;
use crate::error::{Error, Result};
use crate::pipeline::Mailer;
use crate::template::MessageTemplate;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::{debug, instrument};

/// SMTP reply code for rejected credentials.
const AUTH_REJECTED: &str = "535";

/// Sends the notification email through the configured SMTP server.
///
/// Addresses are validated in [`SmtpMailer::new`]; the transport itself is created on
/// the first [`send`](Mailer::send), so a run without matches never contacts the server.
pub struct SmtpMailer {
    host: String,
    port: u16,
    username: String,
    password: SecretString,
    from: Mailbox,
    to: Mailbox,
    timeout: Duration,
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
}

impl SmtpMailer {
    /// Prepares a mailer sending from the login name to the configured recipient.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMailbox`] if the username or recipient is not a usable
    /// mailbox address.
    pub fn new(config: &NotifierConfig) -> Result<Self> {
        Ok(Self {
            host: config.host.clone(),
            port: config.smtp_port,
            username: config.username().to_string(),
            password: SecretString::from(config.password().to_string()),
            from: parse_mailbox(config.username())?,
            to: parse_mailbox(config.recipient())?,
            timeout: config.timeouts.smtp,
            transport: None,
        })
    }

    /// Builds the notification for `template`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BuildMessage`] if the message cannot be assembled.
    pub fn compose(&self, template: &MessageTemplate) -> Result<Message> {
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(template.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(template.body.clone())
            .map_err(|source| Error::BuildMessage { source })
    }

    fn transport(&mut self) -> Result<&AsyncSmtpTransport<Tokio1Executor>> {
        let transport = match self.transport.take() {
            Some(transport) => transport,
            None => self.build_transport()?,
        };
        Ok(self.transport.insert(transport))
    }

    fn build_transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        debug!(smtp_host = %self.host, smtp_port = self.port, "Creating SMTP transport");

        let credentials = Credentials::new(
            self.username.clone(),
            self.password.expose_secret().to_string(),
        );

        Ok(
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host)
                .map_err(|source| Error::SmtpSend {
                    recipient: self.to.to_string(),
                    source,
                })?
                .port(self.port)
                .credentials(credentials)
                .timeout(Some(self.timeout))
                .build(),
        )
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    #[instrument(
        name = "SmtpMailer::send",
        skip_all,
        fields(recipient = %self.to, subject = %template.subject)
    )]
    async fn send(&mut self, template: &MessageTemplate) -> Result<()> {
        let message = self.compose(template)?;
        let recipient = self.to.to_string();
        let username = self.username.clone();

        self.transport()?
            .send(message)
            .await
            .map_err(|source| classify_send_error(username, recipient, source))?;

        debug!("Notification delivered");
        Ok(())
    }

    async fn close(&mut self) {
        if self.transport.take().is_some() {
            debug!("SMTP transport released");
        }
    }
}

impl std::fmt::Debug for SmtpMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpMailer")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("from", &self.from.to_string())
            .field("to", &self.to.to_string())
            .field("connected", &self.transport.is_some())
            .finish_non_exhaustive()
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox> {
    address.parse().map_err(|source| Error::InvalidMailbox {
        address: address.to_string(),
        source,
    })
}

fn classify_send_error(
    user: String,
    recipient: String,
    source: lettre::transport::smtp::Error,
) -> Error {
    let auth_rejected = source
        .status()
        .is_some_and(|code| code.to_string() == AUTH_REJECTED);

    if auth_rejected {
        Error::SmtpAuth { user, source }
    } else {
        Error::SmtpSend { recipient, source }
    }
}
