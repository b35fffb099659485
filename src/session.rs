//! Internal IMAP session management.
//!
//! This module wraps async-imap operations with proper error handling.

use crate::connection::TlsStream;
use crate::error::{Error, Result};
use async_imap::error::Error as ImapError;
use async_imap::Session;
use futures::TryStreamExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, instrument};

/// Type alias for IMAP session over TLS.
pub(crate) type ImapSession = Session<TlsStream>;

/// Any duplex byte stream async-imap can drive.
pub(crate) trait ImapStream: AsyncRead + AsyncWrite + Unpin + std::fmt::Debug + Send {}

impl<T> ImapStream for T where T: AsyncRead + AsyncWrite + Unpin + std::fmt::Debug + Send {}

/// Authentication configuration for IMAP.
pub(crate) struct AuthConfig<'a> {
    pub user: &'a str,
    pub password: &'a str,
    /// "host:port", reported when the connection drops.
    pub target: &'a str,
}

/// Returns `true` if the connection broke, as opposed to the server answering `NO`/`BAD`.
fn is_transport_failure(error: &ImapError) -> bool {
    matches!(
        error,
        ImapError::Io(_) | ImapError::ConnectionLost | ImapError::Parse(_)
    )
}

/// Authenticates to IMAP server and returns a session.
#[instrument(
    name = "session::authenticate",
    skip_all,
    fields(user = %config.user)
)]
pub(crate) async fn authenticate<T: ImapStream>(
    stream: T,
    config: &AuthConfig<'_>,
) -> Result<Session<T>> {
    let client = async_imap::Client::new(stream);

    debug!("Authenticating to IMAP server");

    client
        .login(config.user, config.password)
        .await
        .map_err(|(source, _)| {
            if is_transport_failure(&source) {
                Error::ImapConnection {
                    target: config.target.to_string(),
                    command: "LOGIN",
                    source,
                }
            } else {
                Error::ImapLogin {
                    user: config.user.to_string(),
                    source,
                }
            }
        })
}

/// Selects the mailbox to scan.
#[instrument(name = "session::select", skip(session, target), fields(mailbox = %mailbox))]
pub(crate) async fn select_mailbox<T: ImapStream>(
    session: &mut Session<T>,
    mailbox: &str,
    target: &str,
) -> Result<()> {
    debug!("Selecting mailbox");

    let selected = session.select(mailbox).await.map_err(|source| {
        if is_transport_failure(&source) {
            Error::ImapConnection {
                target: target.to_string(),
                command: "SELECT",
                source,
            }
        } else {
            Error::SelectMailbox {
                mailbox: mailbox.to_string(),
                source,
            }
        }
    })?;

    debug!(exists = selected.exists, "Mailbox selected");

    Ok(())
}

/// Returns the UIDs of all unread messages in the selected mailbox, ascending.
#[instrument(name = "session::search_unseen", skip(session))]
pub(crate) async fn search_unseen(session: &mut ImapSession) -> Result<Vec<u32>> {
    let uids = session
        .uid_search("UNSEEN")
        .await
        .map_err(|source| Error::ImapSearch { source })?;

    let mut uids: Vec<u32> = uids.into_iter().collect();
    uids.sort_unstable();

    debug!(uid_count = uids.len(), "Found unread emails");

    Ok(uids)
}

/// Fetches the full RFC 822 source of one message.
///
/// `BODY[]` (not `BODY.PEEK[]`) is requested, so the server marks the message as read.
#[instrument(name = "session::fetch_message", skip(session))]
pub(crate) async fn fetch_message(session: &mut ImapSession, uid: u32) -> Result<Option<Vec<u8>>> {
    debug!("Fetching message");

    let messages: Vec<async_imap::types::Fetch> = session
        .uid_fetch(uid.to_string(), "BODY[]")
        .await
        .map_err(|source| Error::ImapFetch { uid, source })?
        .try_collect()
        .await
        .map_err(|source| Error::ImapFetch { uid, source })?;

    Ok(messages
        .iter()
        .find(|message| message.uid.map_or(true, |fetched| fetched == uid))
        .and_then(|message| message.body())
        .map(<[u8]>::to_vec))
}

/// Closes the selected mailbox, then logs out.
///
/// A failed `CLOSE` is only logged; `LOGOUT` is sent regardless.
#[instrument(name = "session::logout", skip(session))]
pub(crate) async fn logout<T: ImapStream>(session: &mut Session<T>) -> Result<()> {
    if let Err(e) = session.close().await {
        debug!(error = %e, "CLOSE failed");
    }

    debug!("Logging out");

    session
        .logout()
        .await
        .map_err(|source| Error::ImapLogout { source })?;

    Ok(())
}
