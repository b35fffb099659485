//! Internal module for establishing TLS connections to IMAP servers.
//!
//! The connection starts in plaintext and is upgraded with the IMAP `STARTTLS`
//! command before any credentials are sent.

use crate::error::{Error, Result};
use rustls::ClientConfig;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::{debug, instrument};
use webpki_roots::TLS_SERVER_ROOTS;

/// A TLS stream over TCP, used for IMAP communication.
pub(crate) type TlsStream = tokio_rustls::client::TlsStream<TcpStream>;

/// Connects to an IMAP server in plaintext and upgrades the connection with STARTTLS.
#[instrument(
    name = "connection::establish_starttls",
    skip_all,
    fields(imap_host = %imap_host, target_addr = %target_addr)
)]
pub(crate) async fn establish_starttls_connection(
    imap_host: &str,
    target_addr: &str,
) -> Result<TlsStream> {
    let connector = create_tls_connector();
    let server_name = parse_server_name(imap_host)?;
    let tcp_stream = connect_direct(target_addr).await?;
    let tcp_stream = negotiate_starttls(tcp_stream, target_addr).await?;

    debug!("Performing TLS handshake");

    connector
        .connect(server_name, tcp_stream)
        .await
        .map_err(|source| Error::TlsConnect {
            target: target_addr.to_string(),
            source,
        })
}

/// Creates a TLS connector with the webpki root certificates.
fn create_tls_connector() -> TlsConnector {
    let mut root_cert_store = rustls::RootCertStore::empty();
    root_cert_store.add_trust_anchors(TLS_SERVER_ROOTS.iter().map(|ta| {
        rustls::OwnedTrustAnchor::from_subject_spki_name_constraints(
            ta.subject,
            ta.spki,
            ta.name_constraints,
        )
    }));

    let tls_config = ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(root_cert_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(tls_config))
}

/// Parses server name for TLS SNI.
fn parse_server_name(host: &str) -> Result<rustls::ServerName> {
    rustls::ServerName::try_from(host).map_err(|source| Error::InvalidDnsName {
        host: host.to_string(),
        source,
    })
}

/// Direct TCP connection.
#[instrument(name = "connection::direct", skip_all)]
async fn connect_direct(target_addr: &str) -> Result<TcpStream> {
    debug!(target = %target_addr, "Establishing direct TCP connection");

    TcpStream::connect(target_addr)
        .await
        .map_err(|source| Error::TcpConnect {
            target: target_addr.to_string(),
            source,
        })
}

/// Issues `STARTTLS` over the plaintext connection and hands the socket back for the handshake.
///
/// The server greeting arrives as an untagged response and is consumed while waiting
/// for the tagged reply to `STARTTLS`.
#[instrument(name = "connection::starttls", skip_all)]
async fn negotiate_starttls(tcp_stream: TcpStream, target_addr: &str) -> Result<TcpStream> {
    let mut client = async_imap::Client::new(tcp_stream);

    debug!("Requesting STARTTLS");

    client
        .run_command_and_check_ok("STARTTLS", None)
        .await
        .map_err(|source| Error::StartTls {
            target: target_addr.to_string(),
            source,
        })?;

    Ok(client.into_inner())
}
