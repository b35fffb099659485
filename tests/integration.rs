//! Integration tests for pdf-notifier.
//!
//! These tests require a real IMAP server with STARTTLS and are disabled by default.
//! To run them:
//!
//! ```bash
//! # Set the same environment variables the binary reads (or put them in .env)
//! export PYTHON_EMAIL_HOST="mail.example.com"
//! export PYTHON_IMAP_PORT="143"
//! export PYTHON_SMTP_PORT="587"
//! export PYTHON_EMAIL_USER="scanner@example.com"
//! export PYTHON_EMAIL_PASSWD="app-password"
//! export PYTHON_EMAIL_INBOX="INBOX"
//! export PYTHON_REGEX_PATTERN="Invoice [0-9]+"
//! export PYTHON_EMAIL_RECIPIENT="ops@example.com"
//!
//! # Run with the integration-tests feature
//! cargo test --features integration-tests -- --ignored
//! ```
//!
//! None of these tests fetch messages, so unread messages stay unread.

#![cfg(feature = "integration-tests")]

use pdf_notifier::{ErrorCategory, ImapInbox, MailSource, NotifierConfig};

// ─────────────────────────────────────────────────────────────────────────────
// Test Configuration Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn get_test_config() -> Option<NotifierConfig> {
    dotenvy::dotenv().ok();
    NotifierConfig::from_env().ok()
}

// ─────────────────────────────────────────────────────────────────────────────
// Connection Tests
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
#[ignore = "requires real IMAP server"]
async fn test_connect_and_close() {
    let config = get_test_config().expect("Test config from environment variables");

    let mut inbox = ImapInbox::connect(&config)
        .await
        .expect("Failed to connect");

    assert_eq!(inbox.mailbox(), config.inbox);

    inbox.close().await.expect("Failed to logout");
}

#[tokio::test]
#[ignore = "requires real IMAP server"]
async fn test_list_unread() {
    let config = get_test_config().expect("Test config from environment variables");

    let mut inbox = ImapInbox::connect(&config)
        .await
        .expect("Failed to connect");

    let uids = inbox.unread_uids().await.expect("Failed to search");
    assert!(uids.windows(2).all(|pair| pair[0] < pair[1]));

    inbox.close().await.expect("Failed to logout");
}

// ─────────────────────────────────────────────────────────────────────────────
// Error Handling Tests
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
#[ignore = "requires real IMAP server"]
async fn test_unknown_inbox() {
    let mut config = get_test_config().expect("Test config from environment variables");
    config.inbox = "pdf-notifier-does-not-exist-7f3a".into();

    let err = ImapInbox::connect(&config).await.unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Inbox);
    assert!(err.is_fatal());
}

#[tokio::test]
#[ignore = "requires intentionally wrong credentials"]
async fn test_invalid_credentials() {
    let config = get_test_config().expect("Test config from environment variables");
    let config = NotifierConfig::builder()
        .host(config.host.clone())
        .imap_port(config.imap_port)
        .smtp_port(config.smtp_port)
        .username(config.username())
        .password("wrong-password")
        .inbox(config.inbox.clone())
        .pattern(config.pattern())
        .recipient(config.recipient())
        .build()
        .expect("valid config structure");

    let err = ImapInbox::connect(&config).await.unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Authentication);
}
