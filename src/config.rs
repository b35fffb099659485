//! Configuration for the notifier.
//!
//! In production the configuration is read from the environment with
//! [`NotifierConfig::from_env`]. Use [`NotifierConfigBuilder`] to create one directly:
//!
//! ```
//! use pdf_notifier::NotifierConfig;
//!
//! let config = NotifierConfig::builder()
//!     .host("mail.example.com")
//!     .imap_port(143)
//!     .smtp_port(587)
//!     .username("scanner@example.com")
//!     .password("app-password")
//!     .inbox("INBOX")
//!     .pattern(r"Invoice \d+")
//!     .recipient("ops@example.com")
//!     .build()
//!     .expect("valid config");
//! ```

use crate::error::{Error, Result};
use crate::matcher::RegexMatcher;
use email_address::EmailAddress;
use secrecy::{ExposeSecret, SecretString};
use std::path::PathBuf;
use std::time::Duration;

/// Hostname shared by the IMAP and SMTP servers.
pub const ENV_HOST: &str = "PYTHON_EMAIL_HOST";
/// IMAP server port.
pub const ENV_IMAP_PORT: &str = "PYTHON_IMAP_PORT";
/// SMTP server port.
pub const ENV_SMTP_PORT: &str = "PYTHON_SMTP_PORT";
/// Login name for both protocols.
pub const ENV_USER: &str = "PYTHON_EMAIL_USER";
/// Password for both protocols.
pub const ENV_PASSWD: &str = "PYTHON_EMAIL_PASSWD";
/// Mailbox to scan.
pub const ENV_INBOX: &str = "PYTHON_EMAIL_INBOX";
/// Regular expression tested against PDF text.
pub const ENV_PATTERN: &str = "PYTHON_REGEX_PATTERN";
/// Notification recipient.
pub const ENV_RECIPIENT: &str = "PYTHON_EMAIL_RECIPIENT";

/// Every variable [`NotifierConfig::from_env`] requires, in lookup order.
pub const REQUIRED_VARS: [&str; 8] = [
    ENV_HOST,
    ENV_IMAP_PORT,
    ENV_SMTP_PORT,
    ENV_USER,
    ENV_PASSWD,
    ENV_INBOX,
    ENV_PATTERN,
    ENV_RECIPIENT,
];

/// Default template location, relative to the working directory.
pub const DEFAULT_TEMPLATE_PATH: &str = "emailText.txt";

/// Configuration for one notifier run.
///
/// Create using [`NotifierConfig::from_env()`] or [`NotifierConfig::builder()`].
///
/// Note: The `password` field is stored as a [`SecretString`] to prevent
/// accidental logging of sensitive credentials. The recipient is stored
/// as a validated [`EmailAddress`].
#[derive(Clone)]
pub struct NotifierConfig {
    /// Hostname of both the IMAP and the SMTP server.
    pub host: String,
    /// IMAP server port (STARTTLS, usually 143).
    pub imap_port: u16,
    /// SMTP server port (STARTTLS, usually 587).
    pub smtp_port: u16,
    username: String,
    password: SecretString,
    /// Mailbox scanned for unread messages.
    pub inbox: String,
    matcher: RegexMatcher,
    recipient: EmailAddress,
    /// Location of the subject/body template.
    pub template_path: PathBuf,
    /// Timeout configuration.
    pub timeouts: TimeoutConfig,
}

impl std::fmt::Debug for NotifierConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifierConfig")
            .field("host", &self.host)
            .field("imap_port", &self.imap_port)
            .field("smtp_port", &self.smtp_port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("inbox", &self.inbox)
            .field("pattern", &self.pattern())
            .field("recipient", &self.recipient.as_str())
            .field("template_path", &self.template_path)
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

impl NotifierConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> NotifierConfigBuilder {
        NotifierConfigBuilder::default()
    }

    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingVar`] naming the first absent variable, or a
    /// configuration error if a value is invalid.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name to its value.
    ///
    /// Surrounding double quotes are stripped from every value. A value that is empty
    /// after stripping counts as missing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingVar`] naming the first absent variable, or a
    /// configuration error if a value is invalid.
    ///
    /// # Example
    ///
    /// ```
    /// use pdf_notifier::NotifierConfig;
    /// use std::collections::HashMap;
    ///
    /// let vars: HashMap<&str, &str> = HashMap::from([
    ///     ("PYTHON_EMAIL_HOST", "\"mail.example.com\""),
    ///     ("PYTHON_IMAP_PORT", "143"),
    ///     ("PYTHON_SMTP_PORT", "587"),
    ///     ("PYTHON_EMAIL_USER", "scanner@example.com"),
    ///     ("PYTHON_EMAIL_PASSWD", "secret"),
    ///     ("PYTHON_EMAIL_INBOX", "INBOX"),
    ///     ("PYTHON_REGEX_PATTERN", r"Invoice \d+"),
    ///     ("PYTHON_EMAIL_RECIPIENT", "ops@example.com"),
    /// ]);
    ///
    /// let config = NotifierConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string()))
    ///     .expect("valid config");
    /// assert_eq!(config.host, "mail.example.com");
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &'static str| -> Result<String> {
            lookup(name)
                .map(|raw| raw.trim_matches('"').to_string())
                .filter(|value| !value.is_empty())
                .ok_or(Error::MissingVar { name })
        };

        let host = var(ENV_HOST)?;
        let imap_port = parse_port(ENV_IMAP_PORT, &var(ENV_IMAP_PORT)?)?;
        let smtp_port = parse_port(ENV_SMTP_PORT, &var(ENV_SMTP_PORT)?)?;

        Self::builder()
            .host(host)
            .imap_port(imap_port)
            .smtp_port(smtp_port)
            .username(var(ENV_USER)?)
            .password(var(ENV_PASSWD)?)
            .inbox(var(ENV_INBOX)?)
            .pattern(var(ENV_PATTERN)?)
            .recipient(var(ENV_RECIPIENT)?)
            .build()
    }

    /// Returns the login name used for IMAP and SMTP, also used as the sender address.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the password as a string slice.
    ///
    /// The password is intentionally not directly accessible to prevent accidental logging.
    #[must_use]
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }

    /// Returns the regular expression tested against extracted PDF text.
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.matcher.as_str()
    }

    /// Returns the compiled pattern.
    #[must_use]
    pub fn matcher(&self) -> &RegexMatcher {
        &self.matcher
    }

    /// Returns the notification recipient.
    #[must_use]
    pub fn recipient(&self) -> &str {
        self.recipient.as_str()
    }

    /// Returns the IMAP server address as "host:port".
    #[must_use]
    pub fn imap_address(&self) -> String {
        format!("{}:{}", self.host, self.imap_port)
    }
}

/// Timeout configuration for the network steps of a run.
///
/// Timeouts are reported as errors; nothing is retried.
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Timeout for TCP connect, STARTTLS and the TLS handshake.
    pub connect: Duration,
    /// Timeout for IMAP authentication.
    pub auth: Duration,
    /// Timeout for selecting the mailbox.
    pub select: Duration,
    /// Timeout for the unread search.
    pub search: Duration,
    /// Timeout for fetching one message.
    pub fetch: Duration,
    /// Timeout for logout.
    pub logout: Duration,
    /// Timeout for one SMTP delivery.
    pub smtp: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(30),
            auth: Duration::from_secs(30),
            select: Duration::from_secs(10),
            search: Duration::from_secs(10),
            fetch: Duration::from_secs(60),
            logout: Duration::from_secs(5),
            smtp: Duration::from_secs(60),
        }
    }
}

fn parse_port(name: &str, raw: &str) -> Result<u16> {
    raw.trim().parse().map_err(|_| Error::InvalidConfig {
        message: format!("{name} must be a port number, got '{raw}'"),
    })
}

/// Validates an email address format.
fn validate_email(email: &str) -> Result<EmailAddress> {
    EmailAddress::parse_with_options(email, email_address::Options::default()).map_err(|_| {
        Error::InvalidEmailFormat {
            email: email.to_string(),
        }
    })
}

/// Builder for [`NotifierConfig`].
#[derive(Debug, Default)]
pub struct NotifierConfigBuilder {
    host: Option<String>,
    imap_port: Option<u16>,
    smtp_port: Option<u16>,
    username: Option<String>,
    password: Option<String>,
    inbox: Option<String>,
    pattern: Option<String>,
    recipient: Option<String>,
    template_path: Option<PathBuf>,
    timeouts: Option<TimeoutConfig>,
}

impl NotifierConfigBuilder {
    /// Sets the server hostname (required).
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the IMAP port (required).
    #[must_use]
    pub fn imap_port(mut self, port: u16) -> Self {
        self.imap_port = Some(port);
        self
    }

    /// Sets the SMTP port (required).
    #[must_use]
    pub fn smtp_port(mut self, port: u16) -> Self {
        self.smtp_port = Some(port);
        self
    }

    /// Sets the login name (required).
    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the password (required).
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets the mailbox to scan (required).
    #[must_use]
    pub fn inbox(mut self, inbox: impl Into<String>) -> Self {
        self.inbox = Some(inbox.into());
        self
    }

    /// Sets the regular expression (required).
    #[must_use]
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Sets the notification recipient (required).
    #[must_use]
    pub fn recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = Some(recipient.into());
        self
    }

    /// Sets the template location. Defaults to [`DEFAULT_TEMPLATE_PATH`].
    #[must_use]
    pub fn template_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.template_path = Some(path.into());
        self
    }

    /// Sets timeout configuration.
    #[must_use]
    pub fn timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = Some(timeouts);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if required fields are missing, the recipient is not a valid
    /// address, or the pattern does not compile.
    pub fn build(self) -> Result<NotifierConfig> {
        fn required<T>(value: Option<T>, field: &str) -> Result<T> {
            value.ok_or_else(|| Error::InvalidConfig {
                message: format!("{field} is required"),
            })
        }

        let recipient_raw = required(self.recipient, "recipient")?;
        let recipient = validate_email(&recipient_raw)?;
        let matcher = RegexMatcher::new(&required(self.pattern, "pattern")?)?;

        Ok(NotifierConfig {
            host: required(self.host, "host")?,
            imap_port: required(self.imap_port, "imap_port")?,
            smtp_port: required(self.smtp_port, "smtp_port")?,
            username: required(self.username, "username")?,
            password: SecretString::from(required(self.password, "password")?),
            inbox: required(self.inbox, "inbox")?,
            matcher,
            recipient,
            template_path: self
                .template_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMPLATE_PATH)),
            timeouts: self.timeouts.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn full_env() -> HashMap<&'static str, String> {
        HashMap::from([
            (ENV_HOST, "mail.example.com".to_string()),
            (ENV_IMAP_PORT, "143".to_string()),
            (ENV_SMTP_PORT, "587".to_string()),
            (ENV_USER, "scanner@example.com".to_string()),
            (ENV_PASSWD, "secret".to_string()),
            (ENV_INBOX, "Invoices".to_string()),
            (ENV_PATTERN, r"Invoice \d+".to_string()),
            (ENV_RECIPIENT, "ops@example.com".to_string()),
        ])
    }

    fn load(env: &HashMap<&'static str, String>) -> Result<NotifierConfig> {
        NotifierConfig::from_lookup(|name| env.get(name).cloned())
    }

    #[test]
    fn test_from_lookup_complete() {
        let config = load(&full_env()).unwrap();

        assert_eq!(config.host, "mail.example.com");
        assert_eq!(config.imap_port, 143);
        assert_eq!(config.smtp_port, 587);
        assert_eq!(config.username(), "scanner@example.com");
        assert_eq!(config.password(), "secret");
        assert_eq!(config.inbox, "Invoices");
        assert_eq!(config.recipient(), "ops@example.com");
        assert_eq!(config.template_path, PathBuf::from(DEFAULT_TEMPLATE_PATH));
        assert_eq!(config.imap_address(), "mail.example.com:143");
        assert_eq!(config.pattern(), r"Invoice \d+");
    }

    #[test]
    fn test_each_missing_var_is_reported() {
        for name in REQUIRED_VARS {
            let mut env = full_env();
            env.remove(name);

            match load(&env) {
                Err(Error::MissingVar { name: missing }) => assert_eq!(missing, name),
                other => panic!("expected MissingVar for {name}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_empty_var_counts_as_missing() {
        let mut env = full_env();
        env.insert(ENV_INBOX, "\"\"".to_string());

        assert!(matches!(
            load(&env),
            Err(Error::MissingVar { name: ENV_INBOX })
        ));
    }

    #[test]
    fn test_quotes_are_stripped() {
        let mut env = full_env();
        env.insert(ENV_HOST, "\"mail.example.com\"".to_string());
        env.insert(ENV_PASSWD, "\"p@ss word\"".to_string());

        let config = load(&env).unwrap();
        assert_eq!(config.host, "mail.example.com");
        assert_eq!(config.password(), "p@ss word");
    }

    #[test]
    fn test_invalid_port() {
        let mut env = full_env();
        env.insert(ENV_SMTP_PORT, "smtp".to_string());

        let err = load(&env).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
        assert!(err.to_string().contains(ENV_SMTP_PORT));
    }

    #[test]
    fn test_invalid_recipient() {
        let mut env = full_env();
        env.insert(ENV_RECIPIENT, "not-an-address".to_string());

        assert!(matches!(
            load(&env),
            Err(Error::InvalidEmailFormat { .. })
        ));
    }

    #[test]
    fn test_invalid_pattern_fails_config_load() {
        let mut env = full_env();
        env.insert(ENV_PATTERN, "Invoice (".to_string());

        let err = load(&env).unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_builder_missing_field() {
        let result = NotifierConfig::builder()
            .host("mail.example.com")
            .recipient("ops@example.com")
            .build();
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_password_not_in_debug() {
        let mut env = full_env();
        env.insert(ENV_PASSWD, "super-secret-password".to_string());
        let config = load(&env).unwrap();

        let debug_str = format!("{config:?}");
        assert!(!debug_str.contains("super-secret-password"));
        assert!(debug_str.contains("[REDACTED]"));
    }
}
