//! Mail account configuration

use crate::error::{Error, Result};
use std::env;
use std::fmt;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How the TLS layer is negotiated with the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// TLS from the first byte (IMAPS, usually port 993).
    #[default]
    ImplicitTls,
    /// Plaintext greeting, then `STARTTLS` (usually port 143).
    StartTls,
}

impl Security {
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::ImplicitTls => 993,
            Self::StartTls => 143,
        }
    }
}

/// Credentials and server coordinates for one mail account.
///
/// Supplied per call; nothing here is persisted. The address doubles as
/// the IMAP login name.
#[derive(Clone)]
pub struct Account {
    pub address: String,
    pub secret: String,
    pub display_name: Option<String>,
    pub host: String,
    pub port: u16,
    pub security: Security,
    /// Skip certificate verification (local bridges with self-signed certs).
    pub accept_invalid_certs: bool,
    /// Upper bound for a whole operation, connect to logout.
    pub timeout: Duration,
}

impl Account {
    /// An implicit-TLS account with default port and timeout.
    #[must_use]
    pub fn new(
        address: impl Into<String>,
        secret: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            secret: secret.into(),
            display_name: None,
            host: host.into(),
            port: Security::ImplicitTls.default_port(),
            security: Security::ImplicitTls,
            accept_invalid_certs: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Load the account from environment variables
    ///
    /// Reads from `.env` file if present. Required variables:
    /// - `MAIL_ADDRESS`
    /// - `MAIL_SECRET`
    ///
    /// Optional (with defaults):
    /// - `MAIL_DISPLAY_NAME`
    /// - `MAIL_HOST` (default: `127.0.0.1`)
    /// - `MAIL_SECURITY` (`tls` or `starttls`, default: `tls`)
    /// - `MAIL_PORT` (default: 993 for `tls`, 143 for `starttls`)
    /// - `MAIL_ACCEPT_INVALID_CERTS` (default: `false`)
    /// - `MAIL_TIMEOUT_SECS` (default: `30`)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let security = match lookup("MAIL_SECURITY").as_deref() {
            None => Security::default(),
            Some(s) if s.eq_ignore_ascii_case("tls") => Security::ImplicitTls,
            Some(s) if s.eq_ignore_ascii_case("starttls") => Security::StartTls,
            Some(other) => {
                return Err(Error::Config(format!("Invalid MAIL_SECURITY: {other}")));
            }
        };

        let port = match lookup("MAIL_PORT") {
            Some(p) => p
                .parse()
                .map_err(|e| Error::Config(format!("Invalid MAIL_PORT: {e}")))?,
            None => security.default_port(),
        };

        let timeout = match lookup("MAIL_TIMEOUT_SECS") {
            Some(t) => Duration::from_secs(
                t.parse()
                    .map_err(|e| Error::Config(format!("Invalid MAIL_TIMEOUT_SECS: {e}")))?,
            ),
            None => DEFAULT_TIMEOUT,
        };

        let accept_invalid_certs = lookup("MAIL_ACCEPT_INVALID_CERTS")
            .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));

        Ok(Self {
            address: lookup("MAIL_ADDRESS")
                .ok_or_else(|| Error::Config("MAIL_ADDRESS not set".into()))?,
            secret: lookup("MAIL_SECRET")
                .ok_or_else(|| Error::Config("MAIL_SECRET not set".into()))?,
            display_name: lookup("MAIL_DISPLAY_NAME"),
            host: lookup("MAIL_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            security,
            accept_invalid_certs,
            timeout,
        })
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("address", &self.address)
            .field("secret", &"<redacted>")
            .field("display_name", &self.display_name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("security", &self.security)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("timeout", &self.timeout)
            .finish()
    }
}
