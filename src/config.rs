//! IMAP connection configuration

use crate::error::{Error, Result};
use crate::mailbox::Mailbox;
use std::fmt;

/// How the connection to the IMAP server is secured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Security {
    /// Plaintext TCP.
    #[default]
    Plain,
    /// TLS from the first byte (usually port 993).
    Tls,
    /// Plaintext connect, then upgrade with STARTTLS.
    StartTls,
}

impl Security {
    /// Pick the mode from the `--ssl` and `--starttls` switches.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when both switches are set.
    pub fn from_flags(ssl: bool, starttls: bool) -> Result<Self> {
        match (ssl, starttls) {
            (true, true) => Err(Error::Config(
                "--ssl and --starttls are mutually exclusive".into(),
            )),
            (true, false) => Ok(Self::Tls),
            (false, true) => Ok(Self::StartTls),
            (false, false) => Ok(Self::Plain),
        }
    }
}

impl fmt::Display for Security {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Plain => "plain",
            Self::Tls => "tls",
            Self::StartTls => "starttls",
        })
    }
}

/// Connection parameters shared by every account in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub security: Security,
    /// Mailbox whose quota root is reported.
    pub root: Mailbox,
    /// Skip certificate verification (self-signed servers).
    pub accept_invalid_certs: bool,
}

impl ServerConfig {
    /// Plaintext configuration for `host:port` with the INBOX root.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            security: Security::default(),
            root: Mailbox::default(),
            accept_invalid_certs: false,
        }
    }

    #[must_use]
    pub const fn with_security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    #[must_use]
    pub fn with_root(mut self, root: impl Into<Mailbox>) -> Self {
        self.root = root.into();
        self
    }

    #[must_use]
    pub const fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// `host:port`, as passed to `TcpStream::connect`.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Reject configurations that cannot possibly connect.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an empty host or port 0.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Config("server address is empty".into()));
        }
        if self.port == 0 {
            return Err(Error::Config("server port must not be 0".into()));
        }
        Ok(())
    }
}
