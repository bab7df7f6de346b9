//! Error types for mailbox-quota
//!
//! [`Error`] covers failures that stop a run before any account is
//! checked. [`AccountError`] covers failures scoped to one account;
//! those are reported alongside the other accounts and never abort
//! the run.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Credential store not found: {0}")]
    StoreNotFound(String),

    #[error("Cannot open credential store: {0}")]
    StoreAuthentication(String),

    #[error("Group \"{0}\" not found")]
    GroupNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A failure while checking a single account.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("login failed: {0}")]
    Authentication(String),

    #[error("quota not supported: {0}")]
    Unsupported(String),

    #[error("IMAP error: {0}")]
    Protocol(String),
}

impl From<std::io::Error> for AccountError {
    fn from(e: std::io::Error) -> Self {
        Self::Connection(e.to_string())
    }
}
