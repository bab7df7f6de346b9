//! IMAP mailbox quota reporting
//!
//! Reads mail account credentials from a group of a `KeePass` database,
//! logs in to an IMAP server once per account, and reports the
//! storage quota (RFC 2087 `GETQUOTAROOT`) of a root mailbox.
//!
//! Accounts are checked one after the other. A failure on one account
//! is reported with that account and does not stop the others; only
//! a credential store that cannot be opened aborts the run.

mod client;
mod config;
mod connection;
mod error;
mod mailbox;
mod output;
mod quota;
mod report;
mod secret;
mod store;

pub use client::QuotaChecker;
pub use config::{Security, ServerConfig};
pub use error::{AccountError, Error, Result};
pub use mailbox::Mailbox;
pub use output::{OutputFormat, write_report};
pub use quota::QuotaUsage;
pub use report::{AccountReport, QuotaSource, WARNING_THRESHOLD, report, sort_by_usage};
pub use secret::{PROMPT_SENTINEL, SecretProvider, TerminalPrompt, resolve_password};
pub use store::{Credential, CredentialStore};
