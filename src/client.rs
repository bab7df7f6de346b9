//! IMAP quota client

use crate::config::ServerConfig;
use crate::connection;
use crate::error::AccountError;
use crate::quota::{QuotaUsage, fetch_quota};
use crate::report::QuotaSource;
use crate::store::Credential;
use tracing::info;

/// Checks mailbox quotas on one IMAP server.
///
/// Every query opens its own connection and logs out afterwards; no
/// session is shared between accounts.
#[derive(Debug, Clone)]
pub struct QuotaChecker {
    config: ServerConfig,
}

impl QuotaChecker {
    #[must_use]
    pub const fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Log in as `credential` and fetch the storage quota of the
    /// configured root mailbox.
    ///
    /// # Errors
    ///
    /// Returns an [`AccountError`] if the connection, login, or
    /// `GETQUOTAROOT` fails.
    pub async fn query(&self, credential: &Credential) -> Result<QuotaUsage, AccountError> {
        let mut session = connection::connect(&self.config, credential).await?;

        let usage = fetch_quota(&mut session, &self.config.root).await;

        session.logout().await.ok();

        let usage = usage?;
        info!(
            "{}: {} / {} used",
            credential.username, usage.used, usage.total
        );
        Ok(usage)
    }
}

impl QuotaSource for QuotaChecker {
    fn quota(
        &self,
        credential: &Credential,
    ) -> impl Future<Output = Result<QuotaUsage, AccountError>> {
        self.query(credential)
    }
}
