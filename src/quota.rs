//! Quota lookup (RFC 2087)

use crate::connection::ImapSession;
use crate::error::AccountError;
use crate::mailbox::Mailbox;
use async_imap::types::{Quota, QuotaResourceName};
use serde::Serialize;
use tracing::debug;

/// Storage usage reported by the server, in its storage units
/// (1024 octets for the STORAGE resource).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaUsage {
    pub used: u64,
    pub total: u64,
}

impl QuotaUsage {
    #[must_use]
    pub const fn new(used: u64, total: u64) -> Self {
        Self { used, total }
    }

    /// Usage as a percentage of the limit, `None` when the limit is 0.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        Some(self.used as f64 / self.total as f64 * 100.0)
    }

    /// Like [`percent`](Self::percent), with 0 for an undefined limit.
    #[must_use]
    pub fn percent_or_zero(&self) -> f64 {
        self.percent().unwrap_or(0.0)
    }
}

/// First STORAGE resource across the returned quota roots.
fn storage_usage(quotas: &[Quota]) -> Option<QuotaUsage> {
    quotas
        .iter()
        .flat_map(|quota| quota.resources.iter())
        .find(|resource| matches!(resource.name, QuotaResourceName::Storage))
        .map(|resource| QuotaUsage::new(resource.usage, resource.limit))
}

/// Run `GETQUOTAROOT` for `root` and return its storage usage.
///
/// A server that does not advertise QUOTA, or whose quota roots carry
/// no STORAGE resource, is reported as [`AccountError::Unsupported`].
/// async-imap drops the tagged status of GETQUOTAROOT, so a refused
/// command shows up as a reply with no QUOTAROOT data and is reported
/// as [`AccountError::Protocol`].
pub async fn fetch_quota(
    session: &mut ImapSession,
    root: &Mailbox,
) -> Result<QuotaUsage, AccountError> {
    let capabilities = session
        .capabilities()
        .await
        .map_err(|e| AccountError::Protocol(format!("CAPABILITY failed: {e}")))?;
    if !capabilities.has_str("QUOTA") {
        return Err(AccountError::Unsupported(
            "server does not advertise QUOTA".to_string(),
        ));
    }

    let (roots, quotas) = session
        .get_quota_root(root.as_str())
        .await
        .map_err(|e| AccountError::Protocol(format!("GETQUOTAROOT {root} failed: {e}")))?;

    debug!(
        "{} quota root(s), {} quota(s) for {}",
        roots.len(),
        quotas.len(),
        root
    );

    if roots.is_empty() && quotas.is_empty() {
        return Err(AccountError::Protocol(format!(
            "GETQUOTAROOT {root} refused by server"
        )));
    }

    storage_usage(&quotas)
        .ok_or_else(|| AccountError::Unsupported(format!("no STORAGE quota for {root}")))
}
