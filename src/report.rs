//! Per-account quota report
//!
//! Each credential is checked on its own. A failing account yields a
//! report carrying its [`AccountError`]; the remaining accounts are
//! still checked.

use crate::error::AccountError;
use crate::quota::QuotaUsage;
use crate::store::Credential;
use futures::{Stream, StreamExt, stream};
use std::cmp::Ordering;
use tracing::{info, warn};

/// Usage percentage at which an account is flagged.
pub const WARNING_THRESHOLD: f64 = 80.0;

/// Anything that can look up the quota for one account.
pub trait QuotaSource {
    fn quota(
        &self,
        credential: &Credential,
    ) -> impl Future<Output = Result<QuotaUsage, AccountError>>;
}

/// The outcome of checking one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountReport {
    pub title: String,
    pub username: String,
    pub outcome: Result<QuotaUsage, AccountError>,
}

impl AccountReport {
    /// Usage percentage, 0 when the limit is 0, `None` on failure.
    #[must_use]
    pub fn percent(&self) -> Option<f64> {
        self.outcome.as_ref().ok().map(QuotaUsage::percent_or_zero)
    }

    #[must_use]
    pub fn is_warning(&self) -> bool {
        self.percent().is_some_and(|p| p >= WARNING_THRESHOLD)
    }
}

/// Check every credential in order, one at a time.
///
/// The stream is lazy: an account is queried only when the stream is
/// polled for its report.
pub fn report<S: QuotaSource>(
    source: &S,
    credentials: Vec<Credential>,
) -> impl Stream<Item = AccountReport> {
    stream::iter(credentials).then(move |credential| async move {
        info!("Checking quota for {}", credential.title);
        let outcome = source.quota(&credential).await;
        if let Err(e) = &outcome {
            warn!("{} ({}): {}", credential.title, credential.username, e);
        }
        AccountReport {
            title: credential.title,
            username: credential.username,
            outcome,
        }
    })
}

/// Highest usage first; failed accounts last, in their original order.
pub fn sort_by_usage(reports: &mut [AccountReport]) {
    reports.sort_by(|a, b| match (a.percent(), b.percent()) {
        (Some(pa), Some(pb)) => pb.total_cmp(&pa),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}
