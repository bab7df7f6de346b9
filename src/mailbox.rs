//! Root mailbox names
//!
//! The quota root is looked up for a single mailbox, usually INBOX.
//! RFC 3501 makes INBOX case-insensitive, so every spelling of it is
//! folded into [`Mailbox::Inbox`]. Other names are sent verbatim.

use std::fmt;
use std::str::FromStr;

/// The mailbox whose quota root is queried.
///
/// # Examples
///
/// ```
/// use mailbox_quota::Mailbox;
///
/// assert_eq!(Mailbox::from("inbox"), Mailbox::Inbox);
/// assert_eq!(Mailbox::from("Archive").as_str(), "Archive");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Mailbox {
    /// The INBOX mailbox.
    #[default]
    Inbox,
    /// Any other mailbox path.
    Other(String),
}

impl Mailbox {
    /// The IMAP mailbox name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Inbox => "INBOX",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Mailbox {
    fn from(s: &str) -> Self {
        if s.eq_ignore_ascii_case("inbox") {
            Self::Inbox
        } else {
            Self::Other(s.to_string())
        }
    }
}

impl From<String> for Mailbox {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl FromStr for Mailbox {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}
