//! `KeePass` credential store
//!
//! Mail account credentials are kept as entries of one `KeePass` group.
//! The database is opened once per run with a password, a key file,
//! or both.

use crate::error::{Error, Result};
use keepass::db::{Group, Node};
use keepass::{Database, DatabaseKey};
use std::fmt;
use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info};

/// Login details for one mail account.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub title: String,
    pub username: String,
    pub password: String,
}

impl Credential {
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("title", &self.title)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// An opened `KeePass` database.
pub struct CredentialStore {
    database: Database,
}

impl CredentialStore {
    /// Open and decrypt a `KeePass` database.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if neither a password nor a key file is given.
    /// - [`Error::StoreNotFound`] if the database or key file is missing.
    /// - [`Error::StoreAuthentication`] if the key does not match or the
    ///   file is not a readable database.
    pub fn open(
        database_path: &Path,
        password: Option<&str>,
        key_path: Option<&Path>,
    ) -> Result<Self> {
        if password.is_none() && key_path.is_none() {
            return Err(Error::Config(
                "a database password or key file is required".into(),
            ));
        }

        let mut key = DatabaseKey::new();
        if let Some(password) = password {
            key = key.with_password(password);
        }
        if let Some(key_path) = key_path {
            let mut key_file = open_file(key_path)?;
            key = key
                .with_keyfile(&mut key_file)
                .map_err(|e| Error::StoreAuthentication(format!("invalid key file: {e}")))?;
        }

        let mut file = open_file(database_path)?;
        let database = Database::open(&mut file, key)
            .map_err(|e| Error::StoreAuthentication(e.to_string()))?;

        info!("Opened credential store {}", database_path.display());
        Ok(Self::from_database(database))
    }

    /// Wrap an already decrypted database.
    #[must_use]
    pub const fn from_database(database: Database) -> Self {
        Self { database }
    }

    /// Credentials stored directly in the first group named
    /// `group_name`.
    ///
    /// Entries without a username or password are skipped. An entry
    /// without a title is labelled with its username.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GroupNotFound`] if no group has that name.
    pub fn entries_in_group(&self, group_name: &str) -> Result<Vec<Credential>> {
        let group = find_group(&self.database.root, group_name)
            .ok_or_else(|| Error::GroupNotFound(group_name.to_string()))?;

        let credentials = group_credentials(group);
        debug!(
            "{} usable entries in group \"{}\"",
            credentials.len(),
            group_name
        );
        Ok(credentials)
    }
}

fn open_file(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            Error::StoreNotFound(path.display().to_string())
        } else {
            Error::Io(e)
        }
    })
}

/// Depth-first search, the group itself included.
fn find_group<'a>(group: &'a Group, name: &str) -> Option<&'a Group> {
    if group.name == name {
        return Some(group);
    }
    group.children.iter().find_map(|node| match node {
        Node::Group(child) => find_group(child, name),
        Node::Entry(_) => None,
    })
}

fn group_credentials(group: &Group) -> Vec<Credential> {
    group
        .children
        .iter()
        .filter_map(|node| match node {
            Node::Entry(entry) => Some(entry),
            Node::Group(_) => None,
        })
        .filter_map(|entry| {
            let username = entry.get_username().filter(|u| !u.is_empty())?;
            let password = entry.get_password().filter(|p| !p.is_empty())?;
            let title = entry
                .get_title()
                .filter(|t| !t.is_empty())
                .unwrap_or(username);
            Some(Credential::new(title, username, password))
        })
        .collect()
}
