//! Data models for password store entries.

use serde::Serialize;
use std::path::{Path, PathBuf};
use zeroize::Zeroize;

/// Location of the encrypted file backing an entry.
///
/// Only the store layout hands these out, so an entry carrying one is known
/// to exist on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Locator(PathBuf);

impl Locator {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self(path)
    }

    /// Path of the encrypted file.
    pub fn path(&self) -> &Path {
        &self.0
    }
}

/// A single credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    /// Top-level name: the service directory or file stem.
    pub service: String,
    /// User name; the file stem until a decrypted `username:` line says otherwise.
    pub username: String,
    /// Secret, empty until decrypted or set by the caller.
    #[serde(skip)]
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    locator: Option<Locator>,
}

impl Entry {
    /// Create an entry that is not on disk yet.
    pub fn new(
        service: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            username: username.into(),
            password: password.into(),
            locator: None,
        }
    }

    /// Entry for a flat service file: the username defaults to the stem.
    pub(crate) fn flat(stem: &str, path: PathBuf) -> Self {
        Self {
            service: stem.to_string(),
            username: stem.to_string(),
            password: String::new(),
            locator: Some(Locator::new(path)),
        }
    }

    /// Entry for a user file inside a service directory.
    pub(crate) fn member(service: &str, username: &str, path: PathBuf) -> Self {
        Self {
            service: service.to_string(),
            username: username.to_string(),
            password: String::new(),
            locator: Some(Locator::new(path)),
        }
    }

    pub fn locator(&self) -> Option<&Locator> {
        self.locator.as_ref()
    }

    /// Whether the entry has a backing file.
    pub fn is_existing(&self) -> bool {
        self.locator.is_some()
    }
}

impl Drop for Entry {
    fn drop(&mut self) {
        self.password.zeroize();
    }
}

/// All entries sharing a service name. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    pub service: String,
    pub entries: Vec<Entry>,
}

impl Group {
    /// Build a group; returns `None` when there are no entries.
    pub fn new(service: impl Into<String>, entries: Vec<Entry>) -> Option<Self> {
        if entries.is_empty() {
            return None;
        }
        Some(Self {
            service: service.into(),
            entries,
        })
    }

    /// The sole entry of a single-user service.
    pub fn single(&self) -> Option<&Entry> {
        match self.entries.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    /// Find an entry by username.
    pub fn find_user(&self, username: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.username == username)
    }

    /// Usernames in group order.
    pub fn usernames(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.username.clone()).collect()
    }
}
