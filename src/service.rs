//! Entry store: listing, decryption and saving with the migration policy.

use crate::crypto::CryptoEngine;
use crate::error::{PassError, Result};
use crate::gpg::{GpgCommand, OpenPgpBackend};
use crate::layout::{self, Location, ServiceShape};
use crate::models::{Entry, Group};
use crate::notify::{Notifier, APP_NAME, NOTIFY_TIMEOUT};
use crate::parser;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use zeroize::{Zeroize, Zeroizing};

/// File in the store root naming the recipient key.
pub const GPG_ID_FILE: &str = ".gpg-id";

/// Settings needed to open a store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Explicit store directory; `None` uses `$HOME/.password-store`.
    pub root: Option<PathBuf>,
    /// GnuPG executable.
    pub gpg_program: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: None,
            gpg_program: PathBuf::from("gpg"),
        }
    }
}

/// What [`EntryStore::save`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// First entry of a new service, written as `<service>.gpg`.
    CreatedService(PathBuf),
    /// The single user of a flat service was overwritten in place.
    UpdatedService(PathBuf),
    /// A user file was written inside a service directory.
    AddedUser(PathBuf),
    /// A flat service became a directory: the old file was moved to
    /// `moved_to` and the new entry written to `created`.
    Migrated { moved_to: PathBuf, created: PathBuf },
}

/// Read the recipient identifier from `<root>/.gpg-id`.
pub fn read_gpg_id(root: &Path) -> Result<String> {
    let path = root.join(GPG_ID_FILE);
    let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => PassError::MissingGpgId(path.clone()),
        _ => PassError::io("read", &path, e),
    })?;
    content
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
        .ok_or(PassError::MissingGpgId(path))
}

/// The password store.
#[derive(Debug)]
pub struct EntryStore {
    root: PathBuf,
    engine: CryptoEngine,
}

impl EntryStore {
    /// Open the configured store with the GnuPG backend.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let root = layout::resolve_root(config.root.clone())?;
        Self::with_backend(root, Box::new(GpgCommand::new(&config.gpg_program)))
    }

    /// Open the store at `root`, resolving its recipient with `backend`.
    pub fn with_backend(root: PathBuf, backend: Box<dyn OpenPgpBackend>) -> Result<Self> {
        if !root.is_dir() {
            return Err(PassError::StoreNotFound(root));
        }
        let gpg_id = read_gpg_id(&root)?;
        let engine = CryptoEngine::initialize(backend, &gpg_id)?;
        info!(root = %root.display(), "opened password store");
        Ok(Self { root, engine })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn engine(&self) -> &CryptoEngine {
        &self.engine
    }

    /// All services with their entries.
    pub fn list_groups(&self) -> Result<Vec<Group>> {
        layout::discover(&self.root)
    }

    /// The group for `service`, if it exists.
    pub fn find_group(&self, service: &str) -> Result<Option<Group>> {
        Ok(self
            .list_groups()?
            .into_iter()
            .find(|group| group.service == service))
    }

    /// Decrypt an existing entry, filling in its password and, when the file
    /// names one, its username.
    pub fn decrypt(&self, entry: &mut Entry) -> Result<()> {
        let path = entry
            .locator()
            .ok_or(PassError::EntryNotPersisted)?
            .path()
            .to_path_buf();

        let mut plaintext = self.engine.decrypt(&path)?;
        let decoded = parser::decode(&plaintext);
        plaintext.zeroize();
        let mut content = decoded?;

        entry.password = std::mem::take(&mut content.password);
        if let Some(username) = content.username.take().filter(|u| !u.is_empty()) {
            entry.username = username;
        }
        Ok(())
    }

    /// Encrypt `entry` into the store.
    ///
    /// A service directory gets a new or replaced user file; an absent
    /// service becomes a flat file; a flat file holding the same user is
    /// overwritten; a flat file holding another user is migrated into a
    /// directory first. Each completed step is reported to `notifier`.
    ///
    /// The username is only checked as a file name when it becomes one.
    pub fn save(&self, entry: &Entry, notifier: &dyn Notifier) -> Result<SaveOutcome> {
        layout::validate_name(&entry.service)?;
        // The username always lands on its own line in the file content.
        if entry.username.contains(['\n', '\r']) {
            return Err(PassError::InvalidName(entry.username.clone()));
        }

        let location = layout::locate(&self.root, &entry.service, &entry.username);
        let content = Zeroizing::new(parser::encode(entry));

        match location.shape {
            ServiceShape::Directory => {
                layout::validate_name(&entry.username)?;
                self.engine.encrypt(&content, &location.member_path)?;
                report(notifier, "Saved user file", &location.member_path);
                Ok(SaveOutcome::AddedUser(location.member_path))
            }
            ServiceShape::Absent => {
                self.engine.encrypt(&content, &location.flat_path)?;
                report(notifier, "Created service file", &location.flat_path);
                Ok(SaveOutcome::CreatedService(location.flat_path))
            }
            ServiceShape::Flat => {
                let existing = self.flat_username(&entry.service, &location.flat_path)?;
                if existing == entry.username {
                    self.engine.encrypt(&content, &location.flat_path)?;
                    report(notifier, "Modified service file", &location.flat_path);
                    Ok(SaveOutcome::UpdatedService(location.flat_path))
                } else {
                    layout::validate_name(&entry.username)?;
                    self.migrate(&entry.service, &location, &existing, &content, notifier)
                }
            }
        }
    }

    /// Username recorded in a flat service file, defaulting to the service name.
    fn flat_username(&self, service: &str, flat_path: &Path) -> Result<String> {
        let mut existing = Entry::flat(service, flat_path.to_path_buf());
        self.decrypt(&mut existing)?;
        Ok(existing.username.clone())
    }

    /// Turn a flat service into a directory holding the old and new users.
    ///
    /// The old file is moved, never re-encrypted. If writing the new entry
    /// fails afterwards the old one stays at its new place in the directory.
    fn migrate(
        &self,
        service: &str,
        location: &Location,
        existing_username: &str,
        content: &[u8],
        notifier: &dyn Notifier,
    ) -> Result<SaveOutcome> {
        if layout::validate_name(existing_username).is_err() {
            return Err(PassError::AmbiguousEdit(service.to_string()));
        }

        let moved_to = layout::with_entry_extension(&location.dir_path.join(existing_username));

        fs::create_dir(&location.dir_path)
            .map_err(|e| PassError::io("create directory", &location.dir_path, e))?;
        report(notifier, "Created folder", &location.dir_path);

        if let Err(e) = fs::rename(&location.flat_path, &moved_to) {
            // Put the store back in flat form: the directory is still empty.
            if let Err(cleanup) = fs::remove_dir(&location.dir_path) {
                warn!(error = %cleanup, path = %location.dir_path.display(), "could not remove new directory");
            }
            return Err(PassError::io("move", &location.flat_path, e));
        }
        report(notifier, "Moved service file to", &moved_to);

        if let Err(e) = self.engine.encrypt(content, &location.member_path) {
            warn!(kept = %moved_to.display(), "new entry not written; previous entry kept");
            return Err(e);
        }
        report(notifier, "Created user file", &location.member_path);

        Ok(SaveOutcome::Migrated {
            moved_to,
            created: location.member_path.clone(),
        })
    }
}

fn report(notifier: &dyn Notifier, action: &str, path: &Path) {
    info!(path = %path.display(), "{action}");
    notifier.notify(
        APP_NAME,
        &format!("{action}: {}", path.display()),
        NOTIFY_TIMEOUT,
    );
}
