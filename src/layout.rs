//! Mapping between the store directory and services/users.
//!
//! A service is either a single `<service>.gpg` file directly under the root
//! (one user, named by the file's content or its stem) or a `<service>/`
//! directory holding one `<username>.gpg` per user.

use crate::error::{PassError, Result};
use crate::models::{Entry, Group};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extension of encrypted entry files.
pub const ENTRY_EXTENSION: &str = "gpg";

/// Version-control directory skipped during discovery.
pub const VCS_DIR: &str = ".git";

/// Default store directory under the user's home.
pub const DEFAULT_STORE_DIR: &str = ".password-store";

/// On-disk shape of a service, read from the filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceShape {
    /// `<root>/<service>/` exists.
    Directory,
    /// `<root>/<service>.gpg` exists.
    Flat,
    /// Neither exists yet.
    Absent,
}

/// Where a (service, username) pair lives or would live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// `<root>/<service>.gpg`
    pub flat_path: PathBuf,
    /// `<root>/<service>`
    pub dir_path: PathBuf,
    /// `<root>/<service>/<username>.gpg`
    pub member_path: PathBuf,
    pub shape: ServiceShape,
}

/// Append the entry extension without touching dots already in the name.
pub fn with_entry_extension(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".");
    os.push(ENTRY_EXTENSION);
    PathBuf::from(os)
}

/// Pick the store root: an explicit directory if configured, else
/// `$HOME/.password-store`.
pub fn resolve_root(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit.filter(|p| !p.as_os_str().is_empty()) {
        return Ok(path);
    }
    dirs::home_dir()
        .map(|home| home.join(DEFAULT_STORE_DIR))
        .ok_or(PassError::NoStoreConfigured)
}

/// Check that a service or user name maps to exactly one path component.
pub fn validate_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name.starts_with('.')
        || name.contains('/')
        || (cfg!(windows) && name.contains('\\'))
        || name.contains('\0')
        || name.contains('\n');
    if invalid {
        return Err(PassError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// List the store as service groups.
///
/// Groups are sorted by service and entries by username so menus are stable
/// across runs.
pub fn discover(root: &Path) -> Result<Vec<Group>> {
    if !root.is_dir() {
        return Err(PassError::StoreNotFound(root.to_path_buf()));
    }

    let mut groups = Vec::new();
    for path in read_dir_sorted(root)? {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            debug!(path = %path.display(), "skipping non UTF-8 name");
            continue;
        };

        if path.is_dir() {
            if name == VCS_DIR {
                continue;
            }
            let entries = discover_members(name, &path)?;
            match Group::new(name, entries) {
                Some(group) => groups.push(group),
                None => debug!(service = name, "skipping empty service directory"),
            }
        } else if let Some(stem) = entry_stem(&path) {
            let entry = Entry::flat(stem, path.clone());
            groups.extend(Group::new(stem, vec![entry]));
        }
    }

    debug!(root = %root.display(), groups = groups.len(), "discovered store");
    Ok(groups)
}

fn discover_members(service: &str, dir: &Path) -> Result<Vec<Entry>> {
    Ok(read_dir_sorted(dir)?
        .into_iter()
        .filter_map(|path| entry_stem(&path).map(|stem| Entry::member(service, stem, path.clone())))
        .collect())
}

/// Stem of a regular `*.gpg` file, `None` for anything else.
fn entry_stem(path: &Path) -> Option<&str> {
    if !path.is_file() || path.extension()? != ENTRY_EXTENSION {
        return None;
    }
    path.file_stem()?.to_str().filter(|s| !s.is_empty())
}

fn read_dir_sorted(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = fs::read_dir(dir)
        .map_err(|e| PassError::io("read directory", dir, e))?
        .map(|item| item.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| PassError::io("read directory", dir, e))?;
    paths.sort();
    Ok(paths)
}

/// Compute the paths for `service`/`username` and which shape the service
/// has now. Only existence checks touch the disk.
pub fn locate(root: &Path, service: &str, username: &str) -> Location {
    let dir_path = root.join(service);
    let flat_path = with_entry_extension(&dir_path);
    let member_path = with_entry_extension(&dir_path.join(username));

    let shape = if dir_path.is_dir() {
        ServiceShape::Directory
    } else if flat_path.exists() {
        ServiceShape::Flat
    } else {
        ServiceShape::Absent
    };

    debug!(service, username, ?shape, "located service");
    Location {
        flat_path,
        dir_path,
        member_path,
        shape,
    }
}
