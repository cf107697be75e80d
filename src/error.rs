//! Error types for passdmenu.

use std::path::PathBuf;
use thiserror::Error;

/// Failure reported by the OpenPGP backend, with the operation and file it
/// was working on.
#[derive(Error, Debug)]
#[error("{op} failed for {}: {reason}", .path.display())]
pub struct CryptoError {
    pub op: &'static str,
    pub path: PathBuf,
    pub reason: String,
}

impl CryptoError {
    pub fn new(op: &'static str, path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            op,
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Main error type for store operations.
#[derive(Error, Debug)]
pub enum PassError {
    #[error("No password store configured: set PASSWORD_STORE_DIR or HOME")]
    NoStoreConfigured,

    #[error("Password store not found: {0}")]
    StoreNotFound(PathBuf),

    #[error("No recipient configured: {0} is missing or empty")]
    MissingGpgId(PathBuf),

    #[error("Encryption backend unavailable: {0}")]
    EngineUnavailable(String),

    #[error("No usable encryption key matches '{0}'")]
    NoSuchKey(String),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Entry file not found: {0}")]
    NotFound(PathBuf),

    #[error("Malformed entry: {0}")]
    MalformedEntry(String),

    #[error("Service '{0}' holds several users; pick one to edit")]
    AmbiguousEdit(String),

    #[error("Invalid service or user name: '{0}'")]
    InvalidName(String),

    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    #[error("Service '{service}' has several users, pick one of: {users}")]
    UserRequired { service: String, users: String },

    #[error("Invalid character set '{0}'")]
    InvalidCharset(String),

    #[error("Entry has not been saved yet")]
    EntryNotPersisted,

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Operation cancelled by user")]
    Cancelled,

    #[error("Chooser failed: {0}")]
    ChooserFailed(String),

    #[error("Clipboard operation failed")]
    ClipboardFailed,

    #[error("Failed to {op} {}: {source}", .path.display())]
    FileOp {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PassError {
    /// Wrap an IO error with the operation and path it happened on.
    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PassError::FileOp {
            op,
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PassError>;
