//! passdmenu: a dmenu front end for pass-compatible GPG password stores.

pub mod cli;
pub mod crypto;
pub mod error;
pub mod generator;
pub mod gpg;
pub mod layout;
pub mod menu;
pub mod models;
pub mod notify;
pub mod operations;
pub mod parser;
pub mod security;
pub mod service;
pub mod utils;

// Re-export commonly used types
pub use error::{PassError, Result};
pub use models::{Entry, Group};
pub use operations::Launcher;
pub use service::{EntryStore, SaveOutcome, StoreConfig};
