//! Plaintext entry format.
//!
//! The first line of a decrypted entry is the password. Later lines are free
//! form; the first one that reads `username:` or `login:` (any case, leading
//! whitespace allowed) names the user. Everything else is ignored.

use crate::error::{PassError, Result};
use crate::models::Entry;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Keys recognised as naming the user, lower case.
const USERNAME_KEYS: &[&str] = &["username:", "login:"];

/// Fields decoded from an entry's plaintext. Wiped when dropped.
#[derive(Debug, Default, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct EntryContent {
    pub password: String,
    pub username: Option<String>,
}

/// Serialize an entry as `password\nusername:<username>\n`.
pub fn encode(entry: &Entry) -> Vec<u8> {
    format!("{}\nusername:{}\n", entry.password, entry.username).into_bytes()
}

/// Parse decrypted entry content.
pub fn decode(bytes: &[u8]) -> Result<EntryContent> {
    if bytes.is_empty() {
        return Err(PassError::MalformedEntry("entry is empty".to_string()));
    }

    let text = std::str::from_utf8(bytes)
        .map_err(|_| PassError::MalformedEntry("entry is not valid UTF-8".to_string()))?;

    let mut lines = text.split('\n');
    let password = lines
        .next()
        .map(strip_cr)
        .ok_or_else(|| PassError::MalformedEntry("missing password line".to_string()))?;

    let username = lines.map(strip_cr).find_map(username_value);

    Ok(EntryContent {
        password: password.to_string(),
        username,
    })
}

fn strip_cr(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}

fn username_value(line: &str) -> Option<String> {
    let trimmed = line.trim_start();
    let lowered = trimmed.to_lowercase();
    if !USERNAME_KEYS.iter().any(|key| lowered.starts_with(key)) {
        return None;
    }
    // Keys are ASCII, so the colon sits at the same offset in `trimmed`.
    let colon = trimmed.find(':')?;
    Some(trimmed[colon + 1..].trim_start().to_string())
}
