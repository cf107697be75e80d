//! OpenPGP backend capability and its GnuPG command-line implementation.

use std::ffi::OsString;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::debug;

/// Failure inside an OpenPGP backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend itself cannot be run.
    #[error("{0}")]
    Unavailable(String),
    /// The backend ran but the operation failed.
    #[error("{0}")]
    Failed(String),
}

/// A public key as listed by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyInfo {
    /// Primary key fingerprint, upper-case hex.
    pub fingerprint: String,
    /// User ids in keyring order; the first is the primary one.
    pub user_ids: Vec<String>,
    /// Key is usable for encryption (not revoked, expired or disabled).
    pub can_encrypt: bool,
}

impl KeyInfo {
    /// Email address of the primary user id, if it has one.
    pub fn primary_email(&self) -> Option<&str> {
        self.user_ids.first().and_then(|uid| email_of(uid))
    }

    /// Whether this key answers to `identifier`: the primary email, or a key
    /// id / fingerprint given as hex.
    pub fn matches(&self, identifier: &str) -> bool {
        let identifier = identifier.trim();
        if let Some(email) = self.primary_email() {
            if email.eq_ignore_ascii_case(identifier) {
                return true;
            }
        }

        let hex = identifier
            .strip_prefix("0x")
            .or_else(|| identifier.strip_prefix("0X"))
            .unwrap_or(identifier);
        hex.len() >= 8
            && hex.chars().all(|c| c.is_ascii_hexdigit())
            && self.fingerprint.ends_with(&hex.to_ascii_uppercase())
    }
}

/// Extract `addr` from `Name <addr>`, or accept a bare address.
fn email_of(user_id: &str) -> Option<&str> {
    match (user_id.rfind('<'), user_id.rfind('>')) {
        (Some(start), Some(end)) if start < end => Some(&user_id[start + 1..end]),
        _ if user_id.contains('@') && !user_id.contains(' ') => Some(user_id),
        _ => None,
    }
}

/// What an encryption backend must offer to serve the store.
pub trait OpenPgpBackend {
    /// Fail fast when the backend cannot be used at all.
    fn check_available(&self) -> Result<(), BackendError>;

    /// All public keys in the keyring.
    fn list_keys(&self) -> Result<Vec<KeyInfo>, BackendError>;

    /// Encrypt `plaintext` for `recipient` only, without compression.
    fn encrypt(&self, recipient: &KeyInfo, plaintext: &[u8]) -> Result<Vec<u8>, BackendError>;

    /// Decrypt an OpenPGP message.
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, BackendError>;

    /// Walk every key and return the first usable one matching `identifier`.
    fn resolve_key(&self, identifier: &str) -> Result<Option<KeyInfo>, BackendError> {
        Ok(self
            .list_keys()?
            .into_iter()
            .find(|key| key.can_encrypt && key.matches(identifier)))
    }
}

/// GnuPG driven through its command-line interface.
#[derive(Debug, Clone)]
pub struct GpgCommand {
    program: PathBuf,
}

impl Default for GpgCommand {
    fn default() -> Self {
        Self::new("gpg")
    }
}

impl GpgCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(["--batch", "--quiet", "--yes"]);
        cmd
    }

    /// Run gpg with `args`, feeding `input` on stdin and collecting stdout.
    fn run(&self, args: &[OsString], input: &[u8]) -> Result<Vec<u8>, BackendError> {
        debug!(program = %self.program.display(), ?args, "running gpg");

        let mut child = self
            .command()
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| BackendError::Failed("gpg stdin unavailable".to_string()))?;

        // Feed stdin from a helper thread so a large output cannot stall the pipe.
        let (output, written) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || stdin.write_all(input));
            let output = child.wait_with_output();
            let written = writer
                .join()
                .unwrap_or_else(|_| Err(std::io::Error::other("stdin writer panicked")));
            (output, written)
        });
        let output =
            output.map_err(|e| BackendError::Failed(format!("failed to wait for gpg: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr.trim();
            return Err(BackendError::Failed(if reason.is_empty() {
                format!("gpg exited with {}", output.status)
            } else {
                reason.to_string()
            }));
        }

        // gpg exiting cleanly on partial input must not pass for success.
        written.map_err(|e| BackendError::Failed(format!("failed to write to gpg: {e}")))?;

        Ok(output.stdout)
    }

    fn spawn_error(&self, e: std::io::Error) -> BackendError {
        if e.kind() == ErrorKind::NotFound {
            BackendError::Unavailable(format!(
                "'{}' not found. Please install GnuPG.",
                self.program.display()
            ))
        } else {
            BackendError::Unavailable(format!("failed to run '{}': {e}", self.program.display()))
        }
    }
}

impl OpenPgpBackend for GpgCommand {
    fn check_available(&self) -> Result<(), BackendError> {
        let output = Command::new(&self.program)
            .arg("--version")
            .output()
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(BackendError::Unavailable(format!(
                "'{} --version' failed",
                self.program.display()
            )));
        }
        Ok(())
    }

    fn list_keys(&self) -> Result<Vec<KeyInfo>, BackendError> {
        let args: Vec<OsString> = vec!["--with-colons".into(), "--list-keys".into()];
        let stdout = self.run(&args, &[])?;
        Ok(parse_colon_listing(&String::from_utf8_lossy(&stdout)))
    }

    fn encrypt(&self, recipient: &KeyInfo, plaintext: &[u8]) -> Result<Vec<u8>, BackendError> {
        let args: Vec<OsString> = vec![
            "--no-encrypt-to".into(),
            "--compress-algo".into(),
            "none".into(),
            "--trust-model".into(),
            "always".into(),
            "--recipient".into(),
            recipient.fingerprint.clone().into(),
            "--output".into(),
            "-".into(),
            "--encrypt".into(),
        ];
        self.run(&args, plaintext)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, BackendError> {
        let args: Vec<OsString> = vec!["--output".into(), "-".into(), "--decrypt".into()];
        self.run(&args, ciphertext)
    }
}

/// Parse `gpg --with-colons --list-keys` output.
///
/// A `pub` record opens a key; the first `fpr` after it is the primary
/// fingerprint and `uid` records collect user ids until the next `pub`.
pub fn parse_colon_listing(listing: &str) -> Vec<KeyInfo> {
    let mut keys = Vec::new();
    let mut current: Option<KeyInfo> = None;
    let mut in_subkey = false;

    for line in listing.lines() {
        let fields: Vec<&str> = line.split(':').collect();
        match fields.first().copied() {
            Some("pub") => {
                keys.extend(current.take());
                let validity = fields.get(1).copied().unwrap_or("");
                let capabilities = fields.get(11).copied().unwrap_or("");
                let unusable = matches!(validity, "r" | "e" | "i" | "d")
                    || capabilities.contains('D');
                current = Some(KeyInfo {
                    can_encrypt: capabilities.contains('E') && !unusable,
                    ..KeyInfo::default()
                });
                in_subkey = false;
            }
            Some("sub") => in_subkey = true,
            Some("fpr") if !in_subkey => {
                if let (Some(key), Some(fpr)) = (current.as_mut(), fields.get(9)) {
                    if key.fingerprint.is_empty() {
                        key.fingerprint = fpr.to_ascii_uppercase();
                    }
                }
            }
            Some("uid") => {
                if let (Some(key), Some(uid)) = (current.as_mut(), fields.get(9)) {
                    key.user_ids.push(unescape_colon_field(uid));
                }
            }
            _ => {}
        }
    }
    keys.extend(current);
    keys
}

/// Undo the `\xHH` escaping gpg applies inside colon listings.
fn unescape_colon_field(field: &str) -> String {
    let mut out = Vec::with_capacity(field.len());
    let bytes = field.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() && bytes[i + 1] == b'x' {
            if let Ok(byte) = u8::from_str_radix(&field[i + 2..i + 4], 16) {
                out.push(byte);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
