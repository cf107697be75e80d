//! File-level encryption for the store, on top of an OpenPGP backend.

use crate::error::{CryptoError, PassError, Result};
use crate::gpg::{BackendError, KeyInfo, OpenPgpBackend};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;
use tracing::{debug, info};

/// Encrypts and decrypts entry files for one resolved recipient.
pub struct CryptoEngine {
    backend: Box<dyn OpenPgpBackend>,
    recipient: KeyInfo,
}

impl std::fmt::Debug for CryptoEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoEngine")
            .field("recipient", &self.recipient.fingerprint)
            .finish_non_exhaustive()
    }
}

impl CryptoEngine {
    /// Resolve the recipient key for `identifier` against the backend keyring.
    pub fn initialize(backend: Box<dyn OpenPgpBackend>, identifier: &str) -> Result<Self> {
        backend.check_available().map_err(unavailable)?;

        let recipient = backend
            .resolve_key(identifier)
            .map_err(unavailable)?
            .ok_or_else(|| PassError::NoSuchKey(identifier.to_string()))?;

        info!(fingerprint = %recipient.fingerprint, "resolved recipient key");
        Ok(Self { backend, recipient })
    }

    /// The key every entry is encrypted for.
    pub fn recipient(&self) -> &KeyInfo {
        &self.recipient
    }

    /// Encrypt `plaintext` to `destination`.
    ///
    /// The ciphertext goes to a temporary file in the destination directory
    /// which is then renamed over the target, so readers see either the old
    /// file or the complete new one.
    pub fn encrypt(&self, plaintext: &[u8], destination: &Path) -> Result<()> {
        let ciphertext = self
            .backend
            .encrypt(&self.recipient, plaintext)
            .map_err(|e| crypto_error("encrypt", destination, e))?;

        let dir = destination
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut temp = tempfile::Builder::new()
            .prefix(".passdmenu-")
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(|e| PassError::io("create temporary file in", dir, e))?;

        temp.write_all(&ciphertext)
            .and_then(|_| temp.as_file().sync_all())
            .map_err(|e| PassError::io("write", temp.path(), e))?;

        temp.persist(destination)
            .map_err(|e| PassError::io("replace", destination, e.error))?;

        debug!(path = %destination.display(), bytes = ciphertext.len(), "wrote ciphertext");
        Ok(())
    }

    /// Decrypt the file at `source`.
    pub fn decrypt(&self, source: &Path) -> Result<Vec<u8>> {
        let ciphertext = fs::read(source).map_err(|e| match e.kind() {
            ErrorKind::NotFound => PassError::NotFound(source.to_path_buf()),
            _ => PassError::io("read", source, e),
        })?;

        self.backend
            .decrypt(&ciphertext)
            .map_err(|e| crypto_error("decrypt", source, e))
    }
}

fn unavailable(e: BackendError) -> PassError {
    PassError::EngineUnavailable(e.to_string())
}

fn crypto_error(op: &'static str, path: &Path, e: BackendError) -> PassError {
    match e {
        BackendError::Unavailable(reason) => PassError::EngineUnavailable(reason),
        BackendError::Failed(reason) => CryptoError::new(op, path, reason).into(),
    }
}
