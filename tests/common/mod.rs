// Shared fakes for integration tests: an in-process backend, a scripted
// chooser and recording clipboard and notification sinks.
#![allow(dead_code)]

use passdmenu::gpg::{BackendError, KeyInfo, OpenPgpBackend};
use passdmenu::menu::{Chooser, ChooserConfig};
use passdmenu::notify::{Notification, Notifier};
use passdmenu::security::{Handoff, SecretSink};
use passdmenu::{EntryStore, Result};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;
use tempfile::TempDir;

pub const RECIPIENT: &str = "me@example.com";
const HEADER: &[u8] = b"XOR1";

/// Reversible stand-in for GnuPG.
pub struct XorBackend {
    fail_encrypt: bool,
}

impl XorBackend {
    pub fn new() -> Self {
        Self {
            fail_encrypt: false,
        }
    }

    pub fn failing_encrypt() -> Self {
        Self { fail_encrypt: true }
    }
}

impl OpenPgpBackend for XorBackend {
    fn check_available(&self) -> std::result::Result<(), BackendError> {
        Ok(())
    }

    fn list_keys(&self) -> std::result::Result<Vec<KeyInfo>, BackendError> {
        Ok(vec![KeyInfo {
            fingerprint: "BBBB2222".repeat(5),
            user_ids: vec![format!("Me <{RECIPIENT}>")],
            can_encrypt: true,
        }])
    }

    fn encrypt(
        &self,
        _recipient: &KeyInfo,
        plaintext: &[u8],
    ) -> std::result::Result<Vec<u8>, BackendError> {
        if self.fail_encrypt {
            return Err(BackendError::Failed("encryption refused".to_string()));
        }
        Ok(seal(plaintext))
    }

    fn decrypt(&self, ciphertext: &[u8]) -> std::result::Result<Vec<u8>, BackendError> {
        ciphertext
            .strip_prefix(HEADER)
            .map(|body| body.iter().map(|b| b ^ 0x5a).collect())
            .ok_or_else(|| BackendError::Failed("no valid OpenPGP data found".to_string()))
    }
}

fn seal(plaintext: &[u8]) -> Vec<u8> {
    let mut out = HEADER.to_vec();
    out.extend(plaintext.iter().map(|b| b ^ 0x5a));
    out
}

/// A store directory with a `.gpg-id` naming [`RECIPIENT`].
pub fn new_store_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(".gpg-id"), format!("{RECIPIENT}\n")).unwrap();
    dir
}

pub fn open_store(root: &Path) -> EntryStore {
    EntryStore::with_backend(root.to_path_buf(), Box::new(XorBackend::new())).unwrap()
}

/// Write an encrypted entry file directly, bypassing the store.
pub fn write_entry(path: impl AsRef<Path>, plaintext: &str) {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, seal(plaintext.as_bytes())).unwrap();
}

/// Decrypt an entry file directly, bypassing the store.
pub fn read_entry(path: impl AsRef<Path>) -> String {
    let bytes = fs::read(path.as_ref()).unwrap();
    let plain = XorBackend::new().decrypt(&bytes).unwrap();
    String::from_utf8(plain).unwrap()
}

/// One prompt as the chooser saw it.
#[derive(Debug, Clone)]
pub struct Prompt {
    pub prompt: Option<String>,
    pub options: Vec<String>,
    pub lines: usize,
}

/// Chooser answering from a script; clones share the script and the log.
#[derive(Clone, Default)]
pub struct ScriptedChooser {
    answers: Rc<RefCell<VecDeque<Option<String>>>>,
    seen: Rc<RefCell<Vec<Prompt>>>,
}

impl ScriptedChooser {
    pub fn new(answers: &[Option<&str>]) -> Self {
        let chooser = Self::default();
        chooser
            .answers
            .borrow_mut()
            .extend(answers.iter().map(|a| a.map(str::to_string)));
        chooser
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.seen.borrow().clone()
    }

    pub fn remaining(&self) -> usize {
        self.answers.borrow().len()
    }
}

impl Chooser for ScriptedChooser {
    fn choose(&self, options: &[String], config: &ChooserConfig) -> Result<Option<String>> {
        self.seen.borrow_mut().push(Prompt {
            prompt: config.prompt.clone(),
            options: options.to_vec(),
            lines: config.lines,
        });
        let answer = self
            .answers
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| panic!("chooser asked more than scripted: {options:?}"));
        Ok(answer)
    }
}

/// Sink recording every offered secret.
#[derive(Clone, Default)]
pub struct RecordingSink {
    offered: Rc<RefCell<Vec<String>>>,
    replies: Rc<RefCell<VecDeque<Handoff>>>,
}

impl RecordingSink {
    /// Answer the first offers with `replies`, then with `Delivered`.
    pub fn replying(replies: &[Handoff]) -> Self {
        let sink = Self::default();
        sink.replies.borrow_mut().extend(replies.iter().copied());
        sink
    }

    pub fn offered(&self) -> Vec<String> {
        self.offered.borrow().clone()
    }
}

impl SecretSink for RecordingSink {
    fn offer(&self, text: &str) -> Result<Handoff> {
        self.offered.borrow_mut().push(text.to_string());
        Ok(self
            .replies
            .borrow_mut()
            .pop_front()
            .unwrap_or(Handoff::Delivered))
    }
}

/// Notifier recording titles and bodies and counting dismissals.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    messages: Rc<RefCell<Vec<(String, String)>>>,
    dismissed: Rc<Cell<usize>>,
}

impl RecordingNotifier {
    pub fn titles(&self) -> Vec<String> {
        self.messages.borrow().iter().map(|(t, _)| t.clone()).collect()
    }

    pub fn bodies(&self) -> Vec<String> {
        self.messages.borrow().iter().map(|(_, b)| b.clone()).collect()
    }

    pub fn dismissed(&self) -> usize {
        self.dismissed.get()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, body: &str, _timeout: Duration) -> Notification {
        self.messages
            .borrow_mut()
            .push((title.to_string(), body.to_string()));
        let dismissed = Rc::clone(&self.dismissed);
        Notification::with_dismiss(move || dismissed.set(dismissed.get() + 1))
    }
}
