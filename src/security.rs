//! Handing secrets to the user through the clipboard.

use crate::error::{PassError, Result};
use copypasta::{ClipboardContext, ClipboardProvider};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use zeroize::Zeroize;

/// How an offered secret left our hands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handoff {
    /// The consumer had its chance to read it.
    Delivered,
    /// Someone else took over the clipboard first.
    Preempted,
}

/// Destination for a secret that is read once.
pub trait SecretSink {
    /// Offer `text` and block until it is consumed or pre-empted.
    fn offer(&self, text: &str) -> Result<Handoff>;
}

/// Clipboard-backed sink.
///
/// The text stays on the clipboard for the hold window and is cleared
/// afterwards. If another program replaces the clipboard content during the
/// window, the offer ends early as [`Handoff::Preempted`].
#[derive(Debug, Clone)]
pub struct ClipboardSink {
    hold: Duration,
    poll: Duration,
}

impl ClipboardSink {
    pub fn new(hold: Duration) -> Self {
        Self {
            hold,
            poll: Duration::from_millis(200),
        }
    }
}

impl SecretSink for ClipboardSink {
    fn offer(&self, text: &str) -> Result<Handoff> {
        let mut ctx = ClipboardContext::new().map_err(|_| PassError::ClipboardFailed)?;
        ctx.set_contents(text.to_string())
            .map_err(|_| PassError::ClipboardFailed)?;
        debug!(hold_secs = self.hold.as_secs(), "secret placed on clipboard");

        let deadline = Instant::now() + self.hold;
        while Instant::now() < deadline {
            std::thread::sleep(self.poll);
            match ctx.get_contents() {
                Ok(mut current) => {
                    let replaced = current != text;
                    current.zeroize();
                    if replaced {
                        debug!("clipboard taken over by another owner");
                        return Ok(Handoff::Preempted);
                    }
                }
                Err(e) => warn!(error = %e, "could not read clipboard"),
            }
        }

        if let Ok(mut current) = ctx.get_contents() {
            if current == text {
                if let Err(e) = ctx.set_contents(String::new()) {
                    warn!(error = %e, "could not clear clipboard");
                }
            }
            current.zeroize();
        }
        Ok(Handoff::Delivered)
    }
}
