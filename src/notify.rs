//! Desktop notifications.
//!
//! Notifications are fire-and-forget: a failure to show or dismiss one is
//! logged and otherwise ignored.

use std::process::Command;
use std::time::Duration;
use tracing::{info, warn};

/// Application name shown by the notification daemon.
pub const APP_NAME: &str = "passdmenu";

/// How long store notifications stay up.
pub const NOTIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// A shown notification that can be taken down early.
pub struct Notification {
    dismiss: Option<Box<dyn FnOnce()>>,
}

impl std::fmt::Debug for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notification")
            .field("dismissable", &self.dismiss.is_some())
            .finish()
    }
}

impl Notification {
    /// A notification nothing can take down.
    pub fn detached() -> Self {
        Self { dismiss: None }
    }

    /// A notification closed by running `dismiss`.
    pub fn with_dismiss(dismiss: impl FnOnce() + 'static) -> Self {
        Self {
            dismiss: Some(Box::new(dismiss)),
        }
    }

    /// Close the notification if it is still showing.
    pub fn dismiss(mut self) {
        if let Some(dismiss) = self.dismiss.take() {
            dismiss();
        }
    }
}

/// Something that can show a short message to the user.
pub trait Notifier {
    fn notify(&self, title: &str, body: &str, timeout: Duration) -> Notification;
}

/// Notifier that only writes to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, body: &str, _timeout: Duration) -> Notification {
        info!(title, body, "notification");
        Notification::detached()
    }
}

/// Notifier backed by `notify-send`; dismissal goes through the
/// `org.freedesktop.Notifications` bus service via `gdbus`.
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    app_name: String,
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new(APP_NAME)
    }
}

impl DesktopNotifier {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, body: &str, timeout: Duration) -> Notification {
        info!(title, body, "notification");

        let output = Command::new("notify-send")
            .arg("--app-name")
            .arg(&self.app_name)
            .arg("--expire-time")
            .arg(timeout.as_millis().to_string())
            .arg("--print-id")
            .arg(title)
            .arg(body)
            .output();

        match output {
            Ok(output) if output.status.success() => {
                match String::from_utf8_lossy(&output.stdout).trim().parse::<u32>() {
                    Ok(id) => Notification::with_dismiss(move || close_notification(id)),
                    Err(_) => Notification::detached(),
                }
            }
            Ok(output) => {
                warn!(status = %output.status, "notify-send failed");
                Notification::detached()
            }
            Err(e) => {
                warn!(error = %e, "could not run notify-send");
                Notification::detached()
            }
        }
    }
}

fn close_notification(id: u32) {
    let result = Command::new("gdbus")
        .args([
            "call",
            "--session",
            "--dest",
            "org.freedesktop.Notifications",
            "--object-path",
            "/org/freedesktop/Notifications",
            "--method",
            "org.freedesktop.Notifications.CloseNotification",
        ])
        .arg(id.to_string())
        .output();

    if let Err(e) = result {
        warn!(error = %e, id, "could not close notification");
    }
}
