//! Menu-driven operations shared by the launcher and CLI subcommands.

use crate::error::{PassError, Result};
use crate::generator;
use crate::menu::{Chooser, ChooserConfig, Selection, EDIT_FLAG, NEW_FLAG};
use crate::models::{Entry, Group};
use crate::notify::{Notifier, NOTIFY_TIMEOUT};
use crate::security::{Handoff, SecretSink};
use crate::service::{EntryStore, SaveOutcome};
use tracing::{debug, info};
use zeroize::Zeroize;

/// Most lines a menu shows at once.
pub const DEFAULT_MAX_LINES: usize = 20;

/// Wires the store to the chooser, clipboard and notifier for one run.
pub struct Launcher {
    store: EntryStore,
    chooser: Box<dyn Chooser>,
    sink: Box<dyn SecretSink>,
    notifier: Box<dyn Notifier>,
    max_lines: usize,
}

impl Launcher {
    pub fn new(
        store: EntryStore,
        chooser: Box<dyn Chooser>,
        sink: Box<dyn SecretSink>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            chooser,
            sink,
            notifier,
            max_lines: DEFAULT_MAX_LINES,
        }
    }

    pub fn with_max_lines(mut self, max_lines: usize) -> Self {
        self.max_lines = max_lines.max(1);
        self
    }

    pub fn store(&self) -> &EntryStore {
        &self.store
    }

    /// Show the service menu and act on the answer.
    pub fn run(&self) -> Result<()> {
        let groups = self.store.list_groups()?;
        let services: Vec<String> = groups.iter().map(|g| g.service.clone()).collect();

        let Some(selection) = self.ask(&services, self.list_config(services.len()))? else {
            return Ok(());
        };
        if selection.is_empty() {
            return Ok(());
        }

        let group = groups.iter().find(|g| g.service == selection.value);
        match group {
            Some(group) if !selection.has_flags() => match group.single() {
                Some(entry) => self.copy_entry(entry.clone()),
                None => self.run_user_menu(group),
            },
            _ => self.service_command(&selection, group),
        }
    }

    fn run_user_menu(&self, group: &Group) -> Result<()> {
        let users = group.usernames();
        let config = self.list_config(users.len()).with_prompt("User:");
        let Some(selection) = self.ask(&users, config)? else {
            return Ok(());
        };

        let entry = group.find_user(&selection.value);
        if let (Some(entry), false) = (entry, selection.has_flags()) {
            return self.copy_entry(entry.clone());
        }
        if selection.is_empty() {
            return Ok(());
        }
        self.user_command(&group.service, &selection, entry)
    }

    /// `/e` on a service edits its only user; `/n` or an unknown name adds one.
    fn service_command(&self, selection: &Selection, group: Option<&Group>) -> Result<()> {
        debug!(value = %selection.value, flags = %selection.flags, "service command");

        if selection.flags == EDIT_FLAG {
            let group = group.ok_or_else(|| PassError::EntryNotFound(selection.value.clone()))?;
            let entry = group
                .single()
                .ok_or_else(|| PassError::AmbiguousEdit(group.service.clone()))?;
            return self.edit_entry(entry.clone());
        }

        if selection.flags != NEW_FLAG && selection.has_flags() {
            return Err(PassError::UnknownCommand(selection.flags.clone()));
        }

        let service = if selection.value.is_empty() || !selection.has_flags() {
            if !self.ask_yes_no("Want to add service:", "Yes", "No, exit program")? {
                return Ok(());
            }
            let suggested: Vec<String> = Some(selection.value.clone())
                .filter(|v| !v.is_empty())
                .into_iter()
                .collect();
            match self.ask_value("Enter service:", &suggested)? {
                Some(service) => service,
                None => return Ok(()),
            }
        } else if self.ask_yes_no(
            "Want to add user:",
            &format!("Yes, Add to {}", selection.value),
            "No, exit program",
        )? {
            selection.value.clone()
        } else {
            return Ok(());
        };

        let username = self
            .ask_value("Enter Username:", &[])?
            .ok_or(PassError::Cancelled)?;
        let password = self.ask_password("Enter Password:")?;
        self.save(&Entry::new(service, username, password))
    }

    /// No flag on an unknown user adds it to the service; `/e` edits a known one.
    fn user_command(&self, service: &str, selection: &Selection, entry: Option<&Entry>) -> Result<()> {
        debug!(service, value = %selection.value, flags = %selection.flags, "user command");

        if !selection.has_flags() {
            let prompt = format!("Add {} to {}", selection.value, service);
            if !self.ask_yes_no("Do you want to:", &prompt, "Exit")? {
                return Ok(());
            }
            let password = self.ask_password("Enter Password:")?;
            return self.save(&Entry::new(service, selection.value.clone(), password));
        }

        if selection.flags == EDIT_FLAG {
            let entry = entry.ok_or_else(|| {
                PassError::EntryNotFound(format!("{}/{}", service, selection.value))
            })?;
            return self.edit_entry(entry.clone());
        }

        Err(PassError::UnknownCommand(selection.flags.clone()))
    }

    /// Copy the entry for `service` (and `username` when the service has
    /// several users) to the clipboard.
    pub fn copy_by_name(&self, service: &str, username: Option<&str>) -> Result<()> {
        let group = self
            .store
            .find_group(service)?
            .ok_or_else(|| PassError::EntryNotFound(service.to_string()))?;

        let entry = match username {
            Some(user) => group
                .find_user(user)
                .ok_or_else(|| PassError::EntryNotFound(format!("{service}/{user}")))?,
            None => group.single().ok_or_else(|| PassError::UserRequired {
                service: service.to_string(),
                users: group.usernames().join(", "),
            })?,
        };
        self.copy_entry(entry.clone())
    }

    /// Decrypt `entry` and hand over its username, then its password.
    pub fn copy_entry(&self, mut entry: Entry) -> Result<()> {
        self.store.decrypt(&mut entry)?;

        let username_note = self.notifier.notify(
            "Copied username",
            &format!("Copied username for {}", entry.service),
            NOTIFY_TIMEOUT,
        );
        if self.sink.offer(&entry.username)? == Handoff::Preempted {
            info!(service = %entry.service, "username handoff pre-empted");
            return Ok(());
        }
        username_note.dismiss();

        self.notifier.notify(
            "Copied password",
            &format!("Copied password for {}", entry.service),
            NOTIFY_TIMEOUT,
        );
        self.sink.offer(&entry.password)?;
        Ok(())
    }

    fn edit_entry(&self, mut entry: Entry) -> Result<()> {
        self.store.decrypt(&mut entry)?;
        entry.password.zeroize();
        entry.password = self.ask_password("New Password:")?;
        self.save(&entry)
    }

    fn save(&self, entry: &Entry) -> Result<()> {
        let outcome = self.store.save(entry, self.notifier.as_ref())?;
        info!(?outcome, "saved entry");
        if let SaveOutcome::Migrated { moved_to, .. } = &outcome {
            debug!(moved_to = %moved_to.display(), "service migrated to directory");
        }
        Ok(())
    }

    fn list_config(&self, count: usize) -> ChooserConfig {
        ChooserConfig::default().with_lines(count.min(self.max_lines))
    }

    fn ask(&self, options: &[String], config: ChooserConfig) -> Result<Option<Selection>> {
        Ok(self
            .chooser
            .choose(options, &config)?
            .map(|raw| Selection::parse(&raw)))
    }

    fn ask_yes_no(&self, prompt: &str, yes: &str, no: &str) -> Result<bool> {
        let options = vec![yes.to_string(), no.to_string()];
        let config = ChooserConfig::default().with_lines(2).with_prompt(prompt);
        Ok(self.chooser.choose(&options, &config)?.as_deref() == Some(yes))
    }

    fn ask_value(&self, prompt: &str, suggestions: &[String]) -> Result<Option<String>> {
        let config = ChooserConfig::default().with_lines(2).with_prompt(prompt);
        Ok(self
            .chooser
            .choose(suggestions, &config)?
            .filter(|v| !v.is_empty()))
    }

    fn ask_password(&self, prompt: &str) -> Result<String> {
        let suggestions = generator::suggestions();
        self.ask_value(prompt, &suggestions)?
            .ok_or(PassError::Cancelled)
    }
}
