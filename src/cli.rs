//! Command-line interface implementation.

use crate::error::{PassError, Result};
use crate::generator::{Charset, DEFAULT_CHARSETS, SUGGESTION_LENGTH};
use crate::layout;
use crate::menu::{Chooser, Dmenu, TerminalChooser};
use crate::models::{Entry, Group};
use crate::notify::{DesktopNotifier, LogNotifier, Notifier};
use crate::operations::{Launcher, DEFAULT_MAX_LINES};
use crate::security::ClipboardSink;
use crate::service::{EntryStore, SaveOutcome, StoreConfig};
use crate::utils::{self, success};
use clap::{Parser, Subcommand};
use colored::*;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::time::Duration;
use zeroize::Zeroize;

/// dmenu front end for pass-compatible password stores.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Password store directory
    #[arg(
        short = 's',
        long,
        global = true,
        env = "PASSWORD_STORE_DIR",
        help = "Password store directory (default: ~/.password-store)"
    )]
    pub store_dir: Option<PathBuf>,

    /// GnuPG executable
    #[arg(long, global = true, env = "PASSDMENU_GPG", default_value = "gpg")]
    pub gpg: PathBuf,

    /// dmenu executable
    #[arg(long, global = true, env = "PASSDMENU_DMENU", default_value = "dmenu")]
    pub dmenu: PathBuf,

    /// Chooser to prompt with (default: dmenu under X or Wayland, terminal otherwise)
    #[arg(short = 'c', long, global = true, value_enum)]
    pub chooser: Option<ChooserKind>,

    /// Most menu lines shown at once
    #[arg(short = 'l', long, global = true, default_value_t = DEFAULT_MAX_LINES)]
    pub lines: usize,

    /// Seconds each copied value is held on the clipboard before it is
    /// cleared. Pastes are not detected, so the full window always applies
    /// unless something else is copied first.
    #[arg(short = 't', long, global = true, default_value = "15")]
    pub hold: u64,

    /// Log instead of showing desktop notifications
    #[arg(long, global = true)]
    pub no_notify: bool,

    /// Output format
    #[arg(
        short = 'o',
        long,
        global = true,
        value_enum,
        default_value = "text",
        help = "Output format"
    )]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ChooserKind {
    Dmenu,
    Terminal,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Pick a service from the menu (the default)
    Menu,

    /// List services and their users
    List,

    /// Copy a username and password to the clipboard
    Copy {
        /// Service name
        service: String,

        /// User name, required when the service has several users
        user: Option<String>,
    },

    /// Add or replace an entry
    Insert {
        /// Service name
        service: String,

        /// User name
        user: String,

        /// Read the password from the first line of stdin
        #[arg(short = 'i', long)]
        stdin: bool,

        /// Generate a password and print it
        #[arg(short, long, conflicts_with = "stdin")]
        generate: bool,
    },

    /// Print a random password
    Generate {
        /// Characters to draw from, as singles and ranges like 0-9a-z
        #[arg(long, default_value = DEFAULT_CHARSETS[0])]
        charset: String,

        /// Password length
        #[arg(short = 'n', long, default_value_t = SUGGESTION_LENGTH)]
        length: usize,
    },
}

impl Cli {
    /// Execute the CLI command.
    pub fn execute(&self) -> Result<()> {
        match &self.command {
            None | Some(Commands::Menu) => self.launcher()?.run(),
            Some(Commands::List) => self.list_entries(),
            Some(Commands::Copy { service, user }) => {
                self.launcher()?.copy_by_name(service, user.as_deref())
            }
            Some(Commands::Insert {
                service,
                user,
                stdin,
                generate,
            }) => self.insert_entry(service, user, *stdin, *generate),
            Some(Commands::Generate { charset, length }) => {
                let charset = Charset::parse(charset)?;
                let mut password = charset.generate(&mut rand::thread_rng(), *length);
                println!("{password}");
                password.zeroize();
                Ok(())
            }
        }
    }

    fn store_config(&self) -> StoreConfig {
        StoreConfig {
            root: self.store_dir.clone(),
            gpg_program: self.gpg.clone(),
        }
    }

    fn notifier(&self) -> Box<dyn Notifier> {
        if self.no_notify {
            Box::new(LogNotifier)
        } else {
            Box::new(DesktopNotifier::default())
        }
    }

    fn chooser(&self) -> Box<dyn Chooser> {
        let kind = self.chooser.unwrap_or_else(|| {
            if utils::has_display() || !utils::is_interactive() {
                ChooserKind::Dmenu
            } else {
                ChooserKind::Terminal
            }
        });
        match kind {
            ChooserKind::Dmenu => Box::new(Dmenu::new(&self.dmenu)),
            ChooserKind::Terminal => Box::new(TerminalChooser),
        }
    }

    fn launcher(&self) -> Result<Launcher> {
        let store = EntryStore::open(&self.store_config())?;
        let sink = ClipboardSink::new(Duration::from_secs(self.hold));
        Ok(
            Launcher::new(store, self.chooser(), Box::new(sink), self.notifier())
                .with_max_lines(self.lines),
        )
    }

    /// List services without touching GnuPG.
    fn list_entries(&self) -> Result<()> {
        let root = layout::resolve_root(self.store_dir.clone())?;
        let groups = layout::discover(&root)?;

        match self.output {
            OutputFormat::Text => {
                if groups.is_empty() {
                    println!("No entries found");
                    return Ok(());
                }
                for group in &groups {
                    println!("{}", group.service.bold());
                    for entry in members(group) {
                        println!("  {}", entry.username);
                    }
                }
            }
            OutputFormat::Json => {
                let json = serde_json::json!({ "services": groups });
                println!("{}", serde_json::to_string_pretty(&json)?);
            }
        }
        Ok(())
    }

    /// Add or replace an entry.
    fn insert_entry(&self, service: &str, user: &str, stdin: bool, generate: bool) -> Result<()> {
        layout::validate_name(service)?;

        let store = EntryStore::open(&self.store_config())?;

        let password = if generate {
            let charset = Charset::parse(DEFAULT_CHARSETS[0])?;
            charset.generate(&mut rand::thread_rng(), SUGGESTION_LENGTH)
        } else if stdin {
            read_password_line()?
        } else {
            prompt_password_with_confirmation(&format!("Password for {service}/{user}"))?
        };

        let entry = Entry::new(service, user, password);
        let outcome = store.save(&entry, self.notifier().as_ref())?;

        match outcome {
            SaveOutcome::CreatedService(path) => {
                success(&format!("Created {}", path.display()))
            }
            SaveOutcome::UpdatedService(path) | SaveOutcome::AddedUser(path) => {
                success(&format!("Saved {}", path.display()))
            }
            SaveOutcome::Migrated { moved_to, created } => success(&format!(
                "Moved existing entry to {} and created {}",
                moved_to.display(),
                created.display()
            )),
        }

        if generate {
            println!("{}", entry.password);
        }
        Ok(())
    }
}

/// Entries worth listing under a service: a flat file's user is only shown
/// when it differs from the service name.
fn members(group: &Group) -> impl Iterator<Item = &Entry> {
    group
        .entries
        .iter()
        .filter(move |entry| group.entries.len() > 1 || entry.username != group.service)
}

fn read_password_line() -> Result<String> {
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    line.zeroize();
    if password.is_empty() {
        return Err(PassError::Cancelled);
    }
    Ok(password)
}

fn prompt_password_with_confirmation(prompt: &str) -> Result<String> {
    use dialoguer::Password;

    let password = Password::new()
        .with_prompt(prompt)
        .with_confirmation("Confirm password", "Passwords do not match")
        .interact()
        .map_err(|e| PassError::ChooserFailed(e.to_string()))?;

    if password.is_empty() {
        return Err(PassError::Cancelled);
    }
    Ok(password)
}
