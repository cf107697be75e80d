//! Choosers: pick one of several strings, or type a new one.

use crate::error::{PassError, Result};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{FuzzySelect, Input};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::debug;

/// Where the menu appears on screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Position {
    Top,
    Bottom,
    #[default]
    Center,
}

/// Presentation options for a single prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChooserConfig {
    pub position: Position,
    pub case_insensitive: bool,
    /// Number of visible lines; `0` leaves the chooser's default.
    pub lines: usize,
    pub prompt: Option<String>,
}

impl ChooserConfig {
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn with_lines(mut self, lines: usize) -> Self {
        self.lines = lines;
        self
    }
}

/// Interactive picker.
pub trait Chooser {
    /// Show `options` and return what the user picked or typed. `None` or an
    /// empty string means the user backed out.
    fn choose(&self, options: &[String], config: &ChooserConfig) -> Result<Option<String>>;
}

/// A chooser answer split into the matched value and a trailing command.
///
/// `Bank/e` is the value `Bank` with the flag `/e`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub value: String,
    pub flags: String,
}

/// Flag asking to edit the selected entry.
pub const EDIT_FLAG: &str = "/e";

/// Flag asking to add a new entry.
pub const NEW_FLAG: &str = "/n";

impl Selection {
    pub fn parse(raw: &str) -> Self {
        match raw.find('/') {
            Some(idx) => Self {
                value: raw[..idx].to_string(),
                flags: raw[idx..].to_string(),
            },
            None => Self {
                value: raw.to_string(),
                flags: String::new(),
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty() && self.flags.is_empty()
    }

    pub fn has_flags(&self) -> bool {
        !self.flags.is_empty()
    }
}

/// The `dmenu` program.
#[derive(Debug, Clone)]
pub struct Dmenu {
    program: PathBuf,
}

impl Default for Dmenu {
    fn default() -> Self {
        Self {
            program: PathBuf::from("dmenu"),
        }
    }
}

impl Dmenu {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Command-line flags for `config`.
    pub fn args(config: &ChooserConfig) -> Vec<String> {
        let mut args = Vec::new();
        match config.position {
            Position::Top => {}
            Position::Bottom => args.push("-b".to_string()),
            Position::Center => args.push("-c".to_string()),
        }
        if config.case_insensitive {
            args.push("-i".to_string());
        }
        if config.lines > 0 {
            args.push("-l".to_string());
            args.push(config.lines.to_string());
        }
        if let Some(prompt) = config.prompt.as_deref().filter(|p| !p.is_empty()) {
            args.push("-p".to_string());
            args.push(prompt.to_string());
        }
        args
    }
}

impl Chooser for Dmenu {
    fn choose(&self, options: &[String], config: &ChooserConfig) -> Result<Option<String>> {
        let args = Self::args(config);
        debug!(program = %self.program.display(), ?args, options = options.len(), "running dmenu");

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                PassError::ChooserFailed(format!("failed to run '{}': {e}", self.program.display()))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            let mut input = options.join("\n");
            if !input.is_empty() {
                input.push('\n');
            }
            stdin
                .write_all(input.as_bytes())
                .map_err(|e| PassError::ChooserFailed(format!("failed to write options: {e}")))?;
        }

        // dmenu exits non-zero when the user escapes; that is a cancel, not a failure.
        let output = child
            .wait_with_output()
            .map_err(|e| PassError::ChooserFailed(format!("failed to wait for dmenu: {e}")))?;

        let answer = String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or("")
            .to_string();
        Ok(Some(answer).filter(|a| !a.is_empty()))
    }
}

/// Terminal chooser built on dialoguer, for use outside X sessions.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalChooser;

/// Extra list item that switches to free-text input.
const TYPE_OWN: &str = "[type a value]";

impl TerminalChooser {
    fn prompt(config: &ChooserConfig) -> String {
        config.prompt.clone().unwrap_or_else(|| "Select".to_string())
    }

    fn input(prompt: &str) -> Result<Option<String>> {
        let value: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()
            .map_err(|e| PassError::ChooserFailed(e.to_string()))?;
        Ok(Some(value).filter(|v| !v.is_empty()))
    }
}

impl Chooser for TerminalChooser {
    fn choose(&self, options: &[String], config: &ChooserConfig) -> Result<Option<String>> {
        let prompt = Self::prompt(config);
        if options.is_empty() {
            return Self::input(&prompt);
        }

        let mut items: Vec<&str> = options.iter().map(String::as_str).collect();
        items.push(TYPE_OWN);

        let theme = ColorfulTheme::default();
        let mut select = FuzzySelect::with_theme(&theme)
            .with_prompt(&prompt)
            .items(&items)
            .default(0);
        if config.lines > 0 {
            select = select.max_length(config.lines + 1);
        }

        let picked = select
            .interact_opt()
            .map_err(|e| PassError::ChooserFailed(e.to_string()))?;

        match picked {
            Some(idx) if idx < options.len() => Ok(Some(options[idx].clone())),
            Some(_) => Self::input(&prompt),
            None => Ok(None),
        }
    }
}
