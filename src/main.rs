//! Main entry point for passdmenu.

use clap::Parser;
use passdmenu::cli::Cli;
use passdmenu::utils::{error_exit, warning};
use passdmenu::PassError;
use tracing_subscriber::EnvFilter;

fn main() {
    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    // RUST_LOG=passdmenu=debug for verbose output; secrets are never logged.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("passdmenu=warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.execute() {
        Ok(()) => {}
        Err(PassError::Cancelled) => {
            warning("Cancelled");
            std::process::exit(1);
        }
        Err(e) => error_exit(&e.to_string(), 1),
    }
}
