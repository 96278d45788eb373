//! `credvault purge` — drop every expired entry.

use crate::cli::output;
use crate::cli::{open_vault, Cli};
use crate::config::Settings;
use crate::errors::Result;

/// Execute the `purge` command.
pub fn execute(cli: &Cli, settings: &Settings) -> Result<()> {
    let manager = open_vault(cli, settings)?;

    match manager.purge_expired()? {
        0 => output::info("No expired credentials."),
        n => output::success(&format!("Purged {n} expired credential(s)")),
    }

    Ok(())
}
