//! `credvault list` — display stored services in a table.

use chrono::Utc;

use crate::cli::output;
use crate::cli::{open_vault, Cli};
use crate::config::Settings;
use crate::errors::Result;

/// Execute the `list` command.
pub fn execute(cli: &Cli, settings: &Settings, all: bool) -> Result<()> {
    let manager = open_vault(cli, settings)?;

    let entries = manager.entries(all)?;

    output::info(&format!(
        "{} — {} credential(s)",
        manager.path().display(),
        entries.len()
    ));
    output::print_entries_table(&entries, Utc::now());

    Ok(())
}
