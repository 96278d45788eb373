//! `credvault dump` — print every entry, values included.
//!
//! Debugging aid; expired entries are shown too and nothing is purged.

use chrono::Utc;

use crate::cli::output;
use crate::cli::{open_vault, Cli};
use crate::config::Settings;
use crate::errors::Result;

/// Execute the `dump` command.
pub fn execute(cli: &Cli, settings: &Settings) -> Result<()> {
    let manager = open_vault(cli, settings)?;
    let entries = manager.entries(true)?;

    output::info(&format!("Vault file: {}", manager.path().display()));
    output::warning("Field values are printed in clear text.");

    if entries.is_empty() {
        output::info("Vault is empty.");
        return Ok(());
    }

    let now = Utc::now();
    for entry in &entries {
        println!();
        println!("#{} {}", entry.id, entry.service);
        output::print_entry(entry, true, now);
    }

    Ok(())
}
