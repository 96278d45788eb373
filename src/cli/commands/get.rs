//! `credvault get` — show a single entry.

use chrono::Utc;

use crate::cli::output;
use crate::cli::{open_vault, Cli};
use crate::config::Settings;
use crate::errors::Result;
use crate::vault::Lookup;

/// Execute the `get` command.
///
/// An expired entry is removed from the vault as a side effect.
pub fn execute(cli: &Cli, settings: &Settings, service: &str, reveal: bool) -> Result<()> {
    let manager = open_vault(cli, settings)?;

    match manager.get(service)? {
        Lookup::Found(entry) => {
            output::print_entry(&entry, reveal, Utc::now());
            if !reveal {
                output::tip("Pass --reveal to print field values.");
            }
        }
        Lookup::Expired { .. } => {
            output::warning(&format!("Credential for '{service}' has expired and was removed."));
        }
        Lookup::NotFound => {
            output::warning(&format!("No credential stored for '{service}'."));
        }
    }

    Ok(())
}
