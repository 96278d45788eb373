//! `credvault fields` — print the field names of an entry.

use crate::cli::output;
use crate::cli::{open_vault, Cli};
use crate::config::Settings;
use crate::errors::Result;
use crate::vault::Lookup;

/// Execute the `fields` command.
pub fn execute(cli: &Cli, settings: &Settings, service: &str) -> Result<()> {
    let manager = open_vault(cli, settings)?;

    match manager.get_fields(service)? {
        Lookup::Found(names) => {
            for name in names {
                println!("{name}");
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
