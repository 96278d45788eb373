//! `credvault update` — change fields of an existing entry.

use crate::cli::output;
use crate::cli::{build_entry_data, open_vault, Cli};
use crate::config::Settings;
use crate::errors::{Result, VaultError};
use crate::vault::Lookup;

/// Execute the `update` command.
pub fn execute(
    cli: &Cli,
    settings: &Settings,
    service: &str,
    fields: &[String],
    secrets: &[String],
    ttl: Option<i64>,
    no_expiry: bool,
) -> Result<()> {
    let ttl = match (ttl, no_expiry) {
        (Some(secs), _) => Some(Some(secs)),
        (None, true) => Some(None),
        (None, false) => None,
    };

    if fields.is_empty() && secrets.is_empty() && ttl.is_none() {
        return Err(VaultError::CommandFailed(
            "nothing to update — pass --field, --secret, --ttl or --no-expiry".into(),
        ));
    }

    let manager = open_vault(cli, settings)?;
    let updates = build_entry_data(fields, secrets, ttl)?;

    match manager.update(service, &updates)? {
        Lookup::Found(entry) => {
            output::success(&format!("Updated '{}'", entry.service));
        }
        Lookup::Expired { .. } => {
            output::warning(&format!("Credential for '{service}' has expired; nothing updated."));
        }
        Lookup::NotFound => {
            output::warning(&format!("No credential stored for '{service}'."));
        }
    }

    Ok(())
}
