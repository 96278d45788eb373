//! `credvault delete` — remove every entry for a service.

use dialoguer::Confirm;

use crate::cli::output;
use crate::cli::{open_vault, Cli};
use crate::config::Settings;
use crate::errors::{Result, VaultError};

/// Execute the `delete` command.
pub fn execute(cli: &Cli, settings: &Settings, service: &str, force: bool) -> Result<()> {
    // Unless --force is set, ask for confirmation before deleting.
    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete all credentials for '{service}'?"))
            .default(false)
            .interact()
            .map_err(|e| VaultError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    let manager = open_vault(cli, settings)?;

    if manager.delete(service)? {
        output::success(&format!("Deleted '{service}'"));
    } else {
        output::info(&format!("No credential stored for '{service}'."));
    }

    Ok(())
}
