//! `credvault init` — create a new, empty vault.

use crate::cli::output;
use crate::cli::{prompt_new_password, vault_path, Cli};
use crate::config::Settings;
use crate::errors::{Result, VaultError};
use crate::vault::VaultManager;

/// Execute the `init` command.
pub fn execute(cli: &Cli, settings: &Settings) -> Result<()> {
    let path = vault_path(cli, settings)?;

    if path.exists() {
        output::tip("Use `credvault add` to store credentials in the existing vault.");
        return Err(VaultError::VaultAlreadyExists(path));
    }

    let password = prompt_new_password(settings)?;

    let manager = VaultManager::with_password_env(&path, settings.password_env.clone());
    manager.initialize(Some(password.as_str()))?;

    output::success(&format!("Vault created at {}", path.display()));
    output::tip("Run `credvault add <SERVICE> -f key=value` to add a credential.");
    output::tip("Run `credvault list` to see stored services.");

    Ok(())
}
