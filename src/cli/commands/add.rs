//! `credvault add` — store a new credential entry.

use crate::cli::output;
use crate::cli::{build_entry_data, open_vault, Cli};
use crate::config::Settings;
use crate::errors::Result;
use crate::vault::entry::SERVICE;

/// Execute the `add` command.
pub fn execute(
    cli: &Cli,
    settings: &Settings,
    service: &str,
    fields: &[String],
    secrets: &[String],
    ttl: Option<i64>,
) -> Result<()> {
    let manager = open_vault(cli, settings)?;

    let mut data = build_entry_data(fields, secrets, ttl.map(Some))?;
    data.insert(SERVICE.to_string(), service.into());

    let entry = manager.add(&data)?;

    match &entry.expires_at {
        Some(at) => output::success(&format!(
            "Added '{}' (id {}), expires {at}",
            entry.service, entry.id
        )),
        None => output::success(&format!("Added '{}' (id {})", entry.service, entry.id)),
    }

    Ok(())
}
