//! CLI module — Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::Parser;
use serde_json::Value;
use zeroize::Zeroizing;

use crate::config::{Settings, VAULT_FILE_ENV};
use crate::errors::{Result, VaultError};
use crate::vault::entry::TTL_SECONDS;
use crate::vault::{EntryData, VaultManager};

/// Minimum length for a newly chosen master password.
const MIN_PASSWORD_LEN: usize = 8;

/// credvault CLI: inspect and maintain an encrypted credential vault.
#[derive(Parser)]
#[command(
    name = "credvault",
    about = "Encrypted credential vault with per-entry expiry",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Vault file (default: per-user application data directory)
    #[arg(long, env = VAULT_FILE_ENV, global = true)]
    pub vault_file: Option<PathBuf>,

    /// Config file (default: <data dir>/credvault/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Create a new, empty vault
    Init,

    /// Add a credential entry
    Add {
        /// Service name (e.g. GitHub)
        service: String,
        /// Plain field as key=value (repeatable)
        #[arg(short, long = "field", value_name = "KEY=VALUE")]
        fields: Vec<String>,
        /// Secret field; the value is prompted for without echo (repeatable)
        #[arg(short, long = "secret", value_name = "KEY")]
        secrets: Vec<String>,
        /// Lifetime in seconds (default: never expires)
        #[arg(long, allow_negative_numbers = true)]
        ttl: Option<i64>,
    },

    /// Show an entry
    Get {
        /// Service name (case-insensitive)
        service: String,
        /// Print field values instead of masking them
        #[arg(long)]
        reveal: bool,
    },

    /// List the field names of an entry (never values)
    Fields {
        /// Service name (case-insensitive)
        service: String,
    },

    /// Update fields of an existing entry
    Update {
        /// Service name (case-insensitive)
        service: String,
        /// Plain field as key=value (repeatable)
        #[arg(short, long = "field", value_name = "KEY=VALUE")]
        fields: Vec<String>,
        /// Secret field; the value is prompted for without echo (repeatable)
        #[arg(short, long = "secret", value_name = "KEY")]
        secrets: Vec<String>,
        /// New lifetime in seconds, counted from now
        #[arg(long, allow_negative_numbers = true, conflicts_with = "no_expiry")]
        ttl: Option<i64>,
        /// Remove the expiry so the entry never expires
        #[arg(long)]
        no_expiry: bool,
    },

    /// List stored services
    List {
        /// Include expired entries
        #[arg(short, long)]
        all: bool,
    },

    /// Delete every entry for a service
    Delete {
        /// Service name (case-insensitive)
        service: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Remove all expired entries
    Purge,

    /// Print every entry with its values
    Dump,
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Load settings from `--config`, or the default location.
///
/// A missing file yields defaults; so does an environment with no
/// resolvable data directory.
pub fn load_settings(cli: &Cli) -> Result<Settings> {
    match &cli.config {
        Some(path) => Settings::load(path),
        None => match crate::config::default_config_path() {
            Ok(path) => Settings::load(&path),
            Err(_) => Ok(Settings::default()),
        },
    }
}

/// Resolve the vault file: `--vault-file` / `VAULT_FILE`, then settings.
pub fn vault_path(cli: &Cli, settings: &Settings) -> Result<PathBuf> {
    match &cli.vault_file {
        Some(path) => settings.resolve_vault_path(Some(&*path.to_string_lossy())),
        None => settings.resolve_vault_path(None),
    }
}

/// Open and unlock an existing vault.
pub fn open_vault(cli: &Cli, settings: &Settings) -> Result<VaultManager> {
    let path = vault_path(cli, settings)?;
    if !path.exists() {
        return Err(VaultError::VaultNotFound(path));
    }

    let manager = VaultManager::with_password_env(path, settings.password_env.clone());
    let password = prompt_password(settings)?;
    manager.initialize(Some(password.as_str()))?;
    Ok(manager)
}

/// Get the master password, trying in order:
/// 1. The configured environment variable (default `VAULT_MASTER_PASSWORD`)
/// 2. An interactive hidden prompt, if stdin is a terminal
///
/// Returns `Zeroizing<String>` so the password is wiped from memory on drop.
pub fn prompt_password(settings: &Settings) -> Result<Zeroizing<String>> {
    if let Some(pw) = settings.master_password() {
        return Ok(pw);
    }

    if !std::io::stdin().is_terminal() {
        return Err(VaultError::ConfigError(format!(
            "no master password — set {}",
            settings.password_env
        )));
    }

    let pw = dialoguer::Password::new()
        .with_prompt("Enter vault master password")
        .interact()
        .map_err(|e| VaultError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Prompt for a new password with confirmation (used during `init`).
///
/// Also respects the password environment variable for scripted usage.
/// Enforces a minimum password length.
pub fn prompt_new_password(settings: &Settings) -> Result<Zeroizing<String>> {
    if let Some(pw) = settings.master_password() {
        if pw.len() < MIN_PASSWORD_LEN {
            return Err(VaultError::CommandFailed(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        return Ok(pw);
    }

    if !std::io::stdin().is_terminal() {
        return Err(VaultError::ConfigError(format!(
            "no master password — set {}",
            settings.password_env
        )));
    }

    loop {
        let password = dialoguer::Password::new()
            .with_prompt("Choose vault master password")
            .with_confirmation(
                "Confirm vault master password",
                "Passwords do not match, try again",
            )
            .interact()
            .map_err(|e| VaultError::CommandFailed(format!("password prompt: {e}")))?;

        if password.len() < MIN_PASSWORD_LEN {
            output::warning(&format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters. Try again."
            ));
            continue;
        }

        return Ok(Zeroizing::new(password));
    }
}

/// Build entry data from `key=value` pairs and prompted secret fields.
///
/// `ttl` maps to `ttl_seconds`; `Some(None)` sends an explicit null.
pub fn build_entry_data(
    fields: &[String],
    secrets: &[String],
    ttl: Option<Option<i64>>,
) -> Result<EntryData> {
    let mut data = EntryData::new();

    for raw in fields {
        let (key, value) = parse_field(raw)?;
        data.insert(key, Value::String(value));
    }

    for key in secrets {
        validate_field_name(key)?;
        let value = dialoguer::Password::new()
            .with_prompt(format!("Enter value for {key}"))
            .interact()
            .map_err(|e| VaultError::CommandFailed(format!("input prompt: {e}")))?;
        data.insert(key.clone(), Value::String(value));
    }

    match ttl {
        Some(Some(secs)) => {
            data.insert(TTL_SECONDS.to_string(), Value::from(secs));
        }
        Some(None) => {
            data.insert(TTL_SECONDS.to_string(), Value::Null);
        }
        None => {}
    }

    Ok(data)
}

/// Split `key=value` at the first `=`.
pub fn parse_field(raw: &str) -> Result<(String, String)> {
    let (key, value) = raw.split_once('=').ok_or_else(|| {
        VaultError::CommandFailed(format!("field '{raw}' must be in KEY=VALUE form"))
    })?;
    let key = key.trim();
    validate_field_name(key)?;
    Ok((key.to_string(), value.to_string()))
}

fn validate_field_name(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(VaultError::CommandFailed("field name cannot be empty".into()));
    }
    if key == TTL_SECONDS {
        return Err(VaultError::CommandFailed(
            "use --ttl to set the entry lifetime".into(),
        ));
    }
    Ok(())
}
