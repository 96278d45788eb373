//! Thread-safe façade over a single vault.
//!
//! The process entry point builds one `VaultManager` and shares it
//! (usually as `Arc<VaultManager>`) with everything that needs
//! credentials.  Every call takes the manager's mutex for its whole
//! read-modify-persist sequence, so concurrent callers never interleave.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::info;
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::errors::{Result, VaultError};

use super::entry::{Entry, EntryData, Lookup};
use super::lifecycle::{Vault, VaultState};

/// Shared handle used by the rest of the application.
#[derive(Debug)]
pub struct VaultManager {
    /// Environment variable consulted when `initialize` gets no password.
    password_env: String,
    vault: Mutex<Vault>,
}

impl VaultManager {
    /// A manager for the vault at `path`, reading the password from
    /// `VAULT_MASTER_PASSWORD` when none is passed to `initialize`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_password_env(path, crate::config::DEFAULT_PASSWORD_ENV)
    }

    pub fn with_password_env(path: impl Into<PathBuf>, password_env: impl Into<String>) -> Self {
        Self {
            password_env: password_env.into(),
            vault: Mutex::new(Vault::new(path)),
        }
    }

    /// A manager for the vault location and password variable in `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self::with_password_env(
            settings.vault_path()?,
            settings.password_env.clone(),
        ))
    }

    /// Make the vault usable: create it if the file is missing, otherwise
    /// unlock it.
    ///
    /// With `password == None` the password is read from the configured
    /// environment variable.  Calling this on an already unlocked vault
    /// does nothing; calling it after `lock` unlocks again.  Unlocking
    /// runs the KDF, which takes a noticeable fraction of a second.
    pub fn initialize(&self, password: Option<&str>) -> Result<()> {
        let mut vault = self.vault();
        if vault.state() == VaultState::Unlocked {
            return Ok(());
        }

        let password = match password {
            Some(p) => Zeroizing::new(p.to_string()),
            None => password_from_env(&self.password_env)?,
        };

        if vault.exists() {
            vault.unlock(&password)
        } else {
            info!(path = %vault.path().display(), "no vault found, creating a new one");
            vault.create(&password)
        }
    }

    /// Add an entry.
    pub fn add(&self, data: &EntryData) -> Result<Entry> {
        self.vault_unlocked()?.add(data)
    }

    /// Merge fields into the first live entry for `service`.
    pub fn update(&self, service: &str, updates: &EntryData) -> Result<Lookup<Entry>> {
        self.vault_unlocked()?.update(service, updates)
    }

    /// First live entry for `service`; expired entries are purged.
    pub fn get(&self, service: &str) -> Result<Lookup<Entry>> {
        self.vault_unlocked()?.get(service, true)
    }

    /// Field names (never values) of the first live entry for `service`.
    pub fn get_fields(&self, service: &str) -> Result<Lookup<Vec<String>>> {
        self.vault_unlocked()?.get_fields(service)
    }

    /// Names of live entries.  Empty (not an error) while locked or
    /// before `initialize`.
    pub fn list(&self) -> Result<Vec<String>> {
        self.vault().list(false)
    }

    /// Names of all entries including expired ones.  Empty while locked.
    pub fn list_all(&self) -> Result<Vec<String>> {
        self.vault().list(true)
    }

    /// Copies of all entries (values included).
    pub fn entries(&self, include_expired: bool) -> Result<Vec<Entry>> {
        self.vault_unlocked()?.entries(include_expired)
    }

    /// Remove every entry for `service`.  `false` if there was none.
    pub fn delete(&self, service: &str) -> Result<bool> {
        self.vault_unlocked()?.delete(service)
    }

    /// Remove all expired entries; returns how many.
    pub fn purge_expired(&self) -> Result<usize> {
        self.vault_unlocked()?.purge_expired()
    }

    /// Drop the key and decrypted data from memory.
    pub fn lock(&self) {
        self.vault().lock();
    }

    pub fn is_locked(&self) -> bool {
        self.vault().is_locked()
    }

    pub fn state(&self) -> VaultState {
        self.vault().state()
    }

    pub fn path(&self) -> PathBuf {
        self.vault().path().to_path_buf()
    }

    /// Whether the vault file exists on disk.
    pub fn exists(&self) -> bool {
        self.vault().exists()
    }

    /// Acquire the vault.  A panic in another thread cannot leave the
    /// document half-modified (mutations are applied to a copy), so a
    /// poisoned lock is simply taken over.
    fn vault(&self) -> MutexGuard<'_, Vault> {
        self.vault.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Acquire the vault, distinguishing "never initialized" from "locked".
    fn vault_unlocked(&self) -> Result<MutexGuard<'_, Vault>> {
        let vault = self.vault();
        match vault.state() {
            VaultState::Unlocked => Ok(vault),
            VaultState::Locked => Err(VaultError::Locked),
            VaultState::Uninitialized => Err(VaultError::NotInitialized),
        }
    }
}

/// Read the master password from `var`.
fn password_from_env(var: &str) -> Result<Zeroizing<String>> {
    match std::env::var(var) {
        Ok(pw) if !pw.is_empty() => Ok(Zeroizing::new(pw)),
        _ => Err(VaultError::ConfigError(format!(
            "no master password provided — set {var} or pass one to initialize()"
        ))),
    }
}
