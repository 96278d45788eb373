use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::errors::{Result, VaultError};

/// Environment variable that overrides the vault file location.
pub const VAULT_FILE_ENV: &str = "VAULT_FILE";

/// Default environment variable holding the master password.
pub const DEFAULT_PASSWORD_ENV: &str = "VAULT_MASTER_PASSWORD";

/// Directory name under the per-OS data directory.
pub const APP_DIR_NAME: &str = "credvault";

/// File name of the vault inside the application directory.
const VAULT_FILE_NAME: &str = "vault.enc";

/// File name of the optional config file inside the application directory.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Application settings, loaded from `config.toml`.
///
/// Every field has a sensible default so credvault works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Vault file location.  `VAULT_FILE` in the environment wins over
    /// this; when both are absent the per-OS data directory is used.
    #[serde(default)]
    pub vault_file: Option<PathBuf>,

    /// Name of the environment variable holding the master password.
    #[serde(default = "default_password_env")]
    pub password_env: String,

    /// Log level for the `credvault` target (e.g. "warn", "debug").
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_password_env() -> String {
    DEFAULT_PASSWORD_ENV.to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            vault_file: None,
            password_env: default_password_env(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(config_path).map_err(|e| VaultError::io(config_path, e))?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            VaultError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        Ok(settings)
    }

    /// The vault file to use, honouring the `VAULT_FILE` override.
    pub fn vault_path(&self) -> Result<PathBuf> {
        let env_override = std::env::var(VAULT_FILE_ENV).ok();
        self.resolve_vault_path(env_override.as_deref())
    }

    /// Resolve the vault location: `env_override`, then `vault_file`, then
    /// `<data_dir>/credvault/vault.enc`.  Empty overrides are ignored.
    pub fn resolve_vault_path(&self, env_override: Option<&str>) -> Result<PathBuf> {
        if let Some(raw) = env_override.filter(|s| !s.trim().is_empty()) {
            return Ok(expand_home(raw));
        }
        if let Some(path) = &self.vault_file {
            return Ok(expand_home(&path.to_string_lossy()));
        }
        Ok(app_data_dir()?.join(VAULT_FILE_NAME))
    }

    /// The master password from the configured environment variable, if set.
    pub fn master_password(&self) -> Option<Zeroizing<String>> {
        std::env::var(&self.password_env)
            .ok()
            .filter(|pw| !pw.is_empty())
            .map(Zeroizing::new)
    }
}

/// Per-OS application data directory for credvault.
///
/// Windows: `%APPDATA%\credvault`, macOS: `~/Library/Application Support/credvault`,
/// Linux: `$XDG_DATA_HOME/credvault` or `~/.local/share/credvault`.
pub fn app_data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .ok_or_else(|| {
            VaultError::ConfigError(format!(
                "cannot determine the application data directory — set {VAULT_FILE_ENV}"
            ))
        })
}

/// Default location of `config.toml`.
pub fn default_config_path() -> Result<PathBuf> {
    Ok(app_data_dir()?.join(CONFIG_FILE_NAME))
}

/// Expand a leading `~/` to the home directory.
fn expand_home(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_settings_are_sensible() {
        let s = Settings::default();
        assert!(s.vault_file.is_none());
        assert_eq!(s.password_env, "VAULT_MASTER_PASSWORD");
        assert_eq!(s.log_level, "warn");
    }

    #[test]
    fn load_returns_defaults_when_no_config_file() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load(&tmp.path().join("config.toml")).unwrap();
        assert_eq!(settings.password_env, "VAULT_MASTER_PASSWORD");
    }

    #[test]
    fn load_parses_toml_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        let config = r#"
vault_file = "/srv/secrets/agent.enc"
password_env = "AGENT_VAULT_PASSWORD"
log_level = "debug"
"#;
        fs::write(&path, config).unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(
            settings.vault_file,
            Some(PathBuf::from("/srv/secrets/agent.enc"))
        );
        assert_eq!(settings.password_env, "AGENT_VAULT_PASSWORD");
        assert_eq!(settings.log_level, "debug");
    }

    #[test]
    fn load_uses_defaults_for_missing_fields() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "log_level = \"info\"\n").unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.log_level, "info");
        assert!(settings.vault_file.is_none());
        assert_eq!(settings.password_env, "VAULT_MASTER_PASSWORD");
    }

    #[test]
    fn load_errors_on_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "not valid {{toml").unwrap();

        assert!(Settings::load(&path).is_err());
    }

    #[test]
    fn env_override_wins() {
        let s = Settings {
            vault_file: Some(PathBuf::from("/from/config.enc")),
            ..Settings::default()
        };
        let path = s.resolve_vault_path(Some("/from/env.enc")).unwrap();
        assert_eq!(path, PathBuf::from("/from/env.enc"));
    }

    #[test]
    fn config_file_used_without_override() {
        let s = Settings {
            vault_file: Some(PathBuf::from("/from/config.enc")),
            ..Settings::default()
        };
        assert_eq!(
            s.resolve_vault_path(None).unwrap(),
            PathBuf::from("/from/config.enc")
        );
        assert_eq!(
            s.resolve_vault_path(Some("  ")).unwrap(),
            PathBuf::from("/from/config.enc")
        );
    }

    #[test]
    fn default_path_is_in_app_data_dir() {
        let Ok(expected_dir) = app_data_dir() else {
            // No home directory in this environment.
            return;
        };
        let path = Settings::default().resolve_vault_path(None).unwrap();
        assert_eq!(path, expected_dir.join("vault.enc"));
        assert!(path.ends_with("credvault/vault.enc"));
    }

    #[test]
    fn tilde_is_expanded() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        let path = Settings::default()
            .resolve_vault_path(Some("~/vaults/v.enc"))
            .unwrap();
        assert_eq!(path, home.join("vaults/v.enc"));
    }
}
