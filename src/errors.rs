use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in credvault.
///
/// Every variant maps onto one of four caller-facing categories via
/// [`VaultError::kind`].  Messages may name a path or a service, but
/// never a secret value.
#[derive(Debug, Error)]
pub enum VaultError {
    // --- Authentication ---
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    // --- State ---
    #[error("Vault is locked")]
    Locked,

    #[error("Vault is not initialized — call initialize() first")]
    NotInitialized,

    #[error("Vault already exists at {0}")]
    VaultAlreadyExists(PathBuf),

    #[error("Vault is already unlocked")]
    AlreadyUnlocked,

    // --- Validation ---
    #[error("Invalid entry: {0}")]
    InvalidEntry(String),

    #[error("Cannot rename service '{from}' to '{to}'")]
    ServiceRename { from: String, to: String },

    #[error("Field '{0}' is managed by the vault and cannot be set")]
    SystemField(String),

    #[error("Entry '{service}' has a malformed expires_at timestamp '{value}'")]
    MalformedExpiry { service: String, value: String },

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Unsupported vault document version {found} (newest supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Command failed: {0}")]
    CommandFailed(String),

    // --- IO ---
    #[error("Vault not found at {0}")]
    VaultNotFound(PathBuf),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Vault file {0} was modified by another process — refusing to overwrite")]
    ConcurrentModification(PathBuf),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// The four failure categories exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Wrong password, tampered or truncated file.  Retrying with the
    /// same password cannot succeed.
    AuthenticationFailure,
    /// An entry operation was attempted while the vault was not unlocked.
    Locked,
    /// The request itself was invalid.
    Validation,
    /// Disk read/write failure.
    Io,
}

impl VaultError {
    /// Classify this error into one of the caller-facing categories.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AuthenticationFailed(_) => ErrorKind::AuthenticationFailure,

            Self::Locked | Self::NotInitialized => ErrorKind::Locked,

            Self::VaultAlreadyExists(_)
            | Self::AlreadyUnlocked
            | Self::InvalidEntry(_)
            | Self::ServiceRename { .. }
            | Self::SystemField(_)
            | Self::MalformedExpiry { .. }
            | Self::KeyDerivationFailed(_)
            | Self::UnsupportedVersion { .. }
            | Self::ConfigError(_)
            | Self::CommandFailed(_) => ErrorKind::Validation,

            Self::VaultNotFound(_)
            | Self::Io { .. }
            | Self::ConcurrentModification(_)
            | Self::EncryptionFailed(_)
            | Self::SerializationError(_) => ErrorKind::Io,
        }
    }

    /// Shorthand for building an [`VaultError::Io`] with the offending path.
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience type alias for credvault results.
pub type Result<T> = std::result::Result<T, VaultError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_category_is_reachable() {
        assert_eq!(
            VaultError::AuthenticationFailed("tag mismatch".into()).kind(),
            ErrorKind::AuthenticationFailure
        );
        assert_eq!(VaultError::Locked.kind(), ErrorKind::Locked);
        assert_eq!(VaultError::NotInitialized.kind(), ErrorKind::Locked);
        assert_eq!(
            VaultError::InvalidEntry("missing service".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            VaultError::MalformedExpiry {
                service: "otp".into(),
                value: "tomorrow".into(),
            }
            .kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            VaultError::ConcurrentModification(PathBuf::from("/tmp/v.enc")).kind(),
            ErrorKind::Io
        );
    }

    #[test]
    fn io_error_message_names_the_path() {
        let err = VaultError::io(
            "/data/vault.enc",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/data/vault.enc"));
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
