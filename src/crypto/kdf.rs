//! Password-based key derivation using scrypt.
//!
//! scrypt is memory-hard and CPU-hard, so brute-forcing the master
//! password offline stays expensive.  The cost parameters are fixed:
//! the vault file does not record them, so every vault ever written
//! must be re-derivable with exactly these values.

use rand::RngCore;
use scrypt::Params;

use super::keys::{MasterKey, KEY_LEN};
use crate::errors::{Result, VaultError};

/// Length of the salt in bytes (128 bits).
pub const SALT_LEN: usize = 16;

/// log2 of the scrypt work factor N (N = 16 384).
const SCRYPT_LOG_N: u8 = 14;

/// scrypt block size parameter.
const SCRYPT_R: u32 = 8;

/// scrypt parallelism parameter.
const SCRYPT_P: u32 = 1;

/// Derive the 32-byte vault key from a password and salt.
///
/// The same password + salt always produce the same key, which is what
/// makes unlocking possible: a wrong password yields a different key and
/// the AEAD tag check fails.
pub fn derive_key(password: &[u8], salt: &[u8; SALT_LEN]) -> Result<MasterKey> {
    if password.is_empty() {
        return Err(VaultError::KeyDerivationFailed(
            "master password cannot be empty".into(),
        ));
    }

    let params = Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, KEY_LEN)
        .map_err(|e| VaultError::KeyDerivationFailed(format!("invalid scrypt params: {e}")))?;

    let mut key = MasterKey::zeroed();
    scrypt::scrypt(password, salt, &params, key.as_mut_bytes())
        .map_err(|e| VaultError::KeyDerivationFailed(format!("scrypt failed: {e}")))?;

    Ok(key)
}

/// Generate a cryptographically random 16-byte salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    salt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_give_same_key() {
        let salt = [7u8; SALT_LEN];
        let a = derive_key(b"correct horse", &salt).unwrap();
        let b = derive_key(b"correct horse", &salt).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn different_salt_gives_different_key() {
        let a = derive_key(b"correct horse", &[1u8; SALT_LEN]).unwrap();
        let b = derive_key(b"correct horse", &[2u8; SALT_LEN]).unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn empty_password_is_rejected() {
        let err = derive_key(b"", &[0u8; SALT_LEN]).unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::Validation);
    }

    #[test]
    fn salts_are_random() {
        assert_ne!(generate_salt(), generate_salt());
    }
}
