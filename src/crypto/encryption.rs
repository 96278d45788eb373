//! AES-256-GCM authenticated encryption.
//!
//! Each call to `encrypt` generates a fresh random 12-byte nonce and
//! returns it next to the ciphertext; the vault file format stores the
//! two separately (see `vault::format`).  The 16-byte authentication tag
//! is appended to the ciphertext by the cipher.
//!
//! A tag mismatch is the only way a wrong password is detected, so every
//! decryption failure is reported as `AuthenticationFailed`.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use zeroize::Zeroizing;

use crate::errors::{Result, VaultError};

/// Size of the AES-256-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Size of the GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Encrypt `plaintext` with a 32-byte `key`.
///
/// Returns `(nonce, ciphertext || tag)`.  The nonce is random for every
/// call and must be stored alongside the ciphertext.
pub fn encrypt(key: &[u8], plaintext: &[u8]) -> Result<([u8; NONCE_LEN], Vec<u8>)> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| VaultError::EncryptionFailed(format!("invalid key length: {e}")))?;

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| VaultError::EncryptionFailed(format!("encryption error: {e}")))?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    nonce_bytes.copy_from_slice(&nonce);
    Ok((nonce_bytes, ciphertext))
}

/// Decrypt and verify `ciphertext` (which must end with the 16-byte tag).
///
/// The plaintext is returned in a `Zeroizing` buffer so it is wiped when
/// the caller is done parsing it.
pub fn decrypt(
    key: &[u8],
    nonce: &[u8; NONCE_LEN],
    ciphertext: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    if ciphertext.len() < TAG_LEN {
        return Err(VaultError::AuthenticationFailed(
            "ciphertext is shorter than the authentication tag".into(),
        ));
    }

    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|_| VaultError::AuthenticationFailed("invalid key length".into()))?;

    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| {
            VaultError::AuthenticationFailed("wrong password or corrupted data".into())
        })?;

    Ok(Zeroizing::new(plaintext))
}
