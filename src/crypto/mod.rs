//! Cryptographic primitives for credvault.
//!
//! This module provides:
//! - AES-256-GCM encryption and decryption (`encryption`)
//! - scrypt password-based key derivation (`kdf`)
//! - The zeroize-on-drop key holder (`keys`)

pub mod encryption;
pub mod kdf;
pub mod keys;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{encrypt, decrypt, derive_key, ...};
pub use encryption::{decrypt, encrypt, NONCE_LEN, TAG_LEN};
pub use kdf::{derive_key, generate_salt, SALT_LEN};
pub use keys::{MasterKey, KEY_LEN};
