//! credvault — an encrypted, password-protected credential vault.
//!
//! Entries are JSON objects keyed by a case-insensitive service name,
//! optionally with an expiry.  The whole document is sealed with
//! AES-256-GCM under a key derived from the master password by scrypt
//! and written atomically to a single file.

pub mod cli;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod logging;
pub mod vault;
