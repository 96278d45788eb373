//! Vault module — encrypted credential storage.
//!
//! This module provides:
//! - `Entry`, `Timestamp` and `Lookup` types (`entry`)
//! - The decrypted document and its migration (`content`)
//! - Entry business logic: add, update, get, list, delete, purge (`store`)
//! - Binary vault file format and atomic writes (`format`)
//! - The lock/unlock state machine (`lifecycle`)
//! - The shared, thread-safe `VaultManager` (`manager`)

pub mod content;
pub mod entry;
pub mod format;
pub mod lifecycle;
pub mod manager;
pub mod store;

// Re-export the most commonly used items.
pub use content::{Metadata, VaultContent, CURRENT_VERSION};
pub use entry::{Entry, EntryData, Lookup, Timestamp};
pub use lifecycle::{Vault, VaultState};
pub use manager::VaultManager;
