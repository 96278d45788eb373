//! The decrypted vault document and its schema migration.
//!
//! ```json
//! { "version": 2,
//!   "entries": [ { "id": 1, "service": "GitHub", ... } ],
//!   "metadata": { "created": "...", "last_modified": "..." } }
//! ```
//!
//! Version 1 documents (no ids on some entries, offset-less timestamps,
//! credentials stored as `username`/`password`/`metadata` fields) are
//! read as-is and upgraded in memory; the next save writes version 2.

use serde::{Deserialize, Serialize};

use super::entry::{Entry, Timestamp};
use crate::errors::{Result, VaultError};

/// Document version written by this build.
pub const CURRENT_VERSION: u32 = 2;

/// Version assumed for documents that do not carry one.
const LEGACY_VERSION: u32 = 1;

fn legacy_version() -> u32 {
    LEGACY_VERSION
}

/// Document-level timestamps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<Timestamp>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Timestamp>,
}

/// The whole decrypted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultContent {
    #[serde(default = "legacy_version")]
    pub version: u32,

    /// Entries in insertion order.
    #[serde(default)]
    pub entries: Vec<Entry>,

    #[serde(default)]
    pub metadata: Metadata,
}

impl VaultContent {
    /// A fresh, empty document at the current version.
    pub fn new() -> Self {
        let now = Timestamp::now();
        Self {
            version: CURRENT_VERSION,
            entries: Vec::new(),
            metadata: Metadata {
                created: Some(now.clone()),
                last_modified: Some(now),
            },
        }
    }

    /// Parse decrypted bytes and bring the document up to the current
    /// version.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        // Only the position is reported: serde's messages can quote values.
        let content: Self = serde_json::from_slice(bytes).map_err(|e| {
            VaultError::AuthenticationFailed(format!(
                "vault document is unreadable ({:?} error at line {}, column {})",
                e.classify(),
                e.line(),
                e.column()
            ))
        })?;
        content.migrate()
    }

    /// Serialize for encryption.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| VaultError::SerializationError(format!("vault document: {e}")))
    }

    fn migrate(mut self) -> Result<Self> {
        if self.version > CURRENT_VERSION {
            return Err(VaultError::UnsupportedVersion {
                found: self.version,
                supported: CURRENT_VERSION,
            });
        }

        if self.version < CURRENT_VERSION {
            tracing::debug!(
                from = self.version,
                to = CURRENT_VERSION,
                "migrating vault document"
            );
            // Entries without an id get one after the highest existing id.
            let mut next = self.next_id();
            for entry in self.entries.iter_mut().filter(|e| e.id == 0) {
                entry.id = next;
                next += 1;
            }
            self.version = CURRENT_VERSION;
        }

        Ok(self)
    }

    /// Id for the next inserted entry.
    pub(crate) fn next_id(&self) -> u64 {
        self.entries.iter().map(|e| e.id).max().unwrap_or(0) + 1
    }

    /// Record a save.
    pub(crate) fn touch(&mut self) {
        self.metadata.last_modified = Some(Timestamp::now());
    }
}

impl Default for VaultContent {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn new_document_is_current_and_empty() {
        let c = VaultContent::new();
        assert_eq!(c.version, CURRENT_VERSION);
        assert!(c.entries.is_empty());
        assert!(c.metadata.created.is_some());
        assert!(c.metadata.last_modified.is_some());
    }

    #[test]
    fn legacy_document_is_migrated() {
        let legacy = br#"{
            "version": 1,
            "entries": [
                {"id": 1, "service": "openai_api", "username": "me@example.com",
                 "password": "sk-123", "metadata": {"purpose": "gpt-4"},
                 "created_at": "2024-05-01T10:00:00.000001",
                 "updated_at": "2024-05-01T10:00:00.000001"},
                {"service": "github_token", "username": "octocat", "password": "ghp_1"}
            ],
            "metadata": {"created": "2024-05-01T09:00:00"}
        }"#;

        let c = VaultContent::from_json(legacy).unwrap();
        assert_eq!(c.version, CURRENT_VERSION);
        assert_eq!(c.entries.len(), 2);
        assert_eq!(c.entries[0].id, 1);
        assert_eq!(c.entries[1].id, 2);
        assert_eq!(c.entries[0].field_str("password"), Some("sk-123"));
        assert_eq!(c.entries[0].field("metadata").unwrap()["purpose"], "gpt-4");
        assert!(c.entries[0].created_at.as_ref().unwrap().parse().is_some());
        assert!(c.metadata.last_modified.is_none());
    }

    #[test]
    fn missing_sections_are_defaulted() {
        let c = VaultContent::from_json(b"{}").unwrap();
        assert_eq!(c.version, CURRENT_VERSION);
        assert!(c.entries.is_empty());
        assert_eq!(c.metadata, Metadata::default());
    }

    #[test]
    fn future_version_is_rejected() {
        let err = VaultContent::from_json(br#"{"version": 99, "entries": []}"#).unwrap_err();
        assert!(matches!(err, VaultError::UnsupportedVersion { found: 99, .. }));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn garbage_is_an_authentication_failure() {
        let err = VaultContent::from_json(b"\x00\x01not json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthenticationFailure);
    }

    #[test]
    fn next_id_follows_highest() {
        let mut c = VaultContent::new();
        assert_eq!(c.next_id(), 1);
        c.entries = VaultContent::from_json(
            br#"{"version":2,"entries":[{"id":4,"service":"a"},{"id":2,"service":"b"}]}"#,
        )
        .unwrap()
        .entries;
        assert_eq!(c.next_id(), 5);
    }
}
