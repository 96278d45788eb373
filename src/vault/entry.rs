//! Entry, Timestamp and Lookup types stored inside a vault.
//!
//! An entry is a JSON object: the mandatory `service` name, the
//! vault-managed `id` and timestamps, and any number of free-form fields
//! supplied by the caller (username, password, account numbers, ...).

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Caller-supplied entry data for `add` and `update`.
pub type EntryData = serde_json::Map<String, Value>;

/// Key holding the service name.
pub const SERVICE: &str = "service";

/// Key holding the vault-assigned id.
pub const ID: &str = "id";

/// Key holding the creation timestamp.
pub const CREATED_AT: &str = "created_at";

/// Key holding the last-update timestamp.
pub const UPDATED_AT: &str = "updated_at";

/// Key holding the absolute expiry timestamp.
pub const EXPIRES_AT: &str = "expires_at";

/// Input-only key: relative lifetime in seconds, converted to `expires_at`.
pub const TTL_SECONDS: &str = "ttl_seconds";

/// Keys a caller may never write directly.
pub(crate) const SYSTEM_FIELDS: [&str; 4] = [ID, CREATED_AT, UPDATED_AT, EXPIRES_AT];

/// A timestamp as stored in the document.
///
/// Kept as the original string so that a corrupted value is only
/// reported when something actually needs to interpret it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(String);

impl Timestamp {
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Format as RFC 3339 in UTC with microsecond precision.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.to_rfc3339_opts(SecondsFormat::Micros, true))
    }

    /// Wrap a raw string without validating it.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse the stored string.
    ///
    /// Accepts RFC 3339, and offset-less ISO 8601 as written by older
    /// vaults, which is read as UTC.
    pub fn parse(&self) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&self.0) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&self.0, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single credential entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Assigned at insertion; informational only, never used for lookup.
    #[serde(default)]
    pub id: u64,

    /// Service name; lookups compare it case-insensitively.
    pub service: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,

    /// Absent means the entry never expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Timestamp>,

    /// Everything else the caller stored.
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

/// Result of checking an entry's expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Expiry {
    Live,
    Expired,
    /// `expires_at` is present but cannot be parsed.
    Malformed,
}

impl Entry {
    /// Case-insensitive service match.
    pub fn matches(&self, service: &str) -> bool {
        self.service.to_lowercase() == service.to_lowercase()
    }

    /// Look up a caller field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Look up a caller field that holds a string.
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Names of every field present on the entry, values excluded.
    ///
    /// `id` is bookkeeping and is not reported.
    pub fn field_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.fields.len() + 4);
        names.push(SERVICE.to_string());
        names.extend(self.fields.keys().cloned());
        if self.created_at.is_some() {
            names.push(CREATED_AT.to_string());
        }
        if self.updated_at.is_some() {
            names.push(UPDATED_AT.to_string());
        }
        if self.expires_at.is_some() {
            names.push(EXPIRES_AT.to_string());
        }
        names
    }

    /// Parsed expiry time, if any.  `Err` carries the raw malformed value.
    pub fn expiry(&self) -> Result<Option<DateTime<Utc>>, String> {
        match &self.expires_at {
            None => Ok(None),
            Some(ts) => ts.parse().map(Some).ok_or_else(|| ts.as_str().to_string()),
        }
    }

    pub(crate) fn expiry_state(&self, now: DateTime<Utc>) -> Expiry {
        match self.expiry() {
            Ok(None) => Expiry::Live,
            Ok(Some(at)) if now >= at => Expiry::Expired,
            Ok(Some(_)) => Expiry::Live,
            Err(_) => Expiry::Malformed,
        }
    }

    /// Remaining lifetime, or `None` for entries that never expire.
    /// Negative once expired.
    pub fn time_to_live(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.expiry().ok().flatten().map(|at| at - now)
    }

    /// Render the entry as a flat JSON object, the shape callers see.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Outcome of a lookup by service name.
///
/// Absence is an ordinary outcome, not an error: `NotFound` when nothing
/// matches, `Expired` when the first match has outlived its TTL.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
    /// The matching entry has expired.  `purged` reports whether the read
    /// also removed it from the vault (and persisted that removal).
    Expired { purged: bool },
}

impl<T> Lookup<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// `true` if this lookup deleted an expired entry as a side effect.
    pub fn was_purged(&self) -> bool {
        matches!(self, Self::Expired { purged: true })
    }

    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(v) => Some(v),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Self::Found(v) => Lookup::Found(f(v)),
            Self::NotFound => Lookup::NotFound,
            Self::Expired { purged } => Lookup::Expired { purged },
        }
    }
}
