//! Entry operations on the decrypted document.
//!
//! These methods only touch memory.  Each one tells its caller whether
//! the document changed so that `Vault` can persist exactly when needed:
//! `add` always changes it, `update` when it returns `Found`, `get` and
//! `get_fields` when they return `Expired { purged: true }`, `delete`
//! when it returns `true`, and `purge_expired` when it returns non-zero.
//!
//! The current time is passed in explicitly so expiry is deterministic
//! under test.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use super::content::VaultContent;
use super::entry::{
    Entry, EntryData, Expiry, Lookup, Timestamp, SERVICE, SYSTEM_FIELDS, TTL_SECONDS,
};
use crate::errors::{Result, VaultError};

impl VaultContent {
    /// Append a new entry built from `data`.
    ///
    /// `data` must carry a non-empty string `service`.  An optional
    /// `ttl_seconds` (number or null) becomes an absolute `expires_at`;
    /// zero or negative values produce an entry that is already expired.
    /// Duplicate service names are allowed; lookups see the first one.
    pub fn add(&mut self, data: &EntryData, now: DateTime<Utc>) -> Result<Entry> {
        let service = match data.get(SERVICE) {
            Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
            Some(Value::String(_)) | None => {
                return Err(VaultError::InvalidEntry(
                    "'service' is required and cannot be empty".into(),
                ))
            }
            Some(_) => {
                return Err(VaultError::InvalidEntry("'service' must be a string".into()))
            }
        };
        reject_system_fields(data)?;

        let expires_at = match data.get(TTL_SECONDS) {
            Some(ttl) => expiry_from_ttl(ttl, now)?,
            None => None,
        };

        let stamp = Timestamp::from_datetime(now);
        let entry = Entry {
            id: self.next_id(),
            service,
            created_at: Some(stamp.clone()),
            updated_at: Some(stamp),
            expires_at,
            fields: caller_fields(data).collect(),
        };

        self.entries.push(entry.clone());
        Ok(entry)
    }

    /// Merge `updates` into the first live entry for `service`.
    ///
    /// `service` in `updates` may only repeat the stored name (case is
    /// ignored).  `ttl_seconds` replaces the expiry, null clears it, and
    /// leaving it out keeps the current one.  An expired match counts as
    /// absent and is left for `get` or `purge_expired` to remove.
    pub fn update(
        &mut self,
        service: &str,
        updates: &EntryData,
        now: DateTime<Utc>,
    ) -> Result<Lookup<Entry>> {
        reject_system_fields(updates)?;
        let new_expiry = match updates.get(TTL_SECONDS) {
            Some(ttl) => Some(expiry_from_ttl(ttl, now)?),
            None => None,
        };

        let Some(idx) = self.position(service) else {
            return Ok(Lookup::NotFound);
        };
        if check_expired(&self.entries[idx], now)? {
            return Ok(Lookup::Expired { purged: false });
        }

        let entry = &mut self.entries[idx];
        match updates.get(SERVICE) {
            None => {}
            Some(Value::String(s)) if entry.matches(s) => {}
            Some(Value::String(s)) => {
                return Err(VaultError::ServiceRename {
                    from: entry.service.clone(),
                    to: s.clone(),
                })
            }
            Some(_) => {
                return Err(VaultError::InvalidEntry("'service' must be a string".into()))
            }
        }

        entry.fields.extend(caller_fields(updates));
        if let Some(expires_at) = new_expiry {
            entry.expires_at = expires_at;
        }
        entry.updated_at = Some(Timestamp::from_datetime(now));

        Ok(Lookup::Found(entry.clone()))
    }

    /// Fetch the first entry for `service`.
    ///
    /// If that entry has expired the result is `Expired`, and with
    /// `purge_if_expired` the entry is also removed.  A malformed
    /// `expires_at` is an error rather than a guess either way.
    pub fn get(
        &mut self,
        service: &str,
        purge_if_expired: bool,
        now: DateTime<Utc>,
    ) -> Result<Lookup<Entry>> {
        let Some(idx) = self.position(service) else {
            return Ok(Lookup::NotFound);
        };

        if check_expired(&self.entries[idx], now)? {
            if purge_if_expired {
                let removed = self.entries.remove(idx);
                tracing::debug!(id = removed.id, "purged expired entry on read");
            }
            return Ok(Lookup::Expired {
                purged: purge_if_expired,
            });
        }

        Ok(Lookup::Found(self.entries[idx].clone()))
    }

    /// Field names of the first entry for `service`, never the values.
    /// Same lookup and purge rules as [`VaultContent::get`].
    pub fn get_fields(&mut self, service: &str, now: DateTime<Utc>) -> Result<Lookup<Vec<String>>> {
        Ok(self.get(service, true, now)?.map(|e| e.field_names()))
    }

    /// Service names in insertion order, live ones only unless
    /// `include_expired`.  Never removes anything.
    pub fn list(&self, include_expired: bool, now: DateTime<Utc>) -> Result<Vec<String>> {
        Ok(self
            .visible(include_expired, now)?
            .into_iter()
            .map(|e| e.service.clone())
            .collect())
    }

    /// Copies of the stored entries, filtered like [`VaultContent::list`].
    pub fn entries(&self, include_expired: bool, now: DateTime<Utc>) -> Result<Vec<Entry>> {
        Ok(self
            .visible(include_expired, now)?
            .into_iter()
            .cloned()
            .collect())
    }

    /// Remove every entry for `service`.  Returns whether any existed.
    pub fn delete(&mut self, service: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| !e.matches(service));
        self.entries.len() < before
    }

    /// Remove every expired entry and return how many were removed.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> Result<usize> {
        // Validate everything first so a malformed entry aborts the sweep
        // before anything is removed.
        let mut expired = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            expired.push(check_expired(entry, now)?);
        }

        let before = self.entries.len();
        let mut flags = expired.into_iter();
        self.entries.retain(|_| !flags.next().unwrap_or(false));
        Ok(before - self.entries.len())
    }

    fn position(&self, service: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.matches(service))
    }

    fn visible(&self, include_expired: bool, now: DateTime<Utc>) -> Result<Vec<&Entry>> {
        let mut out = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            if include_expired || !check_expired(entry, now)? {
                out.push(entry);
            }
        }
        Ok(out)
    }
}

/// `true` if `entry` has expired at `now`; malformed expiry is an error.
fn check_expired(entry: &Entry, now: DateTime<Utc>) -> Result<bool> {
    match entry.expiry_state(now) {
        Expiry::Live => Ok(false),
        Expiry::Expired => Ok(true),
        Expiry::Malformed => Err(VaultError::MalformedExpiry {
            service: entry.service.clone(),
            value: entry
                .expires_at
                .as_ref()
                .map(|t| t.as_str().to_string())
                .unwrap_or_default(),
        }),
    }
}

fn reject_system_fields(data: &EntryData) -> Result<()> {
    match SYSTEM_FIELDS.iter().find(|k| data.contains_key(**k)) {
        Some(k) => Err(VaultError::SystemField((*k).to_string())),
        None => Ok(()),
    }
}

/// Everything in `data` except the keys the vault interprets itself.
fn caller_fields(data: &EntryData) -> impl Iterator<Item = (String, Value)> + '_ {
    data.iter()
        .filter(|(k, _)| k.as_str() != SERVICE && k.as_str() != TTL_SECONDS)
        .map(|(k, v)| (k.clone(), v.clone()))
}

/// Convert a `ttl_seconds` value into an absolute expiry.
/// `null` means the entry never expires.
fn expiry_from_ttl(ttl: &Value, now: DateTime<Utc>) -> Result<Option<Timestamp>> {
    let number = match ttl {
        Value::Null => return Ok(None),
        Value::Number(n) => n,
        _ => {
            return Err(VaultError::InvalidEntry(
                "'ttl_seconds' must be a number or null".into(),
            ))
        }
    };

    let lifetime = if let Some(secs) = number.as_i64() {
        Duration::try_seconds(secs)
    } else {
        number
            .as_f64()
            .map(|secs| secs * 1000.0)
            .filter(|ms| ms.is_finite() && ms.abs() < i64::MAX as f64)
            .and_then(|ms| Duration::try_milliseconds(ms as i64))
    };

    lifetime
        .and_then(|d| now.checked_add_signed(d))
        .map(|at| Some(Timestamp::from_datetime(at)))
        .ok_or_else(|| VaultError::InvalidEntry("'ttl_seconds' is out of range".into()))
}
