//! Vault lifecycle: create, unlock, lock, save, and entry access.
//!
//! A `Vault` is bound to one file and moves between three states:
//!
//! ```text
//! Uninitialized --create--> Unlocked <--unlock-- Locked
//!       |                      |                   ^
//!       +-------unlock---------+-------lock--------+
//! ```
//!
//! While unlocked it holds the derived key, the salt read from (or
//! written to) the file, and the decrypted document.  Every entry
//! operation that changes the document is persisted before it returns.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::crypto::{decrypt, derive_key, encrypt, generate_salt, MasterKey, NONCE_LEN, SALT_LEN};
use crate::errors::{Result, VaultError};

use super::content::{Metadata, VaultContent};
use super::entry::{Entry, EntryData, Lookup};
use super::format::{self, VaultFile};

/// Externally visible lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultState {
    /// Never unlocked by this handle.  The file may or may not exist.
    Uninitialized,
    /// Was unlocked, then locked again.
    Locked,
    Unlocked,
}

/// Everything that only exists while the vault is unlocked.
struct Session {
    key: MasterKey,
    salt: [u8; SALT_LEN],
    /// Nonce of the file as last read or written by this handle.
    nonce: [u8; NONCE_LEN],
    content: VaultContent,
}

enum State {
    Uninitialized,
    Locked,
    Unlocked(Session),
}

/// A handle on one vault file.
pub struct Vault {
    path: PathBuf,
    state: State,
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("path", &self.path)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Vault {
    /// A handle for the vault at `path`.  Touches nothing on disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: State::Uninitialized,
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Create a brand-new vault file and leave it unlocked.
    ///
    /// Valid while not unlocked and only if no file exists at the path;
    /// a locked handle whose file has since been removed may create anew.
    /// If another process creates the file first, this fails rather than
    /// replacing it.
    pub fn create(&mut self, password: &str) -> Result<()> {
        if matches!(self.state, State::Unlocked(_)) {
            return Err(VaultError::AlreadyUnlocked);
        }
        if self.path.exists() {
            return Err(VaultError::VaultAlreadyExists(self.path.clone()));
        }

        let salt = generate_salt();
        let key = derive_key(password.as_bytes(), &salt)?;
        let content = VaultContent::new();

        let nonce = seal_and_write(
            &self.path,
            &key,
            salt,
            &content,
            WriteMode::Create,
        )?;

        info!(path = %self.path.display(), "vault created");
        self.state = State::Unlocked(Session {
            key,
            salt,
            nonce,
            content,
        });
        Ok(())
    }

    /// Decrypt the vault file and load the document into memory.
    ///
    /// On failure the handle stays in whatever state it was in.
    pub fn unlock(&mut self, password: &str) -> Result<()> {
        if matches!(self.state, State::Unlocked(_)) {
            return Err(VaultError::AlreadyUnlocked);
        }

        let file = format::read_vault(&self.path)?;
        if password.is_empty() {
            warn!(path = %self.path.display(), "vault unlock failed: empty password");
            return Err(VaultError::AuthenticationFailed(
                "wrong password or corrupted data".into(),
            ));
        }
        let key = derive_key(password.as_bytes(), &file.salt)?;

        let content = decrypt(key.as_bytes(), &file.nonce, &file.ciphertext)
            .and_then(|plaintext| VaultContent::from_json(&plaintext))
            .inspect_err(|e| {
                warn!(path = %self.path.display(), error = %e, "vault unlock failed");
            })?;

        info!(
            path = %self.path.display(),
            entries = content.entries.len(),
            "vault unlocked"
        );
        self.state = State::Unlocked(Session {
            key,
            salt: file.salt,
            nonce: file.nonce,
            content,
        });
        Ok(())
    }

    /// Forget the key and the decrypted document.
    ///
    /// The key is zeroed on drop.  Entry values are ordinary heap strings
    /// inside the parsed document; they are freed here but the allocator
    /// does not guarantee the bytes are overwritten.
    ///
    /// Locking a vault that is not unlocked does nothing.
    pub fn lock(&mut self) {
        if let State::Unlocked(_) = self.state {
            self.state = State::Locked;
            info!(path = %self.path.display(), "vault locked");
        }
    }

    /// Re-encrypt the in-memory document and write it to disk.
    ///
    /// Entry operations call this themselves; it is public for callers
    /// that want to force a rewrite (e.g. to upgrade an old document).
    pub fn save(&mut self) -> Result<()> {
        let path = self.path.clone();
        let session = self.session_mut()?;
        let mut next = session.content.clone();
        persist(&path, session, &mut next)?;
        session.content = next;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> VaultState {
        match self.state {
            State::Uninitialized => VaultState::Uninitialized,
            State::Locked => VaultState::Locked,
            State::Unlocked(_) => VaultState::Unlocked,
        }
    }

    pub fn is_locked(&self) -> bool {
        !matches!(self.state, State::Unlocked(_))
    }

    /// Whether a vault file exists at the path.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Document version and timestamps.
    pub fn metadata(&self) -> Result<(u32, Metadata)> {
        let content = &self.session()?.content;
        Ok((content.version, content.metadata.clone()))
    }

    // ------------------------------------------------------------------
    // Entry operations
    // ------------------------------------------------------------------

    /// Add an entry and persist.  See [`VaultContent::add`].
    pub fn add(&mut self, data: &EntryData) -> Result<Entry> {
        let entry = self.transact(|c| c.add(data, Utc::now()).map(|e| (e, true)))?;
        debug!(id = entry.id, "entry added");
        Ok(entry)
    }

    /// Merge fields into an entry and persist.  See [`VaultContent::update`].
    pub fn update(&mut self, service: &str, updates: &EntryData) -> Result<Lookup<Entry>> {
        self.transact(|c| {
            let found = c.update(service, updates, Utc::now())?;
            let changed = found.is_found();
            Ok((found, changed))
        })
    }

    /// Fetch an entry, purging it (and persisting) if it has expired and
    /// `purge_if_expired` is set.  The result says whether that happened.
    pub fn get(&mut self, service: &str, purge_if_expired: bool) -> Result<Lookup<Entry>> {
        self.transact(|c| {
            let found = c.get(service, purge_if_expired, Utc::now())?;
            let changed = found.was_purged();
            Ok((found, changed))
        })
    }

    /// Field names of an entry.  Same purge rules as [`Vault::get`].
    pub fn get_fields(&mut self, service: &str) -> Result<Lookup<Vec<String>>> {
        self.transact(|c| {
            let found = c.get_fields(service, Utc::now())?;
            let changed = found.was_purged();
            Ok((found, changed))
        })
    }

    /// Service names.
    ///
    /// Unlike every other entry operation this does not fail while the
    /// vault is locked: it returns an empty list, so callers can check
    /// optimistically.
    pub fn list(&self, include_expired: bool) -> Result<Vec<String>> {
        match &self.state {
            State::Unlocked(s) => s.content.list(include_expired, Utc::now()),
            _ => Ok(Vec::new()),
        }
    }

    /// Copies of all entries, filtered like [`Vault::list`].
    pub fn entries(&self, include_expired: bool) -> Result<Vec<Entry>> {
        self.session()?.content.entries(include_expired, Utc::now())
    }

    /// Remove every entry for `service`.  Persists only if something was
    /// removed.
    pub fn delete(&mut self, service: &str) -> Result<bool> {
        self.transact(|c| {
            let removed = c.delete(service);
            Ok((removed, removed))
        })
    }

    /// Remove all expired entries.  Persists only if something was removed.
    pub fn purge_expired(&mut self) -> Result<usize> {
        let count = self.transact(|c| {
            let n = c.purge_expired(Utc::now())?;
            Ok((n, n > 0))
        })?;
        if count > 0 {
            debug!(count, "purged expired entries");
        }
        Ok(count)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn session(&self) -> Result<&Session> {
        match &self.state {
            State::Unlocked(s) => Ok(s),
            _ => Err(VaultError::Locked),
        }
    }

    fn session_mut(&mut self) -> Result<&mut Session> {
        match &mut self.state {
            State::Unlocked(s) => Ok(s),
            _ => Err(VaultError::Locked),
        }
    }

    /// Run `op` against a copy of the document.  If it reports a change,
    /// persist the copy; the in-memory document is replaced only once the
    /// write has succeeded.
    fn transact<T>(
        &mut self,
        op: impl FnOnce(&mut VaultContent) -> Result<(T, bool)>,
    ) -> Result<T> {
        let path = self.path.clone();
        let session = self.session_mut()?;

        let mut next = session.content.clone();
        let (out, changed) = op(&mut next)?;
        if changed {
            persist(&path, session, &mut next)?;
            session.content = next;
        }
        Ok(out)
    }
}

/// Stamp, encrypt and write `next` with the session's key and salt.
///
/// Refuses to write if the file on disk no longer carries the salt and
/// nonce this session last saw, i.e. someone else replaced it.
fn persist(path: &Path, session: &mut Session, next: &mut VaultContent) -> Result<()> {
    match format::read_header(path)? {
        Some((salt, nonce)) if salt == session.salt && nonce == session.nonce => {}
        _ => {
            warn!(path = %path.display(), "vault file changed on disk since it was read");
            return Err(VaultError::ConcurrentModification(path.to_path_buf()));
        }
    }

    next.touch();
    session.nonce = seal_and_write(
        path,
        &session.key,
        session.salt,
        next,
        WriteMode::Replace,
    )?;
    debug!(path = %path.display(), entries = next.entries.len(), "vault saved");
    Ok(())
}

/// Serialize, encrypt under a fresh nonce, and write atomically.
/// Returns the nonce that was used.
fn seal_and_write(
    path: &Path,
    key: &MasterKey,
    salt: [u8; SALT_LEN],
    content: &VaultContent,
    mode: WriteMode,
) -> Result<[u8; NONCE_LEN]> {
    let plaintext = Zeroizing::new(content.to_json()?);
    let (nonce, ciphertext) = encrypt(key.as_bytes(), &plaintext)?;

    let file = VaultFile {
        salt,
        nonce,
        ciphertext,
    };
    match mode {
        WriteMode::Create => format::create_vault(path, &file)?,
        WriteMode::Replace => format::write_vault(path, &file)?,
    }
    Ok(nonce)
}

#[derive(Clone, Copy)]
enum WriteMode {
    /// First write of a new vault; never replaces an existing file.
    Create,
    Replace,
}
