//! Binary vault file format and atomic persistence.
//!
//! A vault file has this layout:
//!
//! ```text
//! [salt: 16 bytes][nonce: 12 bytes][AES-256-GCM ciphertext + 16-byte tag]
//! ```
//!
//! - **Salt**: scrypt salt, chosen once at vault creation and carried
//!   forward unchanged by every save.
//! - **Nonce**: fresh random value written by every save.
//! - **Ciphertext**: the JSON document, sealed with the derived key.
//!
//! There is no magic number and no version byte; the document version
//! lives inside the encrypted JSON.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::crypto::{NONCE_LEN, SALT_LEN, TAG_LEN};
use crate::errors::{Result, VaultError};

/// Size of the unencrypted prefix: salt + nonce.
pub const HEADER_LEN: usize = SALT_LEN + NONCE_LEN;

/// Smallest possible valid file: header plus an empty ciphertext's tag.
const MIN_FILE_LEN: usize = HEADER_LEN + TAG_LEN;

/// Owner read/write only.
#[cfg(unix)]
const FILE_MODE: u32 = 0o600;

/// The three parts of a vault file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultFile {
    pub salt: [u8; SALT_LEN],
    pub nonce: [u8; NONCE_LEN],
    /// Ciphertext with the authentication tag appended.
    pub ciphertext: Vec<u8>,
}

impl VaultFile {
    /// Concatenate the parts into the on-disk byte layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN + self.ciphertext.len());
        buf.extend_from_slice(&self.salt);
        buf.extend_from_slice(&self.nonce);
        buf.extend_from_slice(&self.ciphertext);
        buf
    }

    /// Split raw file bytes into salt, nonce and ciphertext.
    ///
    /// A file too short to hold even an empty sealed document cannot have
    /// been written by us, and is reported the same way as any other
    /// failed authentication.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < MIN_FILE_LEN {
            return Err(VaultError::AuthenticationFailed(format!(
                "vault file is truncated ({} bytes, need at least {MIN_FILE_LEN})",
                data.len()
            )));
        }

        let (salt, nonce) = split_header(&data[..HEADER_LEN]);
        Ok(Self {
            salt,
            nonce,
            ciphertext: data[HEADER_LEN..].to_vec(),
        })
    }
}

fn split_header(header: &[u8]) -> ([u8; SALT_LEN], [u8; NONCE_LEN]) {
    let mut salt = [0u8; SALT_LEN];
    let mut nonce = [0u8; NONCE_LEN];
    salt.copy_from_slice(&header[..SALT_LEN]);
    nonce.copy_from_slice(&header[SALT_LEN..HEADER_LEN]);
    (salt, nonce)
}

/// Read and split a vault file.
pub fn read_vault(path: &Path) -> Result<VaultFile> {
    if !path.exists() {
        return Err(VaultError::VaultNotFound(path.to_path_buf()));
    }

    let data = fs::read(path).map_err(|e| VaultError::io(path, e))?;
    VaultFile::from_bytes(&data)
}

/// Read only the salt and nonce of the file currently on disk.
///
/// Returns `None` if the file does not exist or is too short to carry a
/// header.  Used by `save` to notice that someone else rewrote the file.
pub fn read_header(path: &Path) -> Result<Option<([u8; SALT_LEN], [u8; NONCE_LEN])>> {
    let mut file = match fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(VaultError::io(path, e)),
    };

    let mut header = [0u8; HEADER_LEN];
    match file.read_exact(&mut header) {
        Ok(()) => Ok(Some(split_header(&header))),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(VaultError::io(path, e)),
    }
}

/// Write a vault file to disk **atomically**.
///
/// 1. Write the bytes to a uniquely named temp file in the same directory.
/// 2. fsync it and restrict it to owner read/write.
/// 3. Rename it over the target path.
///
/// The rename ensures readers never see a half-written file, and the
/// unique temp name keeps two writers from clobbering each other's
/// partial output.
pub fn write_vault(path: &Path, file: &VaultFile) -> Result<()> {
    write_atomic(path, file, true)
}

/// Like [`write_vault`], but fails with `VaultAlreadyExists` instead of
/// replacing a file that appeared at `path` in the meantime.
pub fn create_vault(path: &Path, file: &VaultFile) -> Result<()> {
    write_atomic(path, file, false)
}

fn write_atomic(path: &Path, file: &VaultFile, overwrite: bool) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !parent.exists() {
        fs::create_dir_all(parent).map_err(|e| VaultError::io(parent, e))?;
    }

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| VaultError::io(parent, e))?;
    restrict_permissions(tmp.path())?;

    tmp.write_all(&file.to_bytes())
        .map_err(|e| VaultError::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| VaultError::io(tmp.path(), e))?;

    if overwrite {
        tmp.persist(path)
            .map_err(|e| VaultError::io(path, e.error))?;
    } else {
        tmp.persist_noclobber(path).map_err(|e| {
            if e.error.kind() == std::io::ErrorKind::AlreadyExists {
                VaultError::VaultAlreadyExists(path.to_path_buf())
            } else {
                VaultError::io(path, e.error)
            }
        })?;
    }

    // Re-apply after the rename in case the destination filesystem does
    // not carry the temp file's mode across.
    restrict_permissions(path)?;

    Ok(())
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(FILE_MODE))
        .map_err(|e| VaultError::io(path, e))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use tempfile::TempDir;

    fn sample() -> VaultFile {
        VaultFile {
            salt: [0xAA; SALT_LEN],
            nonce: [0xBB; NONCE_LEN],
            ciphertext: vec![0xCC; 40],
        }
    }

    #[test]
    fn byte_layout_is_salt_nonce_ciphertext() {
        let bytes = sample().to_bytes();
        assert_eq!(bytes.len(), 16 + 12 + 40);
        assert!(bytes[..16].iter().all(|b| *b == 0xAA));
        assert!(bytes[16..28].iter().all(|b| *b == 0xBB));
        assert!(bytes[28..].iter().all(|b| *b == 0xCC));
        assert_eq!(VaultFile::from_bytes(&bytes).unwrap(), sample());
    }

    #[test]
    fn truncated_file_fails_authentication() {
        let err = VaultFile::from_bytes(&[0u8; 30]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthenticationFailure);
    }

    #[test]
    fn write_then_read_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("vault.enc");

        write_vault(&path, &sample()).unwrap();

        let (salt, nonce) = read_header(&path).unwrap().unwrap();
        assert_eq!(salt, [0xAA; SALT_LEN]);
        assert_eq!(nonce, [0xBB; NONCE_LEN]);
        assert_eq!(read_vault(&path).unwrap(), sample());
    }

    #[test]
    fn create_never_replaces_an_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.enc");
        create_vault(&path, &sample()).unwrap();

        let other = VaultFile {
            salt: [0x11; SALT_LEN],
            ..sample()
        };
        let err = create_vault(&path, &other).unwrap_err();
        assert!(matches!(err, VaultError::VaultAlreadyExists(_)));
        assert_eq!(read_vault(&path).unwrap(), sample());

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("vault.enc")]);
    }

    #[test]
    fn read_header_of_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(read_header(&dir.path().join("absent.enc")).unwrap().is_none());
    }

    #[test]
    fn read_missing_vault_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = read_vault(&dir.path().join("absent.enc")).unwrap_err();
        assert!(matches!(err, VaultError::VaultNotFound(_)));
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn no_temp_files_are_left_behind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.enc");
        write_vault(&path, &sample()).unwrap();
        write_vault(&path, &sample()).unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("vault.enc")]);
    }

    #[cfg(unix)]
    #[test]
    fn written_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.enc");
        write_vault(&path, &sample()).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }
}
