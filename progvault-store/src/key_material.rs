//! Salt file handling.
//!
//! A salt file holds the 32 raw salt bytes and nothing else. Generation goes
//! through the OS CSPRNG in `progvault-crypto`; this module only moves the
//! bytes to and from disk.

use crate::error::{StoreError, StoreResult};
use crate::fs_util::{create_new_atomic, read_if_exists};
use progvault_crypto::Salt;
use std::io;
use std::path::Path;
use tracing::debug;

/// Generates a new random salt.
pub fn generate() -> StoreResult<Salt> {
    Ok(Salt::random()?)
}

/// Writes `salt` to a new file at `path`.
///
/// An existing salt is never replaced, since that would make every record
/// written under it undecryptable. If the file already exists, including one
/// created concurrently by another process, this fails with
/// [`StoreError::SaltAlreadyExists`] and leaves it untouched.
pub fn persist_salt(path: &Path, salt: &Salt) -> StoreResult<()> {
    match create_new_atomic(path, salt.as_bytes()) {
        Ok(()) => {
            debug!(path = %path.display(), "salt file written");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            Err(StoreError::SaltAlreadyExists(path.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Reads the salt stored at `path`.
pub fn load_salt(path: &Path) -> StoreResult<Salt> {
    let bytes = read_if_exists(path)?.ok_or_else(|| StoreError::MissingSalt(path.to_path_buf()))?;
    Ok(Salt::from_slice(&bytes)?)
}

pub fn salt_exists(path: &Path) -> bool {
    path.is_file()
}
