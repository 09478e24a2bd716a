//! Per-identity encrypted record files.

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::fs_util::{read_if_exists, write_atomic};
use crate::identity::Identity;
use crate::key_material;
use progvault_crypto::{decrypt, derive_key, encrypt, DerivedKey, EncryptedRecord, Salt};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// Where an identity is in its salt/data lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordState {
    /// No salt file. A stray data file without a salt also reports this,
    /// since it can never be decrypted.
    NoSalt,
    /// Salt persisted, no record saved yet.
    SaltOnly,
    /// Salt and data file both present; `load` is possible.
    SaltAndData,
}

/// Encrypts and persists one plaintext record per identity.
///
/// Calls for the same identity are serialized; different identities do not
/// contend. Directory setup is explicit via [`SecureRecordStore::init`].
pub struct SecureRecordStore {
    config: StoreConfig,
    locks: Mutex<HashMap<Identity, Arc<Mutex<()>>>>,
}

impl SecureRecordStore {
    /// Validates `config`. Touches nothing on disk.
    pub fn new(config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Creates the salt and data directories if missing. Idempotent.
    pub fn init(&self) -> StoreResult<()> {
        for dir in [self.config.salt_dir_path(), self.config.data_dir_path()] {
            if dir.is_dir() {
                debug!(path = %dir.display(), "existing directory found");
            } else {
                fs::create_dir_all(&dir)?;
                info!(path = %dir.display(), "directory created");
            }
        }
        Ok(())
    }

    pub fn salt_path(&self, identity: &Identity) -> PathBuf {
        self.config.salt_dir_path().join(self.file_name(identity))
    }

    pub fn data_path(&self, identity: &Identity) -> PathBuf {
        self.config.data_dir_path().join(self.file_name(identity))
    }

    fn file_name(&self, identity: &Identity) -> String {
        format!("{identity}.{}", self.config.file_extension)
    }

    pub fn has_salt(&self, identity: &Identity) -> bool {
        key_material::salt_exists(&self.salt_path(identity))
    }

    pub fn state(&self, identity: &Identity) -> RecordState {
        if !self.has_salt(identity) {
            RecordState::NoSalt
        } else if self.data_path(identity).is_file() {
            RecordState::SaltAndData
        } else {
            RecordState::SaltOnly
        }
    }

    /// Returns the identity's salt, generating and persisting one on first use.
    pub fn ensure_salt(&self, identity: &Identity) -> StoreResult<Salt> {
        self.with_identity_lock(identity, || self.ensure_salt_locked(identity))
    }

    /// Persists an externally supplied salt for an identity that has none.
    pub fn install_salt(&self, identity: &Identity, salt: &Salt) -> StoreResult<()> {
        self.with_identity_lock(identity, || {
            key_material::persist_salt(&self.salt_path(identity), salt)?;
            info!(identity = %identity, "installed external salt");
            Ok(())
        })
    }

    /// Encrypts `plaintext` under a key derived from `password` and replaces
    /// the identity's data file.
    pub fn save(&self, identity: &Identity, plaintext: &str, password: &str) -> StoreResult<()> {
        self.with_identity_lock(identity, || {
            let salt = self.ensure_salt_locked(identity)?;
            let key = self.derive(password, &salt)?;
            let (iv, ciphertext) = encrypt(&key, plaintext.as_bytes())?;
            drop(key);

            let record = EncryptedRecord::new(iv, ciphertext);
            write_atomic(&self.data_path(identity), &record.encode())?;
            debug!(identity = %identity, bytes = record.encoded_len(), "record written");
            Ok(())
        })
    }

    /// Reads and decrypts the identity's record.
    ///
    /// Fails with [`StoreError::MissingSalt`] or [`StoreError::MissingDataFile`]
    /// before any key derivation if either file is absent. A wrong password
    /// usually fails with a padding error; it is not otherwise detected.
    pub fn load(&self, identity: &Identity, password: &str) -> StoreResult<String> {
        self.with_identity_lock(identity, || {
            let salt = key_material::load_salt(&self.salt_path(identity))?;
            let data_path = self.data_path(identity);
            let stored =
                read_if_exists(&data_path)?.ok_or(StoreError::MissingDataFile(data_path))?;
            let record = EncryptedRecord::decode(&stored)?;

            let key = self.derive(password, &salt)?;
            let plaintext = decrypt(&key, &record.iv, &record.ciphertext)?;
            drop(key);

            debug!(identity = %identity, "record read");
            String::from_utf8(plaintext).map_err(|_| StoreError::InvalidUtf8)
        })
    }

    /// Identities that own a salt file, sorted.
    pub fn identities(&self) -> StoreResult<Vec<Identity>> {
        let dir = self.config.salt_dir_path();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let suffix = format!(".{}", self.config.file_extension);
        let mut ids = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let Some(stem) = path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| name.strip_suffix(suffix.as_str()))
            else {
                continue;
            };
            match Identity::new(stem) {
                Ok(id) => ids.push(id),
                Err(_) => {
                    warn!(path = %path.display(), "ignoring salt file with invalid identity name")
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    // The per-identity lock only covers this instance. Another store or
    // process can create the salt between the existence check and the write;
    // the write never replaces a salt, so the loser adopts the one on disk.
    fn ensure_salt_locked(&self, identity: &Identity) -> StoreResult<Salt> {
        let path = self.salt_path(identity);
        if key_material::salt_exists(&path) {
            return key_material::load_salt(&path);
        }
        let salt = key_material::generate()?;
        match key_material::persist_salt(&path, &salt) {
            Ok(()) => {
                info!(identity = %identity, "generated salt for new identity");
                Ok(salt)
            }
            Err(StoreError::SaltAlreadyExists(_)) => {
                debug!(identity = %identity, "salt created concurrently, using the stored one");
                key_material::load_salt(&path)
            }
            Err(e) => Err(e),
        }
    }

    fn derive(&self, password: &str, salt: &Salt) -> StoreResult<DerivedKey> {
        Ok(derive_key(password, salt, &self.config.kdf)?)
    }

    /// Runs `f` holding the identity's lock. The lock entry is dropped from
    /// the registry once no other call holds or waits on it, so the map only
    /// tracks identities with calls in flight.
    fn with_identity_lock<T>(
        &self,
        identity: &Identity,
        f: impl FnOnce() -> StoreResult<T>,
    ) -> StoreResult<T> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(
                locks
                    .entry(identity.clone())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };

        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };

        // Clones are only handed out under the registry lock, so a count of
        // two (registry + ours) cannot grow while we hold it.
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if Arc::strong_count(&lock) == 2 {
            locks.remove(identity);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use progvault_crypto::{KdfParams, MIN_PBKDF2_ITERATIONS};

    fn store(root: &std::path::Path) -> SecureRecordStore {
        let config = StoreConfig::new(root).with_kdf(KdfParams::Pbkdf2Sha256 {
            iterations: MIN_PBKDF2_ITERATIONS,
        });
        let store = SecureRecordStore::new(config).unwrap();
        store.init().unwrap();
        store
    }

    #[test]
    fn new_has_no_side_effects() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("store");
        let _ = SecureRecordStore::new(StoreConfig::new(&root)).unwrap();
        assert!(!root.exists());
    }

    #[test]
    fn init_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(dir.path());
        s.init().unwrap();
        assert!(dir.path().join("user_keys").is_dir());
        assert!(dir.path().join("user_data").is_dir());
    }

    #[test]
    fn paths_use_identity_and_extension() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(dir.path());
        let id = Identity::new("user-42").unwrap();
        assert_eq!(s.salt_path(&id), dir.path().join("user_keys").join("user-42.bin"));
        assert_eq!(s.data_path(&id), dir.path().join("user_data").join("user-42.bin"));
    }

    #[test]
    fn state_machine_progresses() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(dir.path());
        let id = Identity::new("user-42").unwrap();

        assert_eq!(s.state(&id), RecordState::NoSalt);
        s.ensure_salt(&id).unwrap();
        assert_eq!(s.state(&id), RecordState::SaltOnly);
        s.save(&id, "hello world", "root").unwrap();
        assert_eq!(s.state(&id), RecordState::SaltAndData);
    }

    #[test]
    fn load_from_salt_only_is_missing_data_file() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(dir.path());
        let id = Identity::new("user-42").unwrap();
        s.ensure_salt(&id).unwrap();
        assert!(s.load(&id, "root").unwrap_err().is_missing_data_file());
    }

    #[test]
    fn lock_registry_is_pruned_after_calls() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(dir.path());

        for i in 0..10 {
            let id = Identity::new(format!("user-{i}")).unwrap();
            s.save(&id, "hello world", "root").unwrap();
            s.load(&id, "root").unwrap();
        }
        assert!(s.locks.lock().unwrap().is_empty());
    }

    #[test]
    fn identities_match_full_extension_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(dir.path());
        let id = Identity::new("user.42").unwrap();
        s.ensure_salt(&id).unwrap();
        fs::write(dir.path().join("user_keys").join("user.42.bin.bak"), b"x").unwrap();
        assert_eq!(s.identities().unwrap(), vec![id]);
    }

    #[test]
    fn ensure_salt_does_not_regenerate() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(dir.path());
        let id = Identity::new("user-42").unwrap();
        let first = s.ensure_salt(&id).unwrap();
        let second = s.ensure_salt(&id).unwrap();
        assert_eq!(first, second);
    }
}
