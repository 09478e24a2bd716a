//! Record store configuration.

use crate::error::{StoreError, StoreResult};
use progvault_crypto::KdfParams;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for a [`crate::SecureRecordStore`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding the salt and data subdirectories.
    pub root: PathBuf,

    /// Subdirectory for per-identity salt files.
    pub salt_dir: String,

    /// Subdirectory for per-identity encrypted data files.
    pub data_dir: String,

    /// Extension of both salt and data files.
    pub file_extension: String,

    /// Key derivation function and cost.
    pub kdf: KdfParams,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(".")
    }
}

impl StoreConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            salt_dir: "user_keys".to_string(),
            data_dir: "user_data".to_string(),
            file_extension: "bin".to_string(),
            kdf: KdfParams::default(),
        }
    }

    pub fn with_kdf(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }

    /// Parses a JSON config. Missing fields take their defaults.
    pub fn from_json(json: &str) -> StoreResult<Self> {
        serde_json::from_str(json).map_err(|e| StoreError::Config(e.to_string()))
    }

    pub fn salt_dir_path(&self) -> PathBuf {
        self.root.join(&self.salt_dir)
    }

    pub fn data_dir_path(&self) -> PathBuf {
        self.root.join(&self.data_dir)
    }

    pub fn validate(&self) -> StoreResult<()> {
        check_component("salt_dir", &self.salt_dir)?;
        check_component("data_dir", &self.data_dir)?;
        check_component("file_extension", &self.file_extension)?;
        if self.file_extension.contains('.') {
            return Err(StoreError::Config(
                "file_extension must not contain '.'".to_string(),
            ));
        }
        if self.salt_dir == self.data_dir {
            return Err(StoreError::Config(
                "salt_dir and data_dir must differ".to_string(),
            ));
        }
        self.kdf
            .validate()
            .map_err(|e| StoreError::Config(e.to_string()))
    }
}

fn check_component(field: &str, value: &str) -> StoreResult<()> {
    if value.is_empty() || value == "." || value == ".." {
        return Err(StoreError::Config(format!("{field} must be a plain name")));
    }
    if value.contains(['/', '\\']) {
        return Err(StoreError::Config(format!(
            "{field} must not contain path separators"
        )));
    }
    Ok(())
}
