//! Store error types.

use progvault_crypto::CryptoError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while saving or loading records.
///
/// Messages carry file paths and identities only, never passwords, keys or
/// plaintext.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("salt file not found: {}", .0.display())]
    MissingSalt(PathBuf),

    #[error("data file not found: {}", .0.display())]
    MissingDataFile(PathBuf),

    #[error("salt already exists and cannot be replaced: {}", .0.display())]
    SaltAlreadyExists(PathBuf),

    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("decrypted record is not valid UTF-8 (wrong password or corrupted record)")]
    InvalidUtf8,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Decryption produced invalid padding; typically a wrong password.
    pub fn is_padding(&self) -> bool {
        matches!(self, Self::Crypto(CryptoError::Padding))
    }

    pub fn is_missing_salt(&self) -> bool {
        matches!(self, Self::MissingSalt(_))
    }

    pub fn is_missing_data_file(&self) -> bool {
        matches!(self, Self::MissingDataFile(_))
    }

    pub fn is_truncated_record(&self) -> bool {
        matches!(self, Self::Crypto(CryptoError::TruncatedRecord { .. }))
    }
}
