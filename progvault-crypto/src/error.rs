//! Crypto error types.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur while deriving keys or transforming records.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Decrypted buffer did not end in valid PKCS#7 padding.
    /// Usually the wrong password; possibly a corrupted record.
    #[error("invalid padding after decryption (wrong password or corrupted record)")]
    Padding,

    #[error("record truncated: {len} bytes is shorter than the 16-byte IV prefix")]
    TruncatedRecord { len: usize },

    #[error("ciphertext length {len} is not a non-zero multiple of the block size")]
    CiphertextLength { len: usize },

    #[error("invalid salt length: expected {expected}, got {actual}")]
    InvalidSaltLength { expected: usize, actual: usize },

    #[error("invalid KDF parameters: {0}")]
    InvalidKdfParams(String),

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("random number generator failure: {0}")]
    Rng(String),
}
