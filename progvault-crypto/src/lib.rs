//! Cryptography layer for progvault.
//!
//! Turns a password and a per-identity salt into a record key, and encrypts
//! progress records with it:
//! - PBKDF2-HMAC-SHA256 (default) or Argon2id for key derivation
//! - AES-256-CBC with PKCS#7 padding and a fresh random IV per encryption
//! - A flat `IV ‖ ciphertext` record layout
//!
//! # Architecture
//!
//! Nothing in this crate touches the filesystem. The salt is generated here
//! but persisted by the store; the derived key only ever lives in memory and
//! is zeroized when dropped.
//!
//! CBC carries no authentication tag. A wrong key is usually detected as a
//! padding failure, but a record that happens to unpad cleanly under the
//! wrong key decrypts to garbage instead of failing.

mod cipher;
mod error;
mod key;
mod record;

pub use cipher::{decrypt, encrypt, Iv, BLOCK_SIZE, IV_SIZE};
pub use error::{CryptoError, CryptoResult};
pub use key::{
    derive_key, DerivedKey, KdfParams, Salt, DEFAULT_PBKDF2_ITERATIONS, KEY_SIZE,
    MIN_PBKDF2_ITERATIONS, SALT_SIZE,
};
pub use record::EncryptedRecord;
