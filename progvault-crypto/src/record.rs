//! On-disk record layout: `IV (16 bytes) ‖ ciphertext`.
//!
//! No header and no length prefix; the ciphertext length is whatever follows
//! the IV. This module only moves bytes around and checks the minimum length.

use crate::cipher::{Iv, IV_SIZE};
use crate::error::{CryptoError, CryptoResult};

/// An encrypted record as stored in a data file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptedRecord {
    pub iv: Iv,
    pub ciphertext: Vec<u8>,
}

impl EncryptedRecord {
    pub fn new(iv: Iv, ciphertext: Vec<u8>) -> Self {
        Self { iv, ciphertext }
    }

    /// Serializes to `IV ‖ ciphertext`.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(IV_SIZE + self.ciphertext.len());
        out.extend_from_slice(self.iv.as_bytes());
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Splits stored bytes into IV and ciphertext.
    pub fn decode(bytes: &[u8]) -> CryptoResult<Self> {
        let Some((iv, ciphertext)) = bytes.split_first_chunk::<IV_SIZE>() else {
            return Err(CryptoError::TruncatedRecord { len: bytes.len() });
        };
        Ok(Self {
            iv: Iv::from_bytes(*iv),
            ciphertext: ciphertext.to_vec(),
        })
    }

    /// Total encoded length in bytes.
    pub fn encoded_len(&self) -> usize {
        IV_SIZE + self.ciphertext.len()
    }
}
