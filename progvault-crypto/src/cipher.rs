//! AES-256-CBC record encryption with PKCS#7 padding.

use crate::error::{CryptoError, CryptoResult};
use crate::key::DerivedKey;
use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::rngs::OsRng;
use rand::TryRngCore;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// CBC initialization vector size in bytes.
pub const IV_SIZE: usize = 16;

/// Initialization vector for a single encryption.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Iv([u8; IV_SIZE]);

impl Iv {
    /// Generates a fresh IV from the operating system CSPRNG.
    pub fn random() -> CryptoResult<Self> {
        let mut bytes = [0u8; IV_SIZE];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| CryptoError::Rng(e.to_string()))?;
        Ok(Self(bytes))
    }

    pub fn from_bytes(bytes: [u8; IV_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; IV_SIZE] {
        &self.0
    }
}

/// Encrypts `plaintext` under `key` with a newly generated IV.
///
/// Returns the IV and the padded ciphertext. The caller stores the IV next to
/// the ciphertext; it is never reused for another encryption.
pub fn encrypt(key: &DerivedKey, plaintext: &[u8]) -> CryptoResult<(Iv, Vec<u8>)> {
    let iv = Iv::random()?;
    let ciphertext = Aes256CbcEnc::new(key.as_bytes().into(), iv.as_bytes().into())
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext);
    Ok((iv, ciphertext))
}

/// Decrypts `ciphertext` with `key` and `iv`, then strips PKCS#7 padding.
///
/// A wrong key almost always shows up as [`CryptoError::Padding`]. Nothing
/// authenticates the result, so a clean unpad does not prove the key was right.
pub fn decrypt(key: &DerivedKey, iv: &Iv, ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(CryptoError::CiphertextLength {
            len: ciphertext.len(),
        });
    }

    Aes256CbcDec::new(key.as_bytes().into(), iv.as_bytes().into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CryptoError::Padding)
}
