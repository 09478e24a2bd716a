//! Salt handling and password-based key derivation.

use crate::error::{CryptoError, CryptoResult};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use rand::TryRngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use std::time::Instant;
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Derived key size in bytes (AES-256).
pub const KEY_SIZE: usize = 32;

/// Salt size in bytes.
pub const SALT_SIZE: usize = 32;

/// PBKDF2 iteration count used unless configured otherwise
/// (OWASP recommendation for PBKDF2-HMAC-SHA256).
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 600_000;

/// Lowest PBKDF2 iteration count accepted by [`KdfParams::validate`].
///
/// This is a floor only. Records written by older PBKDF2-HMAC-SHA1 tooling at
/// the same count do not derive the same key and cannot be read.
pub const MIN_PBKDF2_ITERATIONS: u32 = 1_000;

/// Per-identity random salt mixed into key derivation.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Salt([u8; SALT_SIZE]);

impl Salt {
    /// Generates a new salt from the operating system CSPRNG.
    pub fn random() -> CryptoResult<Self> {
        let mut bytes = [0u8; SALT_SIZE];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| CryptoError::Rng(e.to_string()))?;
        Ok(Self(bytes))
    }

    pub fn from_bytes(bytes: [u8; SALT_SIZE]) -> Self {
        Self(bytes)
    }

    /// Builds a salt from a slice that must be exactly [`SALT_SIZE`] bytes.
    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        let arr: [u8; SALT_SIZE] = bytes.try_into().map_err(|_| CryptoError::InvalidSaltLength {
            expected: SALT_SIZE,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; SALT_SIZE] {
        &self.0
    }
}

/// Symmetric key derived from a password. Never persisted.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    bytes: [u8; KEY_SIZE],
}

impl DerivedKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKey([REDACTED])")
    }
}

impl PartialEq for DerivedKey {
    fn eq(&self, other: &Self) -> bool {
        // Constant time over the full key.
        self.bytes
            .iter()
            .zip(other.bytes.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl Eq for DerivedKey {}

/// Key derivation function and its cost parameters.
///
/// Serialized with an `algorithm` tag, e.g.
/// `{"algorithm":"pbkdf2_sha256","iterations":600000}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum KdfParams {
    /// PBKDF2 with HMAC-SHA256.
    Pbkdf2Sha256 { iterations: u32 },
    /// Argon2id, version 0x13.
    Argon2id {
        memory_kib: u32,
        iterations: u32,
        parallelism: u32,
    },
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::Pbkdf2Sha256 {
            iterations: DEFAULT_PBKDF2_ITERATIONS,
        }
    }
}

impl KdfParams {
    /// Short algorithm name, safe to log.
    pub fn algorithm(&self) -> &'static str {
        match self {
            Self::Pbkdf2Sha256 { .. } => "pbkdf2_sha256",
            Self::Argon2id { .. } => "argon2id",
        }
    }

    /// Checks the cost parameters without deriving anything.
    pub fn validate(&self) -> CryptoResult<()> {
        match *self {
            Self::Pbkdf2Sha256 { iterations } => {
                if iterations < MIN_PBKDF2_ITERATIONS {
                    return Err(CryptoError::InvalidKdfParams(format!(
                        "pbkdf2 iterations {iterations} below minimum {MIN_PBKDF2_ITERATIONS}"
                    )));
                }
                Ok(())
            }
            Self::Argon2id { .. } => self.argon2_params().map(|_| ()),
        }
    }

    fn argon2_params(&self) -> CryptoResult<Params> {
        match *self {
            Self::Argon2id {
                memory_kib,
                iterations,
                parallelism,
            } => Params::new(memory_kib, iterations, parallelism, Some(KEY_SIZE))
                .map_err(|e| CryptoError::InvalidKdfParams(format!("argon2id: {e}"))),
            Self::Pbkdf2Sha256 { .. } => Err(CryptoError::InvalidKdfParams(
                "not an argon2id parameter set".to_string(),
            )),
        }
    }
}

/// Derives a [`KEY_SIZE`]-byte key from `password` and `salt`.
///
/// Deterministic for identical inputs and deliberately slow. Performs no I/O.
pub fn derive_key(password: &str, salt: &Salt, params: &KdfParams) -> CryptoResult<DerivedKey> {
    params.validate()?;
    let started = Instant::now();
    let mut out = [0u8; KEY_SIZE];

    match *params {
        KdfParams::Pbkdf2Sha256 { iterations } => {
            pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), iterations, &mut out);
        }
        KdfParams::Argon2id { .. } => {
            let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.argon2_params()?);
            if let Err(e) = argon2.hash_password_into(password.as_bytes(), salt.as_bytes(), &mut out) {
                out.zeroize();
                return Err(CryptoError::KeyDerivation(e.to_string()));
            }
        }
    }

    debug!(
        algorithm = params.algorithm(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "derived record key"
    );

    let key = DerivedKey::from_bytes(out);
    out.zeroize();
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAST: KdfParams = KdfParams::Pbkdf2Sha256 {
        iterations: MIN_PBKDF2_ITERATIONS,
    };

    #[test]
    fn random_salts_differ() {
        let a = Salt::random().unwrap();
        let b = Salt::random().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn salt_from_slice_rejects_wrong_length() {
        let err = Salt::from_slice(&[0u8; 31]).unwrap_err();
        assert!(matches!(
            err,
            CryptoError::InvalidSaltLength {
                expected: 32,
                actual: 31
            }
        ));
        assert!(Salt::from_slice(&[7u8; 32]).is_ok());
    }

    #[test]
    fn derivation_is_deterministic() {
        let salt = Salt::from_bytes([1u8; SALT_SIZE]);
        let k1 = derive_key("root", &salt, &FAST).unwrap();
        let k2 = derive_key("root", &salt, &FAST).unwrap();
        assert_eq!(k1, k2);
    }

    #[test]
    fn different_password_or_salt_changes_key() {
        let salt = Salt::from_bytes([1u8; SALT_SIZE]);
        let other_salt = Salt::from_bytes([2u8; SALT_SIZE]);
        let base = derive_key("root", &salt, &FAST).unwrap();
        assert_ne!(base, derive_key("toor", &salt, &FAST).unwrap());
        assert_ne!(base, derive_key("root", &other_salt, &FAST).unwrap());
    }

    #[test]
    fn pbkdf2_matches_known_vector() {
        // RFC 7914 section 11, first PBKDF2-HMAC-SHA256 vector.
        let mut out = [0u8; 32];
        pbkdf2::pbkdf2_hmac::<Sha256>(b"passwd", b"salt", 1, &mut out);
        assert_eq!(
            &out[..8],
            &[0x55, 0xac, 0x04, 0x6e, 0x56, 0xe3, 0x08, 0x9f]
        );
    }

    #[test]
    fn argon2id_derives_distinct_key_from_pbkdf2() {
        let salt = Salt::from_bytes([9u8; SALT_SIZE]);
        let argon = KdfParams::Argon2id {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        };
        let a1 = derive_key("root", &salt, &argon).unwrap();
        let a2 = derive_key("root", &salt, &argon).unwrap();
        assert_eq!(a1, a2);
        assert_ne!(a1, derive_key("root", &salt, &FAST).unwrap());
    }

    #[test]
    fn weak_params_rejected() {
        let salt = Salt::from_bytes([0u8; SALT_SIZE]);
        let weak = KdfParams::Pbkdf2Sha256 { iterations: 1 };
        assert!(matches!(
            derive_key("root", &salt, &weak),
            Err(CryptoError::InvalidKdfParams(_))
        ));
        let floor = |iterations| KdfParams::Pbkdf2Sha256 { iterations }.validate();
        assert!(floor(MIN_PBKDF2_ITERATIONS).is_ok());
        assert!(floor(MIN_PBKDF2_ITERATIONS - 1).is_err());

        let bad_argon = KdfParams::Argon2id {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        };
        assert!(matches!(
            bad_argon.validate(),
            Err(CryptoError::InvalidKdfParams(_))
        ));
    }

    #[test]
    fn default_params_are_explicit() {
        assert_eq!(
            KdfParams::default(),
            KdfParams::Pbkdf2Sha256 { iterations: 600_000 }
        );
        assert!(KdfParams::default().validate().is_ok());
    }

    #[test]
    fn derived_key_debug_is_redacted() {
        let key = DerivedKey::from_bytes([0xAB; KEY_SIZE]);
        let shown = format!("{key:?}");
        assert_eq!(shown, "DerivedKey([REDACTED])");
        assert!(!shown.contains("171"));
    }
}
