//! Encrypted progress record store for progvault.
//!
//! Each identity owns exactly two files under the store root:
//!
//! ```text
//! <root>/
//! ├── user_keys/
//! │   └── {identity}.bin   32 raw salt bytes, written once
//! └── user_data/
//!     └── {identity}.bin   IV (16 bytes) ‖ AES-256-CBC ciphertext
//! ```
//!
//! The record key is derived from the caller's password and the identity's
//! salt on every call and never written anywhere. Password verification is
//! not this crate's job: whatever password is handed in is used as-is, and a
//! wrong one surfaces as a padding error (or, rarely, garbled plaintext).

mod config;
mod error;
mod fs_util;
mod identity;
pub mod key_material;
pub mod logging;
mod store;

pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use identity::Identity;
pub use store::{RecordState, SecureRecordStore};

pub use progvault_crypto::{CryptoError, KdfParams, Salt};
