//! Identity handles used as salt/data file stems.

use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const MAX_IDENTITY_LEN: usize = 128;

/// Stable, opaque key naming one identity's salt and data files.
///
/// Restricted to ASCII alphanumerics plus `-`, `_` and `.` (not leading) so it
/// can never escape its directory.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    pub fn new(value: impl Into<String>) -> StoreResult<Self> {
        let value = value.into();
        validate(&value)?;
        Ok(Self(value))
    }

    /// A fresh random (UUID v4) identity for a new user.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn validate(value: &str) -> StoreResult<()> {
    if value.is_empty() {
        return Err(StoreError::InvalidIdentity("empty".to_string()));
    }
    if value.len() > MAX_IDENTITY_LEN {
        return Err(StoreError::InvalidIdentity(format!(
            "longer than {MAX_IDENTITY_LEN} bytes"
        )));
    }
    if value.starts_with('.') {
        return Err(StoreError::InvalidIdentity(format!(
            "{value:?} starts with '.'"
        )));
    }
    if let Some(c) = value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(StoreError::InvalidIdentity(format!(
            "{value:?} contains disallowed character {c:?}"
        )));
    }
    Ok(())
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Identity {
    type Err = StoreError;

    fn from_str(s: &str) -> StoreResult<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for Identity {
    type Error = StoreError;

    fn try_from(value: String) -> StoreResult<Self> {
        Self::new(value)
    }
}

impl TryFrom<&str> for Identity {
    type Error = StoreError;

    fn try_from(value: &str) -> StoreResult<Self> {
        Self::new(value)
    }
}

impl From<Identity> for String {
    fn from(id: Identity) -> Self {
        id.0
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_uuid_and_simple_names() {
        assert!(Identity::new("user-42").is_ok());
        assert!(Identity::new("3f2b7c1e-9a4d-4e6f-8b2a-1c0d9e8f7a6b").is_ok());
        assert!(Identity::new("alice_smith.v2").is_ok());
    }

    #[test]
    fn generated_identities_are_unique_uuids() {
        let a = Identity::generate();
        let b = Identity::generate();
        assert_ne!(a, b);
        assert!(uuid::Uuid::parse_str(a.as_str()).is_ok());
    }

    #[test]
    fn rejects_path_traversal() {
        for bad in ["", ".", "..", "../etc", "a/b", "a\\b", ".hidden", "white space", "ünï"] {
            assert!(
                matches!(Identity::new(bad), Err(StoreError::InvalidIdentity(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_overlong() {
        assert!(Identity::new("a".repeat(MAX_IDENTITY_LEN)).is_ok());
        assert!(Identity::new("a".repeat(MAX_IDENTITY_LEN + 1)).is_err());
    }

    #[test]
    fn serde_validates() {
        let id: Identity = serde_json::from_str("\"user-42\"").unwrap();
        assert_eq!(id.as_str(), "user-42");
        assert!(serde_json::from_str::<Identity>("\"../x\"").is_err());
    }
}
