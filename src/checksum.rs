//! Structural fingerprints for schema declarations

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// SHA256 checksum of a declaration's canonical JSON form
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum(String);

impl Checksum {
    /// Compute checksum from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    /// Compute checksum from a string
    pub fn from_str(content: &str) -> Self {
        Self::from_bytes(content.as_bytes())
    }

    /// Compute checksum of any serializable value.
    ///
    /// Declaration types keep their entries in source order, so equal
    /// declarations always produce the same canonical text.
    pub fn of<T: Serialize + ?Sized>(value: &T) -> Self {
        let canonical = serde_json::to_string(value).unwrap_or_default();
        Self::from_str(&canonical)
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight hex digits, used in synthesized type names
    pub fn short(&self) -> &str {
        &self.0[..8]
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_checksum_consistency() {
        let value = json!({"list": {"valueType": "String"}});
        assert_eq!(Checksum::of(&value), Checksum::of(&value));
    }

    #[test]
    fn test_checksum_different_content() {
        let a = Checksum::of(&json!({"list": {"valueType": "String"}}));
        let b = Checksum::of(&json!({"list": {"valueType": "Int"}}));
        assert_ne!(a, b);
    }

    #[test]
    fn test_short_prefix() {
        let checksum = Checksum::from_str("abc");
        assert_eq!(checksum.short().len(), 8);
        assert!(checksum.as_str().starts_with(checksum.short()));
    }
}
