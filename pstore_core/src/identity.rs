//! 512-bit content identities.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Identity size in bytes (512-bit digests).
pub const IDENTITY_SIZE: usize = 64;

/// A 64-byte content identity.
///
/// Identities are produced by whoever binds a key to content. The store treats
/// them as opaque fixed-width bytes and never recomputes them.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identity([u8; IDENTITY_SIZE]);

impl Identity {
    /// Create an Identity from raw bytes.
    pub fn from_bytes(bytes: [u8; IDENTITY_SIZE]) -> Self {
        Identity(bytes)
    }

    /// Create an Identity from a byte slice of exactly 64 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; IDENTITY_SIZE] = bytes.try_into().map_err(|_| {
            Error::invalid_identity(format!(
                "Expected {} bytes, got {}",
                IDENTITY_SIZE,
                bytes.len()
            ))
        })?;
        Ok(Identity(bytes))
    }

    /// Create an Identity from a hex string (128 hex characters).
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        if hex_str.len() != IDENTITY_SIZE * 2 {
            return Err(Error::invalid_identity(format!(
                "Expected {} hex characters, got {}",
                IDENTITY_SIZE * 2,
                hex_str.len()
            )));
        }

        let mut bytes = [0u8; IDENTITY_SIZE];
        hex::decode_to_slice(hex_str, &mut bytes)
            .map_err(|e| Error::invalid_identity(format!("Invalid hex: {}", e)))?;
        Ok(Identity(bytes))
    }

    /// Convert to hex string (128 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; IDENTITY_SIZE] {
        &self.0
    }

    /// Derive an identity from content using BLAKE3 in extendable-output mode.
    pub fn digest(data: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(data);
        let mut out = [0u8; IDENTITY_SIZE];
        hasher.finalize_xof().fill(&mut out);
        Identity(out)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self.to_hex())
    }
}

impl Serialize for Identity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Identity::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
