//! Fixed-size leaf commitments.
//!
//! A [`Commitment`] is a 32-byte Keccak-256 digest. Commitments are stored and
//! compared, never reversed. Hex encoding is lowercase everywhere; this is the
//! form exchanged at transport boundaries and must match the on-chain contract
//! byte-for-byte.

use std::fmt::{self, Display};

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};

use crate::errors::{CoreError, CoreResult};

/// A 32-byte Keccak-256 commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Commitment(pub [u8; 32]);

impl Commitment {
    /// Keccak-256 of arbitrary bytes.
    pub fn digest(bytes: &[u8]) -> Self {
        let mut h = Keccak256::new();
        h.update(bytes);
        let out = h.finalize();
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&out);
        Self(arr)
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex encoding (64 chars).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a 64-char hex string into a commitment.
    pub fn from_hex(s: &str) -> CoreResult<Self> {
        if s.len() != 64 {
            return Err(CoreError::decode("expected 32-byte hex digest (64 chars)"));
        }
        let bytes = hex::decode(s).map_err(|e| CoreError::decode(e.to_string()))?;
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Commitment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Commitment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HexVisitor;

        impl Visitor<'_> for HexVisitor {
            type Value = Commitment;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a 64-char lowercase hex string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Commitment, E> {
                Commitment::from_hex(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(HexVisitor)
    }
}
