//! Identity normalization and leaf hashing.
//!
//! An identity is an email-like string supplied by an already-authenticated
//! caller. Before hashing it is canonicalized: surrounding whitespace trimmed,
//! then lower-cased. Two inputs that canonicalize identically map to the same
//! leaf commitment, so `" Foo@Bar.com "` and `"foo@bar.com"` are one identity.

use crate::commitment::Commitment;
use crate::errors::{CoreError, CoreResult};

/// Canonical form of an identity string.
///
/// Rejects inputs that are empty after trimming or contain control
/// characters; those cannot correspond to a real registered identity.
pub fn normalize(raw: &str) -> CoreResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CoreError::invalid_identity("empty after trimming"));
    }
    if trimmed.chars().any(|c| c.is_control()) {
        return Err(CoreError::invalid_identity("contains control characters"));
    }
    Ok(trimmed.to_lowercase())
}

/// Leaf commitment for an identity: Keccak-256 of the normalized UTF-8 bytes.
///
/// This must match the leaf scheme of the on-chain verifier bit-for-bit.
pub fn leaf_commitment(raw: &str) -> CoreResult<Commitment> {
    let canonical = normalize(raw)?;
    Ok(Commitment::digest(canonical.as_bytes()))
}
