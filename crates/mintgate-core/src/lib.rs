//! Deterministic eligibility primitives for MINTGATE.
//!
//! This crate holds the pure, side-effect-free pieces of the mint
//! eligibility engine:
//! - identity normalization and Keccak-256 leaf commitments
//! - the sorted-pair Merkle tree builder
//! - proof verification
//!
//! Design goals:
//! - deterministic roots and proofs regardless of construction order
//! - explicit edge-case behavior (empty set, singleton set)
//! - bit-for-bit compatibility with the on-chain verification convention

pub mod commitment;
pub mod errors;
pub mod identity;
pub mod merkle;

pub use commitment::Commitment;
pub use errors::{CoreError, CoreResult};
pub use merkle::{MerkleTree, ProofPath};
