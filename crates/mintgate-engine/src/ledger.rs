//! Read-only port onto the on-chain mint contract.
//!
//! The engine never signs or broadcasts transactions; it only reads the
//! state the contract exposes. An implementation typically wraps an RPC
//! client; the engine is injected with one at startup.

use std::future::Future;

use mintgate_core::Commitment;

/// One historical mint event emitted by the contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintEvent {
    pub token_id: u64,
    pub tx_hash: String,
    pub block_timestamp: i64,
    /// Leaf commitment the mint was gated on.
    pub leaf: Commitment,
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Read-only view of on-chain contract state.
///
/// `mint_events` may be range-limited by the underlying client: an empty
/// result means "not found in the scanned range", never "did not mint".
pub trait Ledger: Send + Sync {
    /// The whitelist root the contract currently enforces.
    fn get_root(
        &self,
        campaign_id: &str,
    ) -> impl Future<Output = Result<Commitment, LedgerError>> + Send;

    /// Whether the contract has marked this leaf as minted.
    fn has_minted(
        &self,
        campaign_id: &str,
        leaf: Commitment,
    ) -> impl Future<Output = Result<bool, LedgerError>> + Send;

    /// Historical mint events involving a wallet, possibly incomplete.
    fn mint_events(
        &self,
        campaign_id: &str,
        wallet_address: &str,
    ) -> impl Future<Output = Result<Vec<MintEvent>, LedgerError>> + Send;
}
