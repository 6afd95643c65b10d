//! Engine error taxonomy.
//!
//! Four classes, matching how callers should react:
//! - input errors (`InvalidIdentity`, `CampaignNotFound`): reject, never retry
//! - policy violations (`CannotRemoveMinted`, `AlreadyRecorded`,
//!   `SupplyExceeded`, `CampaignExists`): definitive negative outcomes
//! - consistency faults (`ProofCorrupted`, `MintConfirmedButUnlocatable`,
//!   `StateCorrupt`): persisted or on-chain state disagrees with what the
//!   engine derives; logged loudly, needs an operator
//! - transient (`LedgerUnavailable`, `Storage`): retryable with backoff

use mintgate_core::CoreError;
use mintgate_store::errors::StoreError;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    InvalidIdentity(CoreError),

    #[error("invalid campaign id: {0}")]
    InvalidCampaignId(String),

    #[error("campaign not found: {0}")]
    CampaignNotFound(String),

    #[error("campaign already exists: {0}")]
    CampaignExists(String),

    #[error("cannot remove identities with recorded mints: {}", identities.join(", "))]
    CannotRemoveMinted { identities: Vec<String> },

    #[error("mint already recorded for {identity} in campaign {campaign_id}")]
    AlreadyRecorded {
        campaign_id: String,
        identity: String,
    },

    #[error("supply exceeded for campaign {campaign_id}: max {max_supply}")]
    SupplyExceeded {
        campaign_id: String,
        max_supply: u64,
    },

    #[error("stored proof for {identity} in campaign {campaign_id} failed re-verification")]
    ProofCorrupted {
        campaign_id: String,
        identity: String,
    },

    #[error(
        "mint confirmed on-chain for {identity} in campaign {campaign_id} \
         but no matching event was found for wallet {wallet_address}"
    )]
    MintConfirmedButUnlocatable {
        campaign_id: String,
        identity: String,
        wallet_address: String,
    },

    #[error("stored state corrupt for campaign {campaign_id}: {message}")]
    StateCorrupt {
        campaign_id: String,
        message: String,
    },

    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl EngineError {
    /// Whether a caller may retry the operation unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LedgerUnavailable(_) | Self::Storage(_))
    }
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InvalidCampaignId(id) => Self::InvalidCampaignId(id),
            StoreError::CampaignNotFound(id) => Self::CampaignNotFound(id),
            StoreError::CampaignExists(id) => Self::CampaignExists(id),
            StoreError::CannotRemoveMinted { identities } => Self::CannotRemoveMinted { identities },
            StoreError::AlreadyRecorded { campaign_id, identity } => {
                Self::AlreadyRecorded { campaign_id, identity }
            }
            StoreError::SupplyExceeded { campaign_id, max_supply } => {
                Self::SupplyExceeded { campaign_id, max_supply }
            }
            StoreError::Identity(core) => Self::InvalidIdentity(core),
            // Failed self-checks are operator problems, never retried away.
            StoreError::Corrupt { campaign_id, message } => {
                Self::StateCorrupt { campaign_id, message }
            }
            other @ (StoreError::Contention { .. } | StoreError::Storage(_)) => {
                Self::Storage(other.to_string())
            }
        }
    }
}

impl From<CoreError> for EngineError {
    fn from(e: CoreError) -> Self {
        Self::InvalidIdentity(e)
    }
}
