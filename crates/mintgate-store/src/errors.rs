//! Store-level error types.
//!
//! Policy violations (`CannotRemoveMinted`, `AlreadyRecorded`,
//! `SupplyExceeded`, `CampaignExists`) are definitive outcomes, not
//! transient; callers must not retry them. `Storage` wraps backend faults,
//! which are retryable. `Corrupt` means persisted whitelist state failed its
//! own self-check and needs operator attention.

use mintgate_core::CoreError;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
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

    #[error(transparent)]
    Identity(#[from] CoreError),

    #[error("whitelist state corrupt for campaign {campaign_id}: {message}")]
    Corrupt {
        campaign_id: String,
        message: String,
    },

    #[error("write contention on campaign {campaign_id}: retries exhausted")]
    Contention { campaign_id: String },

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl StoreError {
    pub(crate) fn corrupt(campaign_id: &str, message: impl Into<String>) -> Self {
        Self::Corrupt {
            campaign_id: campaign_id.to_string(),
            message: message.into(),
        }
    }
}
