//! Administrative whitelist operations, re-exposed on the engine.
//!
//! Thin passthroughs to the store's mutator, kept on the engine surface so
//! the embedding application wires exactly one object. Authorization is the
//! caller's concern; identities arriving here are already authenticated.

use tracing::info;

use mintgate_store::whitelist::{CampaignWhitelist, MutationOutcome};

use crate::error::EngineResult;
use crate::ledger::Ledger;
use crate::Engine;

impl<L: Ledger> Engine<L> {
    /// Create a campaign with an initial eligible set and supply cap.
    pub fn create_campaign<I, S>(
        &self,
        campaign_id: &str,
        max_supply: u64,
        initial: I,
    ) -> EngineResult<CampaignWhitelist>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let whitelist = self.store.create_campaign(campaign_id, max_supply, initial)?;
        info!(
            campaign_id,
            max_supply,
            eligible = whitelist.eligible.len(),
            root = %whitelist.root,
            "campaign created"
        );
        Ok(whitelist)
    }

    /// Current whitelist state for a campaign.
    pub fn get_whitelist(&self, campaign_id: &str) -> EngineResult<CampaignWhitelist> {
        Ok(self.store.get_whitelist(campaign_id)?)
    }

    /// Add identities; changing the set rotates the root and invalidates all
    /// previously issued proofs for the campaign.
    pub fn add_identities<I, S>(&self, campaign_id: &str, identities: I) -> EngineResult<MutationOutcome>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let out = self.store.add_identities(campaign_id, identities)?;
        if out.changed > 0 {
            info!(campaign_id, added = out.changed, root = %out.whitelist.root, "whitelist grew");
        }
        Ok(out)
    }

    /// Remove identities; refuses to drop anyone with a recorded mint.
    pub fn remove_identities<I, S>(&self, campaign_id: &str, identities: I) -> EngineResult<MutationOutcome>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let out = self.store.remove_identities(campaign_id, identities)?;
        if out.changed > 0 {
            info!(campaign_id, removed = out.changed, root = %out.whitelist.root, "whitelist shrank");
        }
        Ok(out)
    }
}
