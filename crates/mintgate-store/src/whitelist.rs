//! Campaign whitelist store and mutator.
//!
//! The whitelist for a campaign is one document: the eligible set (keyed by
//! normalized identity), the derived Merkle root, and the per-identity proof
//! cache. Mutations rebuild the tree from scratch and swap the whole
//! document with a compare-and-swap on its prior bytes, so a reader can
//! never observe a root that does not match the proofs or the eligible set.
//! Any successful mutation that changes the set changes the root, which
//! invalidates every previously issued proof for the campaign; clients
//! re-fetch proofs after whitelist changes.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use mintgate_core::{identity, merkle, Commitment, ProofPath};

use crate::errors::{StoreError, StoreResult};
use crate::kv::{BatchResult, WriteBatch};
use crate::{mint_key, supply_key, validate_campaign_id, whitelist_key, Store, CAS_RETRY_LIMIT};

/// Persisted whitelist state for one campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignWhitelist {
    pub campaign_id: String,
    pub max_supply: u64,
    /// Normalized identity -> leaf commitment.
    pub eligible: BTreeMap<String, Commitment>,
    pub root: Commitment,
    pub proofs: BTreeMap<Commitment, ProofPath>,
}

impl CampaignWhitelist {
    pub fn is_eligible(&self, normalized: &str) -> bool {
        self.eligible.contains_key(normalized)
    }
}

/// Result of a whitelist mutation.
#[derive(Debug, Clone)]
pub struct MutationOutcome {
    pub whitelist: CampaignWhitelist,
    /// Identities actually added or removed; zero means the call was a no-op
    /// and the root is unchanged.
    pub changed: usize,
}

impl Store {
    /// Create a campaign with an initial eligible set.
    pub fn create_campaign<I, S>(
        &self,
        campaign_id: &str,
        max_supply: u64,
        initial: I,
    ) -> StoreResult<CampaignWhitelist>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        validate_campaign_id(campaign_id)?;

        let mut eligible = BTreeMap::new();
        for raw in initial {
            let canonical = identity::normalize(raw.as_ref())?;
            let leaf = Commitment::digest(canonical.as_bytes());
            eligible.insert(canonical, leaf);
        }

        let (root, proofs) = rebuild_checked(campaign_id, &eligible)?;
        let doc = CampaignWhitelist {
            campaign_id: campaign_id.to_string(),
            max_supply,
            eligible,
            root,
            proofs,
        };

        let batch = WriteBatch::new()
            .expect_absent(whitelist_key(campaign_id))
            .put_json(whitelist_key(campaign_id), &doc)?
            .put_json(supply_key(campaign_id), &0u64)?;

        match self.kv().apply(&batch)? {
            BatchResult::Committed => Ok(doc),
            BatchResult::Unmet(_) => Err(StoreError::CampaignExists(campaign_id.to_string())),
        }
    }

    /// Fetch the whitelist for a campaign.
    pub fn get_whitelist(&self, campaign_id: &str) -> StoreResult<CampaignWhitelist> {
        self.load_whitelist(campaign_id).map(|(_, doc)| doc)
    }

    /// Merge identities into the eligible set and rebuild root + proofs.
    ///
    /// Idempotent: identities already present are skipped, and a call that
    /// adds nothing leaves the stored document (and root) untouched.
    pub fn add_identities<I, S>(&self, campaign_id: &str, identities: I) -> StoreResult<MutationOutcome>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let incoming = normalize_set(identities)?;

        for _ in 0..CAS_RETRY_LIMIT {
            let (prior_bytes, current) = self.load_whitelist(campaign_id)?;

            let mut eligible = current.eligible.clone();
            let mut changed = 0usize;
            for canonical in &incoming {
                if !eligible.contains_key(canonical) {
                    let leaf = Commitment::digest(canonical.as_bytes());
                    eligible.insert(canonical.clone(), leaf);
                    changed += 1;
                }
            }
            if changed == 0 {
                return Ok(MutationOutcome { whitelist: current, changed: 0 });
            }

            let (root, proofs) = rebuild_checked(campaign_id, &eligible)?;
            let doc = CampaignWhitelist { eligible, root, proofs, ..current };

            let batch = WriteBatch::new()
                .expect_value(whitelist_key(campaign_id), prior_bytes)
                .put_json(whitelist_key(campaign_id), &doc)?;

            match self.kv().apply(&batch)? {
                BatchResult::Committed => return Ok(MutationOutcome { whitelist: doc, changed }),
                // Lost the race against another mutator; reload and retry.
                BatchResult::Unmet(_) => continue,
            }
        }

        Err(StoreError::Contention { campaign_id: campaign_id.to_string() })
    }

    /// Remove identities from the eligible set and rebuild root + proofs.
    ///
    /// Fails with [`StoreError::CannotRemoveMinted`] if any identity in the
    /// removal set has a recorded mint; the mint audit trail must stay
    /// anchored to a leaf that was genuinely eligible. The absence checks are
    /// preconditions of the same batch as the swap, so a mint recorded
    /// concurrently aborts the removal rather than racing it.
    pub fn remove_identities<I, S>(&self, campaign_id: &str, identities: I) -> StoreResult<MutationOutcome>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let incoming = normalize_set(identities)?;

        for _ in 0..CAS_RETRY_LIMIT {
            let (prior_bytes, current) = self.load_whitelist(campaign_id)?;

            let removing: Vec<&String> = incoming
                .iter()
                .filter(|c| current.eligible.contains_key(*c))
                .collect();
            if removing.is_empty() {
                return Ok(MutationOutcome { whitelist: current, changed: 0 });
            }

            let mut minted = Vec::new();
            for canonical in &removing {
                let leaf = current.eligible[*canonical];
                if self.kv().get_bytes(&mint_key(campaign_id, &leaf))?.is_some() {
                    minted.push((*canonical).clone());
                }
            }
            if !minted.is_empty() {
                return Err(StoreError::CannotRemoveMinted { identities: minted });
            }

            let mut eligible = current.eligible.clone();
            for canonical in &removing {
                eligible.remove(*canonical);
            }
            let changed = removing.len();

            let (root, proofs) = rebuild_checked(campaign_id, &eligible)?;
            let doc = CampaignWhitelist { eligible, root, proofs, ..current.clone() };

            let mut batch = WriteBatch::new()
                .expect_value(whitelist_key(campaign_id), prior_bytes);
            for canonical in &removing {
                let leaf = current.eligible[*canonical];
                batch = batch.expect_absent(mint_key(campaign_id, &leaf));
            }
            let batch = batch
                .put_json(whitelist_key(campaign_id), &doc)?;

            match self.kv().apply(&batch)? {
                BatchResult::Committed => return Ok(MutationOutcome { whitelist: doc, changed }),
                // Index 0 is the document CAS; anything later is a mint that
                // landed between our check and the swap.
                BatchResult::Unmet(0) => continue,
                BatchResult::Unmet(i) => {
                    let canonical = removing[i - 1].clone();
                    return Err(StoreError::CannotRemoveMinted { identities: vec![canonical] });
                }
            }
        }

        Err(StoreError::Contention { campaign_id: campaign_id.to_string() })
    }

    pub(crate) fn load_whitelist(&self, campaign_id: &str) -> StoreResult<(Vec<u8>, CampaignWhitelist)> {
        let bytes = self
            .kv()
            .get_bytes(&whitelist_key(campaign_id))?
            .ok_or_else(|| StoreError::CampaignNotFound(campaign_id.to_string()))?;
        let doc: CampaignWhitelist = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::corrupt(campaign_id, format!("whitelist document: {e}")))?;
        Ok((bytes, doc))
    }
}

fn normalize_set<I, S>(identities: I) -> StoreResult<BTreeSet<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = BTreeSet::new();
    for raw in identities {
        out.insert(identity::normalize(raw.as_ref())?);
    }
    Ok(out)
}

/// Rebuild root + proofs for an eligible set and re-verify every proof
/// against the new root before anything is persisted. A failure here means a
/// builder bug, and it must surface before the state is committed.
fn rebuild_checked(
    campaign_id: &str,
    eligible: &BTreeMap<String, Commitment>,
) -> StoreResult<(Commitment, BTreeMap<Commitment, ProofPath>)> {
    let tree = merkle::build(eligible.values().copied());
    for (canonical, leaf) in eligible {
        let path = tree
            .proofs
            .get(leaf)
            .ok_or_else(|| StoreError::corrupt(campaign_id, format!("no proof built for {canonical}")))?;
        if !merkle::verify(*leaf, path, tree.root) {
            return Err(StoreError::corrupt(
                campaign_id,
                format!("freshly built proof for {canonical} does not verify"),
            ));
        }
    }
    Ok((tree.root, tree.proofs))
}
