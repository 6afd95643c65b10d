//! Mint records and supply accounting.
//!
//! One record per (campaign, identity), written exactly once after on-chain
//! confirmation and never updated. The record insert and the supply counter
//! bump commit as one conditional batch: the record key must be absent and
//! the counter must still hold the value we read. Two racing calls for the
//! same identity therefore produce one insert and one `AlreadyRecorded`,
//! never two records.

use serde::{Deserialize, Serialize};

use mintgate_core::{identity, Commitment};

use crate::errors::{StoreError, StoreResult};
use crate::kv::{BatchResult, WriteBatch};
use crate::{mint_key, mint_prefix, supply_key, Store, CAS_RETRY_LIMIT};

/// A confirmed mint, persisted off-chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintRecord {
    pub campaign_id: String,
    /// Normalized identity the mint was gated on.
    pub identity: String,
    pub wallet_address: String,
    pub token_id: u64,
    pub tx_hash: String,
    /// Unix seconds of on-chain confirmation.
    pub confirmed_at: i64,
}

impl Store {
    /// Persist a confirmed mint, enforcing at-most-once semantics and the
    /// campaign supply cap.
    ///
    /// The supply cap here is defense-in-depth; the ledger contract is the
    /// true enforcer.
    pub fn record_mint(
        &self,
        campaign_id: &str,
        raw_identity: &str,
        wallet_address: &str,
        token_id: u64,
        tx_hash: &str,
        confirmed_at: i64,
    ) -> StoreResult<MintRecord> {
        let canonical = identity::normalize(raw_identity)?;
        let leaf = Commitment::digest(canonical.as_bytes());

        // Campaign must exist; this also gives us the supply cap.
        let (_, whitelist) = self.load_whitelist(campaign_id)?;
        let max_supply = whitelist.max_supply;

        let record = MintRecord {
            campaign_id: campaign_id.to_string(),
            identity: canonical.clone(),
            wallet_address: wallet_address.to_string(),
            token_id,
            tx_hash: tx_hash.to_string(),
            confirmed_at,
        };
        let record_key = mint_key(campaign_id, &leaf);

        for _ in 0..CAS_RETRY_LIMIT {
            // An existing record is the definitive answer for this identity,
            // even when the campaign is sold out.
            if self.kv().get_bytes(&record_key)?.is_some() {
                return Err(StoreError::AlreadyRecorded {
                    campaign_id: campaign_id.to_string(),
                    identity: canonical,
                });
            }

            let counter_bytes = self
                .kv()
                .get_bytes(&supply_key(campaign_id))?
                .ok_or_else(|| StoreError::corrupt(campaign_id, "supply counter missing"))?;
            let minted: u64 = serde_json::from_slice(&counter_bytes)
                .map_err(|e| StoreError::corrupt(campaign_id, format!("supply counter: {e}")))?;

            if minted >= max_supply {
                return Err(StoreError::SupplyExceeded {
                    campaign_id: campaign_id.to_string(),
                    max_supply,
                });
            }

            let batch = WriteBatch::new()
                .expect_absent(record_key.clone())
                .expect_value(supply_key(campaign_id), counter_bytes)
                .put_json(record_key.clone(), &record)?
                .put_json(supply_key(campaign_id), &(minted + 1))?;

            match self.kv().apply(&batch)? {
                BatchResult::Committed => return Ok(record),
                BatchResult::Unmet(0) => {
                    return Err(StoreError::AlreadyRecorded {
                        campaign_id: campaign_id.to_string(),
                        identity: canonical,
                    });
                }
                // Counter moved under us; re-read and retry.
                BatchResult::Unmet(_) => continue,
            }
        }

        Err(StoreError::Contention { campaign_id: campaign_id.to_string() })
    }

    /// Look up the mint record for an identity, if one exists.
    pub fn find_mint(&self, campaign_id: &str, raw_identity: &str) -> StoreResult<Option<MintRecord>> {
        let canonical = identity::normalize(raw_identity)?;
        let leaf = Commitment::digest(canonical.as_bytes());
        let Some(bytes) = self.kv().get_bytes(&mint_key(campaign_id, &leaf))? else {
            return Ok(None);
        };
        let record = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::corrupt(campaign_id, format!("mint record: {e}")))?;
        Ok(Some(record))
    }

    /// Current supply counter for a campaign.
    pub fn minted_count(&self, campaign_id: &str) -> StoreResult<u64> {
        let bytes = self
            .kv()
            .get_bytes(&supply_key(campaign_id))?
            .ok_or_else(|| StoreError::CampaignNotFound(campaign_id.to_string()))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::corrupt(campaign_id, format!("supply counter: {e}")))
    }

    /// All mint records for a campaign, ordered by leaf hex.
    pub fn list_mints(&self, campaign_id: &str) -> StoreResult<Vec<MintRecord>> {
        let keys = self.kv().list_prefix(&mint_prefix(campaign_id))?;
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            let Some(bytes) = self.kv().get_bytes(&key)? else { continue };
            let record: MintRecord = serde_json::from_slice(&bytes)
                .map_err(|e| StoreError::corrupt(campaign_id, format!("mint record: {e}")))?;
            out.push(record);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::open_memory_store;

    #[test]
    fn record_then_find() {
        let (_td, store) = open_memory_store();
        store.create_campaign("c", 10, ["a@x.com"]).unwrap();

        let rec = store
            .record_mint("c", "a@x.com", "0xabc", 1, "0xdeadbeef", 1_700_000_000)
            .unwrap();
        assert_eq!(rec.identity, "a@x.com");
        assert_eq!(store.minted_count("c").unwrap(), 1);

        let found = store.find_mint("c", " A@X.com ").unwrap().unwrap();
        assert_eq!(found, rec);
    }

    #[test]
    fn second_record_for_same_identity_fails() {
        let (_td, store) = open_memory_store();
        store.create_campaign("c", 10, ["a@x.com"]).unwrap();
        store
            .record_mint("c", "a@x.com", "0xabc", 1, "0x01", 1)
            .unwrap();

        match store.record_mint("c", "A@x.com", "0xdef", 2, "0x02", 2) {
            Err(StoreError::AlreadyRecorded { identity, .. }) => assert_eq!(identity, "a@x.com"),
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(store.minted_count("c").unwrap(), 1);
    }

    #[test]
    fn duplicate_at_supply_cap_reports_already_recorded() {
        let (_td, store) = open_memory_store();
        store.create_campaign("c", 1, ["a@x.com"]).unwrap();
        store.record_mint("c", "a@x.com", "0x1", 1, "0x01", 1).unwrap();

        // The campaign is sold out, but the duplicate outcome must win.
        match store.record_mint("c", "a@x.com", "0x2", 2, "0x02", 2) {
            Err(StoreError::AlreadyRecorded { identity, .. }) => assert_eq!(identity, "a@x.com"),
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(store.minted_count("c").unwrap(), 1);
    }

    #[test]
    fn supply_cap_enforced() {
        let (_td, store) = open_memory_store();
        store
            .create_campaign("c", 2, ["a@x.com", "b@x.com", "c@x.com"])
            .unwrap();
        store.record_mint("c", "a@x.com", "0x1", 1, "0x01", 1).unwrap();
        store.record_mint("c", "b@x.com", "0x2", 2, "0x02", 2).unwrap();

        assert!(matches!(
            store.record_mint("c", "c@x.com", "0x3", 3, "0x03", 3),
            Err(StoreError::SupplyExceeded { max_supply: 2, .. })
        ));
        assert_eq!(store.minted_count("c").unwrap(), 2);
    }

    #[test]
    fn record_requires_campaign() {
        let (_td, store) = open_memory_store();
        assert!(matches!(
            store.record_mint("missing", "a@x.com", "0x1", 1, "0x01", 1),
            Err(StoreError::CampaignNotFound(_))
        ));
    }

    #[test]
    fn minted_identity_blocks_removal() {
        let (_td, store) = open_memory_store();
        store.create_campaign("c", 10, ["a@x.com", "b@x.com"]).unwrap();
        store.record_mint("c", "a@x.com", "0x1", 1, "0x01", 1).unwrap();

        match store.remove_identities("c", ["a@x.com", "b@x.com"]) {
            Err(StoreError::CannotRemoveMinted { identities }) => {
                assert_eq!(identities, vec!["a@x.com".to_string()]);
            }
            other => panic!("unexpected: {other:?}"),
        }

        // The failed removal left the whitelist untouched.
        let wl = store.get_whitelist("c").unwrap();
        assert!(wl.is_eligible("a@x.com"));
        assert!(wl.is_eligible("b@x.com"));
    }

    #[test]
    fn list_mints_returns_all_records() {
        let (_td, store) = open_memory_store();
        store.create_campaign("c", 10, ["a@x.com", "b@x.com"]).unwrap();
        store.record_mint("c", "a@x.com", "0x1", 1, "0x01", 1).unwrap();
        store.record_mint("c", "b@x.com", "0x2", 2, "0x02", 2).unwrap();

        let all = store.list_mints("c").unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(store.minted_count("c").unwrap(), all.len() as u64);
    }
}
