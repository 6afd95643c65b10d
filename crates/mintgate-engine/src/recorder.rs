//! The single write path for confirmed mints.
//!
//! Everything that persists a mint (the client's own confirmation call and
//! the reconciliation engine) funnels through here into the store's atomic
//! insert. At-most-once semantics and the supply cap are enforced by the
//! store's conditional batch, not by anything in-process.

use tracing::info;

use mintgate_store::mints::MintRecord;

use crate::error::EngineResult;
use crate::ledger::Ledger;
use crate::Engine;

impl<L: Ledger> Engine<L> {
    /// Persist a confirmed mint.
    pub fn record(
        &self,
        campaign_id: &str,
        raw_identity: &str,
        wallet_address: &str,
        token_id: u64,
        tx_hash: &str,
        confirmed_at: i64,
    ) -> EngineResult<MintRecord> {
        let record = self.store.record_mint(
            campaign_id,
            raw_identity,
            wallet_address,
            token_id,
            tx_hash,
            confirmed_at,
        )?;
        info!(
            campaign_id,
            identity = record.identity.as_str(),
            token_id,
            tx_hash,
            "mint recorded"
        );
        Ok(record)
    }

    /// Mint record for an identity, if one exists.
    pub fn find_mint(&self, campaign_id: &str, raw_identity: &str) -> EngineResult<Option<MintRecord>> {
        Ok(self.store.find_mint(campaign_id, raw_identity)?)
    }

    /// Current minted count for a campaign.
    pub fn minted_count(&self, campaign_id: &str) -> EngineResult<u64> {
        Ok(self.store.minted_count(campaign_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::testutil::memory_engine;
    use std::sync::Arc;

    #[test]
    fn record_then_duplicate_fails() {
        let (_td, engine) = memory_engine();
        engine.store().create_campaign("c", 5, ["a@x.com"]).unwrap();

        engine.record("c", "a@x.com", "0x1", 1, "0x01", 1).unwrap();
        assert!(matches!(
            engine.record("c", "a@x.com", "0x2", 2, "0x02", 2),
            Err(EngineError::AlreadyRecorded { .. })
        ));
        assert_eq!(engine.minted_count("c").unwrap(), 1);
    }

    #[test]
    fn supply_cap_surfaces_as_policy_error() {
        let (_td, engine) = memory_engine();
        engine
            .store()
            .create_campaign("c", 1, ["a@x.com", "b@x.com"])
            .unwrap();
        engine.record("c", "a@x.com", "0x1", 1, "0x01", 1).unwrap();

        match engine.record("c", "b@x.com", "0x2", 2, "0x02", 2) {
            Err(e @ EngineError::SupplyExceeded { .. }) => assert!(!e.is_retryable()),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_records_yield_one_insert() {
        let (_td, engine) = memory_engine();
        engine.store().create_campaign("c", 5, ["a@x.com"]).unwrap();
        let engine = Arc::new(engine);

        let mut handles = Vec::new();
        for i in 0..8u64 {
            let engine = Arc::clone(&engine);
            handles.push(tokio::spawn(async move {
                engine.record("c", "a@x.com", "0xw", i, &format!("0x{i:02}"), i as i64)
            }));
        }

        let mut successes = 0;
        let mut duplicates = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(_) => successes += 1,
                Err(EngineError::AlreadyRecorded { .. }) => duplicates += 1,
                Err(e) => panic!("unexpected: {e:?}"),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(duplicates, 7);
        assert_eq!(engine.minted_count("c").unwrap(), 1);
    }
}
