//! Reconciliation of off-chain records against on-chain state.
//!
//! The ledger is authoritative. A mint can land on-chain without the client
//! ever completing its follow-up "record mint" call (crash, closed tab,
//! network failure), at which point the off-chain database has silently
//! fallen behind. Reconciliation is the repair path: it is idempotent, safe
//! to run concurrently for the same identity, and it never guesses: a mint
//! the ledger confirms but whose event cannot be located is surfaced as an
//! error, because that is a gap in supply accounting an operator must see.

use std::future::Future;

use tracing::{debug, error, info, warn};

use mintgate_core::{identity, Commitment};
use mintgate_store::errors::StoreError;
use mintgate_store::mints::MintRecord;

use crate::error::{EngineError, EngineResult};
use crate::ledger::{Ledger, LedgerError};
use crate::Engine;

/// Result of a reconciliation pass for one identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The mint is now (or already was) recorded off-chain.
    Recorded(MintRecord),
    /// Nothing to reconcile yet: the ledger shows no mint for this leaf.
    Pending,
}

impl<L: Ledger> Engine<L> {
    /// Bring the off-chain record for one identity in line with the ledger.
    pub async fn reconcile(
        &self,
        campaign_id: &str,
        raw_identity: &str,
        wallet_address: &str,
    ) -> EngineResult<ReconcileOutcome> {
        let canonical = identity::normalize(raw_identity)?;
        let leaf = Commitment::digest(canonical.as_bytes());

        // Campaign must exist before we consult the ledger for it.
        self.store.get_whitelist(campaign_id)?;

        // Common case on repeated calls: already reconciled.
        if let Some(record) = self.store.find_mint(campaign_id, &canonical)? {
            debug!(campaign_id, identity = canonical.as_str(), "mint already recorded");
            return Ok(ReconcileOutcome::Recorded(record));
        }

        let minted = self
            .ledger_call(self.ledger.has_minted(campaign_id, leaf))
            .await?;
        if !minted {
            return Ok(ReconcileOutcome::Pending);
        }

        let events = self
            .ledger_call(self.ledger.mint_events(campaign_id, wallet_address))
            .await?;

        let Some(event) = events.into_iter().find(|e| e.leaf == leaf) else {
            // Event-log range limitation, or the token moved wallets. Either
            // way the supply accounting has a hole that needs an operator.
            error!(
                campaign_id,
                identity = canonical.as_str(),
                wallet_address,
                "ledger confirms mint but no matching event located"
            );
            return Err(EngineError::MintConfirmedButUnlocatable {
                campaign_id: campaign_id.to_string(),
                identity: canonical,
                wallet_address: wallet_address.to_string(),
            });
        };

        match self.store.record_mint(
            campaign_id,
            &canonical,
            wallet_address,
            event.token_id,
            &event.tx_hash,
            event.block_timestamp,
        ) {
            Ok(record) => {
                info!(
                    campaign_id,
                    identity = canonical.as_str(),
                    token_id = record.token_id,
                    "recovered mint from ledger"
                );
                Ok(ReconcileOutcome::Recorded(record))
            }
            // A concurrent reconciler or the client's own record call won the
            // race; return the record it wrote.
            Err(StoreError::AlreadyRecorded { .. }) => {
                let record = self
                    .store
                    .find_mint(campaign_id, &canonical)?
                    .ok_or_else(|| EngineError::Storage("record vanished after insert race".to_string()))?;
                Ok(ReconcileOutcome::Recorded(record))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Compare the stored whitelist root with the root the contract enforces.
    ///
    /// A mismatch is expected transiently after an admin mutation, until the
    /// contract root is rotated; persistent mismatch means proofs issued here
    /// will be rejected on-chain.
    pub async fn root_in_sync(&self, campaign_id: &str) -> EngineResult<bool> {
        let whitelist = self.store.get_whitelist(campaign_id)?;
        let on_chain = self
            .ledger_call(self.ledger.get_root(campaign_id))
            .await?;
        if on_chain != whitelist.root {
            warn!(
                campaign_id,
                stored = %whitelist.root,
                on_chain = %on_chain,
                "whitelist root differs from on-chain root"
            );
        }
        Ok(on_chain == whitelist.root)
    }

    pub(crate) async fn ledger_call<T>(
        &self,
        fut: impl Future<Output = Result<T, LedgerError>>,
    ) -> EngineResult<T> {
        match tokio::time::timeout(self.cfg.ledger_timeout(), fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(EngineError::LedgerUnavailable(e.to_string())),
            Err(_) => Err(EngineError::LedgerUnavailable(format!(
                "ledger call timed out after {}ms",
                self.cfg.ledger_timeout_ms
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::ledger::scripted::ScriptedLedger;
    use crate::ledger::MintEvent;
    use crate::testutil::memory_engine;
    use crate::Engine;
    use mintgate_core::identity::leaf_commitment;
    use mintgate_store::{Store, StoreConfig};
    use std::sync::Arc;
    use std::time::Duration;

    fn setup(engine: &Engine<ScriptedLedger>) -> Commitment {
        engine
            .store()
            .create_campaign("c", 10, ["a@x.com", "b@x.com"])
            .unwrap();
        leaf_commitment("a@x.com").unwrap()
    }

    #[tokio::test]
    async fn not_minted_is_pending() {
        let (_td, engine) = memory_engine();
        setup(&engine);
        let out = engine.reconcile("c", "a@x.com", "0xwallet").await.unwrap();
        assert_eq!(out, ReconcileOutcome::Pending);
    }

    #[tokio::test]
    async fn minted_with_event_gets_recorded() {
        let (_td, engine) = memory_engine();
        let leaf = setup(&engine);
        engine.ledger.mark_minted("c", leaf);
        engine.ledger.push_event(
            "c",
            "0xwallet",
            MintEvent { token_id: 7, tx_hash: "0xaa".to_string(), block_timestamp: 1_700_000_000, leaf },
        );

        let out = engine.reconcile("c", "a@x.com", "0xwallet").await.unwrap();
        match out {
            ReconcileOutcome::Recorded(rec) => {
                assert_eq!(rec.token_id, 7);
                assert_eq!(rec.identity, "a@x.com");
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(engine.store().minted_count("c").unwrap(), 1);
    }

    #[tokio::test]
    async fn reconcile_is_idempotent() {
        let (_td, engine) = memory_engine();
        let leaf = setup(&engine);
        engine.ledger.mark_minted("c", leaf);
        engine.ledger.push_event(
            "c",
            "0xwallet",
            MintEvent { token_id: 7, tx_hash: "0xaa".to_string(), block_timestamp: 1, leaf },
        );

        let first = engine.reconcile("c", "a@x.com", "0xwallet").await.unwrap();
        let second = engine.reconcile("c", "a@x.com", "0xwallet").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(engine.store().minted_count("c").unwrap(), 1);
    }

    #[tokio::test]
    async fn minted_without_event_is_unlocatable_not_pending() {
        let (_td, engine) = memory_engine();
        let leaf = setup(&engine);
        engine.ledger.mark_minted("c", leaf);
        // No event pushed: scanning returns an empty sequence.

        match engine.reconcile("c", "a@x.com", "0xwallet").await {
            Err(EngineError::MintConfirmedButUnlocatable { identity, .. }) => {
                assert_eq!(identity, "a@x.com");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn event_for_other_leaf_does_not_match() {
        let (_td, engine) = memory_engine();
        let leaf = setup(&engine);
        let other = leaf_commitment("b@x.com").unwrap();
        engine.ledger.mark_minted("c", leaf);
        engine.ledger.push_event(
            "c",
            "0xwallet",
            MintEvent { token_id: 9, tx_hash: "0xbb".to_string(), block_timestamp: 1, leaf: other },
        );

        assert!(matches!(
            engine.reconcile("c", "a@x.com", "0xwallet").await,
            Err(EngineError::MintConfirmedButUnlocatable { .. })
        ));
    }

    #[tokio::test]
    async fn slow_ledger_times_out_as_retryable() {
        let td = tempfile::TempDir::new().unwrap();
        let store = Arc::new(Store::open(StoreConfig::in_memory(td.path()).unwrap()).unwrap());
        let ledger = ScriptedLedger::with_delay(Duration::from_millis(50));
        let cfg = EngineConfig {
            ledger_timeout_ms: 5,
            ..Default::default()
        };
        let engine = Engine::new(store, ledger, cfg);
        engine.store().create_campaign("c", 10, ["a@x.com"]).unwrap();

        match engine.reconcile("c", "a@x.com", "0xwallet").await {
            Err(e @ EngineError::LedgerUnavailable(_)) => assert!(e.is_retryable()),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_campaign_rejected_before_ledger_query() {
        let (_td, engine) = memory_engine();
        assert!(matches!(
            engine.reconcile("ghost", "a@x.com", "0xwallet").await,
            Err(EngineError::CampaignNotFound(_))
        ));
    }

    #[tokio::test]
    async fn root_sync_check_matches_ledger() {
        let (_td, engine) = memory_engine();
        let wl = engine
            .store()
            .create_campaign("c", 10, ["a@x.com", "b@x.com"])
            .unwrap();
        engine.ledger.set_root("c", wl.root);
        assert!(engine.root_in_sync("c").await.unwrap());

        // Admin mutation changes the stored root; ledger still has the old one.
        engine.store().add_identities("c", ["c@x.com"]).unwrap();
        assert!(!engine.root_in_sync("c").await.unwrap());
    }
}
