//! MINTGATE eligibility engine.
//!
//! The service surface the surrounding portal embeds: proof issuance over a
//! campaign whitelist, administrative whitelist mutation, reconciliation of
//! off-chain records against on-chain ledger state, and the single write
//! path for confirmed mints.
//!
//! The engine owns no ambient state: it is constructed with a [`Store`] and
//! a [`ledger::Ledger`] implementation and passed to whoever needs it.

pub mod config;
pub mod error;
pub mod ledger;
pub mod proofs;
pub mod reconcile;
pub mod recorder;
pub mod telemetry;
pub mod whitelist;

use std::sync::Arc;

use mintgate_store::Store;

use crate::config::EngineConfig;
use crate::ledger::Ledger;

pub use crate::error::{EngineError, EngineResult};

pub struct Engine<L: Ledger> {
    pub(crate) store: Arc<Store>,
    pub(crate) ledger: L,
    pub(crate) cfg: EngineConfig,
}

impl<L: Ledger> Engine<L> {
    pub fn new(store: Arc<Store>, ledger: L, cfg: EngineConfig) -> Self {
        Self { store, ledger, cfg }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }
}
