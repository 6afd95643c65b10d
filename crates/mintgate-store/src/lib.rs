//! Transactional persistence for MINTGATE.
//!
//! One [`Store`] holds everything the eligibility engine persists per
//! campaign: the whitelist document (eligible set + Merkle root + proof
//! cache), mint records, and the supply counter. All mutations go through
//! conditional write batches so concurrent writers (including separate
//! processes on the SQLite backend) serialize on the backing store, not on
//! an in-process lock.

pub mod errors;
pub mod kv;
pub mod mints;
pub mod whitelist;

use std::path::{Path, PathBuf};

use anyhow::Result;
use mintgate_core::Commitment;

use crate::errors::{StoreError, StoreResult};
use crate::kv::{Kv, KvBackend};

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub root_dir: PathBuf,
    pub kv_backend: KvBackend,
}

impl StoreConfig {
    pub fn local_dev<P: AsRef<Path>>(root_dir: P) -> Result<Self> {
        let root = root_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root_dir: root,
            kv_backend: KvBackend::default(),
        })
    }

    /// In-memory store rooted in a temp-style directory; used by tests and
    /// single-process embedding.
    pub fn in_memory<P: AsRef<Path>>(root_dir: P) -> Result<Self> {
        let root = root_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root_dir: root,
            kv_backend: KvBackend::Memory,
        })
    }
}

pub struct Store {
    cfg: StoreConfig,
    kv: Kv,
}

impl Store {
    pub fn open(cfg: StoreConfig) -> Result<Self> {
        let kv = Kv::open(cfg.root_dir.join("kv"), cfg.kv_backend.clone())?;
        Ok(Self { cfg, kv })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.cfg
    }

    pub fn kv(&self) -> &Kv {
        &self.kv
    }
}

// Campaign ids become path segments of kv keys, so the separator (and the
// rest of the key punctuation) is off limits: an id containing `/` could
// alias another campaign's mint prefix.
pub(crate) fn validate_campaign_id(campaign_id: &str) -> StoreResult<()> {
    let ok = !campaign_id.is_empty()
        && campaign_id.len() <= 128
        && campaign_id
            .bytes()
            .all(|b| matches!(b, b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'.' | b'_' | b'-'));
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidCampaignId(campaign_id.to_string()))
    }
}

pub(crate) fn whitelist_key(campaign_id: &str) -> String {
    format!("campaign/{campaign_id}/whitelist")
}

pub(crate) fn supply_key(campaign_id: &str) -> String {
    format!("campaign/{campaign_id}/supply")
}

pub(crate) fn mint_key(campaign_id: &str, leaf: &Commitment) -> String {
    format!("campaign/{campaign_id}/mint/{}", leaf.to_hex())
}

pub(crate) fn mint_prefix(campaign_id: &str) -> String {
    format!("campaign/{campaign_id}/mint/")
}

// Optimistic mutations retry this many times before reporting contention.
pub(crate) const CAS_RETRY_LIMIT: usize = 32;


#[cfg(all(test, feature = "sqlite"))]
mod sqlite_tests {
    use super::*;
    use tempfile::TempDir;

    fn sqlite_cfg(td: &TempDir) -> StoreConfig {
        // Default backend is sqlite when the feature is on.
        StoreConfig::local_dev(td.path()).unwrap()
    }

    #[test]
    fn campaign_state_survives_reopen() {
        let td = TempDir::new().unwrap();

        let root = {
            let store = Store::open(sqlite_cfg(&td)).unwrap();
            let wl = store
                .create_campaign("persist", 5, ["a@x.com", "b@x.com"])
                .unwrap();
            store
                .record_mint("persist", "a@x.com", "0x1", 1, "0x01", 1)
                .unwrap();
            wl.root
        };

        let store = Store::open(sqlite_cfg(&td)).unwrap();
        let wl = store.get_whitelist("persist").unwrap();
        assert_eq!(wl.root, root);
        assert_eq!(store.minted_count("persist").unwrap(), 1);
        assert!(store.find_mint("persist", "a@x.com").unwrap().is_some());
    }
}
