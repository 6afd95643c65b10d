//! Proof issuance.
//!
//! A proof is released only after it has been re-verified against the stored
//! root. A store left inconsistent by a bug then fails loudly here instead
//! of handing a caller a proof the chain would reject.

use tracing::error;

use mintgate_core::{identity, merkle, Commitment, ProofPath};

use crate::error::{EngineError, EngineResult};
use crate::ledger::Ledger;
use crate::Engine;

/// A proof released to a caller, bound to the root it verifies against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedProof {
    pub leaf: Commitment,
    pub root: Commitment,
    pub proof: ProofPath,
}

/// Result of a proof lookup. Not being eligible is a legitimate negative
/// answer, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofOutcome {
    Eligible(IssuedProof),
    NotEligible,
}

impl<L: Ledger> Engine<L> {
    /// Look up and re-verify the inclusion proof for an identity.
    pub fn get_proof(&self, campaign_id: &str, raw_identity: &str) -> EngineResult<ProofOutcome> {
        let canonical = identity::normalize(raw_identity)?;
        let whitelist = self.store.get_whitelist(campaign_id)?;

        let Some(leaf) = whitelist.eligible.get(&canonical).copied() else {
            return Ok(ProofOutcome::NotEligible);
        };

        let corrupted = || {
            error!(
                campaign_id,
                identity = canonical.as_str(),
                "stored proof failed re-verification against stored root"
            );
            EngineError::ProofCorrupted {
                campaign_id: campaign_id.to_string(),
                identity: canonical.clone(),
            }
        };

        let proof = whitelist.proofs.get(&leaf).cloned().ok_or_else(|| corrupted())?;
        if !merkle::verify(leaf, &proof, whitelist.root) {
            return Err(corrupted());
        }

        Ok(ProofOutcome::Eligible(IssuedProof {
            leaf,
            root: whitelist.root,
            proof,
        }))
    }
}
