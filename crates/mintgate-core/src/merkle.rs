//! Sorted-pair Merkle tree over leaf commitments.
//!
//! Construction rules:
//! - Leaves form a set; duplicates collapse (whitelist membership is binary).
//! - Each level is sorted by node value, then adjacent nodes are paired.
//! - A parent hashes its children in byte-wise ascending order
//!   (keccak256(min || max)), so roots and proofs are independent of leaf
//!   insertion order and proof paths need no left/right flags.
//! - A lone node at an odd level is promoted unchanged to the next level;
//!   the last element is never duplicated.
//!
//! The same convention must be implemented by the on-chain verifier. The
//! off-chain side re-derives the root from scratch after every whitelist
//! mutation; nothing is patched incrementally.

use std::collections::{BTreeMap, BTreeSet};

use crate::commitment::Commitment;

/// Sibling hashes on the path from a leaf to the root, leaf-adjacent first.
pub type ProofPath = Vec<Commitment>;

/// The result of building a tree: one root, one proof per distinct leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    pub root: Commitment,
    pub proofs: BTreeMap<Commitment, ProofPath>,
}

/// Root of the empty set: Keccak-256 of the empty byte string.
pub fn empty_root() -> Commitment {
    Commitment::digest(b"")
}

/// Build a tree over a set of leaf commitments.
///
/// Deterministic: any iteration order over the same set yields the same root
/// and the same proof for each leaf. Edge cases: an empty set produces
/// [`empty_root`] and no proofs; a singleton set produces `root == leaf` with
/// an empty proof path.
pub fn build<I>(leaves: I) -> MerkleTree
where
    I: IntoIterator<Item = Commitment>,
{
    let set: BTreeSet<Commitment> = leaves.into_iter().collect();
    if set.is_empty() {
        return MerkleTree { root: empty_root(), proofs: BTreeMap::new() };
    }

    let leaf_list: Vec<Commitment> = set.into_iter().collect();
    let mut paths: Vec<ProofPath> = vec![Vec::new(); leaf_list.len()];

    // Each node carries the indices of the leaves beneath it so sibling
    // hashes can be appended to every affected path as levels collapse.
    let mut level: Vec<(Commitment, Vec<usize>)> = leaf_list
        .iter()
        .enumerate()
        .map(|(i, c)| (*c, vec![i]))
        .collect();

    while level.len() > 1 {
        level.sort_by(|a, b| a.0.cmp(&b.0));

        let mut next: Vec<(Commitment, Vec<usize>)> = Vec::with_capacity((level.len() + 1) / 2);
        for pair in level.chunks(2) {
            match pair {
                [left, right] => {
                    for &i in &left.1 {
                        paths[i].push(right.0);
                    }
                    for &i in &right.1 {
                        paths[i].push(left.0);
                    }
                    let mut under = left.1.clone();
                    under.extend_from_slice(&right.1);
                    next.push((hash_pair(&left.0, &right.0), under));
                }
                [lone] => {
                    // Odd node count: promote unchanged.
                    next.push(lone.clone());
                }
                _ => unreachable!("chunks(2) yields slices of length 1 or 2"),
            }
        }
        level = next;
    }

    let root = level[0].0;
    let proofs = leaf_list.into_iter().zip(paths).collect();
    MerkleTree { root, proofs }
}

/// Verify that `leaf` is committed under `root` via `path`.
///
/// Folds the leaf through each sibling with the sorted-pair rule and compares
/// byte-for-byte. Pure; a malformed path simply fails to verify.
pub fn verify(leaf: Commitment, path: &[Commitment], root: Commitment) -> bool {
    let computed = path.iter().fold(leaf, |acc, sib| hash_pair(&acc, sib));
    computed == root
}

/// Parent hash under the sorted-pair rule: keccak256(min(a,b) || max(a,b)).
pub fn hash_pair(a: &Commitment, b: &Commitment) -> Commitment {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let mut data = [0u8; 64];
    data[..32].copy_from_slice(lo.as_bytes());
    data[32..].copy_from_slice(hi.as_bytes());
    Commitment::digest(&data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::leaf_commitment;

    fn leaves_of(ids: &[&str]) -> Vec<Commitment> {
        ids.iter().map(|s| leaf_commitment(s).unwrap()).collect()
    }

    #[test]
    fn empty_set_has_empty_root_and_no_proofs() {
        let t = build([]);
        assert_eq!(t.root, empty_root());
        assert!(t.proofs.is_empty());
    }

    #[test]
    fn singleton_root_is_the_leaf() {
        let leaf = leaf_commitment("a@x.com").unwrap();
        let t = build([leaf]);
        assert_eq!(t.root, leaf);
        assert_eq!(t.proofs[&leaf], Vec::new());
        assert!(verify(leaf, &t.proofs[&leaf], t.root));
    }

    #[test]
    fn build_is_order_independent() {
        let a = leaves_of(&["a@x.com", "b@x.com", "c@x.com", "d@x.com", "e@x.com"]);
        let mut b = a.clone();
        b.reverse();
        let c = vec![a[2], a[0], a[4], a[1], a[3]];

        let ta = build(a.clone());
        let tb = build(b);
        let tc = build(c);
        assert_eq!(ta.root, tb.root);
        assert_eq!(ta.root, tc.root);
        for leaf in &a {
            assert_eq!(ta.proofs[leaf], tb.proofs[leaf]);
            assert_eq!(ta.proofs[leaf], tc.proofs[leaf]);
        }
    }

    #[test]
    fn duplicates_collapse_to_one_leaf() {
        let leaf = leaf_commitment("a@x.com").unwrap();
        let other = leaf_commitment("b@x.com").unwrap();
        let t = build([leaf, other, leaf]);
        assert_eq!(t.proofs.len(), 2);
        assert_eq!(t.root, build([leaf, other]).root);
    }

    #[test]
    fn all_members_verify_nonmembers_do_not() {
        let leaves = leaves_of(&["a@x.com", "b@x.com", "c@x.com", "d@x.com", "e@x.com", "f@x.com", "g@x.com"]);
        let t = build(leaves.clone());
        for leaf in &leaves {
            assert!(verify(*leaf, &t.proofs[leaf], t.root), "member {leaf} must verify");
        }

        let outsider = leaf_commitment("h@x.com").unwrap();
        // Borrowing any member's path must not admit an outsider.
        for leaf in &leaves {
            assert!(!verify(outsider, &t.proofs[leaf], t.root));
        }
    }

    #[test]
    fn odd_level_promotes_lone_node() {
        // Three leaves: one node is promoted at the first level. All three
        // proofs still verify and have depth <= 2.
        let leaves = leaves_of(&["a@x.com", "b@x.com", "c@x.com"]);
        let t = build(leaves.clone());
        for leaf in &leaves {
            let path = &t.proofs[leaf];
            assert!(path.len() <= 2);
            assert!(verify(*leaf, path, t.root));
        }
    }

    #[test]
    fn removal_changes_root_but_both_sets_verify() {
        let leaves = leaves_of(&["a@x.com", "b@x.com", "c@x.com"]);
        let before = build(leaves.clone());

        let after = build([leaves[0], leaves[2]]);
        assert_ne!(before.root, after.root);

        // The survivor's proof differs across roots but verifies under each.
        assert!(verify(leaves[0], &before.proofs[&leaves[0]], before.root));
        assert!(verify(leaves[0], &after.proofs[&leaves[0]], after.root));
        assert!(!verify(leaves[0], &before.proofs[&leaves[0]], after.root));
    }

    #[test]
    fn sorted_pair_is_symmetric() {
        let a = Commitment::digest(b"a");
        let b = Commitment::digest(b"b");
        assert_eq!(hash_pair(&a, &b), hash_pair(&b, &a));
    }
}
