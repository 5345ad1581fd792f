// Copyright (c) VB-tree Contributors
// SPDX-License-Identifier: Apache-2.0

//! Tree validator: re-derives every hash and commitment from scratch and
//! compares against the cached values, also checking the ordering and
//! degree invariants from spec §3. Mirrors `check_valid_tree` in the
//! reference implementation, but returns a [`VbTreeError`] instead of
//! asserting, since a mismatch here means the tree handed to the caller
//! is already poisoned (spec §7).

use crate::commit;
use crate::error::VbTreeError;
use crate::field::Hash;
use crate::kzg::Setup;
use crate::node::Node;

/// Walks the whole tree checking:
/// - keys within each node are strictly increasing,
/// - every non-root node holds at least `t - 1` keys and at most `2t - 1`,
/// - every inner node has exactly `keys.len() + 1` children,
/// - every node's cached hash (and, for inner nodes, commitment) matches a
///   from-scratch rebuild.
#[tracing::instrument(skip(root, setup))]
pub fn check_valid_tree(root: &Node, setup: &Setup, t: usize) -> Result<(), VbTreeError> {
    check_structure(root, t, true)?;
    check_hashes(root, setup)
}

fn check_structure(node: &Node, t: usize, is_root: bool) -> Result<(), VbTreeError> {
    if !is_root && node.key_count() < t - 1 {
        return Err(VbTreeError::ValidationFailure {
            reason: format!("node has {} keys, fewer than the minimum {}", node.key_count(), t - 1),
        });
    }
    if node.key_count() > 2 * t - 1 {
        return Err(VbTreeError::ValidationFailure {
            reason: format!("node has {} keys, more than the maximum {}", node.key_count(), 2 * t - 1),
        });
    }
    for window in node.keys.windows(2) {
        if window[0] >= window[1] {
            return Err(VbTreeError::ValidationFailure {
                reason: "keys within a node are not strictly increasing".to_string(),
            });
        }
    }
    if node.values.len() != node.keys.len() {
        return Err(VbTreeError::ValidationFailure {
            reason: "keys and values length mismatch".to_string(),
        });
    }
    if !node.is_leaf() {
        if node.children.len() != node.keys.len() + 1 {
            return Err(VbTreeError::ValidationFailure {
                reason: format!(
                    "inner node has {} children but {} keys",
                    node.children.len(),
                    node.keys.len()
                ),
            });
        }
        for child in &node.children {
            check_structure(child, t, false)?;
        }
    }
    Ok(())
}

fn check_hashes(node: &Node, setup: &Setup) -> Result<(), VbTreeError> {
    let mut rebuilt = node.clone();
    commit::add_node_hash(&mut rebuilt, setup);

    let cached: Hash = node.hash();
    if cached != rebuilt.hash() {
        return Err(VbTreeError::ValidationFailure {
            reason: "cached node hash does not match a from-scratch rebuild".to_string(),
        });
    }
    if !node.is_leaf() && node.commitment != rebuilt.commitment {
        return Err(VbTreeError::ValidationFailure {
            reason: "cached commitment does not match a from-scratch rebuild".to_string(),
        });
    }

    if !node.is_leaf() {
        for child in &node.children {
            check_hashes(child, setup)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bls12_381::Fr;

    fn test_setup() -> Setup {
        Setup::new(Fr::from(8927347823478352432985u128), 4, Fr::from(7u64)).unwrap()
    }

    fn key(n: u8) -> [u8; 32] {
        let mut h = [0u8; 32];
        h[0] = n;
        h
    }

    #[test]
    fn freshly_rebuilt_tree_is_valid() {
        let setup = test_setup();
        let mut root = Node::leaf(vec![key(1), key(2)], vec![key(1), key(2)]);
        commit::add_node_hash(&mut root, &setup);
        assert!(check_valid_tree(&root, &setup, 2).is_ok());
    }

    #[test]
    fn out_of_order_keys_are_rejected() {
        let setup = test_setup();
        let mut root = Node::leaf(vec![key(2), key(1)], vec![key(2), key(1)]);
        commit::add_node_hash(&mut root, &setup);
        assert!(check_valid_tree(&root, &setup, 2).is_err());
    }

    #[test]
    fn stale_cached_hash_is_rejected() {
        let setup = test_setup();
        let mut root = Node::leaf(vec![key(1)], vec![key(1)]);
        commit::add_node_hash(&mut root, &setup);
        root.keys.push(key(2));
        root.values.push(key(2));
        // hash is now stale relative to the mutated keys/values.
        assert!(check_valid_tree(&root, &setup, 2).is_err());
    }
}
