// Copyright (c) VB-tree Contributors
// SPDX-License-Identifier: Apache-2.0

//! The in-memory B-tree node: keys, values, children, and the cached
//! cryptographic digest/commitment pair the rest of the engine maintains.

use ark_bls12_381::{Fr, G1Projective};

use crate::field::{self, Hash};
use crate::hash;
use crate::kzg::Setup;

/// A single node of the tree. Leaves have no children; inner nodes have
/// exactly `keys.len() + 1` children.
#[derive(Debug, Clone)]
pub struct Node {
    pub keys: Vec<Hash>,
    pub values: Vec<Hash>,
    pub children: Vec<Box<Node>>,
    pub hash: Option<Hash>,
    pub commitment: G1Projective,
}

impl Node {
    /// An empty node with no keys, values, or children. Used as the
    /// starting point for a freshly-split sibling or a freshly-grown root.
    pub fn empty() -> Self {
        Node {
            keys: Vec::new(),
            values: Vec::new(),
            children: Vec::new(),
            hash: None,
            commitment: field::g1_identity(),
        }
    }

    /// A leaf node seeded with an initial key/value pair, e.g. the very
    /// first root of a brand-new tree.
    pub fn leaf(keys: Vec<Hash>, values: Vec<Hash>) -> Self {
        Node {
            keys,
            values,
            children: Vec::new(),
            hash: None,
            commitment: field::g1_identity(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// `true` for an inner node whose commitment has never been built
    /// (still the group identity). Used to trigger the full-rebuild
    /// fallback instead of an unsound delta update.
    pub fn has_uncommitted_children(&self) -> bool {
        !self.is_leaf() && field::is_identity(&self.commitment)
    }

    /// Recomputes `self.hash` from the current keys/values (and, for an
    /// inner node, the current commitment). Does not touch `commitment`.
    pub fn recompute_hash(&mut self) {
        self.hash = Some(if self.is_leaf() {
            hash::hash_leaf(&self.keys, &self.values)
        } else {
            hash::hash_inner(&self.commitment, &self.keys, &self.values)
        });
    }

    /// The cached hash. Panics if it was never computed, which indicates a
    /// caller reached a node before running [`Self::recompute_hash`] or
    /// [`crate::commit::add_node_hash`] on it — a programming error, not a
    /// recoverable condition.
    pub fn hash(&self) -> Hash {
        self.hash.expect("node hash requested before it was computed")
    }

    /// Adds `delta * lagrange_basis(idx)` to this node's commitment, in
    /// place, under the homomorphism `commit({i: a}) + commit({i: b}) =
    /// commit({i: a+b})`.
    pub fn add_delta(&mut self, idx: usize, delta: Fr, setup: &Setup) {
        self.commitment = field::add(&self.commitment, &field::scalar_mul(&setup.lagrange_basis(idx), &delta));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_hash_matches_rule_three() {
        let mut node = Node::leaf(vec![[1u8; 32]], vec![[2u8; 32]]);
        node.recompute_hash();
        assert_eq!(node.hash(), hash::hash_leaf(&node.keys, &node.values));
    }

    #[test]
    fn inner_hash_matches_rule_four() {
        let mut node = Node::empty();
        node.children.push(Box::new(Node::leaf(vec![[1u8; 32]], vec![[2u8; 32]])));
        node.keys.push([3u8; 32]);
        node.values.push([4u8; 32]);
        node.recompute_hash();
        assert_eq!(
            node.hash(),
            hash::hash_inner(&node.commitment, &node.keys, &node.values)
        );
    }

    #[test]
    fn fresh_inner_node_has_uncommitted_children() {
        let mut node = Node::empty();
        node.children.push(Box::new(Node::leaf(vec![], vec![])));
        assert!(node.has_uncommitted_children());
    }

    #[test]
    fn leaf_never_counts_as_uncommitted_children() {
        assert!(!Node::leaf(vec![], vec![]).has_uncommitted_children());
    }
}
