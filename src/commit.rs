// Copyright (c) VB-tree Contributors
// SPDX-License-Identifier: Apache-2.0

//! Full commitment builder: a depth-first, post-order walk that sets
//! every node's `hash` and (for inner nodes) `commitment` from scratch.
//! This is the baseline the incremental engine is checked against (spec
//! §8, property 4) and the fallback used whenever a node's prior
//! commitment cannot be trusted (root replacement, or an inner node that
//! was never committed in the first place).

use std::collections::BTreeMap;

use crate::field;
use crate::kzg::Setup;
use crate::node::Node;

/// Rebuilds `node.hash` (and, for inner nodes, `node.commitment`) for the
/// entire subtree rooted at `node`, children first.
pub fn add_node_hash(node: &mut Node, setup: &Setup) {
    if node.is_leaf() {
        node.recompute_hash();
        return;
    }

    for child in node.children.iter_mut() {
        add_node_hash(child, setup);
    }

    let values: BTreeMap<usize, _> = node
        .children
        .iter()
        .enumerate()
        .map(|(i, child)| (i, field::bytes_to_field(&child.hash())))
        .collect();
    node.commitment = setup.commit_lagrange(&values);
    node.recompute_hash();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;

    fn test_setup() -> Setup {
        use ark_bls12_381::Fr;
        Setup::new(Fr::from(8927347823478352432985u128), 4, Fr::from(7u64)).unwrap()
    }

    fn key(n: u8) -> [u8; 32] {
        let mut h = [0u8; 32];
        h[0] = n;
        h
    }

    #[test]
    fn leaf_gets_a_hash_and_no_commitment_work() {
        let setup = test_setup();
        let mut leaf = Node::leaf(vec![key(1)], vec![key(2)]);
        add_node_hash(&mut leaf, &setup);
        assert!(leaf.hash.is_some());
        assert!(field::is_identity(&leaf.commitment));
    }

    #[test]
    fn inner_node_commitment_reflects_child_hashes() {
        let setup = test_setup();
        let mut left = Node::leaf(vec![key(1)], vec![key(1)]);
        let mut right = Node::leaf(vec![key(3)], vec![key(3)]);
        add_node_hash(&mut left, &setup);
        add_node_hash(&mut right, &setup);

        let mut root = Node::empty();
        root.keys.push(key(2));
        root.values.push(key(2));
        root.children.push(Box::new(left.clone()));
        root.children.push(Box::new(right.clone()));
        add_node_hash(&mut root, &setup);

        let expected: BTreeMap<usize, _> = [
            (0, field::bytes_to_field(&left.hash())),
            (1, field::bytes_to_field(&right.hash())),
        ]
        .into_iter()
        .collect();
        assert_eq!(root.commitment, setup.commit_lagrange(&expected));
    }

    #[test]
    fn rebuild_is_idempotent() {
        let setup = test_setup();
        let mut left = Node::leaf(vec![key(1)], vec![key(1)]);
        let mut right = Node::leaf(vec![key(3)], vec![key(3)]);
        let mut root = Node::empty();
        root.keys.push(key(2));
        root.values.push(key(2));
        root.children.push(Box::new(std::mem::replace(&mut left, Node::empty())));
        root.children.push(Box::new(std::mem::replace(&mut right, Node::empty())));

        add_node_hash(&mut root, &setup);
        let first = (root.hash(), root.commitment);
        add_node_hash(&mut root, &setup);
        let second = (root.hash(), root.commitment);
        assert_eq!(first, second);
    }
}
