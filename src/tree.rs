// Copyright (c) VB-tree Contributors
// SPDX-License-Identifier: Apache-2.0

//! Tree façade: bundles a [`Setup`], a minimum degree, and a root node
//! behind the small set of operations callers actually need. Mirrors
//! `VBTree` in the reference implementation, which is itself a thin
//! wrapper that forwards to the free functions in `btree`/`commit`/
//! `upsert`/`validate` — kept here as methods purely for ergonomics, not
//! because the tree owns any state those functions don't already take
//! explicitly.

use ark_bls12_381::Fr;

use crate::btree;
use crate::commit;
use crate::error::VbTreeError;
use crate::field::Hash;
use crate::kzg::Setup;
use crate::node::Node;
use crate::upsert;
use crate::validate;

/// A Verkle B-tree: a B-tree of minimum degree `t` whose inner nodes also
/// carry a KZG commitment (under `setup`) to their children's hashes.
pub struct VbTree {
    setup: Setup,
    root: Box<Node>,
    t: usize,
}

impl VbTree {
    /// Builds a new tree of minimum degree `t` (width `2t`) over `setup`,
    /// seeded with a single key/value pair as its root leaf — mirroring
    /// how the reference implementation always starts from one populated
    /// root node rather than a fully empty tree.
    pub fn new(setup: Setup, t: usize, root_key: Hash, root_value: Hash) -> Self {
        let mut root = Box::new(Node::leaf(vec![root_key], vec![root_value]));
        commit::add_node_hash(&mut root, &setup);
        VbTree { setup, root, t }
    }

    pub fn setup(&self) -> &Setup {
        &self.setup
    }

    pub fn min_degree(&self) -> usize {
        self.t
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Plain insert/update, with no hash or commitment maintenance — the
    /// caller is responsible for a follow-up [`Self::rebuild_commitments`]
    /// before relying on the tree's digest.
    pub fn insert_node(&mut self, key: Hash, value: Hash, update: bool) -> Result<(), VbTreeError> {
        btree::insert_node(&mut self.root, key, value, update, self.t)
    }

    /// Inserts or updates `key` -> `value`, incrementally maintaining
    /// every hash and commitment on the path. Requires the tree to
    /// already be fully committed (see [`Self::rebuild_commitments`]).
    pub fn upsert_vc_node(&mut self, key: Hash, value: Hash) -> Result<(), VbTreeError> {
        upsert::upsert_vc_node(&mut self.root, &self.setup, self.t, key, value)
    }

    /// Rebuilds every node's hash (and, for inner nodes, commitment) from
    /// scratch. Needed once after a batch of plain [`Self::insert_node`]
    /// calls, or after constructing a tree whose nodes were populated by
    /// some other means than [`Self::new`]/[`Self::upsert_vc_node`].
    pub fn rebuild_commitments(&mut self) {
        commit::add_node_hash(&mut self.root, &self.setup);
    }

    pub fn find_node(&self, key: &Hash) -> Option<(&Node, usize)> {
        btree::find_node(&self.root, key)
    }

    pub fn check_valid_tree(&self) -> Result<(), VbTreeError> {
        validate::check_valid_tree(&self.root, &self.setup, self.t)
    }

    /// The tree's root commitment as a scalar-field element, the single
    /// value an external verifier would check a Merkle-style proof
    /// against.
    pub fn root_digest(&self) -> Fr {
        crate::field::bytes_to_field(&self.root.hash())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_setup() -> Setup {
        Setup::new(Fr::from(8927347823478352432985u128), 4, Fr::from(7u64)).unwrap()
    }

    fn key(n: u8) -> Hash {
        let mut h = [0u8; 32];
        h[0] = n;
        h
    }

    #[test]
    fn new_tree_is_valid_and_searchable() {
        let tree = VbTree::new(test_setup(), 2, key(1), key(1));
        assert!(tree.check_valid_tree().is_ok());
        assert!(tree.find_node(&key(1)).is_some());
    }

    #[test]
    fn upsert_then_plain_insert_then_rebuild_matches_direct_upsert() {
        let mut via_upsert = VbTree::new(test_setup(), 2, key(1), key(1));
        for n in 2u8..10 {
            via_upsert.upsert_vc_node(key(n), key(n)).unwrap();
        }

        let mut via_rebuild = VbTree::new(test_setup(), 2, key(1), key(1));
        for n in 2u8..10 {
            via_rebuild.insert_node(key(n), key(n), false).unwrap();
        }
        via_rebuild.rebuild_commitments();

        assert_eq!(via_upsert.root().hash(), via_rebuild.root().hash());
        assert_eq!(via_upsert.root().commitment, via_rebuild.root().commitment);
    }

    #[test]
    fn update_flag_on_plain_insert_controls_overwrite() {
        let mut tree = VbTree::new(test_setup(), 2, key(1), key(1));
        tree.insert_node(key(1), key(99), false).unwrap();
        assert_eq!(tree.find_node(&key(1)).unwrap().0.values[0], key(1));

        tree.insert_node(key(1), key(99), true).unwrap();
        assert_eq!(tree.find_node(&key(1)).unwrap().0.values[0], key(99));
    }
}
