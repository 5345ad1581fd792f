// Copyright (c) VB-tree Contributors
// SPDX-License-Identifier: Apache-2.0

//! Plain B-tree operators: search and the preemptive-split insertion
//! policy, with no awareness of hashes or commitments. These are the
//! building blocks [`crate::upsert`] layers the commitment-preserving
//! logic on top of, and they are also a correct, complete B-tree on their
//! own (spec §4.4's "non-VC-aware" operator set).

use crate::error::VbTreeError;
use crate::field::Hash;
use crate::node::Node;

/// Searches for `key` starting at `root`. Keys are compared as raw
/// little-endian byte strings, matching the reference implementation
/// exactly (not as big-endian/numeric magnitude) — the comparator only
/// needs to be a consistent total order for the tree invariants to hold.
pub fn find_node<'a>(root: &'a Node, key: &Hash) -> Option<(&'a Node, usize)> {
    let mut node = root;
    loop {
        let key_count = node.key_count();
        let mut i = 0;
        while i < key_count && *key > node.keys[i] {
            i += 1;
        }
        if i < key_count && node.keys[i] == *key {
            return Some((node, i));
        }
        if node.is_leaf() {
            return None;
        }
        node = &node.children[i];
    }
}

fn find_node_mut<'a>(root: &'a mut Node, key: &Hash) -> Option<(&'a mut Node, usize)> {
    let mut node = root;
    loop {
        let key_count = node.key_count();
        let mut i = 0;
        while i < key_count && *key > node.keys[i] {
            i += 1;
        }
        if i < key_count && node.keys[i] == *key {
            return Some((node, i));
        }
        if node.is_leaf() {
            return None;
        }
        node = &mut node.children[i];
    }
}

/// One step of a root-to-target descent. `idx` is the child slot taken to
/// reach the next step, except at the final (terminal) step, where it is
/// either the matched key's slot (the key already exists) or the slot the
/// key would be inserted at within a leaf.
#[derive(Debug, Clone, Copy)]
pub struct PathStep {
    pub is_leaf: bool,
    pub is_full: bool,
    pub child_count: usize,
    pub hash: Hash,
    pub idx: usize,
}

/// Full root-to-target path, including fullness/hash snapshots taken
/// before any mutation — the raw material [`crate::upsert`] classifies an
/// insertion from.
pub fn find_path_to_node(root: &Node, key: &Hash, t: usize) -> Vec<PathStep> {
    let mut path = Vec::new();
    let mut node = root;
    loop {
        let key_count = node.key_count();
        let mut i = 0;
        while i < key_count && *key > node.keys[i] {
            i += 1;
        }
        let is_leaf = node.is_leaf();
        path.push(PathStep {
            is_leaf,
            is_full: key_count == 2 * t - 1,
            child_count: node.child_count(),
            hash: node.hash(),
            idx: i,
        });
        if i < key_count && node.keys[i] == *key {
            break;
        }
        if is_leaf {
            break;
        }
        node = &node.children[i];
    }
    path
}

/// Splits `parent.children[idx]`, which must hold exactly `2t - 1` keys.
/// The median key/value is promoted into `parent` at `idx`; the upper
/// half of keys, values, and (if not a leaf) children move into a freshly
/// inserted sibling at `idx + 1`.
#[tracing::instrument(skip(parent))]
pub fn split_child(parent: &mut Node, idx: usize, t: usize) {
    let mut sibling = Node::empty();
    let (median_key, median_value) = {
        let child = &mut parent.children[idx];
        debug_assert_eq!(child.key_count(), 2 * t - 1, "split_child requires a full node");

        sibling.keys = child.keys.split_off(t);
        sibling.values = child.values.split_off(t);
        let median_key = child.keys.pop().expect("full node has a median key");
        let median_value = child.values.pop().expect("full node has a median value");

        if !child.is_leaf() {
            sibling.children = child.children.split_off(t);
        }
        (median_key, median_value)
    };

    parent.keys.insert(idx, median_key);
    parent.values.insert(idx, median_value);
    parent.children.insert(idx + 1, Box::new(sibling));
}

/// Inserts `key`/`value` into the subtree rooted at `node`, which must not
/// already be full. Preemptively splits any full child encountered along
/// the descent, mirroring `_insert` in the reference implementation.
/// Returns [`VbTreeError::NodeFull`] if `node` itself was already full —
/// a defensive check that should never trigger given the preemptive-split
/// policy callers are expected to uphold.
pub fn insert_nonfull(node: &mut Node, key: Hash, value: Hash, t: usize) -> Result<(), VbTreeError> {
    if node.key_count() == 2 * t - 1 {
        return Err(VbTreeError::NodeFull);
    }

    let mut idx = 0;
    while idx < node.keys.len() && key > node.keys[idx] {
        idx += 1;
    }

    if node.is_leaf() {
        node.keys.insert(idx, key);
        node.values.insert(idx, value);
    } else {
        if node.children[idx].key_count() == 2 * t - 1 {
            split_child(node, idx, t);
            if key > node.keys[idx] {
                idx += 1;
            }
        }
        insert_nonfull(&mut node.children[idx], key, value, t)?;
    }
    Ok(())
}

/// Inserts `key`/`value` into the tree rooted at `*root`, growing the tree
/// by one level if the root is full. If `key` already exists, either
/// overwrites its value (`update == true`) or leaves the tree untouched
/// (`update == false`) — this plain operator never touches hashes or
/// commitments either way, so callers that need the tree's digest kept in
/// sync must go through [`crate::upsert::upsert_vc_node`] instead.
pub fn insert_node(root: &mut Box<Node>, key: Hash, value: Hash, update: bool, t: usize) -> Result<(), VbTreeError> {
    if let Some((node, idx)) = find_node_mut(root, &key) {
        if update {
            node.values[idx] = value;
        }
        return Ok(());
    }

    if root.key_count() == 2 * t - 1 {
        let old_root = std::mem::replace(root.as_mut(), Node::empty());
        let mut new_root = Node::empty();
        new_root.children.push(Box::new(old_root));
        split_child(&mut new_root, 0, t);
        **root = new_root;
    }
    insert_nonfull(root, key, value, t)
}
