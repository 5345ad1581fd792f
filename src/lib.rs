// Copyright (c) VB-tree Contributors
// SPDX-License-Identifier: Apache-2.0

//! A Verkle B-tree: a balanced B-tree whose inner nodes carry a
//! KZG commitment (over BLS12-381) to their children's hashes, plus an
//! incremental mutation engine that updates those commitments by delta
//! rather than by full recomputation.
//!
//! Module layout follows the stages of building and maintaining one such
//! tree: [`field`]/[`kzg`] are the cryptographic primitives, [`node`] and
//! [`hash`] define what a node is and how it digests, [`btree`] is the
//! plain (commitment-unaware) B-tree, [`commit`] is the full rebuild,
//! [`upsert`] is the incremental engine, [`validate`] checks a tree
//! against all of the above, and [`tree`] ties them together behind a
//! single handle.

pub mod btree;
pub mod commit;
pub mod error;
pub mod field;
pub mod hash;
pub mod kzg;
pub mod node;
pub mod tree;
pub mod upsert;
pub mod validate;

pub use error::VbTreeError;
pub use field::Hash;
pub use kzg::Setup;
pub use node::Node;
pub use tree::VbTree;
