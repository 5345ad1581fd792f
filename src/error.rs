// Copyright (c) VB-tree Contributors
// SPDX-License-Identifier: Apache-2.0

//! Fatal error types for the VB-tree engine.
//!
//! Every variant here indicates a programming error in the engine itself,
//! never a recoverable user-input condition: once raised, the tree that
//! produced it must be considered poisoned (see spec §7).

use thiserror::Error;

/// Errors raised by the VB-tree commitment-preserving mutation engine.
#[derive(Debug, Error)]
pub enum VbTreeError {
    /// `_insert` would have pushed a node past `2t - 1` keys. This should
    /// never fire under the preemptive-split policy in [`crate::btree`].
    #[error("node is full: attempted to insert past the 2t-1 key limit")]
    NodeFull,

    /// The KZG trusted-setup parameters violate a primitive-root precondition.
    #[error("invalid KZG setup: {reason}")]
    SetupInvalid { reason: String },

    /// [`crate::validate::check_valid_tree`] detected a hash or commitment
    /// mismatch somewhere in the tree.
    #[error("tree validation failed: {reason}")]
    ValidationFailure { reason: String },
}
