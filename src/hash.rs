// Copyright (c) VB-tree Contributors
// SPDX-License-Identifier: Apache-2.0

//! `H(x)`: the SHA-256-based digest used for both leaf and inner node
//! hashes (spec §6). Mirrors the reference implementation's `hash()`,
//! which serializes a sequence of heterogeneous elements (raw bytes,
//! 32-byte integers, G1 points, nested tuples) before hashing the
//! concatenation once.

use ark_bls12_381::G1Projective;
use sha2::{Digest, Sha256};

use crate::field::{self, Hash};

/// One element of a sequence passed to [`hash`]. Only [`HashInput::Bytes`]
/// is exercised by the leaf/inner node hash rules (every key, value, and
/// compressed commitment in this crate is already a byte string); the
/// `Int`/`Point`/`Tuple` variants exist so the primitive stays usable by
/// future callers the way the reference `hash()` function is.
pub enum HashInput<'a> {
    Bytes(&'a [u8]),
    Int(&'a Hash),
    Point(&'a G1Projective),
    Tuple(Vec<HashInput<'a>>),
}

fn serialize_into(item: &HashInput, buf: &mut Vec<u8>) {
    match item {
        HashInput::Bytes(b) => buf.extend_from_slice(b),
        HashInput::Int(i) => buf.extend_from_slice(i.as_slice()),
        HashInput::Point(p) => buf.extend_from_slice(&hash(&[HashInput::Bytes(&field::compress(p))])),
        HashInput::Tuple(items) => buf.extend_from_slice(&hash(items)),
    }
}

/// `sha256(serialize(inputs[0]) || serialize(inputs[1]) || ...)`.
pub fn hash(inputs: &[HashInput]) -> Hash {
    let mut buf = Vec::new();
    for item in inputs {
        serialize_into(item, &mut buf);
    }
    let digest = Sha256::digest(&buf);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Rule 3: `H(keys ++ values)` for a leaf node.
pub fn hash_leaf(keys: &[Hash], values: &[Hash]) -> Hash {
    let inputs: Vec<HashInput> = keys
        .iter()
        .chain(values.iter())
        .map(|h| HashInput::Bytes(h.as_slice()))
        .collect();
    hash(&inputs)
}

/// Rule 4: `H(compress(commitment) ++ keys ++ values)` for an inner node.
pub fn hash_inner(commitment: &G1Projective, keys: &[Hash], values: &[Hash]) -> Hash {
    let compressed = field::compress(commitment);
    let mut inputs = Vec::with_capacity(1 + keys.len() + values.len());
    inputs.push(HashInput::Bytes(&compressed));
    for k in keys {
        inputs.push(HashInput::Bytes(k.as_slice()));
    }
    for v in values {
        inputs.push(HashInput::Bytes(v.as_slice()));
    }
    hash(&inputs)
}
