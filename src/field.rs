// Copyright (c) VB-tree Contributors
// SPDX-License-Identifier: Apache-2.0

//! Field & Curve Adapter.
//!
//! A thin contract over the BLS12-381 scalar field and G1 group: scalar
//! multiplication, point addition, point compression, and the 32-byte
//! little-endian integer encoding used throughout the rest of the crate.
//! Everything here is a direct wrapper over `ark_bls12_381`/`ark_ec`/
//! `ark_ff`; the mutation engine never reaches past this module for curve
//! arithmetic.

use ark_bls12_381::{Fr, G1Projective};
use ark_ec::{CurveGroup, PrimeGroup};
use ark_ff::{BigInteger, PrimeField, Zero};
use ark_serialize::CanonicalSerialize;

/// A 32-byte digest or key/value slot, little-endian where interpreted as
/// an integer.
pub type Hash = [u8; 32];

/// Decodes a 32-byte little-endian buffer into a scalar field element,
/// reducing modulo the BLS12-381 scalar field order `p`.
pub fn bytes_to_field(bytes: &Hash) -> Fr {
    Fr::from_le_bytes_mod_order(bytes)
}

/// Encodes a scalar field element back into its canonical 32-byte
/// little-endian representation.
pub fn field_to_bytes(x: &Fr) -> Hash {
    let mut out = [0u8; 32];
    let repr = x.into_bigint().to_bytes_le();
    out[..repr.len()].copy_from_slice(&repr);
    out
}

/// `(int(new) - int(old)) mod p`, computed directly in the scalar field so
/// there is no risk of an unreduced negative intermediate.
pub fn field_delta(new: &Hash, old: &Hash) -> Fr {
    bytes_to_field(new) - bytes_to_field(old)
}

/// The identity element of G1 (the additive identity, `0 * G`).
pub fn g1_identity() -> G1Projective {
    G1Projective::zero()
}

/// `true` iff `point` is the identity of G1.
pub fn is_identity(point: &G1Projective) -> bool {
    point.is_zero()
}

/// `lhs + rhs` in G1.
pub fn add(lhs: &G1Projective, rhs: &G1Projective) -> G1Projective {
    *lhs + *rhs
}

/// `scalar * point` in G1.
pub fn scalar_mul(point: &G1Projective, scalar: &Fr) -> G1Projective {
    *point * *scalar
}

/// The canonical compressed encoding of a G1 point, used as the
/// `compress()` primitive referenced by the node-hashing rules. Unlike the
/// illustrative 32-byte digests used elsewhere in this crate, a real
/// BLS12-381 G1 compressed point is 48 bytes (381-bit x-coordinate plus
/// sign/infinity flags); this function returns that canonical length.
pub fn compress(point: &G1Projective) -> Vec<u8> {
    let affine = point.into_affine();
    let mut buf = Vec::with_capacity(affine.compressed_size());
    affine
        .serialize_compressed(&mut buf)
        .expect("serialization into a Vec cannot fail");
    buf
}
