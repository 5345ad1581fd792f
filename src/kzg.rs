// Copyright (c) VB-tree Contributors
// SPDX-License-Identifier: Apache-2.0

//! KZG Engine: trusted setup derivation and Lagrange-basis commitment.
//!
//! This is the "external collaborator" named in spec §1 (the production
//! trusted-setup ceremony, optimized multi-scalar multiplication, and
//! pairing checks are explicitly out of scope) reduced to the minimal,
//! correct primitive the mutation engine actually needs: a one-time
//! derivation of the Lagrange-basis SRS points `L_0..L_{W-1}` and a linear
//! `commit_lagrange` over a sparse index -> scalar mapping.

use std::collections::BTreeMap;

use ark_bls12_381::{Fr, G1Projective, G2Projective};
use ark_ec::{CurveGroup, PrimeGroup};
use ark_ff::{BigInteger, Field, One, PrimeField, Zero};

use crate::error::VbTreeError;
use crate::field;

/// The KZG trusted setup: the monomial-basis SRS in G1/G2, and its
/// Lagrange-basis transform in G1 (computed once, by inverse FFT, and
/// shared by reference thereafter — never recomputed or duplicated per
/// node).
#[derive(Clone)]
pub struct Setup {
    width: usize,
    root_of_unity: Fr,
    domain: Vec<Fr>,
    g1: Vec<G1Projective>,
    g2: Vec<G2Projective>,
    g1_lagrange: Vec<G1Projective>,
}

impl Setup {
    /// Derives a KZG setup for a domain of size `width` (must be a power of
    /// two, `>= 4`) from a primitive root `primitive_root` of the scalar
    /// field and a secret scalar `secret`.
    ///
    /// This mirrors `KzgIntegration.__init__`/`_generate_setup` from the
    /// reference implementation: it validates
    /// `primitive_root^((p-1)/width) != 1` and `primitive_root^(p-1) == 1`
    /// before deriving `omega = primitive_root^((p-1)/width)`.
    pub fn new(secret: Fr, width: usize, primitive_root: Fr) -> Result<Self, VbTreeError> {
        if width < 4 || !width.is_power_of_two() {
            return Err(VbTreeError::SetupInvalid {
                reason: format!("width {width} must be a power of two >= 4"),
            });
        }
        if primitive_root.is_zero() {
            return Err(VbTreeError::SetupInvalid {
                reason: "primitive root must be nonzero".to_string(),
            });
        }

        let width_bits = width.trailing_zeros();
        let p_minus_one = modulus_minus_one::<Fr>();

        if primitive_root.pow(p_minus_one.as_ref()) != Fr::one() {
            return Err(VbTreeError::SetupInvalid {
                reason: "primitive_root^(p-1) != 1".to_string(),
            });
        }

        let mut exponent = p_minus_one;
        exponent.divn(width_bits);
        let root_of_unity = primitive_root.pow(exponent.as_ref());
        if root_of_unity.is_one() {
            return Err(VbTreeError::SetupInvalid {
                reason: "primitive_root^((p-1)/width) == 1: not a width-th primitive root"
                    .to_string(),
            });
        }

        let domain: Vec<Fr> = (0..width).map(|i| root_of_unity.pow([i as u64])).collect();
        let g1: Vec<G1Projective> = (0..width)
            .map(|i| G1Projective::generator() * secret.pow([i as u64]))
            .collect();
        let g2: Vec<G2Projective> = (0..width)
            .map(|i| G2Projective::generator() * secret.pow([i as u64]))
            .collect();
        let g1_lagrange = fft_g1(&g1, root_of_unity, true);

        Ok(Setup {
            width,
            root_of_unity,
            domain,
            g1,
            g2,
            g1_lagrange,
        })
    }

    pub fn lagrange_basis(&self, i: usize) -> G1Projective {
        self.g1_lagrange[i]
    }

    /// `Σ values[i] * L_i`, contributing 0 for every index absent from
    /// `values`. Linear in `values` by construction — the foundation for
    /// the incremental delta updates in [`crate::upsert`].
    pub fn commit_lagrange(&self, values: &BTreeMap<usize, Fr>) -> G1Projective {
        values.iter().fold(field::g1_identity(), |acc, (&i, &v)| {
            field::add(&acc, &field::scalar_mul(&self.g1_lagrange[i], &v))
        })
    }
}

/// `p - 1` as a big integer, where `p` is `F`'s modulus.
fn modulus_minus_one<F: PrimeField>() -> F::BigInt {
    let mut e = F::MODULUS;
    e.sub_with_borrow(&F::BigInt::from(1u64));
    e
}

/// Iterative radix-2 (inverse) FFT over the additive group G1, using scalar
/// multiplication by powers of `omega` as the module action. `a.len()`
/// must be a power of two. This plays the role of `fft.py`'s `fft(...,
/// inv=True)` applied to the monomial-basis G1 setup in the reference
/// implementation.
fn fft_g1(a: &[G1Projective], omega: Fr, invert: bool) -> Vec<G1Projective> {
    let n = a.len();
    assert!(n.is_power_of_two(), "fft_g1 requires a power-of-two length");

    let mut result = a.to_vec();
    let bits = n.trailing_zeros();
    for i in 0..n {
        let j = reverse_bits(i, bits);
        if j > i {
            result.swap(i, j);
        }
    }

    let root = if invert { omega.inverse().unwrap() } else { omega };

    let mut len = 2usize;
    while len <= n {
        let w_len = root.pow([(n / len) as u64]);
        let mut i = 0;
        while i < n {
            let mut w = Fr::one();
            for j in 0..len / 2 {
                let u = result[i + j];
                let v = result[i + j + len / 2] * w;
                result[i + j] = u + v;
                result[i + j + len / 2] = u - v;
                w *= w_len;
            }
            i += len;
        }
        len <<= 1;
    }

    if invert {
        let n_inv = Fr::from(n as u64).inverse().unwrap();
        for point in result.iter_mut() {
            *point = *point * n_inv;
        }
    }

    result
}

fn reverse_bits(x: usize, bits: u32) -> usize {
    let mut x = x;
    let mut result = 0usize;
    for _ in 0..bits {
        result = (result << 1) | (x & 1);
        x >>= 1;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::{FftField, UniformRand};
    use ark_std::test_rng;

    fn test_setup(width: usize) -> Setup {
        Setup::new(Fr::from(8927347823478352432985u128), width, Fr::from(7u64)).unwrap()
    }

    #[test]
    fn rejects_non_power_of_two_width() {
        assert!(Setup::new(Fr::from(1u64), 5, Fr::from(7u64)).is_err());
    }

    #[test]
    fn rejects_width_below_four() {
        assert!(Setup::new(Fr::from(1u64), 2, Fr::from(7u64)).is_err());
    }

    #[test]
    fn commit_lagrange_is_linear() {
        let setup = test_setup(8);
        let mut rng = test_rng();

        let mut a = BTreeMap::new();
        let mut b = BTreeMap::new();
        let mut sum = BTreeMap::new();
        for i in [0usize, 2, 5] {
            let va = Fr::rand(&mut rng);
            let vb = Fr::rand(&mut rng);
            a.insert(i, va);
            b.insert(i, vb);
            sum.insert(i, va + vb);
        }

        let com_a = setup.commit_lagrange(&a);
        let com_b = setup.commit_lagrange(&b);
        let com_sum = setup.commit_lagrange(&sum);

        assert_eq!(field::add(&com_a, &com_b), com_sum);
    }

    #[test]
    fn commit_lagrange_empty_is_identity() {
        let setup = test_setup(4);
        assert!(field::is_identity(&setup.commit_lagrange(&BTreeMap::new())));
    }

    #[test]
    fn fft_g1_round_trips_via_forward_and_inverse() {
        let mut rng = test_rng();
        let n = 8;
        let omega = Fr::get_root_of_unity(n as u64).unwrap();
        let points: Vec<G1Projective> = (0..n)
            .map(|_| G1Projective::generator() * Fr::rand(&mut rng))
            .collect();

        let freq = fft_g1(&points, omega, false);
        let back = fft_g1(&freq, omega, true);

        assert_eq!(points, back);
    }

    #[test]
    fn lagrange_basis_sums_to_generator_scaled_by_one() {
        // Committing the all-ones vector should reproduce the commitment to
        // the constant polynomial 1, i.e. g1[0] = G1::generator() (since
        // Lagrange_i(s) summed over i is always 1 for any s, and the
        // constant-1 polynomial's coefficient form is [1, 0, .., 0]).
        let setup = test_setup(4);
        let ones: BTreeMap<usize, Fr> = (0..4).map(|i| (i, Fr::one())).collect();
        let commitment = setup.commit_lagrange(&ones);
        assert_eq!(commitment.into_affine(), setup.g1[0].into_affine());
    }
}
