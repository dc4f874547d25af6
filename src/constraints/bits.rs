//! Bit-array primitives: allocation, packing and the XOR-sum comparator
//!
//! A bit array is a `Vec<Boolean<F>>` in big-endian order, most significant bit of each
//! byte first. Every non-constant bit is allocated through [Boolean::new_variable], which
//! enforces `b * (1 - b) = 0`.

use std::marker::PhantomData;

use ark_ff::{One, PrimeField};
use ark_r1cs_std::{
    R1CSVar,
    alloc::{AllocVar, AllocationMode},
    eq::EqGadget,
    fields::{FieldVar, fp::FpVar},
    prelude::Boolean,
};
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};
use itertools::Itertools;

use crate::util::{TRUNCATED_HASH_BITS, bytes_to_bits_be};

/// Allocate `bytes` as a big-endian bit array
pub fn alloc_bits_be<F: PrimeField>(
    cs: ConstraintSystemRef<F>,
    bytes: &[u8],
    mode: AllocationMode,
) -> Result<Vec<Boolean<F>>, SynthesisError> {
    bytes_to_bits_be(bytes)
        .into_iter()
        .map(|bit| Boolean::new_variable(cs.clone(), || Ok(bit), mode))
        .collect()
}

/// Constant big-endian bit array for `bytes`
pub fn constant_bits_be<F: PrimeField>(bytes: &[u8]) -> Vec<Boolean<F>> {
    bytes_to_bits_be(bytes)
        .into_iter()
        .map(Boolean::constant)
        .collect()
}

/// Reverse the bit order inside every byte, leaving the byte order untouched
///
/// Turns the big-endian bits of a little-endian integer encoding into a fully
/// little-endian bit string.
pub fn reverse_bits_per_byte<F: PrimeField>(bits: &[Boolean<F>]) -> Vec<Boolean<F>> {
    assert_eq!(bits.len() % 8, 0, "bit count {} is not byte aligned", bits.len());
    bits.chunks_exact(8)
        .flat_map(|byte| byte.iter().rev().cloned())
        .collect()
}

/// `Σ 2^i · bits[i]`; a linear combination, no constraint is added
pub fn pack_le_bits<F: PrimeField>(bits: &[Boolean<F>]) -> FpVar<F> {
    let mut acc = FpVar::<F>::zero();
    let mut coeff = F::one();
    for bit in bits.iter() {
        acc += FpVar::<F>::from(bit.clone()) * coeff;
        coeff.double_in_place();
    }
    acc
}

/// Big-endian counterpart of [pack_le_bits]
pub fn pack_be_bits<F: PrimeField>(bits: &[Boolean<F>]) -> FpVar<F> {
    let reversed: Vec<Boolean<F>> = bits.iter().rev().cloned().collect();
    pack_le_bits(&reversed)
}

/// The leading 254 bits of a 256-bit digest, packed into a single field element
///
/// The packing does not wrap only when `F` has more than 254 bits.
pub fn truncate_to_field<F: PrimeField>(digest: &[Boolean<F>]) -> FpVar<F> {
    assert_eq!(digest.len(), 256, "a digest has 256 bits, got {}", digest.len());
    assert!(
        F::MODULUS_BIT_SIZE > TRUNCATED_HASH_BITS as u32,
        "a {}-bit field cannot hold a truncated hash",
        F::MODULUS_BIT_SIZE
    );
    pack_be_bits(&digest[..TRUNCATED_HASH_BITS])
}

/// Re-express a field element known to be 0 or 1 as a [Boolean]
///
/// The fresh bit is binary-constrained and tied to `value`, so a value outside {0, 1}
/// leaves the system unsatisfied.
pub fn fp_to_bit<F: PrimeField>(value: &FpVar<F>) -> Result<Boolean<F>, SynthesisError> {
    let cs = value.cs();
    if cs.is_none() {
        return Ok(Boolean::constant(value.value()?.is_one()));
    }
    let bit = Boolean::new_witness(cs, || value.value().map(|v| v.is_one()))?;
    FpVar::<F>::from(bit.clone()).enforce_equal(value)?;
    Ok(bit)
}

/// Equality of two equal-length bit arrays with a constraint structure that does not
/// depend on the values: the number of differing positions must be zero.
pub struct BitArrayComparator<F: PrimeField> {
    _field: PhantomData<F>,
}

impl<F: PrimeField> BitArrayComparator<F> {
    /// `Σ a[i] ⊕ b[i]`. The sum is at most the length of the arrays, far below the
    /// modulus, so it is zero exactly when the arrays agree.
    pub fn mismatch_count(a: &[Boolean<F>], b: &[Boolean<F>]) -> FpVar<F> {
        let mut acc = FpVar::<F>::zero();
        for (x, y) in a.iter().zip_eq(b.iter()) {
            acc += FpVar::<F>::from(x ^ y);
        }
        acc
    }

    /// Like [Self::mismatch_count], counting only positions where `mask` is set
    pub fn masked_mismatch_count(
        a: &[Boolean<F>],
        b: &[Boolean<F>],
        mask: &[Boolean<F>],
    ) -> FpVar<F> {
        let mut acc = FpVar::<F>::zero();
        for ((x, y), m) in a.iter().zip_eq(b.iter()).zip_eq(mask.iter()) {
            acc += FpVar::<F>::from((x ^ y) & m);
        }
        acc
    }

    /// Whether `a` and `b` agree on every position selected by `mask`
    pub fn is_equal_masked(
        a: &[Boolean<F>],
        b: &[Boolean<F>],
        mask: &[Boolean<F>],
    ) -> Result<Boolean<F>, SynthesisError> {
        Self::masked_mismatch_count(a, b, mask).is_eq(&FpVar::<F>::zero())
    }

    /// Enforce `a == b`
    pub fn enforce_equal(a: &[Boolean<F>], b: &[Boolean<F>]) -> Result<(), SynthesisError> {
        Self::mismatch_count(a, b).enforce_equal(&FpVar::<F>::zero())
    }
}
