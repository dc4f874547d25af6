//! Merkle inclusion against one hidden member of a set of candidate roots

use std::borrow::Borrow;
use std::marker::PhantomData;

use ark_ff::PrimeField;
use ark_r1cs_std::{
    alloc::{AllocVar, AllocationMode},
    fields::{FieldVar, fp::FpVar},
    prelude::{Boolean, CondSelectGadget},
};
use ark_relations::r1cs::{Namespace, SynthesisError};
use itertools::Itertools;

use crate::constraints::bits::{BitArrayComparator, alloc_bits_be};
use crate::constraints::selector::BitSelector;
use crate::double_sha256::{DIGEST_BITS, constraints::double_sha256_fixed};
use crate::merkle_tree::MerkleProof;
use crate::traits::ClaimConfig;

/// R1CS version of [MerkleProof], always `P::MAX_MERKLE_DEPTH` levels long
pub struct MerkleProofVar<F: PrimeField, P: ClaimConfig> {
    pub siblings: Vec<Vec<Boolean<F>>>,
    pub directions: Vec<Boolean<F>>,
    pub depth: FpVar<F>,
    _config: PhantomData<P>,
}

impl<F: PrimeField, P: ClaimConfig> AllocVar<MerkleProof, F> for MerkleProofVar<F, P> {
    fn new_variable<T: Borrow<MerkleProof>>(
        cs: impl Into<Namespace<F>>,
        f: impl FnOnce() -> Result<T, SynthesisError>,
        mode: AllocationMode,
    ) -> Result<Self, SynthesisError> {
        let ns = cs.into();
        let cs = ns.cs();

        let proof: MerkleProof = f().map(|proof| proof.borrow().clone())?;
        assert!(
            proof.siblings.len() <= P::MAX_MERKLE_DEPTH
                && proof.directions.len() <= P::MAX_MERKLE_DEPTH,
            "The proof has {} levels, more than P::MAX_MERKLE_DEPTH = {}",
            proof.siblings.len().max(proof.directions.len()),
            P::MAX_MERKLE_DEPTH
        );

        let mut siblings = Vec::with_capacity(P::MAX_MERKLE_DEPTH);
        let mut directions = Vec::with_capacity(P::MAX_MERKLE_DEPTH);
        for level in 0..P::MAX_MERKLE_DEPTH {
            let sibling = proof.siblings.get(level).copied().unwrap_or([0u8; 32]);
            let direction = proof.directions.get(level).copied().unwrap_or(false);
            siblings.push(alloc_bits_be(cs.clone(), &sibling, mode)?);
            directions.push(Boolean::new_variable(cs.clone(), || Ok(direction), mode)?);
        }
        let depth = FpVar::<F>::new_variable(cs.clone(), || Ok(F::from(proof.depth as u64)), mode)?;

        Ok(Self {
            siblings,
            directions,
            depth,
            _config: PhantomData,
        })
    }
}

/// One level of a Merkle path
pub struct MerkleLevelStep<F: PrimeField> {
    _field: PhantomData<F>,
}

impl<F: PrimeField> MerkleLevelStep<F> {
    /// Parent of `current` and `sibling`
    ///
    /// `direction` set means `current` is the right child. The order is chosen bit by bit
    /// with the multiplexer `out = c0 + s * (c1 - c0)`, a selection only because
    /// `direction` is a binary-constrained [Boolean].
    pub fn parent(
        current: &[Boolean<F>],
        sibling: &[Boolean<F>],
        direction: &Boolean<F>,
    ) -> Result<Vec<Boolean<F>>, SynthesisError> {
        let mut left = Vec::with_capacity(DIGEST_BITS);
        let mut right = Vec::with_capacity(DIGEST_BITS);
        for (c, s) in current.iter().zip_eq(sibling.iter()) {
            left.push(Boolean::conditionally_select(direction, s, c)?);
            right.push(Boolean::conditionally_select(direction, c, s)?);
        }
        left.extend(right);
        double_sha256_fixed(&left)
    }
}

/// Verifies that a leaf is included under one of `P::NUM_ROOTS` candidate roots without
/// revealing which one
///
/// All `P::MAX_MERKLE_DEPTH` levels are hashed; the hash at the declared depth is chosen
/// with a one-hot selector and compared against the candidate chosen by a second one-hot
/// selector. The constraint system is the same whatever the root index.
pub struct MerkleHiddenRootVerifier<F: PrimeField, P: ClaimConfig> {
    _field: PhantomData<F>,
    _config: PhantomData<P>,
}

impl<F: PrimeField, P: ClaimConfig> MerkleHiddenRootVerifier<F, P> {
    /// Root reached from `leaf` after `proof.depth` levels
    ///
    /// Levels beyond the declared depth are enforced to be zero-filled.
    pub fn root_at_declared_depth(
        leaf: &[Boolean<F>],
        proof: &MerkleProofVar<F, P>,
    ) -> Result<Vec<Boolean<F>>, SynthesisError> {
        assert_eq!(leaf.len(), DIGEST_BITS, "the leaf has {} bits", leaf.len());

        let depth_selector = BitSelector::new_with_start(&proof.depth, 1, P::MAX_MERKLE_DEPTH)?;

        let mut current = leaf.to_vec();
        let mut outputs = Vec::with_capacity(P::MAX_MERKLE_DEPTH);
        for (sibling, direction) in proof.siblings.iter().zip(proof.directions.iter()) {
            current = MerkleLevelStep::parent(&current, sibling, direction)?;
            outputs.push(current.clone());
        }

        // Level k is unused iff depth <= k, i.e. the selected position is below k
        let prefix = depth_selector.prefix_sums();
        for level in 1..P::MAX_MERKLE_DEPTH {
            let mut level_bits = FpVar::<F>::from(proof.directions[level].clone());
            for bit in proof.siblings[level].iter() {
                level_bits += FpVar::<F>::from(bit.clone());
            }
            level_bits.mul_equals(&prefix[level - 1], &FpVar::zero())?;
        }

        depth_selector.select_bits(&outputs)
    }

    /// Enforce that `leaf` is included under `candidate_roots[root_index]`
    pub fn verify(
        leaf: &[Boolean<F>],
        proof: &MerkleProofVar<F, P>,
        candidate_roots: &[Vec<Boolean<F>>],
        root_index: &FpVar<F>,
    ) -> Result<(), SynthesisError> {
        assert_eq!(
            candidate_roots.len(),
            P::NUM_ROOTS,
            "{} candidate roots given, P::NUM_ROOTS = {}",
            candidate_roots.len(),
            P::NUM_ROOTS
        );

        let computed_root = Self::root_at_declared_depth(leaf, proof)?;
        let root_selector = BitSelector::new(root_index, P::NUM_ROOTS)?;
        let selected_root = root_selector.select_bits(candidate_roots)?;

        BitArrayComparator::enforce_equal(&computed_root, &selected_root)
    }
}
