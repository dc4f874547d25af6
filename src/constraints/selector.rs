//! One-hot selection, the circuit replacement for indexing
//!
//! The same selector serves every "which candidate" decision of the crate: byte offsets,
//! block counts, Merkle depths, root indices and script lengths.

use ark_ff::PrimeField;
use ark_r1cs_std::{
    eq::EqGadget,
    fields::{FieldVar, fp::FpVar},
    prelude::Boolean,
};
use ark_relations::r1cs::SynthesisError;

use crate::constraints::bits::fp_to_bit;

/// One-hot weights over the positions `start, start + 1, ..., start + size - 1`
///
/// `weights[i]` is the equality indicator `index == start + i` and the weights are
/// enforced to sum to exactly one. An index outside the range zeroes every weight and
/// makes that constraint unsatisfiable.
#[derive(Clone, Debug)]
pub struct BitSelector<F: PrimeField> {
    weights: Vec<Boolean<F>>,
}

impl<F: PrimeField> BitSelector<F> {
    /// Selector over `[0, size)`
    pub fn new(index: &FpVar<F>, size: usize) -> Result<Self, SynthesisError> {
        Self::new_with_start(index, 0, size)
    }

    /// Selector over `[start, start + size)`
    pub fn new_with_start(
        index: &FpVar<F>,
        start: u64,
        size: usize,
    ) -> Result<Self, SynthesisError> {
        assert!(size > 0, "a selector needs at least one position");

        let mut weights = Vec::with_capacity(size);
        let mut sum = FpVar::<F>::zero();
        for i in 0..size as u64 {
            let weight = index.is_eq(&FpVar::constant(F::from(start + i)))?;
            sum += FpVar::<F>::from(weight.clone());
            weights.push(weight);
        }
        sum.enforce_equal(&FpVar::one())?;

        Ok(Self { weights })
    }

    pub fn weights(&self) -> &[Boolean<F>] {
        &self.weights
    }

    /// Select a bit array among `candidates`, one per position
    pub fn select_bits<B: AsRef<[Boolean<F>]>>(
        &self,
        candidates: &[B],
    ) -> Result<Vec<Boolean<F>>, SynthesisError> {
        assert_eq!(
            candidates.len(),
            self.weights.len(),
            "{} candidates for a selector over {} positions",
            candidates.len(),
            self.weights.len()
        );
        let width = candidates[0].as_ref().len();
        assert!(
            candidates.iter().all(|c| c.as_ref().len() == width),
            "candidates must share the same width"
        );

        self.select_bits_by(width, |position, bit| candidates[position].as_ref()[bit].clone())
    }

    /// Select `width` bits where `candidate(position, bit)` is the bit of the candidate at
    /// `position`
    ///
    /// Each output bit is `Σ_i weights[i] ∧ candidate(i, bit)`, re-proven binary.
    pub fn select_bits_by(
        &self,
        width: usize,
        candidate: impl Fn(usize, usize) -> Boolean<F>,
    ) -> Result<Vec<Boolean<F>>, SynthesisError> {
        (0..width)
            .map(|bit| {
                let mut acc = FpVar::<F>::zero();
                for (position, weight) in self.weights.iter().enumerate() {
                    acc += FpVar::<F>::from(weight & &candidate(position, bit));
                }
                fp_to_bit(&acc)
            })
            .collect()
    }

    /// `prefix[k] = Σ_{i ≤ k} weights[i]`, i.e. whether the selected position is at most
    /// `start + k`
    pub fn prefix_sums(&self) -> Vec<FpVar<F>> {
        let mut acc = FpVar::<F>::zero();
        self.weights
            .iter()
            .map(|weight| {
                acc += FpVar::<F>::from(weight.clone());
                acc.clone()
            })
            .collect()
    }
}
