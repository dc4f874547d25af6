use std::marker::PhantomData;

use ark_ff::PrimeField;
use ark_r1cs_std::{
    eq::EqGadget,
    fields::{FieldVar, fp::FpVar},
    prelude::Boolean,
};
use ark_relations::r1cs::SynthesisError;

use crate::constraints::bits::{
    BitArrayComparator, fp_to_bit, pack_be_bits, pack_le_bits, reverse_bits_per_byte,
};
use crate::constraints::extractor::ByteOffsetExtractor;
use crate::constraints::selector::BitSelector;
use crate::traits::ClaimConfig;
use crate::tx_output::VALUE_BYTES;

/// Checks that the output serialized at a variable offset of a transaction pays a given
/// amount to a given locking script
pub struct TxOutputVerifier<F: PrimeField, P: ClaimConfig> {
    _field: PhantomData<F>,
    _config: PhantomData<P>,
}

impl<F: PrimeField, P: ClaimConfig> TxOutputVerifier<F, P> {
    /// Amount encoded by the 8 value bytes of an output, given as big-endian bits
    pub fn amount(value_bits: &[Boolean<F>]) -> FpVar<F> {
        assert_eq!(value_bits.len(), VALUE_BYTES * 8);
        pack_le_bits(&reverse_bits_per_byte(value_bits))
    }

    /// Whether the output at `output_offset` of `tx` pays `amount` to `script`
    ///
    /// `script` is zero-padded to `P::MAX_SCRIPT_BYTES` bytes and only its first
    /// `script_len` bytes are compared. The result is false when `script_len` is not one of
    /// `P::SCRIPT_LENGTHS`, when the length varint disagrees with it, or when the padding
    /// of `script` is not zero. A `script_len` above `P::MAX_SCRIPT_BYTES` leaves the
    /// system unsatisfiable.
    pub fn verify(
        tx: &[Boolean<F>],
        output_offset: &FpVar<F>,
        amount: &FpVar<F>,
        script: &[Boolean<F>],
        script_len: &FpVar<F>,
    ) -> Result<Boolean<F>, SynthesisError> {
        assert_eq!(
            script.len(),
            P::MAX_SCRIPT_BYTES * 8,
            "the script has {} bits, P::MAX_SCRIPT_BYTES = {}",
            script.len(),
            P::MAX_SCRIPT_BYTES
        );

        // Value
        let value_bits = ByteOffsetExtractor::extract(tx, output_offset, VALUE_BYTES)?;
        let is_amount_correct = Self::amount(&value_bits).is_eq(amount)?;

        // Length varint followed by the script
        let window_offset = output_offset + F::from(VALUE_BYTES as u64);
        let window = ByteOffsetExtractor::extract(tx, &window_offset, 1 + P::MAX_SCRIPT_BYTES)?;
        let (varint, tx_script) = window.split_at(8);
        let is_varint_correct = pack_be_bits(varint).is_eq(script_len)?;

        let mut set_membership = FpVar::<F>::one();
        for len in P::SCRIPT_LENGTHS {
            set_membership *= script_len - F::from(*len as u64);
        }
        let is_length_supported = set_membership.is_eq(&FpVar::zero())?;

        // mask[k] = (k < script_len)
        let length_selector = BitSelector::new(script_len, P::MAX_SCRIPT_BYTES + 1)?;
        let prefix = length_selector.prefix_sums();
        let mut mask = Vec::with_capacity(P::MAX_SCRIPT_BYTES * 8);
        for is_past_end in prefix.iter().take(P::MAX_SCRIPT_BYTES) {
            let in_script = fp_to_bit(&(FpVar::<F>::one() - is_past_end))?;
            mask.extend(std::iter::repeat_n(in_script, 8));
        }

        let is_script_correct = BitArrayComparator::is_equal_masked(tx_script, script, &mask)?;

        let mut padding = FpVar::<F>::zero();
        for (bit, in_script) in script.iter().zip(mask.iter()) {
            padding += FpVar::<F>::from(bit & &!in_script);
        }
        let is_padding_zero = padding.is_eq(&FpVar::zero())?;

        Boolean::kary_and(&[
            is_amount_correct,
            is_varint_correct,
            is_length_supported,
            is_script_correct,
            is_padding_zero,
        ])
    }
}
