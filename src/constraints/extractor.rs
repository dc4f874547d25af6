use std::marker::PhantomData;

use ark_ff::PrimeField;
use ark_r1cs_std::{fields::fp::FpVar, prelude::Boolean};
use ark_relations::r1cs::SynthesisError;

use crate::constraints::selector::BitSelector;

/// Reads a fixed-length run of bytes starting at a variable byte offset
///
/// The selector works at byte granularity and only ranges over offsets where the whole
/// run fits in the source, so a read past the end cannot be expressed: such an offset
/// leaves the selector unsatisfiable.
pub struct ByteOffsetExtractor<F: PrimeField> {
    _field: PhantomData<F>,
}

impl<F: PrimeField> ByteOffsetExtractor<F> {
    /// Extract `extract_bytes` bytes (as big-endian bits) from `source` at `offset`
    pub fn extract(
        source: &[Boolean<F>],
        offset: &FpVar<F>,
        extract_bytes: usize,
    ) -> Result<Vec<Boolean<F>>, SynthesisError> {
        assert_eq!(
            source.len() % 8,
            0,
            "the source of {} bits is not byte aligned",
            source.len()
        );
        let max_bytes = source.len() / 8;
        assert!(
            extract_bytes <= max_bytes,
            "cannot extract {} bytes from a source of {} bytes",
            extract_bytes,
            max_bytes
        );

        let selector = BitSelector::new(offset, max_bytes - extract_bytes + 1)?;
        selector.select_bits_by(extract_bytes * 8, |position, bit| {
            source[position * 8 + bit].clone()
        })
    }
}
