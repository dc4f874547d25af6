//! Double SHA-256 gadgets
//!
//! Messages of fixed length go through [Sha256Gadget] twice. Variable-length messages run
//! the SHA-256 compression function block by block so that every intermediate chaining
//! state is available; the second pass hashes the fixed 32-byte first digest with
//! [Sha256Gadget].

use std::marker::PhantomData;

use ark_crypto_primitives::crh::sha256::constraints::{DigestVar, Sha256Gadget};
use ark_ff::PrimeField;
use ark_r1cs_std::{
    fields::{FieldVar, fp::FpVar},
    prelude::{Boolean, ToBitsGadget},
    uint8::UInt8,
    uint32::UInt32,
};
use ark_relations::r1cs::SynthesisError;

use crate::constraints::selector::BitSelector;
use crate::double_sha256::{BLOCK_BITS, DIGEST_BITS};

const IV: [u32; 8] = [
    0x6a09e667, 0xbb67ae85, 0x3c6ef372, 0xa54ff53a, 0x510e527f, 0x9b05688c, 0x1f83d9ab, 0x5be0cd19,
];

const K: [u32; 64] = [
    0x428a2f98, 0x71374491, 0xb5c0fbcf, 0xe9b5dba5, 0x3956c25b, 0x59f111f1, 0x923f82a4, 0xab1c5ed5,
    0xd807aa98, 0x12835b01, 0x243185be, 0x550c7dc3, 0x72be5d74, 0x80deb1fe, 0x9bdc06a7, 0xc19bf174,
    0xe49b69c1, 0xefbe4786, 0x0fc19dc6, 0x240ca1cc, 0x2de92c6f, 0x4a7484aa, 0x5cb0a9dc, 0x76f988da,
    0x983e5152, 0xa831c66d, 0xb00327c8, 0xbf597fc7, 0xc6e00bf3, 0xd5a79147, 0x06ca6351, 0x14292967,
    0x27b70a85, 0x2e1b2138, 0x4d2c6dfc, 0x53380d13, 0x650a7354, 0x766a0abb, 0x81c2c92e, 0x92722c85,
    0xa2bfe8a1, 0xa81a664b, 0xc24b8b70, 0xc76c51a3, 0xd192e819, 0xd6990624, 0xf40e3585, 0x106aa070,
    0x19a4c116, 0x1e376c08, 0x2748774c, 0x34b0bcb5, 0x391c0cb3, 0x4ed8aa4a, 0x5b9cca4f, 0x682e6ff3,
    0x748f82ee, 0x78a5636f, 0x84c87814, 0x8cc70208, 0x90befffa, 0xa4506ceb, 0xbef9a3f7, 0xc67178f2,
];

/// A 32-bit word as little-endian bits, so that index `i` carries weight `2^i`
type Word<F> = Vec<Boolean<F>>;

fn word_from_be_bits<F: PrimeField>(bits: &[Boolean<F>]) -> Word<F> {
    bits.iter().rev().cloned().collect()
}

fn word_to_be_bits<F: PrimeField>(word: &Word<F>) -> Vec<Boolean<F>> {
    word.iter().rev().cloned().collect()
}

fn constant_word<F: PrimeField>(value: u32) -> Word<F> {
    (0..32).map(|i| Boolean::constant((value >> i) & 1 == 1)).collect()
}

fn rotr<F: PrimeField>(word: &Word<F>, by: usize) -> Word<F> {
    (0..32).map(|i| word[(i + by) % 32].clone()).collect()
}

fn shr<F: PrimeField>(word: &Word<F>, by: usize) -> Word<F> {
    (0..32)
        .map(|i| word.get(i + by).cloned().unwrap_or(Boolean::FALSE))
        .collect()
}

fn xor<F: PrimeField>(a: &Word<F>, b: &Word<F>) -> Word<F> {
    a.iter().zip(b.iter()).map(|(x, y)| x ^ y).collect()
}

fn and<F: PrimeField>(a: &Word<F>, b: &Word<F>) -> Word<F> {
    a.iter().zip(b.iter()).map(|(x, y)| x & y).collect()
}

/// Sum modulo 2^32
fn add<F: PrimeField>(operands: &[&Word<F>]) -> Result<Word<F>, SynthesisError> {
    let words: Vec<UInt32<F>> = operands
        .iter()
        .map(|word| UInt32::from_bits_le(word))
        .collect();
    UInt32::wrapping_add_many(&words)?.to_bits_le()
}

/// The SHA-256 compression function over bit arrays
pub struct Sha256CompressionGadget<F: PrimeField> {
    _field: PhantomData<F>,
}

impl<F: PrimeField> Sha256CompressionGadget<F> {
    /// The SHA-256 initial chaining state as a constant 256-bit array
    pub fn initial_state() -> Vec<Boolean<F>> {
        IV.iter()
            .flat_map(|word| word_to_be_bits(&constant_word::<F>(*word)))
            .collect()
    }

    /// Compress one 512-bit `block` into the 256-bit chaining `state`
    pub fn compress(
        state: &[Boolean<F>],
        block: &[Boolean<F>],
    ) -> Result<Vec<Boolean<F>>, SynthesisError> {
        assert_eq!(state.len(), DIGEST_BITS, "state has {} bits", state.len());
        assert_eq!(block.len(), BLOCK_BITS, "block has {} bits", block.len());

        let mut w: Vec<Word<F>> = block.chunks_exact(32).map(word_from_be_bits).collect();
        for i in 16..64 {
            let s0 = xor(
                &xor(&rotr(&w[i - 15], 7), &rotr(&w[i - 15], 18)),
                &shr(&w[i - 15], 3),
            );
            let s1 = xor(
                &xor(&rotr(&w[i - 2], 17), &rotr(&w[i - 2], 19)),
                &shr(&w[i - 2], 10),
            );
            let next = add(&[&w[i - 16], &s0, &w[i - 7], &s1])?;
            w.push(next);
        }

        let initial: Vec<Word<F>> = state.chunks_exact(32).map(word_from_be_bits).collect();
        let [mut a, mut b, mut c, mut d, mut e, mut f, mut g, mut h]: [Word<F>; 8] = initial
            .clone()
            .try_into()
            .expect("a 256-bit state holds eight words");

        for i in 0..64 {
            let s1 = xor(&xor(&rotr(&e, 6), &rotr(&e, 11)), &rotr(&e, 25));
            // ch = g ^ (e & (f ^ g))
            let ch = xor(&g, &and(&e, &xor(&f, &g)));
            let temp1 = add(&[&h, &s1, &ch, &constant_word(K[i]), &w[i]])?;
            let s0 = xor(&xor(&rotr(&a, 2), &rotr(&a, 13)), &rotr(&a, 22));
            // maj = (a & b) ^ (c & (a ^ b))
            let maj = xor(&and(&a, &b), &and(&c, &xor(&a, &b)));
            let temp2 = add(&[&s0, &maj])?;

            h = g;
            g = f;
            f = e;
            e = add(&[&d, &temp1])?;
            d = c;
            c = b;
            b = a;
            a = add(&[&temp1, &temp2])?;
        }

        let mut next_state = Vec::with_capacity(DIGEST_BITS);
        for (word, round) in initial.iter().zip([a, b, c, d, e, f, g, h].iter()) {
            next_state.extend(word_to_be_bits(&add(&[word, round])?));
        }
        Ok(next_state)
    }
}

/// SHA-256 of a byte-aligned bit array whose length is fixed when the circuit is built
pub fn sha256_fixed<F: PrimeField>(message: &[Boolean<F>]) -> Result<Vec<Boolean<F>>, SynthesisError> {
    assert_eq!(message.len() % 8, 0, "message of {} bits", message.len());
    let bytes: Vec<UInt8<F>> = message
        .chunks_exact(8)
        .map(|byte| UInt8::from_bits_le(&byte.iter().rev().cloned().collect::<Vec<_>>()))
        .collect();
    let DigestVar(output) = Sha256Gadget::digest(&bytes)?;

    let mut bits = Vec::with_capacity(DIGEST_BITS);
    for byte in output.iter() {
        bits.extend(byte.to_bits_le()?.into_iter().rev());
    }
    Ok(bits)
}

/// Double SHA-256 of a pre-padded message whose block count is bounded but variable
///
/// All `max_blocks` compressions are computed whatever the declared count; a one-hot
/// selector over `[1, max_blocks]` then picks the chaining state after exactly
/// `block_count` blocks. A count or padding inconsistent with the message yields a
/// different digest, which the caller compares against an expected value.
///
/// Blocks past `block_count` are not part of the digest, so they are enforced to be zero:
/// nothing read from the padded message can come from unhashed bytes.
#[derive(Clone, Debug)]
pub struct VariableLengthDoubleHasher<F: PrimeField> {
    pub max_blocks: usize,
    _field: PhantomData<F>,
}

impl<F: PrimeField> VariableLengthDoubleHasher<F> {
    pub fn new(max_blocks: usize) -> Self {
        assert!(max_blocks > 0, "the hasher needs at least one block");
        Self {
            max_blocks,
            _field: PhantomData,
        }
    }

    /// Chaining states after 1, 2, ..., `max_blocks` blocks
    pub fn intermediate_states(
        &self,
        padded: &[Boolean<F>],
    ) -> Result<Vec<Vec<Boolean<F>>>, SynthesisError> {
        assert_eq!(
            padded.len(),
            self.max_blocks * BLOCK_BITS,
            "the padded message has {} bits, the hasher expects {} blocks",
            padded.len(),
            self.max_blocks
        );
        let mut state = Sha256CompressionGadget::<F>::initial_state();
        let mut states = Vec::with_capacity(self.max_blocks);
        for block in padded.chunks_exact(BLOCK_BITS) {
            state = Sha256CompressionGadget::compress(&state, block)?;
            states.push(state.clone());
        }
        Ok(states)
    }

    /// Double SHA-256 of the first `block_count` blocks of `padded`
    pub fn hash(
        &self,
        padded: &[Boolean<F>],
        block_count: &FpVar<F>,
    ) -> Result<Vec<Boolean<F>>, SynthesisError> {
        let states = self.intermediate_states(padded)?;
        let selector = BitSelector::new_with_start(block_count, 1, self.max_blocks)?;

        // Block k is unused iff block_count <= k
        let prefix = selector.prefix_sums();
        for (k, block) in padded.chunks_exact(BLOCK_BITS).enumerate().skip(1) {
            let mut block_bits = FpVar::<F>::zero();
            for bit in block.iter() {
                block_bits += FpVar::<F>::from(bit.clone());
            }
            block_bits.mul_equals(&prefix[k - 1], &FpVar::zero())?;
        }

        let first = selector.select_bits(&states)?;
        sha256_fixed(&first)
    }
}

/// Double SHA-256 of a message whose length is fixed when the circuit is built
pub fn double_sha256_fixed<F: PrimeField>(
    message: &[Boolean<F>],
) -> Result<Vec<Boolean<F>>, SynthesisError> {
    sha256_fixed(&sha256_fixed(message)?)
}
