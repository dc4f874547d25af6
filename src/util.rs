//! Native helpers shared by the witness builders

use ark_ff::PrimeField;

/// Number of leading digest bits kept when a hash is turned into a field element
pub const TRUNCATED_HASH_BITS: usize = 254;

/// Expand bytes into bits, most significant bit of each byte first
pub fn bytes_to_bits_be(bytes: &[u8]) -> Vec<bool> {
    bytes
        .iter()
        .flat_map(|byte| (0..8).rev().map(move |i| (byte >> i) & 1 == 1))
        .collect()
}

/// Inverse of [bytes_to_bits_be]. The bit count must be a multiple of 8.
pub fn bits_to_bytes_be(bits: &[bool]) -> Vec<u8> {
    assert_eq!(bits.len() % 8, 0, "bit count {} is not byte aligned", bits.len());
    bits.chunks_exact(8)
        .map(|chunk| chunk.iter().fold(0u8, |acc, bit| (acc << 1) | (*bit as u8)))
        .collect()
}

/// Big-endian integer encoded in `bytes`, reduced into `F`
pub fn be_bytes_to_field<F: PrimeField>(bytes: &[u8]) -> F {
    F::from_be_bytes_mod_order(bytes)
}

/// The leading [TRUNCATED_HASH_BITS] bits of `digest`, read as a big-endian integer
///
/// This is how system-identifier hashes (nullifier, locker hash) and public Merkle roots
/// are exposed as public inputs. `F` must hold every [TRUNCATED_HASH_BITS]-bit integer,
/// so fields of at most 254 bits are rejected.
pub fn truncate_to_field<F: PrimeField>(digest: &[u8; 32]) -> F {
    assert!(
        F::MODULUS_BIT_SIZE > TRUNCATED_HASH_BITS as u32,
        "a {}-bit field cannot hold a truncated hash",
        F::MODULUS_BIT_SIZE
    );
    let shift = 256 - TRUNCATED_HASH_BITS;
    let mut shifted = [0u8; 32];
    for i in (0..32).rev() {
        let carry = if i > 0 { digest[i - 1] << (8 - shift) } else { 0 };
        shifted[i] = (digest[i] >> shift) | carry;
    }
    be_bytes_to_field(&shifted)
}
