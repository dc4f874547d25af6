//! Bitcoin double SHA-256 over variable-length, pre-padded messages

use byteorder::{BigEndian, ByteOrder};
use chain_gang::util::sha256d;
use tracing::debug;

use crate::error::ClaimError;

pub mod constraints;

/// Size of a SHA-256 message block in bytes
pub const BLOCK_BYTES: usize = 64;
/// Size of a SHA-256 message block in bits
pub const BLOCK_BITS: usize = BLOCK_BYTES * 8;
/// Size of a SHA-256 digest in bits
pub const DIGEST_BITS: usize = 256;

/// A message with its SHA-256 length padding, zero-filled to a fixed number of blocks
///
/// `block_count` is the number of blocks holding the message and its padding; the
/// remaining blocks are zero and are hashed but never selected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaddedMessage {
    pub bytes: Vec<u8>,
    pub block_count: usize,
}

/// Number of blocks needed by a message of `len` bytes once padded
pub fn padded_block_count(len: usize) -> usize {
    // 0x80 marker plus the 64-bit length
    (len + 9).div_ceil(BLOCK_BYTES)
}

/// Append the standard SHA-256 padding only
pub fn sha256_padding(message: &[u8]) -> Vec<u8> {
    let block_count = padded_block_count(message.len());
    let mut bytes = Vec::with_capacity(block_count * BLOCK_BYTES);
    bytes.extend_from_slice(message);
    bytes.push(0x80);
    bytes.resize(block_count * BLOCK_BYTES - 8, 0);
    let mut length = [0u8; 8];
    BigEndian::write_u64(&mut length, (message.len() as u64) * 8);
    bytes.extend_from_slice(&length);
    bytes
}

/// Pad `message` and zero-fill it to `max_blocks` blocks
pub fn pad_message(message: &[u8], max_blocks: usize) -> Result<PaddedMessage, ClaimError> {
    let block_count = padded_block_count(message.len());
    if block_count > max_blocks {
        return Err(ClaimError::TransactionTooLarge {
            len: message.len(),
            needed: block_count,
            max: max_blocks,
        });
    }
    let mut bytes = sha256_padding(message);
    bytes.resize(max_blocks * BLOCK_BYTES, 0);
    debug!(
        len = message.len(),
        block_count, max_blocks, "padded message"
    );

    Ok(PaddedMessage { bytes, block_count })
}

/// `SHA256(SHA256(data))` in internal byte order
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    sha256d(data).0
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_padding_boundaries() {
        assert_eq!(padded_block_count(0), 1);
        assert_eq!(padded_block_count(55), 1);
        assert_eq!(padded_block_count(56), 2);
        assert_eq!(padded_block_count(119), 2);
        assert_eq!(padded_block_count(120), 3);
    }

    #[test]
    fn test_padding_layout() {
        let padded = sha256_padding(b"abc");
        assert_eq!(padded.len(), 64);
        assert_eq!(&padded[..4], &[b'a', b'b', b'c', 0x80]);
        assert_eq!(padded[63], 24);
    }

    #[test]
    fn test_pad_message() {
        let padded = pad_message(&[7u8; 60], 3).unwrap();
        assert_eq!(padded.block_count, 2);
        assert_eq!(padded.bytes.len(), 3 * BLOCK_BYTES);
        assert!(padded.bytes[2 * BLOCK_BYTES..].iter().all(|b| *b == 0));

        assert!(matches!(
            pad_message(&[7u8; 130], 2),
            Err(ClaimError::TransactionTooLarge { needed: 3, max: 2, .. })
        ));
    }

    #[test]
    fn test_double_sha256_reference() {
        // sha256d("hello")
        assert_eq!(
            hex::encode(double_sha256(b"hello")),
            "9595c9df90075148eb06860365df33584b75bff782a510c6cd4883a419833d50"
        );
    }
}
