use crate::double_sha256::BLOCK_BYTES;

/// Compile-time shape of the claim circuit
///
/// Every constant fixes the size of the constraint system: all loops bounded by these
/// values run unconditionally, so proving cost scales with the maxima, not with the
/// actual transaction or proof.
pub trait ClaimConfig {
    /// Number of SHA-256 blocks reserved for the padded transaction
    const MAX_TX_BLOCKS: usize;
    /// Maximum depth of the Merkle inclusion proof
    const MAX_MERKLE_DEPTH: usize;
    /// Number of candidate Merkle roots exposed as public inputs
    const NUM_ROOTS: usize;
    /// Width, in bytes, the locking script is zero-padded to
    const MAX_SCRIPT_BYTES: usize;
    /// Byte lengths of the supported standard locking scripts
    const SCRIPT_LENGTHS: &[usize];

    /// Size in bytes of the padded transaction buffer
    fn max_tx_bytes() -> usize {
        Self::MAX_TX_BLOCKS * BLOCK_BYTES
    }
}

/// Production configuration: 1024-byte transactions, blocks of up to 4096 transactions,
/// two candidate roots and the standard P2WPKH (22), P2SH (23), P2PKH (25) and
/// P2WSH/P2TR (34) locking scripts.
#[derive(Clone, Debug)]
pub struct BridgeConfig;

impl ClaimConfig for BridgeConfig {
    const MAX_TX_BLOCKS: usize = 16;
    const MAX_MERKLE_DEPTH: usize = 12;
    const NUM_ROOTS: usize = 2;
    const MAX_SCRIPT_BYTES: usize = 34;
    const SCRIPT_LENGTHS: &[usize] = &[22, 23, 25, 34];
}
