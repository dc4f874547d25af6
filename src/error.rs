//! Errors raised while building a claim witness outside the constraint system
//!
//! Inside the circuit every failure is "fail closed": the constraint system is simply
//! not satisfied. The errors below let a prover reject a bad claim early, before any
//! constraint is generated.

use thiserror::Error;

/// Errors raised by the native (out-of-circuit) side of the crate
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ClaimError {
    /// The padded transaction does not fit in the configured number of blocks
    #[error("transaction of {len} bytes needs {needed} blocks, at most {max} are supported")]
    TransactionTooLarge {
        len: usize,
        needed: usize,
        max: usize,
    },

    /// The Merkle proof depth is outside `[1, max]`
    #[error("Merkle depth {depth} is outside [1, {max}]")]
    DepthOutOfRange { depth: usize, max: usize },

    /// The hidden root index is outside `[0, num_roots)`
    #[error("root index {index} is outside [0, {num_roots})")]
    RootIndexOutOfRange { index: usize, num_roots: usize },

    /// The number of candidate roots differs from the configuration
    #[error("expected {expected} candidate roots, got {got}")]
    WrongRootCount { expected: usize, got: usize },

    /// The locking script is not one of the supported standard lengths
    #[error("script length {len} is not one of the supported lengths {supported:?}")]
    UnsupportedScriptLength {
        len: usize,
        supported: &'static [usize],
    },

    /// A read of `width` bytes at `offset` would run past the end of the buffer
    #[error("reading {width} bytes at offset {offset} overruns a buffer of {len} bytes")]
    OffsetOutOfBounds {
        offset: usize,
        width: usize,
        len: usize,
    },

    /// No data carrier output of the transaction carries the commitment
    #[error("the commitment is not embedded in any data carrier output")]
    CommitmentNotEmbedded,

    /// No output of the transaction pays the amount to the locking script
    #[error("no output pays {amount} satoshis to the locking script")]
    OutputNotFound { amount: u64 },

    /// The Merkle proof does not lead to the selected candidate root
    #[error("the Merkle proof does not lead to candidate root {index}")]
    RootMismatch { index: usize },

    /// A Merkle tree needs at least one leaf
    #[error("cannot build a Merkle tree without leaves")]
    EmptyMerkleTree,

    /// A Merkle proof was requested for a leaf that does not exist
    #[error("leaf index {index} is outside a tree of {leaves} leaves")]
    LeafIndexOutOfRange { index: usize, leaves: usize },

    /// Transaction (de)serialisation failed
    #[error(transparent)]
    Serialization(#[from] std::io::Error),
}

/// Errors raised by the Groth16 backend
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ProverError {
    /// The witness could not be built
    #[error(transparent)]
    Claim(#[from] ClaimError),

    /// Constraint synthesis, key generation or proving failed
    #[error("synthesis failed: {0}")]
    Synthesis(#[from] ark_relations::r1cs::SynthesisError),

    /// A key or a proof could not be (de)serialized
    #[error("serialization failed: {0}")]
    Serialization(#[from] ark_serialize::SerializationError),
}
