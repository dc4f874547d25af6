//! Claim values and witness construction
//!
//! A claim proves that a Bitcoin transaction, included under one of a few public Merkle
//! roots, embeds `commitment = SHA256d(secret ‖ amount ‖ chain id ‖ recipient)` in a data
//! carrier output and pays `amount` satoshis to a registered locking script.

use ark_ff::PrimeField;
use chain_gang::{messages::Tx, script::Script};
use tracing::{debug, info};

use crate::double_sha256::{PaddedMessage, double_sha256, pad_message};
use crate::error::ClaimError;
use crate::merkle_tree::MerkleProof;
use crate::traits::ClaimConfig;
use crate::tx_output::{TxLayout, VALUE_BYTES, check_script_length};
use crate::util::{be_bytes_to_field, truncate_to_field};

pub const SECRET_BYTES: usize = 32;
pub const AMOUNT_BYTES: usize = 8;
pub const CHAIN_ID_BYTES: usize = 4;
pub const RECIPIENT_BYTES: usize = 20;
pub const COMMITMENT_PREIMAGE_BYTES: usize =
    SECRET_BYTES + AMOUNT_BYTES + CHAIN_ID_BYTES + RECIPIENT_BYTES;
/// Byte appended to the secret before hashing it into the nullifier
pub const NULLIFIER_SUFFIX: u8 = 0x01;

/// `secret ‖ amount ‖ chain_id ‖ recipient`, integers big-endian
pub fn commitment_preimage(
    secret: &[u8; 32],
    amount: u64,
    chain_id: u32,
    recipient: &[u8; 20],
) -> [u8; COMMITMENT_PREIMAGE_BYTES] {
    let mut preimage = [0u8; COMMITMENT_PREIMAGE_BYTES];
    preimage[..32].copy_from_slice(secret);
    preimage[32..40].copy_from_slice(&amount.to_be_bytes());
    preimage[40..44].copy_from_slice(&chain_id.to_be_bytes());
    preimage[44..].copy_from_slice(recipient);
    preimage
}

/// Commitment embedded in the data carrier output of the claimed transaction
pub fn commitment(secret: &[u8; 32], amount: u64, chain_id: u32, recipient: &[u8; 20]) -> [u8; 32] {
    double_sha256(&commitment_preimage(secret, amount, chain_id, recipient))
}

/// Public identifier of `secret`, preventing a second claim with the same secret
pub fn nullifier<F: PrimeField>(secret: &[u8; 32]) -> F {
    let mut preimage = secret.to_vec();
    preimage.push(NULLIFIER_SUFFIX);
    truncate_to_field(&double_sha256(&preimage))
}

/// Identifier of a locking script: the hash of the script zero-padded to
/// `P::MAX_SCRIPT_BYTES` bytes
pub fn locker_hash<F: PrimeField, P: ClaimConfig>(script: &[u8]) -> Result<F, ClaimError> {
    check_script_length::<P>(script.len())?;
    let mut padded = script.to_vec();
    padded.resize(P::MAX_SCRIPT_BYTES, 0);
    Ok(truncate_to_field(&double_sha256(&padded)))
}

/// Public values of a claim, in the order the verifier consumes them
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClaimPublicInputs<F: PrimeField> {
    /// Candidate Merkle roots, truncated to 254 bits
    pub roots: Vec<F>,
    pub nullifier: F,
    pub amount: u64,
    pub chain_id: u32,
    pub recipient: [u8; 20],
    pub locker_hash: F,
}

impl<F: PrimeField> ClaimPublicInputs<F> {
    /// Public inputs of the right shape for key generation
    pub fn placeholder<P: ClaimConfig>() -> Self {
        Self {
            roots: vec![F::zero(); P::NUM_ROOTS],
            nullifier: F::zero(),
            amount: 0,
            chain_id: 0,
            recipient: [0u8; 20],
            locker_hash: F::zero(),
        }
    }
}

impl<F: PrimeField> From<ClaimPublicInputs<F>> for Vec<F> {
    fn from(inputs: ClaimPublicInputs<F>) -> Self {
        let mut vector = inputs.roots;
        vector.push(inputs.nullifier);
        vector.push(F::from(inputs.amount));
        vector.push(F::from(inputs.chain_id as u64));
        vector.push(be_bytes_to_field(&inputs.recipient));
        vector.push(inputs.locker_hash);
        vector
    }
}

/// Private values of a claim
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClaimWitness {
    pub secret: [u8; 32],
    /// Locking script paid by the transaction, not padded
    pub locker_script: Vec<u8>,
    /// Byte offset of the paying output in the serialized transaction
    pub output_offset: usize,
    /// Byte offset of the commitment in the serialized transaction
    pub data_carrier_offset: usize,
    pub root_index: usize,
    /// Full 256-bit candidate roots
    pub candidate_roots: Vec<[u8; 32]>,
    /// Inclusion proof of the transaction id, zero-filled to `P::MAX_MERKLE_DEPTH`
    pub merkle_proof: MerkleProof,
    pub padded_tx: PaddedMessage,
    pub txid: [u8; 32],
}

impl ClaimWitness {
    /// Witness of the right shape for key generation
    pub fn placeholder<P: ClaimConfig>() -> Self {
        Self {
            secret: [0u8; 32],
            locker_script: vec![0u8; P::SCRIPT_LENGTHS[0]],
            output_offset: 0,
            data_carrier_offset: 0,
            root_index: 0,
            candidate_roots: vec![[0u8; 32]; P::NUM_ROOTS],
            merkle_proof: MerkleProof {
                siblings: vec![[0u8; 32]; P::MAX_MERKLE_DEPTH],
                directions: vec![false; P::MAX_MERKLE_DEPTH],
                depth: 1,
            },
            padded_tx: PaddedMessage {
                bytes: vec![0u8; P::max_tx_bytes()],
                block_count: 1,
            },
            txid: [0u8; 32],
        }
    }
}

/// What the claimant asserts about the bridged funds
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClaimRequest {
    pub secret: [u8; 32],
    pub amount: u64,
    pub chain_id: u32,
    pub recipient: [u8; 20],
}

/// Builds the public inputs and the witness of a claim, rejecting inconsistent claims
/// before any constraint is generated
pub struct ClaimBuilder;

impl ClaimBuilder {
    pub fn build<F: PrimeField, P: ClaimConfig>(
        request: &ClaimRequest,
        tx: &Tx,
        locker_script: &Script,
        merkle_proof: &MerkleProof,
        candidate_roots: &[[u8; 32]],
        root_index: usize,
    ) -> Result<(ClaimPublicInputs<F>, ClaimWitness), ClaimError> {
        if candidate_roots.len() != P::NUM_ROOTS {
            return Err(ClaimError::WrongRootCount {
                expected: P::NUM_ROOTS,
                got: candidate_roots.len(),
            });
        }
        if root_index >= P::NUM_ROOTS {
            return Err(ClaimError::RootIndexOutOfRange {
                index: root_index,
                num_roots: P::NUM_ROOTS,
            });
        }
        let locker_hash = locker_hash::<F, P>(&locker_script.0)?;

        let layout = TxLayout::new(tx)?;
        let padded_tx = pad_message(&layout.bytes, P::MAX_TX_BLOCKS)?;

        let commitment = commitment(
            &request.secret,
            request.amount,
            request.chain_id,
            &request.recipient,
        );
        let data_carrier_offset = layout.find_commitment(&commitment)?;

        let output_offset = layout.find_payment(request.amount, &locker_script.0)?;
        // The in-circuit script window always spans the full script width
        let width = VALUE_BYTES + 1 + P::MAX_SCRIPT_BYTES;
        if output_offset + width > P::max_tx_bytes() {
            return Err(ClaimError::OffsetOutOfBounds {
                offset: output_offset,
                width,
                len: P::max_tx_bytes(),
            });
        }

        let txid = double_sha256(&layout.bytes);
        let merkle_proof = merkle_proof.zero_filled(P::MAX_MERKLE_DEPTH)?;
        if merkle_proof.compute_root(&txid) != candidate_roots[root_index] {
            return Err(ClaimError::RootMismatch { index: root_index });
        }
        debug!(
            output_offset,
            data_carrier_offset,
            block_count = padded_tx.block_count,
            depth = merkle_proof.depth,
            "located claim witness"
        );

        let public_inputs = ClaimPublicInputs {
            roots: candidate_roots.iter().map(truncate_to_field::<F>).collect(),
            nullifier: nullifier(&request.secret),
            amount: request.amount,
            chain_id: request.chain_id,
            recipient: request.recipient,
            locker_hash,
        };
        let witness = ClaimWitness {
            secret: request.secret,
            locker_script: locker_script.0.clone(),
            output_offset,
            data_carrier_offset,
            root_index,
            candidate_roots: candidate_roots.to_vec(),
            merkle_proof,
            padded_tx,
            txid,
        };
        info!(amount = request.amount, chain_id = request.chain_id, "built claim");

        Ok((public_inputs, witness))
    }
}
