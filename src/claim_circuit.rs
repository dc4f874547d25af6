use std::marker::PhantomData;

use ark_ff::PrimeField;
use ark_r1cs_std::{
    alloc::{AllocVar, AllocationMode},
    eq::EqGadget,
    fields::fp::FpVar,
    prelude::Boolean,
};
use ark_relations::{
    ns,
    r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError},
};
use tracing::debug;

use crate::{
    claim::{ClaimPublicInputs, ClaimWitness, NULLIFIER_SUFFIX},
    constraints::bits::{
        BitArrayComparator, alloc_bits_be, constant_bits_be, pack_be_bits, truncate_to_field,
    },
    constraints::extractor::ByteOffsetExtractor,
    double_sha256::constraints::{VariableLengthDoubleHasher, double_sha256_fixed},
    merkle_tree::constraints::{MerkleHiddenRootVerifier, MerkleProofVar},
    traits::ClaimConfig,
    tx_output::{COMMITMENT_BYTES, DATA_CARRIER_PREFIX, constraints::TxOutputVerifier},
};

/// The claim circuit
///
/// Enforces, for the public inputs `(roots, nullifier, amount, chain_id, recipient,
/// locker_hash)`, that the prover knows a secret and a Bitcoin transaction such that:
/// - the transaction embeds `SHA256d(secret ‖ amount ‖ chain_id ‖ recipient)` in a data
///   carrier output;
/// - `nullifier` is derived from the secret;
/// - `locker_hash` is derived from a locking script;
/// - the transaction pays `amount` to that locking script;
/// - the transaction id is the double hash of the transaction;
/// - the transaction id is included under one of `roots`, without revealing which.
///
/// Missing values are replaced by placeholders of the right shape, so the circuit can be
/// synthesized for key generation.
#[derive(Clone, Debug)]
pub struct ClaimCircuit<F: PrimeField, P: ClaimConfig> {
    /// Public inputs
    pub public_inputs: Option<ClaimPublicInputs<F>>,
    /// Witness values
    pub witness: Option<ClaimWitness>,
    _config: PhantomData<P>,
}

impl<F: PrimeField, P: ClaimConfig> ClaimCircuit<F, P> {
    pub fn new(public_inputs: ClaimPublicInputs<F>, witness: ClaimWitness) -> Self {
        Self {
            public_inputs: Some(public_inputs),
            witness: Some(witness),
            _config: PhantomData,
        }
    }

    /// Circuit without values, used for key generation
    pub fn placeholder() -> Self {
        Self {
            public_inputs: None,
            witness: None,
            _config: PhantomData,
        }
    }

    pub fn public_input(&self) -> Vec<F> {
        self.public_inputs
            .clone()
            .unwrap_or_else(ClaimPublicInputs::placeholder::<P>)
            .into()
    }
}

impl<F: PrimeField, P: ClaimConfig> ConstraintSynthesizer<F> for ClaimCircuit<F, P> {
    fn generate_constraints(self, cs: ConstraintSystemRef<F>) -> Result<(), SynthesisError> {
        let public = self
            .public_inputs
            .unwrap_or_else(ClaimPublicInputs::placeholder::<P>);
        let witness = self.witness.unwrap_or_else(ClaimWitness::placeholder::<P>);
        assert_eq!(
            public.roots.len(),
            P::NUM_ROOTS,
            "{} public roots, P::NUM_ROOTS = {}",
            public.roots.len(),
            P::NUM_ROOTS
        );
        assert_eq!(
            witness.padded_tx.bytes.len(),
            P::max_tx_bytes(),
            "the padded transaction has {} bytes, P::max_tx_bytes() = {}",
            witness.padded_tx.bytes.len(),
            P::max_tx_bytes()
        );

        // Allocate the inputs, in the order of ClaimPublicInputs
        let roots = public
            .roots
            .iter()
            .map(|root| FpVar::<F>::new_input(ns!(cs, "root"), || Ok(*root)))
            .collect::<Result<Vec<_>, _>>()?;
        let nullifier = FpVar::<F>::new_input(ns!(cs, "nullifier"), || Ok(public.nullifier))?;
        let amount = FpVar::<F>::new_input(ns!(cs, "amount"), || Ok(F::from(public.amount)))?;
        let chain_id =
            FpVar::<F>::new_input(ns!(cs, "chain_id"), || Ok(F::from(public.chain_id as u64)))?;
        let recipient = FpVar::<F>::new_input(ns!(cs, "recipient"), || {
            Ok(F::from_be_bytes_mod_order(&public.recipient))
        })?;
        let locker_hash = FpVar::<F>::new_input(ns!(cs, "locker_hash"), || Ok(public.locker_hash))?;

        // Allocate the witnesses
        let mode = AllocationMode::Witness;
        let secret = alloc_bits_be(cs.clone(), &witness.secret, mode)?;
        let amount_bits = alloc_bits_be(cs.clone(), &public.amount.to_be_bytes(), mode)?;
        let chain_id_bits = alloc_bits_be(cs.clone(), &public.chain_id.to_be_bytes(), mode)?;
        let recipient_bits = alloc_bits_be(cs.clone(), &public.recipient, mode)?;

        let mut padded_script = witness.locker_script.clone();
        padded_script.resize(P::MAX_SCRIPT_BYTES, 0);
        let script = alloc_bits_be(cs.clone(), &padded_script, mode)?;
        let script_len = FpVar::<F>::new_witness(ns!(cs, "script_len"), || {
            Ok(F::from(witness.locker_script.len() as u64))
        })?;

        let output_offset = FpVar::<F>::new_witness(ns!(cs, "output_offset"), || {
            Ok(F::from(witness.output_offset as u64))
        })?;
        let data_carrier_offset = FpVar::<F>::new_witness(ns!(cs, "data_carrier_offset"), || {
            Ok(F::from(witness.data_carrier_offset as u64))
        })?;
        let root_index = FpVar::<F>::new_witness(ns!(cs, "root_index"), || {
            Ok(F::from(witness.root_index as u64))
        })?;
        let candidate_roots = witness
            .candidate_roots
            .iter()
            .map(|root| alloc_bits_be(cs.clone(), root, mode))
            .collect::<Result<Vec<_>, _>>()?;
        let merkle_proof =
            MerkleProofVar::<F, P>::new_witness(ns!(cs, "merkle_proof"), || Ok(&witness.merkle_proof))?;
        let padded_tx = alloc_bits_be(cs.clone(), &witness.padded_tx.bytes, mode)?;
        let block_count = FpVar::<F>::new_witness(ns!(cs, "block_count"), || {
            Ok(F::from(witness.padded_tx.block_count as u64))
        })?;
        let txid = alloc_bits_be(cs.clone(), &witness.txid, mode)?;

        // Bind the public integers to their big-endian bits
        pack_be_bits(&amount_bits).enforce_equal(&amount)?;
        pack_be_bits(&chain_id_bits).enforce_equal(&chain_id)?;
        pack_be_bits(&recipient_bits).enforce_equal(&recipient)?;
        let mut constraints = cs.num_constraints();
        debug!(constraints, "allocated claim variables");

        // Commitment: OP_RETURN OP_PUSHBYTES_32 <commitment> at the data carrier offset
        let mut preimage = secret.clone();
        preimage.extend(amount_bits);
        preimage.extend(chain_id_bits);
        preimage.extend(recipient_bits);
        let mut expected_carrier = constant_bits_be::<F>(&DATA_CARRIER_PREFIX);
        expected_carrier.extend(double_sha256_fixed(&preimage)?);
        let carrier_offset = &data_carrier_offset - F::from(DATA_CARRIER_PREFIX.len() as u64);
        let carrier = ByteOffsetExtractor::extract(
            &padded_tx,
            &carrier_offset,
            DATA_CARRIER_PREFIX.len() + COMMITMENT_BYTES,
        )?;
        BitArrayComparator::enforce_equal(&carrier, &expected_carrier)?;
        constraints = log_section(&cs, "commitment", constraints);

        // Nullifier
        let mut nullifier_preimage = secret;
        nullifier_preimage.extend(constant_bits_be::<F>(&[NULLIFIER_SUFFIX]));
        truncate_to_field(&double_sha256_fixed(&nullifier_preimage)?).enforce_equal(&nullifier)?;
        constraints = log_section(&cs, "nullifier", constraints);

        // Locker identity
        truncate_to_field(&double_sha256_fixed(&script)?).enforce_equal(&locker_hash)?;
        constraints = log_section(&cs, "locker hash", constraints);

        // Output
        TxOutputVerifier::<F, P>::verify(&padded_tx, &output_offset, &amount, &script, &script_len)?
            .enforce_equal(&Boolean::TRUE)?;
        constraints = log_section(&cs, "output", constraints);

        // Transaction id
        let hasher = VariableLengthDoubleHasher::<F>::new(P::MAX_TX_BLOCKS);
        BitArrayComparator::enforce_equal(&hasher.hash(&padded_tx, &block_count)?, &txid)?;
        constraints = log_section(&cs, "txid", constraints);

        // Inclusion under the hidden root, each candidate bound to its public truncation
        for (bits, root) in candidate_roots.iter().zip(roots.iter()) {
            truncate_to_field(bits).enforce_equal(root)?;
        }
        MerkleHiddenRootVerifier::<F, P>::verify(&txid, &merkle_proof, &candidate_roots, &root_index)?;
        log_section(&cs, "inclusion", constraints);

        Ok(())
    }
}

/// Log the constraints added since `previous` and return the new total
fn log_section<F: PrimeField>(cs: &ConstraintSystemRef<F>, section: &str, previous: usize) -> usize {
    let total = cs.num_constraints();
    debug!(section, added = total - previous, total, "claim circuit section");
    total
}

#[cfg(test)]
mod test {
    use ark_bls12_381::Fr as F;
    use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystem};

    use super::ClaimCircuit;
    use crate::claim::test_fixtures::*;
    use crate::claim::{
        ClaimBuilder, ClaimPublicInputs, ClaimWitness, commitment, locker_hash, nullifier,
    };
    use crate::tx_output::{DATA_CARRIER_PREFIX, embed_output_at};
    use crate::traits::ClaimConfig;
    use crate::util::{be_bytes_to_field, truncate_to_field};

    #[derive(Clone, Debug)]
    struct Config;
    impl ClaimConfig for Config {
        const MAX_TX_BLOCKS: usize = 3;
        const MAX_MERKLE_DEPTH: usize = 3;
        const NUM_ROOTS: usize = 2;
        const MAX_SCRIPT_BYTES: usize = 34;
        const SCRIPT_LENGTHS: &[usize] = &[22, 23, 25, 34];
    }

    /// Room for two unused blocks after the 3-block claim transaction
    #[derive(Clone, Debug)]
    struct WideConfig;
    impl ClaimConfig for WideConfig {
        const MAX_TX_BLOCKS: usize = 5;
        const MAX_MERKLE_DEPTH: usize = 3;
        const NUM_ROOTS: usize = 2;
        const MAX_SCRIPT_BYTES: usize = 34;
        const SCRIPT_LENGTHS: &[usize] = &[22, 23, 25, 34];
    }

    /// Public inputs and witness with the true root at `root_index`
    fn claim_for<P: ClaimConfig>(root_index: usize) -> (ClaimPublicInputs<F>, ClaimWitness) {
        let tx = claim_tx(&request());
        let tree = block_tree(tx.hash().0);
        let mut roots = [other_root(), other_root()];
        roots[root_index] = tree.root();
        ClaimBuilder::build::<F, P>(
            &request(),
            &tx,
            &locker_script(),
            &tree.proof(5).unwrap(),
            &roots,
            root_index,
        )
        .unwrap()
    }

    fn claim(root_index: usize) -> (ClaimPublicInputs<F>, ClaimWitness) {
        claim_for::<Config>(root_index)
    }

    fn test_claim_for<P: ClaimConfig>(
        public_inputs: ClaimPublicInputs<F>,
        witness: ClaimWitness,
    ) -> bool {
        let circuit = ClaimCircuit::<F, P>::new(public_inputs, witness);
        let cs = ConstraintSystem::<F>::new_ref();
        circuit.generate_constraints(cs.clone()).unwrap();
        cs.is_satisfied().unwrap()
    }

    fn test_claim(public_inputs: ClaimPublicInputs<F>, witness: ClaimWitness) -> bool {
        test_claim_for::<Config>(public_inputs, witness)
    }

    #[test]
    fn test_claim_is_ok() {
        let (public_inputs, witness) = claim(1);
        let circuit = ClaimCircuit::<F, Config>::new(public_inputs.clone(), witness.clone());
        let tree = block_tree(witness.txid);

        assert_eq!(
            circuit.public_input(),
            vec![
                truncate_to_field::<F>(&other_root()),
                truncate_to_field::<F>(&tree.root()),
                nullifier::<F>(&SECRET),
                F::from(100_000_000u64),
                F::from(137u64),
                be_bytes_to_field::<F>(&recipient()),
                locker_hash::<F, Config>(&locker_script().0).unwrap(),
            ]
        );
        assert!(test_claim(public_inputs, witness));
    }

    #[test]
    fn test_flipped_sibling_bit_fails() {
        let (public_inputs, mut witness) = claim(1);
        witness.merkle_proof.siblings[1][0] ^= 0x40;
        assert!(!test_claim(public_inputs, witness));
    }

    #[test]
    fn test_wrong_public_values_fail() {
        let (public_inputs, witness) = claim(1);

        let mut wrong = public_inputs.clone();
        wrong.amount -= 1;
        assert!(!test_claim(wrong, witness.clone()));

        let mut wrong = public_inputs.clone();
        wrong.recipient[19] ^= 0x01;
        assert!(!test_claim(wrong, witness.clone()));

        let mut wrong = public_inputs.clone();
        wrong.nullifier += F::from(1u64);
        assert!(!test_claim(wrong, witness.clone()));

        let mut wrong = public_inputs;
        wrong.roots.swap(0, 1);
        assert!(!test_claim(wrong, witness));
    }

    #[test]
    fn test_wrong_witness_fails() {
        let (public_inputs, witness) = claim(1);

        let mut wrong = witness.clone();
        wrong.secret[0] ^= 0x01;
        assert!(!test_claim(public_inputs.clone(), wrong));

        let mut wrong = witness.clone();
        wrong.data_carrier_offset += 1;
        assert!(!test_claim(public_inputs.clone(), wrong));

        let mut wrong = witness.clone();
        wrong.padded_tx.block_count = 2;
        assert!(!test_claim(public_inputs.clone(), wrong));

        let mut wrong = witness;
        wrong.root_index = 0;
        assert!(!test_claim(public_inputs, wrong));
    }

    #[test]
    fn test_output_in_unhashed_blocks_fails() {
        let (mut public_inputs, mut witness) = claim_for::<WideConfig>(1);
        assert_eq!(witness.padded_tx.block_count, 3);
        assert!(test_claim_for::<WideConfig>(
            public_inputs.clone(),
            witness.clone()
        ));

        // A second payment and a matching data carrier written past the hashed blocks
        let forged_amount = 7 * AMOUNT;
        let mut bytes = embed_output_at::<WideConfig>(
            &witness.padded_tx.bytes,
            192,
            forged_amount,
            &locker_script().0,
        )
        .unwrap();
        bytes[256..258].copy_from_slice(&DATA_CARRIER_PREFIX);
        bytes[258..290].copy_from_slice(&commitment(&SECRET, forged_amount, CHAIN_ID, &recipient()));
        witness.padded_tx.bytes = bytes;
        witness.output_offset = 192;
        witness.data_carrier_offset = 258;
        public_inputs.amount = forged_amount;

        assert!(!test_claim_for::<WideConfig>(public_inputs, witness));
    }

    #[test]
    fn test_root_index_is_hidden() {
        let shape = |root_index: usize| {
            let (public_inputs, witness) = claim(root_index);
            let circuit = ClaimCircuit::<F, Config>::new(public_inputs, witness);
            let public_len = circuit.public_input().len();
            let cs = ConstraintSystem::<F>::new_ref();
            circuit.generate_constraints(cs.clone()).unwrap();
            assert!(cs.is_satisfied().unwrap());
            (
                cs.num_constraints(),
                cs.num_instance_variables(),
                cs.num_witness_variables(),
                public_len,
            )
        };
        assert_eq!(shape(0), shape(1));
    }

    #[test]
    fn test_placeholder_has_the_same_shape() {
        let (public_inputs, witness) = claim(0);
        let cs = ConstraintSystem::<F>::new_ref();
        ClaimCircuit::<F, Config>::new(public_inputs, witness)
            .generate_constraints(cs.clone())
            .unwrap();

        let placeholder_cs = ConstraintSystem::<F>::new_ref();
        ClaimCircuit::<F, Config>::placeholder()
            .generate_constraints(placeholder_cs.clone())
            .unwrap();

        assert_eq!(cs.num_constraints(), placeholder_cs.num_constraints());
        assert_eq!(
            cs.num_instance_variables(),
            placeholder_cs.num_instance_variables()
        );
    }
}
