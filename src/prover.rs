//! Groth16 proving and verification of claims
//!
//! The proving key depends only on the [ClaimConfig]: it is generated once from a
//! placeholder [ClaimCircuit] and can then prove any claim of that configuration.

use std::marker::PhantomData;

use ark_ec::pairing::Pairing;
use ark_groth16::{Groth16, PreparedVerifyingKey, Proof, ProvingKey};
use ark_relations::r1cs::ConstraintSynthesizer;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::{CircuitSpecificSetupSNARK, SNARK};
use rand::{CryptoRng, RngCore};
use tracing::{info, instrument};

use crate::claim::{ClaimPublicInputs, ClaimWitness};
use crate::claim_circuit::ClaimCircuit;
use crate::error::ProverError;
use crate::traits::ClaimConfig;

/// Circuit-specific setup
pub fn generate_keys<E, C, R>(
    circuit: C,
    rng: &mut R,
) -> Result<(ProvingKey<E>, PreparedVerifyingKey<E>), ProverError>
where
    E: Pairing,
    C: ConstraintSynthesizer<E::ScalarField>,
    R: RngCore + CryptoRng,
{
    let (pk, vk) = Groth16::<E>::circuit_specific_setup(circuit, rng)?;
    let pvk = Groth16::<E>::process_vk(&vk)?;
    Ok((pk, pvk))
}

pub fn create_proof<E, C, R>(
    circuit: C,
    pk: &ProvingKey<E>,
    rng: &mut R,
) -> Result<Proof<E>, ProverError>
where
    E: Pairing,
    C: ConstraintSynthesizer<E::ScalarField>,
    R: RngCore + CryptoRng,
{
    Ok(Groth16::<E>::prove(pk, circuit, rng)?)
}

/// The pairing check performed by the on-chain verifier
pub fn verify_proof<E: Pairing>(
    pvk: &PreparedVerifyingKey<E>,
    public_inputs: &[E::ScalarField],
    proof: &Proof<E>,
) -> Result<bool, ProverError> {
    Ok(Groth16::<E>::verify_with_processed_vk(
        pvk,
        public_inputs,
        proof,
    )?)
}

/// Compressed canonical encoding of a proof
pub fn proof_to_bytes<E: Pairing>(proof: &Proof<E>) -> Result<Vec<u8>, ProverError> {
    let mut bytes = Vec::with_capacity(proof.compressed_size());
    proof.serialize_compressed(&mut bytes)?;
    Ok(bytes)
}

pub fn proof_from_bytes<E: Pairing>(bytes: &[u8]) -> Result<Proof<E>, ProverError> {
    Ok(Proof::<E>::deserialize_compressed(bytes)?)
}

/// Keys of the claim circuit for the configuration `P`
pub struct ClaimProver<E: Pairing, P: ClaimConfig> {
    pk: ProvingKey<E>,
    pvk: PreparedVerifyingKey<E>,
    _config: PhantomData<P>,
}

impl<E: Pairing, P: ClaimConfig> ClaimProver<E, P> {
    #[instrument(skip_all)]
    pub fn setup<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self, ProverError> {
        let (pk, pvk) = generate_keys(ClaimCircuit::<E::ScalarField, P>::placeholder(), rng)?;
        info!(
            public_inputs = pvk.vk.gamma_abc_g1.len() - 1,
            "generated claim keys"
        );
        Ok(Self {
            pk,
            pvk,
            _config: PhantomData,
        })
    }

    #[instrument(skip_all)]
    pub fn prove<R: RngCore + CryptoRng>(
        &self,
        public_inputs: ClaimPublicInputs<E::ScalarField>,
        witness: ClaimWitness,
        rng: &mut R,
    ) -> Result<Proof<E>, ProverError> {
        let circuit = ClaimCircuit::<E::ScalarField, P>::new(public_inputs, witness);
        let proof = create_proof(circuit, &self.pk, rng)?;
        info!("proved claim");
        Ok(proof)
    }

    #[instrument(skip_all)]
    pub fn verify(
        &self,
        public_inputs: &ClaimPublicInputs<E::ScalarField>,
        proof: &Proof<E>,
    ) -> Result<bool, ProverError> {
        let inputs: Vec<E::ScalarField> = public_inputs.clone().into();
        let is_valid = verify_proof(&self.pvk, &inputs, proof)?;
        info!(is_valid, "verified claim");
        Ok(is_valid)
    }
}

#[cfg(test)]
mod test {
    use ark_bls12_381::{Bls12_381 as E, Fr as F};
    use ark_ff::PrimeField;
    use ark_r1cs_std::{
        alloc::{AllocVar, AllocationMode},
        eq::EqGadget,
        fields::fp::FpVar,
    };
    use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;
    use crate::claim::ClaimBuilder;
    use crate::claim::test_fixtures::*;
    use crate::constraints::bits::{alloc_bits_be, pack_be_bits};
    use crate::constraints::extractor::ByteOffsetExtractor;

    /// Proves that `byte` sits somewhere in a private buffer
    #[derive(Clone)]
    struct ByteAtOffset {
        buffer: [u8; 8],
        offset: u64,
        byte: u8,
    }

    impl<Fp: PrimeField> ConstraintSynthesizer<Fp> for ByteAtOffset {
        fn generate_constraints(self, cs: ConstraintSystemRef<Fp>) -> Result<(), SynthesisError> {
            let byte = FpVar::<Fp>::new_input(cs.clone(), || Ok(Fp::from(self.byte)))?;
            let buffer = alloc_bits_be(cs.clone(), &self.buffer, AllocationMode::Witness)?;
            let offset = FpVar::<Fp>::new_witness(cs.clone(), || Ok(Fp::from(self.offset)))?;
            let extracted = ByteOffsetExtractor::extract(&buffer, &offset, 1)?;
            pack_be_bits(&extracted).enforce_equal(&byte)
        }
    }

    #[test]
    fn test_groth16_round_trip() {
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        let circuit = ByteAtOffset {
            buffer: [1, 2, 3, 4, 5, 6, 7, 8],
            offset: 5,
            byte: 6,
        };
        let (pk, pvk) = generate_keys::<E, _, _>(circuit.clone(), &mut rng).unwrap();
        let proof = create_proof(circuit, &pk, &mut rng).unwrap();

        assert!(verify_proof(&pvk, &[F::from(6u64)], &proof).unwrap());
        assert!(!verify_proof(&pvk, &[F::from(7u64)], &proof).unwrap());

        let bytes = proof_to_bytes(&proof).unwrap();
        let decoded = proof_from_bytes::<E>(&bytes).unwrap();
        assert_eq!(decoded, proof);
        assert!(proof_from_bytes::<E>(&bytes[1..]).is_err());
    }

    #[derive(Clone, Debug)]
    struct Config;
    impl ClaimConfig for Config {
        const MAX_TX_BLOCKS: usize = 3;
        const MAX_MERKLE_DEPTH: usize = 3;
        const NUM_ROOTS: usize = 2;
        const MAX_SCRIPT_BYTES: usize = 34;
        const SCRIPT_LENGTHS: &[usize] = &[22, 23, 25, 34];
    }

    #[test]
    #[ignore = "full claim circuit setup takes minutes"]
    fn test_claim_prover() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let prover = ClaimProver::<E, Config>::setup(&mut rng).unwrap();

        let tx = claim_tx(&request());
        let tree = block_tree(tx.hash().0);
        let roots = [other_root(), tree.root()];
        let (public_inputs, witness) = ClaimBuilder::build::<F, Config>(
            &request(),
            &tx,
            &locker_script(),
            &tree.proof(5).unwrap(),
            &roots,
            1,
        )
        .unwrap();

        let proof = prover.prove(public_inputs.clone(), witness, &mut rng).unwrap();
        assert!(prover.verify(&public_inputs, &proof).unwrap());

        let mut other = public_inputs;
        other.chain_id = 1;
        assert!(!prover.verify(&other, &proof).unwrap());
    }
}
