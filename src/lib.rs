//! This library provides an R1CS circuit proving a Bitcoin-to-chain bridge claim: a Bitcoin transaction, included under one of several public Merkle roots, embeds a commitment to the claim and pays the claimed amount to a registered locking script.
//!
//! Bitcoin structures are taken from the library [chain_gang], while the R1CS variables are built using the framework provided by the [ark_r1cs_std] library.
//! Proofs are produced with Groth16 through [ark_groth16].
//!
//! # Example
//! The code below reads a byte at a private offset of a private buffer: the offset is turned into a one-hot selector
//! and the extracted byte is the weighted sum over all candidate positions.
//!
//! ```
//! use ark_bls12_381::Fr as ScalarField;
//! use ark_r1cs_std::alloc::{AllocVar, AllocationMode};
//! use ark_r1cs_std::fields::fp::FpVar;
//! use ark_relations::r1cs::ConstraintSystem;
//! use btc_claim_r1cs::constraints::bits::{BitArrayComparator, alloc_bits_be, constant_bits_be};
//! use btc_claim_r1cs::constraints::extractor::ByteOffsetExtractor;
//!
//! let cs = ConstraintSystem::<ScalarField>::new_ref();
//! let buffer = alloc_bits_be(cs.clone(), &[0x6a, 0x20, 0x51], AllocationMode::Witness).unwrap();
//! let offset = FpVar::new_witness(cs.clone(), || Ok(ScalarField::from(1u64))).unwrap();
//! let byte = ByteOffsetExtractor::extract(&buffer, &offset, 1).unwrap();
//! BitArrayComparator::enforce_equal(&byte, &constant_bits_be(&[0x20])).unwrap();
//! assert!(cs.is_satisfied().unwrap());
//! ```

/// Claim values, native derivations and witness construction
pub mod claim;
/// The claim circuit, composing every binding of a claim into one proof obligation
pub mod claim_circuit;
/// Generic R1CS primitives: bit arrays, one-hot selection and variable-offset reads
pub mod constraints;
/// Double SHA-256, natively and in R1CS, over fixed and variable-length messages
pub mod double_sha256;
pub mod error;
/// Bitcoin Merkle trees and hidden-root inclusion proofs
pub mod merkle_tree;
/// Groth16 key generation, proving and verification
pub mod prover;
pub mod traits;
/// Transaction outputs: location in serialized transactions and in-circuit verification
pub mod tx_output;
pub mod util;
