//! Example inner circuits
//!
//! - [`PreimageCircuit`]: knowledge of a secret preimage of a public MiMC hash.
//! - [`DummyCircuit`]: one public input and no constraints. Its proofs always
//!   exist, which makes it the padding candidate for unused aggregation slots.
//!
//! Both expose exactly one public input and no commitments, so their keys are
//! shape-equivalent.

#![forbid(unsafe_code)]

use ark_ff::PrimeField;
use ark_r1cs_std::{alloc::AllocVar, eq::EqGadget, fields::fp::FpVar};
use ark_relations::{
    ns,
    r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError},
};

use crate::mimc;

/// `hash == MiMC(preimage)`, hash public, preimage secret.
#[derive(Clone, Debug)]
pub struct PreimageCircuit<F: PrimeField> {
    preimage: F,
    hash: F,
}

impl<F: PrimeField> PreimageCircuit<F> {
    /// Honest assignment for `preimage`.
    pub fn new(preimage: F) -> Self {
        Self { preimage, hash: mimc::hash(&[preimage]) }
    }

    /// Assignment with an arbitrary claimed hash (possibly wrong).
    pub fn with_claimed_hash(preimage: F, hash: F) -> Self {
        Self { preimage, hash }
    }

    /// Zero-valued instance for compilation and setup.
    pub fn placeholder() -> Self {
        Self { preimage: F::zero(), hash: F::zero() }
    }

    /// Claimed public hash.
    pub fn hash(&self) -> F {
        self.hash
    }
}

impl<F: PrimeField> ConstraintSynthesizer<F> for PreimageCircuit<F> {
    fn generate_constraints(self, cs: ConstraintSystemRef<F>) -> Result<(), SynthesisError> {
        let hash = FpVar::new_input(ns!(cs, "hash"), || Ok(self.hash))?;
        let preimage = FpVar::new_witness(ns!(cs, "preimage"), || Ok(self.preimage))?;
        let digest = mimc::hash_var(&[preimage])?;
        digest.enforce_equal(&hash)
    }
}

/// Unconstrained public input `a`.
#[derive(Clone, Debug)]
pub struct DummyCircuit<F: PrimeField> {
    a: F,
}

impl<F: PrimeField> DummyCircuit<F> {
    /// Instance with public input `a`.
    pub fn new(a: F) -> Self {
        Self { a }
    }

    /// Zero-valued instance for compilation and setup.
    pub fn placeholder() -> Self {
        Self { a: F::zero() }
    }
}

impl<F: PrimeField> ConstraintSynthesizer<F> for DummyCircuit<F> {
    fn generate_constraints(self, cs: ConstraintSystemRef<F>) -> Result<(), SynthesisError> {
        FpVar::new_input(ns!(cs, "a"), || Ok(self.a))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_relations::r1cs::ConstraintSystem;

    type Fr = crate::InnerFr;

    #[test]
    fn preimage_circuit_rejects_wrong_hash() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        PreimageCircuit::new(Fr::from(42u64)).generate_constraints(cs.clone()).unwrap();
        assert!(cs.is_satisfied().unwrap());

        let cs = ConstraintSystem::<Fr>::new_ref();
        PreimageCircuit::with_claimed_hash(Fr::from(42u64), Fr::from(3u64))
            .generate_constraints(cs.clone())
            .unwrap();
        assert!(!cs.is_satisfied().unwrap());
    }

    #[test]
    fn dummy_accepts_anything() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        DummyCircuit::new(Fr::from(123u64)).generate_constraints(cs.clone()).unwrap();
        assert!(cs.is_satisfied().unwrap());
        assert_eq!(cs.num_instance_variables(), 2);
        assert_eq!(cs.num_constraints(), 0);
    }
}
