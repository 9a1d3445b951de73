//! Recursion cycle
//!
//! A cycle fixes the two curves of a two-layer composition: inner proofs are
//! Groth16 proofs over `InnerE`, and the outer circuit re-runs their verifier
//! over `OuterE::ScalarField`, which must be the (prime) base field of
//! `InnerE` so group elements embed natively.

#![forbid(unsafe_code)]

use ark_ec::{pairing::Pairing, CurveGroup};
use ark_ff::Field;
use ark_r1cs_std::pairing::PairingVar;

/// Prime field over which points of `E` have their coordinates.
///
/// Spelled through `E::G1` so it is the same type `ark_groth16::constraints`
/// bounds its gadgets on.
pub type BasePrimeField<E> = <<<E as Pairing>::G1 as CurveGroup>::BaseField as Field>::BasePrimeField;

/// Scalar field of the inner circuits of cycle `C`.
pub type InnerScalar<C> = <<C as RecursionCycle>::InnerE as Pairing>::ScalarField;

/// Field the outer circuit of cycle `C` is arithmetised over.
pub type OuterScalar<C> = BasePrimeField<<C as RecursionCycle>::InnerE>;

/// Inner/outer curve pair with the pairing gadget used for recursion.
pub trait RecursionCycle: Clone + Send + Sync + 'static {
    /// Curve the inner proofs are produced on.
    type InnerE: Pairing;
    /// Curve the outer proof is produced on.
    type OuterE: Pairing<ScalarField = BasePrimeField<Self::InnerE>>;
    /// In-circuit pairing of `InnerE`, arithmetised over the outer scalar field.
    type InnerPairingVar: PairingVar<Self::InnerE, BasePrimeField<Self::InnerE>>;

    /// Human-readable name used in logs.
    const NAME: &'static str;
}

/// BLS12-377 inner proofs verified inside BW6-761 circuits.
#[derive(Clone, Copy, Debug, Default)]
pub struct Bls12Bw6;

impl RecursionCycle for Bls12Bw6 {
    type InnerE = ark_bls12_377::Bls12_377;
    type OuterE = ark_bw6_761::BW6_761;
    type InnerPairingVar = ark_bls12_377::constraints::PairingVar;

    const NAME: &'static str = "bls12-377/bw6-761";
}
