//! Outer aggregation circuit
//!
//! ## Overview
//! One outer circuit verifies `SLOTS` inner Groth16 proofs. Slot `i` is checked
//! against the candidate key picked by its share of the selector bits:
//!
//! 1. **Decompose** the private selector once into `SLOTS · log2(N)` flags.
//! 2. **Select** `vk_i` from the embedded candidates with flags
//!    `[i·w, (i+1)·w)`, `w = log2(N)`.
//! 3. **Assert** `Groth16.verify(vk_i, inputs_i, proof_i) == true`.
//!
//! The circuit is satisfiable iff every slot verifies. A wrong selector does not
//! error during synthesis; it leaves the constraint system unsatisfied, which
//! the pipeline's witness stage reports before any proving happens.
//!
//! ## Two instances, one layout
//! [`AggregationCircuit::placeholder`] is built from compiled inner layouts
//! (identity-point proofs, zero inputs, zero selector) and drives compilation
//! and setup. [`AggregationCircuit::assignment`] carries the real proofs. Both
//! must report the same [`AggregationLayout`]; [`prove_outer`] and
//! [`check_satisfied`] enforce it.
//!
//! Proofs, inner public inputs and the selector are all private witnesses of
//! the outer circuit. Which candidate was used per slot is not revealed.

#![forbid(unsafe_code)]
#![allow(missing_docs)]

use std::sync::Arc;

use ark_crypto_primitives::snark::{BooleanInputVar, SNARKGadget};
use ark_ec::pairing::Pairing;
use ark_groth16::{
    constraints::{Groth16VerifierGadget, ProofVar},
    Groth16, Proof,
};
use ark_r1cs_std::{alloc::AllocVar, boolean::Boolean, eq::EqGadget, fields::fp::FpVar};
use ark_relations::{
    ns,
    r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError},
};
use rand::{CryptoRng, RngCore};
use tracing::{debug, info};

use crate::cycle::{InnerScalar, OuterScalar, RecursionCycle};
use crate::pipeline::{
    build_witness, compile, run_pipeline, CompiledCircuit, PipelineArtifacts, PipelineError,
};
use crate::selector::{to_bits, Selector, SelectorError};
use crate::shape::VkShape;
use crate::switchable::SwitchableVerifyingKey;

#[derive(Debug, thiserror::Error)]
pub enum AggregationError {
    #[error(transparent)]
    Selector(#[from] SelectorError),
    #[error("selector has {got} bits, {slots} slots x {per_slot} flags need {expected}")]
    SelectorWidth { got: usize, expected: usize, slots: usize, per_slot: usize },
    #[error("slot {slot} has {got} public inputs, the candidate keys expect {expected}")]
    PublicInputCount { slot: usize, got: usize, expected: usize },
    #[error("placeholder and assignment layouts differ: {placeholder:?} vs {assignment:?}")]
    Layout { placeholder: Box<AggregationLayout>, assignment: Box<AggregationLayout> },
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Everything the outer constraint system's structure depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationLayout {
    pub slots: usize,
    pub candidates: usize,
    pub selector_bits: usize,
    /// Public-input count per slot.
    pub public_inputs: Vec<usize>,
    pub key_shape: VkShape,
}

/// Proof and public inputs for one slot.
#[derive(Debug, Clone)]
pub struct SlotAssignment<E: Pairing> {
    pub proof: Proof<E>,
    pub public_inputs: Vec<E::ScalarField>,
}

impl<E: Pairing> SlotAssignment<E> {
    /// Placeholder sized from a compiled inner circuit.
    pub fn placeholder(compiled: &CompiledCircuit) -> Self {
        Self {
            proof: compiled.placeholder_proof(),
            public_inputs: compiled.placeholder_public_inputs(),
        }
    }
}

impl<E: Pairing> From<&PipelineArtifacts<E>> for SlotAssignment<E> {
    fn from(art: &PipelineArtifacts<E>) -> Self {
        Self { proof: art.proof.clone(), public_inputs: art.public_witness.clone() }
    }
}

/// Outer circuit over `SLOTS` inner proofs and `N` candidate keys.
#[derive(Clone)]
pub struct AggregationCircuit<C: RecursionCycle, const SLOTS: usize, const N: usize> {
    selector: Selector,
    slots: [SlotAssignment<C::InnerE>; SLOTS],
    keys: Arc<SwitchableVerifyingKey<C::InnerE, N>>,
}

impl<C: RecursionCycle, const SLOTS: usize, const N: usize> AggregationCircuit<C, SLOTS, N> {
    /// Structurally-sized instance for compilation and setup.
    pub fn placeholder(
        keys: Arc<SwitchableVerifyingKey<C::InnerE, N>>,
        layouts: [&CompiledCircuit; SLOTS],
    ) -> Result<Self, AggregationError> {
        let selector = Selector::zero(SLOTS * keys.flag_bits())?;
        Self::checked(keys, selector, layouts.map(SlotAssignment::placeholder))
    }

    /// Concrete instance for proving.
    pub fn assignment(
        keys: Arc<SwitchableVerifyingKey<C::InnerE, N>>,
        selector: Selector,
        slots: [SlotAssignment<C::InnerE>; SLOTS],
    ) -> Result<Self, AggregationError> {
        Self::checked(keys, selector, slots)
    }

    fn checked(
        keys: Arc<SwitchableVerifyingKey<C::InnerE, N>>,
        selector: Selector,
        slots: [SlotAssignment<C::InnerE>; SLOTS],
    ) -> Result<Self, AggregationError> {
        let per_slot = keys.flag_bits();
        let expected = SLOTS * per_slot;
        if selector.bits() != expected {
            return Err(AggregationError::SelectorWidth {
                got: selector.bits(),
                expected,
                slots: SLOTS,
                per_slot,
            });
        }
        let inputs = keys.shape().public_input_count();
        for (slot, s) in slots.iter().enumerate() {
            if s.public_inputs.len() != inputs {
                return Err(AggregationError::PublicInputCount {
                    slot,
                    got: s.public_inputs.len(),
                    expected: inputs,
                });
            }
        }
        Ok(Self { selector, slots, keys })
    }

    pub fn selector(&self) -> Selector {
        self.selector
    }

    pub fn keys(&self) -> &Arc<SwitchableVerifyingKey<C::InnerE, N>> {
        &self.keys
    }

    pub fn layout(&self) -> AggregationLayout {
        AggregationLayout {
            slots: SLOTS,
            candidates: N,
            selector_bits: self.selector.bits(),
            public_inputs: self.slots.iter().map(|s| s.public_inputs.len()).collect(),
            key_shape: self.keys.shape().clone(),
        }
    }

    /// Same layout as `other`, or the error naming both.
    pub fn ensure_same_layout(&self, other: &Self) -> Result<(), AggregationError> {
        let (a, b) = (self.layout(), other.layout());
        if a != b {
            return Err(AggregationError::Layout { placeholder: Box::new(a), assignment: Box::new(b) });
        }
        Ok(())
    }
}

impl<C: RecursionCycle, const SLOTS: usize, const N: usize> ConstraintSynthesizer<OuterScalar<C>>
    for AggregationCircuit<C, SLOTS, N>
{
    fn generate_constraints(self, cs: ConstraintSystemRef<OuterScalar<C>>) -> Result<(), SynthesisError> {
        let keys = self.keys.allocate::<C::InnerPairingVar>(ns!(cs, "candidate_keys"))?;
        let per_slot = keys.flag_bits();

        let selector_value = OuterScalar::<C>::from(self.selector.value());
        let selector = FpVar::new_witness(ns!(cs, "selector"), || Ok(selector_value))?;
        let flags = to_bits(&selector, SLOTS * per_slot)?;

        for (i, slot) in self.slots.into_iter().enumerate() {
            let vk = keys.select(&flags[i * per_slot..(i + 1) * per_slot])?;
            // The gadget asserts on input length; fail as a synthesis error instead.
            if slot.public_inputs.len() + 1 != vk.gamma_abc_g1.len() {
                return Err(SynthesisError::Unsatisfiable);
            }
            let proof = ProofVar::<C::InnerE, C::InnerPairingVar>::new_witness(ns!(cs, "proof"), || {
                Ok(slot.proof)
            })?;
            let inputs = BooleanInputVar::<InnerScalar<C>, OuterScalar<C>>::new_witness(
                ns!(cs, "public_inputs"),
                || Ok(slot.public_inputs),
            )?;
            let valid = <Groth16VerifierGadget<C::InnerE, C::InnerPairingVar> as SNARKGadget<
                InnerScalar<C>,
                OuterScalar<C>,
                Groth16<C::InnerE>,
            >>::verify(&vk, &inputs, &proof)?;
            valid.enforce_equal(&Boolean::TRUE)?;
            debug!(slot = i, constraints = cs.num_constraints(), "slot verifier emitted");
        }
        Ok(())
    }
}

/// Compile `placeholder`, then synthesise `assignment` against it and check
/// satisfiability. No setup or proving.
pub fn check_satisfied<C: RecursionCycle, const SLOTS: usize, const N: usize>(
    placeholder: AggregationCircuit<C, SLOTS, N>,
    assignment: AggregationCircuit<C, SLOTS, N>,
) -> Result<CompiledCircuit, AggregationError> {
    placeholder.ensure_same_layout(&assignment)?;
    let compiled = compile::<OuterScalar<C>, _>(placeholder)?;
    build_witness::<OuterScalar<C>, _>(assignment, &compiled)?;
    info!(
        cycle = C::NAME,
        slots = SLOTS,
        constraints = compiled.num_constraints,
        "outer circuit satisfied"
    );
    Ok(compiled)
}

/// Full outer proof over `C::OuterE`.
pub fn prove_outer<C, R, const SLOTS: usize, const N: usize>(
    placeholder: AggregationCircuit<C, SLOTS, N>,
    assignment: AggregationCircuit<C, SLOTS, N>,
    rng: &mut R,
) -> Result<PipelineArtifacts<C::OuterE>, AggregationError>
where
    C: RecursionCycle,
    R: RngCore + CryptoRng,
{
    placeholder.ensure_same_layout(&assignment)?;
    let artifacts = run_pipeline::<C::OuterE, _, _>(placeholder, assignment, rng)?;
    info!(cycle = C::NAME, slots = SLOTS, "outer proof generated");
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuits::{DummyCircuit, PreimageCircuit};
    use crate::cycle::Bls12Bw6;
    use crate::pipeline::{verify_native, WitnessError};
    use crate::shape::check_shape_equivalent;
    use crate::{InnerE, InnerFr};
    use rand::{rngs::StdRng, SeedableRng};
    use std::sync::OnceLock;

    type Outer = AggregationCircuit<Bls12Bw6, 2, 2>;

    const DUMMY: usize = 0;
    const REAL: usize = 1;

    struct Fixture {
        main: PipelineArtifacts<InnerE>,
        dummy: PipelineArtifacts<InnerE>,
        keys: Arc<SwitchableVerifyingKey<InnerE, 2>>,
    }

    fn fixture() -> &'static Fixture {
        static FIXTURE: OnceLock<Fixture> = OnceLock::new();
        FIXTURE.get_or_init(|| {
            let mut rng = StdRng::seed_from_u64(42);
            let main = run_pipeline::<InnerE, _, _>(
                PreimageCircuit::placeholder(),
                PreimageCircuit::new(InnerFr::from(42u64)),
                &mut rng,
            )
            .unwrap();
            let dummy = run_pipeline::<InnerE, _, _>(
                DummyCircuit::placeholder(),
                DummyCircuit::new(InnerFr::from(1u64)),
                &mut rng,
            )
            .unwrap();
            check_shape_equivalent(&main.vk, &dummy.vk).unwrap();
            let keys = Arc::new(SwitchableVerifyingKey::new([dummy.vk.clone(), main.vk.clone()]).unwrap());
            Fixture { main, dummy, keys }
        })
    }

    /// Slot 0 carries the real proof, slot 1 the dummy proof.
    fn instances(selector: Selector) -> (Outer, Outer) {
        let f = fixture();
        let placeholder =
            Outer::placeholder(f.keys.clone(), [&f.main.compiled, &f.dummy.compiled]).unwrap();
        let assignment = Outer::assignment(
            f.keys.clone(),
            selector,
            [SlotAssignment::from(&f.main), SlotAssignment::from(&f.dummy)],
        )
        .unwrap();
        (placeholder, assignment)
    }

    fn honest_selector() -> Selector {
        Selector::from_slot_choices(&[REAL, DUMMY], 1).unwrap()
    }

    fn is_unsatisfied(err: &AggregationError) -> bool {
        matches!(err, AggregationError::Pipeline(PipelineError::Witness(WitnessError::Unsatisfied { .. })))
    }

    #[test]
    fn honest_selector_is_bit_one() {
        assert_eq!(honest_selector().value(), 1);
        assert_eq!(honest_selector().bits(), 2);
    }

    #[test]
    fn correct_selector_satisfies_outer_circuit() {
        let (placeholder, assignment) = instances(honest_selector());
        assert_eq!(placeholder.layout(), assignment.layout());
        let compiled = check_satisfied(placeholder, assignment).unwrap();
        assert_eq!(compiled.public_input_count(), 0);
    }

    #[test]
    fn dummy_key_against_real_proof_is_unsatisfiable() {
        let (placeholder, assignment) = instances(honest_selector().with_bit_flipped(0).unwrap());
        let err = check_satisfied(placeholder, assignment).unwrap_err();
        assert!(is_unsatisfied(&err), "{err}");
    }

    #[test]
    fn real_key_against_dummy_proof_is_unsatisfiable() {
        let (placeholder, assignment) = instances(honest_selector().with_bit_flipped(1).unwrap());
        let err = check_satisfied(placeholder, assignment).unwrap_err();
        assert!(is_unsatisfied(&err), "{err}");
    }

    #[test]
    fn constructors_validate_selector_and_inputs() {
        let f = fixture();
        let slots = || [SlotAssignment::from(&f.main), SlotAssignment::from(&f.dummy)];

        let narrow = Selector::new(1, 1).unwrap();
        assert!(matches!(
            Outer::assignment(f.keys.clone(), narrow, slots()),
            Err(AggregationError::SelectorWidth { got: 1, expected: 2, .. })
        ));

        let mut bad = slots();
        bad[1].public_inputs.push(InnerFr::from(0u64));
        assert!(matches!(
            Outer::assignment(f.keys.clone(), honest_selector(), bad),
            Err(AggregationError::PublicInputCount { slot: 1, got: 2, expected: 1 })
        ));
    }

    #[test]
    fn layout_mismatch_is_caught_before_compilation() {
        let f = fixture();
        let (placeholder, _) = instances(honest_selector());
        // Same candidates, different order: same layout.
        let swapped = Arc::new(SwitchableVerifyingKey::new([f.main.vk.clone(), f.dummy.vk.clone()]).unwrap());
        let other = Outer::placeholder(swapped, [&f.main.compiled, &f.dummy.compiled]).unwrap();
        assert!(placeholder.ensure_same_layout(&other).is_ok());

        // A 4-candidate key set cannot even be typed as `Outer`; a wider shape can.
        let mut wide_vk = f.main.vk.clone();
        wide_vk.gamma_abc_g1.push(wide_vk.gamma_abc_g1[0]);
        let mut wide_dummy = f.dummy.vk.clone();
        wide_dummy.gamma_abc_g1.push(wide_dummy.gamma_abc_g1[0]);
        let wide = Arc::new(SwitchableVerifyingKey::new([wide_dummy, wide_vk]).unwrap());
        let wide_compiled = CompiledCircuit { num_instance_variables: 3, ..f.main.compiled };
        let wide_placeholder = Outer::placeholder(wide, [&wide_compiled, &wide_compiled]).unwrap();

        let err = wide_placeholder.ensure_same_layout(&placeholder).unwrap_err();
        assert!(matches!(err, AggregationError::Layout { .. }));
        let err = check_satisfied(wide_placeholder, instances(honest_selector()).1).unwrap_err();
        assert!(matches!(err, AggregationError::Layout { .. }));
    }

    #[test]
    #[ignore = "outer Groth16 setup and proving over BW6-761 takes minutes"]
    fn outer_proof_verifies_natively() {
        let (placeholder, assignment) = instances(honest_selector());
        let mut rng = StdRng::seed_from_u64(43);
        let outer = prove_outer(placeholder, assignment, &mut rng).unwrap();
        assert!(outer.public_witness.is_empty());
        assert!(verify_native(&outer.vk, &outer.public_witness, &outer.proof).is_ok());

        let (placeholder, assignment) = instances(honest_selector().with_bit_flipped(0).unwrap());
        let err = prove_outer(placeholder, assignment, &mut rng).unwrap_err();
        assert!(is_unsatisfied(&err), "{err}");
    }
}
