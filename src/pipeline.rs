//! Proof pipeline: compile → setup → witness → prove → native verify
//!
//! ## Overview
//! One run turns a circuit definition into the artifacts the recursion layer
//! consumes: the compiled layout, the public witness, the proof and the keys.
//! Two instances of the same circuit type are supplied:
//!
//! - the **placeholder**, synthesised in setup mode; its values are never read,
//!   only its layout, so it may carry zeros;
//! - the **assignment**, synthesised in prove mode with concrete values.
//!
//! ## Stage discipline
//! Every stage consumes the previous stage's output and fails with its own
//! [`PipelineError`] variant; nothing is returned on failure. The witness stage
//! checks satisfiability before the prover runs, so an unsatisfiable
//! assignment surfaces as [`WitnessError::Unsatisfied`] and never reaches
//! `Groth16::prove`.
//!
//! ## Which field
//! The pipeline is generic over the pairing `E`. For inner proofs `E` is the
//! cycle's `InnerE`; the proof is later verified in-circuit over
//! `OuterE::ScalarField`. The outer proof itself is produced by running the
//! same pipeline with `E = OuterE`.

#![forbid(unsafe_code)]
#![allow(missing_docs)]

use std::fmt;

use ark_ec::{pairing::Pairing, AffineRepr};
use ark_ff::{Field, PrimeField};
use ark_groth16::{Groth16, Proof, ProvingKey, VerifyingKey};
use ark_relations::r1cs::{
    ConstraintSynthesizer, ConstraintSystem, OptimizationGoal, SynthesisError, SynthesisMode,
};
use ark_snark::SNARK;
use rand::{CryptoRng, RngCore};
use tracing::{debug, info, info_span, warn};

use crate::config::PipelineConfig;

/// Pipeline stage, used to report where a run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Compile,
    Setup,
    Witness,
    Prove,
    NativeVerify,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Compile => "compile",
            Stage::Setup => "setup",
            Stage::Witness => "witness",
            Stage::Prove => "prove",
            Stage::NativeVerify => "native-verify",
        };
        f.write_str(s)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WitnessError {
    #[error("synthesis failed: {0}")]
    Synthesis(#[source] SynthesisError),
    #[error("{what} differs from the compiled circuit: compiled {compiled}, assigned {assigned}")]
    Layout { what: &'static str, compiled: usize, assigned: usize },
    #[error("constraint `{constraint}` is not satisfied")]
    Unsatisfied { constraint: String },
}

#[derive(Debug, thiserror::Error)]
pub enum NativeVerifyError {
    #[error("proof rejected by its own verifying key")]
    Rejected,
    #[error("verifier failed: {0}")]
    Verifier(#[source] SynthesisError),
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("compile: {0}")]
    Compile(#[source] SynthesisError),
    #[error("setup: {0}")]
    Setup(#[source] SynthesisError),
    #[error("witness: {0}")]
    Witness(#[from] WitnessError),
    #[error("prove: {0}")]
    Prove(#[source] SynthesisError),
    #[error("native verify: {0}")]
    NativeVerify(#[from] NativeVerifyError),
}

impl PipelineError {
    /// Stage the error originated in.
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Compile(_) => Stage::Compile,
            PipelineError::Setup(_) => Stage::Setup,
            PipelineError::Witness(_) => Stage::Witness,
            PipelineError::Prove(_) => Stage::Prove,
            PipelineError::NativeVerify(_) => Stage::NativeVerify,
        }
    }
}

// ============================================================================
// Artifacts
// ============================================================================

/// Layout of a compiled circuit.
///
/// `num_instance_variables` includes the constant-one variable, so it is also
/// the length of `K` in any verifying key produced for this circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompiledCircuit {
    pub num_constraints: usize,
    pub num_instance_variables: usize,
    pub num_witness_variables: usize,
}

impl CompiledCircuit {
    pub fn public_input_count(&self) -> usize {
        self.num_instance_variables.saturating_sub(1)
    }

    /// Zero public inputs of the right length.
    pub fn placeholder_public_inputs<F: Field>(&self) -> Vec<F> {
        vec![F::zero(); self.public_input_count()]
    }

    /// Proof made of identity points. Only its size matters.
    pub fn placeholder_proof<E: Pairing>(&self) -> Proof<E> {
        Proof { a: E::G1Affine::zero(), b: E::G2Affine::zero(), c: E::G1Affine::zero() }
    }
}

/// Satisfying assignment, split into its public and private parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Witness<F> {
    /// Public inputs, without the constant one.
    public: Vec<F>,
    private: Vec<F>,
}

impl<F: Clone> Witness<F> {
    pub fn public(&self) -> &[F] {
        &self.public
    }

    pub fn private(&self) -> &[F] {
        &self.private
    }

    /// Public values followed by private values.
    pub fn full(&self) -> Vec<F> {
        let mut out = Vec::with_capacity(self.public.len() + self.private.len());
        out.extend_from_slice(&self.public);
        out.extend_from_slice(&self.private);
        out
    }

    pub fn into_public(self) -> Vec<F> {
        self.public
    }
}

/// Everything one pipeline run produces.
#[derive(Clone, Debug)]
pub struct PipelineArtifacts<E: Pairing> {
    pub compiled: CompiledCircuit,
    pub public_witness: Vec<E::ScalarField>,
    pub proof: Proof<E>,
    pub vk: VerifyingKey<E>,
    pub pk: ProvingKey<E>,
}

// ============================================================================
// Stages
// ============================================================================

/// Synthesise `circuit` in setup mode and record its layout.
pub fn compile<F, C>(circuit: C) -> Result<CompiledCircuit, PipelineError>
where
    F: PrimeField,
    C: ConstraintSynthesizer<F>,
{
    let cs = ConstraintSystem::<F>::new_ref();
    cs.set_mode(SynthesisMode::Setup);
    cs.set_optimization_goal(OptimizationGoal::Constraints);
    circuit.generate_constraints(cs.clone()).map_err(PipelineError::Compile)?;
    cs.finalize();

    let compiled = CompiledCircuit {
        num_constraints: cs.num_constraints(),
        num_instance_variables: cs.num_instance_variables(),
        num_witness_variables: cs.num_witness_variables(),
    };
    debug!(
        constraints = compiled.num_constraints,
        instance = compiled.num_instance_variables,
        witness = compiled.num_witness_variables,
        "compiled"
    );
    Ok(compiled)
}

/// Circuit-specific Groth16 setup.
pub fn setup<E, C, R>(
    circuit: C,
    rng: &mut R,
) -> Result<(ProvingKey<E>, VerifyingKey<E>), PipelineError>
where
    E: Pairing,
    C: ConstraintSynthesizer<E::ScalarField>,
    R: RngCore + CryptoRng,
{
    let (pk, vk) = Groth16::<E>::circuit_specific_setup(circuit, rng).map_err(PipelineError::Setup)?;
    debug!(k = vk.gamma_abc_g1.len(), "setup done");
    Ok((pk, vk))
}

/// Synthesise `circuit` with concrete values and check it against `compiled`.
pub fn build_witness<F, C>(
    circuit: C,
    compiled: &CompiledCircuit,
) -> Result<Witness<F>, PipelineError>
where
    F: PrimeField,
    C: ConstraintSynthesizer<F>,
{
    let cs = ConstraintSystem::<F>::new_ref();
    cs.set_optimization_goal(OptimizationGoal::Constraints);
    circuit.generate_constraints(cs.clone()).map_err(WitnessError::Synthesis)?;
    cs.finalize();

    let checks = [
        ("instance variable count", compiled.num_instance_variables, cs.num_instance_variables()),
        ("witness variable count", compiled.num_witness_variables, cs.num_witness_variables()),
        ("constraint count", compiled.num_constraints, cs.num_constraints()),
    ];
    for (what, expected, got) in checks {
        if expected != got {
            return Err(WitnessError::Layout { what, compiled: expected, assigned: got }.into());
        }
    }

    if !cs.is_satisfied().map_err(WitnessError::Synthesis)? {
        let constraint = cs
            .which_is_unsatisfied()
            .map_err(WitnessError::Synthesis)?
            .unwrap_or_else(|| "<unknown>".to_string());
        warn!(%constraint, "assignment does not satisfy the circuit");
        return Err(WitnessError::Unsatisfied { constraint }.into());
    }

    let inner = cs.borrow().ok_or(WitnessError::Synthesis(SynthesisError::MissingCS))?;
    Ok(Witness {
        public: inner.instance_assignment[1..].to_vec(),
        private: inner.witness_assignment.clone(),
    })
}

/// Groth16 proof for an assignment that already passed [`build_witness`].
pub fn prove<E, C, R>(pk: &ProvingKey<E>, circuit: C, rng: &mut R) -> Result<Proof<E>, PipelineError>
where
    E: Pairing,
    C: ConstraintSynthesizer<E::ScalarField>,
    R: RngCore + CryptoRng,
{
    Groth16::<E>::prove(pk, circuit, rng).map_err(PipelineError::Prove)
}

/// Out-of-circuit verification.
pub fn verify_native<E: Pairing>(
    vk: &VerifyingKey<E>,
    public_inputs: &[E::ScalarField],
    proof: &Proof<E>,
) -> Result<(), NativeVerifyError> {
    match Groth16::<E>::verify(vk, public_inputs, proof) {
        Ok(true) => Ok(()),
        Ok(false) => Err(NativeVerifyError::Rejected),
        Err(e) => Err(NativeVerifyError::Verifier(e)),
    }
}

/// Run every stage for one circuit.
pub fn run_pipeline<E, C, R>(
    placeholder: C,
    assigned: C,
    rng: &mut R,
) -> Result<PipelineArtifacts<E>, PipelineError>
where
    E: Pairing,
    C: ConstraintSynthesizer<E::ScalarField> + Clone,
    R: RngCore + CryptoRng,
{
    let _span = info_span!("pipeline", circuit = std::any::type_name::<C>()).entered();

    let compiled = compile::<E::ScalarField, _>(placeholder.clone())?;
    let (pk, vk) = setup::<E, _, _>(placeholder, rng)?;
    let witness = build_witness::<E::ScalarField, _>(assigned.clone(), &compiled)?;
    let proof = prove(&pk, assigned, rng)?;
    let public_witness = witness.into_public();
    verify_native(&vk, &public_witness, &proof)?;

    info!(
        constraints = compiled.num_constraints,
        public_inputs = public_witness.len(),
        "proof generated and verified natively"
    );
    Ok(PipelineArtifacts { compiled, public_witness, proof, vk, pk })
}

/// [`run_pipeline`] with randomness taken from a [`PipelineConfig`].
#[derive(Debug, Clone, Default)]
pub struct ProofPipeline {
    config: PipelineConfig,
}

impl ProofPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run<E, C>(&self, placeholder: C, assigned: C) -> Result<PipelineArtifacts<E>, PipelineError>
    where
        E: Pairing,
        C: ConstraintSynthesizer<E::ScalarField> + Clone,
    {
        let mut rng = self.config.rng();
        run_pipeline(placeholder, assigned, &mut rng)
    }
}
