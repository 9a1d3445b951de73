//! Crate root: public surface, curve aliases, and recursion-wide invariants
//!
//! This crate builds Groth16 proofs for inner circuits and verifies them
//! recursively inside an **outer aggregation circuit** whose verifying key is
//! chosen per slot, at witness-assignment time, from a fixed set of candidates.
//! The selection is branchless, so the outer constraint system has one layout
//! for every selector value.
//!
//! ## Invariants
//!
//! - **Two-field separation.** Inner proofs live on BLS12-377 (`InnerE`), the
//!   outer circuit is arithmetised over BW6-761's scalar field (`OuterFr`),
//!   which equals BLS12-377's base field. Self-recursion is not supported; the
//!   pairing is fixed by a [`cycle::RecursionCycle`].
//!
//! - **Shape before compilation.** Every candidate verifying key of a
//!   [`switchable::SwitchableVerifyingKey`] has the same [`shape::VkShape`];
//!   this is checked eagerly when the key set is built, never at proving time.
//!
//! - **Placeholder/assignment agreement.** The placeholder used to derive the
//!   outer constraint system and the assignment used to prove it report the same
//!   [`aggregation::AggregationLayout`]. [`aggregation::prove_outer`] refuses to
//!   run otherwise.
//!
//! - **Fail fast.** Each pipeline stage returns a precise error naming the
//!   stage; no partial artifacts are ever returned.

#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms)]

/// Recursion cycle: which inner curve is verified over which outer field.
pub mod cycle;
/// Bit decomposition gadget and the `Selector` value.
pub mod selector;
/// Compile / setup / witness / prove / native-verify pipeline.
pub mod pipeline;
/// Structural equivalence of verifying keys.
pub mod shape;
/// Shape-validated candidate keys and the branchless in-circuit select.
pub mod switchable;
/// Outer circuit verifying one inner proof per slot against a selected key.
pub mod aggregation;
/// MiMC permutation and hash (native and in-circuit).
pub mod mimc;
/// Example inner circuits: hash preimage and the padding dummy.
pub mod circuits;
/// Pipeline configuration (seeded RNG, env/JSON sources).
pub mod config;
/// Versioned artifact files for keys and proofs.
pub mod io;

// ============================================================================
// Canonical aliases for the default cycle
// ============================================================================

/// Inner pairing engine.
pub type InnerE = ark_bls12_377::Bls12_377;

/// Outer pairing engine.
pub type OuterE = ark_bw6_761::BW6_761;

/// Scalar field of inner circuits.
pub type InnerFr = ark_bls12_377::Fr;

/// Scalar field of the outer circuit (= base field of `InnerE`).
pub type OuterFr = ark_bw6_761::Fr;

// ============================================================================
// Root-level re-exports
// ============================================================================

pub use crate::aggregation::{
    check_satisfied, prove_outer, AggregationCircuit, AggregationError, AggregationLayout,
    SlotAssignment,
};
pub use crate::config::PipelineConfig;
pub use crate::cycle::{Bls12Bw6, RecursionCycle};
pub use crate::pipeline::{
    run_pipeline, CompiledCircuit, PipelineArtifacts, PipelineError, ProofPipeline, Stage,
    WitnessError,
};
pub use crate::selector::{Selector, SelectorError};
pub use crate::shape::{check_all_equivalent, check_shape_equivalent, KeyShape, ShapeMismatch, VkShape};
pub use crate::switchable::{SvkError, SwitchableVerifyingKey, SwitchableVerifyingKeyVar};
