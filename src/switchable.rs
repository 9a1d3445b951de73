//! Switchable verifying key: N shape-equivalent candidates, one selected in-circuit
//!
//! ## Overview
//! [`SwitchableVerifyingKey`] owns `N` Groth16 verifying keys that passed the
//! shape check pairwise. Inside a circuit the candidates are embedded as
//! constants ([`SwitchableVerifyingKey::allocate`]) and
//! [`SwitchableVerifyingKeyVar::select`] turns `log2(N)` boolean flags into a
//! single `VerifyingKeyVar`.
//!
//! ## Branchless selection tree
//! Flags are little-endian: `index = Σ flags[i]·2^i`. Level `i` of the tree
//! folds neighbouring candidates `(2j, 2j+1)` with `flags[i]`:
//!
//! ```text
//!   level 0:  c0  c1  c2  c3        b0 picks inside each pair
//!              \  /    \  /
//!   level 1:   s01     s23          b1 picks between pairs
//!                 \   /
//!                 vk_index
//! ```
//!
//! Each fold is `b·x1 + (1−b)·x0` on every coordinate of every group element
//! (`alpha_g1`, `beta_g2`, `gamma_g2`, `delta_g2`, each `gamma_abc_g1[i]`), via
//! `CondSelectGadget`. Nothing branches on the flag *values*, so the emitted
//! constraints depend only on `N` and the common shape. With constant
//! candidates each fold is a linear combination and allocates no constraint.
//!
//! Because `N` is a power of two and every flag is boolean-constrained, every
//! flag pattern decodes to exactly one candidate.

#![forbid(unsafe_code)]

use ark_ec::pairing::Pairing;
use ark_groth16::{constraints::VerifyingKeyVar, VerifyingKey};
use ark_r1cs_std::{alloc::AllocVar, boolean::Boolean, pairing::PairingVar, select::CondSelectGadget};
use ark_relations::r1cs::{Namespace, SynthesisError};
use tracing::{debug, info};

use crate::cycle::BasePrimeField;
use crate::shape::{check_all_equivalent, KeyShape, ShapeMismatch, VkShape};

/// Rejected candidate set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SvkError {
    /// Fewer than two candidates.
    #[error("at least two candidate keys are required, got {got}")]
    TooFewCandidates {
        /// Candidate count.
        got: usize,
    },
    /// Candidate count is not a power of two.
    #[error("candidate count must be a power of two, got {got}")]
    CandidateCountNotPowerOfTwo {
        /// Candidate count.
        got: usize,
    },
    /// Two candidates differ in shape.
    #[error("candidates {left} and {right} are not interchangeable: {mismatch}")]
    Shape {
        /// Lower candidate index.
        left: usize,
        /// Higher candidate index.
        right: usize,
        /// What differs.
        #[source]
        mismatch: ShapeMismatch,
    },
}

/// Fixed set of shape-equivalent verifying keys.
#[derive(Debug, Clone)]
pub struct SwitchableVerifyingKey<E: Pairing, const N: usize> {
    candidates: [VerifyingKey<E>; N],
    shape: VkShape,
}

impl<E: Pairing, const N: usize> SwitchableVerifyingKey<E, N> {
    /// Validate and wrap the candidates. Index `i` is selected by flags encoding `i`.
    pub fn new(candidates: [VerifyingKey<E>; N]) -> Result<Self, SvkError> {
        if N < 2 {
            return Err(SvkError::TooFewCandidates { got: N });
        }
        if !N.is_power_of_two() {
            return Err(SvkError::CandidateCountNotPowerOfTwo { got: N });
        }
        check_all_equivalent(&candidates)
            .map_err(|(left, right, mismatch)| SvkError::Shape { left, right, mismatch })?;

        let shape = candidates[0].vk_shape();
        info!(candidates = N, k = shape.base_count, "switchable verifying key built");
        for (index, vk) in candidates.iter().enumerate() {
            if let Ok(d) = crate::io::key_digest(vk) {
                debug!(index, digest = %hex::encode(d), "candidate key");
            }
        }
        Ok(Self { candidates, shape })
    }

    /// Number of flags `select` consumes.
    pub fn flag_bits(&self) -> usize {
        N.trailing_zeros() as usize
    }

    /// All candidates, in selection order.
    pub fn candidates(&self) -> &[VerifyingKey<E>; N] {
        &self.candidates
    }

    /// Candidate selected by flags encoding `index`.
    pub fn candidate(&self, index: usize) -> Option<&VerifyingKey<E>> {
        self.candidates.get(index)
    }

    /// Shape shared by every candidate.
    pub fn shape(&self) -> &VkShape {
        &self.shape
    }

    /// Embed all candidates as circuit constants.
    pub fn allocate<P>(
        &self,
        cs: impl Into<Namespace<BasePrimeField<E>>>,
    ) -> Result<SwitchableVerifyingKeyVar<E, P>, SynthesisError>
    where
        P: PairingVar<E, BasePrimeField<E>>,
    {
        let ns = cs.into();
        let cs = ns.cs();
        let candidates = self
            .candidates
            .iter()
            .map(|vk| VerifyingKeyVar::<E, P>::new_constant(cs.clone(), vk))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SwitchableVerifyingKeyVar { candidates })
    }
}

impl<E: Pairing, const N: usize> KeyShape for SwitchableVerifyingKey<E, N> {
    fn vk_shape(&self) -> VkShape {
        self.shape.clone()
    }
}

/// In-circuit view of a [`SwitchableVerifyingKey`].
pub struct SwitchableVerifyingKeyVar<E: Pairing, P: PairingVar<E, BasePrimeField<E>>> {
    candidates: Vec<VerifyingKeyVar<E, P>>,
}

impl<E: Pairing, P: PairingVar<E, BasePrimeField<E>>> SwitchableVerifyingKeyVar<E, P> {
    /// Number of flags `select` consumes.
    pub fn flag_bits(&self) -> usize {
        self.candidates.len().trailing_zeros() as usize
    }

    /// Key at the index encoded little-endian by `flags`.
    pub fn select(
        &self,
        flags: &[Boolean<BasePrimeField<E>>],
    ) -> Result<VerifyingKeyVar<E, P>, SynthesisError> {
        if flags.len() != self.flag_bits() {
            return Err(SynthesisError::Unsatisfiable);
        }
        let mut layer = self.candidates.clone();
        for flag in flags {
            layer = layer
                .chunks(2)
                .map(|pair| select_pair::<E, P>(flag, &pair[0], &pair[1]))
                .collect::<Result<Vec<_>, _>>()?;
        }
        layer.pop().ok_or(SynthesisError::Unsatisfiable)
    }
}

/// `flag ? one : zero`, field by field.
fn select_pair<E, P>(
    flag: &Boolean<BasePrimeField<E>>,
    zero: &VerifyingKeyVar<E, P>,
    one: &VerifyingKeyVar<E, P>,
) -> Result<VerifyingKeyVar<E, P>, SynthesisError>
where
    E: Pairing,
    P: PairingVar<E, BasePrimeField<E>>,
{
    // Equal lengths: candidates are shape-checked at construction.
    debug_assert_eq!(zero.gamma_abc_g1.len(), one.gamma_abc_g1.len());
    let gamma_abc_g1 = zero
        .gamma_abc_g1
        .iter()
        .zip(&one.gamma_abc_g1)
        .map(|(z, o)| P::G1Var::conditionally_select(flag, o, z))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(VerifyingKeyVar {
        alpha_g1: P::G1Var::conditionally_select(flag, &one.alpha_g1, &zero.alpha_g1)?,
        beta_g2: P::G2Var::conditionally_select(flag, &one.beta_g2, &zero.beta_g2)?,
        gamma_g2: P::G2Var::conditionally_select(flag, &one.gamma_g2, &zero.gamma_g2)?,
        delta_g2: P::G2Var::conditionally_select(flag, &one.delta_g2, &zero.delta_g2)?,
        gamma_abc_g1,
    })
}
