//! Structural equivalence of verifying keys
//!
//! The constraint count and wiring of the in-circuit Groth16 verifier is a pure
//! function of a key's *shape*: how many per-statement bases it has (`K`, the
//! `gamma_abc_g1` vector), how many commitment keys it carries, and which
//! public/commitment indices are committed. Keys of equal shape can be swapped
//! inside one outer constraint system; keys of different shape cannot.
//!
//! The check runs offline, once per candidate family, before any outer circuit
//! is compiled.

#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use ark_ec::pairing::Pairing;
use ark_groth16::VerifyingKey;

use crate::pipeline::CompiledCircuit;

/// Shape of a verifying key, independent of its group elements.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VkShape {
    /// Length of `K` (one base per public input, plus the constant one).
    pub base_count: usize,
    /// Number of commitment keys.
    pub commitment_key_count: usize,
    /// Indices of committed public/commitment values.
    pub committed_indices: BTreeSet<usize>,
}

impl VkShape {
    /// Shape of a key without a commitment extension.
    pub fn plain(base_count: usize) -> Self {
        Self { base_count, ..Self::default() }
    }

    /// Shape of a key carrying commitment keys over the given indices.
    pub fn with_commitments(
        base_count: usize,
        commitment_key_count: usize,
        committed_indices: impl IntoIterator<Item = usize>,
    ) -> Self {
        Self {
            base_count,
            commitment_key_count,
            committed_indices: committed_indices.into_iter().collect(),
        }
    }

    /// Number of public inputs a proof under this key takes.
    pub fn public_input_count(&self) -> usize {
        self.base_count.saturating_sub(1)
    }
}

/// Anything that exposes a verifying-key shape.
pub trait KeyShape {
    /// Shape of `self`, or of the key it would produce.
    fn vk_shape(&self) -> VkShape;
}

impl KeyShape for VkShape {
    fn vk_shape(&self) -> VkShape {
        self.clone()
    }
}

// arkworks Groth16 keys have no commit-and-prove extension.
impl<E: Pairing> KeyShape for VerifyingKey<E> {
    fn vk_shape(&self) -> VkShape {
        VkShape::plain(self.gamma_abc_g1.len())
    }
}

/// The shape setup would produce for a compiled circuit, known before setup.
impl KeyShape for CompiledCircuit {
    fn vk_shape(&self) -> VkShape {
        VkShape::plain(self.num_instance_variables)
    }
}

impl<T: KeyShape + ?Sized> KeyShape for &T {
    fn vk_shape(&self) -> VkShape {
        (**self).vk_shape()
    }
}

/// First differing component of two shapes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeMismatch {
    /// `K` lengths differ.
    #[error("per-statement base count differs: {left} vs {right}")]
    BaseCount {
        /// Value on the left.
        left: usize,
        /// Value on the right.
        right: usize,
    },
    /// Commitment key counts differ.
    #[error("commitment key count differs: {left} vs {right}")]
    CommitmentKeyCount {
        /// Value on the left.
        left: usize,
        /// Value on the right.
        right: usize,
    },
    /// Committed index sets differ; each side lists the indices only it has.
    #[error("committed index sets differ: only left {only_left:?}, only right {only_right:?}")]
    CommittedIndices {
        /// Indices committed only on the left.
        only_left: Vec<usize>,
        /// Indices committed only on the right.
        only_right: Vec<usize>,
    },
}

/// Succeeds iff `a` and `b` have equal base counts, equal commitment key
/// counts and equal committed index sets.
pub fn check_shape_equivalent(
    a: &impl KeyShape,
    b: &impl KeyShape,
) -> Result<(), ShapeMismatch> {
    let (a, b) = (a.vk_shape(), b.vk_shape());
    if a.base_count != b.base_count {
        return Err(ShapeMismatch::BaseCount { left: a.base_count, right: b.base_count });
    }
    if a.commitment_key_count != b.commitment_key_count {
        return Err(ShapeMismatch::CommitmentKeyCount {
            left: a.commitment_key_count,
            right: b.commitment_key_count,
        });
    }
    if a.committed_indices != b.committed_indices {
        return Err(ShapeMismatch::CommittedIndices {
            only_left: a.committed_indices.difference(&b.committed_indices).copied().collect(),
            only_right: b.committed_indices.difference(&a.committed_indices).copied().collect(),
        });
    }
    Ok(())
}

/// Check every pair; on failure report the first offending pair `(i, j)`, `i < j`.
pub fn check_all_equivalent<K: KeyShape>(
    keys: &[K],
) -> Result<(), (usize, usize, ShapeMismatch)> {
    for i in 0..keys.len() {
        for j in (i + 1)..keys.len() {
            check_shape_equivalent(&keys[i], &keys[j]).map_err(|m| (i, j, m))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuits::{DummyCircuit, PreimageCircuit};
    use crate::pipeline::compile;
    use crate::InnerFr;

    #[test]
    fn equal_shapes_pass_regardless_of_index_order() {
        let a = VkShape::with_commitments(2, 1, [3, 1]);
        let b = VkShape::with_commitments(2, 1, [1, 3]);
        assert_eq!(check_shape_equivalent(&a, &b), Ok(()));
    }

    #[test]
    fn each_component_is_compared() {
        let base = VkShape::with_commitments(2, 1, [1]);

        let k = VkShape::with_commitments(3, 1, [1]);
        assert_eq!(
            check_shape_equivalent(&base, &k),
            Err(ShapeMismatch::BaseCount { left: 2, right: 3 })
        );

        let ck = VkShape::with_commitments(2, 0, [1]);
        assert_eq!(
            check_shape_equivalent(&base, &ck),
            Err(ShapeMismatch::CommitmentKeyCount { left: 1, right: 0 })
        );

        let idx = VkShape::with_commitments(2, 1, [2]);
        assert_eq!(
            check_shape_equivalent(&base, &idx),
            Err(ShapeMismatch::CommittedIndices { only_left: vec![1], only_right: vec![2] })
        );
    }

    #[test]
    fn all_pairs_reports_first_failure() {
        let keys = [VkShape::plain(2), VkShape::plain(2), VkShape::plain(4)];
        let (i, j, m) = check_all_equivalent(&keys).unwrap_err();
        assert_eq!((i, j), (0, 2));
        assert_eq!(m, ShapeMismatch::BaseCount { left: 2, right: 4 });
        assert!(check_all_equivalent(&keys[..2]).is_ok());
    }

    #[test]
    fn preimage_and_dummy_circuits_share_a_shape() {
        // Known from compilation alone, before any setup.
        let main = compile::<InnerFr, _>(PreimageCircuit::<InnerFr>::placeholder()).unwrap();
        let dummy = compile::<InnerFr, _>(DummyCircuit::<InnerFr>::placeholder()).unwrap();
        assert_eq!(main.vk_shape().base_count, 2);
        assert_eq!(check_shape_equivalent(&main, &dummy), Ok(()));
        assert!(main.num_constraints > dummy.num_constraints);
    }
}
