//! Selector values and in-circuit bit decomposition
//!
//! A [`Selector`] is a scalar in `[0, 2^bits)` fixed at outer-witness
//! assignment time. Inside the circuit it is decomposed once with
//! [`to_bits`] and the resulting little-endian flags are handed out to the
//! inner-proof slots, `flags_per_slot` bits each:
//!
//! ```text
//!   selector = Σ b_i · 2^i          slot s uses b[s·w .. (s+1)·w],  w = log2(N)
//! ```
//!
//! With two candidates (`w = 1`) slot `s` is driven by bit `s` alone, so each
//! slot picks independently between the two keys.

#![forbid(unsafe_code)]

use ark_ff::{BigInteger, PrimeField};
use ark_r1cs_std::{
    alloc::AllocVar, boolean::Boolean, eq::EqGadget, fields::fp::FpVar, fields::FieldVar,
    R1CSVar,
};
use ark_relations::r1cs::SynthesisError;

/// Largest supported selector width.
pub const MAX_SELECTOR_BITS: usize = 63;

/// Invalid selector construction or access.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    /// Width outside `1..=MAX_SELECTOR_BITS`.
    #[error("selector width must be in 1..={max}, got {got}")]
    Width {
        /// Requested width.
        got: usize,
        /// Largest supported width.
        max: usize,
    },
    /// Value does not fit into the width.
    #[error("selector value {value} does not fit in {bits} bits")]
    OutOfRange {
        /// Offending value.
        value: u64,
        /// Selector width.
        bits: usize,
    },
    /// A slot picks a candidate index that does not exist.
    #[error("slot {slot} chooses candidate {choice}, but only {candidates} candidates exist")]
    Choice {
        /// Slot index.
        slot: usize,
        /// Requested candidate.
        choice: usize,
        /// Number of candidates per slot.
        candidates: usize,
    },
    /// Bit index at or beyond the selector width.
    #[error("bit {bit} is outside a {bits}-bit selector")]
    Bit {
        /// Requested bit.
        bit: usize,
        /// Selector width.
        bits: usize,
    },
}

/// Selector scalar together with its bit width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selector {
    value: u64,
    bits: usize,
}

impl Selector {
    /// Create a selector; `value` must fit into `bits` bits.
    pub fn new(value: u64, bits: usize) -> Result<Self, SelectorError> {
        if bits == 0 || bits > MAX_SELECTOR_BITS {
            return Err(SelectorError::Width { got: bits, max: MAX_SELECTOR_BITS });
        }
        if value >> bits != 0 {
            return Err(SelectorError::OutOfRange { value, bits });
        }
        Ok(Self { value, bits })
    }

    /// All-zero selector of the given width (placeholder instances).
    pub fn zero(bits: usize) -> Result<Self, SelectorError> {
        Self::new(0, bits)
    }

    /// Pack one candidate index per slot, `bits_per_slot` bits each, slot 0 lowest.
    pub fn from_slot_choices(
        choices: &[usize],
        bits_per_slot: usize,
    ) -> Result<Self, SelectorError> {
        let bits = choices.len() * bits_per_slot;
        if bits_per_slot == 0 || bits == 0 || bits > MAX_SELECTOR_BITS {
            return Err(SelectorError::Width { got: bits, max: MAX_SELECTOR_BITS });
        }
        let candidates = 1usize << bits_per_slot;
        let mut value = 0u64;
        for (slot, &choice) in choices.iter().enumerate() {
            if choice >= candidates {
                return Err(SelectorError::Choice { slot, choice, candidates });
            }
            value |= (choice as u64) << (slot * bits_per_slot);
        }
        Self::new(value, bits)
    }

    /// Selector scalar.
    pub fn value(&self) -> u64 {
        self.value
    }

    /// Selector width in bits.
    pub fn bits(&self) -> usize {
        self.bits
    }

    /// Candidate index encoded for `slot` (native mirror of the in-circuit split).
    ///
    /// `None` when `bits_per_slot` is zero or the slot lies past the selector width.
    pub fn slot_choice(&self, slot: usize, bits_per_slot: usize) -> Option<usize> {
        let end = slot.checked_add(1)?.checked_mul(bits_per_slot)?;
        if bits_per_slot == 0 || end > self.bits {
            return None;
        }
        let mask = (1u64 << bits_per_slot) - 1;
        Some(((self.value >> (slot * bits_per_slot)) & mask) as usize)
    }

    /// Same width, one bit flipped.
    pub fn with_bit_flipped(&self, bit: usize) -> Result<Self, SelectorError> {
        if bit >= self.bits {
            return Err(SelectorError::Bit { bit, bits: self.bits });
        }
        Self::new(self.value ^ (1u64 << bit), self.bits)
    }
}

/// Decompose `x` into `n` little-endian boolean flags.
///
/// Each flag is a boolean-constrained witness and `Σ b_i·2^i = x` is enforced,
/// which also range-checks `x < 2^n` for `n` below the field size. A constant
/// `x` yields constant flags and must itself fit into `n` bits.
pub fn to_bits<F: PrimeField>(x: &FpVar<F>, n: usize) -> Result<Vec<Boolean<F>>, SynthesisError> {
    if n == 0 || n >= F::MODULUS_BIT_SIZE as usize {
        return Err(SynthesisError::Unsatisfiable);
    }
    if x.is_constant() {
        let repr = x.value()?.into_bigint();
        if repr.num_bits() as usize > n {
            return Err(SynthesisError::Unsatisfiable);
        }
        return Ok((0..n).map(|i| Boolean::constant(repr.get_bit(i))).collect());
    }

    let cs = x.cs();
    // `None` in setup mode; the closures below are then never evaluated.
    let repr = x.value().ok().map(|v| v.into_bigint());
    let bits = (0..n)
        .map(|i| {
            Boolean::new_witness(cs.clone(), || {
                repr.map(|r| r.get_bit(i)).ok_or(SynthesisError::AssignmentMissing)
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut acc = FpVar::<F>::zero();
    let mut coeff = F::one();
    for b in &bits {
        acc += FpVar::from(b.clone()) * coeff;
        coeff.double_in_place();
    }
    acc.enforce_equal(x)?;
    Ok(bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_relations::r1cs::{ConstraintSystem, ConstraintSystemRef};

    type Fq = crate::OuterFr;

    fn alloc(cs: &ConstraintSystemRef<Fq>, v: u64) -> FpVar<Fq> {
        FpVar::new_witness(cs.clone(), || Ok(Fq::from(v))).unwrap()
    }

    #[test]
    fn selector_range_and_width() {
        assert!(Selector::new(1, 1).is_ok());
        assert_eq!(Selector::new(2, 1), Err(SelectorError::OutOfRange { value: 2, bits: 1 }));
        assert!(matches!(Selector::new(0, 0), Err(SelectorError::Width { .. })));
        assert!(matches!(Selector::new(0, 64), Err(SelectorError::Width { .. })));
        assert_eq!(Selector::zero(3).unwrap().value(), 0);
    }

    #[test]
    fn slot_choices_pack_low_slot_first() {
        // Two slots, two bits each: slot0 = 3, slot1 = 1 ⇒ 0b01_11.
        let s = Selector::from_slot_choices(&[3, 1], 2).unwrap();
        assert_eq!(s.value(), 0b0111);
        assert_eq!(s.bits(), 4);
        assert_eq!(s.slot_choice(0, 2), Some(3));
        assert_eq!(s.slot_choice(1, 2), Some(1));

        let err = Selector::from_slot_choices(&[0, 2], 1).unwrap_err();
        assert_eq!(err, SelectorError::Choice { slot: 1, choice: 2, candidates: 2 });
    }

    #[test]
    fn flipping_a_bit_changes_one_slot() {
        let s = Selector::from_slot_choices(&[1, 0], 1).unwrap();
        let t = s.with_bit_flipped(1).unwrap();
        assert_eq!(t.slot_choice(0, 1), Some(1));
        assert_eq!(t.slot_choice(1, 1), Some(1));
    }

    #[test]
    fn out_of_range_slots_and_bits_are_refused() {
        let s = Selector::from_slot_choices(&[1, 0], 1).unwrap();
        assert_eq!(s.slot_choice(2, 1), None);
        assert_eq!(s.slot_choice(64, 1), None);
        assert_eq!(s.slot_choice(0, 0), None);
        assert_eq!(s.slot_choice(0, 3), None);
        assert_eq!(s.slot_choice(usize::MAX, 2), None);

        assert_eq!(s.with_bit_flipped(2), Err(SelectorError::Bit { bit: 2, bits: 2 }));
        assert_eq!(s.with_bit_flipped(64), Err(SelectorError::Bit { bit: 64, bits: 2 }));
        assert_eq!(s.with_bit_flipped(1).unwrap().value(), 0b11);
    }

    #[test]
    fn to_bits_recomposes_and_is_satisfied() {
        let cs = ConstraintSystem::<Fq>::new_ref();
        let x = alloc(&cs, 0b1011);
        let bits = to_bits(&x, 4).unwrap();
        let got: Vec<bool> = bits.iter().map(|b| b.value().unwrap()).collect();
        assert_eq!(got, vec![true, true, false, true]);
        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn to_bits_rejects_values_wider_than_n() {
        let cs = ConstraintSystem::<Fq>::new_ref();
        let x = alloc(&cs, 0b100);
        let _ = to_bits(&x, 2).unwrap();
        assert!(!cs.is_satisfied().unwrap());
    }

    #[test]
    fn to_bits_of_constant_allocates_nothing() {
        let cs = ConstraintSystem::<Fq>::new_ref();
        let x = FpVar::constant(Fq::from(5u64));
        let bits = to_bits(&x, 3).unwrap();
        assert!(bits.iter().all(|b| b.is_constant()));
        assert_eq!(cs.num_constraints(), 0);
    }

    #[test]
    fn to_bits_of_wide_constant_is_unsatisfiable() {
        let x = FpVar::constant(Fq::from(0b100u64));
        assert!(matches!(to_bits(&x, 2), Err(SynthesisError::Unsatisfiable)));
        assert_eq!(to_bits(&x, 3).unwrap().len(), 3);
    }
}
