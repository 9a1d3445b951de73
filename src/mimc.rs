//! MiMC (x^17, Miyaguchi–Preneel) over any prime field
//!
//! Used only as the payload of the example "hash preimage" circuit. Round
//! constants come from a BLAKE3 XOF over a fixed domain tag, reduced into the
//! field little-endian, so native and in-circuit evaluation agree by
//! construction.

#![forbid(unsafe_code)]

use ark_ff::PrimeField;
use ark_r1cs_std::fields::{fp::FpVar, FieldVar};
use ark_relations::r1cs::SynthesisError;
use blake3::Hasher;

/// Number of rounds per block.
pub const ROUNDS: usize = 62;

const DST: &[u8] = b"svk.mimc.x17.v1";

/// Round constants, derived deterministically per field.
pub fn round_constants<F: PrimeField>() -> Vec<F> {
    let mut h = Hasher::new();
    h.update(DST);
    h.update(&F::MODULUS_BIT_SIZE.to_be_bytes());
    let mut xof = h.finalize_xof();
    let mut buf = [0u8; 64];
    (0..ROUNDS)
        .map(|_| {
            xof.fill(&mut buf);
            F::from_le_bytes_mod_order(&buf)
        })
        .collect()
}

#[inline]
fn pow17<F: PrimeField>(x: F) -> F {
    let x16 = x.square().square().square().square();
    x16 * x
}

fn encrypt<F: PrimeField>(mut x: F, key: F, rc: &[F]) -> F {
    for c in rc {
        x = pow17(x + key + c);
    }
    x + key
}

/// Native hash of a sequence of field elements.
pub fn hash<F: PrimeField>(inputs: &[F]) -> F {
    let rc = round_constants::<F>();
    inputs.iter().fold(F::zero(), |h, m| encrypt(*m, h, &rc) + h + m)
}

fn pow17_var<F: PrimeField>(x: &FpVar<F>) -> Result<FpVar<F>, SynthesisError> {
    let x16 = x.square()?.square()?.square()?.square()?;
    Ok(x16 * x)
}

/// In-circuit hash; 5 constraints per round.
pub fn hash_var<F: PrimeField>(inputs: &[FpVar<F>]) -> Result<FpVar<F>, SynthesisError> {
    let rc = round_constants::<F>();
    let mut h = FpVar::<F>::zero();
    for m in inputs {
        let mut x = m.clone();
        for c in &rc {
            x = pow17_var(&((&x + &h) + *c))?;
        }
        let e = x + &h;
        h = e + &h + m;
    }
    Ok(h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_r1cs_std::{alloc::AllocVar, R1CSVar};
    use ark_relations::r1cs::ConstraintSystem;

    type Fr = crate::InnerFr;

    #[test]
    fn gadget_matches_native() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let inputs = [Fr::from(42u64), Fr::from(7u64)];
        let vars: Vec<_> = inputs
            .iter()
            .map(|v| FpVar::new_witness(cs.clone(), || Ok(*v)).unwrap())
            .collect();
        let out = hash_var(&vars).unwrap();
        assert_eq!(out.value().unwrap(), hash(&inputs));
        assert_eq!(cs.num_constraints(), 2 * ROUNDS * 5);
        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn constants_are_stable_and_distinct() {
        let a = round_constants::<Fr>();
        assert_eq!(a, round_constants::<Fr>());
        assert_eq!(a.len(), ROUNDS);
        assert_ne!(a[0], a[1]);
    }

    #[test]
    fn hash_separates_inputs() {
        assert_ne!(hash(&[Fr::from(42u64)]), hash(&[Fr::from(43u64)]));
        assert_ne!(hash(&[Fr::from(42u64)]), Fr::from(0u64));
    }
}
