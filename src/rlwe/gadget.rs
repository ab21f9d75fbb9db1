//! Gadget vector and coefficient decomposition.
//!
//! The gadget vector g_z = [1, z, z², ..., z^(ℓ-1)] decomposes ring
//! elements into small-norm digit polynomials, bounding the noise growth of
//! key switching and plaintext-ciphertext products. With an RNS modulus the
//! digits are extracted from the CRT-composed coefficient value, so
//! `Σ z^i · d_i` reconstructs the coefficient exactly.

use serde::{Deserialize, Serialize};

use crate::math::{CrtContext, Poly};

/// Gadget vector g_z = [1, z, z², ..., z^(ℓ-1)] over an RNS modulus.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GadgetVector {
    /// log2 of the gadget base z.
    pub log_base: usize,
    /// Number of digits ℓ; z^ℓ covers the composed modulus.
    pub digits: usize,
    /// RNS moduli of Q.
    pub moduli: Vec<u64>,
}

impl GadgetVector {
    /// Create a gadget vector.
    ///
    /// # Panics
    ///
    /// Debug-asserts that the digits cover the composed modulus.
    pub fn new(log_base: usize, digits: usize, moduli: &[u64]) -> Self {
        debug_assert!(log_base > 0 && log_base <= 32, "gadget base out of range");
        let total_bits: usize = moduli.iter().map(|&q| 64 - q.leading_zeros() as usize).sum();
        debug_assert!(digits * log_base >= total_bits, "gadget does not cover Q");
        Self {
            log_base,
            digits,
            moduli: moduli.to_vec(),
        }
    }

    /// The gadget base z.
    pub fn base(&self) -> u64 {
        1u64 << self.log_base
    }

    /// Per-limb residues of the powers [1, z, ..., z^(ℓ-1)]:
    /// `powers[i][l] = z^i mod q_l`.
    pub fn powers_rns(&self) -> Vec<Vec<u64>> {
        let mut powers = Vec::with_capacity(self.digits);
        let mut current: Vec<u128> = vec![1; self.moduli.len()];
        for _ in 0..self.digits {
            powers.push(
                current
                    .iter()
                    .zip(self.moduli.iter())
                    .map(|(&c, &q)| (c % q as u128) as u64)
                    .collect(),
            );
            for (c, &q) in current.iter_mut().zip(self.moduli.iter()) {
                *c = (*c * self.base() as u128) % q as u128;
            }
        }
        powers
    }
}

/// Decompose a polynomial coefficient-wise into base-z digit polynomials.
///
/// For each coefficient c (CRT-composed across the limbs), computes digits
/// [c₀, c₁, ..., c_{ℓ-1}] in [0, z) such that c = Σ cᵢ·zⁱ exactly.
pub fn gadget_decompose(poly: &Poly, gadget: &GadgetVector, crt: &CrtContext) -> Vec<Poly> {
    assert!(!poly.is_ntt(), "decomposition requires coefficient domain");
    assert_eq!(poly.moduli(), gadget.moduli.as_slice(), "moduli mismatch");

    let d = poly.dimension();
    let mask = (1u128 << gadget.log_base) - 1;

    let mut result: Vec<Poly> = (0..gadget.digits)
        .map(|_| Poly::zero(d, &gadget.moduli))
        .collect();

    let mut residues = Vec::with_capacity(gadget.moduli.len());
    for j in 0..d {
        poly.residues_at(j, &mut residues);
        let mut val = crt.compose(&residues);

        for digit_poly in result.iter_mut() {
            digit_poly.set_coeff_small(j, (val & mask) as u64);
            val >>= gadget.log_base;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    const MODULI: [u64; 2] = [281474976694273, 281474976636929];

    fn test_gadget() -> GadgetVector {
        GadgetVector::new(16, 6, &MODULI)
    }

    #[test]
    fn test_gadget_powers() {
        let gadget = test_gadget();
        let powers = gadget.powers_rns();

        assert_eq!(powers.len(), 6);
        assert_eq!(powers[0], vec![1, 1]);
        assert_eq!(powers[1], vec![1 << 16, 1 << 16]);

        let expected: Vec<u64> = MODULI
            .iter()
            .map(|&q| ((1u128 << 48) % q as u128) as u64)
            .collect();
        assert_eq!(powers[3], expected);
    }

    #[test]
    fn test_decompose_reconstruct_roundtrip() {
        let gadget = test_gadget();
        let crt = CrtContext::new(&MODULI);
        let mut rng = ChaCha20Rng::seed_from_u64(9);

        let d = 64;
        let poly = Poly::random_with_rng(d, &MODULI, &mut rng);
        let decomposed = gadget_decompose(&poly, &gadget, &crt);

        // Reconstruct: Σ z^i · d_i must equal the original polynomial.
        let powers = gadget.powers_rns();
        let mut reconstructed = Poly::zero(d, &MODULI);
        for (i, digit_poly) in decomposed.iter().enumerate() {
            reconstructed += &digit_poly.scalar_mul_rns(&powers[i]);
        }

        assert_eq!(reconstructed, poly);
    }

    #[test]
    fn test_decompose_small_digits() {
        let gadget = test_gadget();
        let crt = CrtContext::new(&MODULI);
        let mut rng = ChaCha20Rng::seed_from_u64(10);

        let poly = Poly::random_with_rng(32, &MODULI, &mut rng);
        let decomposed = gadget_decompose(&poly, &gadget, &crt);

        assert_eq!(decomposed.len(), gadget.digits);
        for digit_poly in &decomposed {
            for l in 0..2 {
                assert!(digit_poly.limb(l).iter().all(|&c| c < gadget.base()));
            }
        }
    }

    #[test]
    fn test_decompose_zero() {
        let gadget = test_gadget();
        let crt = CrtContext::new(&MODULI);

        let zero = Poly::zero(32, &MODULI);
        for digit_poly in gadget_decompose(&zero, &gadget, &crt) {
            assert!(digit_poly.is_zero());
        }
    }
}
