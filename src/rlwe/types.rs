//! RLWE ciphertext and key types.
//!
//! Ring-LWE over R_Q = Z_Q[X]/(X^d + 1) with Q an RNS product of
//! NTT-friendly primes.

use crate::math::Poly;
use serde::{Deserialize, Serialize};

/// RLWE secret key: polynomial in R_Q sampled from the error distribution.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RlweSecretKey {
    /// Secret polynomial in R_Q.
    pub poly: Poly,
}

impl RlweSecretKey {
    /// Creates a secret key from a polynomial.
    pub fn from_poly(poly: Poly) -> Self {
        Self { poly }
    }

    /// Returns the ring dimension.
    pub fn ring_dim(&self) -> usize {
        self.poly.dimension()
    }

    /// Returns the RNS moduli of Q.
    pub fn moduli(&self) -> &[u64] {
        self.poly.moduli()
    }
}

/// RLWE ciphertext: (a, b) ∈ R_Q × R_Q where b = -a·s + e + Δ·m.
///
/// # Decryption
///
/// Compute `b + a·s = e + Δ·m`, then round to recover m.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RlweCiphertext {
    /// Random polynomial in R_Q.
    pub a: Poly,
    /// Encrypted polynomial: b = -a·s + e + Δ·m.
    pub b: Poly,
}

impl RlweCiphertext {
    /// Creates a ciphertext from component polynomials.
    ///
    /// # Panics
    ///
    /// Debug-asserts that `a` and `b` have the same dimension and moduli.
    pub fn from_parts(a: Poly, b: Poly) -> Self {
        debug_assert_eq!(
            a.dimension(),
            b.dimension(),
            "Ciphertext polynomials must have same dimension"
        );
        debug_assert_eq!(
            a.moduli(),
            b.moduli(),
            "Ciphertext polynomials must have same moduli"
        );
        Self { a, b }
    }

    /// The additive identity: decrypts to zero under any key.
    pub fn zero(dim: usize, moduli: &[u64]) -> Self {
        Self {
            a: Poly::zero(dim, moduli),
            b: Poly::zero(dim, moduli),
        }
    }

    /// Returns the ring dimension.
    pub fn ring_dim(&self) -> usize {
        self.a.dimension()
    }

    /// Returns the RNS moduli of Q.
    pub fn moduli(&self) -> &[u64] {
        self.a.moduli()
    }

    /// Homomorphic addition.
    pub fn add(&self, other: &RlweCiphertext) -> RlweCiphertext {
        RlweCiphertext {
            a: &self.a + &other.a,
            b: &self.b + &other.b,
        }
    }
}
