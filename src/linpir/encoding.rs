//! Slot encoding for the homomorphic linear algebra.
//!
//! For an NTT-friendly plaintext modulus t ≡ 1 (mod 2n), the ring
//! Z_t[X]/(X^n + 1) evaluates at the n primitive 2n-th roots of unity
//! modulo t, giving n independent Z_t "slots". The odd exponents split into
//! the two orbits {3^j} and {-3^j} of the rotation group, so we order the
//! slots along those orbits:
//!
//! - logical slot j in [0, n/2) is the evaluation point ψ^(3^j),
//! - logical slot n/2 + j is the point ψ^(-3^j).
//!
//! Under this ordering the automorphism τ_3 rotates each half left by one
//! slot: (τ_3 p)(ψ^(3^j)) = p(ψ^(3^(j+1))). The mapping between logical
//! slots and NTT array positions is derived programmatically — the NTT of
//! the monomial X lists the evaluation points in array order — so the
//! encoding is correct under any butterfly ordering convention.

use std::collections::HashMap;

use crate::math::{ModQ, NttContext};

/// The Galois element whose automorphism rotates each slot half by one.
pub const ROTATION_GENERATOR: usize = 3;

/// Precomputed slot encoding for one plaintext modulus.
#[derive(Clone, Debug)]
pub struct SlotEncoding {
    n: usize,
    t: u64,
    ctx: NttContext,
    /// NTT array position of logical slot j (first orbit).
    first_half: Vec<usize>,
    /// NTT array position of logical slot n/2 + j (second orbit).
    second_half: Vec<usize>,
}

impl SlotEncoding {
    /// Build the encoding for ring dimension n and plaintext modulus t.
    ///
    /// # Panics
    ///
    /// Panics if t is not ≡ 1 (mod 2n) or not prime (no primitive 2n-th
    /// root of unity).
    pub fn new(n: usize, t: u64) -> Self {
        let ctx = NttContext::new(n, t);

        // Evaluation points in array order: the NTT of X.
        let mut x_coeffs = vec![0u64; n];
        x_coeffs[1] = 1;
        ctx.forward(&mut x_coeffs);
        let points: Vec<u64> = x_coeffs
            .iter()
            .map(|&v| ctx.from_mont_at(v, 0))
            .collect();

        let position: HashMap<u64, usize> =
            points.iter().enumerate().map(|(i, &p)| (p, i)).collect();
        assert_eq!(position.len(), n, "evaluation points must be distinct");

        // Any evaluation point is a primitive 2n-th root of unity; pick the
        // smallest for determinism.
        let psi = *points.iter().min().unwrap();
        let psi_inv = ModQ::pow(psi, t - 2, t);

        // Walk the orbit: ψ^(3^(j+1)) = (ψ^(3^j))^3.
        let cube = |v: u64| ModQ::mul(ModQ::mul(v, v, t), v, t);

        let mut first_half = Vec::with_capacity(n / 2);
        let mut v = psi;
        for _ in 0..n / 2 {
            first_half.push(position[&v]);
            v = cube(v);
        }

        let mut second_half = Vec::with_capacity(n / 2);
        let mut w = psi_inv;
        for _ in 0..n / 2 {
            second_half.push(position[&w]);
            w = cube(w);
        }

        Self {
            n,
            t,
            ctx,
            first_half,
            second_half,
        }
    }

    /// Ring dimension.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Plaintext modulus.
    pub fn t(&self) -> u64 {
        self.t
    }

    /// Encode values into the first-orbit slots (remaining slots zero),
    /// returning plaintext polynomial coefficients modulo t.
    ///
    /// # Panics
    ///
    /// Panics if more than n/2 values are supplied.
    pub fn encode(&self, values: &[u64]) -> Vec<u64> {
        assert!(values.len() <= self.n / 2, "too many values for one orbit");

        let mut evals = vec![0u64; self.n];
        for (j, &v) in values.iter().enumerate() {
            evals[self.first_half[j]] = self.ctx.to_mont_at(v % self.t, 0);
        }
        self.ctx.inverse(&mut evals);
        evals
    }

    /// Decode the first-orbit slots of a plaintext polynomial.
    pub fn decode(&self, coeffs: &[u64]) -> Vec<u64> {
        assert_eq!(coeffs.len(), self.n, "coefficient count mismatch");

        let mut evals = coeffs.to_vec();
        self.ctx.forward(&mut evals);
        self.first_half
            .iter()
            .map(|&pos| self.ctx.from_mont_at(evals[pos], 0))
            .collect()
    }
}
