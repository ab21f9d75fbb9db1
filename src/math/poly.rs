//! Polynomial operations over R_Q = Z_Q[X]/(X^d + 1).
//!
//! Provides polynomial arithmetic using NTT for efficient multiplication.
//! Polynomials can exist in either coefficient domain or NTT domain.
//!
//! # RNS representation
//!
//! The modulus Q may be a product of several NTT-friendly primes; a
//! polynomial then stores one residue vector per limb, laid out limb-major
//! (matching [`NttContext`]). Single-limb polynomials (e.g. plaintext
//! polynomials modulo t) are the degenerate case with one modulus.

use super::gaussian::GaussianSampler;
use super::modular::ModQ;
use super::ntt::NttContext;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Neg, Sub};

/// Polynomial in R_Q = Z_Q[X]/(X^d + 1), residue number system layout.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Poly {
    /// Residues, limb-major: `dim` values per modulus.
    coeffs: Vec<u64>,
    /// CRT moduli of Q.
    moduli: Vec<u64>,
    /// Whether the residues are in NTT (Montgomery evaluation) domain.
    is_ntt: bool,
}

impl Poly {
    /// Create the zero polynomial for the given dimension and moduli.
    pub fn zero(dim: usize, moduli: &[u64]) -> Self {
        Self {
            coeffs: vec![0; dim * moduli.len()],
            moduli: moduli.to_vec(),
            is_ntt: false,
        }
    }

    /// Create a single-modulus polynomial from a coefficient vector.
    pub fn from_coeffs(coeffs: Vec<u64>, q: u64) -> Self {
        let mut p = Self {
            coeffs,
            moduli: vec![q],
            is_ntt: false,
        };
        for c in &mut p.coeffs {
            *c %= q;
        }
        p
    }

    /// Create a polynomial from small unsigned coefficients, replicated
    /// into every limb.
    pub fn from_small_coeffs(vals: &[u64], moduli: &[u64]) -> Self {
        let dim = vals.len();
        let mut coeffs = Vec::with_capacity(dim * moduli.len());
        for &q in moduli {
            coeffs.extend(vals.iter().map(|&v| v % q));
        }
        Self {
            coeffs,
            moduli: moduli.to_vec(),
            is_ntt: false,
        }
    }

    /// Create a polynomial from signed coefficients, reduced into every
    /// limb's residue ring.
    pub fn from_signed_coeffs(vals: &[i64], moduli: &[u64]) -> Self {
        let dim = vals.len();
        let mut coeffs = Vec::with_capacity(dim * moduli.len());
        for &q in moduli {
            coeffs.extend(vals.iter().map(|&v| ModQ::from_signed(v, q)));
        }
        Self {
            coeffs,
            moduli: moduli.to_vec(),
            is_ntt: false,
        }
    }

    /// Generate a uniformly random polynomial with the given RNG.
    ///
    /// Independent uniform residues per limb yield a uniform value modulo
    /// the composed modulus by CRT.
    pub fn random_with_rng<R: Rng>(dim: usize, moduli: &[u64], rng: &mut R) -> Self {
        let mut coeffs = Vec::with_capacity(dim * moduli.len());
        for &q in moduli {
            coeffs.extend((0..dim).map(|_| rng.gen_range(0..q)));
        }
        Self {
            coeffs,
            moduli: moduli.to_vec(),
            is_ntt: false,
        }
    }

    /// Sample a polynomial with signed Gaussian coefficients.
    pub fn sample_gaussian(dim: usize, moduli: &[u64], sampler: &mut GaussianSampler) -> Self {
        let vals = sampler.sample_vec(dim);
        Self::from_signed_coeffs(&vals, moduli)
    }

    /// Polynomial dimension d.
    pub fn dimension(&self) -> usize {
        self.coeffs.len() / self.moduli.len()
    }

    /// CRT moduli.
    pub fn moduli(&self) -> &[u64] {
        &self.moduli
    }

    /// Number of CRT limbs.
    pub fn crt_count(&self) -> usize {
        self.moduli.len()
    }

    /// Whether the polynomial is in NTT domain.
    pub fn is_ntt(&self) -> bool {
        self.is_ntt
    }

    /// Residues of limb `l`.
    pub fn limb(&self, l: usize) -> &[u64] {
        let d = self.dimension();
        &self.coeffs[l * d..(l + 1) * d]
    }

    /// Mutable residues of limb `l`.
    pub fn limb_mut(&mut self, l: usize) -> &mut [u64] {
        let d = self.dimension();
        &mut self.coeffs[l * d..(l + 1) * d]
    }

    /// Coefficient accessor for single-limb polynomials.
    ///
    /// # Panics
    ///
    /// Panics in NTT domain or with more than one limb.
    pub fn coeff(&self, i: usize) -> u64 {
        assert!(!self.is_ntt, "Cannot access coefficients in NTT domain");
        assert_eq!(self.crt_count(), 1, "coeff() requires a single limb");
        self.coeffs[i]
    }

    /// Collect the residues of coefficient `i` across all limbs.
    pub fn residues_at(&self, i: usize, out: &mut Vec<u64>) {
        debug_assert!(!self.is_ntt, "Cannot read coefficients in NTT domain");
        let d = self.dimension();
        out.clear();
        for l in 0..self.moduli.len() {
            out.push(self.coeffs[l * d + i]);
        }
    }

    /// Set coefficient `i` to a small unsigned value in every limb.
    pub fn set_coeff_small(&mut self, i: usize, val: u64) {
        assert!(!self.is_ntt, "Cannot set coefficients in NTT domain");
        let d = self.dimension();
        for l in 0..self.moduli.len() {
            let q = self.moduli[l];
            self.coeffs[l * d + i] = val % q;
        }
    }

    /// Convert to NTT domain in place.
    pub fn to_ntt(&mut self, ctx: &NttContext) {
        debug_assert_eq!(ctx.moduli(), self.moduli.as_slice(), "NTT moduli mismatch");
        if !self.is_ntt {
            ctx.forward(&mut self.coeffs);
            self.is_ntt = true;
        }
    }

    /// Convert from NTT domain in place.
    pub fn from_ntt(&mut self, ctx: &NttContext) {
        debug_assert_eq!(ctx.moduli(), self.moduli.as_slice(), "NTT moduli mismatch");
        if self.is_ntt {
            ctx.inverse(&mut self.coeffs);
            self.is_ntt = false;
        }
    }

    /// Create a copy in NTT domain.
    pub fn to_ntt_new(&self, ctx: &NttContext) -> Self {
        let mut result = self.clone();
        result.to_ntt(ctx);
        result
    }

    /// Create a copy in coefficient domain.
    pub fn from_ntt_new(&self, ctx: &NttContext) -> Self {
        let mut result = self.clone();
        result.from_ntt(ctx);
        result
    }

    /// Scalar multiplication by one small scalar (reduced per limb).
    pub fn scalar_mul(&self, scalar: u64) -> Self {
        let d = self.dimension();
        let mut coeffs = Vec::with_capacity(self.coeffs.len());
        for (l, &q) in self.moduli.iter().enumerate() {
            let s = scalar % q;
            coeffs.extend(self.coeffs[l * d..(l + 1) * d].iter().map(|&c| ModQ::mul(c, s, q)));
        }
        Self {
            coeffs,
            moduli: self.moduli.clone(),
            is_ntt: self.is_ntt,
        }
    }

    /// Scalar multiplication with a precomputed per-limb scalar (e.g. the
    /// scaling factor Δ reduced modulo each limb).
    pub fn scalar_mul_rns(&self, scalars: &[u64]) -> Self {
        assert_eq!(scalars.len(), self.moduli.len(), "per-limb scalar count");
        let d = self.dimension();
        let mut coeffs = Vec::with_capacity(self.coeffs.len());
        for (l, &q) in self.moduli.iter().enumerate() {
            let s = scalars[l] % q;
            coeffs.extend(self.coeffs[l * d..(l + 1) * d].iter().map(|&c| ModQ::mul(c, s, q)));
        }
        Self {
            coeffs,
            moduli: self.moduli.clone(),
            is_ntt: self.is_ntt,
        }
    }

    /// Polynomial multiplication using NTT (negacyclic for X^d + 1).
    ///
    /// Accepts coefficient-domain inputs; returns a coefficient-domain
    /// product.
    pub fn mul_ntt(&self, other: &Self, ctx: &NttContext) -> Self {
        assert_eq!(self.moduli, other.moduli, "Moduli must match");
        assert_eq!(self.dimension(), other.dimension(), "Dimensions must match");

        let mut a = self.clone();
        let mut b = other.clone();

        a.to_ntt(ctx);
        b.to_ntt(ctx);

        let mut result = vec![0u64; self.coeffs.len()];
        ctx.pointwise_mul(&a.coeffs, &b.coeffs, &mut result);

        let mut poly = Self {
            coeffs: result,
            moduli: self.moduli.clone(),
            is_ntt: true,
        };
        poly.from_ntt(ctx);
        poly
    }

    /// Polynomial multiplication when both operands are already in NTT
    /// domain; the result stays in NTT domain.
    pub fn mul_ntt_domain(&self, other: &Self, ctx: &NttContext) -> Self {
        assert!(
            self.is_ntt && other.is_ntt,
            "Both polynomials must be in NTT domain"
        );
        assert_eq!(self.moduli, other.moduli, "Moduli must match");

        let mut result = vec![0u64; self.coeffs.len()];
        ctx.pointwise_mul(&self.coeffs, &other.coeffs, &mut result);

        Self {
            coeffs: result,
            moduli: self.moduli.clone(),
            is_ntt: true,
        }
    }

    /// Check if all residues are zero.
    pub fn is_zero(&self) -> bool {
        self.coeffs.iter().all(|&c| c == 0)
    }
}

impl PartialEq for Poly {
    fn eq(&self, other: &Self) -> bool {
        self.moduli == other.moduli && self.is_ntt == other.is_ntt && self.coeffs == other.coeffs
    }
}

impl Eq for Poly {}

impl Add for &Poly {
    type Output = Poly;

    fn add(self, rhs: Self) -> Self::Output {
        assert_eq!(self.moduli, rhs.moduli, "Moduli must match");
        assert_eq!(self.is_ntt, rhs.is_ntt, "NTT domains must match");

        let d = self.dimension();
        let mut coeffs = Vec::with_capacity(self.coeffs.len());
        for (l, &q) in self.moduli.iter().enumerate() {
            let (a, b) = (&self.coeffs[l * d..(l + 1) * d], &rhs.coeffs[l * d..(l + 1) * d]);
            coeffs.extend(a.iter().zip(b.iter()).map(|(&x, &y)| {
                let sum = x + y;
                if sum >= q {
                    sum - q
                } else {
                    sum
                }
            }));
        }

        Poly {
            coeffs,
            moduli: self.moduli.clone(),
            is_ntt: self.is_ntt,
        }
    }
}

impl AddAssign<&Poly> for Poly {
    fn add_assign(&mut self, rhs: &Poly) {
        assert_eq!(self.moduli, rhs.moduli, "Moduli must match");
        assert_eq!(self.is_ntt, rhs.is_ntt, "NTT domains must match");

        let d = self.dimension();
        for l in 0..self.moduli.len() {
            let q = self.moduli[l];
            for j in l * d..(l + 1) * d {
                let sum = self.coeffs[j] + rhs.coeffs[j];
                self.coeffs[j] = if sum >= q { sum - q } else { sum };
            }
        }
    }
}

impl Sub for &Poly {
    type Output = Poly;

    fn sub(self, rhs: Self) -> Self::Output {
        assert_eq!(self.moduli, rhs.moduli, "Moduli must match");
        assert_eq!(self.is_ntt, rhs.is_ntt, "NTT domains must match");

        let d = self.dimension();
        let mut coeffs = Vec::with_capacity(self.coeffs.len());
        for (l, &q) in self.moduli.iter().enumerate() {
            let (a, b) = (&self.coeffs[l * d..(l + 1) * d], &rhs.coeffs[l * d..(l + 1) * d]);
            coeffs.extend(
                a.iter()
                    .zip(b.iter())
                    .map(|(&x, &y)| if x >= y { x - y } else { q - y + x }),
            );
        }

        Poly {
            coeffs,
            moduli: self.moduli.clone(),
            is_ntt: self.is_ntt,
        }
    }
}

impl Neg for &Poly {
    type Output = Poly;

    fn neg(self) -> Self::Output {
        let d = self.dimension();
        let mut coeffs = Vec::with_capacity(self.coeffs.len());
        for (l, &q) in self.moduli.iter().enumerate() {
            coeffs.extend(
                self.coeffs[l * d..(l + 1) * d]
                    .iter()
                    .map(|&c| if c == 0 { 0 } else { q - c }),
            );
        }

        Poly {
            coeffs,
            moduli: self.moduli.clone(),
            is_ntt: self.is_ntt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const Q: u64 = 281474976694273;
    const Q2: u64 = 281474976636929;

    fn make_ctx(n: usize) -> NttContext {
        NttContext::with_moduli(n, &[Q, Q2])
    }

    #[test]
    fn test_zero_polynomial() {
        let p = Poly::zero(256, &[Q, Q2]);
        assert!(p.is_zero());
        assert_eq!(p.dimension(), 256);
        assert_eq!(p.crt_count(), 2);
    }

    #[test]
    fn test_from_signed_coeffs() {
        let p = Poly::from_signed_coeffs(&[1, -2, 0, 3], &[Q, Q2]);
        assert_eq!(p.limb(0), &[1, Q - 2, 0, 3]);
        assert_eq!(p.limb(1), &[1, Q2 - 2, 0, 3]);
    }

    #[test]
    fn test_addition_and_negation() {
        let a = Poly::from_small_coeffs(&[1, 2, 3, 4], &[Q, Q2]);
        let b = Poly::from_small_coeffs(&[5, 6, 7, 8], &[Q, Q2]);
        let c = &a + &b;

        assert_eq!(c.limb(0), &[6, 8, 10, 12]);
        assert_eq!(c.limb(1), &[6, 8, 10, 12]);

        let sum = &a + &(-&a);
        assert!(sum.is_zero());
    }

    #[test]
    fn test_subtraction_underflow() {
        let a = Poly::from_small_coeffs(&[5, 6], &[Q]);
        let b = Poly::from_small_coeffs(&[10, 2], &[Q]);
        let c = &a - &b;

        assert_eq!(c.coeff(0), Q - 5);
        assert_eq!(c.coeff(1), 4);
    }

    #[test]
    fn test_scalar_multiplication() {
        let a = Poly::from_small_coeffs(&[1, 2, 3, 4], &[Q, Q2]);
        let b = a.scalar_mul(10);

        assert_eq!(b.limb(0), &[10, 20, 30, 40]);
        assert_eq!(b.limb(1), &[10, 20, 30, 40]);
    }

    #[test]
    fn test_scalar_mul_rns() {
        let a = Poly::from_small_coeffs(&[1, 2], &[Q, Q2]);
        let b = a.scalar_mul_rns(&[3, 5]);

        assert_eq!(b.limb(0), &[3, 6]);
        assert_eq!(b.limb(1), &[5, 10]);
    }

    #[test]
    fn test_ntt_roundtrip() {
        let n = 256;
        let ctx = make_ctx(n);
        let vals: Vec<u64> = (0..n as u64).collect();
        let mut p = Poly::from_small_coeffs(&vals, &[Q, Q2]);

        let original = p.clone();
        p.to_ntt(&ctx);
        assert!(p.is_ntt());
        p.from_ntt(&ctx);
        assert!(!p.is_ntt());

        assert_eq!(p, original);
    }

    #[test]
    fn test_poly_mul_ntt_identity() {
        let n = 256;
        let ctx = make_ctx(n);

        let vals: Vec<u64> = (0..n as u64).collect();
        let a = Poly::from_small_coeffs(&vals, &[Q, Q2]);
        let mut one = vec![0u64; n];
        one[0] = 1;
        let one = Poly::from_small_coeffs(&one, &[Q, Q2]);

        let result = a.mul_ntt(&one, &ctx);
        assert_eq!(result, a);
    }

    #[test]
    fn test_poly_mul_ntt_negacyclic() {
        // x * x^(n-1) = x^n = -1 (mod X^n + 1)
        let n = 256;
        let ctx = make_ctx(n);

        let mut a_coeffs = vec![0u64; n];
        a_coeffs[1] = 1;
        let a = Poly::from_small_coeffs(&a_coeffs, &[Q, Q2]);

        let mut b_coeffs = vec![0u64; n];
        b_coeffs[n - 1] = 1;
        let b = Poly::from_small_coeffs(&b_coeffs, &[Q, Q2]);

        let result = a.mul_ntt(&b, &ctx);

        assert_eq!(result.limb(0)[0], Q - 1);
        assert_eq!(result.limb(1)[0], Q2 - 1);
        assert!(result.limb(0)[1..].iter().all(|&c| c == 0));
        assert!(result.limb(1)[1..].iter().all(|&c| c == 0));
    }

    #[test]
    fn test_poly_mul_distributivity() {
        let n = 128;
        let ctx = make_ctx(n);

        let a = Poly::from_small_coeffs(&(0..n as u64).map(|i| i % 50).collect::<Vec<_>>(), &[Q, Q2]);
        let b = Poly::from_small_coeffs(&(0..n as u64).map(|i| (i * 3) % 50).collect::<Vec<_>>(), &[Q, Q2]);
        let c = Poly::from_small_coeffs(&(0..n as u64).map(|i| (i * 5) % 50).collect::<Vec<_>>(), &[Q, Q2]);

        let b_plus_c = &b + &c;
        let left = a.mul_ntt(&b_plus_c, &ctx);

        let ab = a.mul_ntt(&b, &ctx);
        let ac = a.mul_ntt(&c, &ctx);
        let right = &ab + &ac;

        assert_eq!(left, right);
    }

    #[test]
    fn test_ntt_domain_multiplication() {
        let n = 128;
        let ctx = make_ctx(n);

        let a = Poly::from_small_coeffs(&(0..n as u64).map(|i| i % 100).collect::<Vec<_>>(), &[Q, Q2]);
        let b = Poly::from_small_coeffs(&(0..n as u64).map(|i| (i * 7) % 100).collect::<Vec<_>>(), &[Q, Q2]);

        let result1 = a.mul_ntt(&b, &ctx);

        let a_ntt = a.to_ntt_new(&ctx);
        let b_ntt = b.to_ntt_new(&ctx);
        let mut result2 = a_ntt.mul_ntt_domain(&b_ntt, &ctx);
        result2.from_ntt(&ctx);

        assert_eq!(result1, result2);
    }

    #[test]
    fn test_residues_at() {
        let p = Poly::from_signed_coeffs(&[7, -1], &[Q, Q2]);
        let mut buf = Vec::new();
        p.residues_at(1, &mut buf);
        assert_eq!(buf, vec![Q - 1, Q2 - 1]);
    }
}
