//! RLWE encryption and decryption
//!
//! Implements encryption: b = -a·s + e + Δ·m
//! where Δ = ⌊Q/t⌋ is the scaling factor, held as a u128 and applied
//! per RNS limb.

use crate::math::{CrtContext, GaussianSampler, NttContext, Poly};

use super::types::{RlweCiphertext, RlweSecretKey};

impl RlweSecretKey {
    /// Generate a secret key from the Gaussian error distribution.
    pub fn generate(dim: usize, moduli: &[u64], sampler: &mut GaussianSampler) -> Self {
        Self {
            poly: Poly::sample_gaussian(dim, moduli, sampler),
        }
    }
}

/// Per-limb residues of the scaling factor Δ = ⌊Q/t⌋.
pub fn delta_rns(delta: u128, moduli: &[u64]) -> Vec<u64> {
    moduli.iter().map(|&q| (delta % q as u128) as u64).collect()
}

/// Lift a plaintext polynomial (coefficients modulo t) into R_Q scaled by Δ.
pub fn scale_plaintext(coeffs: &[u64], delta: &[u64], moduli: &[u64]) -> Poly {
    Poly::from_small_coeffs(coeffs, moduli).scalar_mul_rns(delta)
}

impl RlweCiphertext {
    /// Encrypt an already Δ-scaled message polynomial.
    ///
    /// Computes `(a, b)` where `b = -a·s + e + scaled_msg`.
    pub fn encrypt(
        sk: &RlweSecretKey,
        scaled_msg: &Poly,
        a_random: Poly,
        error: &Poly,
        ctx: &NttContext,
    ) -> Self {
        let a_s = a_random.mul_ntt(&sk.poly, ctx);
        let b = &(&(-&a_s) + error) + scaled_msg;

        Self { a: a_random, b }
    }

    /// Compute the noisy phase `b + a·s = e + Δ·m` in coefficient domain.
    pub fn phase(&self, sk: &RlweSecretKey, ctx: &NttContext) -> Poly {
        let a_s = self.a.mul_ntt(&sk.poly, ctx);
        &a_s + &self.b
    }

    /// Decrypt and decode to a plaintext polynomial modulo t.
    ///
    /// Composes each coefficient across the RNS limbs and rounds:
    /// `m = ⌊t·(b + a·s) / Q⌉ mod t`.
    pub fn decrypt_decode(
        &self,
        sk: &RlweSecretKey,
        ctx: &NttContext,
        crt: &CrtContext,
        t: u64,
    ) -> Vec<u64> {
        let noisy = self.phase(sk, ctx);
        let d = noisy.dimension();
        let big_q = crt.modulus();

        let mut residues = Vec::with_capacity(crt.moduli().len());
        let mut out = Vec::with_capacity(d);
        for i in 0..d {
            noisy.residues_at(i, &mut residues);
            let x = crt.compose(&residues);
            let rounded = (x * t as u128 + big_q / 2) / big_q;
            out.push((rounded % t as u128) as u64);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    const MODULI: [u64; 2] = [281474976694273, 281474976636929];
    const T: u64 = 2056193;
    const N: usize = 256;

    fn setup() -> (NttContext, CrtContext, Vec<u64>) {
        let ctx = NttContext::with_moduli(N, &MODULI);
        let crt = CrtContext::new(&MODULI);
        let delta = delta_rns(crt.modulus() / T as u128, &MODULI);
        (ctx, crt, delta)
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let (ctx, crt, delta) = setup();
        let mut sampler = GaussianSampler::with_seed(8.0f64.sqrt(), 1);
        let mut rng = ChaCha20Rng::seed_from_u64(2);

        let sk = RlweSecretKey::generate(N, &MODULI, &mut sampler);

        let msg: Vec<u64> = (0..N as u64).map(|i| (i * 31) % T).collect();
        let scaled = scale_plaintext(&msg, &delta, &MODULI);

        let a = Poly::random_with_rng(N, &MODULI, &mut rng);
        let e = Poly::sample_gaussian(N, &MODULI, &mut sampler);
        let ct = RlweCiphertext::encrypt(&sk, &scaled, a, &e, &ctx);

        let decrypted = ct.decrypt_decode(&sk, &ctx, &crt, T);
        assert_eq!(decrypted, msg);
    }

    #[test]
    fn test_encrypt_decrypt_zero() {
        let (ctx, crt, delta) = setup();
        let mut sampler = GaussianSampler::with_seed(8.0f64.sqrt(), 3);
        let mut rng = ChaCha20Rng::seed_from_u64(4);

        let sk = RlweSecretKey::generate(N, &MODULI, &mut sampler);
        let scaled = scale_plaintext(&vec![0u64; N], &delta, &MODULI);
        let a = Poly::random_with_rng(N, &MODULI, &mut rng);
        let e = Poly::sample_gaussian(N, &MODULI, &mut sampler);
        let ct = RlweCiphertext::encrypt(&sk, &scaled, a, &e, &ctx);

        let decrypted = ct.decrypt_decode(&sk, &ctx, &crt, T);
        assert!(decrypted.iter().all(|&m| m == 0));
    }

    #[test]
    fn test_homomorphic_addition() {
        let (ctx, crt, delta) = setup();
        let mut sampler = GaussianSampler::with_seed(8.0f64.sqrt(), 5);
        let mut rng = ChaCha20Rng::seed_from_u64(6);

        let sk = RlweSecretKey::generate(N, &MODULI, &mut sampler);

        let msg1: Vec<u64> = (0..N as u64).map(|i| i % 100).collect();
        let msg2: Vec<u64> = (0..N as u64).map(|i| (i + 50) % 100).collect();

        let ct1 = RlweCiphertext::encrypt(
            &sk,
            &scale_plaintext(&msg1, &delta, &MODULI),
            Poly::random_with_rng(N, &MODULI, &mut rng),
            &Poly::sample_gaussian(N, &MODULI, &mut sampler),
            &ctx,
        );
        let ct2 = RlweCiphertext::encrypt(
            &sk,
            &scale_plaintext(&msg2, &delta, &MODULI),
            Poly::random_with_rng(N, &MODULI, &mut rng),
            &Poly::sample_gaussian(N, &MODULI, &mut sampler),
            &ctx,
        );

        let sum = ct1.add(&ct2);
        let decrypted = sum.decrypt_decode(&sk, &ctx, &crt, T);

        for i in 0..N {
            assert_eq!(decrypted[i], (msg1[i] + msg2[i]) % T);
        }
    }

    #[test]
    fn test_zero_ciphertext_decrypts_to_zero() {
        let (ctx, crt, _) = setup();
        let mut sampler = GaussianSampler::with_seed(8.0f64.sqrt(), 7);
        let sk = RlweSecretKey::generate(N, &MODULI, &mut sampler);

        let ct = RlweCiphertext::zero(N, &MODULI);
        let decrypted = ct.decrypt_decode(&sk, &ctx, &crt, T);
        assert!(decrypted.iter().all(|&m| m == 0));
    }
}
