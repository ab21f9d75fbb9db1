//! Key-switching operation

use crate::math::{CrtContext, NttContext, Poly};
use crate::rlwe::{gadget_decompose, RlweCiphertext};

use super::setup::KeySwitchingMatrix;

/// Apply key-switching to transform a ciphertext from key s to key s'.
///
/// Given ciphertext (a, b) under key s and key-switching matrix K,
/// computes a new ciphertext (a', b') valid under key s'.
///
/// # Algorithm
///
/// 1. Decompose a using the gadget: g⁻¹(a) = [a₀, a₁, ..., a_{ℓ-1}]
/// 2. Compute: (a', b') = (0, b) + Σᵢ aᵢ · K[i]
///
/// The result satisfies: a'·s' + b' ≈ a·s + b (the same noisy phase).
///
/// The matrix rows must be in NTT domain (see
/// [`KeySwitchingMatrix::to_ntt`]); the input and output ciphertexts are in
/// coefficient domain.
pub fn key_switch(
    ct: &RlweCiphertext,
    ks_matrix: &KeySwitchingMatrix,
    ctx: &NttContext,
    crt: &CrtContext,
) -> RlweCiphertext {
    let d = ct.ring_dim();
    let moduli = ct.moduli().to_vec();
    let gadget = &ks_matrix.gadget;

    let a_decomp = gadget_decompose(&ct.a, gadget, crt);

    let mut acc_a = Poly::zero(d, &moduli);
    let mut acc_b = Poly::zero(d, &moduli);
    acc_a.to_ntt(ctx);
    acc_b.to_ntt(ctx);

    for (digit, row) in a_decomp.into_iter().zip(ks_matrix.rows.iter()) {
        assert!(row.a.is_ntt() && row.b.is_ntt(), "KS rows must be in NTT domain");

        let mut digit_ntt = digit;
        digit_ntt.to_ntt(ctx);

        acc_a += &digit_ntt.mul_ntt_domain(&row.a, ctx);
        acc_b += &digit_ntt.mul_ntt_domain(&row.b, ctx);
    }

    acc_a.from_ntt(ctx);
    acc_b.from_ntt(ctx);

    RlweCiphertext::from_parts(acc_a, &ct.b + &acc_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ks::{generate_automorphism_ks_matrix, generate_ks_matrix};
    use crate::math::GaussianSampler;
    use crate::rlwe::{
        apply_automorphism, automorphism_ciphertext, delta_rns, scale_plaintext, GadgetVector,
        RlweSecretKey,
    };
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    const MODULI: [u64; 2] = [281474976694273, 281474976636929];
    const T: u64 = 2056193;
    const N: usize = 256;

    struct Setup {
        ctx: NttContext,
        crt: CrtContext,
        gadget: GadgetVector,
        delta: Vec<u64>,
        sampler: GaussianSampler,
        rng: ChaCha20Rng,
    }

    fn setup(seed: u64) -> Setup {
        let crt = CrtContext::new(&MODULI);
        let delta = delta_rns(crt.modulus() / T as u128, &MODULI);
        Setup {
            ctx: NttContext::with_moduli(N, &MODULI),
            crt,
            gadget: GadgetVector::new(16, 6, &MODULI),
            delta,
            sampler: GaussianSampler::with_seed(8.0f64.sqrt(), seed),
            rng: ChaCha20Rng::seed_from_u64(seed ^ 0xabcd),
        }
    }

    fn encrypt(s: &mut Setup, sk: &RlweSecretKey, msg: &[u64]) -> RlweCiphertext {
        let scaled = scale_plaintext(msg, &s.delta, &MODULI);
        let a = Poly::random_with_rng(N, &MODULI, &mut s.rng);
        let e = Poly::sample_gaussian(N, &MODULI, &mut s.sampler);
        RlweCiphertext::encrypt(sk, &scaled, a, &e, &s.ctx)
    }

    #[test]
    fn test_key_switch_between_keys() {
        let mut s = setup(11);

        let sk1 = RlweSecretKey::generate(N, &MODULI, &mut s.sampler);
        let sk2 = RlweSecretKey::generate(N, &MODULI, &mut s.sampler);

        let mut ks =
            generate_ks_matrix(&sk1, &sk2, &s.gadget, &mut s.sampler, &s.ctx, &mut s.rng);
        ks.to_ntt(&s.ctx);

        let msg: Vec<u64> = (0..N as u64).map(|i| (i * 3) % T).collect();
        let ct1 = encrypt(&mut s, &sk1, &msg);

        let ct2 = key_switch(&ct1, &ks, &s.ctx, &s.crt);
        let decrypted = ct2.decrypt_decode(&sk2, &s.ctx, &s.crt, T);

        assert_eq!(decrypted, msg);
    }

    #[test]
    fn test_key_switch_same_key() {
        let mut s = setup(12);

        let sk = RlweSecretKey::generate(N, &MODULI, &mut s.sampler);
        let mut ks = generate_ks_matrix(&sk, &sk, &s.gadget, &mut s.sampler, &s.ctx, &mut s.rng);
        ks.to_ntt(&s.ctx);

        let msg: Vec<u64> = (0..N as u64).map(|i| i % 100).collect();
        let ct = encrypt(&mut s, &sk, &msg);

        let switched = key_switch(&ct, &ks, &s.ctx, &s.crt);
        assert_eq!(switched.decrypt_decode(&sk, &s.ctx, &s.crt, T), msg);
    }

    #[test]
    fn test_automorphism_then_key_switch() {
        let mut s = setup(13);
        let g = 3usize;

        let sk = RlweSecretKey::generate(N, &MODULI, &mut s.sampler);
        let mut rot_key =
            generate_automorphism_ks_matrix(&sk, g, &s.gadget, &mut s.sampler, &s.ctx, &mut s.rng);
        rot_key.to_ntt(&s.ctx);

        let msg: Vec<u64> = (0..N as u64).map(|i| (i * 7 + 1) % T).collect();
        let ct = encrypt(&mut s, &sk, &msg);

        // τ_g(ct) is valid under τ_g(sk); the rotation key brings it back
        // under sk, now encrypting τ_g(m).
        let rotated = key_switch(&automorphism_ciphertext(&ct, g), &rot_key, &s.ctx, &s.crt);
        let decrypted = rotated.decrypt_decode(&sk, &s.ctx, &s.crt, T);

        let msg_poly = Poly::from_coeffs(msg, T);
        let expected = apply_automorphism(&msg_poly, g);
        let expected: Vec<u64> = (0..N).map(|i| expected.coeff(i)).collect();

        assert_eq!(decrypted, expected);
    }

    #[test]
    fn test_key_switch_after_homomorphic_add() {
        let mut s = setup(14);

        let sk1 = RlweSecretKey::generate(N, &MODULI, &mut s.sampler);
        let sk2 = RlweSecretKey::generate(N, &MODULI, &mut s.sampler);

        let mut ks =
            generate_ks_matrix(&sk1, &sk2, &s.gadget, &mut s.sampler, &s.ctx, &mut s.rng);
        ks.to_ntt(&s.ctx);

        let msg1: Vec<u64> = (0..N as u64).map(|i| i % 30).collect();
        let msg2: Vec<u64> = (0..N as u64).map(|i| (i + 10) % 30).collect();

        let ct1 = encrypt(&mut s, &sk1, &msg1);
        let ct2 = encrypt(&mut s, &sk1, &msg2);

        let switched = key_switch(&ct1.add(&ct2), &ks, &s.ctx, &s.crt);
        let decrypted = switched.decrypt_decode(&sk2, &s.ctx, &s.crt, T);

        for i in 0..N {
            assert_eq!(decrypted[i], (msg1[i] + msg2[i]) % T);
        }
    }
}
