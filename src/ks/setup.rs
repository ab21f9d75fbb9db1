//! Key-switching matrix generation

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::math::{GaussianSampler, NttContext, Poly};
use crate::rlwe::{apply_automorphism, GadgetVector, RlweCiphertext, RlweSecretKey};

/// Key-switching matrix from secret key s to secret key s'.
///
/// The matrix consists of ℓ RLWE ciphertexts encrypting s·z^i under s':
/// ```text
/// K[i] = (a_i, -a_i·s' + e_i + s·z^i)
/// ```
///
/// This allows transforming ciphertexts from key s to key s' with
/// controlled noise. A rotation key is the special case s = τ_g(s').
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeySwitchingMatrix {
    /// ℓ RLWE ciphertexts.
    pub rows: Vec<RlweCiphertext>,
    /// Gadget parameters.
    pub gadget: GadgetVector,
}

impl KeySwitchingMatrix {
    /// Get the ring dimension.
    pub fn ring_dim(&self) -> usize {
        self.rows[0].ring_dim()
    }

    /// Convert all rows to NTT domain. [`super::key_switch`] requires
    /// NTT-domain rows; doing the conversion once at generation time keeps
    /// it off the per-rotation path.
    pub fn to_ntt(&mut self, ctx: &NttContext) {
        for row in &mut self.rows {
            row.a.to_ntt(ctx);
            row.b.to_ntt(ctx);
        }
    }
}

/// Generate a key-switching matrix from secret key s to secret key s'.
///
/// # Arguments
/// * `from_key` - Source secret key s
/// * `to_key` - Target secret key s'
/// * `gadget` - Gadget vector parameters
/// * `sampler` - Gaussian sampler for error
/// * `ctx` - NTT context
/// * `rng` - Randomness for the `a` components
pub fn generate_ks_matrix<R: Rng>(
    from_key: &RlweSecretKey,
    to_key: &RlweSecretKey,
    gadget: &GadgetVector,
    sampler: &mut GaussianSampler,
    ctx: &NttContext,
    rng: &mut R,
) -> KeySwitchingMatrix {
    let d = from_key.ring_dim();
    let moduli = from_key.moduli().to_vec();
    debug_assert_eq!(from_key.moduli(), to_key.moduli(), "Keys must share moduli");

    let powers = gadget.powers_rns();
    let mut rows = Vec::with_capacity(gadget.digits);

    for power in powers.iter().take(gadget.digits) {
        let a = Poly::random_with_rng(d, &moduli, rng);
        let error = Poly::sample_gaussian(d, &moduli, sampler);

        // b = -a·s' + e + s·z^i
        let a_s_prime = a.mul_ntt(&to_key.poly, ctx);
        let s_scaled = from_key.poly.scalar_mul_rns(power);
        let b = &(&(-&a_s_prime) + &error) + &s_scaled;

        rows.push(RlweCiphertext::from_parts(a, b));
    }

    KeySwitchingMatrix {
        rows,
        gadget: gadget.clone(),
    }
}

/// Generate a key-switching matrix for an automorphism.
///
/// For Galois automorphism τ_g, creates a matrix from τ_g(s) to s. This is
/// the rotation key used to switch back after applying τ_g to a ciphertext.
pub fn generate_automorphism_ks_matrix<R: Rng>(
    sk: &RlweSecretKey,
    automorphism: usize,
    gadget: &GadgetVector,
    sampler: &mut GaussianSampler,
    ctx: &NttContext,
    rng: &mut R,
) -> KeySwitchingMatrix {
    let auto_s = RlweSecretKey::from_poly(apply_automorphism(&sk.poly, automorphism));
    generate_ks_matrix(&auto_s, sk, gadget, sampler, ctx, rng)
}
