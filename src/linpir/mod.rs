//! LinPIR: homomorphic evaluation of (hint matrix) × (encrypted secret).
//!
//! Given the plaintext hint matrices held by the server and an RLWE
//! encryption of the client's LWE secret, the engine computes RLWE
//! ciphertexts encrypting `H·s` without decrypting `s` or revealing more
//! of `H` than the product.
//!
//! # Scheme
//!
//! The hint (entries modulo 2^k) is split into limbs small enough that
//! each limb/secret dot product is recovered exactly through the CRT over
//! the plaintext moduli (`ts`); one evaluation **branch** runs per
//! plaintext modulus, all over the same RNS ring modulus Q. Within a
//! branch, the limb matrix is packed as generalized diagonals in the slot
//! encoding, the client's secret arrives as gadget-digit ciphertexts, and
//! the evaluation is a sequential rotate-and-accumulate:
//!
//! ```text
//! out = Σ_k  diag_k ⊙ rot_k(ct),   rot_{k+1}(ct) = key_switch(τ_3(rot_k(ct)))
//! ```
//!
//! One rotation key suffices for the whole sweep; there is no per-row
//! ciphertext multiplication, and communication stays sublinear in the
//! number of hint rows.

mod encoding;
mod engine;
mod session;

pub use encoding::{SlotEncoding, ROTATION_GENERATOR};
pub use engine::LinPirDatabase;
pub use session::{build_prepare_request, recover_hint_product, PrepareSession};

use crate::math::{CrtContext, GaussianSampler, NttContext};
use crate::params::Parameters;
use crate::rlwe::{delta_rns, GadgetVector};

/// Per-branch precomputation: one branch per plaintext modulus.
#[derive(Clone, Debug)]
pub struct BranchContext {
    /// Plaintext modulus t.
    pub t: u64,
    /// Scaling factor Δ = ⌊Q/t⌋, reduced per RNS limb.
    pub delta: Vec<u64>,
    /// Plaintext gadget digit count ℓ_t = ⌈log2 t / log_b⌉.
    pub digits: usize,
    /// Slot encoding for t.
    pub encoding: SlotEncoding,
}

/// Shared precomputation for the LinPIR sub-protocol, derived from the
/// validated protocol parameters. Built identically on both sides.
#[derive(Clone, Debug)]
pub struct LinPirContext {
    /// Ring dimension n.
    pub n: usize,
    /// Slots per rotation orbit (n / 2).
    pub half: usize,
    /// RNS limbs of Q.
    pub moduli: Vec<u64>,
    /// NTT over the RNS limbs.
    pub ntt: NttContext,
    /// CRT composition over the RNS limbs.
    pub crt_q: CrtContext,
    /// CRT composition over the plaintext moduli.
    pub crt_t: CrtContext,
    /// Key-switch gadget over Q.
    pub gadget: GadgetVector,
    /// Common gadget log-base.
    pub gadget_log_b: usize,
    /// Hint rows per homomorphic block (shard height).
    pub rows_per_block: usize,
    /// Number of shards.
    pub num_shards: usize,
    /// Bits per hint limb.
    pub limb_bits: usize,
    /// Number of hint limbs.
    pub num_limbs: usize,
    /// LWE secret dimension.
    pub secret_dim: usize,
    /// LWE modulus bit size (for recombining limb products).
    pub lwe_modulus_bits: usize,
    /// RLWE error variance.
    pub error_variance: f64,
    /// Hard magnitude bound on any limb/secret dot product; decrypted
    /// values beyond it mean the noise budget was exceeded.
    pub recovery_bound: i128,
    /// One branch per plaintext modulus.
    pub branches: Vec<BranchContext>,
}

impl LinPirContext {
    /// Derive the context from validated parameters.
    pub fn new(params: &Parameters) -> Self {
        let rp = &params.linpir_params;
        let n = rp.n();
        let moduli = rp.qs.clone();
        let ntt = NttContext::with_moduli(n, &moduli);
        let crt_q = CrtContext::new(&moduli);
        let crt_t = CrtContext::new(&rp.ts);
        let gadget = GadgetVector::new(rp.gadget_log_b(), rp.ks_digits(), &moduli);

        let branches = rp
            .ts
            .iter()
            .enumerate()
            .map(|(b, &t)| BranchContext {
                t,
                delta: delta_rns(crt_q.modulus() / t as u128, &moduli),
                digits: rp.plaintext_digits(b),
                encoding: SlotEncoding::new(n, t),
            })
            .collect();

        let limb_bits = params.hint_limb_bits();
        let tailcut = GaussianSampler::tailcut_for_variance(params.lwe_error_variance) as i128;
        let limb_max = ((1u64 << limb_bits) - 1) as i128;
        let recovery_bound = params.lwe_secret_dim as i128 * limb_max * tailcut;

        Self {
            n,
            half: n / 2,
            moduli,
            ntt,
            crt_q,
            crt_t,
            gadget,
            gadget_log_b: rp.gadget_log_b(),
            rows_per_block: rp.rows_per_block,
            num_shards: params.num_shards(),
            limb_bits,
            num_limbs: params.num_hint_limbs(),
            secret_dim: params.lwe_secret_dim,
            lwe_modulus_bits: params.lwe_modulus_bit_size,
            error_variance: rp.error_variance,
            recovery_bound,
            branches,
        }
    }
}
