//! Client side of the prepare sub-protocol.
//!
//! The client encrypts gadget digits of its LWE secret into every branch,
//! generates the rotation key, and later decrypts the server's evaluation
//! and CRT-composes the limb products into `w = H·s`.

use rand::Rng;

use crate::error::{Error, Result};
use crate::ks::generate_automorphism_ks_matrix;
use crate::lwe::LweSecretKey;
use crate::math::{GaussianSampler, ModQ, Poly};
use crate::messages::{BranchRequest, PrepareRequest, PrepareResponse};
use crate::rlwe::{scale_plaintext, RlweCiphertext, RlweSecretKey};

use super::{LinPirContext, ROTATION_GENERATOR};

/// Client-side prepare state: the session RLWE key needed to decrypt the
/// prepare response. Scoped to one client session; never serialized.
#[derive(Clone, Debug)]
pub struct PrepareSession {
    pub(crate) rlwe_sk: RlweSecretKey,
}

/// Encrypt the LWE secret for the homomorphic evaluation.
///
/// Produces, per branch, encryptions of `encode(z^i · s mod t)` for each
/// plaintext gadget digit `i`, plus one rotation key shared by all
/// branches.
pub fn build_prepare_request<R: Rng>(
    ctx: &LinPirContext,
    secret: &LweSecretKey,
    rng: &mut R,
) -> Result<(PrepareSession, PrepareRequest)> {
    if secret.dim() != ctx.secret_dim {
        return Err(Error::Encoding("secret dimension mismatch".into()));
    }

    let mut sampler = GaussianSampler::from_variance(ctx.error_variance);
    let rlwe_sk = RlweSecretKey::generate(ctx.n, &ctx.moduli, &mut sampler);
    if rlwe_sk.poly.is_zero() {
        return Err(Error::KeyGen("sampled an all-zero RLWE secret".into()));
    }

    let mut rotation_key = generate_automorphism_ks_matrix(
        &rlwe_sk,
        ROTATION_GENERATOR,
        &ctx.gadget,
        &mut sampler,
        &ctx.ntt,
        rng,
    );
    rotation_key.to_ntt(&ctx.ntt);

    let z = 1u64 << ctx.gadget_log_b;
    let branches = ctx
        .branches
        .iter()
        .map(|branch| {
            let t = branch.t;
            let s_mod_t: Vec<u64> = secret
                .coeffs()
                .iter()
                .map(|&v| ModQ::from_signed(v, t))
                .collect();

            let digit_cts = (0..branch.digits)
                .map(|i| {
                    let factor = ModQ::pow(z, i as u64, t);
                    let vals: Vec<u64> =
                        s_mod_t.iter().map(|&v| ModQ::mul(v, factor, t)).collect();
                    let coeffs = branch.encoding.encode(&vals);
                    let scaled = scale_plaintext(&coeffs, &branch.delta, &ctx.moduli);

                    let a = Poly::random_with_rng(ctx.n, &ctx.moduli, rng);
                    let e = Poly::sample_gaussian(ctx.n, &ctx.moduli, &mut sampler);
                    RlweCiphertext::encrypt(&rlwe_sk, &scaled, a, &e, &ctx.ntt)
                })
                .collect();
            BranchRequest { digit_cts }
        })
        .collect();

    Ok((
        PrepareSession { rlwe_sk },
        PrepareRequest {
            rotation_key,
            branches,
        },
    ))
}

/// Decrypt the prepare response and recover `w = H·s` (one vector per
/// shard, entries modulo the LWE modulus).
///
/// Each limb product is recovered exactly through the CRT over the
/// plaintext moduli; a composed value outside the hard magnitude bound
/// means a branch decrypted incorrectly, i.e. the noise budget was
/// exceeded.
pub fn recover_hint_product(
    ctx: &LinPirContext,
    session: &PrepareSession,
    response: &PrepareResponse,
) -> Result<Vec<Vec<u64>>> {
    if response.branches.len() != ctx.branches.len() {
        return Err(Error::Encoding("prepare response branch count mismatch".into()));
    }
    let slots = ctx.num_shards * ctx.num_limbs;
    for branch in &response.branches {
        if branch.shard_limb_cts.len() != slots {
            return Err(Error::Encoding("prepare response ciphertext count mismatch".into()));
        }
    }

    // values[branch][shard * num_limbs + limb][row]
    let values: Vec<Vec<Vec<u64>>> = response
        .branches
        .iter()
        .zip(ctx.branches.iter())
        .map(|(branch_resp, branch_ctx)| {
            branch_resp
                .shard_limb_cts
                .iter()
                .map(|ct| {
                    let coeffs =
                        ct.decrypt_decode(&session.rlwe_sk, &ctx.ntt, &ctx.crt_q, branch_ctx.t);
                    let mut slots = branch_ctx.encoding.decode(&coeffs);
                    slots.truncate(ctx.rows_per_block);
                    slots
                })
                .collect()
        })
        .collect();

    let modulus = 1i128 << ctx.lwe_modulus_bits;
    let mut w = Vec::with_capacity(ctx.num_shards);
    let mut residues = vec![0u64; ctx.branches.len()];

    for sh in 0..ctx.num_shards {
        let mut shard_w = Vec::with_capacity(ctx.rows_per_block);
        for r in 0..ctx.rows_per_block {
            let mut acc: i128 = 0;
            for l in 0..ctx.num_limbs {
                for (b, branch_vals) in values.iter().enumerate() {
                    residues[b] = branch_vals[sh * ctx.num_limbs + l][r];
                }
                let v = ctx.crt_t.compose_centered(&residues);
                if v.abs() > ctx.recovery_bound {
                    return Err(Error::Decryption(format!(
                        "limb product {} exceeds the noise budget bound {}",
                        v, ctx.recovery_bound
                    )));
                }
                acc += v << (l * ctx.limb_bits);
            }
            let reduced = ((acc % modulus) + modulus) % modulus;
            shard_w.push(reduced as u64);
        }
        w.push(shard_w);
    }

    Ok(w)
}
