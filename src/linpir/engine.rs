//! Server-side homomorphic evaluation.
//!
//! [`LinPirDatabase`] holds the hint matrices preprocessed into
//! diagonal-packed, gadget-decomposed, NTT-domain plaintext polynomials;
//! [`LinPirDatabase::evaluate`] runs the rotate-and-accumulate sweep
//! against a prepare request.

use rayon::prelude::*;

use crate::database::HintMatrix;
use crate::error::{Error, Result};
use crate::ks::key_switch;
use crate::math::Poly;
use crate::messages::{BranchResponse, PrepareRequest, PrepareResponse};
use crate::rlwe::{automorphism_ciphertext, RlweCiphertext};

use super::{LinPirContext, ROTATION_GENERATOR};

/// One generalized diagonal: its plaintext gadget digits, in NTT domain.
/// `None` marks an all-zero diagonal, skipped during accumulation.
type Diagonal = Option<Vec<Poly>>;

struct LimbDb {
    diagonals: Vec<Diagonal>,
}

struct ShardDb {
    limbs: Vec<LimbDb>,
}

struct BranchDb {
    shards: Vec<ShardDb>,
}

/// Hint matrices in evaluation-ready form.
pub struct LinPirDatabase {
    branches: Vec<BranchDb>,
}

impl LinPirDatabase {
    /// Preprocess the shard hints into diagonal-packed plaintexts.
    ///
    /// The limb matrix of each (branch, shard) pair is zero-padded to
    /// `half x half` and stored as its generalized diagonals
    /// `d_k[i] = M[i][(i+k) mod half]`, slot-encoded and digit-decomposed.
    pub fn build(ctx: &LinPirContext, hints: &[HintMatrix]) -> Self {
        let half = ctx.half;
        let limb_mask = (1u64 << ctx.limb_bits) - 1;
        let base_mask = (1u64 << ctx.gadget_log_b) - 1;

        let branches = ctx
            .branches
            .iter()
            .map(|branch| {
                let t = branch.t;
                let shards = hints
                    .iter()
                    .map(|hint| {
                        let limbs = (0..ctx.num_limbs)
                            .map(|l| {
                                let shift = l * ctx.limb_bits;
                                let diagonals: Vec<Diagonal> = (0..half)
                                    .into_par_iter()
                                    .map(|k| {
                                        let mut vals = vec![0u64; half];
                                        let mut all_zero = true;
                                        for (i, v) in vals.iter_mut().enumerate() {
                                            if i >= hint.rows {
                                                continue;
                                            }
                                            let j = (i + k) % half;
                                            if j >= hint.cols {
                                                continue;
                                            }
                                            let limb = (hint.at(i, j) >> shift) & limb_mask;
                                            *v = limb % t;
                                            all_zero &= *v == 0;
                                        }
                                        if all_zero {
                                            return None;
                                        }

                                        let coeffs = branch.encoding.encode(&vals);
                                        let digits = (0..branch.digits)
                                            .map(|d| {
                                                let digit_coeffs: Vec<u64> = coeffs
                                                    .iter()
                                                    .map(|&c| {
                                                        (c >> (d * ctx.gadget_log_b)) & base_mask
                                                    })
                                                    .collect();
                                                let mut p = Poly::from_small_coeffs(
                                                    &digit_coeffs,
                                                    &ctx.moduli,
                                                );
                                                p.to_ntt(&ctx.ntt);
                                                p
                                            })
                                            .collect();
                                        Some(digits)
                                    })
                                    .collect();
                                LimbDb { diagonals }
                            })
                            .collect();
                        ShardDb { limbs }
                    })
                    .collect();
                BranchDb { shards }
            })
            .collect();

        Self { branches }
    }

    /// Evaluate `H·s` homomorphically for every (branch, shard, limb).
    ///
    /// Pure function of the database state and the request; shards and
    /// limbs share one rotation sweep per branch.
    pub fn evaluate(&self, ctx: &LinPirContext, request: &PrepareRequest) -> Result<PrepareResponse> {
        if request.branches.len() != ctx.branches.len() {
            return Err(Error::Encoding("prepare request branch count mismatch".into()));
        }
        if request.rotation_key.rows.len() != ctx.gadget.digits
            || request.rotation_key.gadget != ctx.gadget
        {
            return Err(Error::Encoding("rotation key gadget mismatch".into()));
        }
        for row in &request.rotation_key.rows {
            if row.ring_dim() != ctx.n || row.moduli() != ctx.moduli.as_slice() {
                return Err(Error::Encoding("rotation key ring mismatch".into()));
            }
        }
        for (branch_ctx, branch_req) in ctx.branches.iter().zip(request.branches.iter()) {
            if branch_req.digit_cts.len() != branch_ctx.digits {
                return Err(Error::Encoding("digit ciphertext count mismatch".into()));
            }
            for ct in &branch_req.digit_cts {
                if ct.ring_dim() != ctx.n || ct.moduli() != ctx.moduli.as_slice() {
                    return Err(Error::Encoding("digit ciphertext ring mismatch".into()));
                }
            }
        }

        let mut rotation_key = request.rotation_key.clone();
        rotation_key.to_ntt(&ctx.ntt);

        let branches: Vec<BranchResponse> = self
            .branches
            .par_iter()
            .zip(request.branches.par_iter())
            .map(|(branch_db, branch_req)| {
                // Normalize incoming ciphertexts to coefficient domain.
                let mut ct_rot: Vec<RlweCiphertext> = branch_req
                    .digit_cts
                    .iter()
                    .map(|ct| RlweCiphertext {
                        a: ct.a.from_ntt_new(&ctx.ntt),
                        b: ct.b.from_ntt_new(&ctx.ntt),
                    })
                    .collect();

                let slots = ctx.num_shards * ctx.num_limbs;
                let mut acc: Vec<(Poly, Poly)> = (0..slots)
                    .map(|_| {
                        let mut a = Poly::zero(ctx.n, &ctx.moduli);
                        let mut b = Poly::zero(ctx.n, &ctx.moduli);
                        a.to_ntt(&ctx.ntt);
                        b.to_ntt(&ctx.ntt);
                        (a, b)
                    })
                    .collect();

                for k in 0..ctx.half {
                    let any_diagonal = branch_db.shards.iter().any(|shard| {
                        shard.limbs.iter().any(|limb| limb.diagonals[k].is_some())
                    });

                    if any_diagonal {
                        let cts_ntt: Vec<(Poly, Poly)> = ct_rot
                            .iter()
                            .map(|ct| (ct.a.to_ntt_new(&ctx.ntt), ct.b.to_ntt_new(&ctx.ntt)))
                            .collect();

                        for (sh, shard) in branch_db.shards.iter().enumerate() {
                            for (l, limb) in shard.limbs.iter().enumerate() {
                                if let Some(digits) = &limb.diagonals[k] {
                                    let slot = &mut acc[sh * ctx.num_limbs + l];
                                    for (digit, (ca, cb)) in digits.iter().zip(cts_ntt.iter()) {
                                        slot.0 += &digit.mul_ntt_domain(ca, &ctx.ntt);
                                        slot.1 += &digit.mul_ntt_domain(cb, &ctx.ntt);
                                    }
                                }
                            }
                        }
                    }

                    if k + 1 < ctx.half {
                        for ct in &mut ct_rot {
                            let rotated = automorphism_ciphertext(ct, ROTATION_GENERATOR);
                            *ct = key_switch(&rotated, &rotation_key, &ctx.ntt, &ctx.crt_q);
                        }
                    }
                }

                let shard_limb_cts = acc
                    .into_iter()
                    .map(|(a, b)| RlweCiphertext {
                        a: a.from_ntt_new(&ctx.ntt),
                        b: b.from_ntt_new(&ctx.ntt),
                    })
                    .collect();
                BranchResponse { shard_limb_cts }
            })
            .collect();

        Ok(PrepareResponse { branches })
    }
}
