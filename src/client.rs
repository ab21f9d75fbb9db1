//! Client orchestration.
//!
//! A client session walks Created → (optionally) Prepared → Queried →
//! Recovered. The secret state (`s`, `A·s`, the session RLWE key, and the
//! recovered `w = H·s`) is scoped to one session and never serialized: its
//! secrecy is the privacy guarantee of the query.

use crate::error::{Error, Result};
use crate::linpir::{self, LinPirContext, PrepareSession};
use crate::lwe::{self, LweSecretKey};
use crate::math::GaussianSampler;
use crate::messages::{PrepareRequest, PrepareResponse, Request, Response};
use crate::params::{Parameters, PrngStream};
use crate::server::PublicParams;

/// The reusable online-phase state: the masked products `A·s` paired with
/// the secret that produced them. Named rather than a positional tuple so
/// the pairing can't be silently swapped at a call site.
#[derive(Clone, Debug)]
pub struct LweSecretState {
    /// `A·s` over the LWE modulus, length `db_cols`.
    pub a_times_s: Vec<u64>,
    /// The LWE secret `s`.
    pub secret: LweSecretKey,
}

/// PIR client for one session.
pub struct Client {
    params: Parameters,
    linpir_ctx: LinPirContext,
    /// Expanded public matrix A, `db_cols x lwe_secret_dim` row-major.
    matrix_a: Vec<u64>,
    secret: LweSecretKey,
    lwe_sampler: GaussianSampler,
    rng: PrngStream,
    prepare_session: Option<PrepareSession>,
    pending_index: Option<usize>,
}

impl Client {
    /// Create a client session: validates the parameters, expands A from
    /// the published seed, and samples the LWE secret.
    pub fn create(params: &Parameters, public_params: &PublicParams) -> Result<Self> {
        params.validate()?;

        let matrix_a = lwe::expand_matrix(
            public_params.seed_a,
            params.prng_type,
            params.db_cols,
            params.lwe_secret_dim,
            params.lwe_mask(),
        );

        let mut lwe_sampler = GaussianSampler::from_variance(params.lwe_error_variance);
        let secret = LweSecretKey::generate(params.lwe_secret_dim, &mut lwe_sampler);
        if secret.coeffs().iter().all(|&c| c == 0) {
            return Err(Error::KeyGen("sampled an all-zero LWE secret".into()));
        }

        let seed = lwe::random_seed(&mut rand::thread_rng());
        Ok(Self {
            linpir_ctx: LinPirContext::new(params),
            params: params.clone(),
            matrix_a,
            secret,
            lwe_sampler,
            rng: params.linpir_params.prng_type.stream(seed),
            prepare_session: None,
            pending_index: None,
        })
    }

    /// Compute `A·s` for the session secret. Index-independent, so it can
    /// run before the query index is known; the returned state is reused
    /// by every subsequent online query.
    pub fn compute_a_times_s(&self) -> Result<LweSecretState> {
        let a_times_s = lwe::mat_vec_mul(
            &self.matrix_a,
            self.params.db_cols,
            self.params.lwe_secret_dim,
            &self.secret.to_masked(self.params.lwe_mask()),
            self.params.lwe_mask(),
        );
        Ok(LweSecretState {
            a_times_s,
            secret: self.secret.clone(),
        })
    }

    /// Prepare phase: encrypt `s` under a fresh session RLWE key and
    /// attach the rotation key the evaluation needs. The session key is
    /// retained for decrypting the response.
    pub fn prepare_lin_pir_given_s(&mut self, secret: &LweSecretKey) -> Result<PrepareRequest> {
        let (session, request) =
            linpir::build_prepare_request(&self.linpir_ctx, secret, &mut self.rng)?;
        self.prepare_session = Some(session);
        Ok(request)
    }

    /// Prepare phase: decrypt the server's evaluation into
    /// `w = H·s` (one vector per shard).
    pub fn recover_hs_prepare_phase(&self, response: &PrepareResponse) -> Result<Vec<Vec<u64>>> {
        let session = self
            .prepare_session
            .as_ref()
            .ok_or_else(|| Error::Decryption("no prepare session in progress".into()))?;
        linpir::recover_hint_product(&self.linpir_ctx, session, response)
    }

    /// Build the online query for `index` from precomputed state, without
    /// any LinPIR material (the prepare phase already ran).
    pub fn generate_request_given_as_skip_lin_pir(
        &mut self,
        index: usize,
        state: &LweSecretState,
    ) -> Result<Request> {
        let query = self.masked_query(index, state)?;
        self.pending_index = Some(index);
        Ok(Request {
            query,
            linpir: None,
        })
    }

    /// Direct path: derive `A·s` and the query in one step and embed the
    /// prepare material so the server services both in a single round
    /// trip.
    pub fn generate_request(&mut self, index: usize) -> Result<Request> {
        let state = self.compute_a_times_s()?;
        let query = self.masked_query(index, &state)?;

        let (session, prepare) =
            linpir::build_prepare_request(&self.linpir_ctx, &state.secret, &mut self.rng)?;
        self.prepare_session = Some(session);
        self.pending_index = Some(index);

        Ok(Request {
            query,
            linpir: Some(prepare),
        })
    }

    /// Recover the queried record given `w = H·s` from the prepare phase.
    ///
    /// Computes `D·u − w ≈ Δ·record-symbols + bounded noise` row by row,
    /// rounds each to the nearest plaintext symbol, and decodes the record
    /// bits. Rounding outside the record's valid symbol range fails with
    /// `Error::Decoding`.
    pub fn recover_record_given_hs(
        &self,
        response: &Response,
        w: &[Vec<u64>],
    ) -> Result<Vec<u8>> {
        let index = self
            .pending_index
            .ok_or_else(|| Error::Decoding("no outstanding query".into()))?;

        if response.du.len() != self.params.db_rows {
            return Err(Error::Encoding("response length mismatch".into()));
        }
        let block = self.params.linpir_params.rows_per_block;
        if w.len() != self.params.num_shards() || w.iter().any(|shard| shard.len() != block) {
            return Err(Error::Encoding("hint product shape mismatch".into()));
        }

        let loc = self.params.record_location(index)?;
        let mask = self.params.lwe_mask();
        let record_bits = self.params.db_record_bit_size;
        let cell_bits = self.params.lwe_plaintext_bit_size;

        let mut bytes = vec![0u8; record_bits.div_ceil(8)];
        let mut bit_pos = 0usize;
        for cell_idx in 0..loc.cells {
            let row = loc.row + cell_idx;
            let w_row = w[row / block][row % block];
            let noisy = response.du[row].wrapping_sub(w_row) & mask;
            let symbol = lwe::round_decode(
                noisy,
                self.params.lwe_modulus_bit_size,
                self.params.lwe_plaintext_bit_size,
            );

            let valid_bits = self.params.record_bits_in_cell(cell_idx);
            if valid_bits < cell_bits && symbol >> valid_bits != 0 {
                return Err(Error::Decoding(format!(
                    "symbol {} outside the {}-bit record range",
                    symbol, valid_bits
                )));
            }

            for bit in 0..valid_bits {
                if (symbol >> bit) & 1 == 1 {
                    bytes[bit_pos / 8] |= 1 << (bit_pos % 8);
                }
                bit_pos += 1;
            }
        }

        Ok(bytes)
    }

    /// Direct-path recovery: decrypt the LinPIR exchange embedded in the
    /// response to recompute `H·s`, then recover the record.
    pub fn recover_record(&self, response: &Response) -> Result<Vec<u8>> {
        let prepare_response = response
            .linpir
            .as_ref()
            .ok_or_else(|| Error::Decoding("response carries no LinPIR part".into()))?;
        let w = self.recover_hs_prepare_phase(prepare_response)?;
        self.recover_record_given_hs(response, &w)
    }

    fn masked_query(&mut self, index: usize, state: &LweSecretState) -> Result<Vec<u64>> {
        let loc = self.params.record_location(index)?;
        let mask = self.params.lwe_mask();
        let error = lwe::sample_error_vec(self.params.db_cols, &mut self.lwe_sampler, mask);
        Ok(lwe::masked_query(
            &state.a_times_s,
            &error,
            self.params.lwe_delta(),
            loc.col,
            mask,
        ))
    }
}
