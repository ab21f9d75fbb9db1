//! Protocol parameters for both sub-protocols.
//!
//! A [`Parameters`] value describes the database shape, the LWE side of
//! SimplePIR (online queries) and the RLWE side of LinPIR (the homomorphic
//! prepare phase). It is validated once at construction and treated as
//! immutable afterwards; every other component consumes it read-only.

use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::math::{is_prime, GaussianSampler};

/// Pseudorandom generator selector for seed-expanded public material.
///
/// Both sub-protocols expand 32-byte seeds into public randomness; the
/// selector picks the stream cipher used for the expansion. The LinPIR
/// sub-protocol carries its own selector so the two sides can evolve
/// independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PrngType {
    /// ChaCha with 8 rounds (faster, still cryptographic).
    ChaCha8,
    /// ChaCha with 20 rounds (conservative default).
    #[default]
    ChaCha20,
}

impl PrngType {
    /// Expand a 32-byte seed into a deterministic random stream.
    pub fn stream(self, seed: [u8; 32]) -> PrngStream {
        match self {
            PrngType::ChaCha8 => PrngStream::ChaCha8(rand_chacha::ChaCha8Rng::from_seed(seed)),
            PrngType::ChaCha20 => PrngStream::ChaCha20(rand_chacha::ChaCha20Rng::from_seed(seed)),
        }
    }
}

/// A seeded stream cipher selected by [`PrngType`].
#[derive(Clone, Debug)]
pub enum PrngStream {
    ChaCha8(rand_chacha::ChaCha8Rng),
    ChaCha20(rand_chacha::ChaCha20Rng),
}

impl rand::RngCore for PrngStream {
    fn next_u32(&mut self) -> u32 {
        match self {
            PrngStream::ChaCha8(rng) => rng.next_u32(),
            PrngStream::ChaCha20(rng) => rng.next_u32(),
        }
    }

    fn next_u64(&mut self) -> u64 {
        match self {
            PrngStream::ChaCha8(rng) => rng.next_u64(),
            PrngStream::ChaCha20(rng) => rng.next_u64(),
        }
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        match self {
            PrngStream::ChaCha8(rng) => rng.fill_bytes(dest),
            PrngStream::ChaCha20(rng) => rng.fill_bytes(dest),
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
        match self {
            PrngStream::ChaCha8(rng) => rng.try_fill_bytes(dest),
            PrngStream::ChaCha20(rng) => rng.try_fill_bytes(dest),
        }
    }
}

/// RLWE parameters of the LinPIR sub-protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RlweParameters {
    /// Ring dimension exponent: the ring is Z_Q[X]/(X^n + 1), n = 2^log_n.
    pub log_n: usize,

    /// RNS limbs of the RLWE modulus Q = qs[0] * qs[1] * ...
    /// Each limb must be an NTT-friendly prime: q ≡ 1 (mod 2n).
    pub qs: Vec<u64>,

    /// Plaintext moduli; one homomorphic evaluation branch per entry.
    /// Each t must be an NTT-friendly prime so slot encoding exists, and
    /// the product of all ts bounds the exactly-recoverable dot products.
    pub ts: Vec<u64>,

    /// Gadget decomposition log-bases, aligned with `qs`. All entries must
    /// be equal; the common value is used both for key-switch decomposition
    /// over Q and for plaintext digit decomposition over each t.
    pub gadget_log_bs: Vec<usize>,

    /// RLWE error variance σ².
    pub error_variance: f64,

    /// PRNG selector for the LinPIR side.
    pub prng_type: PrngType,

    /// Hint-matrix rows evaluated per homomorphic block; equals the shard
    /// height of the database.
    pub rows_per_block: usize,
}

impl RlweParameters {
    /// Ring dimension n.
    pub fn n(&self) -> usize {
        1 << self.log_n
    }

    /// Number of slots per rotation orbit (n / 2). Vectors packed for the
    /// homomorphic evaluation live in one orbit.
    pub fn half_slots(&self) -> usize {
        self.n() / 2
    }

    /// The common gadget log-base.
    pub fn gadget_log_b(&self) -> usize {
        self.gadget_log_bs[0]
    }

    /// Total bit length of the composed modulus Q.
    pub fn modulus_bits(&self) -> usize {
        self.qs.iter().map(|&q| 64 - q.leading_zeros() as usize).sum()
    }

    /// Digit count for key-switch decomposition over Q.
    pub fn ks_digits(&self) -> usize {
        self.modulus_bits() / self.gadget_log_b()
    }

    /// Digit count for plaintext decomposition of branch `b`.
    pub fn plaintext_digits(&self, b: usize) -> usize {
        let t_bits = 64 - self.ts[b].leading_zeros() as usize;
        t_bits.div_ceil(self.gadget_log_b())
    }
}

/// Full protocol configuration.
///
/// Fields are public for literal construction (and serde); call
/// [`Parameters::validate`] before use — `Server`, `Client` and `Database`
/// constructors do so and fail with `Error::InvalidParameters` on any
/// inconsistency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    /// Database matrix rows.
    pub db_rows: usize,
    /// Database matrix columns.
    pub db_cols: usize,
    /// Bits per logical record.
    pub db_record_bit_size: usize,

    /// LWE secret dimension.
    pub lwe_secret_dim: usize,
    /// LWE modulus bit size; the modulus is 2^bits (wraparound arithmetic).
    pub lwe_modulus_bit_size: usize,
    /// Bits stored per database cell (the LWE plaintext modulus is
    /// 2^bits).
    pub lwe_plaintext_bit_size: usize,
    /// LWE error variance σ².
    pub lwe_error_variance: f64,

    /// LinPIR sub-protocol parameters.
    pub linpir_params: RlweParameters,

    /// PRNG selector for the SimplePIR side (seeding the public matrix A).
    pub prng_type: PrngType,
}

/// Position of one logical record inside the cell matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLocation {
    /// Column holding the record.
    pub col: usize,
    /// First row of the record.
    pub row: usize,
    /// Number of consecutive cells the record spans.
    pub cells: usize,
}

impl Parameters {
    /// Recommended configuration: 1024 x 1024 cells of 8 bits, 1408-dim
    /// LWE secrets over a 32-bit modulus, and a two-branch LinPIR instance
    /// over a ~96-bit RNS modulus with ~21-bit plaintext moduli.
    pub fn recommended() -> Self {
        Self {
            db_rows: 1024,
            db_cols: 1024,
            db_record_bit_size: 8,
            lwe_secret_dim: 1408,
            lwe_modulus_bit_size: 32,
            lwe_plaintext_bit_size: 8,
            lwe_error_variance: 8.0,
            linpir_params: RlweParameters {
                log_n: 12,
                qs: vec![281474976694273, 281474976636929],
                ts: vec![2056193, 1990657],
                gadget_log_bs: vec![16, 16],
                error_variance: 8.0,
                prng_type: PrngType::ChaCha20,
                rows_per_block: 1024,
            },
            prng_type: PrngType::ChaCha20,
        }
    }

    /// LWE modulus 2^bits.
    pub fn lwe_modulus(&self) -> u64 {
        1u64 << self.lwe_modulus_bit_size
    }

    /// Reduction mask for the LWE modulus.
    pub fn lwe_mask(&self) -> u64 {
        self.lwe_modulus() - 1
    }

    /// LWE plaintext modulus 2^bits.
    pub fn lwe_plain_modulus(&self) -> u64 {
        1u64 << self.lwe_plaintext_bit_size
    }

    /// LWE scaling factor Δ = modulus / plaintext modulus.
    pub fn lwe_delta(&self) -> u64 {
        1u64 << (self.lwe_modulus_bit_size - self.lwe_plaintext_bit_size)
    }

    /// Number of row-block shards.
    pub fn num_shards(&self) -> usize {
        self.db_rows / self.linpir_params.rows_per_block
    }

    /// Bit width of one hint limb. The hint matrix is split into limbs
    /// this wide so each limb/secret dot product is exactly recoverable
    /// through the plaintext CRT.
    pub fn hint_limb_bits(&self) -> usize {
        self.lwe_modulus_bit_size / 2
    }

    /// Number of hint limbs.
    pub fn num_hint_limbs(&self) -> usize {
        self.lwe_modulus_bit_size / self.hint_limb_bits()
    }

    /// Cells spanned by one record. Records narrower than a cell occupy
    /// one cell each; the unused high bits stay zero and give record
    /// recovery a valid-symbol range to check rounding against.
    pub fn cells_per_record(&self) -> usize {
        if self.db_record_bit_size >= self.lwe_plaintext_bit_size {
            self.db_record_bit_size / self.lwe_plaintext_bit_size
        } else {
            1
        }
    }

    /// Bits of a record carried by cell `cell_idx` of the record.
    pub fn record_bits_in_cell(&self, cell_idx: usize) -> usize {
        let cpr = self.cells_per_record();
        debug_assert!(cell_idx < cpr);
        if cpr == 1 {
            self.db_record_bit_size
        } else {
            self.lwe_plaintext_bit_size
        }
    }

    /// Total logical record count.
    pub fn num_records(&self) -> usize {
        self.db_rows * self.db_cols / self.cells_per_record()
    }

    /// Locate record `i` in the cell matrix. Cells are ordered
    /// column-major, so a record always lives inside a single column.
    pub fn record_location(&self, i: usize) -> Result<RecordLocation> {
        let len = self.num_records();
        if i >= len {
            return Err(Error::IndexOutOfRange { index: i, len });
        }
        let cpr = self.cells_per_record();
        let cell = i * cpr;
        Ok(RecordLocation {
            col: cell / self.db_rows,
            row: cell % self.db_rows,
            cells: cpr,
        })
    }

    /// Check internal consistency of all dimensions and moduli.
    pub fn validate(&self) -> Result<()> {
        fn fail(msg: impl Into<String>) -> Result<()> {
            Err(Error::InvalidParameters(msg.into()))
        }

        if self.db_rows == 0 || self.db_cols == 0 {
            return fail("database dimensions must be nonzero");
        }
        if self.lwe_secret_dim == 0 {
            return fail("lwe_secret_dim must be nonzero");
        }
        if self.lwe_modulus_bit_size == 0 || self.lwe_modulus_bit_size > 32 {
            return fail("lwe_modulus_bit_size must be in 1..=32");
        }
        if self.lwe_modulus_bit_size % 2 != 0 {
            return fail("lwe_modulus_bit_size must be even (hint limb split)");
        }
        if self.lwe_plaintext_bit_size == 0
            || self.lwe_plaintext_bit_size >= self.lwe_modulus_bit_size
        {
            return fail("lwe_plaintext_bit_size must be in 1..lwe_modulus_bit_size");
        }
        if self.lwe_error_variance <= 0.0 {
            return fail("lwe_error_variance must be positive");
        }

        if self.db_record_bit_size == 0 {
            return fail("db_record_bit_size must be nonzero");
        }
        if self.db_record_bit_size >= self.lwe_plaintext_bit_size {
            if self.db_record_bit_size % self.lwe_plaintext_bit_size != 0 {
                return fail("db_record_bit_size must be a multiple of lwe_plaintext_bit_size");
            }
            if self.db_rows % self.cells_per_record() != 0 {
                return fail("db_rows must be divisible by the cells-per-record count");
            }
        }

        let rp = &self.linpir_params;
        if rp.log_n < 2 || rp.log_n > 16 {
            return fail("log_n must be in 2..=16");
        }
        let n = rp.n();
        if rp.rows_per_block == 0 || self.db_rows % rp.rows_per_block != 0 {
            return fail("db_rows must be divisible by rows_per_block");
        }
        if rp.rows_per_block > rp.half_slots() {
            return fail("rows_per_block exceeds the slot capacity n/2");
        }
        if self.lwe_secret_dim > rp.half_slots() {
            return fail("lwe_secret_dim exceeds the slot capacity n/2");
        }
        if rp.error_variance <= 0.0 {
            return fail("rlwe error_variance must be positive");
        }

        if rp.qs.is_empty() || rp.ts.is_empty() {
            return fail("qs and ts must be non-empty");
        }
        if rp.gadget_log_bs.len() != rp.qs.len() {
            return fail("gadget_log_bs must be aligned with qs");
        }
        let log_b = rp.gadget_log_bs[0];
        if log_b == 0 || log_b > 32 {
            return fail("gadget log base must be in 1..=32");
        }
        if rp.gadget_log_bs.iter().any(|&b| b != log_b) {
            return fail("all gadget_log_bs entries must be equal");
        }

        for (i, &q) in rp.qs.iter().enumerate() {
            if !is_prime(q) {
                return fail(format!("rlwe modulus {} is not prime", q));
            }
            if q % (2 * n as u64) != 1 {
                return fail(format!("rlwe modulus {} is not ≡ 1 (mod 2n)", q));
            }
            let q_bits = 64 - q.leading_zeros() as usize;
            if q_bits % log_b != 0 {
                return fail(format!(
                    "gadget log base {} does not evenly divide the {}-bit modulus {}",
                    log_b, q_bits, q
                ));
            }
            if rp.qs[..i].contains(&q) {
                return fail("rlwe moduli must be distinct");
            }
        }
        let max_t_bits = rp
            .ts
            .iter()
            .map(|&t| 64 - t.leading_zeros() as usize)
            .max()
            .unwrap_or(0);
        if rp.modulus_bits() + max_t_bits > 124 {
            return fail("composed rlwe modulus too wide for rounded decoding");
        }

        let min_q = *rp.qs.iter().min().unwrap();
        for (i, &t) in rp.ts.iter().enumerate() {
            if !is_prime(t) {
                return fail(format!("plaintext modulus {} is not prime", t));
            }
            if t % (2 * n as u64) != 1 {
                return fail(format!("plaintext modulus {} is not ≡ 1 (mod 2n)", t));
            }
            if t >= min_q {
                return fail("plaintext moduli must be smaller than every rlwe modulus");
            }
            if rp.ts[..i].contains(&t) {
                return fail("plaintext moduli must be distinct");
            }
        }

        // CRT recovery margin: every limb/secret dot product must be
        // exactly recoverable through the plaintext CRT, including the
        // worst-case 6σ secret coefficients.
        let tailcut = GaussianSampler::tailcut_for_variance(self.lwe_error_variance) as u128;
        let bound = 2u128
            * self.lwe_secret_dim as u128
            * (1u128 << self.hint_limb_bits())
            * tailcut;
        let t_prod: u128 = rp.ts.iter().map(|&t| t as u128).product();
        if bound >= t_prod {
            return fail(format!(
                "plaintext CRT modulus {} cannot bound hint limb products ({})",
                t_prod, bound
            ));
        }

        Ok(())
    }
}
