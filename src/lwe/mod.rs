//! LWE vector arithmetic for the SimplePIR online phase.
//!
//! The online sub-protocol works over the power-of-two modulus
//! 2^`lwe_modulus_bit_size` with plain wraparound arithmetic: values are
//! masked u64 words, and products of two in-range values reduce correctly
//! through u64 wrapping because the modulus divides 2^64.

use rand::{Rng, RngCore};

use crate::math::GaussianSampler;
use crate::params::PrngType;

/// LWE secret key: a vector of small signed coefficients sampled from the
/// error distribution. Kept signed so it can be reduced into both the LWE
/// modulus and the LinPIR plaintext moduli.
#[derive(Clone, Debug)]
pub struct LweSecretKey {
    coeffs: Vec<i64>,
}

impl LweSecretKey {
    /// Sample a secret of the given dimension.
    pub fn generate(dim: usize, sampler: &mut GaussianSampler) -> Self {
        Self {
            coeffs: sampler.sample_vec(dim),
        }
    }

    /// Dimension of the secret.
    pub fn dim(&self) -> usize {
        self.coeffs.len()
    }

    /// The signed coefficients.
    pub fn coeffs(&self) -> &[i64] {
        &self.coeffs
    }

    /// The secret reduced modulo the power-of-two LWE modulus.
    /// Two's-complement wrapping is exactly reduction mod 2^k.
    pub fn to_masked(&self, mask: u64) -> Vec<u64> {
        self.coeffs.iter().map(|&s| (s as u64) & mask).collect()
    }
}

/// Expand the public matrix A (`rows x cols`, row-major) from a 32-byte
/// seed. Deterministic for a given seed and PRNG type, so clients and the
/// server derive the same matrix.
pub fn expand_matrix(seed: [u8; 32], prng: PrngType, rows: usize, cols: usize, mask: u64) -> Vec<u64> {
    let mut stream = prng.stream(seed);
    (0..rows * cols).map(|_| stream.next_u64() & mask).collect()
}

/// Matrix-vector product `M·v` over the masked modulus.
///
/// `mat` is `rows x cols` row-major; `v` has length `cols`. u64 wrapping
/// keeps the result exact modulo any power of two dividing 2^64.
pub fn mat_vec_mul(mat: &[u64], rows: usize, cols: usize, v: &[u64], mask: u64) -> Vec<u64> {
    debug_assert_eq!(mat.len(), rows * cols);
    debug_assert_eq!(v.len(), cols);

    (0..rows)
        .map(|r| {
            let row = &mat[r * cols..(r + 1) * cols];
            let mut acc = 0u64;
            for (&m, &x) in row.iter().zip(v.iter()) {
                acc = acc.wrapping_add(m.wrapping_mul(x));
            }
            acc & mask
        })
        .collect()
}

/// Sample an error vector from the Gaussian distribution, reduced into the
/// masked modulus.
pub fn sample_error_vec(len: usize, sampler: &mut GaussianSampler, mask: u64) -> Vec<u64> {
    (0..len)
        .map(|_| (sampler.sample() as u64) & mask)
        .collect()
}

/// Build the masked one-hot query `u = A·s + e + Δ·e_col` from a
/// precomputed `A·s`.
pub fn masked_query(
    a_times_s: &[u64],
    error: &[u64],
    delta: u64,
    col: usize,
    mask: u64,
) -> Vec<u64> {
    debug_assert_eq!(a_times_s.len(), error.len());
    let mut u: Vec<u64> = a_times_s
        .iter()
        .zip(error.iter())
        .map(|(&a, &e)| a.wrapping_add(e) & mask)
        .collect();
    u[col] = u[col].wrapping_add(delta) & mask;
    u
}

/// Round a noisy value `Δ·m + err (mod 2^k)` to the nearest plaintext
/// symbol: `m = ⌊p·val / q⌉ mod p`.
pub fn round_decode(val: u64, modulus_bits: usize, plain_bits: usize) -> u64 {
    let q = 1u128 << modulus_bits;
    let p = 1u128 << plain_bits;
    let rounded = (val as u128 * p + q / 2) / q;
    (rounded % p) as u64
}

/// Draw a fresh 32-byte seed from an entropy source.
pub fn random_seed<R: Rng>(rng: &mut R) -> [u8; 32] {
    let mut seed = [0u8; 32];
    rng.fill_bytes(&mut seed);
    seed
}
