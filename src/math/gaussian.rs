//! Discrete Gaussian sampling
//!
//! Provides samplers for discrete Gaussian distributions over Z,
//! used for generating error terms in lattice-based cryptography.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

/// Discrete Gaussian sampler over Z using rejection sampling
#[derive(Clone)]
pub struct GaussianSampler {
    /// Standard deviation σ
    sigma: f64,
    /// Tailcut: reject samples beyond this many standard deviations
    tailcut: i64,
    /// RNG for sampling
    rng: ChaCha20Rng,
}

impl GaussianSampler {
    /// Create a sampler with the given standard deviation, seeded from
    /// system entropy.
    pub fn new(sigma: f64) -> Self {
        Self::seeded(sigma, ChaCha20Rng::from_entropy())
    }

    /// Create a sampler from a variance, as configured in protocol
    /// parameters (σ = sqrt(variance)).
    pub fn from_variance(variance: f64) -> Self {
        Self::new(variance.sqrt())
    }

    /// Create a deterministic sampler from a u64 seed.
    pub fn with_seed(sigma: f64, seed: u64) -> Self {
        Self::seeded(sigma, ChaCha20Rng::seed_from_u64(seed))
    }

    fn seeded(sigma: f64, rng: ChaCha20Rng) -> Self {
        let tailcut = (sigma * 6.0).ceil() as i64;
        Self {
            sigma,
            tailcut,
            rng,
        }
    }

    /// The standard deviation.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// The 6σ tailcut bound: samples never exceed this magnitude.
    pub fn tailcut(&self) -> i64 {
        self.tailcut
    }

    /// The 6σ tailcut bound for a distribution of the given variance,
    /// without constructing a sampler. Used by parameter validation.
    pub fn tailcut_for_variance(variance: f64) -> i64 {
        (variance.sqrt() * 6.0).ceil() as i64
    }

    /// Sample a single value from the discrete Gaussian D_σ.
    /// Returns a signed integer in centered representation.
    pub fn sample(&mut self) -> i64 {
        let sigma_sq_2 = 2.0 * self.sigma * self.sigma;
        let bound = self.tailcut;

        loop {
            // Sample uniformly from [-bound, bound]
            let x = self.rng.gen_range(-bound..=bound);

            // Accept with probability proportional to exp(-x²/(2σ²))
            let x_sq = (x * x) as f64;
            let prob = (-x_sq / sigma_sq_2).exp();

            let u: f64 = self.rng.gen();
            if u < prob {
                return x;
            }
        }
    }

    /// Sample a vector of Gaussian values.
    pub fn sample_vec(&mut self, len: usize) -> Vec<i64> {
        (0..len).map(|_| self.sample()).collect()
    }
}

impl std::fmt::Debug for GaussianSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GaussianSampler")
            .field("sigma", &self.sigma)
            .field("tailcut", &self.tailcut)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIGMA: f64 = 3.2;

    #[test]
    fn test_tailcut_bounds() {
        let mut sampler = GaussianSampler::new(SIGMA);
        let bound = sampler.tailcut();

        for _ in 0..10_000 {
            let s = sampler.sample();
            assert!(s.abs() <= bound, "Sample {} exceeds 6σ bound {}", s, bound);
        }
    }

    #[test]
    fn test_deterministic_seeding() {
        let mut sampler1 = GaussianSampler::with_seed(SIGMA, 12345);
        let mut sampler2 = GaussianSampler::with_seed(SIGMA, 12345);

        for _ in 0..100 {
            assert_eq!(sampler1.sample(), sampler2.sample());
        }
    }

    #[test]
    fn test_from_variance() {
        let sampler = GaussianSampler::from_variance(8.0);
        assert!((sampler.sigma() - 8.0f64.sqrt()).abs() < 1e-12);
        assert_eq!(sampler.tailcut(), GaussianSampler::tailcut_for_variance(8.0));
    }

    #[test]
    fn test_distribution_mean() {
        let mut sampler = GaussianSampler::with_seed(SIGMA, 42);
        let n = 100_000;

        let sum: i64 = (0..n).map(|_| sampler.sample()).sum();
        let mean = sum as f64 / n as f64;

        assert!(mean.abs() < 0.1, "Mean {} is too far from 0", mean);
    }

    #[test]
    fn test_distribution_variance() {
        let mut sampler = GaussianSampler::with_seed(SIGMA, 42);
        let n = 100_000;

        let samples: Vec<i64> = (0..n).map(|_| sampler.sample()).collect();
        let mean: f64 = samples.iter().map(|&x| x as f64).sum::<f64>() / n as f64;
        let variance: f64 = samples
            .iter()
            .map(|&x| {
                let diff = x as f64 - mean;
                diff * diff
            })
            .sum::<f64>()
            / n as f64;

        let expected = SIGMA * SIGMA;
        let relative_error = (variance - expected).abs() / expected;

        assert!(
            relative_error < 0.1,
            "Variance {} differs from expected {} by {:.1}%",
            variance,
            expected,
            relative_error * 100.0
        );
    }

    #[test]
    fn test_distribution_symmetry() {
        let mut sampler = GaussianSampler::with_seed(SIGMA, 7);
        let n = 100_000;

        let mut pos = 0u32;
        let mut neg = 0u32;
        for _ in 0..n {
            let s = sampler.sample();
            if s > 0 {
                pos += 1;
            } else if s < 0 {
                neg += 1;
            }
        }

        let ratio = pos as f64 / neg as f64;
        assert!(
            (ratio - 1.0).abs() < 0.05,
            "Distribution not symmetric: pos={}, neg={}",
            pos,
            neg
        );
    }
}
