use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Draws minimal samples uniformly at random, without replacement.
///
/// The sampler keeps a permutation of the data indices. Each draw runs the first
/// `sample_size` steps of a Fisher-Yates shuffle over it: the leading entries become
/// the sample and the rest is its complement. With a fixed seed the sequence of
/// samples is reproducible.
#[derive(Debug, Clone)]
pub struct UniformSampler {
    rng: StdRng,
    permutation: Vec<usize>,
    sample_size: usize,
}

impl UniformSampler {
    /// Create a sampler over `num_data` indices.
    ///
    /// PRECONDITION: `sample_size <= num_data`.
    pub fn new(num_data: usize, sample_size: usize, seed: Option<u64>) -> Self {
        debug_assert!(sample_size <= num_data);
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            rng,
            permutation: (0..num_data).collect(),
            sample_size: sample_size.min(num_data),
        }
    }

    /// Number of indices per sample.
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// Draw a new sample and return its indices.
    pub fn sample(&mut self) -> &[usize] {
        let n = self.permutation.len();
        for i in 0..self.sample_size {
            let j = self.rng.random_range(i..n);
            self.permutation.swap(i, j);
        }
        &self.permutation[..self.sample_size]
    }

    /// Indices of the most recent sample.
    pub fn sampled(&self) -> &[usize] {
        &self.permutation[..self.sample_size]
    }

    /// Indices not part of the most recent sample.
    pub fn unsampled(&self) -> &[usize] {
        &self.permutation[self.sample_size..]
    }
}
