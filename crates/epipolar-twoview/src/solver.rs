use epipolar_ransac::{
    CorrespondenceSet, ImagePairMatches, Ransac, RansacError, RansacParams, RansacResult,
};
use glam::DMat3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::fundamental::{EightPointParams, FundamentalProblem, FUNDAMENTAL_SAMPLE_SIZE};

/// Errors returned by the fundamental matrix solver.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SolverError {
    /// Not a single image pair yielded a fundamental matrix.
    #[error("Unable to compute a fundamental matrix for any of the {pairs} image pairs")]
    NoFundamentalMatrix {
        /// Number of image pairs processed.
        pairs: usize,
    },

    /// The RANSAC configuration is invalid.
    #[error(transparent)]
    Ransac(#[from] RansacError),
}

/// Configuration of the [`FundamentalMatrixSolver`], applied to every image pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FundamentalSolverConfig {
    /// Correspondences drawn per RANSAC candidate (at least 8).
    pub sample_size: usize,
    /// RANSAC settings. The tolerance is a symmetric epipolar distance in pixels.
    pub ransac: RansacParams,
    /// Options of the 8-point fit.
    pub eight_point: EightPointParams,
    /// Process image pairs on the rayon thread pool.
    pub parallel: bool,
}

impl Default for FundamentalSolverConfig {
    fn default() -> Self {
        Self {
            sample_size: FUNDAMENTAL_SAMPLE_SIZE,
            ransac: RansacParams::default(),
            eight_point: EightPointParams::default(),
            parallel: false,
        }
    }
}

impl FundamentalSolverConfig {
    /// Check the configuration, including the RANSAC parameters.
    pub fn validate(&self) -> Result<(), RansacError> {
        if self.sample_size < FUNDAMENTAL_SAMPLE_SIZE {
            return Err(RansacError::InvalidConfig(format!(
                "sample_size must be at least {FUNDAMENTAL_SAMPLE_SIZE}, got {}",
                self.sample_size
            )));
        }
        self.eight_point.validate()?;
        self.ransac.validate()
    }
}

/// Estimates one fundamental matrix per matched image pair.
///
/// Pairs are accumulated with [`FundamentalMatrixSolver::add_matched_image_pair`]
/// and processed in insertion order. Each pair gets its own
/// [`FundamentalProblem`] and, when the configuration carries a seed, its own
/// seed `random_seed + k` for the `k`-th pair, so the output does not depend on
/// whether pairs run sequentially or in parallel.
#[derive(Clone, Debug)]
pub struct FundamentalMatrixSolver {
    config: FundamentalSolverConfig,
    ransac: Ransac,
    pairs: Vec<ImagePairMatches>,
}

impl FundamentalMatrixSolver {
    /// Create a solver, rejecting invalid configurations.
    pub fn new(config: FundamentalSolverConfig) -> Result<Self, SolverError> {
        config.validate()?;
        let ransac = Ransac::new(config.ransac)?;
        Ok(Self {
            config,
            ransac,
            pairs: Vec::new(),
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &FundamentalSolverConfig {
        &self.config
    }

    /// Replace the configuration. On error the previous one stays active.
    pub fn set_config(&mut self, config: FundamentalSolverConfig) -> Result<(), SolverError> {
        config.validate()?;
        self.ransac = Ransac::new(config.ransac)?;
        self.config = config;
        Ok(())
    }

    /// Append the matches of one image pair.
    pub fn add_matched_image_pair(&mut self, pair: ImagePairMatches) {
        self.pairs.push(pair);
    }

    /// Append the matches of several image pairs.
    pub fn add_matched_image_pairs<I>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = ImagePairMatches>,
    {
        self.pairs.extend(pairs);
    }

    /// Number of image pairs added so far.
    pub fn num_pairs(&self) -> usize {
        self.pairs.len()
    }

    /// The image pairs added so far, in insertion order.
    pub fn pairs(&self) -> &[ImagePairMatches] {
        &self.pairs
    }

    /// Estimate the fundamental matrix of a single correspondence set.
    ///
    /// Uses the configured seed. The returned matrix maps points of the first image
    /// to epipolar lines of the second (`x2^T F x1 = 0`).
    pub fn compute_fundamental_matrix(
        &self,
        matches: &CorrespondenceSet,
    ) -> Result<RansacResult<DMat3>, RansacError> {
        self.estimate(matches, self.config.ransac.random_seed)
    }

    /// Run every image pair and return each outcome, in insertion order.
    pub fn compute_pair_results(&self) -> Vec<Result<RansacResult<DMat3>, RansacError>> {
        let seed = self.config.ransac.random_seed;
        let run = |(k, pair): (usize, &ImagePairMatches)| {
            let pair_seed = seed.map(|s| s.wrapping_add(k as u64));
            self.estimate(&pair.matches, pair_seed)
        };

        if self.config.parallel {
            self.pairs.par_iter().enumerate().map(run).collect()
        } else {
            self.pairs.iter().enumerate().map(run).collect()
        }
    }

    /// Compute one fundamental matrix per image pair.
    ///
    /// Pairs that fail are logged and skipped, so the output may be shorter than
    /// the number of pairs. Fails only when no pair succeeded, including when no
    /// pair was added.
    pub fn compute_fundamental_matrices(&self) -> Result<Vec<DMat3>, SolverError> {
        let results = self.compute_pair_results();

        let mut matrices = Vec::with_capacity(results.len());
        for (pair, result) in self.pairs.iter().zip(results) {
            match result {
                Ok(res) => matrices.push(res.model),
                Err(e) => log::warn!(
                    "Failed to compute fundamental matrix for image pair ({}, {}): {e}",
                    pair.image1_index,
                    pair.image2_index
                ),
            }
        }

        log::info!(
            "Computed {} fundamental matrices from {} image pairs",
            matrices.len(),
            self.pairs.len()
        );

        if matrices.is_empty() {
            return Err(SolverError::NoFundamentalMatrix {
                pairs: self.pairs.len(),
            });
        }
        Ok(matrices)
    }

    fn estimate(
        &self,
        matches: &CorrespondenceSet,
        seed: Option<u64>,
    ) -> Result<RansacResult<DMat3>, RansacError> {
        let problem =
            FundamentalProblem::with_sample_size(matches.as_slice(), self.config.sample_size)?
                .with_params(self.config.eight_point);
        self.ransac.run_with_seed(&problem, seed)
    }
}
