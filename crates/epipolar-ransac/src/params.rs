use serde::{Deserialize, Serialize};

use crate::error::RansacError;

/// Parameters for RANSAC model estimation.
///
/// Missing fields fall back to their defaults when deserialized.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RansacParams {
    /// Maximum number of RANSAC iterations.
    pub max_iterations: usize,
    /// Largest error, in the units of the problem's error metric, for an inlier.
    pub inlier_tolerance: f64,
    /// Desired probability that at least one sample set is outlier-free.
    pub confidence: f64,
    /// Minimum consensus size for a model to be accepted.
    pub min_consensus_size: usize,
    /// Whether to refit the best model on all of its inliers.
    pub refine_with_inliers: bool,
    /// Optional RNG seed for deterministic runs.
    pub random_seed: Option<u64>,
}

impl Default for RansacParams {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            inlier_tolerance: 1.0,
            confidence: 0.99,
            min_consensus_size: 10,
            refine_with_inliers: true,
            random_seed: Some(0),
        }
    }
}

impl RansacParams {
    /// Check that every value lies in its valid range.
    ///
    /// Invalid values are reported, never clamped.
    pub fn validate(&self) -> Result<(), RansacError> {
        if self.max_iterations == 0 {
            return Err(RansacError::InvalidConfig(
                "max_iterations must be positive".to_string(),
            ));
        }
        if !self.inlier_tolerance.is_finite() || self.inlier_tolerance <= 0.0 {
            return Err(RansacError::InvalidConfig(format!(
                "inlier_tolerance must be finite and positive, got {}",
                self.inlier_tolerance
            )));
        }
        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            return Err(RansacError::InvalidConfig(format!(
                "confidence must lie in (0, 1), got {}",
                self.confidence
            )));
        }
        Ok(())
    }
}
