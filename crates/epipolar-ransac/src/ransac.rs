use crate::error::RansacError;
use crate::params::RansacParams;
use crate::problem::RansacProblem;
use crate::sampler::UniformSampler;

/// Result of a RANSAC model fit.
#[derive(Clone, Debug, PartialEq)]
pub struct RansacResult<M> {
    /// Estimated model.
    pub model: M,
    /// Per-element inlier mask, in data order.
    pub inliers: Vec<bool>,
    /// Total inlier count.
    pub inlier_count: usize,
    /// Mean error over the inliers (lower is better).
    pub mean_error: f64,
    /// Number of iterations run, degenerate ones included.
    pub iterations: usize,
    /// Whether the model was refit on the consensus set.
    pub refined: bool,
}

impl<M> RansacResult<M> {
    /// Indices of the inlier data elements.
    pub fn inlier_indices(&self) -> Vec<usize> {
        self.inliers
            .iter()
            .enumerate()
            .filter_map(|(i, &inlier)| inlier.then_some(i))
            .collect()
    }

    /// Fraction of the data classified as inliers.
    pub fn inlier_ratio(&self) -> f64 {
        if self.inliers.is_empty() {
            return 0.0;
        }
        self.inlier_count as f64 / self.inliers.len() as f64
    }
}

/// Number of iterations needed to draw, with probability `confidence`, at least one
/// minimal sample made only of inliers.
///
/// `N = ceil(log(1 - confidence) / log(1 - w^s))` with `w` the inlier ratio and `s`
/// the sample size, capped at `max_iterations`. A ratio of 1 needs a single
/// iteration; a ratio so small that `w^s` underflows needs `max_iterations`.
///
/// Example:
///
/// ```
/// use epipolar_ransac::adaptive_iterations;
///
/// assert_eq!(adaptive_iterations(0.99, 0.5, 2, 1000), 17);
/// assert_eq!(adaptive_iterations(0.99, 1.0, 8, 1000), 1);
/// ```
pub fn adaptive_iterations(
    confidence: f64,
    inlier_ratio: f64,
    sample_size: usize,
    max_iterations: usize,
) -> usize {
    if inlier_ratio >= 1.0 {
        return max_iterations.min(1);
    }
    if inlier_ratio <= 0.0 {
        return max_iterations;
    }

    let w_s = inlier_ratio.powi(sample_size as i32);
    let log_denom = (-w_s).ln_1p();
    if log_denom.is_nan() || log_denom >= 0.0 {
        return max_iterations;
    }

    let n = ((1.0 - confidence).ln() / log_denom).ceil();
    if !n.is_finite() || n >= max_iterations as f64 {
        return max_iterations;
    }
    (n as usize).max(1)
}

struct Consensus {
    inliers: Vec<bool>,
    count: usize,
    error_sum: f64,
}

impl Consensus {
    fn mean_error(&self) -> f64 {
        if self.count == 0 {
            return f64::INFINITY;
        }
        self.error_sum / self.count as f64
    }

    // larger consensus wins; equal consensus falls back to the lower mean error
    fn improves_on(&self, other: &Consensus) -> bool {
        self.count > other.count
            || (self.count == other.count && self.mean_error() < other.mean_error())
    }
}

fn evaluate<P: RansacProblem>(problem: &P, model: &P::Model, tolerance: f64) -> Consensus {
    let data = problem.data();
    let mut inliers = vec![false; data.len()];
    let mut count = 0usize;
    let mut error_sum = 0.0f64;
    for (i, datum) in data.iter().enumerate() {
        let error = problem.error(model, datum);
        if error <= tolerance {
            inliers[i] = true;
            count += 1;
            error_sum += error;
        }
    }
    Consensus {
        inliers,
        count,
        error_sum,
    }
}

/// Generic RANSAC estimator.
///
/// The engine repeatedly draws minimal samples from a [`RansacProblem`], fits a
/// candidate model to each, scores it against every data element and keeps the
/// model with the largest consensus set. The iteration budget shrinks as better
/// models are found (see [`adaptive_iterations`]).
///
/// The engine holds only its parameters, so a single instance can be shared across
/// threads and reused for any number of problems.
#[derive(Clone, Debug)]
pub struct Ransac {
    params: RansacParams,
}

impl Ransac {
    /// Create an engine, rejecting invalid parameters.
    pub fn new(params: RansacParams) -> Result<Self, RansacError> {
        params.validate()?;
        Ok(Self { params })
    }

    /// The engine parameters.
    pub fn params(&self) -> &RansacParams {
        &self.params
    }

    /// Run RANSAC on `problem` using the configured random seed.
    pub fn run<P: RansacProblem>(&self, problem: &P) -> Result<RansacResult<P::Model>, RansacError> {
        self.run_with_seed(problem, self.params.random_seed)
    }

    /// Run RANSAC on `problem` sampling with `seed` (`None` draws OS entropy).
    ///
    /// Returns the model with the largest consensus set, or an error when no
    /// candidate reached `min_consensus_size`.
    pub fn run_with_seed<P: RansacProblem>(
        &self,
        problem: &P,
        seed: Option<u64>,
    ) -> Result<RansacResult<P::Model>, RansacError> {
        let data = problem.data();
        let num_data = data.len();
        let sample_size = problem.sample_size();
        if sample_size == 0 {
            return Err(RansacError::InvalidConfig(
                "sample size must be positive".to_string(),
            ));
        }
        if sample_size > num_data {
            return Err(RansacError::InsufficientData {
                required: sample_size,
                actual: num_data,
            });
        }
        let params = &self.params;
        if params.min_consensus_size > num_data {
            return Err(RansacError::InsufficientData {
                required: params.min_consensus_size,
                actual: num_data,
            });
        }

        let mut sampler = UniformSampler::new(num_data, sample_size, seed);

        let mut best: Option<(P::Model, Consensus)> = None;
        let mut required_iterations = params.max_iterations;
        let mut iterations = 0usize;
        let mut degenerate = 0usize;

        while iterations < required_iterations {
            iterations += 1;

            let sample = problem.sample_data(&mut sampler);
            let model = match problem.fit_model(&sample) {
                Ok(model) => model,
                Err(e) => {
                    log::trace!("RANSAC iteration {iterations}: skipped ({e})");
                    degenerate += 1;
                    continue;
                }
            };

            let consensus = evaluate(problem, &model, params.inlier_tolerance);
            if consensus.count == 0 {
                continue;
            }

            let improves = match &best {
                Some((_, current)) => consensus.improves_on(current),
                None => true,
            };
            if !improves {
                continue;
            }

            let inlier_ratio = consensus.count as f64 / num_data as f64;
            required_iterations = adaptive_iterations(
                params.confidence,
                inlier_ratio,
                sample_size,
                params.max_iterations,
            );
            log::debug!(
                "RANSAC iteration {iterations}: consensus {}/{num_data}, mean error {:.3e}, budget {required_iterations}",
                consensus.count,
                consensus.mean_error(),
            );
            best = Some((model, consensus));
        }

        let (mut model, mut consensus) = match best {
            Some(best) if best.1.count >= params.min_consensus_size => best,
            Some((_, consensus)) => {
                log::debug!(
                    "RANSAC failed: best consensus {} < {} after {iterations} iterations",
                    consensus.count,
                    params.min_consensus_size
                );
                return Err(RansacError::NoConsensus {
                    best: consensus.count,
                    required: params.min_consensus_size,
                    iterations,
                });
            }
            None if degenerate == iterations => {
                log::debug!("RANSAC failed: all {iterations} samples were degenerate");
                return Err(RansacError::AllSamplesDegenerate { iterations });
            }
            None => {
                log::debug!("RANSAC failed: no candidate had any inlier in {iterations} iterations");
                return Err(RansacError::NoConsensus {
                    best: 0,
                    required: params.min_consensus_size,
                    iterations,
                });
            }
        };

        let mut refined = false;
        if params.refine_with_inliers {
            let inlier_data: Vec<P::Datum> = data
                .iter()
                .zip(consensus.inliers.iter())
                .filter(|(_, &inlier)| inlier)
                .map(|(datum, _)| datum.clone())
                .collect();

            match problem.fit_model(&inlier_data) {
                Ok(refit) => {
                    let refit_consensus = evaluate(problem, &refit, params.inlier_tolerance);
                    if refit_consensus.count >= consensus.count {
                        log::debug!(
                            "RANSAC refinement: consensus {} -> {}",
                            consensus.count,
                            refit_consensus.count
                        );
                        model = refit;
                        consensus = refit_consensus;
                        refined = true;
                    } else {
                        log::debug!(
                            "RANSAC refinement discarded: consensus dropped {} -> {}",
                            consensus.count,
                            refit_consensus.count
                        );
                    }
                }
                Err(e) => log::debug!("RANSAC refinement failed: {e}"),
            }
        }

        log::debug!(
            "RANSAC finished after {iterations} iterations ({degenerate} degenerate): {}/{num_data} inliers",
            consensus.count
        );

        let mean_error = consensus.mean_error();
        Ok(RansacResult {
            model,
            inliers: consensus.inliers,
            inlier_count: consensus.count,
            mean_error,
            iterations,
            refined,
        })
    }
}
