use crate::error::FitError;
use crate::sampler::UniformSampler;

/// An estimation task that the RANSAC engine can solve.
///
/// A problem owns (or borrows) an immutable list of data elements and knows how to
/// fit a candidate model from a minimal sample and how far a data element lies from
/// a model. The engine is written once against this trait; each geometric model
/// (fundamental matrix, homography, ...) provides its own implementation.
///
/// Problems hold no estimation state: the best model found is returned by the
/// engine as a [`crate::RansacResult`].
pub trait RansacProblem {
    /// A single data element, e.g. a point correspondence.
    type Datum: Clone;

    /// The fitted model, e.g. a 3x3 matrix.
    type Model: Clone;

    /// All data elements, in a stable order.
    fn data(&self) -> &[Self::Datum];

    /// Number of data elements in a minimal sample.
    fn sample_size(&self) -> usize;

    /// Fit a model to `sample`.
    ///
    /// Called with minimal samples during the search and with the whole consensus
    /// set during refinement, so implementations must accept any sample with at
    /// least [`RansacProblem::sample_size`] elements. Degenerate samples return an
    /// error instead of a model.
    fn fit_model(&self, sample: &[Self::Datum]) -> Result<Self::Model, FitError>;

    /// Non-negative distance between `datum` and `model`.
    fn error(&self, model: &Self::Model, datum: &Self::Datum) -> f64;

    /// Whether `datum` is an inlier of `model` under `tolerance`.
    ///
    /// The engine classifies inliers with `error(model, datum) <= tolerance`, which
    /// this method mirrors.
    fn is_good_fit(&self, model: &Self::Model, datum: &Self::Datum, tolerance: f64) -> bool {
        self.error(model, datum) <= tolerance
    }

    /// Draw a new minimal sample and return its data elements.
    fn sample_data(&self, sampler: &mut UniformSampler) -> Vec<Self::Datum> {
        let data = self.data();
        sampler.sample().iter().map(|&i| data[i].clone()).collect()
    }

    /// Data elements not part of the sampler's most recent sample.
    fn unsampled_data(&self, sampler: &UniformSampler) -> Vec<Self::Datum> {
        let data = self.data();
        sampler.unsampled().iter().map(|&i| data[i].clone()).collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use glam::{DVec2, DVec3};

    /// 2D line fitting, used to exercise the engine without any camera geometry.
    ///
    /// The model is `(nx, ny, c)` with a unit normal, so `|n . p + c|` is the
    /// point-to-line distance.
    pub(crate) struct LineProblem {
        pub(crate) points: Vec<DVec2>,
    }

    impl RansacProblem for LineProblem {
        type Datum = DVec2;
        type Model = DVec3;

        fn data(&self) -> &[DVec2] {
            &self.points
        }

        fn sample_size(&self) -> usize {
            2
        }

        fn fit_model(&self, sample: &[DVec2]) -> Result<DVec3, FitError> {
            if sample.len() < 2 {
                return Err(FitError::InsufficientData {
                    required: 2,
                    actual: sample.len(),
                });
            }
            let n = sample.len() as f64;
            let centroid = sample.iter().fold(DVec2::ZERO, |acc, p| acc + *p) / n;
            let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
            for p in sample {
                let d = *p - centroid;
                sxx += d.x * d.x;
                syy += d.y * d.y;
                sxy += d.x * d.y;
            }
            if sxx + syy < 1e-20 {
                return Err(FitError::DegenerateSample);
            }
            let theta = 0.5 * (2.0 * sxy).atan2(sxx - syy);
            let normal = DVec2::new(-theta.sin(), theta.cos());
            Ok(DVec3::new(normal.x, normal.y, -normal.dot(centroid)))
        }

        fn error(&self, model: &DVec3, datum: &DVec2) -> f64 {
            (model.x * datum.x + model.y * datum.y + model.z).abs()
        }
    }

    #[test]
    fn test_sample_and_unsampled_partition_data() {
        let problem = LineProblem {
            points: (0..10).map(|i| DVec2::new(i as f64, 0.0)).collect(),
        };
        let mut sampler = UniformSampler::new(problem.data().len(), problem.sample_size(), Some(5));
        let sample = problem.sample_data(&mut sampler);
        let rest = problem.unsampled_data(&sampler);
        assert_eq!(sample.len(), 2);
        assert_eq!(rest.len(), 8);

        let mut xs: Vec<f64> = sample.iter().chain(rest.iter()).map(|p| p.x).collect();
        xs.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(xs, (0..10).map(|i| i as f64).collect::<Vec<_>>());
    }

    #[test]
    fn test_is_good_fit_matches_error() -> Result<(), FitError> {
        let problem = LineProblem { points: vec![] };
        let model = problem.fit_model(&[DVec2::new(0.0, 0.0), DVec2::new(1.0, 0.0)])?;
        let p = DVec2::new(3.0, 0.5);
        assert!((problem.error(&model, &p) - 0.5).abs() < 1e-12);
        assert!(problem.is_good_fit(&model, &p, 0.5 + 1e-9));
        assert!(!problem.is_good_fit(&model, &p, 0.49));
        Ok(())
    }

    #[test]
    fn test_coincident_points_are_degenerate() {
        let problem = LineProblem { points: vec![] };
        let p = DVec2::new(2.0, 3.0);
        assert_eq!(problem.fit_model(&[p, p]), Err(FitError::DegenerateSample));
    }
}
