use epipolar_pose::Pose;
use epipolar_ransac::{FitError, RansacError, RansacProblem};
use faer::Mat;
use glam::{DMat3, DVec2, DVec3};

use crate::essential::from_faer;
use crate::fundamental::{mat3_from_rows, normalize_points, to_faer};

/// Minimal number of observations for the linear camera-matrix fit.
pub const PNP_SAMPLE_SIZE: usize = 6;

const DEGENERACY_RATIO: f64 = 1e-9;

/// A known 3D point and the pixel where it is observed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointObservation {
    /// Observed position in the image, in pixels.
    pub pixel: DVec2,
    /// Position of the point in the world frame.
    pub point: DVec3,
}

impl PointObservation {
    /// Observation of `point` at `pixel`.
    pub fn new(pixel: DVec2, point: DVec3) -> Self {
        Self { pixel, point }
    }

    fn is_finite(&self) -> bool {
        self.pixel.is_finite() && self.point.is_finite()
    }
}

// centroid at the origin, mean distance sqrt(3)
fn normalize_points_3d(points: &[DVec3]) -> Option<(Vec<DVec3>, f64, DVec3)> {
    let n = points.len() as f64;
    let centroid = points.iter().fold(DVec3::ZERO, |acc, p| acc + *p) / n;
    let mean_dist = points.iter().map(|p| (*p - centroid).length()).sum::<f64>() / n;
    if !mean_dist.is_finite() || mean_dist <= f64::EPSILON * centroid.length().max(1.0) {
        return None;
    }
    let scale = 3f64.sqrt() / mean_dist;
    let normalized = points.iter().map(|p| (*p - centroid) * scale).collect();
    Some((normalized, scale, centroid))
}

/// Estimate the world-to-camera pose from 2D-3D observations with the normalized
/// direct linear transform.
///
/// The 3x4 camera matrix `P ~ [R | t]` is solved in camera coordinates
/// (`K^-1 * pixel`), then its left 3x3 block is projected onto the closest
/// rotation and the translation is rescaled accordingly. The sign of `P` is fixed
/// so that the rotation is proper, which places the points in front of the camera.
///
/// Any number of observations `>= 6` is accepted; more gives the least-squares
/// camera matrix.
///
/// # Errors
///
/// * [`FitError::InsufficientData`] with fewer than six observations.
/// * [`FitError::NonFinite`] for a non-finite input or solution, or a singular `K`.
/// * [`FitError::DegenerateSample`] for coplanar or coincident 3D points and for
///   coincident image points.
pub fn pnp_dlt(observations: &[PointObservation], k: &DMat3) -> Result<Pose, FitError> {
    if observations.len() < PNP_SAMPLE_SIZE {
        return Err(FitError::InsufficientData {
            required: PNP_SAMPLE_SIZE,
            actual: observations.len(),
        });
    }
    let k_inv = k.inverse();
    if !k_inv.is_finite() || observations.iter().any(|o| !o.is_finite()) {
        return Err(FitError::NonFinite);
    }

    let bearings: Vec<DVec2> = observations
        .iter()
        .map(|o| {
            let b = k_inv * o.pixel.extend(1.0);
            DVec2::new(b.x / b.z, b.y / b.z)
        })
        .collect();
    let points: Vec<DVec3> = observations.iter().map(|o| o.point).collect();

    let (xn, t2) = normalize_points(&bearings).ok_or(FitError::DegenerateSample)?;
    let (pn, scale, centroid) =
        normalize_points_3d(&points).ok_or(FitError::DegenerateSample)?;

    // two rows per observation, padded to twelve rows for the thin SVD
    let rows = (2 * xn.len()).max(12);
    let mut a = Mat::<f64>::zeros(rows, 12);
    for (i, (x, p)) in xn.iter().zip(pn.iter()).enumerate() {
        let ph = [p.x, p.y, p.z, 1.0];
        for (j, &c) in ph.iter().enumerate() {
            a[(2 * i, j)] = c;
            a[(2 * i, 8 + j)] = -x.x * c;
            a[(2 * i + 1, 4 + j)] = c;
            a[(2 * i + 1, 8 + j)] = -x.y * c;
        }
    }

    let svd = a.thin_svd();
    let s = svd.s_diagonal();
    if s[0] <= 0.0 || s[10] < DEGENERACY_RATIO * s[0] {
        return Err(FitError::DegenerateSample);
    }

    let v = svd.v().col(11);
    let m_n = mat3_from_rows([
        [v[0], v[1], v[2]],
        [v[4], v[5], v[6]],
        [v[8], v[9], v[10]],
    ]);
    let p_n = DVec3::new(v[3], v[7], v[11]);

    // P = T2^-1 * Pn * U with U = [[s I, -s c], [0, 1]]
    let t2_inv = t2.inverse();
    let mut m = t2_inv * m_n * scale;
    let mut p4 = t2_inv * (p_n - m_n * (centroid * scale));
    if m.determinant() < 0.0 {
        m = -m;
        p4 = -p4;
    }

    let svd = to_faer(&m).svd();
    let u = from_faer(svd.u());
    let vt = from_faer(svd.v()).transpose();
    let sv = svd.s_diagonal();
    let lambda = (sv[0] + sv[1] + sv[2]) / 3.0;
    let rotation = u * vt;
    if !lambda.is_finite() || lambda <= 0.0 || rotation.determinant() <= 0.0 {
        return Err(FitError::DegenerateSample);
    }

    let translation = p4 / lambda;
    if !rotation.is_finite() || !translation.is_finite() {
        return Err(FitError::NonFinite);
    }
    Ok(Pose::new(rotation, translation))
}

/// Squared reprojection error `|| K * project(pose, X) - x ||^2`, in pixels squared.
///
/// Points at or behind the camera plane get `f64::INFINITY`, so they are never
/// counted as inliers.
pub fn reprojection_error(pose: &Pose, k: &DMat3, observation: &PointObservation) -> f64 {
    let p = pose.transform_point(observation.point);
    if p.z <= 0.0 {
        return f64::INFINITY;
    }
    let uv = *k * (p / p.z);
    let d = (DVec2::new(uv.x / uv.z, uv.y / uv.z) - observation.pixel).length_squared();
    if d.is_nan() {
        f64::INFINITY
    } else {
        d
    }
}

/// Camera pose estimation from observations of known 3D points.
///
/// Candidates are fitted with [`pnp_dlt`] and scored with the
/// [`reprojection_error`], so the inlier tolerance is in squared pixels.
#[derive(Clone, Debug)]
pub struct PnpProblem<'a> {
    data: &'a [PointObservation],
    k: DMat3,
}

impl<'a> PnpProblem<'a> {
    /// Problem for a camera with intrinsic matrix `k`.
    ///
    /// Returns [`RansacError::InvalidConfig`] when `k` is not invertible.
    pub fn new(data: &'a [PointObservation], k: DMat3) -> Result<Self, RansacError> {
        let det = k.determinant();
        if !det.is_finite() || det == 0.0 {
            return Err(RansacError::InvalidConfig(
                "intrinsic matrix must be invertible".to_string(),
            ));
        }
        Ok(Self { data, k })
    }

    /// The intrinsic matrix.
    pub fn intrinsics(&self) -> &DMat3 {
        &self.k
    }
}

impl RansacProblem for PnpProblem<'_> {
    type Datum = PointObservation;
    type Model = Pose;

    fn data(&self) -> &[PointObservation] {
        self.data
    }

    fn sample_size(&self) -> usize {
        PNP_SAMPLE_SIZE
    }

    fn fit_model(&self, sample: &[PointObservation]) -> Result<Pose, FitError> {
        pnp_dlt(sample, &self.k)
    }

    fn error(&self, model: &Pose, datum: &PointObservation) -> f64 {
        reprojection_error(model, &self.k, datum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use epipolar_ransac::{Ransac, RansacParams};
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn intrinsics() -> DMat3 {
        mat3_from_rows([[800.0, 0.0, 320.0], [0.0, 780.0, 240.0], [0.0, 0.0, 1.0]])
    }

    fn true_pose() -> Pose {
        Pose::from_axis_angle(DVec3::new(0.1, -0.25, 0.05), DVec3::new(0.3, -0.2, 4.0))
    }

    // observations of random points in front of the camera, followed by outliers
    // that pair a random point with a random pixel
    fn observations(num_inliers: usize, num_outliers: usize, seed: u64) -> Vec<PointObservation> {
        let mut rng = StdRng::seed_from_u64(seed);
        let pose = true_pose();
        let k = intrinsics();
        let random_point = |rng: &mut StdRng| {
            DVec3::new(
                rng.random_range(-1.5..1.5),
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
            )
        };

        let mut data = Vec::with_capacity(num_inliers + num_outliers);
        while data.len() < num_inliers {
            let point = random_point(&mut rng);
            let Some(n) = pose.project(point) else {
                continue;
            };
            let uv = k * n.extend(1.0);
            data.push(PointObservation::new(DVec2::new(uv.x, uv.y), point));
        }
        for _ in 0..num_outliers {
            let point = random_point(&mut rng);
            let pixel = DVec2::new(rng.random_range(0.0..640.0), rng.random_range(0.0..480.0));
            data.push(PointObservation::new(pixel, point));
        }
        data
    }

    #[test]
    fn test_pnp_dlt_exact() -> Result<(), FitError> {
        let data = observations(6, 0, 1);
        let pose = pnp_dlt(&data, &intrinsics())?;
        assert!(pose.is_approx_eps(&true_pose(), 1e-6));
        for o in &data {
            assert!(reprojection_error(&pose, &intrinsics(), o) < 1e-8);
        }
        Ok(())
    }

    #[test]
    fn test_pnp_dlt_overdetermined() -> Result<(), FitError> {
        let data = observations(40, 0, 2);
        let pose = pnp_dlt(&data, &intrinsics())?;
        assert!(pose.is_approx_eps(&true_pose(), 1e-8));
        assert!((pose.rotation().determinant() - 1.0).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_pnp_dlt_degenerate() {
        let k = intrinsics();
        let data = observations(10, 0, 3);
        assert_eq!(
            pnp_dlt(&data[..5], &k),
            Err(FitError::InsufficientData {
                required: 6,
                actual: 5
            })
        );

        // all points on the plane z = 0
        let pose = true_pose();
        let planar: Vec<PointObservation> = (0..8)
            .map(|i| {
                let (col, row) = ((i % 4) as f64, (i / 4) as f64);
                let point = DVec3::new(0.5 * col - 0.7, 0.6 * row - 0.3, 0.0);
                let uv = k * pose.project(point).unwrap_or_default().extend(1.0);
                PointObservation::new(DVec2::new(uv.x, uv.y), point)
            })
            .collect();
        assert_eq!(pnp_dlt(&planar, &k), Err(FitError::DegenerateSample));

        let mut bad = data.clone();
        bad[2].point.y = f64::INFINITY;
        assert_eq!(pnp_dlt(&bad, &k), Err(FitError::NonFinite));
    }

    #[test]
    fn test_reprojection_error() {
        let k = intrinsics();
        let pose = Pose::identity();
        let o = PointObservation::new(DVec2::new(323.0, 236.0), DVec3::new(0.0, 0.0, 2.0));
        assert!((reprojection_error(&pose, &k, &o) - 25.0).abs() < 1e-9);

        // behind the camera and on the camera plane
        let behind = PointObservation::new(DVec2::new(320.0, 240.0), DVec3::new(0.0, 0.0, -2.0));
        assert_eq!(reprojection_error(&pose, &k, &behind), f64::INFINITY);
        let plane = PointObservation::new(DVec2::new(320.0, 240.0), DVec3::new(1.0, 0.0, 0.0));
        assert_eq!(reprojection_error(&pose, &k, &plane), f64::INFINITY);
    }

    #[test]
    fn test_singular_intrinsics_rejected() {
        let data = observations(6, 0, 4);
        assert!(matches!(
            PnpProblem::new(&data, DMat3::ZERO),
            Err(RansacError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_ransac_pnp_with_outliers() -> Result<(), Box<dyn std::error::Error>> {
        let data = observations(60, 25, 42);
        let problem = PnpProblem::new(&data, intrinsics())?;
        let ransac = Ransac::new(RansacParams {
            max_iterations: 2000,
            inlier_tolerance: 1e-2,
            confidence: 0.999,
            random_seed: Some(7),
            ..Default::default()
        })?;
        let res = ransac.run(&problem)?;

        assert!(res.inliers[..60].iter().all(|&inlier| inlier));
        assert!(res.inlier_count >= 60);
        assert!(res.refined);
        assert!(res.model.is_approx_eps(&true_pose(), 1e-6));

        // same seed, same answer
        assert_eq!(ransac.run(&problem)?, res);
        Ok(())
    }
}
