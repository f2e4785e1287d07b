//! Synthetic two-view scenes for tests.

use epipolar_pose::{skew, Pose};
use epipolar_ransac::Correspondence;
use glam::{DMat3, DVec2, DVec3};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::fundamental::{mat3_from_rows, normalize_fundamental};

/// Random points seen by two pinhole cameras sharing the intrinsics `k`.
///
/// `matches` holds the projections of `points` first, then random outlier pairs.
pub(crate) struct TwoViewScene {
    pub(crate) k: DMat3,
    /// Camera 2 from camera 1.
    pub(crate) pose: Pose,
    pub(crate) points: Vec<DVec3>,
    pub(crate) matches: Vec<Correspondence>,
    /// Ground-truth fundamental matrix, normalized.
    pub(crate) f: DMat3,
}

impl TwoViewScene {
    pub(crate) fn new(num_inliers: usize, num_outliers: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let k = mat3_from_rows([[800.0, 0.0, 320.0], [0.0, 800.0, 240.0], [0.0, 0.0, 1.0]]);
        let pose = Pose::from_axis_angle(
            DVec3::new(0.05, -0.12, 0.03),
            DVec3::new(-0.8, 0.1, 0.05),
        );

        let points: Vec<DVec3> = (0..num_inliers)
            .map(|_| {
                DVec3::new(
                    rng.random_range(-2.0..2.0),
                    rng.random_range(-1.5..1.5),
                    rng.random_range(4.0..8.0),
                )
            })
            .collect();

        let mut matches: Vec<Correspondence> = points
            .iter()
            .map(|p| {
                let n1 = Pose::identity().project(*p).expect("point in front of camera 1");
                let n2 = pose.project(*p).expect("point in front of camera 2");
                let u1 = pixel(&k, n1);
                let u2 = pixel(&k, n2);
                Correspondence::new(u1.x, u1.y, u2.x, u2.y)
            })
            .collect();
        matches.extend((0..num_outliers).map(|_| {
            Correspondence::new(
                rng.random_range(0.0..640.0),
                rng.random_range(0.0..480.0),
                rng.random_range(0.0..640.0),
                rng.random_range(0.0..480.0),
            )
        }));

        let k_inv = k.inverse();
        let e = skew(pose.translation()) * pose.rotation();
        let f = normalize_fundamental(&(k_inv.transpose() * e * k_inv))
            .expect("non-zero fundamental matrix");

        Self {
            k,
            pose,
            points,
            matches,
            f,
        }
    }

    /// Add uniform noise in `[-amplitude, amplitude]` to the inlier coordinates.
    pub(crate) fn with_noise(mut self, amplitude: f64, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        for c in self.matches.iter_mut().take(self.points.len()) {
            c.x1 += DVec2::new(
                rng.random_range(-amplitude..amplitude),
                rng.random_range(-amplitude..amplitude),
            );
            c.x2 += DVec2::new(
                rng.random_range(-amplitude..amplitude),
                rng.random_range(-amplitude..amplitude),
            );
        }
        self
    }

    /// Matches in normalized camera coordinates (`K^-1 x`).
    pub(crate) fn normalized_matches(&self) -> Vec<Correspondence> {
        let k_inv = self.k.inverse();
        self.matches
            .iter()
            .map(|c| {
                let n1 = k_inv * c.homogeneous1();
                let n2 = k_inv * c.homogeneous2();
                Correspondence::new(n1.x, n1.y, n2.x, n2.y)
            })
            .collect()
    }

    /// Frobenius distance to the ground truth, up to sign, after normalizing `f`.
    pub(crate) fn distance_to_true_f(&self, f: &DMat3) -> f64 {
        let Some(f) = normalize_fundamental(f) else {
            return f64::INFINITY;
        };
        let frobenius = |m: DMat3| m.to_cols_array().iter().map(|v| v * v).sum::<f64>().sqrt();
        frobenius(f - self.f).min(frobenius(f + self.f))
    }
}

fn pixel(k: &DMat3, normalized: DVec2) -> DVec2 {
    let p = *k * normalized.extend(1.0);
    DVec2::new(p.x, p.y)
}
