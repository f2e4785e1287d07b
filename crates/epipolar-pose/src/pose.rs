use std::fmt;
use std::ops::Mul;

use glam::{DMat3, DMat4, DVec2, DVec3, DVec4};

use crate::rotation::{axis_angle_to_rotation, rotation_to_axis_angle};

/// Element-wise tolerance used by [`Pose::is_approx`].
pub const POSE_APPROX_TOLERANCE: f64 = 1e-9;

/// A rigid-body transform in 3D.
///
/// The pose is stored as a 4x4 homogeneous matrix `Rt` whose top-left 3x3 block is a
/// rotation, whose last column holds the translation and whose bottom row is
/// `[0, 0, 0, 1]`. The axis-angle representation is derived on demand with
/// [`Pose::to_axis_angle`].
///
/// Poses are plain values: copying a pose yields an independent transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    rt: DMat4,
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl Pose {
    /// Create a pose from a rotation matrix and a translation vector.
    ///
    /// PRECONDITION: `rotation` is orthonormal with determinant +1.
    pub fn new(rotation: DMat3, translation: DVec3) -> Self {
        debug_assert!(
            (rotation.determinant() - 1.0).abs() < 1e-6,
            "rotation must have determinant +1"
        );
        Self {
            rt: DMat4::from_cols(
                rotation.x_axis.extend(0.0),
                rotation.y_axis.extend(0.0),
                rotation.z_axis.extend(0.0),
                translation.extend(1.0),
            ),
        }
    }

    /// The identity pose.
    pub fn identity() -> Self {
        Self { rt: DMat4::IDENTITY }
    }

    /// Create a pose from an axis-angle rotation vector and a translation.
    pub fn from_axis_angle(aa: DVec3, translation: DVec3) -> Self {
        Self::new(axis_angle_to_rotation(aa), translation)
    }

    /// The 4x4 homogeneous matrix of the pose.
    pub fn matrix(&self) -> DMat4 {
        self.rt
    }

    /// The 3x3 rotation block.
    pub fn rotation(&self) -> DMat3 {
        DMat3::from_mat4(self.rt)
    }

    /// The translation column.
    pub fn translation(&self) -> DVec3 {
        self.rt.w_axis.truncate()
    }

    /// Axis-angle vector of the rotation block.
    ///
    /// See [`rotation_to_axis_angle`] for the handling of the angle 0 and pi
    /// singularities.
    pub fn to_axis_angle(&self) -> DVec3 {
        rotation_to_axis_angle(&self.rotation())
    }

    /// Replace the rotation block with the rotation encoded by `aa`, keeping the
    /// translation, and return the updated 4x4 matrix.
    pub fn set_axis_angle(&mut self, aa: DVec3) -> DMat4 {
        *self = Self::from_axis_angle(aa, self.translation());
        self.rt
    }

    /// Project a 3D point through the transform.
    ///
    /// The point is mapped with `Rt` and divided by its transformed depth. Returns
    /// `None` when that depth is exactly zero, where the projection is undefined, or
    /// when the depth is so small that the quotient overflows. Any other depth, tiny or
    /// negative, is projected.
    pub fn project(&self, point: DVec3) -> Option<DVec2> {
        let p = self.rt * point.extend(1.0);
        if p.z == 0.0 {
            return None;
        }
        let uv = DVec2::new(p.x / p.z, p.y / p.z);
        uv.is_finite().then_some(uv)
    }

    /// Apply the rigid transform to a 3D point.
    pub fn transform_point(&self, point: DVec3) -> DVec3 {
        self.rt.transform_point3(point)
    }

    /// Compose in place by right-multiplication: `self = self * other`.
    ///
    /// After the call this pose is expressed relative to the frame of `other`.
    pub fn compose(&mut self, other: &Pose) {
        self.rt *= other.rt;
    }

    /// The inverse transform `[R^T | -R^T t]`.
    pub fn inverse(&self) -> Self {
        let r_t = self.rotation().transpose();
        Self::new(r_t, -(r_t * self.translation()))
    }

    /// Relative transform from this pose to `other`: `self^-1 * other`.
    pub fn delta(&self, other: &Pose) -> Self {
        self.inverse() * *other
    }

    /// Whether both 4x4 matrices agree element-wise within [`POSE_APPROX_TOLERANCE`].
    pub fn is_approx(&self, other: &Pose) -> bool {
        self.is_approx_eps(other, POSE_APPROX_TOLERANCE)
    }

    /// Whether both 4x4 matrices agree element-wise within `eps`.
    pub fn is_approx_eps(&self, other: &Pose, eps: f64) -> bool {
        self.rt.abs_diff_eq(other.rt, eps)
    }
}

impl Mul for Pose {
    type Output = Pose;

    fn mul(self, rhs: Pose) -> Pose {
        Pose { rt: self.rt * rhs.rt }
    }
}

impl Mul<&Pose> for &Pose {
    type Output = Pose;

    fn mul(self, rhs: &Pose) -> Pose {
        Pose { rt: self.rt * rhs.rt }
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pose matrix:")?;
        for i in 0..4 {
            let row: DVec4 = self.rt.row(i);
            writeln!(
                f,
                "  [{:>12.6} {:>12.6} {:>12.6} {:>12.6}]",
                row.x, row.y, row.z, row.w
            )?;
        }
        let aa = self.to_axis_angle();
        writeln!(f, "Pose axis-angle:")?;
        write!(f, "  [{:>12.6} {:>12.6} {:>12.6}]", aa.x, aa.y, aa.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotation::euler_angles_to_rotation;
    use approx::assert_abs_diff_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::f64::consts::PI;

    fn random_pose(rng: &mut StdRng) -> Pose {
        let r = euler_angles_to_rotation(
            rng.random_range(-PI..PI),
            rng.random_range(-PI..PI),
            rng.random_range(-PI..PI),
        );
        let t = DVec3::new(
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
        );
        Pose::new(r, t)
    }

    #[test]
    fn test_pose_axis_angle_round_trip() {
        let (s, c) = 0.5f64.sin_cos();
        let r = DMat3::from_cols(
            DVec3::new(c, s, 0.0),
            DVec3::new(-s, c, 0.0),
            DVec3::new(0.0, 0.0, 1.0),
        );
        let p1 = Pose::new(r, DVec3::new(0.3, -0.2, 0.9));
        let mut p2 = p1;

        let aa = p2.to_axis_angle();
        assert_abs_diff_eq!((aa - DVec3::new(0.0, 0.0, 0.5)).length(), 0.0, epsilon = 1e-12);

        let m = p2.set_axis_angle(aa);
        assert_eq!(m, p2.matrix());
        assert!(p1.is_approx(&p2));
    }

    #[test]
    fn test_copy_is_independent() {
        let p1 = Pose::new(DMat3::from_rotation_x(0.2), DVec3::new(1.0, 2.0, 3.0));
        let mut p2 = p1;
        p2.set_axis_angle(DVec3::new(0.0, 1.0, 0.0));
        assert!(!p1.is_approx(&p2));
        assert_abs_diff_eq!(p1.to_axis_angle().x, 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_compose_with_identity() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let p = random_pose(&mut rng);
            let mut composed = p;
            composed.compose(&Pose::identity());
            assert!(composed.is_approx(&p));

            let mut left = Pose::identity();
            left.compose(&p);
            assert!(left.is_approx(&p));
        }
    }

    #[test]
    fn test_pose_delta() {
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..100 {
            let p1 = random_pose(&mut rng);
            let p2 = random_pose(&mut rng);

            let p12 = p1.delta(&p2);
            let p21 = p2.delta(&p1);
            assert!(p12.is_approx_eps(&p21.inverse(), 1e-9));

            let expected12 = p1.matrix().inverse() * p2.matrix();
            assert!(p12.matrix().abs_diff_eq(expected12, 1e-9));

            // p1 * (p1^-1 * p2) == p2
            assert!((p1 * p12).is_approx_eps(&p2, 1e-9));
        }
    }

    #[test]
    fn test_inverse_composes_to_identity() {
        let mut rng = StdRng::seed_from_u64(3);
        let p = random_pose(&mut rng);
        assert!((&p * &p.inverse()).is_approx_eps(&Pose::identity(), 1e-12));
    }

    #[test]
    fn test_project() {
        let p = Pose::new(DMat3::IDENTITY, DVec3::new(0.0, 0.0, 1.0));
        let uv = p.project(DVec3::new(2.0, -1.0, 1.0)).expect("valid depth");
        assert_abs_diff_eq!(uv.x, 1.0);
        assert_abs_diff_eq!(uv.y, -0.5);

        let rotated = Pose::new(DMat3::from_rotation_y(PI / 2.0), DVec3::ZERO);
        let uv = rotated.project(DVec3::new(-1.0, 0.5, 0.0)).expect("valid depth");
        assert_abs_diff_eq!(uv.y, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_project_zero_depth() {
        let p = Pose::new(DMat3::IDENTITY, DVec3::new(0.0, 0.0, -1.0));
        assert!(p.project(DVec3::new(1.0, 1.0, 1.0)).is_none());
    }

    #[test]
    fn test_project_tiny_depth() {
        let p = Pose::identity();
        let uv = p.project(DVec3::new(1e-20, -3e-20, 1e-20)).expect("non-zero depth");
        assert_abs_diff_eq!(uv.x, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(uv.y, -3.0, epsilon = 1e-12);

        // behind the camera still projects
        let uv = p.project(DVec3::new(2.0, 4.0, -2.0)).expect("non-zero depth");
        assert_abs_diff_eq!(uv.x, -1.0);
        assert_abs_diff_eq!(uv.y, -2.0);

        // a quotient that overflows is not a projection
        assert!(p.project(DVec3::new(1.0, 0.0, 1e-310)).is_none());
    }

    #[test]
    fn test_transform_point() {
        let p = Pose::new(DMat3::from_rotation_z(PI / 2.0), DVec3::new(1.0, 0.0, 0.0));
        let x = p.transform_point(DVec3::X);
        assert_abs_diff_eq!((x - DVec3::new(1.0, 1.0, 0.0)).length(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_display_dumps_both_representations() {
        let p = Pose::from_axis_angle(DVec3::new(0.0, 0.0, 0.25), DVec3::new(1.0, 2.0, 3.0));
        let s = p.to_string();
        assert!(s.contains("Pose matrix:"));
        assert!(s.contains("Pose axis-angle:"));
        assert!(s.contains("0.250000"));
    }
}
