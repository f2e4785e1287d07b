use glam::{DMat3, DVec3};

/// Rotation angles below this value are handled with the first-order expansion.
pub const SMALL_ANGLE: f64 = 1e-12;

/// Angular distance to pi under which the axis is recovered from the symmetric part.
pub const NEAR_PI: f64 = 1e-6;

/// Build the skew-symmetric (cross-product) matrix of a 3-vector.
///
/// `skew(a) * b == a.cross(b)` for every `b`.
pub fn skew(v: DVec3) -> DMat3 {
    DMat3::from_cols(
        DVec3::new(0.0, v.z, -v.y),
        DVec3::new(-v.z, 0.0, v.x),
        DVec3::new(v.y, -v.x, 0.0),
    )
}

/// Extract the vector of the skew-symmetric part of a 3x3 matrix.
///
/// This is the inverse of [`skew`] for skew-symmetric inputs. For a general matrix
/// `m` it returns `vee((m - m^T) / 2)`.
pub fn vee(m: &DMat3) -> DVec3 {
    DVec3::new(
        0.5 * (m.y_axis.z - m.z_axis.y),
        0.5 * (m.z_axis.x - m.x_axis.z),
        0.5 * (m.x_axis.y - m.y_axis.x),
    )
}

fn trace(m: &DMat3) -> f64 {
    m.x_axis.x + m.y_axis.y + m.z_axis.z
}

/// Convert an axis-angle vector into a rotation matrix (Rodrigues formula).
///
/// The direction of `aa` is the rotation axis and its norm is the angle in radians.
/// A zero vector maps to the identity.
///
/// Example:
///
/// ```
/// use epipolar_pose::{axis_angle_to_rotation, glam::DVec3};
///
/// let r = axis_angle_to_rotation(DVec3::new(0.0, 0.0, std::f64::consts::FRAC_PI_2));
/// let x = r * DVec3::X;
/// assert!((x - DVec3::Y).length() < 1e-12);
/// ```
pub fn axis_angle_to_rotation(aa: DVec3) -> DMat3 {
    let angle = aa.length();
    if angle < SMALL_ANGLE {
        return DMat3::IDENTITY + skew(aa);
    }

    let axis = aa / angle;
    let (s, c) = angle.sin_cos();
    let outer = DMat3::from_cols(axis * axis.x, axis * axis.y, axis * axis.z);

    DMat3::IDENTITY * c + skew(axis) * s + outer * (1.0 - c)
}

/// Convert a rotation matrix into its axis-angle vector.
///
/// The returned angle lies in `[0, pi]`. The singular configurations are resolved
/// explicitly instead of dividing by a vanishing `sin(angle)`:
///
/// - angle 0: the first-order expansion is returned, which is the zero vector for
///   the identity.
/// - angle pi: the axis is taken from the symmetric part `(R + R^T) / 2`. Its sign
///   follows the skew part when that is measurable, otherwise the first non-zero
///   component is made positive.
///
/// PRECONDITION: `r` is a valid rotation (orthonormal, determinant +1).
pub fn rotation_to_axis_angle(r: &DMat3) -> DVec3 {
    // w = sin(angle) * axis
    let w = vee(r);
    let sin_angle = w.length();
    let cos_angle = ((trace(r) - 1.0) * 0.5).clamp(-1.0, 1.0);
    let angle = sin_angle.atan2(cos_angle);

    if angle < SMALL_ANGLE {
        return w;
    }

    if std::f64::consts::PI - angle < NEAR_PI {
        return axis_near_pi(r, cos_angle, w) * angle;
    }

    w * (angle / sin_angle)
}

// R + R^T = 2 cos(angle) I + 2 (1 - cos(angle)) a a^T, so a a^T is recovered from the
// symmetric part using its largest diagonal entry as pivot.
fn axis_near_pi(r: &DMat3, cos_angle: f64, w: DVec3) -> DVec3 {
    let sym = (*r + r.transpose()) * 0.5;
    let outer = (sym - DMat3::IDENTITY * cos_angle) * (1.0 / (1.0 - cos_angle));

    let diag = [outer.x_axis.x, outer.y_axis.y, outer.z_axis.z];
    let mut k = 0;
    for i in 1..3 {
        if diag[i] > diag[k] {
            k = i;
        }
    }

    let col = outer.col(k);
    let mut axis = (col / diag[k].max(0.0).sqrt()).normalize();

    if w.length() > 1e-12 {
        if axis.dot(w) < 0.0 {
            axis = -axis;
        }
    } else {
        let first = [axis.x, axis.y, axis.z]
            .into_iter()
            .find(|c| c.abs() > 1e-12)
            .unwrap_or(1.0);
        if first < 0.0 {
            axis = -axis;
        }
    }

    axis
}

/// Build a rotation matrix from roll `phi` (about X), pitch `theta` (about Y) and
/// yaw `psi` (about Z), composed as `Rz(psi) * Ry(theta) * Rx(phi)`.
pub fn euler_angles_to_rotation(phi: f64, theta: f64, psi: f64) -> DMat3 {
    DMat3::from_rotation_z(psi) * DMat3::from_rotation_y(theta) * DMat3::from_rotation_x(phi)
}
