use epipolar_pose::Pose;
use epipolar_ransac::Correspondence;
use faer::{Mat, MatRef};
use glam::{DMat3, DVec2, DVec3};

use crate::fundamental::{mat3_from_rows, to_faer};

/// Build an essential matrix from a fundamental matrix and camera intrinsics.
///
/// E = K2^T * F * K1
pub fn essential_from_fundamental(f: &DMat3, k1: &DMat3, k2: &DMat3) -> DMat3 {
    k2.transpose() * *f * *k1
}

/// Enforce the (1, 1, 0) singular value constraint on an essential matrix.
pub fn enforce_essential_constraints(e: &DMat3) -> DMat3 {
    let svd = to_faer(e).svd();
    let u = from_faer(svd.u());
    let v = from_faer(svd.v());
    u * DMat3::from_diagonal(DVec3::new(1.0, 1.0, 0.0)) * v.transpose()
}

/// Decompose an essential matrix into its four `(R, t)` candidates.
///
/// With `E = U diag(1, 1, 0) V^T` the candidates are `R = U W V^T` or `U W^T V^T`
/// combined with `t = +u3` or `-u3`, where `u3` is the last column of `U`. Both
/// rotations are proper (determinant +1) and `t` has unit length. Each pose maps
/// points from the first camera frame to the second.
pub fn decompose_essential(e: &DMat3) -> [Pose; 4] {
    let svd = to_faer(e).svd();
    let mut u = from_faer(svd.u());
    let mut v = from_faer(svd.v());

    // the third singular value is zero, so flipping u3 or v3 leaves E unchanged
    if u.determinant() < 0.0 {
        u.z_axis = -u.z_axis;
    }
    if v.determinant() < 0.0 {
        v.z_axis = -v.z_axis;
    }

    let w = mat3_from_rows([[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]);
    let r1 = u * w * v.transpose();
    let r2 = u * w.transpose() * v.transpose();
    let t = u.z_axis;

    [
        Pose::new(r1, t),
        Pose::new(r1, -t),
        Pose::new(r2, t),
        Pose::new(r2, -t),
    ]
}

/// Pick the candidate pose that places the most points in front of both cameras.
///
/// `matches` are in normalized camera coordinates (`K^-1 x`). Each one is
/// triangulated under every candidate; the pose with the largest number of
/// points of positive depth in both views wins, the first one on ties. Returns
/// the pose and its count, or `None` if no candidate has any point in front.
pub fn select_pose_by_cheirality(
    candidates: &[Pose],
    matches: &[Correspondence],
) -> Option<(Pose, usize)> {
    let mut best: Option<(Pose, usize)> = None;
    for pose in candidates {
        let count = matches
            .iter()
            .filter_map(|c| triangulate_point_linear(c.x1, c.x2, pose))
            .filter(|x| x.z > 0.0 && pose.transform_point(*x).z > 0.0)
            .count();
        log::trace!("cheirality: {count}/{} points in front", matches.len());
        if count > best.map_or(0, |(_, n)| n) {
            best = Some((*pose, count));
        }
    }
    best
}

/// Linear (DLT) triangulation of a normalized correspondence.
///
/// The first camera is `[I | 0]` and the second is `pose`. Returns the point in
/// the first camera frame, or `None` if it lies at infinity.
pub fn triangulate_point_linear(x1: DVec2, x2: DVec2, pose: &Pose) -> Option<DVec3> {
    let p1 = [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
    ];
    let rt = pose.matrix();
    let p2 = [rt.row(0), rt.row(1), rt.row(2)].map(|r| r.to_array());

    let mut a = Mat::<f64>::zeros(4, 4);
    write_dlt_row(&mut a, 0, x1.x, &p1[2], &p1[0]);
    write_dlt_row(&mut a, 1, x1.y, &p1[2], &p1[1]);
    write_dlt_row(&mut a, 2, x2.x, &p2[2], &p2[0]);
    write_dlt_row(&mut a, 3, x2.y, &p2[2], &p2[1]);

    let svd = a.svd();
    let xh = svd.v().col(3);
    let w = xh[3];
    if w.abs() < 1e-12 {
        return None;
    }
    Some(DVec3::new(xh[0] / w, xh[1] / w, xh[2] / w))
}

fn write_dlt_row(a: &mut Mat<f64>, row: usize, x: f64, p3: &[f64; 4], p1: &[f64; 4]) {
    for j in 0..4 {
        a[(row, j)] = x * p3[j] - p1[j];
    }
}

pub(crate) fn from_faer(m: MatRef<'_, f64>) -> DMat3 {
    mat3_from_rows([
        [m[(0, 0)], m[(0, 1)], m[(0, 2)]],
        [m[(1, 0)], m[(1, 1)], m[(1, 2)]],
        [m[(2, 0)], m[(2, 1)], m[(2, 2)]],
    ])
}
