use epipolar_ransac::{Correspondence, FitError, RansacProblem};
use faer::Mat;
use glam::{DMat3, DVec2};

use crate::fundamental::{mat3_from_rows, normalize_points};

/// Minimal number of correspondences for the homography DLT.
pub const HOMOGRAPHY_SAMPLE_SIZE: usize = 4;

const DEGENERACY_RATIO: f64 = 1e-9;
const MIN_DETERMINANT: f64 = 1e-10;

/// Estimate the homography `x2 ~ H x1` with the normalized direct linear transform.
///
/// Accepts four or more correspondences. The result is scaled so that
/// `H[2][2] = 1` when that entry is not vanishing, and to unit Frobenius norm
/// otherwise.
pub fn homography_dlt(matches: &[Correspondence]) -> Result<DMat3, FitError> {
    if matches.len() < HOMOGRAPHY_SAMPLE_SIZE {
        return Err(FitError::InsufficientData {
            required: HOMOGRAPHY_SAMPLE_SIZE,
            actual: matches.len(),
        });
    }
    if matches
        .iter()
        .any(|c| !(c.x1.is_finite() && c.x2.is_finite()))
    {
        return Err(FitError::NonFinite);
    }

    let x1: Vec<DVec2> = matches.iter().map(|c| c.x1).collect();
    let x2: Vec<DVec2> = matches.iter().map(|c| c.x2).collect();
    let (x1n, t1) = normalize_points(&x1).ok_or(FitError::DegenerateSample)?;
    let (x2n, t2) = normalize_points(&x2).ok_or(FitError::DegenerateSample)?;

    if matches.len() == HOMOGRAPHY_SAMPLE_SIZE
        && (has_collinear_triple(&x1n) || has_collinear_triple(&x2n))
    {
        return Err(FitError::DegenerateSample);
    }

    // two rows per correspondence, padded to nine rows for the thin SVD
    let rows = (2 * x1n.len()).max(9);
    let mut a = Mat::<f64>::zeros(rows, 9);
    for (i, (p1, p2)) in x1n.iter().zip(x2n.iter()).enumerate() {
        a[(2 * i, 0)] = p1.x;
        a[(2 * i, 1)] = p1.y;
        a[(2 * i, 2)] = 1.0;
        a[(2 * i, 6)] = -p2.x * p1.x;
        a[(2 * i, 7)] = -p2.x * p1.y;
        a[(2 * i, 8)] = -p2.x;

        a[(2 * i + 1, 3)] = p1.x;
        a[(2 * i + 1, 4)] = p1.y;
        a[(2 * i + 1, 5)] = 1.0;
        a[(2 * i + 1, 6)] = -p2.y * p1.x;
        a[(2 * i + 1, 7)] = -p2.y * p1.y;
        a[(2 * i + 1, 8)] = -p2.y;
    }

    let svd = a.thin_svd();
    let s = svd.s_diagonal();
    if s[0] <= 0.0 || s[7] < DEGENERACY_RATIO * s[0] {
        return Err(FitError::DegenerateSample);
    }

    let v = svd.v();
    let hn = mat3_from_rows([
        [v[(0, 8)], v[(1, 8)], v[(2, 8)]],
        [v[(3, 8)], v[(4, 8)], v[(5, 8)]],
        [v[(6, 8)], v[(7, 8)], v[(8, 8)]],
    ]);

    // H = T2^-1 * Hn * T1
    let h = t2.inverse() * hn * t1;

    let norm = h.to_cols_array().iter().map(|v| v * v).sum::<f64>().sqrt();
    if !norm.is_finite() || norm <= 0.0 {
        return Err(FitError::NonFinite);
    }
    let h = h * (1.0 / norm);
    if h.determinant().abs() < MIN_DETERMINANT {
        return Err(FitError::DegenerateSample);
    }

    let h22 = h.z_axis.z;
    if h22.abs() > DEGENERACY_RATIO {
        Ok(h * (1.0 / h22))
    } else {
        Ok(h)
    }
}

// any three of the (normalized) points on a common line
fn has_collinear_triple(points: &[DVec2]) -> bool {
    let n = points.len();
    for i in 0..n {
        for j in i + 1..n {
            for k in j + 1..n {
                let area = (points[j] - points[i]).perp_dot(points[k] - points[i]);
                if area.abs() < 1e-9 {
                    return true;
                }
            }
        }
    }
    false
}

/// One-way transfer error `|| x2 - H x1 ||`, in pixels of the second image.
///
/// Points mapped to infinity get `f64::INFINITY`.
pub fn transfer_error(h: &DMat3, c: &Correspondence) -> f64 {
    let p = *h * c.homogeneous1();
    if p.z.abs() < f64::EPSILON {
        return f64::INFINITY;
    }
    let d = (DVec2::new(p.x / p.z, p.y / p.z) - c.x2).length();
    if d.is_nan() {
        f64::INFINITY
    } else {
        d
    }
}

/// Homography estimation problem: planar scenes or pure camera rotations.
#[derive(Clone, Debug)]
pub struct HomographyProblem<'a> {
    data: &'a [Correspondence],
}

impl<'a> HomographyProblem<'a> {
    /// Problem with minimal samples of four correspondences.
    pub fn new(data: &'a [Correspondence]) -> Self {
        Self { data }
    }
}

impl RansacProblem for HomographyProblem<'_> {
    type Datum = Correspondence;
    type Model = DMat3;

    fn data(&self) -> &[Correspondence] {
        self.data
    }

    fn sample_size(&self) -> usize {
        HOMOGRAPHY_SAMPLE_SIZE
    }

    fn fit_model(&self, sample: &[Correspondence]) -> Result<DMat3, FitError> {
        homography_dlt(sample)
    }

    fn error(&self, model: &DMat3, datum: &Correspondence) -> f64 {
        transfer_error(model, datum)
    }
}
