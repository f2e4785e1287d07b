use epipolar_ransac::{Correspondence, FitError, RansacError, RansacProblem};
use faer::Mat;
use glam::{DMat3, DVec2, DVec3};
use serde::{Deserialize, Serialize};

/// Minimal number of correspondences for the linear 8-point method.
pub const FUNDAMENTAL_SAMPLE_SIZE: usize = 8;

/// Options of the 8-point solver.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EightPointParams {
    /// Condition the points (centroid at the origin, mean distance sqrt(2)) before solving.
    pub normalize: bool,
    /// Project the linear solution onto the rank-2 matrices.
    pub enforce_rank2: bool,
    /// A sample is degenerate when the second-smallest singular value of the design
    /// matrix is below this fraction of the largest one.
    pub degeneracy_ratio: f64,
    /// A sample is degenerate when, in either image, the smaller eigenvalue of the
    /// point scatter matrix is below this fraction of the larger one. This rejects
    /// nearly collinear samples that the singular-value test lets through once the
    /// points carry noise. Zero disables the check.
    pub min_spread_ratio: f64,
}

impl Default for EightPointParams {
    fn default() -> Self {
        Self {
            normalize: true,
            enforce_rank2: true,
            degeneracy_ratio: 1e-9,
            min_spread_ratio: 1e-2,
        }
    }
}

impl EightPointParams {
    /// Check that both ratios are finite and in `[0, 1)`.
    pub fn validate(&self) -> Result<(), RansacError> {
        for (name, value) in [
            ("degeneracy_ratio", self.degeneracy_ratio),
            ("min_spread_ratio", self.min_spread_ratio),
        ] {
            if !(0.0..1.0).contains(&value) {
                return Err(RansacError::InvalidConfig(format!(
                    "{name} must be in [0, 1), got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Ratio of the smaller to the larger eigenvalue of the 2x2 scatter matrix of
/// `points` around their centroid.
///
/// The ratio is 0 for collinear or coincident points and 1 for an isotropic
/// spread. It is invariant to translation and uniform scaling of the points.
pub fn point_spread_ratio(points: &[DVec2]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    let centroid = points.iter().fold(DVec2::ZERO, |acc, p| acc + *p) / points.len() as f64;
    let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
    for p in points {
        let d = *p - centroid;
        sxx += d.x * d.x;
        sxy += d.x * d.y;
        syy += d.y * d.y;
    }

    let mean = 0.5 * (sxx + syy);
    let radius = (0.5 * (sxx - syy)).hypot(sxy);
    let largest = mean + radius;
    if !largest.is_finite() || largest <= 0.0 {
        return 0.0;
    }
    ((mean - radius) / largest).max(0.0)
}

/// Similarity transform moving the centroid of `points` to the origin and scaling
/// their mean distance to it to `sqrt(2)`.
///
/// Returns the normalized points and the 3x3 transform `T` such that
/// `T * [x, y, 1]^T` is the normalized point, or `None` if the slice is empty or
/// all points coincide.
pub fn normalize_points(points: &[DVec2]) -> Option<(Vec<DVec2>, DMat3)> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let centroid = points.iter().fold(DVec2::ZERO, |acc, p| acc + *p) / n;
    let mean_dist = points.iter().map(|p| (*p - centroid).length()).sum::<f64>() / n;
    if !mean_dist.is_finite() || mean_dist <= f64::EPSILON * centroid.length().max(1.0) {
        return None;
    }

    let scale = std::f64::consts::SQRT_2 / mean_dist;
    let normalized = points.iter().map(|p| (*p - centroid) * scale).collect();

    // T = [[s, 0, -s*mx], [0, s, -s*my], [0, 0, 1]]
    let t = DMat3::from_cols(
        DVec3::new(scale, 0.0, 0.0),
        DVec3::new(0.0, scale, 0.0),
        DVec3::new(-scale * centroid.x, -scale * centroid.y, 1.0),
    );
    Some((normalized, t))
}

/// Estimate the fundamental matrix with the (normalized) 8-point algorithm.
///
/// The returned matrix satisfies `x2^T F x1 = 0` for the correspondences. It has
/// unit Frobenius norm and its largest-magnitude entry is positive, which fixes the
/// scale and sign ambiguity of `F`.
///
/// Any number of correspondences `>= 8` is accepted; more than eight gives the
/// least-squares solution.
///
/// # Errors
///
/// * [`FitError::InsufficientData`] with fewer than eight correspondences.
/// * [`FitError::NonFinite`] if an input coordinate or the solution is not finite.
/// * [`FitError::DegenerateSample`] if the points of either image are (nearly)
///   collinear or coincident, see [`EightPointParams::min_spread_ratio`], or if the
///   linear system has a null space of dimension larger than one.
pub fn fundamental_8point(
    matches: &[Correspondence],
    params: &EightPointParams,
) -> Result<DMat3, FitError> {
    if matches.len() < FUNDAMENTAL_SAMPLE_SIZE {
        return Err(FitError::InsufficientData {
            required: FUNDAMENTAL_SAMPLE_SIZE,
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
    if params.min_spread_ratio > 0.0 {
        let spread = point_spread_ratio(&x1).min(point_spread_ratio(&x2));
        if spread < params.min_spread_ratio {
            return Err(FitError::DegenerateSample);
        }
    }

    let (x1n, t1, x2n, t2) = if params.normalize {
        let (x1n, t1) = normalize_points(&x1).ok_or(FitError::DegenerateSample)?;
        let (x2n, t2) = normalize_points(&x2).ok_or(FitError::DegenerateSample)?;
        (x1n, t1, x2n, t2)
    } else {
        (x1, DMat3::IDENTITY, x2, DMat3::IDENTITY)
    };

    // design matrix for x2^T F x1 = 0, padded with zero rows so the thin SVD
    // returns the full 9x9 right singular basis
    let rows = x1n.len().max(9);
    let mut a = Mat::<f64>::zeros(rows, 9);
    for (i, (p1, p2)) in x1n.iter().zip(x2n.iter()).enumerate() {
        a[(i, 0)] = p2.x * p1.x;
        a[(i, 1)] = p2.x * p1.y;
        a[(i, 2)] = p2.x;
        a[(i, 3)] = p2.y * p1.x;
        a[(i, 4)] = p2.y * p1.y;
        a[(i, 5)] = p2.y;
        a[(i, 6)] = p1.x;
        a[(i, 7)] = p1.y;
        a[(i, 8)] = 1.0;
    }

    let svd = a.thin_svd();
    let s = svd.s_diagonal();
    if s[0] <= 0.0 || s[7] < params.degeneracy_ratio * s[0] {
        return Err(FitError::DegenerateSample);
    }

    // null-space solution: right singular vector of the smallest singular value
    let v = svd.v();
    let f = mat3_from_rows([
        [v[(0, 8)], v[(1, 8)], v[(2, 8)]],
        [v[(3, 8)], v[(4, 8)], v[(5, 8)]],
        [v[(6, 8)], v[(7, 8)], v[(8, 8)]],
    ]);

    let f = if params.enforce_rank2 {
        enforce_rank2(&f)
    } else {
        f
    };

    // F = T2^T * F * T1
    let f = t2.transpose() * f * t1;

    normalize_fundamental(&f).ok_or(FitError::NonFinite)
}

/// Closest rank-2 matrix in Frobenius norm: zero the smallest singular value.
pub fn enforce_rank2(f: &DMat3) -> DMat3 {
    let svd = to_faer(f).svd();
    let u = svd.u();
    let s = svd.s_diagonal();
    let v = svd.v();

    let mut rows = [[0.0; 3]; 3];
    for (i, row) in rows.iter_mut().enumerate() {
        for (j, value) in row.iter_mut().enumerate() {
            *value = (0..2).map(|k| u[(i, k)] * s[k] * v[(j, k)]).sum();
        }
    }
    mat3_from_rows(rows)
}

/// Scale `f` to unit Frobenius norm with its largest-magnitude entry positive.
///
/// Returns `None` for a zero or non-finite matrix.
pub fn normalize_fundamental(f: &DMat3) -> Option<DMat3> {
    let entries = f.to_cols_array();
    let norm = entries.iter().map(|v| v * v).sum::<f64>().sqrt();
    if !norm.is_finite() || norm <= 0.0 {
        return None;
    }
    let pivot = entries
        .iter()
        .fold(0.0f64, |best, &v| if v.abs() > best.abs() { v } else { best });
    let f = *f * (1.0 / norm);
    Some(if pivot < 0.0 { -f } else { f })
}

/// Algebraic epipolar residual `x2^T F x1`.
pub fn epipolar_residual(f: &DMat3, c: &Correspondence) -> f64 {
    c.homogeneous2().dot(*f * c.homogeneous1())
}

/// Symmetric epipolar distance, in pixels.
///
/// Sum of the distance of `x2` to the epipolar line `F x1` and the distance of
/// `x1` to the epipolar line `F^T x2`. Returns `f64::INFINITY` when one of the
/// lines is undefined (a point lying on an epipole) so that such correspondences
/// are never counted as inliers.
pub fn symmetric_epipolar_distance(f: &DMat3, c: &Correspondence) -> f64 {
    let x1 = c.homogeneous1();
    let x2 = c.homogeneous2();
    let d2 = point_line_distance(&(*f * x1), &x2);
    let d1 = point_line_distance(&(f.transpose() * x2), &x1);
    let d = d1 + d2;
    if d.is_nan() {
        f64::INFINITY
    } else {
        d
    }
}

fn point_line_distance(line: &DVec3, point: &DVec3) -> f64 {
    let norm = line.x.hypot(line.y);
    if norm <= f64::MIN_POSITIVE {
        return f64::INFINITY;
    }
    line.dot(*point).abs() / norm
}

/// Fundamental-matrix estimation problem over a borrowed list of correspondences.
///
/// Candidates are fitted with [`fundamental_8point`] and scored with the
/// [`symmetric_epipolar_distance`].
#[derive(Clone, Debug)]
pub struct FundamentalProblem<'a> {
    data: &'a [Correspondence],
    sample_size: usize,
    params: EightPointParams,
}

impl<'a> FundamentalProblem<'a> {
    /// Problem with minimal samples of eight correspondences.
    pub fn new(data: &'a [Correspondence]) -> Self {
        Self {
            data,
            sample_size: FUNDAMENTAL_SAMPLE_SIZE,
            params: EightPointParams::default(),
        }
    }

    /// Problem drawing `sample_size` correspondences per candidate.
    ///
    /// Larger samples trade robustness for a least-squares fit per candidate.
    pub fn with_sample_size(
        data: &'a [Correspondence],
        sample_size: usize,
    ) -> Result<Self, RansacError> {
        if sample_size < FUNDAMENTAL_SAMPLE_SIZE {
            return Err(RansacError::InvalidConfig(format!(
                "sample size must be at least {FUNDAMENTAL_SAMPLE_SIZE}, got {sample_size}"
            )));
        }
        if sample_size > data.len() {
            return Err(RansacError::InsufficientData {
                required: sample_size,
                actual: data.len(),
            });
        }
        Ok(Self {
            sample_size,
            ..Self::new(data)
        })
    }

    /// Use `params` for every fit.
    pub fn with_params(mut self, params: EightPointParams) -> Self {
        self.params = params;
        self
    }
}

impl RansacProblem for FundamentalProblem<'_> {
    type Datum = Correspondence;
    type Model = DMat3;

    fn data(&self) -> &[Correspondence] {
        self.data
    }

    fn sample_size(&self) -> usize {
        self.sample_size
    }

    fn fit_model(&self, sample: &[Correspondence]) -> Result<DMat3, FitError> {
        fundamental_8point(sample, &self.params)
    }

    fn error(&self, model: &DMat3, datum: &Correspondence) -> f64 {
        symmetric_epipolar_distance(model, datum)
    }
}

pub(crate) fn mat3_from_rows(rows: [[f64; 3]; 3]) -> DMat3 {
    DMat3::from_cols_array_2d(&rows).transpose()
}

pub(crate) fn to_faer(m: &DMat3) -> Mat<f64> {
    Mat::from_fn(3, 3, |i, j| m.col(j)[i])
}
