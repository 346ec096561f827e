use glam::{DMat3, DVec2, DVec3};

use super::{check_weights, condition_points};
use crate::error::{check_correspondences, EpipolarError};
use crate::linalg::{mat3_from_row_major, normalize_frobenius, null_vector, svd3};

/// Estimate the fundamental matrix using the normalized 8-point algorithm.
///
/// - `x1`: points in image 1 (length >= 8)
/// - `x2`: corresponding points in image 2 (same length)
///
/// The result satisfies `x2^T F x1 ~ 0`, has rank 2 and unit Frobenius norm.
pub fn fundamental_8point(x1: &[DVec2], x2: &[DVec2]) -> Result<DMat3, EpipolarError> {
    fundamental_normalized(x1, x2, None, true)
}

/// Weighted fundamental matrix estimation.
///
/// # Arguments
///
/// * `x1` - Points in image 1.
/// * `x2` - Corresponding points in image 2.
/// * `weights` - Optional per-correspondence weights scaling each row of the design matrix.
/// * `normalize` - Whether to Hartley-normalize the points before solving.
pub fn fundamental_normalized(
    x1: &[DVec2],
    x2: &[DVec2],
    weights: Option<&[f64]>,
    normalize: bool,
) -> Result<DMat3, EpipolarError> {
    let (m, t1, t2) = solve_epipolar_system(x1, x2, weights, normalize)?;
    let m = enforce_rank2(&m);
    Ok(normalize_frobenius(&(t2.transpose() * m * t1)))
}

/// Zero the smallest singular value of a 3x3 matrix.
pub fn enforce_rank2(m: &DMat3) -> DMat3 {
    let svd = svd3(m);
    let s = DVec3::new(svd.s().x, svd.s().y, 0.0);
    *svd.u() * DMat3::from_diagonal(s) * svd.v().transpose()
}

/// Solve the bilinear system `x2^T M x1 = 0` in the (optionally) normalized frame.
///
/// Returns the unconstrained matrix `M` and the normalizing transforms `T1`, `T2`.
pub(crate) fn solve_epipolar_system(
    x1: &[DVec2],
    x2: &[DVec2],
    weights: Option<&[f64]>,
    normalize: bool,
) -> Result<(DMat3, DMat3, DMat3), EpipolarError> {
    check_correspondences(x1, x2, 8)?;
    if let Some(w) = weights {
        check_weights(w, x1.len())?;
    }

    let (x1n, t1, x2n, t2) = condition_points(x1, x2, normalize)?;

    // one row per correspondence, f stored row-major
    let n = x1n.len();
    let mut a = faer::Mat::<f64>::zeros(n, 9);
    for i in 0..n {
        let (x, y) = (x1n[i].x, x1n[i].y);
        let (xp, yp) = (x2n[i].x, x2n[i].y);
        let w = weights.map_or(1.0, |w| w[i]);
        let row = [xp * x, xp * y, xp, yp * x, yp * y, yp, x, y, 1.0];
        for (j, v) in row.iter().enumerate() {
            a.write(i, j, w * v);
        }
    }

    let m = mat3_from_row_major(&null_vector(&a));
    Ok((m, t1, t2))
}
