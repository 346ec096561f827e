use glam::{DMat3, DVec2};

use super::{check_weights, condition_points};
use crate::error::{check_correspondences, EpipolarError};
use crate::linalg::{checked_inverse, mat3_from_row_major, null_vector};

/// Compute the homography from `x1` to `x2` with the (normalized) direct linear transform.
///
/// * `x1` - The source points, at least 4.
/// * `x2` - The destination points.
/// * `weights` - Optional per-correspondence weights, applied to both rows of a correspondence.
/// * `normalize` - Whether to Hartley-normalize the points before solving.
///
/// The output is scaled so that its bottom-right entry equals 1. Fails with
/// [`EpipolarError::DegenerateGeometry`] when that entry vanishes.
pub fn homography_dlt(
    x1: &[DVec2],
    x2: &[DVec2],
    weights: Option<&[f64]>,
    normalize: bool,
) -> Result<DMat3, EpipolarError> {
    check_correspondences(x1, x2, 4)?;
    if let Some(w) = weights {
        check_weights(w, x1.len())?;
    }

    let (x1n, t1, x2n, t2) = condition_points(x1, x2, normalize)?;

    // construct matrix A, two rows per correspondence
    let n = x1n.len();
    let mut mat_a = faer::Mat::<f64>::zeros(2 * n, 9);
    for i in 0..n {
        let (x, y) = (x1n[i].x, x1n[i].y);
        let (xp, yp) = (x2n[i].x, x2n[i].y);
        let w = weights.map_or(1.0, |w| w[i]);

        mat_a.write(2 * i, 0, w * x);
        mat_a.write(2 * i, 1, w * y);
        mat_a.write(2 * i, 2, w);
        mat_a.write(2 * i, 6, -w * xp * x);
        mat_a.write(2 * i, 7, -w * xp * y);
        mat_a.write(2 * i, 8, -w * xp);

        mat_a.write(2 * i + 1, 3, w * x);
        mat_a.write(2 * i + 1, 4, w * y);
        mat_a.write(2 * i + 1, 5, w);
        mat_a.write(2 * i + 1, 6, -w * yp * x);
        mat_a.write(2 * i + 1, 7, -w * yp * y);
        mat_a.write(2 * i + 1, 8, -w * yp);
    }

    let h_norm = mat3_from_row_major(&null_vector(&mat_a));

    // x2n = T2 x2 and x1n = T1 x1, so H = T2^-1 * Hn * T1
    let t2_inv = checked_inverse(&t2).ok_or_else(|| {
        EpipolarError::DegenerateGeometry("normalizing transform is singular".to_string())
    })?;
    let h = t2_inv * h_norm * t1;

    let h22 = h.z_axis.z;
    if !(h22.abs() > f64::EPSILON) {
        return Err(EpipolarError::DegenerateGeometry(format!(
            "homography has a vanishing bottom-right entry ({h22:e})"
        )));
    }

    Ok(h * (1.0 / h22))
}
