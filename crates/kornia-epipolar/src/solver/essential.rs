use glam::{DMat3, DVec2, DVec3};

use super::fundamental::{enforce_rank2, solve_epipolar_system};
use crate::error::EpipolarError;
use crate::linalg::svd3;
use crate::primitives::{calibration_inverse, skew_symmetric, transform_points};

/// Estimate the essential matrix with the normalized 8-point algorithm.
///
/// When `calibration` is given, pixel points are first mapped through `K^-1`;
/// otherwise they are taken as calibrated coordinates. The constraint is enforced
/// in the calibrated frame, after the Hartley normalization is undone, so the
/// returned matrix always has singular values `(1, 1, 0)`.
pub fn essential_normalized(
    x1: &[DVec2],
    x2: &[DVec2],
    calibration: Option<&DMat3>,
    weights: Option<&[f64]>,
    normalize: bool,
) -> Result<DMat3, EpipolarError> {
    let (x1c, x2c) = match calibration {
        Some(k) => {
            let k_inv = calibration_inverse(k)?;
            (transform_points(&k_inv, x1)?, transform_points(&k_inv, x2)?)
        }
        None => (x1.to_vec(), x2.to_vec()),
    };

    let (m, t1, t2) = solve_epipolar_system(&x1c, &x2c, weights, normalize)?;

    // the normalized frame is not a metric frame: only rank 2 holds there
    let m = enforce_rank2(&m);
    Ok(enforce_essential_constraints(&(t2.transpose() * m * t1)))
}

/// Replace the singular values of `m` with `(1, 1, 0)`.
pub fn enforce_essential_constraints(m: &DMat3) -> DMat3 {
    let svd = svd3(m);
    *svd.u() * DMat3::from_diagonal(DVec3::new(1.0, 1.0, 0.0)) * svd.v().transpose()
}

/// Build an essential matrix from a fundamental matrix and camera intrinsics.
///
/// E = K2^T * F * K1, projected onto singular values `(1, 1, 0)`.
pub fn essential_from_fundamental(f: &DMat3, k1: &DMat3, k2: &DMat3) -> DMat3 {
    enforce_essential_constraints(&(k2.transpose() * *f * *k1))
}

/// Build a fundamental matrix from an essential matrix and camera intrinsics.
///
/// F = K2^-T * E * K1^-1
pub fn fundamental_from_essential(
    e: &DMat3,
    k1: &DMat3,
    k2: &DMat3,
) -> Result<DMat3, EpipolarError> {
    let k1_inv = calibration_inverse(k1)?;
    let k2_inv = calibration_inverse(k2)?;
    Ok(k2_inv.transpose() * *e * k1_inv)
}

/// Essential matrix of the relative pose `X2 = R * X1 + t`, i.e. `E = [t]x R`.
pub fn essential_from_pose(rotation: &DMat3, translation: DVec3) -> DMat3 {
    skew_symmetric(translation) * *rotation
}

/// Fundamental matrix of the relative pose `X2 = R * X1 + t` seen by a camera with intrinsics `K`.
pub fn fundamental_from_pose(
    rotation: &DMat3,
    translation: DVec3,
    k: &DMat3,
) -> Result<DMat3, EpipolarError> {
    fundamental_from_essential(&essential_from_pose(rotation, translation), k, k)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::normalize_frobenius;
    use crate::scoring::sampson_distance;

    fn calibration() -> DMat3 {
        DMat3::from_cols(
            DVec3::new(718.0, 0.0, 0.0),
            DVec3::new(0.0, 718.0, 0.0),
            DVec3::new(607.0, 185.0, 1.0),
        )
    }

    fn scene() -> (DMat3, DVec3, Vec<DVec2>, Vec<DVec2>) {
        let k = calibration();
        let r = DMat3::from_rotation_y(-0.08) * DMat3::from_rotation_z(0.03);
        let t = DVec3::new(0.2, -0.05, 1.0);
        let mut x1 = Vec::new();
        let mut x2 = Vec::new();
        for i in 0..12 {
            let fi = i as f64;
            let p = DVec3::new((fi * 0.9).sin() * 4.0, (fi * 1.3).cos() * 1.5, 6.0 + fi * 1.7);
            let q1 = k * p;
            let q2 = k * (r * p + t);
            x1.push(DVec2::new(q1.x / q1.z, q1.y / q1.z));
            x2.push(DVec2::new(q2.x / q2.z, q2.y / q2.z));
        }
        (r, t, x1, x2)
    }

    fn max_abs_diff_up_to_sign(a: &DMat3, b: &DMat3) -> f64 {
        let a = normalize_frobenius(a).to_cols_array();
        let b = normalize_frobenius(b).to_cols_array();
        let same = a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).fold(0.0, f64::max);
        let flipped = a.iter().zip(b.iter()).map(|(x, y)| (x + y).abs()).fold(0.0, f64::max);
        same.min(flipped)
    }

    #[test]
    fn test_essential_noiseless_recovery() -> Result<(), EpipolarError> {
        let (r, t, x1, x2) = scene();
        let k = calibration();
        let e = essential_normalized(&x1, &x2, Some(&k), None, true)?;

        let e_true = essential_from_pose(&r, t);
        assert!(max_abs_diff_up_to_sign(&e, &e_true) < 1e-6);

        let f = fundamental_from_essential(&e, &k, &k)?;
        for (p1, p2) in x1.iter().zip(x2.iter()) {
            assert!(sampson_distance(&f, p1, p2) < 1e-6);
        }
        Ok(())
    }

    #[test]
    fn test_essential_singular_values() -> Result<(), EpipolarError> {
        let (_, _, x1, mut x2) = scene();
        for (i, p) in x2.iter_mut().enumerate() {
            *p += DVec2::new(0.8 * (i as f64).sin(), 0.5 * (i as f64 * 2.1).cos());
        }
        let e = essential_normalized(&x1, &x2, Some(&calibration()), None, true)?;
        let s = *svd3(&e).s();
        assert!((s.x - 1.0).abs() < 1e-9);
        assert!((s.y - 1.0).abs() < 1e-9);
        assert!(s.z.abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_essential_without_normalization() -> Result<(), EpipolarError> {
        let (r, t, x1, x2) = scene();
        let k_inv = calibration().inverse();
        let x1c = transform_points(&k_inv, &x1)?;
        let x2c = transform_points(&k_inv, &x2)?;
        let e = essential_normalized(&x1c, &x2c, None, None, false)?;
        assert!(max_abs_diff_up_to_sign(&e, &essential_from_pose(&r, t)) < 1e-6);
        Ok(())
    }

    #[test]
    fn test_fundamental_essential_roundtrip() -> Result<(), EpipolarError> {
        let (r, t, _, _) = scene();
        let k = calibration();
        let f = fundamental_from_pose(&r, t, &k)?;
        let e = essential_from_fundamental(&f, &k, &k);
        assert!(max_abs_diff_up_to_sign(&e, &essential_from_pose(&r, t)) < 1e-9);
        Ok(())
    }

    #[test]
    fn test_enforce_essential_constraints() {
        let e = DMat3::from_cols(
            DVec3::new(0.1, 0.2, -0.3),
            DVec3::new(0.4, -0.1, 0.2),
            DVec3::new(-0.2, 0.5, 0.3),
        );
        let s = *svd3(&enforce_essential_constraints(&e)).s();
        assert!((s.x - 1.0).abs() < 1e-12);
        assert!((s.y - 1.0).abs() < 1e-12);
        assert!(s.z.abs() < 1e-12);
    }

    #[test]
    fn test_singular_calibration() {
        let (_, _, x1, x2) = scene();
        let k = DMat3::from_cols(DVec3::X, DVec3::X, DVec3::Z);
        let res = essential_normalized(&x1, &x2, Some(&k), None, true);
        assert!(matches!(res, Err(EpipolarError::DegenerateGeometry(_))));
    }
}
