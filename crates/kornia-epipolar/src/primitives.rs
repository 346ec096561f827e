use glam::{DMat3, DVec2, DVec3};

use crate::error::EpipolarError;
use crate::linalg;

/// Append a unit third coordinate to every point.
pub fn to_homogeneous(points: &[DVec2]) -> Vec<DVec3> {
    points.iter().map(|p| p.extend(1.0)).collect()
}

/// Divide a homogeneous point by its last coordinate.
///
/// Fails with [`EpipolarError::DegenerateGeometry`] when the last coordinate is
/// within machine epsilon of zero (a point at infinity).
pub fn dehomogenize(point: DVec3) -> Result<DVec2, EpipolarError> {
    if !(point.z.abs() > f64::EPSILON) {
        return Err(EpipolarError::DegenerateGeometry(format!(
            "cannot de-homogenize a point with w = {:e}",
            point.z
        )));
    }
    Ok(point.truncate() / point.z)
}

/// Remove the homogeneous coordinate from every point.
///
/// Fails on the first point whose last coordinate is ~0.
pub fn from_homogeneous(points: &[DVec3]) -> Result<Vec<DVec2>, EpipolarError> {
    points.iter().map(|&p| dehomogenize(p)).collect()
}

/// Apply a projective 3x3 transform to 2D points, e.g. `K^-1` to go from pixel to
/// calibrated coordinates.
pub fn transform_points(m: &DMat3, points: &[DVec2]) -> Result<Vec<DVec2>, EpipolarError> {
    points.iter().map(|p| dehomogenize(*m * p.extend(1.0))).collect()
}

/// Invert a calibration matrix.
pub fn calibration_inverse(k: &DMat3) -> Result<DMat3, EpipolarError> {
    linalg::checked_inverse(k).ok_or_else(|| {
        EpipolarError::DegenerateGeometry("calibration matrix is not invertible".to_string())
    })
}

/// Hartley normalization of a 2D point set.
///
/// Computes the similarity `T = [[s, 0, -s*cx], [0, s, -s*cy], [0, 0, 1]]` that moves the
/// centroid to the origin and scales the points to a mean distance of `sqrt(2)`.
///
/// Returns the normalized points together with `T`.
///
/// Fails with [`EpipolarError::DegenerateGeometry`] when all points coincide.
pub fn normalize_points(points: &[DVec2]) -> Result<(Vec<DVec2>, DMat3), EpipolarError> {
    if points.is_empty() {
        return Err(EpipolarError::InsufficientCorrespondences {
            required: 1,
            actual: 0,
        });
    }

    let n = points.len() as f64;
    let centroid = points.iter().fold(DVec2::ZERO, |acc, p| acc + *p) / n;
    let mean_dist = points.iter().map(|p| (*p - centroid).length()).sum::<f64>() / n;

    if !mean_dist.is_finite() || mean_dist <= f64::EPSILON * centroid.length().max(1.0) {
        return Err(EpipolarError::DegenerateGeometry(format!(
            "cannot normalize points with mean distance {mean_dist:e} to their centroid"
        )));
    }

    let scale = std::f64::consts::SQRT_2 / mean_dist;
    let normalized = points.iter().map(|p| (*p - centroid) * scale).collect();
    let transform = DMat3::from_cols(
        DVec3::new(scale, 0.0, 0.0),
        DVec3::new(0.0, scale, 0.0),
        DVec3::new(-scale * centroid.x, -scale * centroid.y, 1.0),
    );

    Ok((normalized, transform))
}

/// Cross-product matrix `[v]x`, such that `[v]x * w == v.cross(w)`.
pub fn skew_symmetric(v: DVec3) -> DMat3 {
    DMat3::from_cols(
        DVec3::new(0.0, v.z, -v.y),
        DVec3::new(-v.z, 0.0, v.x),
        DVec3::new(v.y, -v.x, 0.0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_homogeneous_roundtrip() -> Result<(), EpipolarError> {
        let points = vec![DVec2::new(1.0, 2.0), DVec2::new(-3.5, 0.25)];
        let homo = to_homogeneous(&points);
        assert_eq!(homo[1], DVec3::new(-3.5, 0.25, 1.0));

        let scaled = homo.iter().map(|p| *p * 4.0).collect::<Vec<_>>();
        assert_eq!(from_homogeneous(&scaled)?, points);
        Ok(())
    }

    #[test]
    fn test_dehomogenize_at_infinity() {
        let res = from_homogeneous(&[DVec3::new(1.0, 1.0, 1.0), DVec3::new(1.0, 2.0, 0.0)]);
        assert!(matches!(res, Err(EpipolarError::DegenerateGeometry(_))));

        let res = dehomogenize(DVec3::new(1.0, 2.0, f64::EPSILON * 0.5));
        assert!(matches!(res, Err(EpipolarError::DegenerateGeometry(_))));
    }

    #[test]
    fn test_normalize_points() -> Result<(), EpipolarError> {
        let points = vec![
            DVec2::new(100.0, 200.0),
            DVec2::new(340.0, 20.0),
            DVec2::new(-15.0, 12.0),
            DVec2::new(7.0, 480.0),
            DVec2::new(640.0, 50.0),
        ];
        let (normalized, t) = normalize_points(&points)?;

        let n = normalized.len() as f64;
        let centroid = normalized.iter().fold(DVec2::ZERO, |acc, p| acc + *p) / n;
        assert_relative_eq!(centroid.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(centroid.y, 0.0, epsilon = 1e-12);

        let mean_dist = normalized.iter().map(|p| p.length()).sum::<f64>() / n;
        assert_relative_eq!(mean_dist, std::f64::consts::SQRT_2, epsilon = 1e-12);

        // T maps the original points onto the normalized ones
        for (p, q) in points.iter().zip(normalized.iter()) {
            let tp = dehomogenize(t * p.extend(1.0))?;
            assert_relative_eq!(tp.x, q.x, epsilon = 1e-12);
            assert_relative_eq!(tp.y, q.y, epsilon = 1e-12);
        }
        Ok(())
    }

    #[test]
    fn test_normalize_coincident_points() {
        let points = vec![DVec2::new(3.0, 4.0); 6];
        let res = normalize_points(&points);
        assert!(matches!(res, Err(EpipolarError::DegenerateGeometry(_))));
    }

    #[test]
    fn test_skew_symmetric() {
        let v = DVec3::new(0.3, -1.2, 2.0);
        let w = DVec3::new(-0.7, 0.4, 1.5);
        let s = skew_symmetric(v);
        let expected = v.cross(w);
        let got = s * w;
        assert_relative_eq!(got.x, expected.x, epsilon = 1e-12);
        assert_relative_eq!(got.y, expected.y, epsilon = 1e-12);
        assert_relative_eq!(got.z, expected.z, epsilon = 1e-12);
        assert_eq!(s.transpose(), s * -1.0);
    }

    #[test]
    fn test_transform_points_with_calibration() -> Result<(), EpipolarError> {
        let rows = [[500.0, 0.0, 320.0], [0.0, 400.0, 240.0], [0.0, 0.0, 1.0]];
        let k = linalg::mat3_from_rows(&rows);
        let k_inv = calibration_inverse(&k)?;
        let pts = transform_points(&k_inv, &[DVec2::new(320.0, 240.0), DVec2::new(820.0, 640.0)])?;
        assert_relative_eq!(pts[0].length(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(pts[1].x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(pts[1].y, 1.0, epsilon = 1e-12);
        Ok(())
    }
}
