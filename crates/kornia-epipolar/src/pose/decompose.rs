use glam::{DMat3, DVec3};

use crate::linalg::svd3;

/// A relative pose `X2 = R * X1 + t` proposed by an essential matrix decomposition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseCandidate {
    /// Rotation from view 1 to view 2.
    pub rotation: DMat3,
    /// Unit translation from view 1 to view 2.
    pub translation: DVec3,
}

/// Decompose an essential matrix into its four candidate poses.
///
/// With `E = U * diag(1, 1, 0) * V^T` and `W = [[0, -1, 0], [1, 0, 0], [0, 0, 1]]`
/// (negated when `det(U W V^T) < 0`), the candidates are, in order:
/// `(U W V^T, t)`, `(U W V^T, -t)`, `(U W^T V^T, t)`, `(U W^T V^T, -t)` where `t` is the
/// normalized third column of `U`.
pub fn decompose_essential(e: &DMat3) -> [PoseCandidate; 4] {
    let svd = svd3(e);
    let u = *svd.u();
    let vt = svd.v().transpose();

    let mut w = DMat3::from_cols(
        DVec3::new(0.0, 1.0, 0.0),
        DVec3::new(-1.0, 0.0, 0.0),
        DVec3::new(0.0, 0.0, 1.0),
    );
    if (u * w * vt).determinant() < 0.0 {
        w = w * -1.0;
    }

    let r1 = u * w * vt;
    let r2 = u * w.transpose() * vt;

    let t = u.z_axis / u.z_axis.length();

    [
        PoseCandidate {
            rotation: r1,
            translation: t,
        },
        PoseCandidate {
            rotation: r1,
            translation: -t,
        },
        PoseCandidate {
            rotation: r2,
            translation: t,
        },
        PoseCandidate {
            rotation: r2,
            translation: -t,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::essential_from_pose;

    fn max_abs_diff(a: &DMat3, b: &DMat3) -> f64 {
        a.to_cols_array()
            .iter()
            .zip(b.to_cols_array().iter())
            .map(|(x, y)| (x - y).abs())
            .fold(0.0, f64::max)
    }

    #[test]
    fn test_decompose_essential_identity_rotation() {
        let r = DMat3::IDENTITY;
        let t = DVec3::new(1.0, 0.0, 0.0);
        let e = essential_from_pose(&r, t);

        let candidates = decompose_essential(&e);
        assert_eq!(candidates.len(), 4);

        let mut found = false;
        for c in candidates.iter() {
            assert!((c.rotation.determinant() - 1.0).abs() < 1e-12);
            assert!((c.translation.length() - 1.0).abs() < 1e-12);
            if c.translation.dot(t) > 0.999 && max_abs_diff(&c.rotation, &r) < 1e-9 {
                found = true;
            }
        }
        assert!(found);
    }

    #[test]
    fn test_decompose_essential_general_pose() {
        let r = DMat3::from_axis_angle(DVec3::new(0.3, -0.8, 0.5).normalize(), 0.4);
        let t = DVec3::new(-0.4, 0.2, 1.0);
        let t_unit = t / t.length();
        let candidates = decompose_essential(&essential_from_pose(&r, t));

        // both translation signs and both rotations of the twisted pair are present
        assert!(candidates[0].translation == -candidates[1].translation);
        assert!(candidates[0].rotation == candidates[1].rotation);
        assert!(candidates[2].rotation == candidates[3].rotation);

        let matches = candidates
            .iter()
            .filter(|c| {
                c.translation.dot(t_unit) > 0.999999 && max_abs_diff(&c.rotation, &r) < 1e-9
            })
            .count();
        assert_eq!(matches, 1);

        for c in candidates.iter() {
            let rtr = c.rotation.transpose() * c.rotation;
            assert!(max_abs_diff(&rtr, &DMat3::IDENTITY) < 1e-12);
        }
    }
}
