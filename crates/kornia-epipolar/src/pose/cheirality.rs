use glam::{DMat3, DVec2, DVec3};

use super::{decompose_essential, rotation_angle_error, triangulate_point, vector_angle, PoseErrors};
use crate::error::{check_correspondences, EpipolarError};
use crate::primitives::{calibration_inverse, transform_points};

/// Default upper bound on the depth of a triangulated point, in units of the baseline.
pub const DEFAULT_DEPTH_THRESHOLD: f64 = 50.0;

/// Minimum number of inliers required when an inlier mask is supplied.
const MIN_MASKED_CORRESPONDENCES: usize = 8;

/// The pose candidate selected by the cheirality test.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseEstimate {
    /// Rotation from view 1 to view 2.
    pub rotation: DMat3,
    /// Unit translation from view 1 to view 2.
    pub translation: DVec3,
    /// Number of correspondences in front of both cameras under the selected candidate.
    pub valid_count: usize,
    /// Index of the selected candidate in the [`decompose_essential`] order.
    pub candidate_index: usize,
    /// Number of valid correspondences under each of the four candidates.
    pub candidate_counts: [usize; 4],
    /// Valid triangulated points of the selected candidate, in the frame of view 1.
    pub points: Vec<DVec3>,
}

impl PoseEstimate {
    /// Pose of camera 2 expressed in the frame of camera 1, i.e. the inverse of `[R | t]`.
    pub fn camera_pose(&self) -> (DMat3, DVec3) {
        let rt = self.rotation.transpose();
        (rt, -(rt * self.translation))
    }

    /// Angular errors against a reference relative pose `X2 = R_gt * X1 + t_gt`.
    ///
    /// The translation is only compared by direction since an essential matrix fixes it
    /// up to scale.
    pub fn errors(&self, rotation_gt: &DMat3, translation_gt: &DVec3) -> PoseErrors {
        PoseErrors {
            rotation_deg: rotation_angle_error(&self.rotation, rotation_gt),
            translation_deg: vector_angle(&self.translation, translation_gt),
        }
    }
}

/// Recover the relative pose encoded by an essential matrix.
///
/// Every (optionally masked) correspondence is triangulated under each of the four
/// candidates of [`decompose_essential`]. A point is valid when its depth lies strictly
/// within `(0, depth_threshold)` in both cameras; the candidate with the most valid points
/// wins, the first one on ties.
///
/// # Arguments
///
/// * `essential` - The essential matrix relating the calibrated views.
/// * `x1` - Pixel coordinates in image 1.
/// * `x2` - Corresponding pixel coordinates in image 2.
/// * `calibration` - Intrinsic matrix `K` shared by both views.
/// * `inlier_mask` - Optional selection of the correspondences to triangulate.
/// * `depth_threshold` - Upper bound on valid depths, see [`DEFAULT_DEPTH_THRESHOLD`].
///
/// # Errors
///
/// [`EpipolarError::PoseAmbiguity`] when no candidate has a single valid point, and
/// [`EpipolarError::InsufficientCorrespondences`] when the mask keeps fewer than eight.
pub fn disambiguate_pose(
    essential: &DMat3,
    x1: &[DVec2],
    x2: &[DVec2],
    calibration: &DMat3,
    inlier_mask: Option<&[bool]>,
    depth_threshold: f64,
) -> Result<PoseEstimate, EpipolarError> {
    if !(depth_threshold.is_finite() && depth_threshold > 0.0) {
        return Err(EpipolarError::InvalidParameter(format!(
            "depth threshold must be positive and finite, got {depth_threshold}"
        )));
    }
    check_correspondences(x1, x2, 0)?;

    let selected = match inlier_mask {
        Some(mask) => {
            if mask.len() != x1.len() {
                return Err(EpipolarError::MismatchedLengths {
                    left_name: "inlier mask",
                    left_len: mask.len(),
                    right_name: "correspondences",
                    right_len: x1.len(),
                });
            }
            let selected = (0..x1.len()).filter(|&i| mask[i]).collect::<Vec<_>>();
            if selected.len() < MIN_MASKED_CORRESPONDENCES {
                return Err(EpipolarError::InsufficientCorrespondences {
                    required: MIN_MASKED_CORRESPONDENCES,
                    actual: selected.len(),
                });
            }
            selected
        }
        None => {
            check_correspondences(x1, x2, 1)?;
            (0..x1.len()).collect()
        }
    };

    let k_inv = calibration_inverse(calibration)?;
    let x1n = transform_points(&k_inv, &selected.iter().map(|&i| x1[i]).collect::<Vec<_>>())?;
    let x2n = transform_points(&k_inv, &selected.iter().map(|&i| x2[i]).collect::<Vec<_>>())?;

    let candidates = decompose_essential(essential);

    let mut candidate_counts = [0usize; 4];
    let mut candidate_points: [Vec<DVec3>; 4] = Default::default();
    for (c, candidate) in candidates.iter().enumerate() {
        for (p1, p2) in x1n.iter().zip(x2n.iter()) {
            let Some(point) =
                triangulate_point(p1, p2, &candidate.rotation, &candidate.translation)
            else {
                continue;
            };
            let depth1 = point.z;
            let depth2 = (candidate.rotation * point + candidate.translation).z;
            if in_front(depth1, depth_threshold) && in_front(depth2, depth_threshold) {
                candidate_points[c].push(point);
            }
        }
        candidate_counts[c] = candidate_points[c].len();
    }

    log::debug!("valid points per pose candidate: {candidate_counts:?}");

    let mut best = 0;
    for c in 1..4 {
        if candidate_counts[c] > candidate_counts[best] {
            best = c;
        }
    }

    if candidate_counts[best] == 0 {
        return Err(EpipolarError::PoseAmbiguity {
            counts: candidate_counts,
        });
    }

    Ok(PoseEstimate {
        rotation: candidates[best].rotation,
        translation: candidates[best].translation,
        valid_count: candidate_counts[best],
        candidate_index: best,
        candidate_counts,
        points: std::mem::take(&mut candidate_points[best]),
    })
}

fn in_front(depth: f64, depth_threshold: f64) -> bool {
    depth > 0.0 && depth < depth_threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::essential_from_pose;
    use approx::assert_relative_eq;

    fn calibration() -> DMat3 {
        DMat3::from_cols(
            DVec3::new(500.0, 0.0, 0.0),
            DVec3::new(0.0, 500.0, 0.0),
            DVec3::new(320.0, 240.0, 1.0),
        )
    }

    fn project(k: &DMat3, x: DVec3) -> DVec2 {
        let p = *k * x;
        DVec2::new(p.x / p.z, p.y / p.z)
    }

    fn scene(r: &DMat3, t: DVec3, k: &DMat3) -> (Vec<DVec2>, Vec<DVec2>) {
        let mut x1 = Vec::new();
        let mut x2 = Vec::new();
        for i in 0..20 {
            let fi = i as f64;
            let x = DVec3::new(
                (fi * 0.37).sin() * 2.0,
                (fi * 0.91).cos() * 1.5,
                4.0 + (fi * 0.53).sin().abs() * 6.0,
            );
            x1.push(project(k, x));
            x2.push(project(k, *r * x + t));
        }
        (x1, x2)
    }

    #[test]
    fn test_disambiguate_pose_selects_true_candidate() -> Result<(), EpipolarError> {
        let k = calibration();
        let r = DMat3::from_rotation_y(0.1) * DMat3::from_rotation_x(-0.05);
        let t = DVec3::new(-1.0, 0.1, 0.2);
        let (x1, x2) = scene(&r, t, &k);

        let e = essential_from_pose(&r, t);
        let pose = disambiguate_pose(&e, &x1, &x2, &k, None, DEFAULT_DEPTH_THRESHOLD)?;

        assert_eq!(pose.valid_count, x1.len());
        assert_eq!(pose.points.len(), x1.len());
        assert_eq!(pose.candidate_counts[pose.candidate_index], x1.len());
        assert_eq!(pose.candidate_counts.iter().filter(|&&c| c == x1.len()).count(), 1);

        let errors = pose.errors(&r, &t);
        assert!(errors.rotation_deg < 1e-4);
        assert!(errors.translation_deg < 1e-4);

        let (r_cam, t_cam) = pose.camera_pose();
        assert_relative_eq!((r_cam * pose.rotation).determinant(), 1.0, epsilon = 1e-12);
        assert_relative_eq!((r_cam * pose.translation + t_cam).length(), 0.0, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn test_disambiguate_pose_with_mask() -> Result<(), EpipolarError> {
        let k = calibration();
        let r = DMat3::from_rotation_z(0.05);
        let t = DVec3::new(0.8, -0.2, 0.1);
        let (x1, x2) = scene(&r, t, &k);

        let mask = (0..x1.len()).map(|i| i % 2 == 0).collect::<Vec<_>>();
        let e = essential_from_pose(&r, t);
        let mask = Some(mask.as_slice());
        let pose = disambiguate_pose(&e, &x1, &x2, &k, mask, DEFAULT_DEPTH_THRESHOLD)?;
        assert_eq!(pose.valid_count, 10);
        Ok(())
    }

    #[test]
    fn test_disambiguate_pose_small_mask() {
        let k = calibration();
        let r = DMat3::IDENTITY;
        let t = DVec3::X;
        let (x1, x2) = scene(&r, t, &k);

        let mask = (0..x1.len()).map(|i| i < 7).collect::<Vec<_>>();
        let e = essential_from_pose(&r, t);
        let res = disambiguate_pose(&e, &x1, &x2, &k, Some(&mask[..]), DEFAULT_DEPTH_THRESHOLD);
        assert!(matches!(
            res,
            Err(EpipolarError::InsufficientCorrespondences {
                required: 8,
                actual: 7
            })
        ));

        let res = disambiguate_pose(&e, &x1, &x2, &k, Some(&mask[..5]), DEFAULT_DEPTH_THRESHOLD);
        assert!(matches!(res, Err(EpipolarError::MismatchedLengths { .. })));
    }

    #[test]
    fn test_disambiguate_pose_invalid_threshold() {
        let k = calibration();
        let (x1, x2) = scene(&DMat3::IDENTITY, DVec3::X, &k);
        let e = essential_from_pose(&DMat3::IDENTITY, DVec3::X);
        for threshold in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let res = disambiguate_pose(&e, &x1, &x2, &k, None, threshold);
            assert!(matches!(res, Err(EpipolarError::InvalidParameter(_))));
        }
    }

    #[test]
    fn test_disambiguate_pose_no_valid_candidate() {
        // identical observations under a sideways translation: the rays are parallel for
        // the true rotation and the twisted pair puts every point behind one camera
        let k = DMat3::IDENTITY;
        let x1 = (0..12)
            .map(|i| {
                let fi = i as f64;
                DVec2::new(0.1 + 0.05 * fi, if i % 2 == 0 { 0.2 } else { -0.3 })
            })
            .collect::<Vec<_>>();
        let x2 = x1.clone();
        let e = essential_from_pose(&DMat3::IDENTITY, DVec3::X);

        match disambiguate_pose(&e, &x1, &x2, &k, None, DEFAULT_DEPTH_THRESHOLD) {
            Err(EpipolarError::PoseAmbiguity { counts }) => assert_eq!(counts, [0; 4]),
            other => panic!("expected a pose ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn test_disambiguate_pose_depth_beyond_threshold() {
        let k = calibration();
        let r = DMat3::IDENTITY;
        let t = DVec3::new(1.0, 0.0, 0.0);
        let (x1, x2) = scene(&r, t, &k);
        let e = essential_from_pose(&r, t);

        // every point lies at a depth of at least four baselines
        let res = disambiguate_pose(&e, &x1, &x2, &k, None, 2.0);
        assert!(matches!(res, Err(EpipolarError::PoseAmbiguity { .. })));
    }
}
