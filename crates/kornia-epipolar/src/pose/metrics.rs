use glam::{DMat3, DVec3};

use crate::linalg::trace;

/// Angular errors of an estimated relative pose against a reference, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseErrors {
    /// Geodesic angle between the estimated and reference rotations.
    pub rotation_deg: f64,
    /// Angle between the estimated and reference translation directions.
    pub translation_deg: f64,
}

/// Geodesic distance between two rotations, `acos((trace(R_est^T R_gt) - 1) / 2)` in degrees.
pub fn rotation_angle_error(r_est: &DMat3, r_gt: &DMat3) -> f64 {
    let cos = (trace(&(r_est.transpose() * *r_gt)) - 1.0) / 2.0;
    cos.clamp(-1.0, 1.0).acos().to_degrees()
}

/// Angle between two vectors in degrees. `NaN` if either has zero length.
pub fn vector_angle(a: &DVec3, b: &DVec3) -> f64 {
    let denom = a.length() * b.length();
    if denom == 0.0 {
        return f64::NAN;
    }
    (a.dot(*b) / denom).clamp(-1.0, 1.0).acos().to_degrees()
}
