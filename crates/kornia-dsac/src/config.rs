use glam::DMat3;
use kornia_epipolar::linalg::mat3_from_rows;
use kornia_epipolar::solver::GeometryModel;
use serde::{Deserialize, Serialize};

use crate::error::DsacError;

/// Hyperparameters of the estimator.
///
/// Missing fields take their default when deserialized, so a configuration file only
/// needs to list what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DsacConfig {
    /// Number of hypotheses sampled per call.
    pub hypotheses: usize,
    /// Number of correspondences per minimal sample.
    pub sample_size: usize,
    /// Distance below which a correspondence counts as an inlier, `tau`.
    pub inlier_threshold: f64,
    /// Sharpness of the sigmoid relaxing the inlier indicator, `beta`.
    pub inlier_beta: f64,
    /// Inverse temperature of the softmax over hypothesis scores, `alpha`.
    pub inlier_alpha: f64,
    /// Geometric model fitted to every sample.
    pub model: GeometryModel,
    /// Row-major intrinsic matrix shared by both views. When it is set, essential models
    /// are fitted in calibrated coordinates and scored in pixels through `F = K^-T E K^-1`.
    pub calibration: Option<[[f64; 3]; 3]>,
    /// Seed of the sampler used by [`crate::Dsac::run_seeded`], `None` draws from entropy.
    pub random_seed: Option<u64>,
}

impl Default for DsacConfig {
    fn default() -> Self {
        Self {
            hypotheses: 256,
            sample_size: 5,
            inlier_threshold: 1.0,
            inlier_beta: 5.0,
            inlier_alpha: 0.5,
            model: GeometryModel::Homography,
            calibration: None,
            random_seed: Some(0),
        }
    }
}

impl DsacConfig {
    /// Five-point homography hypotheses, the default.
    pub fn homography() -> Self {
        Self::default()
    }

    /// Eight-point fundamental matrix hypotheses.
    pub fn fundamental() -> Self {
        Self {
            sample_size: 8,
            model: GeometryModel::Fundamental,
            ..Default::default()
        }
    }

    /// Eight-point essential matrix hypotheses for the given intrinsics.
    pub fn essential(calibration: [[f64; 3]; 3]) -> Self {
        Self {
            sample_size: 8,
            model: GeometryModel::Essential,
            calibration: Some(calibration),
            ..Default::default()
        }
    }

    /// Check that every parameter is in range.
    pub fn validate(&self) -> Result<(), DsacError> {
        if self.hypotheses == 0 {
            return Err(DsacError::InvalidConfig(
                "hypotheses must be at least 1".to_string(),
            ));
        }
        let min = self.model.min_correspondences();
        if self.sample_size < min {
            return Err(DsacError::InvalidConfig(format!(
                "sample_size {} is below the {min} correspondences a {:?} model needs",
                self.sample_size, self.model
            )));
        }
        if !(self.inlier_threshold.is_finite() && self.inlier_threshold > 0.0) {
            return Err(DsacError::InvalidConfig(format!(
                "inlier_threshold must be positive, got {}",
                self.inlier_threshold
            )));
        }
        if !(self.inlier_beta.is_finite() && self.inlier_beta > 0.0) {
            return Err(DsacError::InvalidConfig(format!(
                "inlier_beta must be positive, got {}",
                self.inlier_beta
            )));
        }
        if !(self.inlier_alpha.is_finite() && self.inlier_alpha >= 0.0) {
            return Err(DsacError::InvalidConfig(format!(
                "inlier_alpha must be non-negative, got {}",
                self.inlier_alpha
            )));
        }
        if let Some(k) = &self.calibration {
            if k.iter().flatten().any(|v| !v.is_finite()) {
                return Err(DsacError::InvalidConfig(
                    "calibration contains non-finite entries".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// The calibration as a matrix.
    pub fn calibration_matrix(&self) -> Option<DMat3> {
        self.calibration.as_ref().map(mat3_from_rows)
    }
}
