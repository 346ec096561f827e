//! # Minimal solvers
//!
//! Normalized direct linear transform (DLT) for the three two-view models:
//!
//! - [`fundamental`](fundamental_normalized): rank-2 matrix in pixel space, one row per point
//! - [`essential`](essential_normalized): calibrated fundamental matrix, singular values `(1, 1, 0)`
//! - [`homography`](homography_dlt): planar mapping, two equations per correspondence
//!
//! All three share the same structure: Hartley-normalize both point sets, stack one
//! (or two) rows per correspondence, take the right singular vector of the smallest
//! singular value, enforce the model constraint and undo the normalization.

use glam::{DMat3, DVec2};
use serde::{Deserialize, Serialize};

use crate::error::{check_correspondences, EpipolarError};

mod essential;
pub use essential::*;

mod fundamental;
pub use fundamental::*;

mod homography;
pub use homography::*;

/// The two-view model estimated by the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryModel {
    /// Fundamental matrix, `x2^T F x1 = 0` in pixel coordinates.
    Fundamental,
    /// Essential matrix, `x2^T E x1 = 0` in calibrated coordinates.
    Essential,
    /// Homography, `x2 ~ H x1`.
    #[default]
    Homography,
}

impl GeometryModel {
    /// Minimum number of correspondences the linear solver accepts for this model.
    pub const fn min_correspondences(&self) -> usize {
        match self {
            GeometryModel::Homography => 4,
            GeometryModel::Fundamental | GeometryModel::Essential => 8,
        }
    }
}

/// Optional inputs of [`estimate_geometry`].
#[derive(Debug, Clone, Copy)]
pub struct SolverOptions<'a> {
    /// Intrinsic matrix `K` shared by both views. Only used by the essential model,
    /// where points are mapped through `K^-1` before solving. When absent the points
    /// are assumed to be calibrated already.
    pub calibration: Option<&'a DMat3>,
    /// Per-correspondence weights. Row `i` of the linear system is scaled by `weights[i]`,
    /// i.e. the design matrix is left-multiplied by `diag(weights)`.
    pub weights: Option<&'a [f64]>,
    /// Apply Hartley normalization before solving.
    pub normalize: bool,
}

impl Default for SolverOptions<'_> {
    fn default() -> Self {
        Self {
            calibration: None,
            weights: None,
            normalize: true,
        }
    }
}

/// A model matrix together with the correspondences it was fitted on.
#[derive(Debug, Clone, PartialEq)]
pub struct Hypothesis {
    /// Which model `matrix` represents.
    pub model: GeometryModel,
    /// The 3x3 model matrix.
    pub matrix: DMat3,
    /// Indices of the correspondences used to produce `matrix`.
    pub sample: Vec<usize>,
}

/// Fit a model to all given correspondences.
///
/// Needs at least [`GeometryModel::min_correspondences`] correspondences. The returned
/// hypothesis references every input index.
pub fn estimate_geometry(
    x1: &[DVec2],
    x2: &[DVec2],
    model: GeometryModel,
    options: &SolverOptions<'_>,
) -> Result<Hypothesis, EpipolarError> {
    check_correspondences(x1, x2, model.min_correspondences())?;

    let matrix = match model {
        GeometryModel::Fundamental => {
            fundamental_normalized(x1, x2, options.weights, options.normalize)?
        }
        GeometryModel::Essential => essential_normalized(
            x1,
            x2,
            options.calibration,
            options.weights,
            options.normalize,
        )?,
        GeometryModel::Homography => homography_dlt(x1, x2, options.weights, options.normalize)?,
    };

    Ok(Hypothesis {
        model,
        matrix,
        sample: (0..x1.len()).collect(),
    })
}

/// Fit a model to the subset `sample` of the correspondences.
pub fn fit_sample(
    x1: &[DVec2],
    x2: &[DVec2],
    sample: &[usize],
    model: GeometryModel,
    options: &SolverOptions<'_>,
) -> Result<Hypothesis, EpipolarError> {
    check_correspondences(x1, x2, 0)?;
    if let Some(&idx) = sample.iter().find(|&&idx| idx >= x1.len()) {
        return Err(EpipolarError::InvalidParameter(format!(
            "sample index {idx} out of range for {} correspondences",
            x1.len()
        )));
    }

    let s1 = sample.iter().map(|&i| x1[i]).collect::<Vec<_>>();
    let s2 = sample.iter().map(|&i| x2[i]).collect::<Vec<_>>();
    let weights = options
        .weights
        .map(|w| -> Result<Vec<f64>, EpipolarError> {
            check_weights(w, x1.len())?;
            Ok(sample.iter().map(|&i| w[i]).collect())
        })
        .transpose()?;

    let sub_options = SolverOptions {
        calibration: options.calibration,
        weights: weights.as_deref(),
        normalize: options.normalize,
    };

    let mut hypothesis = estimate_geometry(&s1, &s2, model, &sub_options)?;
    hypothesis.sample = sample.to_vec();
    Ok(hypothesis)
}

pub(crate) fn check_weights(weights: &[f64], n: usize) -> Result<(), EpipolarError> {
    if weights.len() != n {
        return Err(EpipolarError::MismatchedLengths {
            left_name: "weights",
            left_len: weights.len(),
            right_name: "correspondences",
            right_len: n,
        });
    }
    Ok(())
}

/// Normalize both point sets, or return them unchanged with identity transforms.
pub(crate) fn condition_points(
    x1: &[DVec2],
    x2: &[DVec2],
    normalize: bool,
) -> Result<(Vec<DVec2>, DMat3, Vec<DVec2>, DMat3), EpipolarError> {
    if normalize {
        let (x1n, t1) = crate::primitives::normalize_points(x1)?;
        let (x2n, t2) = crate::primitives::normalize_points(x2)?;
        Ok((x1n, t1, x2n, t2))
    } else {
        Ok((x1.to_vec(), DMat3::IDENTITY, x2.to_vec(), DMat3::IDENTITY))
    }
}
