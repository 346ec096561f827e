//! # Scoring
//!
//! Distances between correspondences and a model, and their smooth relaxation into a
//! soft inlier count:
//!
//! ```text
//! w_i   = 1 - sigmoid(beta * (d_i - tau))
//! score = sum_i w_i
//! ```
//!
//! Unlike the hard indicator `d_i < tau`, the soft count is differentiable in the
//! distances, which is what makes the hypothesis selection trainable.

use glam::{DMat3, DVec2};

use crate::error::{check_correspondences, EpipolarError};
use crate::solver::{GeometryModel, Hypothesis};

/// Algebraic epipolar residual `x2^T M x1` of every correspondence.
pub fn epipolar_residuals(m: &DMat3, x1: &[DVec2], x2: &[DVec2]) -> Vec<f64> {
    x1.iter()
        .zip(x2.iter())
        .map(|(p1, p2)| p2.extend(1.0).dot(*m * p1.extend(1.0)))
        .collect()
}

/// Sampson distance of a correspondence under a fundamental (or essential) matrix.
///
/// `(x2^T F x1)^2 / ((F x1)_0^2 + (F x1)_1^2 + (F^T x2)_0^2 + (F^T x2)_1^2)`
///
/// Returns `f64::INFINITY` when the denominator vanishes.
pub fn sampson_distance(f: &DMat3, x1: &DVec2, x2: &DVec2) -> f64 {
    let p1 = x1.extend(1.0);
    let p2 = x2.extend(1.0);
    let fx1 = *f * p1;
    let ftx2 = f.transpose() * p2;
    let num = p2.dot(fx1).powi(2);
    let den = fx1.x * fx1.x + fx1.y * fx1.y + ftx2.x * ftx2.x + ftx2.y * ftx2.y;
    if !(den > 0.0) {
        return f64::INFINITY;
    }
    num / den
}

/// Euclidean distance between `H * x1` and `x2`.
///
/// Returns `f64::INFINITY` when `x1` is mapped to infinity.
pub fn homography_transfer_error(h: &DMat3, x1: &DVec2, x2: &DVec2) -> f64 {
    let hx = *h * x1.extend(1.0);
    if !(hx.z.abs() > f64::EPSILON) {
        return f64::INFINITY;
    }
    (hx.truncate() / hx.z - *x2).length()
}

/// Point-to-model distance of every correspondence.
///
/// Sampson distance for fundamental and essential matrices, transfer error for homographies.
pub fn point_distances(
    model: GeometryModel,
    matrix: &DMat3,
    x1: &[DVec2],
    x2: &[DVec2],
) -> Vec<f64> {
    let distance: fn(&DMat3, &DVec2, &DVec2) -> f64 = match model {
        GeometryModel::Fundamental | GeometryModel::Essential => sampson_distance,
        GeometryModel::Homography => homography_transfer_error,
    };
    x1.iter()
        .zip(x2.iter())
        .map(|(p1, p2)| {
            let d = distance(matrix, p1, p2);
            if d.is_nan() {
                f64::INFINITY
            } else {
                d
            }
        })
        .collect()
}

/// Indices of the `n` correspondences with the smallest Sampson distance to `f`, best first.
pub fn best_correspondences(f: &DMat3, x1: &[DVec2], x2: &[DVec2], n: usize) -> Vec<usize> {
    let distances = point_distances(GeometryModel::Fundamental, f, x1, x2);
    let mut order = (0..distances.len()).collect::<Vec<_>>();
    order.sort_by(|&a, &b| distances[a].total_cmp(&distances[b]));
    order.truncate(n);
    order
}

/// Logistic function, evaluated without overflow for large `|x|`.
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Soft inlier weight `1 - sigmoid(beta * (distance - threshold))`.
///
/// `NaN` distances count as outliers.
pub fn soft_inlier_weight(distance: f64, threshold: f64, beta: f64) -> f64 {
    if distance.is_nan() {
        return 0.0;
    }
    // 1 - sigmoid(z) == sigmoid(-z)
    sigmoid(beta * (threshold - distance))
}

/// Per-point soft inlier weights of a hypothesis and their sum.
#[derive(Debug, Clone, PartialEq)]
pub struct SoftInlierScores {
    /// Aggregate hypothesis score, the sum of `weights`.
    pub score: f64,
    /// Soft inlier weight of every correspondence, in `[0, 1]`.
    pub weights: Vec<f64>,
    /// Point-to-model distance of every correspondence.
    pub distances: Vec<f64>,
    /// Sharpness used to compute the weights.
    pub beta: f64,
}

impl SoftInlierScores {
    /// Score the given distances.
    pub fn from_distances(distances: Vec<f64>, threshold: f64, beta: f64) -> Self {
        let weights = distances
            .iter()
            .map(|&d| soft_inlier_weight(d, threshold, beta))
            .collect::<Vec<_>>();
        let score = weights.iter().sum();
        Self {
            score,
            weights,
            distances,
            beta,
        }
    }

    /// Gradient of `score` with respect to each distance, `-beta * w_i * (1 - w_i)`.
    pub fn distance_gradients(&self) -> Vec<f64> {
        self.weights
            .iter()
            .map(|&w| -self.beta * w * (1.0 - w))
            .collect()
    }

    /// Hard inlier mask, `distance < threshold`.
    pub fn inlier_mask(&self, threshold: f64) -> Vec<bool> {
        self.distances.iter().map(|&d| d < threshold).collect()
    }
}

/// Soft inlier count of a hypothesis over the full correspondence set.
///
/// # Arguments
///
/// * `hypothesis` - The model to score.
/// * `x1` - Points in image 1.
/// * `x2` - Corresponding points in image 2.
/// * `threshold` - Inlier distance threshold `tau`, in the units of the model distance.
/// * `beta` - Sharpness of the soft cutoff.
pub fn soft_inlier_scores(
    hypothesis: &Hypothesis,
    x1: &[DVec2],
    x2: &[DVec2],
    threshold: f64,
    beta: f64,
) -> Result<SoftInlierScores, EpipolarError> {
    check_correspondences(x1, x2, 0)?;
    let distances = point_distances(hypothesis.model, &hypothesis.matrix, x1, x2);
    Ok(SoftInlierScores::from_distances(distances, threshold, beta))
}
