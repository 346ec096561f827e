use glam::DVec2;
use thiserror::Error;

/// Errors raised by the epipolar geometry kernel.
///
/// None of these are transient: they describe input that cannot produce a
/// meaningful model and are returned to the caller as soon as they are detected.
#[derive(Debug, Error)]
pub enum EpipolarError {
    /// Normalization or de-homogenization met a near-zero scale or denominator.
    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// Fewer correspondences than the operation needs.
    #[error("Need at least {required} correspondences, got {actual}")]
    InsufficientCorrespondences {
        /// Minimum number of correspondences required.
        required: usize,
        /// Number of correspondences provided.
        actual: usize,
    },

    /// Two arrays that must be parallel have different lengths.
    #[error("Mismatched array lengths: {left_name} ({left_len}) != {right_name} ({right_len})")]
    MismatchedLengths {
        /// Label for the left-hand slice.
        left_name: &'static str,
        /// Length of the left-hand slice.
        left_len: usize,
        /// Label for the right-hand slice.
        right_name: &'static str,
        /// Length of the right-hand slice.
        right_len: usize,
    },

    /// None of the four pose candidates places a single point in front of both cameras.
    #[error("No pose candidate satisfies cheirality, valid points per candidate: {counts:?}")]
    PoseAmbiguity {
        /// Number of valid points under each of the four candidates.
        counts: [usize; 4],
    },

    /// A scalar parameter is out of its valid range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

pub(crate) fn check_correspondences(
    x1: &[DVec2],
    x2: &[DVec2],
    required: usize,
) -> Result<(), EpipolarError> {
    if x1.len() != x2.len() {
        return Err(EpipolarError::MismatchedLengths {
            left_name: "points in view 1",
            left_len: x1.len(),
            right_name: "points in view 2",
            right_len: x2.len(),
        });
    }
    if x1.len() < required {
        return Err(EpipolarError::InsufficientCorrespondences {
            required,
            actual: x1.len(),
        });
    }
    Ok(())
}
