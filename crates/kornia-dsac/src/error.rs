use kornia_epipolar::EpipolarError;
use thiserror::Error;

/// Errors raised by the differentiable sample consensus estimator.
#[derive(Debug, Error)]
pub enum DsacError {
    /// Fewer correspondences than the sample size, detected before any sampling.
    #[error("Need at least {required} correspondences, got {actual}")]
    InsufficientCorrespondences {
        /// Minimum number of correspondences required.
        required: usize,
        /// Number of correspondences provided.
        actual: usize,
    },

    /// The two point sets have different lengths.
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

    /// The configuration is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Error from the geometry kernel.
    #[error(transparent)]
    Epipolar(#[from] EpipolarError),
}
