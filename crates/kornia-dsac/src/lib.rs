#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Kornia DSAC
//!
//! Classical RANSAC keeps the hypothesis with the most inliers, a hard `argmax` over a
//! hard count. [`Dsac`] replaces both with smooth counterparts: hypotheses are scored by
//! a sigmoid-relaxed inlier count, and selection can be expressed as a softmax
//! distribution over scores ([`DsacOutput::hypothesis_distribution`]), so a task loss on
//! the selected model has gradients with respect to every score.
//!
//! Besides the best hypothesis, every call returns the average score of the hypotheses
//! each correspondence was sampled into, a per-point signal that can weight a refit or
//! supervise a matcher.
//!
//! ## Example
//!
//! ```rust
//! use glam::{DMat3, DVec2, DVec3};
//! use kornia_dsac::{Dsac, DsacConfig};
//!
//! let h = DMat3::from_cols(
//!     DVec3::new(1.0, 0.1, 0.0),
//!     DVec3::new(-0.1, 1.0, 0.0),
//!     DVec3::new(4.0, 2.0, 1.0),
//! );
//! let x1 = (0..20)
//!     .map(|i| DVec2::new((i % 5) as f64 * 10.0 + i as f64 * 0.3, (i / 5) as f64 * 8.0))
//!     .collect::<Vec<_>>();
//! let x2 = x1
//!     .iter()
//!     .map(|p| {
//!         let q = h * p.extend(1.0);
//!         DVec2::new(q.x / q.z, q.y / q.z)
//!     })
//!     .collect::<Vec<_>>();
//!
//! let dsac = Dsac::new(DsacConfig { hypotheses: 32, ..Default::default() })?;
//! let output = dsac.run_seeded(&x1, &x2)?;
//! assert_eq!(output.point_scores.len(), 20);
//! # Ok::<(), kornia_dsac::DsacError>(())
//! ```

/// Per-point score accumulation.
pub mod accumulator;

/// Estimator configuration.
pub mod config;

/// Error types.
pub mod error;

/// The sampling loop.
pub mod estimator;

/// Estimation results and the softmax selection over hypotheses.
pub mod output;

pub use accumulator::PointScoreAccumulator;
pub use config::DsacConfig;
pub use error::DsacError;
pub use estimator::{run_differentiable_ransac, Dsac};
pub use output::{DsacOutput, ScoredHypothesis};

/// Re-export of the geometry kernel.
pub use kornia_epipolar as epipolar;
