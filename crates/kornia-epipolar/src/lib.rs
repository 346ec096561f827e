#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Kornia Epipolar
//!
//! - [`primitives`] : homogeneous coordinates, Hartley normalization, cross-product matrices
//! - [`solver`] : normalized DLT for fundamental, essential and homography matrices
//! - [`scoring`] : Sampson / transfer distances and the soft (sigmoid) inlier count
//! - [`pose`] : essential matrix decomposition and cheirality based pose selection
//!
//! ## Example
//!
//! ```rust
//! use glam::{DMat3, DVec2, DVec3};
//! use kornia_epipolar::solver::{estimate_geometry, GeometryModel, SolverOptions};
//!
//! let h_true = DMat3::from_cols(
//!     DVec3::new(1.1, 0.05, 0.0),
//!     DVec3::new(-0.02, 0.95, 0.0),
//!     DVec3::new(3.0, -2.0, 1.0),
//! );
//! let x1 = vec![
//!     DVec2::new(0.0, 0.0),
//!     DVec2::new(10.0, 0.0),
//!     DVec2::new(0.0, 10.0),
//!     DVec2::new(10.0, 10.0),
//!     DVec2::new(5.0, 3.0),
//! ];
//! let x2 = x1
//!     .iter()
//!     .map(|p| {
//!         let q = h_true * p.extend(1.0);
//!         DVec2::new(q.x / q.z, q.y / q.z)
//!     })
//!     .collect::<Vec<_>>();
//!
//! let options = SolverOptions::default();
//! let hypothesis = estimate_geometry(&x1, &x2, GeometryModel::Homography, &options)?;
//! assert!((hypothesis.matrix.z_axis.x - 3.0).abs() < 1e-6);
//! # Ok::<(), kornia_epipolar::EpipolarError>(())
//! ```

/// Error types of the epipolar geometry kernel.
pub mod error;

/// Linear algebra helpers bridging `glam` and `faer`.
pub mod linalg;

/// Geometric primitives.
pub mod primitives;

/// Minimal (normalized linear) solvers.
pub mod solver;

/// Point-to-model distances and soft inlier scores.
pub mod scoring;

/// Relative pose recovery from an essential matrix.
pub mod pose;

pub use error::EpipolarError;
