//! # Pose recovery
//!
//! An essential matrix determines the relative pose `X2 = R * X1 + t` only up to a
//! four-fold ambiguity (two rotations, two translation signs) and the scale of `t`.
//! [`disambiguate_pose`] resolves it by triangulating the correspondences under every
//! candidate and keeping the one that puts the most points in front of both cameras.

mod cheirality;
pub use cheirality::*;

mod decompose;
pub use decompose::*;

mod metrics;
pub use metrics::*;

mod triangulation;
pub use triangulation::*;
